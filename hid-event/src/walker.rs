//! Fixed-stride iteration over the reports embedded in a raw input image

use std::iter::FusedIterator;

use crate::error::HidError;

/// Lazy iterator over `count` report slices of `stride` bytes each, the first
/// starting at `base`.
///
/// Every slice is bounds-checked before it is produced. The first slice that
/// would run past the end of the buffer yields [`HidError::OutOfBounds`] and
/// ends the iteration.
#[derive(Debug, Clone)]
pub struct ReportWalker<'a> {
    buffer: &'a [u8],
    base: usize,
    stride: usize,
    count: usize,
    index: usize,
    done: bool,
}

impl<'a> ReportWalker<'a> {
    pub fn new(buffer: &'a [u8], base: usize, stride: usize, count: usize) -> Self {
        Self {
            buffer,
            base,
            stride,
            count,
            index: 0,
            done: count == 0,
        }
    }

    /// Byte range of report `index`, or `None` if the arithmetic overflows
    pub fn span(&self, index: usize) -> Option<(usize, usize)> {
        let start = self.stride.checked_mul(index)?.checked_add(self.base)?;
        let end = start.checked_add(self.stride)?;
        Some((start, end))
    }
}

impl<'a> Iterator for ReportWalker<'a> {
    type Item = Result<&'a [u8], HidError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let index = self.index;
        self.index += 1;
        if self.index >= self.count {
            self.done = true;
        }

        match self.span(index) {
            Some((start, end)) if end <= self.buffer.len() => Some(Ok(&self.buffer[start..end])),
            span => {
                self.done = true;
                Some(Err(HidError::OutOfBounds {
                    index,
                    end: span.map_or(usize::MAX, |(_, end)| end),
                    len: self.buffer.len(),
                }))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            (0, Some(0))
        } else {
            (0, Some(self.count - self.index))
        }
    }
}

impl FusedIterator for ReportWalker<'_> {}
