//! Descriptor-driven usage resolution
//!
//! The decoder does not interpret report bytes itself. For every report it
//! asks a [`UsageResolver`] which usages the report asserts, given the
//! device's pre-parsed descriptor.

use crate::error::HidError;
use crate::types::{ReportType, UsageAndPage};

/// Resolves the usages asserted in a single report.
///
/// `D` is the pre-parsed descriptor type handed out by the
/// [`DescriptorProvider`](crate::DescriptorProvider).
pub trait UsageResolver<D: ?Sized> {
    /// Return at most `max_usages` usages asserted in `report`.
    ///
    /// An empty vector means the report asserts nothing. A report that cannot
    /// be interpreted with this descriptor is a [`HidError::ParseFailure`].
    fn resolve(
        &self,
        descriptor: &D,
        report_type: ReportType,
        report: &[u8],
        max_usages: usize,
    ) -> Result<Vec<UsageAndPage>, HidError>;
}

impl<D, F> UsageResolver<D> for F
where
    D: ?Sized,
    F: Fn(&D, ReportType, &[u8], usize) -> Result<Vec<UsageAndPage>, HidError>,
{
    fn resolve(
        &self,
        descriptor: &D,
        report_type: ReportType,
        report: &[u8],
        max_usages: usize,
    ) -> Result<Vec<UsageAndPage>, HidError> {
        self(descriptor, report_type, report, max_usages)
    }
}

/// Resolve a single input usage from one report.
///
/// Only the first usage is kept; a report asserting several is treated as
/// asserting its first. Errors other than `ParseFailure` coming from the
/// resolver are folded into `ParseFailure` so one bad report never escalates.
pub fn resolve_single<D, R>(
    resolver: &R,
    descriptor: &D,
    report: &[u8],
) -> Result<Option<UsageAndPage>, HidError>
where
    D: ?Sized,
    R: UsageResolver<D> + ?Sized,
{
    match resolver.resolve(descriptor, ReportType::Input, report, 1) {
        Ok(usages) => Ok(usages.into_iter().next()),
        Err(err @ HidError::ParseFailure(_)) => Err(err),
        Err(other) => Err(HidError::ParseFailure(other.to_string())),
    }
}
