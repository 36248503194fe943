//! Raw input envelope layout and decoding
//!
//! A raw input image is laid out as:
//!
//! ```text
//! +-------------------------------+
//! | header                        |  type u32, size u32, device ptr, wparam ptr
//! +-------------------------------+
//! | HID sub-record (HID only)     |  report_size u32, report_count u32
//! +-------------------------------+
//! | report 0 .. report_count-1    |  report_size bytes each
//! +-------------------------------+
//! ```
//!
//! All integers are little-endian. The header is 24 bytes with 64-bit
//! pointers and 16 bytes with 32-bit pointers.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use zerocopy::byteorder::little_endian::{U32, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::error::HidError;
use crate::types::{DeviceHandle, RawDeviceType};
use crate::walker::ReportWalker;

/// Size of the fixed HID sub-record preceding the reports
pub const HID_SUB_RECORD_SIZE: usize = std::mem::size_of::<RawHidRecord>();

#[derive(Debug, Clone, Copy, IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
struct RawInputHeader64 {
    kind: U32,
    size: U32,
    device: U64,
    wparam: U64,
}

#[derive(Debug, Clone, Copy, IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
struct RawInputHeader32 {
    kind: U32,
    size: U32,
    device: U32,
    wparam: U32,
}

#[derive(Debug, Clone, Copy, IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
struct RawHidRecord {
    report_size: U32,
    report_count: U32,
}

/// Decoded header fields, independent of pointer width
#[derive(Debug, Clone, Copy)]
struct Header {
    kind: u32,
    size: u32,
    device: u64,
}

/// Pointer width of the process that produced the image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PointerWidth {
    #[serde(rename = "32")]
    Bits32,
    #[default]
    #[serde(rename = "64")]
    Bits64,
}

/// Byte layout of a raw input image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnvelopeLayout {
    #[serde(default)]
    pub pointer_width: PointerWidth,
}

impl EnvelopeLayout {
    pub fn new(pointer_width: PointerWidth) -> Self {
        Self { pointer_width }
    }

    pub fn header_size(&self) -> usize {
        match self.pointer_width {
            PointerWidth::Bits32 => std::mem::size_of::<RawInputHeader32>(),
            PointerWidth::Bits64 => std::mem::size_of::<RawInputHeader64>(),
        }
    }

    pub fn fixed_sub_record_size(&self) -> usize {
        HID_SUB_RECORD_SIZE
    }

    /// Offset of the first report in a HID image
    pub fn report_base(&self) -> usize {
        self.header_size() + self.fixed_sub_record_size()
    }

    fn read_header(&self, bytes: &[u8]) -> Option<Header> {
        match self.pointer_width {
            PointerWidth::Bits32 => {
                let (h, _) = RawInputHeader32::read_from_prefix(bytes).ok()?;
                Some(Header {
                    kind: h.kind.get(),
                    size: h.size.get(),
                    device: h.device.get() as u64,
                })
            }
            PointerWidth::Bits64 => {
                let (h, _) = RawInputHeader64::read_from_prefix(bytes).ok()?;
                Some(Header {
                    kind: h.kind.get(),
                    size: h.size.get(),
                    device: h.device.get(),
                })
            }
        }
    }

    fn write_header(
        &self,
        out: &mut Vec<u8>,
        kind: u32,
        size: u32,
        device: DeviceHandle,
        wparam: u64,
    ) -> Result<(), EncodeError> {
        match self.pointer_width {
            PointerWidth::Bits32 => {
                let narrow_device =
                    u32::try_from(device.0).map_err(|_| EncodeError::HandleTooWide(device))?;
                let narrow_wparam =
                    u32::try_from(wparam).map_err(|_| EncodeError::WparamTooWide(wparam))?;
                out.extend_from_slice(
                    RawInputHeader32 {
                        kind: U32::new(kind),
                        size: U32::new(size),
                        device: U32::new(narrow_device),
                        wparam: U32::new(narrow_wparam),
                    }
                    .as_bytes(),
                );
            }
            PointerWidth::Bits64 => out.extend_from_slice(
                RawInputHeader64 {
                    kind: U32::new(kind),
                    size: U32::new(size),
                    device: U64::new(device.0),
                    wparam: U64::new(wparam),
                }
                .as_bytes(),
            ),
        }
        Ok(())
    }
}

/// Immutable view of one raw input image.
///
/// Borrows the buffer for the duration of the decoding call.
#[derive(Debug, Clone, Copy)]
pub struct RawEnvelope<'a> {
    device: DeviceHandle,
    device_type: RawDeviceType,
    report_size: u32,
    report_count: u32,
    buffer: &'a [u8],
    layout: EnvelopeLayout,
}

impl<'a> RawEnvelope<'a> {
    /// Decode the header (and the HID sub-record for HID images).
    ///
    /// The buffer is cut to the size declared in the header; a declared size
    /// larger than the bytes delivered, or a buffer too short for the fixed
    /// records, makes the envelope unavailable.
    pub fn parse(bytes: &'a [u8], layout: EnvelopeLayout) -> Result<Self, HidError> {
        let header = layout.read_header(bytes).ok_or_else(|| {
            HidError::unavailable(
                "raw input",
                format!(
                    "{} bytes is shorter than the {}-byte header",
                    bytes.len(),
                    layout.header_size()
                ),
            )
        })?;

        let declared = header.size as usize;
        if declared != 0 && declared < layout.header_size() {
            return Err(HidError::unavailable(
                "raw input",
                format!(
                    "header declares {declared} bytes, less than the {}-byte header",
                    layout.header_size()
                ),
            ));
        }
        if declared > bytes.len() {
            return Err(HidError::unavailable(
                "raw input",
                format!(
                    "header declares {declared} bytes, only {} delivered",
                    bytes.len()
                ),
            ));
        }
        // A zero size is tolerated and means "everything delivered"
        let buffer = if declared == 0 {
            bytes
        } else {
            &bytes[..declared]
        };

        let device_type = RawDeviceType::from_tag(header.kind);
        let (report_size, report_count) = if device_type == RawDeviceType::Generic {
            let record = buffer
                .get(layout.header_size()..)
                .and_then(|rest| RawHidRecord::read_from_prefix(rest).ok())
                .map(|(record, _)| record)
                .ok_or_else(|| {
                    HidError::unavailable(
                        "raw input",
                        format!(
                            "{} bytes is too short for the HID sub-record",
                            buffer.len()
                        ),
                    )
                })?;
            (record.report_size.get(), record.report_count.get())
        } else {
            (0, 0)
        };

        Ok(Self {
            device: DeviceHandle(header.device),
            device_type,
            report_size,
            report_count,
            buffer,
            layout,
        })
    }

    pub fn device(&self) -> DeviceHandle {
        self.device
    }

    pub fn device_type(&self) -> RawDeviceType {
        self.device_type
    }

    /// Size in bytes of one embedded report (HID only)
    pub fn report_size(&self) -> u32 {
        self.report_size
    }

    /// Number of embedded reports (HID only)
    pub fn report_count(&self) -> u32 {
        self.report_count
    }

    pub fn buffer(&self) -> &'a [u8] {
        self.buffer
    }

    pub fn layout(&self) -> EnvelopeLayout {
        self.layout
    }

    /// Whether the envelope carries report data worth resolving.
    ///
    /// A single byte is the report id alone and carries no usage.
    pub fn has_report_data(&self) -> bool {
        self.report_size > 1 && self.report_count > 0
    }

    /// Iterate the embedded reports
    pub fn reports(&self) -> ReportWalker<'a> {
        ReportWalker::new(
            self.buffer,
            self.layout.report_base(),
            self.report_size as usize,
            self.report_count as usize,
        )
    }
}

/// Values that cannot be represented in a raw input image
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("Device handle {0} does not fit a 32-bit pointer")]
    HandleTooWide(DeviceHandle),

    #[error("wparam 0x{0:X} does not fit a 32-bit pointer")]
    WparamTooWide(u64),

    #[error("Image of {0} bytes exceeds the 32-bit size field")]
    TooLarge(usize),
}

/// Build a raw input image with an opaque body (mouse/keyboard payloads).
pub fn encode_raw_input(
    layout: EnvelopeLayout,
    device_type: RawDeviceType,
    device: DeviceHandle,
    wparam: u64,
    body: &[u8],
) -> Result<Vec<u8>, EncodeError> {
    let total = layout.header_size() + body.len();
    let size = u32::try_from(total).map_err(|_| EncodeError::TooLarge(total))?;
    let mut out = Vec::with_capacity(total);
    layout.write_header(&mut out, device_type.tag(), size, device, wparam)?;
    out.extend_from_slice(body);
    Ok(out)
}

/// Build a HID raw input image.
///
/// `payload` is written as-is after the sub-record, so the counts need not
/// match its length (useful for exercising bounds checks).
pub fn encode_hid_input(
    layout: EnvelopeLayout,
    device: DeviceHandle,
    wparam: u64,
    report_size: u32,
    report_count: u32,
    payload: &[u8],
) -> Result<Vec<u8>, EncodeError> {
    let record = RawHidRecord {
        report_size: U32::new(report_size),
        report_count: U32::new(report_count),
    };
    let mut body = Vec::with_capacity(HID_SUB_RECORD_SIZE + payload.len());
    body.extend_from_slice(record.as_bytes());
    body.extend_from_slice(payload);
    encode_raw_input(layout, RawDeviceType::Generic, device, wparam, &body)
}
