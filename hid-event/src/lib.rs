//! Raw-input HID event decoding
//!
//! This crate turns raw input notifications into typed [`HidEvent`]s:
//!
//! - the raw input image is decoded into a [`RawEnvelope`] (header, device
//!   type, HID sub-record)
//! - the embedded reports are walked with bounds checks ([`ReportWalker`])
//! - each report is handed to a descriptor-driven [`UsageResolver`]
//!
//! Acquiring the image, the device information and the pre-parsed descriptor
//! is left to the caller through the [`RawInputSource`], [`DeviceInfoSource`]
//! and [`DescriptorProvider`] traits.

pub mod array_field;
pub mod builder;
pub mod descriptor;
pub mod diagnostics;
pub mod envelope;
pub mod error;
pub mod event;
pub mod resolver;
pub mod source;
pub mod types;
pub mod walker;

pub use array_field::{ArrayField, ArrayFieldResolver, FieldSize, UsageArrayDescriptor};
pub use builder::HidEventBuilder;
pub use descriptor::{DescriptorGuard, DescriptorProvider};
pub use diagnostics::{DiagnosticSink, HexDump, MemorySink, TracingSink, WriterSink};
pub use envelope::{
    encode_hid_input, encode_raw_input, EncodeError, EnvelopeLayout, PointerWidth, RawEnvelope,
    HID_SUB_RECORD_SIZE,
};
pub use error::HidError;
pub use event::HidEvent;
pub use resolver::{resolve_single, UsageResolver};
pub use source::{DeviceInfoSource, RawInputSource};
pub use types::{
    rim, wm, Delivery, DeviceHandle, DeviceInfo, DeviceKind, HidDevice, HidInfo, KeyboardInfo,
    MouseInfo, Notification, RawDeviceType, ReportType, UsageAndPage,
};
pub use walker::ReportWalker;
