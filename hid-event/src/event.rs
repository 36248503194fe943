//! Decoded HID event

use std::fmt;

use serde::Serialize;

use crate::diagnostics::DiagnosticSink;
use crate::types::{DeviceKind, HidDevice, KeyboardInfo};

/// Result of decoding one raw input notification.
///
/// Built once by [`HidEventBuilder`](crate::HidEventBuilder) and never
/// modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HidEvent {
    valid: bool,
    foreground: bool,
    kind: DeviceKind,
    usage_page: u16,
    usage_collection: u16,
    usages: Vec<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    keyboard: Option<KeyboardInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    device: Option<HidDevice>,
}

impl HidEvent {
    /// An event for a notification that could not be decoded
    pub(crate) fn invalid(foreground: bool, device: Option<HidDevice>) -> Self {
        Self {
            valid: false,
            foreground,
            kind: DeviceKind::Unknown,
            usage_page: 0,
            usage_collection: 0,
            usages: Vec::new(),
            keyboard: None,
            device,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn is_foreground(&self) -> bool {
        self.foreground
    }

    pub fn is_background(&self) -> bool {
        !self.foreground
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    pub fn is_generic(&self) -> bool {
        self.kind == DeviceKind::Generic
    }

    pub fn is_mouse(&self) -> bool {
        self.kind == DeviceKind::Mouse
    }

    pub fn is_keyboard(&self) -> bool {
        self.kind == DeviceKind::Keyboard
    }

    /// Top-level usage page (generic devices only)
    pub fn usage_page(&self) -> u16 {
        self.usage_page
    }

    /// Top-level usage of the device collection (generic devices only)
    pub fn usage_collection(&self) -> u16 {
        self.usage_collection
    }

    /// Usages in report order, at most one per report
    pub fn usages(&self) -> &[u16] {
        &self.usages
    }

    /// Keyboard capabilities (keyboards only)
    pub fn keyboard(&self) -> Option<&KeyboardInfo> {
        self.keyboard.as_ref()
    }

    pub fn device(&self) -> Option<&HidDevice> {
        self.device.as_ref()
    }

    /// Write the event summary to a diagnostic sink, one line at a time
    pub fn trace_to(&self, sink: &dyn DiagnosticSink) {
        for line in self.to_string().lines() {
            sink.line(format_args!("{line}"));
        }
    }
}

impl fmt::Display for HidEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.valid {
            return write!(f, "invalid event");
        }
        if let Some(device) = &self.device {
            writeln!(f, "device {}", device.handle)?;
        }
        let kind = match self.kind {
            DeviceKind::Generic => "generic",
            DeviceKind::Mouse => "mouse",
            DeviceKind::Keyboard => "keyboard",
            DeviceKind::Unknown => "unknown",
        };
        writeln!(f, "kind: {kind}")?;
        writeln!(f, "foreground: {}", self.foreground)?;
        if let Some(kb) = &self.keyboard {
            writeln!(
                f,
                "keyboard: type {} subtype {} mode {} function keys {} indicators {} keys {}",
                kb.keyboard_type,
                kb.sub_type,
                kb.mode,
                kb.function_keys,
                kb.indicators,
                kb.keys_total
            )?;
        }
        writeln!(f, "usage page: 0x{:04X}", self.usage_page)?;
        write!(f, "usage collection: 0x{:04X}", self.usage_collection)?;
        for usage in &self.usages {
            write!(f, "\nusage: 0x{usage:04X}")?;
        }
        Ok(())
    }
}

/// Mutable accumulator used while an event is being built
#[derive(Debug, Default)]
pub(crate) struct EventDraft {
    pub foreground: bool,
    pub kind: DeviceKind,
    pub usage_page: u16,
    pub usage_collection: u16,
    pub usages: Vec<u16>,
    pub keyboard: Option<KeyboardInfo>,
    pub device: Option<HidDevice>,
}

impl EventDraft {
    pub fn new(foreground: bool, device: HidDevice) -> Self {
        Self {
            foreground,
            device: Some(device),
            ..Default::default()
        }
    }

    /// Seal the draft; only recognised device kinds yield a valid event
    pub fn finish(self) -> HidEvent {
        HidEvent {
            valid: self.kind.is_recognized(),
            foreground: self.foreground,
            kind: self.kind,
            usage_page: self.usage_page,
            usage_collection: self.usage_collection,
            usages: self.usages,
            keyboard: self.keyboard,
            device: self.device,
        }
    }
}
