//! Common types for the decoding pipeline

use serde::{Deserialize, Serialize};

/// Window message constants
pub mod wm {
    /// Raw input notification
    pub const INPUT: u32 = 0x00FF;
}

/// Raw input constants (header type tags and delivery codes)
pub mod rim {
    /// Input arrived while the application was in the foreground
    pub const INPUT: u8 = 0;
    /// Input arrived while the application was in the background
    pub const INPUTSINK: u8 = 1;

    /// Header type tag: mouse
    pub const TYPE_MOUSE: u32 = 0;
    /// Header type tag: keyboard
    pub const TYPE_KEYBOARD: u32 = 1;
    /// Header type tag: any other HID device
    pub const TYPE_HID: u32 = 2;
}

/// Opaque OS device handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceHandle(pub u64);

impl std::fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

/// Device type tag carried in the raw input header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawDeviceType {
    Mouse,
    Keyboard,
    Generic,
    /// Tag this decoder does not know about
    Unknown(u32),
}

impl RawDeviceType {
    pub fn from_tag(tag: u32) -> Self {
        match tag {
            rim::TYPE_MOUSE => Self::Mouse,
            rim::TYPE_KEYBOARD => Self::Keyboard,
            rim::TYPE_HID => Self::Generic,
            other => Self::Unknown(other),
        }
    }

    pub fn tag(&self) -> u32 {
        match self {
            Self::Mouse => rim::TYPE_MOUSE,
            Self::Keyboard => rim::TYPE_KEYBOARD,
            Self::Generic => rim::TYPE_HID,
            Self::Unknown(tag) => *tag,
        }
    }
}

/// Whether input was delivered to the foreground or a background sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Foreground,
    Background,
}

impl Delivery {
    /// Decode the delivery code from the low byte of `wparam`.
    ///
    /// Returns `None` for codes other than `RIM_INPUT`/`RIM_INPUTSINK`.
    pub fn from_wparam(wparam: u64) -> Option<Self> {
        match (wparam & 0xFF) as u8 {
            rim::INPUT => Some(Self::Foreground),
            rim::INPUTSINK => Some(Self::Background),
            _ => None,
        }
    }
}

/// An input notification as delivered by the message loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Message identifier (`WM_INPUT` for raw input)
    pub message: u32,
    /// Delivery code in the low byte
    pub wparam: u64,
    /// Raw input handle, passed back to the [`RawInputSource`](crate::RawInputSource)
    pub lparam: u64,
}

impl Notification {
    /// A raw input notification with the given delivery and handle
    pub fn raw_input(delivery: Delivery, lparam: u64) -> Self {
        let wparam = match delivery {
            Delivery::Foreground => rim::INPUT,
            Delivery::Background => rim::INPUTSINK,
        };
        Self {
            message: wm::INPUT,
            wparam: wparam as u64,
            lparam,
        }
    }

    pub fn is_raw_input(&self) -> bool {
        self.message == wm::INPUT
    }
}

/// Keyboard capabilities as reported by the OS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyboardInfo {
    pub keyboard_type: u32,
    pub sub_type: u32,
    pub mode: u32,
    pub function_keys: u32,
    pub indicators: u32,
    pub keys_total: u32,
}

/// Top-level collection identification of a generic HID device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HidInfo {
    #[serde(default)]
    pub vendor_id: u32,
    #[serde(default)]
    pub product_id: u32,
    #[serde(default)]
    pub version: u32,
    pub usage_page: u16,
    pub usage: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MouseInfo {
    #[serde(default)]
    pub id: u32,
    #[serde(default)]
    pub buttons: u32,
    #[serde(default)]
    pub sample_rate: u32,
    #[serde(default)]
    pub horizontal_wheel: bool,
}

/// Per-device information supplied by a [`DeviceInfoSource`](crate::DeviceInfoSource)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceInfo {
    Mouse(MouseInfo),
    Keyboard(KeyboardInfo),
    Hid(HidInfo),
}

impl DeviceInfo {
    pub fn hid(&self) -> Option<&HidInfo> {
        match self {
            DeviceInfo::Hid(info) => Some(info),
            _ => None,
        }
    }

    pub fn keyboard(&self) -> Option<&KeyboardInfo> {
        match self {
            DeviceInfo::Keyboard(info) => Some(info),
            _ => None,
        }
    }
}

/// Device value object attached to a decoded event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HidDevice {
    pub handle: DeviceHandle,
    pub info: DeviceInfo,
}

/// Classified kind of the device that produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Generic,
    Mouse,
    Keyboard,
    #[default]
    Unknown,
}

impl DeviceKind {
    /// Kinds that produce a valid event
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// HID report type, as understood by the usage resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportType {
    Input,
    Output,
    Feature,
}

/// A usage together with the page it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct UsageAndPage {
    pub usage_page: u16,
    pub usage: u16,
}

impl UsageAndPage {
    pub fn new(usage_page: u16, usage: u16) -> Self {
        Self { usage_page, usage }
    }
}
