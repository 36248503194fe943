//! Replay of captured raw input notifications
//!
//! A capture is a TOML file listing the devices that produced input and the
//! notifications delivered for them:
//!
//! ```toml
//! [[device]]
//! handle = 0x10
//! info = { type = "hid", usage_page = 0x000C, usage = 0x0001 }
//! fields = [
//!     { report_id = 1, usage_page = 0x000C, usage_min = 0, usage_max = 0x03FF, logical_min = 0, byte_offset = 1, size = "u16" },
//! ]
//!
//! # Structured form: the image is encoded from these fields
//! [[notification]]
//! kind = "hid"
//! device = 0x10
//! reports = ["01 E9 00", "01 EA 00"]
//!
//! # Raw form: the image exactly as delivered
//! [[notification]]
//! wparam = 1
//! raw = "02000000 ..."
//! ```
//!
//! A notification with neither `raw` nor `kind` has no image, the way a
//! raw input handle that can no longer be read behaves.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use hid_event::{
    encode_hid_input, encode_raw_input, wm, ArrayField, ArrayFieldResolver, DescriptorProvider,
    DeviceHandle, DeviceInfo, DeviceInfoSource, EncodeError, EnvelopeLayout, HidError, HidEvent,
    HidEventBuilder, MemorySink, Notification, RawDeviceType, RawInputSource,
    UsageArrayDescriptor,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::hex::{parse_hex, HexError};

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("Cannot read capture {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid capture: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Notification {index}: {source}")]
    Hex {
        index: usize,
        #[source]
        source: HexError,
    },
    #[error("Notification {index}: {source}")]
    Encode {
        index: usize,
        #[source]
        source: EncodeError,
    },
    #[error("Notification {index}: {reason}")]
    Notification { index: usize, reason: String },
    #[error("Device {0} is listed more than once")]
    DuplicateDevice(DeviceHandle),
    #[error("Descriptor acquisitions ({acquired}) and releases ({released}) do not balance")]
    Unbalanced { acquired: usize, released: usize },
}

/// Device type of a structured notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureKind {
    Hid,
    Mouse,
    Keyboard,
}

impl From<CaptureKind> for RawDeviceType {
    fn from(kind: CaptureKind) -> Self {
        match kind {
            CaptureKind::Hid => RawDeviceType::Generic,
            CaptureKind::Mouse => RawDeviceType::Mouse,
            CaptureKind::Keyboard => RawDeviceType::Keyboard,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CapturedDevice {
    pub handle: DeviceHandle,
    pub info: DeviceInfo,
    /// Input fields; a device without fields has no descriptor
    #[serde(default)]
    pub fields: Vec<ArrayField>,
}

fn default_message() -> u32 {
    wm::INPUT
}

#[derive(Debug, Clone, Deserialize)]
pub struct CapturedNotification {
    #[serde(default = "default_message")]
    pub message: u32,
    #[serde(default)]
    pub wparam: u64,
    /// Complete raw input image as hex
    #[serde(default)]
    pub raw: Option<String>,
    #[serde(default)]
    pub kind: Option<CaptureKind>,
    #[serde(default)]
    pub device: Option<DeviceHandle>,
    /// Defaults to the length of the first report
    #[serde(default)]
    pub report_size: Option<u32>,
    /// Defaults to the number of reports
    #[serde(default)]
    pub report_count: Option<u32>,
    /// HID reports as hex, one entry per report
    #[serde(default)]
    pub reports: Vec<String>,
    /// Mouse/keyboard payload following the header, as hex
    #[serde(default)]
    pub body: Option<String>,
}

impl CapturedNotification {
    /// Build the raw input image, `None` if the capture carries none
    fn image(&self, index: usize, layout: EnvelopeLayout) -> Result<Option<Vec<u8>>, ReplayError> {
        let hex = |text: &str| parse_hex(text).map_err(|source| ReplayError::Hex { index, source });
        let encoded = |image: Result<Vec<u8>, EncodeError>| {
            image
                .map(Some)
                .map_err(|source| ReplayError::Encode { index, source })
        };

        match (&self.raw, self.kind) {
            (Some(_), Some(_)) => Err(ReplayError::Notification {
                index,
                reason: "both `raw` and `kind` given".to_string(),
            }),
            (Some(raw), None) => hex(raw.as_str()).map(Some),
            (None, None) => Ok(None),
            (None, Some(kind)) => {
                let device = self.device.ok_or_else(|| ReplayError::Notification {
                    index,
                    reason: "`kind` requires `device`".to_string(),
                })?;
                match kind {
                    CaptureKind::Hid => {
                        let reports = self
                            .reports
                            .iter()
                            .map(|r| hex(r.as_str()))
                            .collect::<Result<Vec<_>, _>>()?;
                        let size = self
                            .report_size
                            .unwrap_or_else(|| reports.first().map_or(0, |r| r.len() as u32));
                        let count = self.report_count.unwrap_or(reports.len() as u32);
                        let payload = reports.concat();
                        encoded(encode_hid_input(
                            layout,
                            device,
                            self.wparam,
                            size,
                            count,
                            &payload,
                        ))
                    }
                    CaptureKind::Mouse | CaptureKind::Keyboard => {
                        let body = match &self.body {
                            Some(body) => hex(body.as_str())?,
                            None => Vec::new(),
                        };
                        encoded(encode_raw_input(
                            layout,
                            kind.into(),
                            device,
                            self.wparam,
                            &body,
                        ))
                    }
                }
            }
        }
    }
}

/// Parsed capture file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Capture {
    #[serde(default, rename = "device")]
    pub devices: Vec<CapturedDevice>,
    #[serde(default, rename = "notification")]
    pub notifications: Vec<CapturedNotification>,
}

impl Capture {
    pub fn from_toml(text: &str) -> Result<Self, ReplayError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ReplayError> {
        let text = std::fs::read_to_string(path).map_err(|source| ReplayError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }
}

/// Outcome of one replayed notification
#[derive(Debug, Clone)]
pub struct ReplayRecord {
    pub index: usize,
    pub notification: Notification,
    pub image: Option<Vec<u8>>,
    pub event: HidEvent,
    /// Diagnostic lines written while decoding
    pub trace: Vec<String>,
}

/// Serves a capture to the decoder as its raw input, device info and
/// descriptor collaborators.
///
/// The `lparam` of each notification is its index in the capture.
#[derive(Debug)]
pub struct ReplaySession {
    layout: EnvelopeLayout,
    devices: BTreeMap<DeviceHandle, CapturedDevice>,
    notifications: Vec<Notification>,
    images: Vec<Option<Vec<u8>>>,
    acquired: Cell<usize>,
    released: Cell<usize>,
}

impl ReplaySession {
    pub fn new(capture: Capture, layout: EnvelopeLayout) -> Result<Self, ReplayError> {
        let mut devices = BTreeMap::new();
        for device in capture.devices {
            let handle = device.handle;
            if devices.insert(handle, device).is_some() {
                return Err(ReplayError::DuplicateDevice(handle));
            }
        }

        let mut notifications = Vec::with_capacity(capture.notifications.len());
        let mut images = Vec::with_capacity(capture.notifications.len());
        for (index, captured) in capture.notifications.iter().enumerate() {
            images.push(captured.image(index, layout)?);
            notifications.push(Notification {
                message: captured.message,
                wparam: captured.wparam,
                lparam: index as u64,
            });
        }

        debug!(
            devices = devices.len(),
            notifications = notifications.len(),
            "Loaded capture"
        );

        Ok(Self {
            layout,
            devices,
            notifications,
            images,
            acquired: Cell::new(0),
            released: Cell::new(0),
        })
    }

    pub fn load(path: &Path, layout: EnvelopeLayout) -> Result<Self, ReplayError> {
        Self::new(Capture::load(path)?, layout)
    }

    pub fn from_toml(text: &str, layout: EnvelopeLayout) -> Result<Self, ReplayError> {
        Self::new(Capture::from_toml(text)?, layout)
    }

    pub fn layout(&self) -> EnvelopeLayout {
        self.layout
    }

    pub fn image(&self, index: usize) -> Option<&[u8]> {
        self.images.get(index).and_then(|i| i.as_deref())
    }

    /// Descriptor acquisitions and releases so far
    pub fn descriptor_balance(&self) -> (usize, usize) {
        (self.acquired.get(), self.released.get())
    }

    /// Decode every notification in capture order
    pub fn run(&self) -> Result<Vec<ReplayRecord>, ReplayError> {
        let sink = MemorySink::new();
        let resolver = ArrayFieldResolver;
        let builder = HidEventBuilder::new(self, self, self, &resolver)
            .with_sink(&sink)
            .with_layout(self.layout);

        let records = self
            .notifications
            .iter()
            .enumerate()
            .map(|(index, notification)| {
                let event = builder.build(notification);
                ReplayRecord {
                    index,
                    notification: *notification,
                    image: self.images[index].clone(),
                    event,
                    trace: sink.drain(),
                }
            })
            .collect();

        let (acquired, released) = self.descriptor_balance();
        if acquired != released {
            warn!(acquired, released, "Descriptor leak during replay");
            return Err(ReplayError::Unbalanced { acquired, released });
        }
        Ok(records)
    }
}

impl RawInputSource for ReplaySession {
    type Buffer = Vec<u8>;

    fn fetch_raw_input(&self, notification: &Notification) -> Result<Vec<u8>, HidError> {
        usize::try_from(notification.lparam)
            .ok()
            .and_then(|index| self.image(index))
            .map(<[u8]>::to_vec)
            .ok_or_else(|| {
                HidError::unavailable(
                    "raw input",
                    format!("no image for handle {}", notification.lparam),
                )
            })
    }
}

impl DeviceInfoSource for ReplaySession {
    fn fetch_device_info(&self, device: DeviceHandle) -> Result<DeviceInfo, HidError> {
        self.devices
            .get(&device)
            .map(|d| d.info)
            .ok_or_else(|| HidError::unavailable("device info", format!("unknown device {device}")))
    }
}

impl DescriptorProvider for ReplaySession {
    type Descriptor = UsageArrayDescriptor;

    fn acquire(&self, device: DeviceHandle) -> Result<UsageArrayDescriptor, HidError> {
        let fields = self
            .devices
            .get(&device)
            .map(|d| d.fields.as_slice())
            .unwrap_or_default();
        if fields.is_empty() {
            return Err(HidError::unavailable(
                "descriptor",
                format!("no input fields for device {device}"),
            ));
        }
        self.acquired.set(self.acquired.get() + 1);
        Ok(UsageArrayDescriptor::new(fields.to_vec()))
    }

    fn release(&self, _descriptor: UsageArrayDescriptor) {
        self.released.set(self.released.get() + 1);
    }
}
