//! Collaborators supplying raw input and device information

use crate::error::HidError;
use crate::types::{DeviceHandle, DeviceInfo, Notification};

/// Supplies the raw input image for a notification.
///
/// The returned buffer is owned by the caller for the duration of one
/// decoding call; dropping it releases whatever the source allocated.
pub trait RawInputSource {
    type Buffer: AsRef<[u8]>;

    fn fetch_raw_input(&self, notification: &Notification) -> Result<Self::Buffer, HidError>;
}

/// Supplies per-device information
pub trait DeviceInfoSource {
    fn fetch_device_info(&self, device: DeviceHandle) -> Result<DeviceInfo, HidError>;
}

impl<T: RawInputSource + ?Sized> RawInputSource for &T {
    type Buffer = T::Buffer;

    fn fetch_raw_input(&self, notification: &Notification) -> Result<Self::Buffer, HidError> {
        (**self).fetch_raw_input(notification)
    }
}

impl<T: DeviceInfoSource + ?Sized> DeviceInfoSource for &T {
    fn fetch_device_info(&self, device: DeviceHandle) -> Result<DeviceInfo, HidError> {
        (**self).fetch_device_info(device)
    }
}
