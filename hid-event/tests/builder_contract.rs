//! Integration tests for `HidEventBuilder`.
//!
//! The collaborators are in-memory mocks that count every call, so the tests
//! can check acquire/release balance and that rejected notifications never
//! reach a collaborator.

use std::cell::Cell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use hid_event::{
    encode_hid_input, encode_raw_input, wm, Delivery, DescriptorProvider, DeviceHandle,
    DeviceInfo, DeviceInfoSource, DeviceKind, EnvelopeLayout, HidError, HidEventBuilder,
    HidInfo, KeyboardInfo, MemorySink, MouseInfo, Notification, PointerWidth, RawDeviceType,
    RawInputSource, ReportType, UsageAndPage, WriterSink,
};

const DEVICE: DeviceHandle = DeviceHandle(0x0001_0042);

// ── Mock collaborators ──

/// Raw image whose drop is counted
struct TrackedBuffer {
    bytes: Vec<u8>,
    released: Rc<Cell<u32>>,
}

impl AsRef<[u8]> for TrackedBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl Drop for TrackedBuffer {
    fn drop(&mut self) {
        self.released.set(self.released.get() + 1);
    }
}

#[derive(Default)]
struct Platform {
    image: Option<Vec<u8>>,
    info: Option<DeviceInfo>,
    raw_calls: Cell<u32>,
    info_calls: Cell<u32>,
    buffers_released: Rc<Cell<u32>>,
}

impl Platform {
    fn new(image: Vec<u8>, info: DeviceInfo) -> Self {
        Self {
            image: Some(image),
            info: Some(info),
            ..Default::default()
        }
    }
}

impl RawInputSource for Platform {
    type Buffer = TrackedBuffer;

    fn fetch_raw_input(&self, _notification: &Notification) -> Result<TrackedBuffer, HidError> {
        self.raw_calls.set(self.raw_calls.get() + 1);
        let bytes = self
            .image
            .clone()
            .ok_or_else(|| HidError::unavailable("raw input", "handle expired"))?;
        Ok(TrackedBuffer {
            bytes,
            released: Rc::clone(&self.buffers_released),
        })
    }
}

impl DeviceInfoSource for Platform {
    fn fetch_device_info(&self, device: DeviceHandle) -> Result<DeviceInfo, HidError> {
        self.info_calls.set(self.info_calls.get() + 1);
        assert_eq!(device, DEVICE);
        self.info
            .ok_or_else(|| HidError::unavailable("device info", "device removed"))
    }
}

#[derive(Default)]
struct Descriptors {
    fail: bool,
    acquired: Cell<u32>,
    released: Cell<u32>,
}

impl DescriptorProvider for Descriptors {
    type Descriptor = u32;

    fn acquire(&self, device: DeviceHandle) -> Result<u32, HidError> {
        assert_eq!(device, DEVICE);
        if self.fail {
            return Err(HidError::unavailable("descriptor", "no preparsed data"));
        }
        self.acquired.set(self.acquired.get() + 1);
        Ok(0xD35C)
    }

    fn release(&self, descriptor: u32) {
        assert_eq!(descriptor, 0xD35C);
        self.released.set(self.released.get() + 1);
    }
}

/// Reads a little-endian usage from bytes 1..3; `FF FF` is unparseable,
/// `00 00` asserts nothing, `EE EE` panics.
fn scripted(
    descriptor: &u32,
    report_type: ReportType,
    report: &[u8],
    max_usages: usize,
) -> Result<Vec<UsageAndPage>, HidError> {
    assert_eq!(*descriptor, 0xD35C);
    assert_eq!(report_type, ReportType::Input);
    assert_eq!(max_usages, 1);
    match (report.get(1), report.get(2)) {
        (Some(0xFF), Some(0xFF)) => Err(HidError::parse("incompatible report id")),
        (Some(0xEE), Some(0xEE)) => panic!("resolver blew up"),
        (Some(0x00), Some(0x00)) => Ok(Vec::new()),
        (Some(&lo), Some(&hi)) => Ok(vec![UsageAndPage::new(
            0x000C,
            u16::from_le_bytes([lo, hi]),
        )]),
        _ => Err(HidError::parse("short report")),
    }
}

type Resolver = fn(&u32, ReportType, &[u8], usize) -> Result<Vec<UsageAndPage>, HidError>;
const RESOLVER: Resolver = scripted;

fn hid_info() -> DeviceInfo {
    DeviceInfo::Hid(HidInfo {
        vendor_id: 0x0471,
        product_id: 0x0815,
        version: 1,
        usage_page: 0xFFBC,
        usage: 0x0088,
    })
}

fn hid_image(report_size: u32, report_count: u32, payload: &[u8]) -> Vec<u8> {
    encode_hid_input(
        EnvelopeLayout::default(),
        DEVICE,
        0,
        report_size,
        report_count,
        payload,
    )
    .unwrap()
}

fn foreground() -> Notification {
    Notification::raw_input(Delivery::Foreground, 0x1234)
}

// ── Generic devices ──

#[test]
fn parse_failure_on_second_report_keeps_first_usage() {
    let platform = Platform::new(
        hid_image(3, 2, &[0x01, 0x30, 0x00, 0x01, 0xFF, 0xFF]),
        hid_info(),
    );
    let descriptors = Descriptors::default();
    let sink = MemorySink::new();
    let builder =
        HidEventBuilder::new(&platform, &platform, &descriptors, &RESOLVER).with_sink(&sink);

    let event = builder.build(&foreground());

    assert!(event.is_valid());
    assert!(event.is_generic());
    assert_eq!(event.usages(), &[0x0030]);
    assert_eq!(event.usage_page(), 0xFFBC);
    assert_eq!(event.usage_collection(), 0x0088);
    assert!(sink.contains("Could not parse report 1"));
    assert_eq!(descriptors.acquired.get(), 1);
    assert_eq!(descriptors.released.get(), 1);
    assert_eq!(platform.buffers_released.get(), 1);
}

#[test]
fn parse_failure_does_not_stop_later_reports() {
    let platform = Platform::new(
        hid_image(
            3,
            4,
            &[
                0x01, 0xE9, 0x00, //
                0x01, 0xFF, 0xFF, //
                0x01, 0xEA, 0x00, //
                0x01, 0xCD, 0x00,
            ],
        ),
        hid_info(),
    );
    let descriptors = Descriptors::default();
    let builder = HidEventBuilder::new(&platform, &platform, &descriptors, &RESOLVER);

    let event = builder.build(&foreground());

    assert!(event.is_valid());
    assert_eq!(event.usages(), &[0x00E9, 0x00EA, 0x00CD]);
    assert_eq!(descriptors.released.get(), 1);
}

#[test]
fn report_asserting_nothing_adds_no_usage() {
    let platform = Platform::new(
        hid_image(3, 2, &[0x01, 0x00, 0x00, 0x01, 0xB5, 0x00]),
        hid_info(),
    );
    let descriptors = Descriptors::default();
    let sink = MemorySink::new();
    let builder =
        HidEventBuilder::new(&platform, &platform, &descriptors, &RESOLVER).with_sink(&sink);

    let event = builder.build(&foreground());

    assert_eq!(event.usages(), &[0x00B5]);
    assert!(sink.contains("Report 0 asserts no usage"));
}

#[test]
fn empty_report_data_is_valid_and_skips_descriptor() {
    for (size, count, payload) in [(3u32, 0u32, &[][..]), (1, 4, &[1, 1, 1, 1][..]), (0, 2, &[][..])]
    {
        let platform = Platform::new(hid_image(size, count, payload), hid_info());
        let descriptors = Descriptors::default();
        let builder = HidEventBuilder::new(&platform, &platform, &descriptors, &RESOLVER);

        let event = builder.build(&foreground());

        assert!(event.is_valid(), "size {size} count {count}");
        assert!(event.is_generic());
        assert!(event.usages().is_empty());
        assert_eq!(event.usage_page(), 0xFFBC);
        assert_eq!(descriptors.acquired.get(), 0);
        assert_eq!(descriptors.released.get(), 0);
        assert_eq!(platform.buffers_released.get(), 1);
    }
}

#[test]
fn out_of_bounds_keeps_collected_usages() {
    // Three reports declared, two present
    let platform = Platform::new(
        hid_image(3, 3, &[0x01, 0xE9, 0x00, 0x01, 0xEA, 0x00]),
        hid_info(),
    );
    let descriptors = Descriptors::default();
    let sink = MemorySink::new();
    let builder =
        HidEventBuilder::new(&platform, &platform, &descriptors, &RESOLVER).with_sink(&sink);

    let event = builder.build(&foreground());

    assert!(event.is_valid());
    assert_eq!(event.usages(), &[0x00E9, 0x00EA]);
    assert!(sink.contains("Stopping extraction: Report 2 out of bounds"));
    assert_eq!(descriptors.acquired.get(), 1);
    assert_eq!(descriptors.released.get(), 1);
}

#[test]
fn usages_never_exceed_report_count() {
    for count in 1u32..=6 {
        let mut payload = Vec::new();
        for i in 0..count {
            let usage = 0x0100 + i as u16;
            payload.push(0x01);
            payload.extend_from_slice(&usage.to_le_bytes());
        }
        let platform = Platform::new(hid_image(3, count, &payload), hid_info());
        let descriptors = Descriptors::default();
        let builder = HidEventBuilder::new(&platform, &platform, &descriptors, &RESOLVER);

        let event = builder.build(&foreground());

        assert!(event.usages().len() <= count as usize);
        let expected: Vec<u16> = (0..count as u16).map(|i| 0x0100 + i).collect();
        assert_eq!(event.usages(), expected.as_slice());
        assert_eq!(descriptors.acquired.get(), descriptors.released.get());
    }
}

#[test]
fn descriptor_unavailable_yields_valid_event_without_usages() {
    let platform = Platform::new(hid_image(3, 1, &[0x01, 0xE9, 0x00]), hid_info());
    let descriptors = Descriptors {
        fail: true,
        ..Default::default()
    };
    let sink = MemorySink::new();
    let builder =
        HidEventBuilder::new(&platform, &platform, &descriptors, &RESOLVER).with_sink(&sink);

    let event = builder.build(&foreground());

    assert!(event.is_valid());
    assert!(event.usages().is_empty());
    assert!(sink.contains("Cannot decode reports"));
    assert_eq!(descriptors.released.get(), 0);
}

#[test]
fn descriptor_released_when_resolver_panics() {
    let platform = Platform::new(
        hid_image(3, 2, &[0x01, 0xE9, 0x00, 0x01, 0xEE, 0xEE]),
        hid_info(),
    );
    let descriptors = Descriptors::default();
    let builder = HidEventBuilder::new(&platform, &platform, &descriptors, &RESOLVER);

    let result = catch_unwind(AssertUnwindSafe(|| builder.build(&foreground())));

    assert!(result.is_err());
    assert_eq!(descriptors.acquired.get(), 1);
    assert_eq!(descriptors.released.get(), 1);
    assert_eq!(platform.buffers_released.get(), 1);
}

#[test]
fn generic_info_without_hid_usage_still_decodes() {
    let platform = Platform::new(
        hid_image(3, 1, &[0x01, 0xE9, 0x00]),
        DeviceInfo::Mouse(MouseInfo::default()),
    );
    let descriptors = Descriptors::default();
    let builder = HidEventBuilder::new(&platform, &platform, &descriptors, &RESOLVER);

    let event = builder.build(&foreground());

    assert!(event.is_valid());
    assert_eq!(event.usage_page(), 0);
    assert_eq!(event.usages(), &[0x00E9]);
}

#[test]
fn thirty_two_bit_layout() {
    let layout = EnvelopeLayout::new(PointerWidth::Bits32);
    let image = encode_hid_input(layout, DEVICE, 0, 3, 1, &[0x01, 0x30, 0x00]).unwrap();
    let platform = Platform::new(image, hid_info());
    let descriptors = Descriptors::default();
    let builder =
        HidEventBuilder::new(&platform, &platform, &descriptors, &RESOLVER).with_layout(layout);

    let event = builder.build(&foreground());

    assert_eq!(event.usages(), &[0x0030]);
}

// ── Other device types ──

#[test]
fn keyboard_copies_capabilities_verbatim() {
    let caps = KeyboardInfo {
        keyboard_type: 81,
        sub_type: 0,
        mode: 1,
        function_keys: 12,
        indicators: 3,
        keys_total: 264,
    };
    let image = encode_raw_input(
        EnvelopeLayout::default(),
        RawDeviceType::Keyboard,
        DEVICE,
        0,
        &[0u8; 16],
   )
    .unwrap();
    let platform = Platform::new(image, DeviceInfo::Keyboard(caps));
    let descriptors = Descriptors::default();
    let sink = MemorySink::new();
    let builder =
        HidEventBuilder::new(&platform, &platform, &descriptors, &RESOLVER).with_sink(&sink);

    let event = builder.build(&foreground());

    assert!(event.is_valid());
    assert!(event.is_keyboard());
    assert!(event.usages().is_empty());
    assert_eq!(event.usage_page(), 0);
    assert_eq!(event.usage_collection(), 0);
    assert_eq!(event.keyboard(), Some(&caps));
    assert!(sink.contains("keys total 264"));
    assert_eq!(descriptors.acquired.get(), 0);
}

#[test]
fn mouse_records_kind_only() {
    let image = encode_raw_input(
        EnvelopeLayout::default(),
        RawDeviceType::Mouse,
        DEVICE,
        1,
        &[0u8; 24],
   )
    .unwrap();
    let platform = Platform::new(image, DeviceInfo::Mouse(MouseInfo::default()));
    let descriptors = Descriptors::default();
    let builder = HidEventBuilder::new(&platform, &platform, &descriptors, &RESOLVER);

    let event = builder.build(&Notification::raw_input(Delivery::Background, 1));

    assert!(event.is_valid());
    assert!(event.is_mouse());
    assert!(event.is_background());
    assert!(event.usages().is_empty());
    assert!(event.keyboard().is_none());
}

#[test]
fn unknown_device_type_is_invalid() {
    let image = encode_raw_input(
        EnvelopeLayout::default(),
        RawDeviceType::Unknown(9),
        DEVICE,
        0,
        &[],
   )
    .unwrap();
    let platform = Platform::new(image, hid_info());
    let descriptors = Descriptors::default();
    let builder = HidEventBuilder::new(&platform, &platform, &descriptors, &RESOLVER);

    let event = builder.build(&foreground());

    assert!(!event.is_valid());
    assert_eq!(event.kind(), DeviceKind::Unknown);
    assert!(event.usages().is_empty());
}

// ── Rejection and missing prerequisites ──

#[test]
fn non_raw_input_notification_makes_no_calls() {
    let platform = Platform::new(hid_image(3, 1, &[0x01, 0xE9, 0x00]), hid_info());
    let descriptors = Descriptors::default();
    let sink = MemorySink::new();
    let builder =
        HidEventBuilder::new(&platform, &platform, &descriptors, &RESOLVER).with_sink(&sink);

    let event = builder.build(&Notification {
        message: wm::INPUT + 1,
        wparam: 0,
        lparam: 0x1234,
    });

    assert!(!event.is_valid());
    assert_eq!(
        sink.lines(),
        vec!["Ignoring notification: Not a raw input notification: message 0x0100"]
    );
    assert_eq!(platform.raw_calls.get(), 0);
    assert_eq!(platform.info_calls.get(), 0);
    assert_eq!(descriptors.acquired.get(), 0);
}

#[test]
fn missing_raw_input_is_invalid() {
    let platform = Platform {
        info: Some(hid_info()),
        ..Default::default()
    };
    let descriptors = Descriptors::default();
    let builder = HidEventBuilder::new(&platform, &platform, &descriptors, &RESOLVER);

    let event = builder.build(&foreground());

    assert!(!event.is_valid());
    assert!(event.is_foreground());
    assert_eq!(platform.info_calls.get(), 0);
}

#[test]
fn missing_device_info_is_invalid_and_releases_buffer() {
    let platform = Platform {
        image: Some(hid_image(3, 1, &[0x01, 0xE9, 0x00])),
        ..Default::default()
    };
    let descriptors = Descriptors::default();
    let sink = MemorySink::new();
    let builder =
        HidEventBuilder::new(&platform, &platform, &descriptors, &RESOLVER).with_sink(&sink);

    let event = builder.build(&foreground());

    assert!(!event.is_valid());
    assert!(event.device().is_none());
    assert!(sink.contains("device info unavailable"));
    assert_eq!(platform.buffers_released.get(), 1);
    assert_eq!(descriptors.acquired.get(), 0);
}

#[test]
fn truncated_image_is_invalid() {
    let mut image = hid_image(3, 1, &[0x01, 0xE9, 0x00]);
    image.truncate(20);
    let platform = Platform::new(image, hid_info());
    let descriptors = Descriptors::default();
    let builder = HidEventBuilder::new(&platform, &platform, &descriptors, &RESOLVER);

    let event = builder.build(&foreground());

    assert!(!event.is_valid());
    assert_eq!(platform.info_calls.get(), 0);
}

#[test]
fn unrecognised_delivery_code_is_background() {
    let platform = Platform::new(hid_image(3, 1, &[0x01, 0xE9, 0x00]), hid_info());
    let descriptors = Descriptors::default();
    let builder = HidEventBuilder::new(&platform, &platform, &descriptors, &RESOLVER);

    let event = builder.build(&Notification {
        message: wm::INPUT,
        wparam: 0x07,
        lparam: 1,
    });

    assert!(event.is_valid());
    assert!(event.is_background());
}

#[test]
fn builder_is_reusable_across_notifications() {
    let platform = Platform::new(hid_image(3, 1, &[0x01, 0xE9, 0x00]), hid_info());
    let descriptors = Descriptors::default();
    let builder = HidEventBuilder::new(&platform, &platform, &descriptors, &RESOLVER);

    let first = builder.build(&foreground());
    let second = builder.build(&foreground());

    assert_eq!(first, second);
    assert_eq!(descriptors.acquired.get(), 2);
    assert_eq!(descriptors.released.get(), 2);
    assert_eq!(platform.buffers_released.get(), 2);
}

// ── Diagnostics ──

struct BrokenPipe;

impl std::io::Write for BrokenPipe {
    fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
        Err(std::io::ErrorKind::BrokenPipe.into())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Err(std::io::ErrorKind::BrokenPipe.into())
    }
}

#[test]
fn failing_sink_does_not_change_the_event() {
    let payload = [0x01, 0x30, 0x00, 0x01, 0xFF, 0xFF, 0x01, 0x31, 0x00];
    let platform = Platform::new(hid_image(3, 3, &payload), hid_info());
    let descriptors = Descriptors::default();

    let memory = MemorySink::new();
    let expected = HidEventBuilder::new(&platform, &platform, &descriptors, &RESOLVER)
        .with_sink(&memory)
        .build(&foreground());

    let broken = WriterSink::new(BrokenPipe);
    let event = HidEventBuilder::new(&platform, &platform, &descriptors, &RESOLVER)
        .with_sink(&broken)
        .build(&foreground());

    assert!(!memory.lines().is_empty());
    assert_eq!(event, expected);
    assert_eq!(event.usages(), &[0x0030, 0x0031]);
    assert_eq!(descriptors.acquired.get(), 2);
    assert_eq!(descriptors.released.get(), 2);
}
