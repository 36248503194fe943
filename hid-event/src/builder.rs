//! Notification → [`HidEvent`] decoding
//!
//! ```text
//! Start ──► Classified ──► (Extracting ──► Accumulating)* ──► Finalized
//!   │            │                                              ▲
//!   └────────────┴──────────────► Invalid ◄─────────────────────┘ (unknown kind)
//! ```
//!
//! Per-report problems (`ParseFailure`, `OutOfBounds`) degrade the event to a
//! partial result. Only a missing envelope or missing device info makes the
//! event invalid.

use tracing::trace;

use crate::descriptor::{DescriptorGuard, DescriptorProvider};
use crate::diagnostics::{DiagnosticSink, HexDump, TracingSink};
use crate::envelope::{EnvelopeLayout, RawEnvelope};
use crate::error::HidError;
use crate::event::{EventDraft, HidEvent};
use crate::resolver::{resolve_single, UsageResolver};
use crate::source::{DeviceInfoSource, RawInputSource};
use crate::types::{Delivery, DeviceInfo, DeviceKind, HidDevice, Notification, RawDeviceType};

static TRACING_SINK: TracingSink = TracingSink;

/// Decodes raw input notifications using the supplied collaborators.
///
/// The builder holds only shared references and configuration, so one
/// instance can decode any number of notifications; no state carries over
/// from one call to the next.
pub struct HidEventBuilder<'a, S, I, P, R> {
    raw_input: &'a S,
    device_info: &'a I,
    descriptors: &'a P,
    resolver: &'a R,
    sink: &'a dyn DiagnosticSink,
    layout: EnvelopeLayout,
}

impl<'a, S, I, P, R> HidEventBuilder<'a, S, I, P, R>
where
    S: RawInputSource,
    I: DeviceInfoSource,
    P: DescriptorProvider,
    R: UsageResolver<P::Descriptor>,
{
    /// Create a builder tracing to [`TracingSink`] with the 64-bit layout
    pub fn new(
        raw_input: &'a S,
        device_info: &'a I,
        descriptors: &'a P,
        resolver: &'a R,
    ) -> Self {
        Self {
            raw_input,
            device_info,
            descriptors,
            resolver,
            sink: &TRACING_SINK,
            layout: EnvelopeLayout::default(),
        }
    }

    pub fn with_sink(mut self, sink: &'a dyn DiagnosticSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_layout(mut self, layout: EnvelopeLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Decode one notification.
    ///
    /// Never fails: problems are expressed through [`HidEvent::is_valid`],
    /// a partial usage list and diagnostic lines.
    pub fn build(&self, notification: &Notification) -> HidEvent {
        if !notification.is_raw_input() {
            let err = HidError::NotApplicable {
                message: notification.message,
            };
            self.sink.line(format_args!("Ignoring notification: {err}"));
            return HidEvent::invalid(false, None);
        }

        let foreground = matches!(
            Delivery::from_wparam(notification.wparam),
            Some(Delivery::Foreground)
        );

        match self.classify(notification, foreground) {
            Ok(event) => event,
            Err(err) => {
                self.sink.line(format_args!("Invalid event: {err}"));
                HidEvent::invalid(foreground, None)
            }
        }
    }

    fn classify(
        &self,
        notification: &Notification,
        foreground: bool,
    ) -> Result<HidEvent, HidError> {
        // Owned for this call only; dropped (released) on every return path
        let buffer = self.raw_input.fetch_raw_input(notification)?;
        let envelope = RawEnvelope::parse(buffer.as_ref(), self.layout)?;
        let info = self.device_info.fetch_device_info(envelope.device())?;

        let mut draft = EventDraft::new(
            foreground,
            HidDevice {
                handle: envelope.device(),
                info,
            },
        );

        match envelope.device_type() {
            RawDeviceType::Generic => {
                draft.kind = DeviceKind::Generic;
                self.sink.line(format_args!("Source device is HID"));
                self.extract_usages(&envelope, &info, &mut draft);
            }
            RawDeviceType::Mouse => {
                draft.kind = DeviceKind::Mouse;
                self.sink.line(format_args!("Source device is a mouse"));
            }
            RawDeviceType::Keyboard => {
                draft.kind = DeviceKind::Keyboard;
                self.sink.line(format_args!("Source device is a keyboard"));
                match info.keyboard() {
                    Some(kb) => {
                        self.sink.line(format_args!(
                            "Keyboard type {} subtype {} mode {}",
                            kb.keyboard_type, kb.sub_type, kb.mode
                        ));
                        self.sink.line(format_args!(
                            "Function keys {} indicators {} keys total {}",
                            kb.function_keys, kb.indicators, kb.keys_total
                        ));
                        draft.keyboard = Some(*kb);
                    }
                    None => self
                        .sink
                        .line(format_args!("Device info carries no keyboard capabilities")),
                }
            }
            RawDeviceType::Unknown(tag) => {
                self.sink
                    .line(format_args!("Unrecognised source device type {tag}"));
            }
        }

        Ok(draft.finish())
    }

    fn extract_usages(
        &self,
        envelope: &RawEnvelope<'_>,
        info: &DeviceInfo,
        draft: &mut EventDraft,
    ) {
        match info.hid() {
            Some(hid) => {
                draft.usage_page = hid.usage_page;
                draft.usage_collection = hid.usage;
                self.sink.line(format_args!(
                    "Usage page 0x{:04X} usage 0x{:04X}",
                    hid.usage_page, hid.usage
                ));
            }
            None => self
                .sink
                .line(format_args!("Device info carries no HID usage")),
        }

        if !envelope.has_report_data() {
            self.sink.line(format_args!(
                "No report data (size {}, count {})",
                envelope.report_size(),
                envelope.report_count()
            ));
            return;
        }

        let descriptor = match DescriptorGuard::acquire(self.descriptors, envelope.device()) {
            Ok(guard) => guard,
            Err(err) => {
                self.sink.line(format_args!("Cannot decode reports: {err}"));
                return;
            }
        };

        self.sink.line(format_args!(
            "Raw input contains {} HID input report(s)",
            envelope.report_count()
        ));

        for (index, report) in envelope.reports().enumerate() {
            let report = match report {
                Ok(report) => report,
                Err(err) => {
                    self.sink.line(format_args!("Stopping extraction: {err}"));
                    break;
                }
            };
            self.sink
                .line(format_args!("HID input report {index}: {}", HexDump(report)));

            match resolve_single(self.resolver, &*descriptor, report) {
                Ok(Some(usage)) => {
                    trace!(
                        index,
                        usage_page = usage.usage_page,
                        usage = usage.usage,
                        "Resolved usage"
                    );
                    draft.usages.push(usage.usage);
                }
                Ok(None) => self
                    .sink
                    .line(format_args!("Report {index} asserts no usage")),
                Err(err) => self
                    .sink
                    .line(format_args!("Could not parse report {index}: {err}")),
            }
        }
    }
}
