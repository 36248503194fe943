// hid-decode - capture replay, configuration and output for raw-input HID decoding

pub mod config;
pub mod hex;
pub mod printer;
pub mod replay;

pub use config::{ConfigError, DecoderConfig, OutputConfig, Overrides};
pub use hex::{parse_hex, HexError};
pub use printer::{OutputFormat, Printer};
pub use replay::{Capture, ReplayError, ReplayRecord, ReplaySession};
