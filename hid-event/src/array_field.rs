//! Usage resolution for selector-array input fields
//!
//! Consumer-control remotes, keypads and similar devices report the active
//! control as an index into a usage range:
//!
//! ```text
//! [report_id] [index_lo] [index_hi]     e.g. 01 E9 00 -> Consumer/Volume Up
//! ```
//!
//! An [`ArrayField`] describes one such field: which report carries it, where
//! the index sits, and which usage range it selects from. A device's input
//! fields form its [`UsageArrayDescriptor`].

use serde::{Deserialize, Serialize};

use crate::error::HidError;
use crate::resolver::UsageResolver;
use crate::types::{ReportType, UsageAndPage};

/// Width of the index stored in a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldSize {
    #[default]
    U8,
    U16,
}

impl FieldSize {
    pub fn bytes(&self) -> usize {
        match self {
            FieldSize::U8 => 1,
            FieldSize::U16 => 2,
        }
    }
}

/// One selector-array input field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayField {
    /// Report id in the first report byte, `None` if the device uses no ids
    #[serde(default)]
    pub report_id: Option<u8>,
    pub usage_page: u16,
    pub usage_min: u16,
    pub usage_max: u16,
    /// Index value mapping to `usage_min`; smaller values mean "nothing pressed"
    #[serde(default = "default_logical_min")]
    pub logical_min: u16,
    /// Offset of the index within the report (including the report id byte)
    pub byte_offset: usize,
    #[serde(default)]
    pub size: FieldSize,
}

fn default_logical_min() -> u16 {
    1
}

impl ArrayField {
    fn matches(&self, report: &[u8]) -> bool {
        match self.report_id {
            Some(id) => report.first() == Some(&id),
            None => true,
        }
    }

    /// Read the usage selected in `report`.
    ///
    /// `Ok(None)` is the null state (index below `logical_min`).
    pub fn read(&self, report: &[u8]) -> Result<Option<UsageAndPage>, HidError> {
        let end = self.byte_offset.saturating_add(self.size.bytes());
        let raw = report.get(self.byte_offset..end).ok_or_else(|| {
            HidError::parse(format!(
                "report is {} bytes, field needs {end}",
                report.len()
            ))
        })?;
        let index = match self.size {
            FieldSize::U8 => raw[0] as u16,
            FieldSize::U16 => u16::from_le_bytes([raw[0], raw[1]]),
        };

        if index < self.logical_min {
            return Ok(None);
        }

        let usage = (index - self.logical_min) as u32 + self.usage_min as u32;
        if usage > self.usage_max as u32 {
            return Err(HidError::parse(format!(
                "index {index} selects usage 0x{usage:X} beyond 0x{:04X}",
                self.usage_max
            )));
        }

        Ok(Some(UsageAndPage::new(self.usage_page, usage as u16)))
    }
}

/// Input fields of one device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageArrayDescriptor {
    pub fields: Vec<ArrayField>,
}

impl UsageArrayDescriptor {
    pub fn new(fields: Vec<ArrayField>) -> Self {
        Self { fields }
    }
}

/// [`UsageResolver`] over [`UsageArrayDescriptor`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayFieldResolver;

impl UsageResolver<UsageArrayDescriptor> for ArrayFieldResolver {
    fn resolve(
        &self,
        descriptor: &UsageArrayDescriptor,
        report_type: ReportType,
        report: &[u8],
        max_usages: usize,
    ) -> Result<Vec<UsageAndPage>, HidError> {
        if report_type != ReportType::Input {
            return Err(HidError::parse(format!(
                "{report_type:?} reports are not described"
            )));
        }

        let mut fields = descriptor.fields.iter().filter(|f| f.matches(report)).peekable();
        if fields.peek().is_none() {
            return Err(HidError::parse(match report.first() {
                Some(id) => format!("no input field for report id 0x{id:02X}"),
                None => "empty report".to_string(),
            }));
        }

        let mut usages = Vec::new();
        for field in fields {
            if usages.len() >= max_usages {
                break;
            }
            if let Some(usage) = field.read(report)? {
                usages.push(usage);
            }
        }
        Ok(usages)
    }
}
