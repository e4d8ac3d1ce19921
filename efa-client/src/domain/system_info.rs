//! Server instance metadata.

use chrono::NaiveDate;
use serde::Serialize;

/// Metadata describing the remote EFA instance and its timetable data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemInfo {
    /// Interface version.
    pub version: String,
    /// Version of the timetable kernel.
    pub app_version: String,
    /// Data format identifier, e.g. `"EFA10_04_00"`.
    pub data_format: String,
    /// Build tag of the loaded timetable data.
    pub data_build: String,
    /// First day of the timetable validity period.
    pub valid_from: NaiveDate,
    /// Last day of the timetable validity period. The server does not
    /// guarantee this is on or after `valid_from`.
    pub valid_to: NaiveDate,
}

impl SystemInfo {
    /// Whether `date` falls inside the validity period.
    ///
    /// An inverted period contains no dates.
    pub fn is_valid_on(&self, date: NaiveDate) -> bool {
        self.valid_from <= date && date <= self.valid_to
    }
}
