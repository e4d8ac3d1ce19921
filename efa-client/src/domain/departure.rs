//! Departure monitor entries.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Location, Transport};

/// One departure of a line from a stop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Departure {
    /// Stop point the line leaves from, usually a platform of the requested stop.
    pub location: Location,
    pub line: Transport,
    /// Timetabled departure.
    pub planned: DateTime<Utc>,
    /// Realtime estimate, if the vehicle is tracked.
    pub estimated: Option<DateTime<Utc>>,
    /// Platform label as shown to passengers.
    pub platform: Option<String>,
    /// Whether the server has realtime data for this trip.
    pub realtime: bool,
}

impl Departure {
    /// Best known departure time: the estimate if there is one.
    pub fn expected(&self) -> DateTime<Utc> {
        self.estimated.unwrap_or(self.planned)
    }

    /// Delay in whole minutes. `None` without an estimate.
    pub fn delay_minutes(&self) -> Option<i64> {
        self.estimated.map(|e| (e - self.planned).num_minutes())
    }
}

impl fmt::Display for Departure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.planned.format("%H:%M"), self.line)?;
        if let Some(platform) = &self.platform {
            write!(f, " [{platform}]")?;
        }
        match self.delay_minutes() {
            Some(delay) if delay != 0 => write!(f, " ({delay:+})"),
            _ => Ok(()),
        }
    }
}
