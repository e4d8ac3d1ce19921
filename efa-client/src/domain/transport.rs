//! Transit lines and routes.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use super::{Location, TransportType};

/// A line (route variant) as returned by the line operations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transport {
    /// Structured line id (operator, line, variant and timetable period),
    /// treated as opaque, e.g. `"van:02067: :H:j24"`.
    pub id: String,

    /// Short line label, e.g. `"U1"` or `"67"`.
    pub name: String,

    /// Long-form route description, usually "origin - destination".
    pub description: String,

    pub product: TransportType,

    pub destination: Option<Location>,

    /// Never set by the line searches: the server does not report an
    /// origin for serving lines.
    pub origin: Option<Location>,

    pub operator: Option<Operator>,

    /// Extra server attributes, passed through untouched.
    pub properties: Map<String, Value>,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.product, self.name)?;
        if let Some(dest) = &self.destination {
            write!(f, " → {}", dest.name)?;
        }
        Ok(())
    }
}

/// The company operating a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Operator {
    pub code: Option<String>,
    pub id: Option<String>,
    pub name: Option<String>,
}

/// Which timetable products a line search should consider (`lineReqType`).
///
/// Like [`LocationFilter`](super::LocationFilter), these are bit flags sent
/// as their bitwise OR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineRequestType {
    None,
    DepartureMonitor,
    StopTimetable,
    Timetable,
    RouteMaps,
    StationTimetable,
}

impl LineRequestType {
    /// The flag value of this request type.
    pub fn bits(self) -> u8 {
        match self {
            LineRequestType::None => 0,
            LineRequestType::DepartureMonitor => 1,
            LineRequestType::StopTimetable => 2,
            LineRequestType::Timetable => 4,
            LineRequestType::RouteMaps => 8,
            LineRequestType::StationTimetable => 16,
        }
    }

    /// Combine request types into a single flag value.
    pub fn combine(types: &[LineRequestType]) -> u8 {
        types.iter().fold(0, |acc, t| acc | t.bits())
    }
}
