//! Locations: stops, platforms, addresses and other named places.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use super::TransportType;

/// Kind of a location as reported by the server's `type` field.
///
/// Matching is case-insensitive and anything the server sends outside the
/// known set becomes [`LocationType::Unknown`]; EFA instances emit extra
/// type strings (`singlehouse`, `gis`, ...) that callers rarely care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationType {
    Stop,
    Poi,
    Address,
    Street,
    Locality,
    Suburb,
    Platform,
    Unknown,
}

impl LocationType {
    /// Map a server type string to a location type, falling back to `Unknown`.
    ///
    /// ```
    /// use efa_client::domain::LocationType;
    ///
    /// assert_eq!(LocationType::from_code("Stop"), LocationType::Stop);
    /// assert_eq!(LocationType::from_code("singlehouse"), LocationType::Unknown);
    /// ```
    pub fn from_code(code: &str) -> Self {
        const TABLE: [(&str, LocationType); 8] = [
            ("stop", LocationType::Stop),
            ("poi", LocationType::Poi),
            ("address", LocationType::Address),
            ("street", LocationType::Street),
            ("locality", LocationType::Locality),
            ("suburb", LocationType::Suburb),
            ("platform", LocationType::Platform),
            ("unknown", LocationType::Unknown),
        ];

        TABLE
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(code))
            .map_or(LocationType::Unknown, |(_, ty)| *ty)
    }

    /// The server's string code.
    pub fn as_str(self) -> &'static str {
        match self {
            LocationType::Stop => "stop",
            LocationType::Poi => "poi",
            LocationType::Address => "address",
            LocationType::Street => "street",
            LocationType::Locality => "locality",
            LocationType::Suburb => "suburb",
            LocationType::Platform => "platform",
            LocationType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for LocationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category restriction for location searches (`anyObjFilter_sf`).
///
/// Filters are bit flags; a set of them is sent as their bitwise OR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationFilter {
    NoFilter,
    Locations,
    Stops,
    Streets,
    Addresses,
    Crossings,
    Pois,
    PostCodes,
}

impl LocationFilter {
    /// Every filter, `NoFilter` first.
    pub const ALL: [LocationFilter; 8] = [
        LocationFilter::NoFilter,
        LocationFilter::Locations,
        LocationFilter::Stops,
        LocationFilter::Streets,
        LocationFilter::Addresses,
        LocationFilter::Crossings,
        LocationFilter::Pois,
        LocationFilter::PostCodes,
    ];

    /// The flag value of this filter.
    pub fn bits(self) -> u8 {
        match self {
            LocationFilter::NoFilter => 0,
            LocationFilter::Locations => 1,
            LocationFilter::Stops => 2,
            LocationFilter::Streets => 4,
            LocationFilter::Addresses => 8,
            LocationFilter::Crossings => 16,
            LocationFilter::Pois => 32,
            LocationFilter::PostCodes => 64,
        }
    }

    /// Combine a set of filters into the single integer the server expects.
    pub fn combine(filters: &[LocationFilter]) -> u8 {
        filters.iter().fold(0, |acc, f| acc | f.bits())
    }
}

/// Coordinate reference the server should assume for coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CoordFormat {
    /// WGS84, decimal degrees.
    #[default]
    Wgs84,
}

impl CoordFormat {
    /// Wire code of the format.
    pub fn as_str(self) -> &'static str {
        match self {
            CoordFormat::Wgs84 => "WGS84[dd.ddddd]",
        }
    }
}

impl fmt::Display for CoordFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A coordinate pair in the order the server reports it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

/// A named place known to the EFA server.
///
/// Locations form a tree: a stop owns its member platforms through
/// [`Location::stops`], and a location may carry a description of the
/// place that contains it in [`Location::parent`]. Both are parsed from
/// nested JSON objects, so the structure can never be cyclic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    /// Display name.
    pub name: String,

    pub loc_type: LocationType,

    /// Identifier in the server's own scheme. Opaque; may be empty for
    /// embedded references where the server omits it.
    pub id: String,

    pub coord: Option<Coord>,

    /// Transport types serving this location, in server order, without
    /// duplicates.
    pub transports: Vec<TransportType>,

    /// The place this location belongs to (e.g. the locality of a stop).
    pub parent: Option<Box<Location>>,

    /// Child locations (e.g. platforms of a stop area).
    pub stops: Vec<Location>,

    /// Extra server attributes, passed through untouched.
    pub properties: Map<String, Value>,

    pub disassembled_name: Option<String>,

    /// Search relevance, higher is better.
    pub match_quality: i64,
}

impl Location {
    /// Whether this location is a stop, the only type serving-line lookups accept.
    pub fn is_stop(&self) -> bool {
        self.loc_type == LocationType::Stop
    }

    /// Whether the location carries a usable identifier.
    pub fn has_id(&self) -> bool {
        !self.id.trim().is_empty()
    }

    /// Walk the parent chain, nearest first.
    pub fn ancestors(&self) -> impl Iterator<Item = &Location> {
        std::iter::successors(self.parent.as_deref(), |loc| loc.parent.as_deref())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.name, self.loc_type, self.id)
    }
}
