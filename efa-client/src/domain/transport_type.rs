//! Transport mode codes.

use std::fmt;

use serde::Serialize;

/// Means of transport, as encoded by the EFA `productClasses` and
/// `product.class` fields.
///
/// The code table is closed: a code outside 0-10 has no fallback variant.
///
/// # Examples
///
/// ```
/// use efa_client::domain::TransportType;
///
/// assert_eq!(TransportType::from_code(2), Some(TransportType::Subway));
/// assert_eq!(TransportType::Subway.code(), 2);
/// assert_eq!(TransportType::from_code(11), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportType {
    Rail,
    SuburbanRail,
    Subway,
    CityRail,
    Tram,
    Bus,
    RegionalBus,
    ExpressBus,
    CableTram,
    Ferry,
    CallTaxi,
}

/// Wire codes, indexed by position.
const CODES: [TransportType; 11] = [
    TransportType::Rail,
    TransportType::SuburbanRail,
    TransportType::Subway,
    TransportType::CityRail,
    TransportType::Tram,
    TransportType::Bus,
    TransportType::RegionalBus,
    TransportType::ExpressBus,
    TransportType::CableTram,
    TransportType::Ferry,
    TransportType::CallTaxi,
];

impl TransportType {
    /// All transport types in code order.
    pub const ALL: [TransportType; 11] = CODES;

    /// Look up the transport type for a server code.
    pub fn from_code(code: i64) -> Option<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|idx| CODES.get(idx))
            .copied()
    }

    /// The numeric code the server uses for this transport type.
    pub fn code(self) -> u8 {
        match self {
            TransportType::Rail => 0,
            TransportType::SuburbanRail => 1,
            TransportType::Subway => 2,
            TransportType::CityRail => 3,
            TransportType::Tram => 4,
            TransportType::Bus => 5,
            TransportType::RegionalBus => 6,
            TransportType::ExpressBus => 7,
            TransportType::CableTram => 8,
            TransportType::Ferry => 9,
            TransportType::CallTaxi => 10,
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            TransportType::Rail => "rail",
            TransportType::SuburbanRail => "suburban rail",
            TransportType::Subway => "subway",
            TransportType::CityRail => "city rail",
            TransportType::Tram => "tram",
            TransportType::Bus => "bus",
            TransportType::RegionalBus => "regional bus",
            TransportType::ExpressBus => "express bus",
            TransportType::CableTram => "cable tram",
            TransportType::Ferry => "ferry",
            TransportType::CallTaxi => "call taxi",
        }
    }
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
