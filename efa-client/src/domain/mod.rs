//! Domain types for EFA transit data.
//!
//! These are the values handed to callers after a response has passed
//! shape validation and conversion. Enumerations are closed where the
//! server's code tables are closed.

mod departure;
mod location;
mod system_info;
mod transport;
mod transport_type;

pub use departure::Departure;
pub use location::{Coord, CoordFormat, Location, LocationFilter, LocationType};
pub use system_info::SystemInfo;
pub use transport::{LineRequestType, Operator, Transport};
pub use transport_type::TransportType;
