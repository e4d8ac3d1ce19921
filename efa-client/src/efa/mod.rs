//! EFA open-data client.
//!
//! This module provides an HTTP client for EFA ("Elektronische
//! Fahrplanauskunft") journey-planner instances, as run by many German and
//! Austrian transit authorities.
//!
//! Key characteristics of EFA:
//! - Every operation is a GET to a fixed `XML_*_REQUEST` path, with
//!   `outputFormat=rapidJSON` selecting the JSON dialect
//! - Search results carry a `matchQuality`; the server does not sort by it
//!   and ignores result limits, so both happen client-side
//! - The departure monitor (`XML_DM_REQUEST`) is the one endpoint that
//!   honours a server-side `limit`
//! - Responses are shape-checked against a per-endpoint schema before any
//!   field is converted

mod client;
mod error;
mod parse;
mod request;
mod schema;

pub use client::{EfaClient, EfaConfig};
pub use error::{EfaError, TransportError};
pub use parse::{
    parse_departure, parse_departures, parse_location, parse_locations, parse_system_info,
    parse_transport, parse_transports,
};
pub use request::{
    DEFAULT_COORD_LIMIT, DEFAULT_DEPARTURE_LIMIT, DEFAULT_NAME_LIMIT, DepartureOptions, Endpoint,
    LineOptions, LineRef, Query, SearchOptions, StopRef, build_departures, build_info,
    build_line_list, build_line_stops, build_lines_by_location, build_lines_by_name,
    build_locations_by_coord, build_locations_by_name,
};
pub use schema::{FieldSpec, Kind, MAX_DEPTH, Nested, SchemaId, ValidationError, validate};
