//! Async client for EFA transit open-data endpoints.
//!
//! Search stops and places by name or coordinate, look up the lines
//! serving a stop, list a network's lines, watch a stop's departures and
//! read instance metadata.
//! Responses are validated before conversion, so a changed server format
//! shows up as a [`ValidationError`] naming the offending field rather than
//! as silently missing data.

pub mod domain;
pub mod efa;

pub use domain::{
    Coord, CoordFormat, Departure, LineRequestType, Location, LocationFilter, LocationType,
    Operator, SystemInfo, Transport, TransportType,
};
pub use efa::{
    DepartureOptions, EfaClient, EfaConfig, EfaError, LineOptions, LineRef, SearchOptions, StopRef,
    TransportError, ValidationError,
};
