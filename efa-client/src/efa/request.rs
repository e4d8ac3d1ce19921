//! Query construction for each EFA operation.
//!
//! Builders are pure: the same arguments always produce the same
//! parameters in the same order. Every query starts with the dialect
//! parameters that select rapidJSON output and WGS84 coordinates; callers
//! cannot override them.

use std::fmt;

use chrono::NaiveDateTime;

use crate::domain::{CoordFormat, LineRequestType, Location, LocationFilter, Transport};

use super::error::EfaError;
use super::schema::SchemaId;

/// Output dialect this client understands.
const OUTPUT_FORMAT: &str = "rapidJSON";

/// Default number of results for a name search.
pub const DEFAULT_NAME_LIMIT: usize = 30;

/// Default number of results for a coordinate search.
pub const DEFAULT_COORD_LIMIT: usize = 10;

/// Default number of departures.
pub const DEFAULT_DEPARTURE_LIMIT: usize = 40;

/// Remote endpoint of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    SystemInfo,
    StopFinder,
    ServingLines,
    LineList,
    LineStop,
    Departures,
}

impl Endpoint {
    /// Path segment appended to the base URL.
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::SystemInfo => "XML_SYSTEMINFO_REQUEST",
            Endpoint::StopFinder => "XML_STOPFINDER_REQUEST",
            Endpoint::ServingLines => "XML_SERVINGLINES_REQUEST",
            Endpoint::LineList => "XML_LINELIST_REQUEST",
            Endpoint::LineStop => "XML_LINESTOP_REQUEST",
            Endpoint::Departures => "XML_DM_REQUEST",
        }
    }

    /// Expected shape of the response root.
    pub fn schema(self) -> SchemaId {
        match self {
            Endpoint::SystemInfo => SchemaId::SystemInfo,
            Endpoint::StopFinder => SchemaId::StopFinder,
            Endpoint::ServingLines => SchemaId::ServingLines,
            Endpoint::LineList => SchemaId::LineList,
            Endpoint::LineStop => SchemaId::LineStop,
            Endpoint::Departures => SchemaId::Departures,
        }
    }
}

/// A request ready to send: endpoint plus ordered query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    endpoint: Endpoint,
    params: Vec<(&'static str, String)>,
    limit: Option<usize>,
}

impl Query {
    fn new(endpoint: Endpoint) -> Self {
        let mut query = Self {
            endpoint,
            params: Vec::new(),
            limit: None,
        };
        query.push("outputFormat", OUTPUT_FORMAT);
        query.push("coordOutputFormat", CoordFormat::Wgs84.as_str());
        query
    }

    fn push(&mut self, key: &'static str, value: impl ToString) {
        self.params.push((key, value.to_string()));
    }

    fn push_flag(&mut self, key: &'static str, value: bool) {
        self.push(key, if value { "1" } else { "0" });
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    /// Query parameters in send order.
    pub fn params(&self) -> &[(&'static str, String)] {
        &self.params
    }

    /// Value of a parameter, if set.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Maximum number of results to hand back to the caller.
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.endpoint.path())?;
        for (idx, (key, value)) in self.params.iter().enumerate() {
            let sep = if idx == 0 { '?' } else { '&' };
            write!(f, "{sep}{key}={value}")?;
        }
        Ok(())
    }
}

/// Options for location searches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOptions {
    /// Categories to restrict the search to. Empty means unrestricted.
    pub filters: Vec<LocationFilter>,
    /// Maximum number of results; `None` uses the operation's default.
    pub limit: Option<usize>,
    /// Also return stops near matching addresses and POIs.
    pub search_nearby_stops: bool,
}

impl SearchOptions {
    pub fn with_filter(mut self, filter: LocationFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_nearby_stops(mut self, enabled: bool) -> Self {
        self.search_nearby_stops = enabled;
        self
    }

    fn resolve_limit(&self, default: usize) -> Result<usize, EfaError> {
        resolve_limit(self.limit, default)
    }
}

fn resolve_limit(limit: Option<usize>, default: usize) -> Result<usize, EfaError> {
    match limit {
        Some(0) => Err(EfaError::invalid_argument("limit must be at least 1")),
        Some(n) => Ok(n),
        None => Ok(default),
    }
}

/// Options for line searches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineOptions {
    /// Report both directions of a line as one entry.
    pub merge_directions: bool,
    /// List trains individually instead of grouping them.
    pub show_trains_explicit: bool,
    /// Timetable products to consider. Empty means server default.
    pub request_types: Vec<LineRequestType>,
}

impl LineOptions {
    pub fn with_merged_directions(mut self, enabled: bool) -> Self {
        self.merge_directions = enabled;
        self
    }

    pub fn with_trains_explicit(mut self, enabled: bool) -> Self {
        self.show_trains_explicit = enabled;
        self
    }

    pub fn with_request_type(mut self, request_type: LineRequestType) -> Self {
        self.request_types.push(request_type);
        self
    }

    fn apply(&self, query: &mut Query) {
        query.push_flag("mergeDir", self.merge_directions);
        query.push_flag("lsShowTrainsExplicit", self.show_trains_explicit);
        let req_type = LineRequestType::combine(&self.request_types);
        if req_type != 0 {
            query.push("lineReqType", req_type);
        }
    }
}

/// Options for the departure monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartureOptions {
    /// Maximum number of departures; `None` uses [`DEFAULT_DEPARTURE_LIMIT`].
    pub limit: Option<usize>,
    /// Local date and time to list departures from. `None` means now.
    pub at: Option<NaiveDateTime>,
    /// Ask for realtime estimates.
    pub realtime: bool,
}

impl Default for DepartureOptions {
    fn default() -> Self {
        Self {
            limit: None,
            at: None,
            realtime: true,
        }
    }
}

impl DepartureOptions {
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_time(mut self, at: NaiveDateTime) -> Self {
        self.at = Some(at);
        self
    }

    pub fn with_realtime(mut self, enabled: bool) -> Self {
        self.realtime = enabled;
        self
    }
}

/// A stop given either by id or as a previously returned location.
#[derive(Debug, Clone, Copy)]
pub enum StopRef<'a> {
    Id(&'a str),
    Location(&'a Location),
}

impl<'a> From<&'a str> for StopRef<'a> {
    fn from(id: &'a str) -> Self {
        StopRef::Id(id)
    }
}

impl<'a> From<&'a String> for StopRef<'a> {
    fn from(id: &'a String) -> Self {
        StopRef::Id(id)
    }
}

impl<'a> From<&'a Location> for StopRef<'a> {
    fn from(location: &'a Location) -> Self {
        StopRef::Location(location)
    }
}

impl StopRef<'_> {
    fn id(&self) -> Result<&str, EfaError> {
        let id = match self {
            StopRef::Id(id) => *id,
            StopRef::Location(loc) if !loc.has_id() => {
                return Err(EfaError::invalid_argument(format!(
                    "location {:?} has no id",
                    loc.name
                )));
            }
            StopRef::Location(loc) => loc.id.as_str(),
        };
        non_empty("stop id", id)
    }

    /// Like [`id`](Self::id), but a location must also be of type stop.
    fn stop_id(&self) -> Result<&str, EfaError> {
        if let StopRef::Location(loc) = self {
            if !loc.is_stop() {
                return Err(EfaError::invalid_argument(format!(
                    "only locations of type stop are supported, {:?} is a {}",
                    loc.name, loc.loc_type
                )));
            }
        }
        self.id()
    }
}

/// A line given either by id or as a previously returned transport.
#[derive(Debug, Clone, Copy)]
pub enum LineRef<'a> {
    Id(&'a str),
    Transport(&'a Transport),
}

impl<'a> From<&'a str> for LineRef<'a> {
    fn from(id: &'a str) -> Self {
        LineRef::Id(id)
    }
}

impl<'a> From<&'a String> for LineRef<'a> {
    fn from(id: &'a String) -> Self {
        LineRef::Id(id)
    }
}

impl<'a> From<&'a Transport> for LineRef<'a> {
    fn from(line: &'a Transport) -> Self {
        LineRef::Transport(line)
    }
}

fn non_empty<'a>(what: &str, value: &'a str) -> Result<&'a str, EfaError> {
    if value.trim().is_empty() {
        Err(EfaError::invalid_argument(format!("{what} must not be empty")))
    } else {
        Ok(value)
    }
}

/// System info query.
pub fn build_info() -> Query {
    Query::new(Endpoint::SystemInfo)
}

/// Stop finder query for a name (or id) search.
pub fn build_locations_by_name(name: &str, options: &SearchOptions) -> Result<Query, EfaError> {
    let name = non_empty("name", name)?;
    let limit = options.resolve_limit(DEFAULT_NAME_LIMIT)?;
    Ok(stop_finder("any", name.to_string(), options, limit))
}

/// Stop finder query around a coordinate.
///
/// Coordinates are forwarded as given; only non-finite values are rejected.
pub fn build_locations_by_coord(
    x: f64,
    y: f64,
    format: CoordFormat,
    options: &SearchOptions,
) -> Result<Query, EfaError> {
    if !x.is_finite() || !y.is_finite() {
        return Err(EfaError::invalid_argument(format!(
            "coordinates must be finite, got ({x}, {y})"
        )));
    }
    let limit = options.resolve_limit(DEFAULT_COORD_LIMIT)?;
    Ok(stop_finder("coord", format!("{x}:{y}:{format}"), options, limit))
}

fn stop_finder(kind: &str, name: String, options: &SearchOptions, limit: usize) -> Query {
    let mut query = Query::new(Endpoint::StopFinder);
    query.push("locationServerActive", 1);
    query.push("type_sf", kind);
    query.push("name_sf", name);
    query.push_flag("doNotSearchForStops_sf", !options.search_nearby_stops);

    let filter = LocationFilter::combine(&options.filters);
    if filter != 0 {
        query.push("anyObjFilter_sf", filter);
    }

    query.limit = Some(limit);
    query
}

/// Serving lines query by line name.
pub fn build_lines_by_name(name: &str, options: &LineOptions) -> Result<Query, EfaError> {
    let name = non_empty("line name", name)?;

    let mut query = Query::new(Endpoint::ServingLines);
    query.push("locationServerActive", 1);
    query.push("mode", "line");
    query.push("lineName", name);
    options.apply(&mut query);
    Ok(query)
}

/// Serving lines query for the lines calling at a stop.
pub fn build_lines_by_location<'a>(
    location: impl Into<StopRef<'a>>,
    options: &LineOptions,
) -> Result<Query, EfaError> {
    let stop = location.into();
    let id = stop.stop_id()?;

    let mut query = Query::new(Endpoint::ServingLines);
    query.push("locationServerActive", 1);
    query.push("mode", "odv");
    query.push("type_sl", "stopID");
    query.push("name_sl", id);
    options.apply(&mut query);
    Ok(query)
}

/// Line list query, optionally restricted to one subnetwork.
pub fn build_line_list(subnetwork: Option<&str>, options: &LineOptions) -> Query {
    let mut query = Query::new(Endpoint::LineList);
    if let Some(subnet) = subnetwork.filter(|s| !s.trim().is_empty()) {
        query.push("lineListSubnetwork", subnet);
    }
    query.push_flag("mergeDir", options.merge_directions);
    let req_type = LineRequestType::combine(&options.request_types);
    if req_type != 0 {
        query.push("lineReqType", req_type);
    }
    query
}

/// Query for the stops a line calls at, in route order.
pub fn build_line_stops<'a>(line: impl Into<LineRef<'a>>) -> Result<Query, EfaError> {
    let id = match line.into() {
        LineRef::Id(id) => id,
        LineRef::Transport(t) => t.id.as_str(),
    };
    let id = non_empty("line id", id)?;

    let mut query = Query::new(Endpoint::LineStop);
    query.push("line", id);
    query.push_flag("allStopInfo", true);
    Ok(query)
}

/// Departure monitor query for a stop.
///
/// The limit is sent to the server and also enforced on the result.
pub fn build_departures<'a>(
    stop: impl Into<StopRef<'a>>,
    options: &DepartureOptions,
) -> Result<Query, EfaError> {
    let stop = stop.into();
    let id = stop.id()?;
    let limit = resolve_limit(options.limit, DEFAULT_DEPARTURE_LIMIT)?;

    let mut query = Query::new(Endpoint::Departures);
    query.push("locationServerActive", 1);
    query.push("name_dm", id);
    query.push("type_dm", "stop");
    query.push("mode", "direct");
    query.push_flag("useAllStops", true);
    query.push_flag("lsShowTrainsExplicit", true);
    query.push_flag("useProxFootSearch", false);
    query.push_flag("useRealtime", options.realtime);
    query.push("limit", limit);
    if let Some(at) = options.at {
        query.push("itdDate", at.format("%Y%m%d"));
        query.push("itdTime", at.format("%H%M"));
    }

    query.limit = Some(limit);
    Ok(query)
}
