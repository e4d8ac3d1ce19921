//! EFA HTTP client.
//!
//! Owns the HTTP session and runs each operation end to end: build the
//! query, send it, check the response shape and convert it to domain types.
//! Nothing is cached and nothing is retried.

use std::convert::Infallible;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::domain::{CoordFormat, Departure, Location, SystemInfo, Transport};

use super::error::{EfaError, TransportError};
use super::parse::{parse_departures, parse_locations, parse_system_info, parse_transports};
use super::request::{self, DepartureOptions, LineOptions, LineRef, Query, SearchOptions, StopRef};
use super::schema;

/// Default request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// How much of an undecodable body to keep for diagnostics.
const BODY_EXCERPT_CHARS: usize = 500;

const DEFAULT_USER_AGENT: &str = concat!("efa-client/", env!("CARGO_PKG_VERSION"));

/// Configuration for the EFA client.
#[derive(Debug, Clone)]
pub struct EfaConfig {
    /// Base URL of the EFA instance, e.g. `https://efa.vgn.de/vgnExt_oeffi/`
    pub base_url: String,
    /// Request timeout in seconds, enforced by the HTTP transport
    pub timeout_secs: u64,
    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl EfaConfig {
    /// Create a new config for the given endpoint.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the User-Agent header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Read the config from `EFA_BASE_URL` and, optionally, `EFA_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, EfaError> {
        let base_url = std::env::var("EFA_BASE_URL")
            .map_err(|_| EfaError::invalid_argument("EFA_BASE_URL is not set"))?;
        let mut config = Self::new(base_url);

        if let Ok(secs) = std::env::var("EFA_TIMEOUT_SECS") {
            config.timeout_secs = secs.trim().parse().map_err(|_| {
                EfaError::invalid_argument(format!("EFA_TIMEOUT_SECS is not a number: {secs:?}"))
            })?;
        }

        Ok(config)
    }
}

/// Client for one EFA endpoint.
///
/// The client starts closed. [`open`](Self::open) establishes the HTTP
/// session and [`close`](Self::close) releases it; every query fails with
/// [`EfaError::SessionState`] while the session is closed, before any
/// request is made.
///
/// Queries take `&self` and may run concurrently. Closing stops new queries
/// from starting; queries already in flight finish on the connection they
/// hold.
///
/// ```no_run
/// # async fn run() -> Result<(), efa_client::EfaError> {
/// use efa_client::{EfaClient, EfaConfig, SearchOptions};
///
/// let client = EfaClient::connect(EfaConfig::new("https://efa.vgn.de/vgnExt_oeffi/")).await?;
/// let stops = client.locations_by_name("Plärrer", &SearchOptions::default()).await?;
/// for stop in &stops {
///     println!("{stop}");
/// }
/// client.close().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct EfaClient {
    config: EfaConfig,
    base_url: String,
    session: RwLock<Option<reqwest::Client>>,
}

impl EfaClient {
    /// Create a closed client for the configured endpoint.
    pub fn new(config: EfaConfig) -> Result<Self, EfaError> {
        let base = config.base_url.trim();
        if base.is_empty() {
            return Err(EfaError::invalid_argument("no EFA endpoint URL provided"));
        }

        let base_url = if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{base}/")
        };

        Ok(Self {
            config,
            base_url,
            session: RwLock::new(None),
        })
    }

    /// Create a client and open its session.
    pub async fn connect(config: EfaConfig) -> Result<Self, EfaError> {
        let client = Self::new(config)?;
        client.open().await?;
        Ok(client)
    }

    /// Base URL requests are sent to, always ending in `/`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Establish the HTTP session.
    pub async fn open(&self) -> Result<(), EfaError> {
        let mut session = self.session.write().await;
        if session.is_some() {
            return Err(EfaError::SessionState("session is already open"));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .user_agent(&self.config.user_agent)
            .build()?;

        *session = Some(http);
        info!(base_url = %self.base_url, "EFA session opened");
        Ok(())
    }

    /// Release the HTTP session. Closing a closed client does nothing.
    pub async fn close(&self) {
        if self.session.write().await.take().is_some() {
            info!(base_url = %self.base_url, "EFA session closed");
        }
    }

    pub async fn is_open(&self) -> bool {
        self.session.read().await.is_some()
    }

    /// Get metadata of the EFA instance.
    pub async fn info(&self) -> Result<SystemInfo, EfaError> {
        info!("requesting system info");
        let http = self.session().await?;

        let query = request::build_info();
        let body = self.fetch(&http, &query).await?;

        parse_system_info(&body)
    }

    /// Search locations by name or id, best matches first.
    pub async fn locations_by_name(
        &self,
        name: &str,
        options: &SearchOptions,
    ) -> Result<Vec<Location>, EfaError> {
        info!(search = name, "searching locations by name");
        let http = self.session().await?;

        let query = request::build_locations_by_name(name, options)?;
        let body = self.fetch(&http, &query).await?;
        let locations = parse_locations(&body, "locations")?;

        debug!(count = locations.len(), "locations found");
        Ok(rank(locations, query.limit()))
    }

    /// Search locations around a coordinate, best matches first.
    pub async fn locations_by_coord(
        &self,
        x: f64,
        y: f64,
        format: CoordFormat,
        options: &SearchOptions,
    ) -> Result<Vec<Location>, EfaError> {
        info!(x, y, "searching locations by coordinate");
        let http = self.session().await?;

        let query = request::build_locations_by_coord(x, y, format, options)?;
        let body = self.fetch(&http, &query).await?;
        let locations = parse_locations(&body, "locations")?;

        debug!(count = locations.len(), "locations found");
        Ok(rank(locations, query.limit()))
    }

    /// Find lines by name, e.g. `"U1"`.
    pub async fn lines_by_name(
        &self,
        name: &str,
        options: &LineOptions,
    ) -> Result<Vec<Transport>, EfaError> {
        info!(line = name, "searching lines by name");
        let http = self.session().await?;

        let query = request::build_lines_by_name(name, options)?;
        let body = self.fetch(&http, &query).await?;
        let lines = parse_transports(&body, "lines")?;

        debug!(count = lines.len(), "lines found");
        Ok(lines)
    }

    /// Find lines serving a stop, given by id or as a [`Location`] of type
    /// stop.
    pub async fn lines_by_location<'a>(
        &self,
        location: impl Into<StopRef<'a>>,
        options: &LineOptions,
    ) -> Result<Vec<Transport>, EfaError> {
        let location = location.into();
        info!(?location, "searching lines by location");
        let http = self.session().await?;

        let query = request::build_lines_by_location(location, options)?;
        let body = self.fetch(&http, &query).await?;
        let lines = parse_transports(&body, "lines")?;

        debug!(count = lines.len(), "lines found");
        Ok(lines)
    }

    /// List all lines of the network, optionally of one subnetwork only.
    pub async fn line_list(
        &self,
        subnetwork: Option<&str>,
        options: &LineOptions,
    ) -> Result<Vec<Transport>, EfaError> {
        info!(?subnetwork, "listing lines");
        let http = self.session().await?;

        let query = request::build_line_list(subnetwork, options);
        let body = self.fetch(&http, &query).await?;
        let lines = parse_transports(&body, "transportations")?;

        debug!(count = lines.len(), "lines found");
        Ok(lines)
    }

    /// Stops a line calls at, in route order.
    pub async fn locations_by_line<'a>(
        &self,
        line: impl Into<LineRef<'a>>,
    ) -> Result<Vec<Location>, EfaError> {
        let line = line.into();
        info!(?line, "requesting stops of line");
        let http = self.session().await?;

        let query = request::build_line_stops(line)?;
        let body = self.fetch(&http, &query).await?;
        let stops = parse_locations(&body, "locationSequence")?;

        debug!(count = stops.len(), "stops found");
        Ok(stops)
    }

    /// Trip planning. Not implemented.
    pub async fn trip<'a>(
        &self,
        _origin: impl Into<StopRef<'a>>,
        _destination: impl Into<StopRef<'a>>,
    ) -> Result<Infallible, EfaError> {
        self.session().await?;
        Err(EfaError::Unsupported("trip planning"))
    }

    /// Upcoming departures at a stop, in server order.
    pub async fn departures_by_location<'a>(
        &self,
        stop: impl Into<StopRef<'a>>,
        options: &DepartureOptions,
    ) -> Result<Vec<Departure>, EfaError> {
        let stop = stop.into();
        info!(?stop, limit = ?options.limit, at = ?options.at, "requesting departures");
        let http = self.session().await?;

        let query = request::build_departures(stop, options)?;
        let body = self.fetch(&http, &query).await?;
        let mut departures = parse_departures(&body)?;
        if let Some(limit) = query.limit() {
            departures.truncate(limit);
        }

        debug!(count = departures.len(), "departures found");
        Ok(departures)
    }

    /// Handle to the open session.
    async fn session(&self) -> Result<reqwest::Client, EfaError> {
        self.session
            .read()
            .await
            .clone()
            .ok_or(EfaError::SessionState("session is not open"))
    }

    /// Send a query and return the decoded, shape-checked response.
    async fn fetch(&self, http: &reqwest::Client, query: &Query) -> Result<Value, EfaError> {
        let url = format!("{}{}", self.base_url, query.endpoint().path());
        debug!(%query, "running EFA query");

        let response = http.get(&url).query(query.params()).send().await?;
        let status = response.status();
        debug!(status = status.as_u16(), "EFA response received");

        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    debug!(error = %e, "failed to read error response body");
                    String::new()
                }
            };
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let body = response.bytes().await?;
        let value: Value = serde_json::from_slice(&body).map_err(|e| EfaError::ResponseFormat {
            message: e.to_string(),
            body: Some(
                String::from_utf8_lossy(&body)
                    .chars()
                    .take(BODY_EXCERPT_CHARS)
                    .collect(),
            ),
        })?;

        schema::validate(&value, query.endpoint().schema())?;
        Ok(value)
    }
}

/// Order search results by match quality, best first, keeping server order
/// among equals, and cut to `limit`.
fn rank(mut locations: Vec<Location>, limit: Option<usize>) -> Vec<Location> {
    locations.sort_by(|a, b| b.match_quality.cmp(&a.match_quality));
    if let Some(limit) = limit {
        locations.truncate(limit);
    }
    locations
}
