//! Conversion from validated rapidJSON fragments to domain types.
//!
//! These functions expect input that [`validate`](super::schema::validate)
//! has accepted. Required-field access never fails on such input: the
//! parsers only reject values outside the domain (unknown transport codes,
//! malformed dates) and nesting beyond [`MAX_DEPTH`].

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};

use crate::domain::{
    Coord, Departure, Location, LocationType, Operator, SystemInfo, Transport, TransportType,
};

use super::error::EfaError;
use super::schema::{MAX_DEPTH, ValidationError, kind_of};

/// Date pattern of the `validity` block.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a system info response.
pub fn parse_system_info(value: &Value) -> Result<SystemInfo, EfaError> {
    let root = as_object(value, "<root>")?;
    let kernel = root.get("ptKernel").and_then(Value::as_object);
    let validity = root.get("validity").and_then(Value::as_object);

    let kernel_str = |key: &str| {
        kernel
            .and_then(|k| k.get(key))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let validity_str = |key: &str| {
        validity
            .and_then(|v| v.get(key))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    Ok(SystemInfo {
        version: str_field(root, "version").to_string(),
        app_version: kernel_str("appVersion"),
        data_format: kernel_str("dataFormat"),
        data_build: kernel_str("dataBuild"),
        valid_from: parse_date("validity.from", &validity_str("from"))?,
        valid_to: parse_date("validity.to", &validity_str("to"))?,
    })
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, EfaError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| EfaError::DateFormat {
        field,
        value: value.to_string(),
    })
}

/// Parse one location entry, including its parent chain and assigned stops.
pub fn parse_location(value: &Value) -> Result<Location, EfaError> {
    location_at(value, 0)
}

fn location_at(value: &Value, depth: usize) -> Result<Location, EfaError> {
    if depth > MAX_DEPTH {
        return Err(ValidationError::too_deep("location").into());
    }

    let obj = as_object(value, "location")?;
    let properties = obj
        .get("properties")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    // A non-global id is only meaningful to the server that issued it;
    // the stop id in the properties is the one other requests accept.
    let mut id = str_field(obj, "id").to_string();
    if obj.get("isGlobalId").and_then(Value::as_bool) == Some(false) {
        if let Some(stop_id) = properties.get("stopId").and_then(Value::as_str) {
            id = stop_id.to_string();
        }
    }

    let coord = match obj.get("coord").and_then(Value::as_array).map(Vec::as_slice) {
        Some([x, y, ..]) => x
            .as_f64()
            .zip(y.as_f64())
            .map(|(x, y)| Coord { x, y }),
        _ => None,
    };

    let mut transports = Vec::new();
    for class in obj
        .get("productClasses")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        let ty = transport_type(class)?;
        if !transports.contains(&ty) {
            transports.push(ty);
        }
    }

    let parent = match obj.get("parent") {
        Some(p) if !p.is_null() => Some(Box::new(location_at(p, depth + 1)?)),
        _ => None,
    };

    let stops = obj
        .get("assignedStops")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .map(|s| location_at(s, depth + 1))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Location {
        name: str_field(obj, "name").to_string(),
        loc_type: LocationType::from_code(str_field(obj, "type")),
        id,
        coord,
        transports,
        parent,
        stops,
        properties,
        disassembled_name: obj
            .get("disassembledName")
            .and_then(Value::as_str)
            .map(str::to_string),
        match_quality: obj
            .get("matchQuality")
            .and_then(Value::as_i64)
            .unwrap_or(0),
    })
}

/// Parse one line entry.
///
/// `origin` is always left unset: neither line search reports it.
pub fn parse_transport(value: &Value) -> Result<Transport, EfaError> {
    let obj = as_object(value, "line")?;

    let product = match obj.get("product").and_then(|p| p.get("class")) {
        Some(class) => transport_type(class)?,
        None => return Err(ValidationError::new("product.class", "integer", "missing").into()),
    };

    // Short label: servinglines sends `number`, linelist only `disassembledName`.
    let name = ["disassembledName", "number", "name"]
        .iter()
        .find_map(|key| obj.get(*key).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string();

    let destination = match obj.get("destination") {
        Some(d) if !d.is_null() => Some(location_at(d, 1)?),
        _ => None,
    };

    let operator = obj.get("operator").and_then(Value::as_object).map(|op| {
        let field = |key: &str| op.get(key).and_then(Value::as_str).map(str::to_string);
        Operator {
            code: field("code"),
            id: field("id"),
            name: field("name"),
        }
    });

    Ok(Transport {
        id: str_field(obj, "id").to_string(),
        name,
        description: str_field(obj, "description").to_string(),
        product,
        destination,
        origin: None,
        operator,
        properties: obj
            .get("properties")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default(),
    })
}

/// Parse one departure monitor entry.
///
/// The platform label is taken from the departure location's
/// `platformName` property, falling back to `platform`.
pub fn parse_departure(value: &Value) -> Result<Departure, EfaError> {
    let obj = as_object(value, "stopEvent")?;

    let location = location_at(obj.get("location").unwrap_or(&Value::Null), 1)?;
    let line = parse_transport(obj.get("transportation").unwrap_or(&Value::Null))?;

    let planned = parse_timestamp(
        "departureTimePlanned",
        str_field(obj, "departureTimePlanned"),
    )?;
    let estimated = match obj.get("departureTimeEstimated").and_then(Value::as_str) {
        Some(value) => Some(parse_timestamp("departureTimeEstimated", value)?),
        None => None,
    };

    let platform = ["platformName", "platform"]
        .iter()
        .filter_map(|key| location.properties.get(*key).and_then(Value::as_str))
        .find(|p| !p.trim().is_empty())
        .map(str::to_string);

    Ok(Departure {
        location,
        line,
        planned,
        estimated,
        platform,
        realtime: obj
            .get("isRealtimeControlled")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    })
}

fn parse_timestamp(field: &'static str, value: &str) -> Result<DateTime<Utc>, EfaError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| EfaError::DateFormat {
            field,
            value: value.to_string(),
        })
}

/// Parse the `stopEvents` list of a departure monitor response, in server
/// order. A response without the list has no departures.
pub fn parse_departures(root: &Value) -> Result<Vec<Departure>, EfaError> {
    list(root, "stopEvents").map(parse_departure).collect()
}

/// Parse every entry of the location list under `key`.
///
/// Any failing entry fails the whole list.
pub fn parse_locations(root: &Value, key: &str) -> Result<Vec<Location>, EfaError> {
    list(root, key).map(parse_location).collect()
}

/// Parse every entry of the line list under `key`.
pub fn parse_transports(root: &Value, key: &str) -> Result<Vec<Transport>, EfaError> {
    list(root, key).map(parse_transport).collect()
}

fn list<'a>(root: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    root.get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

fn transport_type(code: &Value) -> Result<TransportType, EfaError> {
    code.as_i64()
        .and_then(TransportType::from_code)
        .ok_or_else(|| EfaError::UnknownEnumValue {
            kind: "transport type",
            value: code.to_string(),
        })
}

fn as_object<'a>(value: &'a Value, what: &str) -> Result<&'a Map<String, Value>, EfaError> {
    value
        .as_object()
        .ok_or_else(|| ValidationError::new(what, "object", kind_of(value)).into())
}

fn str_field<'a>(obj: &'a Map<String, Value>, key: &str) -> &'a str {
    obj.get(key).and_then(Value::as_str).unwrap_or_default()
}
