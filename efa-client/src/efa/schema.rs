//! Declarative shape checks for rapidJSON responses.
//!
//! Each response shape is a static table of field specs keyed by
//! [`SchemaId`]. A single routine, [`validate`], walks a decoded JSON value
//! against a table and reports the first nonconforming field with its path
//! (e.g. `locations[2].name`).
//!
//! Only required fields and the primitive kind of present fields are
//! checked. Unknown fields are ignored so that server-side additions do not
//! break the client.

use std::fmt;

use serde_json::Value;

/// Maximum nesting of embedded location objects (parent chains, assigned
/// stops) accepted in a response.
pub const MAX_DEPTH: usize = 16;

/// Primitive JSON kind expected for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl Kind {
    fn matches(self, value: &Value) -> bool {
        match self {
            Kind::String => value.is_string(),
            Kind::Integer => value.is_i64() || value.is_u64(),
            Kind::Number => value.is_number(),
            Kind::Boolean => value.is_boolean(),
            Kind::Array => value.is_array(),
            Kind::Object => value.is_object(),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Kind::String => "string",
            Kind::Integer => "integer",
            Kind::Number => "number",
            Kind::Boolean => "boolean",
            Kind::Array => "array",
            Kind::Object => "object",
        }
    }
}

/// Name of the JSON kind of `value`, for error messages.
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// What lives inside an array or object field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nested {
    /// Array whose elements are all of one primitive kind.
    Elements(Kind),
    /// Array of objects of the given shape.
    Items(SchemaId),
    /// Embedded object of the given shape.
    Object(SchemaId),
}

/// Expected shape of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: Kind,
    pub required: bool,
    pub nested: Option<Nested>,
}

impl FieldSpec {
    const fn required(name: &'static str, kind: Kind) -> Self {
        Self {
            name,
            kind,
            required: true,
            nested: None,
        }
    }

    const fn optional(name: &'static str, kind: Kind) -> Self {
        Self {
            name,
            kind,
            required: false,
            nested: None,
        }
    }

    const fn with(mut self, nested: Nested) -> Self {
        self.nested = Some(nested);
        self
    }
}

/// Identifies a response shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaId {
    /// `XML_SYSTEMINFO_REQUEST` root
    SystemInfo,
    PtKernel,
    Validity,
    /// `XML_STOPFINDER_REQUEST` root
    StopFinder,
    /// `XML_SERVINGLINES_REQUEST` root
    ServingLines,
    /// `XML_LINELIST_REQUEST` root
    LineList,
    /// `XML_LINESTOP_REQUEST` root
    LineStop,
    /// `XML_DM_REQUEST` root
    Departures,
    /// One entry of the departure monitor
    StopEvent,
    /// A full location entry
    Location,
    /// A location embedded in another object (parent, destination); the
    /// server may omit its id and type
    LocationRef,
    Line,
    Product,
    Operator,
}

impl SchemaId {
    /// The field table for this shape.
    pub fn fields(self) -> &'static [FieldSpec] {
        match self {
            SchemaId::SystemInfo => SYSTEM_INFO,
            SchemaId::PtKernel => PT_KERNEL,
            SchemaId::Validity => VALIDITY,
            SchemaId::StopFinder => STOP_FINDER,
            SchemaId::ServingLines => SERVING_LINES,
            SchemaId::LineList => LINE_LIST,
            SchemaId::LineStop => LINE_STOP,
            SchemaId::Departures => DEPARTURES,
            SchemaId::StopEvent => STOP_EVENT,
            SchemaId::Location => LOCATION,
            SchemaId::LocationRef => LOCATION_REF,
            SchemaId::Line => LINE,
            SchemaId::Product => PRODUCT,
            SchemaId::Operator => OPERATOR,
        }
    }
}

const SYSTEM_INFO: &[FieldSpec] = &[
    FieldSpec::required("version", Kind::String),
    FieldSpec::required("ptKernel", Kind::Object).with(Nested::Object(SchemaId::PtKernel)),
    FieldSpec::required("validity", Kind::Object).with(Nested::Object(SchemaId::Validity)),
];

const PT_KERNEL: &[FieldSpec] = &[
    FieldSpec::required("appVersion", Kind::String),
    FieldSpec::required("dataFormat", Kind::String),
    FieldSpec::required("dataBuild", Kind::String),
];

const VALIDITY: &[FieldSpec] = &[
    FieldSpec::required("from", Kind::String),
    FieldSpec::required("to", Kind::String),
];

const STOP_FINDER: &[FieldSpec] = &[
    FieldSpec::required("version", Kind::String),
    FieldSpec::optional("systemMessages", Kind::Array),
    FieldSpec::required("locations", Kind::Array).with(Nested::Items(SchemaId::Location)),
];

const SERVING_LINES: &[FieldSpec] = &[
    FieldSpec::required("version", Kind::String),
    FieldSpec::optional("systemMessages", Kind::Array),
    FieldSpec::required("lines", Kind::Array).with(Nested::Items(SchemaId::Line)),
];

const LINE_LIST: &[FieldSpec] = &[
    FieldSpec::required("version", Kind::String),
    FieldSpec::optional("systemMessages", Kind::Array),
    FieldSpec::required("transportations", Kind::Array).with(Nested::Items(SchemaId::Line)),
];

const LINE_STOP: &[FieldSpec] = &[
    FieldSpec::required("version", Kind::String),
    FieldSpec::optional("systemMessages", Kind::Array),
    FieldSpec::required("locationSequence", Kind::Array)
        .with(Nested::Items(SchemaId::Location)),
];

// `stopEvents` is left out entirely when nothing departs.
const DEPARTURES: &[FieldSpec] = &[
    FieldSpec::required("version", Kind::String),
    FieldSpec::optional("systemMessages", Kind::Array),
    FieldSpec::optional("locations", Kind::Array),
    FieldSpec::optional("stopEvents", Kind::Array).with(Nested::Items(SchemaId::StopEvent)),
];

const STOP_EVENT: &[FieldSpec] = &[
    FieldSpec::required("location", Kind::Object).with(Nested::Object(SchemaId::Location)),
    FieldSpec::required("departureTimePlanned", Kind::String),
    FieldSpec::optional("departureTimeEstimated", Kind::String),
    FieldSpec::required("transportation", Kind::Object).with(Nested::Object(SchemaId::Line)),
    FieldSpec::optional("isRealtimeControlled", Kind::Boolean),
    FieldSpec::optional("infos", Kind::Array),
];

const LOCATION: &[FieldSpec] = &[
    FieldSpec::required("id", Kind::String),
    FieldSpec::optional("isGlobalId", Kind::Boolean),
    FieldSpec::required("name", Kind::String),
    FieldSpec::optional("disassembledName", Kind::String),
    FieldSpec::required("type", Kind::String),
    FieldSpec::optional("coord", Kind::Array).with(Nested::Elements(Kind::Number)),
    FieldSpec::optional("productClasses", Kind::Array).with(Nested::Elements(Kind::Integer)),
    FieldSpec::optional("matchQuality", Kind::Integer),
    FieldSpec::optional("properties", Kind::Object),
    FieldSpec::optional("parent", Kind::Object).with(Nested::Object(SchemaId::LocationRef)),
    FieldSpec::optional("assignedStops", Kind::Array).with(Nested::Items(SchemaId::Location)),
];

const LOCATION_REF: &[FieldSpec] = &[
    FieldSpec::optional("id", Kind::String),
    FieldSpec::optional("isGlobalId", Kind::Boolean),
    FieldSpec::required("name", Kind::String),
    FieldSpec::optional("disassembledName", Kind::String),
    FieldSpec::optional("type", Kind::String),
    FieldSpec::optional("coord", Kind::Array).with(Nested::Elements(Kind::Number)),
    FieldSpec::optional("productClasses", Kind::Array).with(Nested::Elements(Kind::Integer)),
    FieldSpec::optional("properties", Kind::Object),
    FieldSpec::optional("parent", Kind::Object).with(Nested::Object(SchemaId::LocationRef)),
];

const LINE: &[FieldSpec] = &[
    FieldSpec::required("id", Kind::String),
    FieldSpec::optional("name", Kind::String),
    FieldSpec::optional("number", Kind::String),
    FieldSpec::optional("disassembledName", Kind::String),
    FieldSpec::optional("description", Kind::String),
    FieldSpec::required("product", Kind::Object).with(Nested::Object(SchemaId::Product)),
    FieldSpec::optional("destination", Kind::Object).with(Nested::Object(SchemaId::LocationRef)),
    FieldSpec::optional("operator", Kind::Object).with(Nested::Object(SchemaId::Operator)),
    FieldSpec::optional("properties", Kind::Object),
];

const PRODUCT: &[FieldSpec] = &[
    FieldSpec::required("class", Kind::Integer),
    FieldSpec::optional("id", Kind::Integer),
    FieldSpec::optional("name", Kind::String),
    FieldSpec::optional("iconId", Kind::Integer),
];

const OPERATOR: &[FieldSpec] = &[
    FieldSpec::optional("code", Kind::String),
    FieldSpec::optional("id", Kind::String),
    FieldSpec::optional("name", Kind::String),
];

/// A response field that does not have the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{path}: expected {expected}, found {found}")]
pub struct ValidationError {
    /// Dotted path to the field, with list indices, e.g. `lines[0].product.class`.
    pub path: String,
    pub expected: &'static str,
    /// Kind actually found, or `missing`.
    pub found: &'static str,
}

impl ValidationError {
    pub(crate) fn new(
        path: impl fmt::Display,
        expected: &'static str,
        found: &'static str,
    ) -> Self {
        Self {
            path: path.to_string(),
            expected,
            found,
        }
    }

    pub(crate) fn too_deep(path: impl fmt::Display) -> Self {
        Self::new(path, "at most 16 levels of nesting", "deeper nesting")
    }
}

/// Location of a value inside the response, built up while descending.
#[derive(Debug, Clone, Copy)]
enum Path<'a> {
    Root,
    Key(&'a Path<'a>, &'static str),
    Index(&'a Path<'a>, usize),
}

impl fmt::Display for Path<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Path::Root => f.write_str("<root>"),
            Path::Key(Path::Root, name) => f.write_str(name),
            Path::Key(parent, name) => write!(f, "{parent}.{name}"),
            Path::Index(parent, idx) => write!(f, "{parent}[{idx}]"),
        }
    }
}

/// Check `value` against the shape `schema`, returning it unchanged if it
/// conforms.
///
/// Lists are checked element by element and the first failing element is
/// reported.
pub fn validate(value: &Value, schema: SchemaId) -> Result<&Value, ValidationError> {
    check_object(value, schema, &Path::Root, 0)?;
    Ok(value)
}

fn check_object(
    value: &Value,
    schema: SchemaId,
    path: &Path<'_>,
    depth: usize,
) -> Result<(), ValidationError> {
    if depth > MAX_DEPTH {
        return Err(ValidationError::too_deep(path));
    }

    let Some(object) = value.as_object() else {
        return Err(ValidationError::new(path, Kind::Object.as_str(), kind_of(value)));
    };

    for field in schema.fields() {
        let field_path = Path::Key(path, field.name);
        match object.get(field.name) {
            None | Some(Value::Null) if field.required => {
                return Err(ValidationError::new(
                    &field_path,
                    field.kind.as_str(),
                    "missing",
                ));
            }
            None | Some(Value::Null) => {}
            Some(v) => check_field(v, field, &field_path, depth)?,
        }
    }

    Ok(())
}

fn check_field(
    value: &Value,
    field: &FieldSpec,
    path: &Path<'_>,
    depth: usize,
) -> Result<(), ValidationError> {
    if !field.kind.matches(value) {
        return Err(ValidationError::new(path, field.kind.as_str(), kind_of(value)));
    }

    match field.nested {
        None => Ok(()),
        Some(Nested::Object(schema)) => check_object(value, schema, path, depth + 1),
        Some(Nested::Elements(kind)) => {
            for (idx, item) in value.as_array().into_iter().flatten().enumerate() {
                if !kind.matches(item) {
                    return Err(ValidationError::new(
                        Path::Index(path, idx),
                        kind.as_str(),
                        kind_of(item),
                    ));
                }
            }
            Ok(())
        }
        Some(Nested::Items(schema)) => {
            for (idx, item) in value.as_array().into_iter().flatten().enumerate() {
                check_object(item, schema, &Path::Index(path, idx), depth + 1)?;
            }
            Ok(())
        }
    }
}
