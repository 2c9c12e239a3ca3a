use serde_json::{Value, json};

use super::SchemaType;
use super::instance::SchemaInstance;

/// Closed set of field kinds understood by the schema layer.
///
/// Every validator, populator, and emitter dispatch is an exhaustive match on
/// this enum, so adding a kind forces every component to handle it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Boolean,
    Integer,
    Number,
    String,
    Literal,
    Enum,
    Null,
    Array,
    Object,
}

impl FieldKind {
    /// JSON type name used in violation messages.
    pub(crate) fn label(self) -> &'static str {
        match self {
            FieldKind::Boolean => "boolean",
            FieldKind::Integer => "integer",
            FieldKind::Number => "number",
            FieldKind::String => "string",
            FieldKind::Literal => "literal",
            FieldKind::Enum => "enum",
            FieldKind::Null => "null",
            FieldKind::Array => "array",
            FieldKind::Object => "object",
        }
    }
}

/// Current value held by a field descriptor.
///
/// Object fields and arrays of objects hold materialized nested instances so
/// deep reads and writes go through the same accessor layer as top-level
/// fields; every other kind stores a plain JSON value.
#[derive(Debug, Clone)]
pub enum FieldValue {
    /// Scalar, enum, literal, null, or plain-array payload.
    Json(Value),
    /// Materialized nested instance backing an object field.
    Nested(Box<SchemaInstance>),
    /// Materialized nested instances backing an array-of-object field.
    NestedList(Vec<SchemaInstance>),
}

impl FieldValue {
    /// Snapshots the value as plain JSON.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Json(value) => value.clone(),
            FieldValue::Nested(instance) => instance.to_value(),
            FieldValue::NestedList(instances) => {
                Value::Array(instances.iter().map(|i| i.to_value()).collect())
            }
        }
    }
}

/// Constraint options stored on a descriptor.
///
/// Nothing here is enforced at declaration time; constraints only matter when
/// [`SchemaType::validate`](super::SchemaType::validate) runs.
#[derive(Debug, Clone, Default)]
pub(crate) struct Constraints {
    pub(crate) description: Option<String>,
    pub(crate) optional: bool,
    pub(crate) default: Option<Value>,
    pub(crate) minimum: Option<f64>,
    pub(crate) maximum: Option<f64>,
    pub(crate) exclusive_minimum: Option<f64>,
    pub(crate) exclusive_maximum: Option<f64>,
    pub(crate) multiple_of: Option<f64>,
    pub(crate) min_length: Option<usize>,
    pub(crate) max_length: Option<usize>,
    pub(crate) pattern: Option<String>,
    pub(crate) format: Option<String>,
    pub(crate) enum_values: Vec<Value>,
    pub(crate) literal_value: Option<Value>,
    pub(crate) items: Option<Box<FieldDescriptor>>,
    pub(crate) schema: Option<SchemaType>,
}

/// Describes one declared field: its kind, current value, and constraints.
///
/// Descriptors are produced by the factory functions in this module
/// ([`boolean`], [`integer`], [`string`], ...), tuned with chained `with_*`
/// builders, and registered into a [`SchemaBuilder`](super::SchemaBuilder).
/// The kind is fixed at construction; only the value mutates afterwards.
///
/// # Examples
///
/// ```
/// use katachi::schema::{integer, string};
///
/// let age = integer().with_minimum(0.0).with_maximum(150.0);
/// let name = string().with_min_length(1).with_description("display name");
/// ```
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    kind: FieldKind,
    pub(crate) value: FieldValue,
    pub(crate) constraints: Constraints,
}

impl FieldDescriptor {
    fn new(kind: FieldKind, value: FieldValue) -> Self {
        Self {
            kind,
            value,
            constraints: Constraints::default(),
        }
    }

    /// Kind declared at construction, immutable afterwards.
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Attaches a human-readable description, emitted into the JSON Schema.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.constraints.description = Some(description.into());
        self
    }

    /// Marks the field as optional: absent or null input is accepted.
    pub fn optional(mut self) -> Self {
        self.constraints.optional = true;
        self
    }

    /// Sets an explicit default, overriding the kind's zero value.
    ///
    /// The default becomes the field's initial value on every fresh instance
    /// and suppresses `required` emission for the field.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        let default = default.into();
        self.value = FieldValue::Json(default.clone());
        self.constraints.default = Some(default);
        self
    }

    /// Inclusive lower bound for integer/number fields.
    pub fn with_minimum(mut self, minimum: f64) -> Self {
        self.constraints.minimum = Some(minimum);
        self
    }

    /// Inclusive upper bound for integer/number fields.
    pub fn with_maximum(mut self, maximum: f64) -> Self {
        self.constraints.maximum = Some(maximum);
        self
    }

    /// Exclusive lower bound for integer/number fields.
    pub fn with_exclusive_minimum(mut self, bound: f64) -> Self {
        self.constraints.exclusive_minimum = Some(bound);
        self
    }

    /// Exclusive upper bound for integer/number fields.
    pub fn with_exclusive_maximum(mut self, bound: f64) -> Self {
        self.constraints.exclusive_maximum = Some(bound);
        self
    }

    /// Requires numeric values to be a whole multiple of `factor`.
    pub fn with_multiple_of(mut self, factor: f64) -> Self {
        self.constraints.multiple_of = Some(factor);
        self
    }

    /// Minimum string length, counted in characters.
    pub fn with_min_length(mut self, length: usize) -> Self {
        self.constraints.min_length = Some(length);
        self
    }

    /// Maximum string length, counted in characters.
    pub fn with_max_length(mut self, length: usize) -> Self {
        self.constraints.max_length = Some(length);
        self
    }

    /// Regex the string value must match. Compiled lazily at validation time.
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.constraints.pattern = Some(pattern.into());
        self
    }

    /// Format annotation emitted into the JSON Schema (`email`, `uri`, ...).
    ///
    /// Formats are descriptive only; the validator does not interpret them.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.constraints.format = Some(format.into());
        self
    }
}

/// Declares a boolean field. Zero value: `false`.
pub fn boolean() -> FieldDescriptor {
    FieldDescriptor::new(FieldKind::Boolean, FieldValue::Json(Value::Bool(false)))
}

/// Declares an integer field (whole numbers only). Zero value: `0`.
pub fn integer() -> FieldDescriptor {
    FieldDescriptor::new(FieldKind::Integer, FieldValue::Json(json!(0)))
}

/// Declares a number field (any finite JSON number). Zero value: `0`.
pub fn number() -> FieldDescriptor {
    FieldDescriptor::new(FieldKind::Number, FieldValue::Json(json!(0)))
}

/// Declares a string field. Zero value: `""`.
pub fn string() -> FieldDescriptor {
    FieldDescriptor::new(FieldKind::String, FieldValue::Json(json!("")))
}

/// Declares a field pinned to one constant value.
///
/// Validation accepts exactly the declared constant; the JSON Schema carries
/// it under the `const` keyword. The constant doubles as the initial value.
pub fn literal(value: impl Into<Value>) -> FieldDescriptor {
    let value = value.into();
    let mut descriptor = FieldDescriptor::new(FieldKind::Literal, FieldValue::Json(value.clone()));
    descriptor.constraints.literal_value = Some(value);
    descriptor
}

/// Declares an enum field over the given member values.
///
/// The first member is the zero value. A default supplied through
/// [`FieldDescriptor::with_default`] must be a member of `values`; the factory
/// does not check membership, matching the declaration-time laziness of every
/// other constraint.
pub fn enumeration<I, T>(values: I) -> FieldDescriptor
where
    I: IntoIterator<Item = T>,
    T: Into<Value>,
{
    let values: Vec<Value> = values.into_iter().map(Into::into).collect();
    let initial = values.first().cloned().unwrap_or(Value::Null);
    let mut descriptor = FieldDescriptor::new(FieldKind::Enum, FieldValue::Json(initial));
    descriptor.constraints.enum_values = values;
    descriptor
}

/// Declares a field whose only legal value is JSON `null`.
pub fn null() -> FieldDescriptor {
    FieldDescriptor::new(FieldKind::Null, FieldValue::Json(Value::Null))
}

/// Declares an array field whose elements validate against `items`.
///
/// When `items` is an [`object`] descriptor, populated elements materialize as
/// nested instances; any other item kind stores a plain JSON array. Zero
/// value: the empty array.
pub fn array(items: FieldDescriptor) -> FieldDescriptor {
    let value = if items.kind() == FieldKind::Object {
        FieldValue::NestedList(Vec::new())
    } else {
        FieldValue::Json(Value::Array(Vec::new()))
    };
    let mut descriptor = FieldDescriptor::new(FieldKind::Array, value);
    descriptor.constraints.items = Some(Box::new(items));
    descriptor
}

/// Declares a nested-object field backed by another declaration.
///
/// One default nested instance is built eagerly, so a fresh parent instance
/// always exposes a fully materialized child.
pub fn object(schema: &SchemaType) -> FieldDescriptor {
    let value = FieldValue::Nested(Box::new(schema.create()));
    let mut descriptor = FieldDescriptor::new(FieldKind::Object, value);
    descriptor.constraints.schema = Some(schema.clone());
    descriptor
}
