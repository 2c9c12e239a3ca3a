//! Runtime schema declarations for structured data extraction.
//!
//! The schema layer lets callers describe the shape of data they expect back
//! from a model, validate arbitrary JSON against that shape with a complete
//! violation report, populate typed instances from validated input, and emit
//! a JSON Schema draft 2020-12 document for providers that accept structured
//! output constraints.
//!
//! Declarations are explicit field tables: each [`SchemaBuilder::field`] call
//! registers a `(name, descriptor)` pair, and the registration order is the
//! declared order everywhere it matters (validation reports, emitted
//! `properties`, instance snapshots).
//!
//! # Examples
//!
//! ```
//! use katachi::schema::{SchemaBuilder, integer, string};
//! use serde_json::json;
//!
//! let person = SchemaBuilder::new("Person")
//!     .field("name", string().with_min_length(1))
//!     .field("age", integer().with_minimum(0.0))
//!     .build();
//!
//! let mut instance = person.create();
//! instance.parse(&json!({"name": "Ada", "age": 30})).unwrap();
//! assert_eq!(instance.get_str("name"), Some("Ada"));
//! assert_eq!(instance.get_i64("age"), Some(30));
//!
//! let report = person.validate(&json!({"name": "", "age": -1}));
//! assert!(!report.valid());
//! assert_eq!(report.violations.len(), 2);
//! ```

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

pub mod descriptor;
mod emit;
mod error;
pub mod instance;
mod populate;
mod validate;

pub use descriptor::{
    FieldDescriptor, FieldKind, FieldValue, array, boolean, enumeration, integer, literal, null,
    number, object, string,
};
pub use error::{SchemaError, Violation, ViolationKind};
pub use instance::SchemaInstance;
pub use validate::ValidationReport;

/// Immutable, cheaply cloneable schema declaration.
///
/// A `SchemaType` is the single source of truth for a declared shape: the
/// validator, populator, and emitter all walk its ordered field table. Clones
/// share the underlying declaration; instances created from it never share
/// descriptor state with each other.
#[derive(Debug, Clone)]
pub struct SchemaType {
    inner: Arc<TypeInner>,
}

#[derive(Debug)]
struct TypeInner {
    name: String,
    fields: IndexMap<String, FieldDescriptor>,
}

impl SchemaType {
    /// Name given to the declaration, used as the emitted schema title.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Ordered field table backing every schema operation.
    pub(crate) fn fields(&self) -> &IndexMap<String, FieldDescriptor> {
        &self.inner.fields
    }

    /// Builds a fresh instance with every field at its default value.
    ///
    /// Each call produces fully independent descriptors, including fresh
    /// nested default instances for object fields.
    pub fn create(&self) -> SchemaInstance {
        SchemaInstance::new(self.clone(), self.inner.fields.clone())
    }

    /// Validates `data` against this declaration, collecting every violation.
    ///
    /// Validation is fail-soft: all fields are checked in declaration order
    /// and every violated constraint appends one entry, so a caller can render
    /// the complete problem list in one pass.
    pub fn validate(&self, data: &Value) -> ValidationReport {
        validate::validate_type(self, data)
    }

    /// Like [`SchemaType::validate`] but raises a [`SchemaError`] carrying the
    /// full violation list when the report is not valid.
    pub fn validate_or_raise(&self, data: &Value) -> Result<(), SchemaError> {
        let report = self.validate(data);
        if report.valid() {
            Ok(())
        } else {
            Err(SchemaError::new(report.violations))
        }
    }

    /// Emits the declaration as a JSON Schema draft 2020-12 document.
    ///
    /// Output is deterministic: properties appear in declaration order and two
    /// calls on the same declaration produce identical documents.
    pub fn to_json_schema(&self) -> Value {
        emit::schema_document(self)
    }

    /// Serializes [`SchemaType::to_json_schema`] to a string.
    ///
    /// With `pretty` the document is indented with two spaces; otherwise it is
    /// a single line. Repeated calls yield byte-identical output.
    pub fn stringify(&self, pretty: bool) -> String {
        let document = self.to_json_schema();
        if pretty {
            serde_json::to_string_pretty(&document).unwrap_or_default()
        } else {
            serde_json::to_string(&document).unwrap_or_default()
        }
    }
}

/// Registers `(name, descriptor)` pairs into an ordered declaration.
///
/// # Examples
///
/// ```
/// use katachi::schema::{SchemaBuilder, boolean, string};
///
/// let flag = SchemaBuilder::new("FeatureFlag")
///     .field("key", string().with_min_length(1))
///     .field("enabled", boolean().with_default(false))
///     .build();
/// assert_eq!(flag.name(), "FeatureFlag");
/// ```
pub struct SchemaBuilder {
    name: String,
    fields: IndexMap<String, FieldDescriptor>,
}

impl SchemaBuilder {
    /// Starts a declaration with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: IndexMap::new(),
        }
    }

    /// Registers one field. Re-registering a name replaces the descriptor but
    /// keeps the original position.
    pub fn field(mut self, name: impl Into<String>, descriptor: FieldDescriptor) -> Self {
        self.fields.insert(name.into(), descriptor);
        self
    }

    /// Finalizes the declaration.
    pub fn build(self) -> SchemaType {
        SchemaType {
            inner: Arc::new(TypeInner {
                name: self.name,
                fields: self.fields,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_produces_independent_instances() {
        let ty = SchemaBuilder::new("Counter")
            .field("count", integer())
            .build();

        let mut first = ty.create();
        let second = ty.create();

        first.set("count", 5);
        assert_eq!(first.get_i64("count"), Some(5));
        assert_eq!(second.get_i64("count"), Some(0));
    }

    #[test]
    fn nested_defaults_are_fresh_per_instance() {
        let inner = SchemaBuilder::new("Inner")
            .field("label", string())
            .build();
        let outer = SchemaBuilder::new("Outer")
            .field("child", object(&inner))
            .build();

        let mut a = outer.create();
        let b = outer.create();

        a.nested_mut("child")
            .expect("child instance")
            .set("label", "changed");
        assert_eq!(
            a.nested("child").and_then(|c| c.get_str("label").map(str::to_string)),
            Some("changed".to_string())
        );
        assert_eq!(
            b.nested("child").and_then(|c| c.get_str("label").map(str::to_string)),
            Some(String::new())
        );
    }

    #[test]
    fn declaration_order_survives_into_snapshots() {
        let ty = SchemaBuilder::new("Ordered")
            .field("zulu", integer())
            .field("alpha", integer())
            .field("mike", integer())
            .build();

        let snapshot = ty.create().to_value();
        let keys: Vec<&String> = snapshot
            .as_object()
            .expect("snapshot should be object")
            .keys()
            .collect();
        assert_eq!(keys, ["zulu", "alpha", "mike"]);
    }

    #[test]
    fn validate_or_raise_carries_all_violations() {
        let ty = SchemaBuilder::new("Person")
            .field("name", string().with_min_length(1))
            .field("age", integer().with_minimum(0.0))
            .build();

        let err = ty
            .validate_or_raise(&json!({"name": "", "age": -1}))
            .expect_err("two violations expected");
        assert_eq!(err.violations.len(), 2);
        assert_eq!(err.violations[0].path, "name");
        assert_eq!(err.violations[1].path, "age");
    }
}
