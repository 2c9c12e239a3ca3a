use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::SchemaType;
use super::descriptor::{FieldDescriptor, FieldValue};
use super::error::SchemaError;
use super::populate;

/// One concrete, fully materialized value of a [`SchemaType`].
///
/// Instances own their descriptors exclusively; two instances created from the
/// same declaration never share state. Field access goes through the typed
/// accessors below, which replace property interception with explicit reads
/// and writes against the descriptor table.
///
/// Writes through [`SchemaInstance::set`] are raw: no constraint is checked on
/// assignment. Only [`SchemaInstance::parse`] enforces the declaration.
#[derive(Debug, Clone)]
pub struct SchemaInstance {
    schema: SchemaType,
    fields: IndexMap<String, FieldDescriptor>,
}

impl SchemaInstance {
    pub(crate) fn new(schema: SchemaType, fields: IndexMap<String, FieldDescriptor>) -> Self {
        Self { schema, fields }
    }

    /// Declaration this instance was created from.
    pub fn schema(&self) -> &SchemaType {
        &self.schema
    }

    pub(crate) fn fields_mut(&mut self) -> &mut IndexMap<String, FieldDescriptor> {
        &mut self.fields
    }

    /// Snapshots one field's current value as plain JSON.
    ///
    /// Unknown names return `None`.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.fields.get(name).map(|d| d.value.to_json())
    }

    /// Reads a boolean field.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.fields.get(name)? {
            FieldDescriptor {
                value: FieldValue::Json(Value::Bool(flag)),
                ..
            } => Some(*flag),
            _ => None,
        }
    }

    /// Reads an integer-valued field.
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match &self.fields.get(name)?.value {
            FieldValue::Json(value) => value.as_i64(),
            _ => None,
        }
    }

    /// Reads a numeric field as `f64`.
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        match &self.fields.get(name)?.value {
            FieldValue::Json(value) => value.as_f64(),
            _ => None,
        }
    }

    /// Borrows a string field's current value.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        match &self.fields.get(name)?.value {
            FieldValue::Json(value) => value.as_str(),
            _ => None,
        }
    }

    /// Writes a field's value directly, without validation.
    ///
    /// Returns `false` (and leaves the instance untouched) for unknown names
    /// and for object or array-of-object fields, whose nested state is edited
    /// through [`SchemaInstance::nested_mut`] and
    /// [`SchemaInstance::items_mut`] instead.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> bool {
        let Some(descriptor) = self.fields.get_mut(name) else {
            return false;
        };
        match &descriptor.value {
            FieldValue::Json(_) => {
                descriptor.value = FieldValue::Json(value.into());
                true
            }
            FieldValue::Nested(_) | FieldValue::NestedList(_) => false,
        }
    }

    /// Borrows the nested instance backing an object field.
    pub fn nested(&self, name: &str) -> Option<&SchemaInstance> {
        match &self.fields.get(name)?.value {
            FieldValue::Nested(instance) => Some(instance),
            _ => None,
        }
    }

    /// Mutably borrows the nested instance backing an object field, so deep
    /// writes work uniformly with top-level ones.
    pub fn nested_mut(&mut self, name: &str) -> Option<&mut SchemaInstance> {
        match &mut self.fields.get_mut(name)?.value {
            FieldValue::Nested(instance) => Some(instance),
            _ => None,
        }
    }

    /// Borrows the materialized elements of an array-of-object field.
    pub fn items(&self, name: &str) -> Option<&[SchemaInstance]> {
        match &self.fields.get(name)?.value {
            FieldValue::NestedList(instances) => Some(instances),
            _ => None,
        }
    }

    /// Mutably borrows the materialized elements of an array-of-object field.
    pub fn items_mut(&mut self, name: &str) -> Option<&mut Vec<SchemaInstance>> {
        match &mut self.fields.get_mut(name)?.value {
            FieldValue::NestedList(instances) => Some(instances),
            _ => None,
        }
    }

    /// Validates `data` against the declaration without touching the instance.
    pub fn validate(&self, data: &Value) -> super::ValidationReport {
        self.schema.validate(data)
    }

    /// Emits the declaration this instance was created from as a JSON Schema.
    pub fn to_json_schema(&self) -> Value {
        self.schema.to_json_schema()
    }

    /// Serializes the declaration's JSON Schema; see [`SchemaType::stringify`].
    pub fn stringify(&self, pretty: bool) -> String {
        self.schema.stringify(pretty)
    }

    /// Validates `data` against the declaration and, on success, copies it in.
    ///
    /// Atomic from the caller's perspective: validation runs to completion
    /// before any descriptor mutates, so on error the instance is exactly as
    /// it was. The raised [`SchemaError`] carries every violation found.
    pub fn parse(&mut self, data: &Value) -> Result<(), SchemaError> {
        self.schema.validate_or_raise(data)?;
        populate::populate_fields(&mut self.fields, data);
        Ok(())
    }

    /// Snapshots every field's current value, in declaration order.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        for (name, descriptor) in &self.fields {
            map.insert(name.clone(), descriptor.value.to_json());
        }
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use crate::schema::{SchemaBuilder, ViolationKind, integer, object, string};
    use serde_json::json;

    #[test]
    fn set_skips_unknown_fields_and_never_validates() {
        let ty = SchemaBuilder::new("Person")
            .field("age", integer().with_minimum(0.0))
            .build();
        let mut instance = ty.create();

        // constraint-violating write is accepted; only parse enforces
        assert!(instance.set("age", -5));
        assert_eq!(instance.get_i64("age"), Some(-5));
        assert!(!instance.set("ghost", 1));
        assert_eq!(instance.get("ghost"), None);
    }

    #[test]
    fn failed_parse_leaves_instance_untouched() {
        let ty = SchemaBuilder::new("Person")
            .field("name", string().with_min_length(1))
            .field("age", integer().with_minimum(0.0))
            .build();
        let mut instance = ty.create();
        instance
            .parse(&json!({"name": "Ada", "age": 30}))
            .expect("first parse should succeed");

        let err = instance
            .parse(&json!({"name": "Grace", "age": -1}))
            .expect_err("second parse should fail");
        assert_eq!(err.violations.len(), 1);
        assert_eq!(err.violations[0].kind, ViolationKind::Minimum);

        // no partial application: the valid sibling value was not written
        assert_eq!(instance.get_str("name"), Some("Ada"));
        assert_eq!(instance.get_i64("age"), Some(30));
    }

    #[test]
    fn deep_writes_go_through_nested_mut() {
        let address = SchemaBuilder::new("Address")
            .field("street", string())
            .build();
        let ty = SchemaBuilder::new("Profile")
            .field("address", object(&address))
            .build();
        let mut instance = ty.create();

        assert!(
            instance
                .nested_mut("address")
                .expect("object field materialized eagerly")
                .set("street", "Baker St")
        );
        assert_eq!(
            instance.to_value(),
            json!({"address": {"street": "Baker St"}})
        );

        // whole-object raw writes are rejected; nested state has one owner
        assert!(!instance.set("address", json!({"street": "other"})));
    }

    #[test]
    fn typed_accessors_reject_mismatched_kinds() {
        let ty = SchemaBuilder::new("Person")
            .field("name", string())
            .build();
        let instance = ty.create();
        assert_eq!(instance.get_str("name"), Some(""));
        assert_eq!(instance.get_i64("name"), None);
        assert_eq!(instance.get_bool("name"), None);
    }
}
