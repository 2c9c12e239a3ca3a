use indexmap::IndexMap;
use serde_json::Value;

use super::descriptor::{FieldDescriptor, FieldKind, FieldValue};

/// Copies validated input into descriptors, in declaration order.
///
/// Precondition: `data` already passed validation against the same
/// declaration. Fields absent from the input keep their current value; `null`
/// assigns only to `null`-kind fields; object and array-of-object fields are
/// rebuilt as fresh nested instances so the result never aliases
/// caller-supplied data.
pub(crate) fn populate_fields(fields: &mut IndexMap<String, FieldDescriptor>, data: &Value) {
    let Some(map) = data.as_object() else {
        return;
    };
    for (name, descriptor) in fields.iter_mut() {
        let Some(value) = map.get(name) else {
            continue;
        };
        if value.is_null() {
            if descriptor.kind() == FieldKind::Null {
                descriptor.value = FieldValue::Json(Value::Null);
            }
            continue;
        }
        match descriptor.kind() {
            FieldKind::Object => {
                if let Some(schema) = &descriptor.constraints.schema {
                    let mut nested = schema.create();
                    populate_fields(nested.fields_mut(), value);
                    descriptor.value = FieldValue::Nested(Box::new(nested));
                }
            }
            FieldKind::Array => {
                let object_schema = descriptor
                    .constraints
                    .items
                    .as_ref()
                    .filter(|items| items.kind() == FieldKind::Object)
                    .and_then(|items| items.constraints.schema.clone());
                match (object_schema, value.as_array()) {
                    (Some(schema), Some(elements)) => {
                        let instances = elements
                            .iter()
                            .map(|element| {
                                let mut nested = schema.create();
                                populate_fields(nested.fields_mut(), element);
                                nested
                            })
                            .collect();
                        descriptor.value = FieldValue::NestedList(instances);
                    }
                    // Shallow defensive copy; later mutation of the caller's
                    // array must not reach the instance.
                    _ => descriptor.value = FieldValue::Json(value.clone()),
                }
            }
            _ => descriptor.value = FieldValue::Json(value.clone()),
        }
    }
}
