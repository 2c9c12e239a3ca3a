use serde_json::{Map, Value};

use super::SchemaType;
use super::descriptor::{FieldDescriptor, FieldKind};

const DIALECT: &str = "https://json-schema.org/draft/2020-12/schema";

/// Reflects a declaration into a JSON Schema draft 2020-12 document.
///
/// Properties are emitted in declaration order; `required` lists the declared
/// fields that are neither optional nor carrying an explicit default. Output
/// contains no iteration-order nondeterminism, so repeated calls on the same
/// declaration are byte-identical once serialized.
pub(crate) fn schema_document(ty: &SchemaType) -> Value {
    let mut document = Map::new();
    document.insert("$schema".to_string(), Value::String(DIALECT.to_string()));
    document.insert("title".to_string(), Value::String(ty.name().to_string()));
    append_object_body(&mut document, ty);
    Value::Object(document)
}

fn append_object_body(document: &mut Map<String, Value>, ty: &SchemaType) {
    document.insert("type".to_string(), Value::String("object".to_string()));

    let mut properties = Map::new();
    let mut required = Vec::new();
    for (name, descriptor) in ty.fields() {
        properties.insert(name.clone(), descriptor_schema(descriptor));
        if !descriptor.constraints.optional && descriptor.constraints.default.is_none() {
            required.push(Value::String(name.clone()));
        }
    }
    document.insert("properties".to_string(), Value::Object(properties));
    if !required.is_empty() {
        document.insert("required".to_string(), Value::Array(required));
    }
}

fn descriptor_schema(descriptor: &FieldDescriptor) -> Value {
    let constraints = &descriptor.constraints;
    let mut schema = Map::new();

    match descriptor.kind() {
        FieldKind::Boolean => {
            schema.insert("type".to_string(), Value::String("boolean".to_string()));
        }
        FieldKind::Integer => {
            schema.insert("type".to_string(), Value::String("integer".to_string()));
        }
        FieldKind::Number => {
            schema.insert("type".to_string(), Value::String("number".to_string()));
        }
        FieldKind::String => {
            schema.insert("type".to_string(), Value::String("string".to_string()));
        }
        FieldKind::Null => {
            schema.insert("type".to_string(), Value::String("null".to_string()));
        }
        FieldKind::Literal => {
            schema.insert(
                "const".to_string(),
                constraints.literal_value.clone().unwrap_or(Value::Null),
            );
        }
        FieldKind::Enum => {
            schema.insert(
                "enum".to_string(),
                Value::Array(constraints.enum_values.clone()),
            );
        }
        FieldKind::Array => {
            schema.insert("type".to_string(), Value::String("array".to_string()));
        }
        FieldKind::Object => {
            // body appended below so description/default slot in consistently
        }
    }

    if let Some(description) = &constraints.description {
        schema.insert(
            "description".to_string(),
            Value::String(description.clone()),
        );
    }
    if let Some(default) = &constraints.default {
        schema.insert("default".to_string(), default.clone());
    }

    if let Some(minimum) = constraints.minimum {
        schema.insert("minimum".to_string(), number_value(minimum));
    }
    if let Some(maximum) = constraints.maximum {
        schema.insert("maximum".to_string(), number_value(maximum));
    }
    if let Some(bound) = constraints.exclusive_minimum {
        schema.insert("exclusiveMinimum".to_string(), number_value(bound));
    }
    if let Some(bound) = constraints.exclusive_maximum {
        schema.insert("exclusiveMaximum".to_string(), number_value(bound));
    }
    if let Some(factor) = constraints.multiple_of {
        schema.insert("multipleOf".to_string(), number_value(factor));
    }
    if let Some(min_length) = constraints.min_length {
        schema.insert("minLength".to_string(), Value::from(min_length));
    }
    if let Some(max_length) = constraints.max_length {
        schema.insert("maxLength".to_string(), Value::from(max_length));
    }
    if let Some(pattern) = &constraints.pattern {
        schema.insert("pattern".to_string(), Value::String(pattern.clone()));
    }
    if let Some(format) = &constraints.format {
        schema.insert("format".to_string(), Value::String(format.clone()));
    }

    if descriptor.kind() == FieldKind::Array {
        if let Some(items) = &constraints.items {
            schema.insert("items".to_string(), descriptor_schema(items));
        }
    }
    if descriptor.kind() == FieldKind::Object {
        if let Some(nested) = &constraints.schema {
            append_object_body(&mut schema, nested);
        }
    }

    Value::Object(schema)
}

/// Emits whole constraint bounds as JSON integers instead of `x.0` floats.
fn number_value(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < (i64::MAX as f64) {
        Value::from(value as i64)
    } else {
        Value::from(value)
    }
}

#[cfg(test)]
mod tests {
    use crate::schema::{
        SchemaBuilder, array, enumeration, integer, literal, number, object, string,
    };
    use serde_json::json;

    #[test]
    fn document_shape_matches_draft_2020_12() {
        let ty = SchemaBuilder::new("Person")
            .field(
                "name",
                string().with_min_length(1).with_description("display name"),
            )
            .field("age", integer().with_minimum(0.0).with_maximum(150.0))
            .field("nickname", string().optional())
            .build();

        let document = ty.to_json_schema();
        assert_eq!(
            document["$schema"],
            json!("https://json-schema.org/draft/2020-12/schema")
        );
        assert_eq!(document["title"], json!("Person"));
        assert_eq!(document["type"], json!("object"));
        assert_eq!(
            document["properties"]["name"],
            json!({"type": "string", "description": "display name", "minLength": 1})
        );
        assert_eq!(
            document["properties"]["age"],
            json!({"type": "integer", "minimum": 0, "maximum": 150})
        );
        assert_eq!(document["required"], json!(["name", "age"]));
    }

    #[test]
    fn defaulted_fields_are_not_required() {
        let ty = SchemaBuilder::new("Config")
            .field("retries", integer().with_default(3))
            .field("host", string())
            .build();
        let document = ty.to_json_schema();
        assert_eq!(document["required"], json!(["host"]));
        assert_eq!(document["properties"]["retries"]["default"], json!(3));
    }

    #[test]
    fn enum_const_and_items_keywords_are_emitted() {
        let point = SchemaBuilder::new("Point")
            .field("x", number())
            .field("y", number())
            .build();
        let ty = SchemaBuilder::new("Drawing")
            .field("kind", literal("drawing"))
            .field("palette", enumeration(["mono", "full"]))
            .field("points", array(object(&point)))
            .build();

        let document = ty.to_json_schema();
        assert_eq!(document["properties"]["kind"], json!({"const": "drawing"}));
        assert_eq!(
            document["properties"]["palette"],
            json!({"enum": ["mono", "full"]})
        );
        let items = &document["properties"]["points"]["items"];
        assert_eq!(items["type"], json!("object"));
        assert_eq!(items["required"], json!(["x", "y"]));
        assert_eq!(items["properties"]["x"], json!({"type": "number"}));
    }

    #[test]
    fn properties_keep_declaration_order() {
        let ty = SchemaBuilder::new("Ordered")
            .field("zulu", integer())
            .field("alpha", integer())
            .field("mike", integer())
            .build();
        let document = ty.to_json_schema();
        let keys: Vec<&String> = document["properties"]
            .as_object()
            .expect("properties object")
            .keys()
            .collect();
        assert_eq!(keys, ["zulu", "alpha", "mike"]);
    }

    #[test]
    fn stringify_is_deterministic_and_format_stable() {
        let ty = SchemaBuilder::new("Person")
            .field("name", string().with_min_length(1))
            .field("age", integer().with_minimum(0.0))
            .build();

        let first = ty.stringify(true);
        let second = ty.stringify(true);
        assert_eq!(first, second);
        assert!(first.contains("\n  \"type\": \"object\""));

        let compact = ty.stringify(false);
        assert!(!compact.contains('\n'));

        // re-serializing the parsed document reproduces the original text
        let reparsed: serde_json::Value =
            serde_json::from_str(&first).expect("emitted schema is valid JSON");
        assert_eq!(
            serde_json::to_string_pretty(&reparsed).expect("serialize"),
            first
        );
    }
}
