use indexmap::IndexMap;
use regex::Regex;
use serde_json::{Map, Value};

use super::SchemaType;
use super::descriptor::{FieldDescriptor, FieldKind};
use super::error::{Violation, ViolationKind};

/// Outcome of validating input data against a declaration.
///
/// The report is fail-soft: it collects one entry per violated check across
/// every declared field instead of stopping at the first failure.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    /// Every violation found, ordered by declaration order and input position.
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// `true` when no violation was recorded.
    pub fn valid(&self) -> bool {
        self.violations.is_empty()
    }
}

pub(crate) fn validate_type(ty: &SchemaType, data: &Value) -> ValidationReport {
    let mut violations = Vec::new();
    match data.as_object() {
        Some(map) => validate_fields(ty.fields(), map, "", &mut violations),
        None => violations.push(Violation {
            path: String::new(),
            kind: ViolationKind::Type,
            message: format!("expected object, got {}", json_type_name(data)),
        }),
    }
    ValidationReport { violations }
}

fn validate_fields(
    fields: &IndexMap<String, FieldDescriptor>,
    data: &Map<String, Value>,
    prefix: &str,
    out: &mut Vec<Violation>,
) {
    for (name, descriptor) in fields {
        let path = join_path(prefix, name);
        match data.get(name) {
            None => {
                if !descriptor.constraints.optional && descriptor.constraints.default.is_none() {
                    out.push(Violation {
                        path,
                        kind: ViolationKind::Required,
                        message: "missing required field".to_string(),
                    });
                }
            }
            Some(Value::Null) => {
                if descriptor.kind() != FieldKind::Null && !descriptor.constraints.optional {
                    out.push(Violation {
                        path,
                        kind: ViolationKind::Type,
                        message: format!("expected {}, got null", descriptor.kind().label()),
                    });
                }
            }
            Some(value) => check_value(descriptor, value, &path, out),
        }
    }
}

fn check_value(descriptor: &FieldDescriptor, value: &Value, path: &str, out: &mut Vec<Violation>) {
    match descriptor.kind() {
        FieldKind::Boolean => {
            if !value.is_boolean() {
                out.push(type_violation(descriptor, value, path));
            }
        }
        FieldKind::Integer => match whole_number(value) {
            Some(num) => check_numeric(descriptor, num, path, out),
            None => out.push(type_violation(descriptor, value, path)),
        },
        FieldKind::Number => match value.as_f64() {
            Some(num) => check_numeric(descriptor, num, path, out),
            None => out.push(type_violation(descriptor, value, path)),
        },
        FieldKind::String => match value.as_str() {
            Some(text) => check_string(descriptor, text, path, out),
            None => out.push(type_violation(descriptor, value, path)),
        },
        FieldKind::Literal => {
            if descriptor.constraints.literal_value.as_ref() != Some(value) {
                out.push(Violation {
                    path: path.to_string(),
                    kind: ViolationKind::LiteralMismatch,
                    message: format!(
                        "expected constant {}, got {value}",
                        descriptor
                            .constraints
                            .literal_value
                            .clone()
                            .unwrap_or(Value::Null)
                    ),
                });
            }
        }
        FieldKind::Enum => {
            if !descriptor.constraints.enum_values.contains(value) {
                out.push(Violation {
                    path: path.to_string(),
                    kind: ViolationKind::EnumMismatch,
                    message: format!("{value} is not a declared enum value"),
                });
            }
        }
        // Null input was already accepted above, so any value reaching this
        // arm has the wrong type.
        FieldKind::Null => out.push(type_violation(descriptor, value, path)),
        FieldKind::Array => match value.as_array() {
            Some(items) => {
                if let Some(item_descriptor) = &descriptor.constraints.items {
                    for (index, item) in items.iter().enumerate() {
                        let item_path = format!("{path}[{index}]");
                        if item.is_null() {
                            if item_descriptor.kind() != FieldKind::Null
                                && !item_descriptor.constraints.optional
                            {
                                out.push(Violation {
                                    path: item_path,
                                    kind: ViolationKind::Type,
                                    message: format!(
                                        "expected {}, got null",
                                        item_descriptor.kind().label()
                                    ),
                                });
                            }
                        } else {
                            check_value(item_descriptor, item, &item_path, out);
                        }
                    }
                }
            }
            None => out.push(type_violation(descriptor, value, path)),
        },
        FieldKind::Object => match value.as_object() {
            Some(map) => {
                if let Some(nested) = &descriptor.constraints.schema {
                    validate_fields(nested.fields(), map, path, out);
                }
            }
            None => out.push(type_violation(descriptor, value, path)),
        },
    }
}

fn check_numeric(descriptor: &FieldDescriptor, num: f64, path: &str, out: &mut Vec<Violation>) {
    let constraints = &descriptor.constraints;
    if let Some(minimum) = constraints.minimum {
        if num < minimum {
            out.push(Violation {
                path: path.to_string(),
                kind: ViolationKind::Minimum,
                message: format!(
                    "{} is below minimum {}",
                    format_number(num),
                    format_number(minimum)
                ),
            });
        }
    }
    if let Some(maximum) = constraints.maximum {
        if num > maximum {
            out.push(Violation {
                path: path.to_string(),
                kind: ViolationKind::Maximum,
                message: format!(
                    "{} is above maximum {}",
                    format_number(num),
                    format_number(maximum)
                ),
            });
        }
    }
    if let Some(bound) = constraints.exclusive_minimum {
        if num <= bound {
            out.push(Violation {
                path: path.to_string(),
                kind: ViolationKind::ExclusiveMinimum,
                message: format!(
                    "{} is not above exclusiveMinimum {}",
                    format_number(num),
                    format_number(bound)
                ),
            });
        }
    }
    if let Some(bound) = constraints.exclusive_maximum {
        if num >= bound {
            out.push(Violation {
                path: path.to_string(),
                kind: ViolationKind::ExclusiveMaximum,
                message: format!(
                    "{} is not below exclusiveMaximum {}",
                    format_number(num),
                    format_number(bound)
                ),
            });
        }
    }
    if let Some(factor) = constraints.multiple_of {
        let quotient = num / factor;
        if (quotient - quotient.round()).abs() > 1e-9 {
            out.push(Violation {
                path: path.to_string(),
                kind: ViolationKind::MultipleOf,
                message: format!(
                    "{} is not a multiple of {}",
                    format_number(num),
                    format_number(factor)
                ),
            });
        }
    }
}

fn check_string(descriptor: &FieldDescriptor, text: &str, path: &str, out: &mut Vec<Violation>) {
    let constraints = &descriptor.constraints;
    let length = text.chars().count();
    if let Some(min_length) = constraints.min_length {
        if length < min_length {
            out.push(Violation {
                path: path.to_string(),
                kind: ViolationKind::MinLength,
                message: format!("length {length} is below minLength {min_length}"),
            });
        }
    }
    if let Some(max_length) = constraints.max_length {
        if length > max_length {
            out.push(Violation {
                path: path.to_string(),
                kind: ViolationKind::MaxLength,
                message: format!("length {length} is above maxLength {max_length}"),
            });
        }
    }
    if let Some(pattern) = &constraints.pattern {
        match Regex::new(pattern) {
            Ok(regex) => {
                if !regex.is_match(text) {
                    out.push(Violation {
                        path: path.to_string(),
                        kind: ViolationKind::Pattern,
                        message: format!("value does not match pattern {pattern}"),
                    });
                }
            }
            Err(err) => out.push(Violation {
                path: path.to_string(),
                kind: ViolationKind::Pattern,
                message: format!("invalid pattern {pattern}: {err}"),
            }),
        }
    }
}

fn type_violation(descriptor: &FieldDescriptor, value: &Value, path: &str) -> Violation {
    Violation {
        path: path.to_string(),
        kind: ViolationKind::Type,
        message: format!(
            "expected {}, got {}",
            descriptor.kind().label(),
            json_type_name(value)
        ),
    }
}

/// Accepts any JSON number whose fractional part is zero.
fn whole_number(value: &Value) -> Option<f64> {
    if let Some(int) = value.as_i64() {
        return Some(int as f64);
    }
    if let Some(uint) = value.as_u64() {
        return Some(uint as f64);
    }
    value.as_f64().filter(|f| f.fract() == 0.0)
}

/// Renders constraint bounds without a trailing `.0` on whole numbers.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < (i64::MAX as f64) {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}
