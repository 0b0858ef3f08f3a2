//! Structural input validation
//!
//! Checks the subset of JSON schema the tools declare: the input is an
//! object, every `required` field is present, and each required field has
//! the `type` declared under `properties`. Fields the schema doesn't mention
//! are ignored.

use serde_json::Value;
use std::fmt;

/// A single broken constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Field path, `$` for the input itself
    pub field: String,
    pub problem: Problem,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Problem {
    Missing,
    WrongType {
        expected: String,
        found: &'static str,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.problem {
            Problem::Missing => write!(f, "missing required field '{}'", self.field),
            Problem::WrongType { expected, found } => write!(
                f,
                "field '{}' must be {} (got {})",
                self.field, expected, found
            ),
        }
    }
}

/// Validate `input` against `schema`, collecting every violation
pub fn validate(schema: &Value, input: &Value) -> Result<(), Vec<Violation>> {
    let Some(fields) = input.as_object() else {
        return Err(vec![Violation {
            field: "$".to_string(),
            problem: Problem::WrongType {
                expected: "object".to_string(),
                found: type_name(input),
            },
        }]);
    };

    let properties = schema.get("properties");
    let required = schema
        .get("required")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let violations: Vec<Violation> = required
        .iter()
        .filter_map(Value::as_str)
        .filter_map(|name| {
            let Some(value) = fields.get(name) else {
                return Some(Violation {
                    field: name.to_string(),
                    problem: Problem::Missing,
                });
            };
            let expected = properties
                .and_then(|p| p.get(name))
                .and_then(|p| p.get("type"))
                .and_then(Value::as_str)?;
            if matches_type(expected, value) {
                None
            } else {
                Some(Violation {
                    field: name.to_string(),
                    problem: Problem::WrongType {
                        expected: expected.to_string(),
                        found: type_name(value),
                    },
                })
            }
        })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

fn matches_type(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        // Unknown type keywords constrain nothing
        _ => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
