use super::{rule_name, RuleExpression};
use crate::openapi::Schema;
use serde_json::{Number, Value};

/// Maps a rule expression to the schema of the field it validates
pub trait RuleSchemaMapper {
    fn schema(&self, rule: &RuleExpression) -> Schema;

    fn is_required(&self, rule: &RuleExpression) -> bool {
        rule.has("required")
    }
}

/// Mapper for the common rule vocabulary.
///
/// Type rules (`string`, `integer`, `numeric`, `boolean`, `array`) pick the
/// schema type, format rules (`email`, `uuid`, `url`, `date`) imply a string,
/// `in:a,b` becomes an enum and `min:`/`max:` bounds apply to the length, value
/// or item count depending on the type. Unknown rules are ignored and an
/// untyped field is a string.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardRuleMapper;

impl RuleSchemaMapper for StandardRuleMapper {
    fn schema(&self, rule: &RuleExpression) -> Schema {
        let mut schema = Schema::default();
        let mut nullable = false;
        let mut choices: Vec<&str> = Vec::new();
        let mut min = None;
        let mut max = None;

        for part in rule.parts() {
            let args = part.split_once(':').map(|(_, args)| args);
            match rule_name(part) {
                "string" => schema.set_type("string"),
                "integer" => schema.set_type("integer"),
                "numeric" => schema.set_type("number"),
                "boolean" => schema.set_type("boolean"),
                "array" => {
                    schema.set_type("array");
                    schema.items.get_or_insert_with(Box::default);
                }
                "email" | "uuid" | "date" | "url" => {
                    schema.set_type("string");
                    let format = match rule_name(part) {
                        "url" => "uri",
                        other => other,
                    };
                    schema.format = Some(format.to_string());
                }
                "in" => {
                    choices = args
                        .unwrap_or_default()
                        .split(',')
                        .map(|value| value.trim().trim_matches('"'))
                        .filter(|value| !value.is_empty())
                        .collect();
                }
                "min" => min = args.and_then(|a| a.trim().parse::<f64>().ok()),
                "max" => max = args.and_then(|a| a.trim().parse::<f64>().ok()),
                "nullable" => nullable = true,
                _ => {}
            }
        }

        if schema.schema_type.is_none() {
            schema.set_type("string");
        }

        // Enum values and bounds follow the field type
        let schema_type = schema.type_name().map(str::to_string);
        let integer = schema_type.as_deref() == Some("integer");
        schema.enum_values = choices
            .into_iter()
            .map(|choice| typed_choice(choice, schema_type.as_deref()))
            .collect();

        match schema_type.as_deref() {
            Some("integer" | "number") => {
                schema.minimum = min.and_then(|v| bound(v, integer));
                schema.maximum = max.and_then(|v| bound(v, integer));
            }
            Some("array") => {
                schema.min_items = min.map(|v| v as u64);
                schema.max_items = max.map(|v| v as u64);
            }
            _ => {
                schema.min_length = min.map(|v| v as u64);
                schema.max_length = max.map(|v| v as u64);
            }
        }

        if nullable {
            schema = schema.nullable();
        }
        schema
    }
}

/// An `in:` choice as a JSON value of the field type, a string when it does
/// not parse as one
fn typed_choice(choice: &str, schema_type: Option<&str>) -> Value {
    let parsed = match schema_type {
        Some("integer") => choice.parse::<i64>().ok().map(Value::from),
        Some("number") => choice
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        Some("boolean") => choice.parse::<bool>().ok().map(Value::from),
        _ => None,
    };
    parsed.unwrap_or_else(|| Value::from(choice))
}

/// A whole bound of an integer field is written as an integer
fn bound(value: f64, integer: bool) -> Option<Number> {
    if integer && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        return Some(Number::from(value as i64));
    }
    Number::from_f64(value)
}
