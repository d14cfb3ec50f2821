//! `TypeUtils` — spec.md §4.6: a small compatibility-checking surface used
//! by inspection for checked invocation signatures, record/table/list
//! schema validation, and literal-to-primitive compatibility.
//!
//! This is deliberately independent of `pq-parser`'s CST: by the time a
//! caller is checking "is this value compatible with that schema" they
//! already hold evaluated values and declared schemas, not nodes.

use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Any,
    AnyNonNull,
    Binary,
    Date,
    DateTime,
    DateTimeZone,
    Duration,
    Function,
    List,
    Logical,
    None,
    Null,
    Number,
    Record,
    Table,
    Text,
    Time,
    Type,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Logical(bool),
    Number(String),
    Text(String),
    Null,
}

impl LiteralValue {
    fn parent_primitive(&self) -> Primitive {
        match self {
            LiteralValue::Logical(_) => Primitive::Logical,
            LiteralValue::Number(_) => Primitive::Number,
            LiteralValue::Text(_) => Primitive::Text,
            LiteralValue::Null => Primitive::Null,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    NotApplicable,
    Unknown,
    Primitive(Primitive),
    Literal(LiteralValue),
    Nullable(Box<Schema>),
    Record { fields: IndexMap<String, Schema>, open: bool },
    Table { fields: IndexMap<String, Schema>, open: bool },
    List(Box<Schema>),
    Function { parameters: Vec<Schema>, return_type: Box<Schema> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Logical(bool),
    Number(String),
    Text(String),
    None,
    Record(IndexMap<String, Value>),
    Table(Vec<IndexMap<String, Value>>),
    List(Vec<Value>),
    Function,
}

/// `isCompatible(value, schema) -> bool | undefined` — `None` for the
/// `NotApplicable`/`Unknown` schemas that carry no useful answer.
pub fn is_compatible(value: &Value, schema: &Schema) -> Option<bool> {
    match schema {
        Schema::NotApplicable | Schema::Unknown => None,
        Schema::Primitive(Primitive::Any) => Some(!matches!(value, Value::None)),
        Schema::Primitive(Primitive::AnyNonNull) => Some(!matches!(value, Value::None)),
        Schema::Primitive(primitive) => Some(value_primitive(value) == Some(*primitive)),
        Schema::Literal(literal) => Some(literal_matches(value, literal)),
        Schema::Nullable(inner) => match value {
            Value::None => Some(true),
            _ => is_compatible(value, inner),
        },
        Schema::Record { fields, open } => Some(matches!(value, Value::Record(actual) if record_matches(actual, fields, *open))),
        Schema::Table { fields, open } => Some(matches!(
            value,
            Value::Table(rows) if rows.iter().all(|row| record_matches(row, fields, *open))
        )),
        Schema::List(item_schema) => Some(matches!(
            value,
            Value::List(items) if items.iter().all(|item| is_compatible(item, item_schema).unwrap_or(false))
        )),
        Schema::Function { .. } => Some(matches!(value, Value::Function)),
    }
}

fn value_primitive(value: &Value) -> Option<Primitive> {
    Some(match value {
        Value::Logical(_) => Primitive::Logical,
        Value::Number(_) => Primitive::Number,
        Value::Text(_) => Primitive::Text,
        Value::None => Primitive::None,
        Value::Record(_) => Primitive::Record,
        Value::Table(_) => Primitive::Table,
        Value::List(_) => Primitive::List,
        Value::Function => Primitive::Function,
    })
}

/// A literal schema matches a value of the same parent primitive carrying
/// the identical literal text, or the parent primitive itself (spec.md
/// §4.6: "literals are compatible with their parent primitive and with
/// themselves").
fn literal_matches(value: &Value, literal: &LiteralValue) -> bool {
    match (value, literal) {
        (Value::Logical(v), LiteralValue::Logical(l)) => v == l,
        (Value::Number(v), LiteralValue::Number(l)) => v == l,
        (Value::Text(v), LiteralValue::Text(l)) => v == l,
        (Value::None, LiteralValue::Null) => true,
        _ => value_primitive(value) == Some(literal.parent_primitive()),
    }
}

/// Result of checking a record/table row against a field schema: every
/// field name sorted into exactly one slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldCheck {
    pub valid: Vec<String>,
    pub invalid: Vec<String>,
    pub extraneous: Vec<String>,
    pub missing: Vec<String>,
}

pub fn check_fields(actual: &IndexMap<String, Value>, expected: &IndexMap<String, Schema>, open: bool) -> FieldCheck {
    let mut check = FieldCheck::default();
    for (name, field_schema) in expected {
        match actual.get(name) {
            Some(value) => match is_compatible(value, field_schema) {
                Some(true) | None => check.valid.push(name.clone()),
                Some(false) => check.invalid.push(name.clone()),
            },
            None => check.missing.push(name.clone()),
        }
    }
    if !open {
        for name in actual.keys() {
            if !expected.contains_key(name) {
                check.extraneous.push(name.clone());
            }
        }
    }
    check
}

fn record_matches(actual: &IndexMap<String, Value>, expected: &IndexMap<String, Schema>, open: bool) -> bool {
    let check = check_fields(actual, expected, open);
    check.invalid.is_empty() && check.missing.is_empty() && check.extraneous.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_is_not_compatible_with_any() {
        assert_eq!(is_compatible(&Value::None, &Schema::Primitive(Primitive::Any)), Some(false));
    }

    #[test]
    fn every_primitive_is_compatible_with_any() {
        assert_eq!(is_compatible(&Value::Number("1".into()), &Schema::Primitive(Primitive::Any)), Some(true));
    }

    #[test]
    fn none_is_not_compatible_with_any_non_null() {
        assert_eq!(is_compatible(&Value::None, &Schema::Primitive(Primitive::AnyNonNull)), Some(false));
    }

    #[test]
    fn nullable_value_is_not_compatible_with_any_non_null() {
        let schema = Schema::Nullable(Box::new(Schema::Primitive(Primitive::Number)));
        assert_eq!(is_compatible(&Value::None, &schema), Some(true));
    }

    #[test]
    fn literal_matches_its_parent_primitive() {
        let schema = Schema::Literal(LiteralValue::Number("1".into()));
        assert_eq!(is_compatible(&Value::Number("2".into()), &schema), Some(true));
        assert_eq!(is_compatible(&Value::Text("a".into()), &schema), Some(false));
    }

    #[test]
    fn not_applicable_and_unknown_are_undefined() {
        assert_eq!(is_compatible(&Value::None, &Schema::NotApplicable), None);
        assert_eq!(is_compatible(&Value::None, &Schema::Unknown), None);
    }

    #[test]
    fn record_field_check_sorts_every_slot() {
        let mut expected = IndexMap::new();
        expected.insert("a".to_string(), Schema::Primitive(Primitive::Number));
        expected.insert("b".to_string(), Schema::Primitive(Primitive::Text));
        let mut actual = IndexMap::new();
        actual.insert("a".to_string(), Value::Text("oops".into()));
        actual.insert("c".to_string(), Value::Number("1".into()));

        let check = check_fields(&actual, &expected, false);
        assert_eq!(check.invalid, vec!["a".to_string()]);
        assert_eq!(check.missing, vec!["b".to_string()]);
        assert_eq!(check.extraneous, vec!["c".to_string()]);
    }

    #[test]
    fn open_record_has_no_extraneous_fields() {
        let expected = IndexMap::new();
        let mut actual = IndexMap::new();
        actual.insert("anything".to_string(), Value::Number("1".into()));
        let check = check_fields(&actual, &expected, true);
        assert!(check.extraneous.is_empty());
    }
}
