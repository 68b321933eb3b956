//! Filling in missing fields so a partial record has the shape the rest of
//! the graph expects.

use crate::schema::{Field, Relationship, RelationshipKind, Table};
use crate::{Result, Schema, TABLE_NAME_KEY};

use serde_json::{Map, Value};
use std::sync::Arc;

/// What to do with a field that is missing from the input record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Add the key. Required literals get their type default, everything
    /// else gets `null` (or `[]` for to-many relationships).
    Define,

    /// Leave the key out.
    Omit,

    /// Add the key with a concrete value. For a required dependent to-one
    /// relationship this synthesizes a nested default record.
    Set,
}

/// Per-category treatment of missing fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    pub required_fields: Mode,
    pub optional_fields: Mode,
    pub to_many: Mode,
    pub required_relationships: Mode,
    pub optional_relationships: Mode,
}

impl Default for Policy {
    fn default() -> Policy {
        Policy {
            required_fields: Mode::Define,
            optional_fields: Mode::Define,
            to_many: Mode::Define,
            required_relationships: Mode::Define,
            optional_relationships: Mode::Define,
        }
    }
}

impl Policy {
    /// The policy the serializer applies to every inbound record.
    pub fn serializer() -> Policy {
        Policy {
            required_fields: Mode::Set,
            optional_fields: Mode::Define,
            to_many: Mode::Set,
            required_relationships: Mode::Set,
            optional_relationships: Mode::Define,
        }
    }
}

/// Returns `record` with every field of `table` present according to
/// `policy`.
///
/// Keys are matched case-insensitively. Present values are kept as given,
/// except dependent sub-records which are normalized against their own
/// table. Keys the table does not declare are kept, and `_tableName` is
/// stamped with the declared table name. The id field is never defaulted.
pub fn normalize(
    schema: &Schema,
    table: &str,
    record: &Map<String, Value>,
    policy: Policy,
) -> Result<Map<String, Value>> {
    let table = schema.expect_table(table)?;
    Normalizer {
        schema,
        policy,
        synthesizing: vec![],
    }
    .table(table, record)
}

struct Normalizer<'a> {
    schema: &'a Schema,
    policy: Policy,

    /// Tables with a default record being synthesized, to stop cycles of
    /// required dependent relationships.
    synthesizing: Vec<String>,
}

impl Normalizer<'_> {
    fn table(&mut self, table: &Arc<Table>, record: &Map<String, Value>) -> Result<Map<String, Value>> {
        let mut out = record.clone();

        for field in table.literal_fields() {
            if let Some(value) = self.literal(field, &out) {
                out.insert(field.name.clone(), value);
            }
        }

        for relationship in table.relationships() {
            match find(&out, &relationship.name) {
                Some(key) => {
                    let key = key.to_string();
                    if let Some(value) = out.get(&key) {
                        let value = self.present(relationship, value)?;
                        out.insert(key, value);
                    }
                }
                None => {
                    if let Some(value) = self.missing(relationship)? {
                        out.insert(relationship.name.clone(), value);
                    }
                }
            }
        }

        out.insert(TABLE_NAME_KEY.to_string(), Value::String(table.name.clone()));
        Ok(out)
    }

    fn literal(&self, field: &Field, record: &Map<String, Value>) -> Option<Value> {
        if find(record, &field.name).is_some() {
            return None;
        }

        let mode = if field.required {
            self.policy.required_fields
        } else {
            self.policy.optional_fields
        };

        match mode {
            Mode::Omit => None,
            Mode::Define if !field.required && !field.is_version() => Some(Value::Null),
            Mode::Define | Mode::Set => Some(field.default_value()),
        }
    }

    fn present(&mut self, relationship: &Relationship, value: &Value) -> Result<Value> {
        if relationship.is_independent() {
            return Ok(value.clone());
        }

        let related = self.schema.related_table(relationship)?;
        Ok(match value {
            Value::Object(record) => Value::Object(self.table(related, record)?),
            Value::Array(items) if relationship.is_to_many() => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(match item {
                        Value::Object(record) => Value::Object(self.table(related, record)?),
                        other => other.clone(),
                    });
                }
                Value::Array(out)
            }
            other => other.clone(),
        })
    }

    fn missing(&mut self, relationship: &Relationship) -> Result<Option<Value>> {
        if relationship.is_to_many() {
            if relationship.kind == RelationshipKind::ManyToMany {
                return Ok(None);
            }
            return Ok(match self.policy.to_many {
                Mode::Omit => None,
                Mode::Define | Mode::Set => Some(Value::Array(vec![])),
            });
        }

        let mode = if relationship.required {
            self.policy.required_relationships
        } else {
            self.policy.optional_relationships
        };

        match mode {
            Mode::Omit => Ok(None),
            Mode::Set if relationship.required && relationship.is_dependent() => {
                let related = self.schema.related_table(relationship)?;
                let key = related.name.to_ascii_lowercase();
                if self.synthesizing.contains(&key) {
                    return Ok(Some(Value::Null));
                }

                self.synthesizing.push(key);
                let nested = self.table(related, &Map::new());
                self.synthesizing.pop();
                Ok(Some(Value::Object(nested?)))
            }
            Mode::Define | Mode::Set => Ok(Some(Value::Null)),
        }
    }
}

/// Finds the key in `record` naming `field`, ignoring case.
pub(crate) fn find<'a>(record: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    if record.contains_key(field) {
        return record.keys().find(|key| *key == field).map(String::as_str);
    }
    record
        .keys()
        .find(|key| key.eq_ignore_ascii_case(field))
        .map(String::as_str)
}
