//! Converting raw records into canonical form.
//!
//! A canonical record uses the declared field names, carries a `_tableName`
//! tag and has every field the table declares present, with nested records
//! canonicalized the same way.

use crate::normalize::{normalize, Policy};
use crate::schema::{FieldRef, Table};
use crate::uri::{parse_resource_url, resource_url};
use crate::{bail, Error, Result, Schema, RESERVED_KEYS, TABLE_NAME_KEY};

use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct Serializer<'a> {
    schema: &'a Schema,
    prefix: &'a str,
}

impl<'a> Serializer<'a> {
    pub fn new(schema: &'a Schema, prefix: &'a str) -> Serializer<'a> {
        Serializer { schema, prefix }
    }

    /// Canonicalizes `record`.
    ///
    /// The table is taken from the `_tableName` tag, then from `table`, then
    /// from the path of `resource_uri`.
    pub fn serialize(&self, record: &Map<String, Value>, table: Option<&str>) -> Result<Map<String, Value>> {
        let table = self.resolve(record, table)?;
        let mapped = self.map_keys(table, record)?;
        normalize(self.schema, &table.name, &mapped, Policy::serializer())
    }

    /// Determines which table `record` belongs to.
    pub fn resolve(&self, record: &Map<String, Value>, hint: Option<&str>) -> Result<&'a Arc<Table>> {
        if let Some(tag) = record.get(TABLE_NAME_KEY) {
            let Value::String(name) = tag else {
                bail!("`{TABLE_NAME_KEY}` must be a string, got {tag}");
            };
            return self.schema.expect_table(name);
        }

        if let Some(hint) = hint {
            return self.schema.expect_table(hint);
        }

        if let Some(Value::String(uri)) = record.get("resource_uri") {
            if let Some(parsed) = parse_resource_url(self.prefix, uri) {
                return self.schema.expect_table(&parsed.table);
            }
        }

        Err(Error::unresolved_table(summarize(record)))
    }

    fn map_keys(&self, table: &Arc<Table>, record: &Map<String, Value>) -> Result<Map<String, Value>> {
        let mut out = Map::new();

        for (key, value) in record {
            if let Some(reserved) = RESERVED_KEYS.iter().find(|r| r.eq_ignore_ascii_case(key)) {
                // A null id means "not saved yet" and is dropped.
                if *reserved == "id" && value.is_null() {
                    continue;
                }
                out.insert(reserved.to_string(), value.clone());
                continue;
            }

            match table.field(key) {
                Some(FieldRef::Literal(field)) => {
                    out.insert(field.name.clone(), value.clone());
                }
                Some(FieldRef::Relationship(relationship)) => {
                    let related = &relationship.related_table;
                    out.insert(relationship.name.clone(), self.nested(value, Some(related.as_str()))?);
                }
                None => {
                    warn!(table = %table.name, field = %key, "passing through undeclared field");
                    let value = match value {
                        Value::Object(nested)
                            if nested.contains_key(TABLE_NAME_KEY)
                                || nested.contains_key("resource_uri") =>
                        {
                            self.nested(value, None)?
                        }
                        other => other.clone(),
                    };
                    out.insert(key.clone(), value);
                }
            }
        }

        if !out.contains_key("resource_uri") {
            if let Some(id) = out.get("id").and_then(Value::as_i64) {
                let uri = resource_url(self.prefix, &table.name, id);
                out.insert("resource_uri".to_string(), Value::String(uri));
            }
        }

        Ok(out)
    }

    fn nested(&self, value: &Value, table: Option<&str>) -> Result<Value> {
        Ok(match value {
            Value::Object(record) => Value::Object(self.serialize(record, table)?),
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.nested(item, table)?);
                }
                Value::Array(out)
            }
            other => other.clone(),
        })
    }
}

fn summarize(record: &Map<String, Value>) -> String {
    let keys: Vec<&str> = record.keys().map(String::as_str).take(6).collect();
    let more = if record.len() > keys.len() { ", ..." } else { "" };
    format!("{{{}{more}}}", keys.join(", "))
}
