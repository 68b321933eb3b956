use super::Resource;
use crate::schema::{Field, FieldRef, Relationship};
use crate::{bail, Collection, Error, Result};

use serde_json::{Map, Value};
use tracing::{trace, warn};

/// A value assignable to a field with [`Resource::set`].
#[derive(Debug, Clone)]
pub enum FieldValue {
    /// Plain data: literals, URLs, ids, inline records or arrays of them
    Json(Value),

    Resource(Resource),

    Resources(Vec<Resource>),

    Collection(Collection),
}

impl Resource {
    /// Assigns `value` to `field`.
    ///
    /// Literal values are converted to the declared type. Relationships
    /// accept resources, URLs, ids or inline records depending on their
    /// kind. Assigning an unchanged value is a no-op and emits nothing.
    pub fn set(&self, field: &str, value: impl Into<FieldValue>) -> Result<()> {
        let value = value.into();
        let table = self.table().clone();

        if table.is_id_field(field) {
            return self.set_id(value);
        }
        if field.eq_ignore_ascii_case("resource_uri") || field.eq_ignore_ascii_case(crate::TABLE_NAME_KEY) {
            trace!(table = %table.name, field, "ignoring assignment to derived key");
            return Ok(());
        }

        let Some(declared) = table.field(field) else {
            if field.eq_ignore_ascii_case("recordset_info") {
                if let FieldValue::Json(value) = value {
                    self.state().extras.insert("recordset_info".to_string(), value);
                }
                return Ok(());
            }
            return Err(Error::unknown_field(&table.name, field));
        };

        match declared {
            FieldRef::Literal(field) => self.set_literal(field, value),
            FieldRef::Relationship(relationship) => {
                match (relationship.is_dependent(), relationship.is_to_many()) {
                    (false, false) => self.set_independent(relationship, value),
                    (true, false) => self.set_dependent_one(relationship, value),
                    (true, true) => self.set_dependent_many(relationship, value),
                    (false, true) => {
                        warn!(
                            table = %table.name,
                            field = %relationship.name,
                            "independent to-many relationships are read-only; ignoring assignment"
                        );
                        Ok(())
                    }
                }
            }
        }
    }

    /// Assigns every key of `record`, stopping at the first failure.
    pub fn set_many(&self, record: Value) -> Result<()> {
        let Value::Object(record) = record else {
            bail!("expected an object of field values, got {record}");
        };
        self.set_fields(record)
    }

    pub(crate) fn set_fields(&self, record: Map<String, Value>) -> Result<()> {
        for (field, value) in record {
            self.set(&field, value)?;
        }
        Ok(())
    }

    fn set_id(&self, value: FieldValue) -> Result<()> {
        let id = match value {
            FieldValue::Json(Value::Null) => None,
            FieldValue::Json(Value::Number(number)) if number.as_i64().is_some() => number.as_i64(),
            FieldValue::Json(Value::String(id)) if id.trim().parse::<i64>().is_ok() => id.trim().parse().ok(),
            FieldValue::Json(other) => {
                return Err(Error::type_conversion(&other, format!("{}.id", self.table().name), "Long"))
            }
            _ => bail!("the id of {} must be a number", self.table().name),
        };

        let changed = {
            let mut st = self.state();
            let changed = st.id != id;
            st.id = id;
            changed
        };
        if changed {
            self.field_changed("id");
        }
        Ok(())
    }

    fn set_literal(&self, field: &Field, value: FieldValue) -> Result<()> {
        let FieldValue::Json(value) = value else {
            bail!(
                "cannot assign a resource to literal field `{}.{}`",
                self.table().name,
                field.name
            );
        };

        let value = field.coerce(&self.table().name, value)?;
        let key = field.name.to_ascii_lowercase();

        let changed = {
            let mut st = self.state();
            if st.values.get(&key) == Some(&value) {
                false
            } else {
                st.values.insert(key.clone(), value);
                st.dirty.insert(key);
                true
            }
        };

        if changed {
            self.field_changed(&field.name);
        }
        Ok(())
    }

    fn set_independent(&self, relationship: &Relationship, value: FieldValue) -> Result<()> {
        let session = self.session().clone();

        let (object, reference) = match value {
            FieldValue::Resource(object) => {
                self.check_related(relationship, &object)?;
                let url = object.url().map_or(Value::Null, Value::String);
                (Some(object), url)
            }
            FieldValue::Json(Value::Null) => (None, Value::Null),
            FieldValue::Json(Value::String(url)) => (self.cached_for_url(relationship, &url), Value::String(url)),
            FieldValue::Json(Value::Number(number)) => {
                let Some(id) = number.as_i64() else {
                    return Err(Error::type_conversion(
                        &Value::Number(number),
                        format!("{}.{}", self.table().name, relationship.name),
                        "Long",
                    ));
                };
                let url = session.resource_url(&relationship.related_table, id);
                (self.cached_for_url(relationship, &url), Value::String(url))
            }
            FieldValue::Json(Value::Object(record)) => {
                let object = session.deserialize_as(&relationship.related_table, &record)?;
                let url = object.url().map_or(Value::Null, Value::String);
                (Some(object), url)
            }
            other => {
                warn!(
                    table = %self.table().name,
                    field = %relationship.name,
                    value = ?other,
                    "ignoring malformed value for to-one relationship"
                );
                return Ok(());
            }
        };

        if self.replace_independent(relationship, object, reference) {
            self.mark_dirty(&relationship.name);
            self.field_changed(&relationship.name);
        }
        Ok(())
    }

    fn set_dependent_one(&self, relationship: &Relationship, value: FieldValue) -> Result<()> {
        let session = self.session().clone();

        let (child, display) = match value {
            FieldValue::Resource(child) => {
                self.check_related(relationship, &child)?;
                if child.ptr_eq(self) {
                    bail!("{} cannot own itself through `{}`", self.table().name, relationship.name);
                }
                (Some(child), Value::Null)
            }
            FieldValue::Json(Value::Object(record)) => {
                (Some(session.deserialize_as(&relationship.related_table, &record)?), Value::Null)
            }
            FieldValue::Json(Value::Null) => (None, Value::Null),
            FieldValue::Json(Value::String(url)) => {
                warn!(
                    table = %self.table().name,
                    field = %relationship.name,
                    %url,
                    "expected inline data for dependent field; clearing embedded record"
                );
                (None, Value::String(url))
            }
            other => {
                warn!(
                    table = %self.table().name,
                    field = %relationship.name,
                    value = ?other,
                    "ignoring malformed value for dependent to-one relationship"
                );
                return Ok(());
            }
        };

        if self.replace_dependent_one(relationship, child, display) {
            self.mark_dirty(&relationship.name);
            self.field_changed(&relationship.name);
        }
        Ok(())
    }

    fn set_dependent_many(&self, relationship: &Relationship, value: FieldValue) -> Result<()> {
        let session = self.session().clone();
        let related = session.schema().related_table(relationship)?.clone();

        let collection = match value {
            FieldValue::Resources(members) => {
                for member in &members {
                    self.check_related(relationship, member)?;
                }
                Collection::dependent(&session, related, members)
            }
            FieldValue::Json(Value::Array(items)) => {
                let mut members = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Object(record) => {
                            members.push(session.deserialize_as(&relationship.related_table, &record)?)
                        }
                        other => warn!(
                            table = %self.table().name,
                            field = %relationship.name,
                            value = %other,
                            "skipping non-record element of dependent collection"
                        ),
                    }
                }
                Collection::dependent(&session, related, members)
            }
            FieldValue::Collection(collection)
                if collection.is_dependent()
                    && collection.table().name.eq_ignore_ascii_case(&relationship.related_table) =>
            {
                collection
            }
            other => {
                warn!(
                    table = %self.table().name,
                    field = %relationship.name,
                    value = ?other,
                    "dependent to-many relationships can only be replaced by records; ignoring assignment"
                );
                return Ok(());
            }
        };

        if self.replace_dependent_many(relationship, Some(collection), Value::Null) {
            self.mark_dirty(&relationship.name);
            self.field_changed(&relationship.name);
        }
        Ok(())
    }

    fn check_related(&self, relationship: &Relationship, object: &Resource) -> Result<()> {
        if object.table().name.eq_ignore_ascii_case(&relationship.related_table) {
            return Ok(());
        }
        bail!(
            "`{}.{}` expects a {} resource, got {}",
            self.table().name,
            relationship.name,
            relationship.related_table,
            object.table().name
        )
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> FieldValue {
        FieldValue::Json(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> FieldValue {
        FieldValue::Json(Value::from(value))
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> FieldValue {
        FieldValue::Json(Value::from(value))
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> FieldValue {
        FieldValue::Json(Value::from(value))
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> FieldValue {
        FieldValue::Json(Value::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> FieldValue {
        FieldValue::Json(Value::from(value))
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> FieldValue {
        FieldValue::Json(Value::from(value))
    }
}

impl From<Resource> for FieldValue {
    fn from(value: Resource) -> FieldValue {
        FieldValue::Resource(value)
    }
}

impl From<&Resource> for FieldValue {
    fn from(value: &Resource) -> FieldValue {
        FieldValue::Resource(value.clone())
    }
}

impl From<Option<Resource>> for FieldValue {
    fn from(value: Option<Resource>) -> FieldValue {
        match value {
            Some(resource) => FieldValue::Resource(resource),
            None => FieldValue::Json(Value::Null),
        }
    }
}

impl From<Vec<Resource>> for FieldValue {
    fn from(value: Vec<Resource>) -> FieldValue {
        FieldValue::Resources(value)
    }
}

impl From<Collection> for FieldValue {
    fn from(value: Collection) -> FieldValue {
        FieldValue::Collection(value)
    }
}
