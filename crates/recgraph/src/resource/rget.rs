use super::{Dependent, Resource};
use crate::schema::{FieldRef, Relationship};
use crate::{bail, err, Collection, Error, Result};

use serde_json::Value;

/// The target of a [`Resource::rget`] path.
#[derive(Debug, Clone)]
pub enum Related {
    Value(Value),
    Resource(Resource),
    Collection(Collection),
}

impl Resource {
    /// Follows a dotted, case-insensitive field path such as
    /// `"determinations"` or `"cataloger.lastName"`.
    ///
    /// Independent records along the path are fetched as needed; embedded
    /// dependents are used as they are. Returns `None` when a to-one
    /// relationship along the path is empty.
    pub async fn rget(&self, path: &str) -> Result<Option<Related>> {
        let path = path.trim();
        if path.is_empty() {
            return Ok(Some(Related::Resource(self.fetch().await?)));
        }

        let segments: Vec<&str> = path.split('.').collect();
        let mut current = self.clone();

        for (index, segment) in segments.iter().enumerate() {
            let last = index + 1 == segments.len();
            current.fetch().await?;

            let table = current.table().clone();
            let Some(field) = table.field(segment) else {
                return Err(Error::unknown_field(&table.name, *segment));
            };

            match field {
                FieldRef::Literal(field) => {
                    if !last {
                        bail!("cannot follow `{path}`: `{}.{}` is not a relationship", table.name, field.name);
                    }
                    return Ok(Some(Related::Value(current.get(&field.name).unwrap_or(Value::Null))));
                }
                FieldRef::Relationship(relationship) if relationship.is_to_many() => {
                    if !last {
                        bail!(
                            "cannot follow `{path}`: `{}.{}` is a to-many relationship",
                            table.name,
                            relationship.name
                        );
                    }
                    return Ok(Some(Related::Collection(current.to_many(relationship)?)));
                }
                FieldRef::Relationship(relationship) => {
                    let Some(next) = current.to_one(relationship)? else {
                        return Ok(None);
                    };
                    if last {
                        return Ok(Some(Related::Resource(next.fetch().await?)));
                    }
                    current = next;
                }
            }
        }

        Ok(None)
    }

    /// Like [`Resource::rget`], for paths ending at a to-one relationship.
    pub async fn rget_resource(&self, path: &str) -> Result<Option<Resource>> {
        match self.rget(path).await? {
            None => Ok(None),
            Some(Related::Resource(resource)) => Ok(Some(resource)),
            Some(_) => bail!("`{path}` on {} is not a to-one relationship", self.table().name),
        }
    }

    /// Like [`Resource::rget`], for paths ending at a to-many relationship.
    ///
    /// Dependent collections are returned as embedded. Independent ones come
    /// back as lazy collections that have not been fetched yet.
    pub async fn rget_collection(&self, path: &str) -> Result<Collection> {
        match self.rget(path).await? {
            Some(Related::Collection(collection)) => Ok(collection),
            _ => bail!("`{path}` on {} is not a to-many relationship", self.table().name),
        }
    }

    fn to_one(&self, relationship: &Relationship) -> Result<Option<Resource>> {
        let key = relationship.name.to_ascii_lowercase();

        if relationship.is_dependent() {
            return Ok(self.dependent_resource(&key));
        }

        if let Some(cached) = self.independent_resource(&key) {
            return Ok(Some(cached));
        }

        let reference = self.state().values.get(&key).cloned();
        let session = self.session().clone();
        let id = match &reference {
            Some(Value::String(url)) => Some(session.id_from_url(url).ok_or_else(|| {
                err!(
                    "`{}.{}` holds `{url}`, which is not a resource URL",
                    self.table().name,
                    relationship.name
                )
            })?),
            Some(Value::Number(number)) => number.as_i64(),
            _ => None,
        };
        let Some(id) = id else {
            return Ok(None);
        };

        let related = session.schema().related_table(relationship)?.clone();
        let object = Resource::with_id(&session, related, id);

        let mut st = self.state();
        let cached = st.independent.entry(key).or_insert(object).clone();
        Ok(Some(cached))
    }

    fn to_many(&self, relationship: &Relationship) -> Result<Collection> {
        let key = relationship.name.to_ascii_lowercase();
        let session = self.session().clone();
        let related = session.schema().related_table(relationship)?.clone();

        if relationship.is_dependent() {
            let embedded = match self.state().dependent.get(&key) {
                Some(Dependent::Many(collection)) => Some(collection.clone()),
                _ => None,
            };
            if let Some(collection) = embedded {
                return Ok(collection);
            }

            let collection = Collection::dependent(&session, related, vec![]);
            self.replace_dependent_many(relationship, Some(collection.clone()), Value::Null);
            return Ok(collection);
        }

        let existing = self.state().collections.get(&key).cloned();
        if let Some(collection) = existing {
            return Ok(collection);
        }

        let collection = match self.id() {
            None => Collection::lazy_empty(&session, related),
            Some(id) => {
                let Some(other_side) = &relationship.other_side_name else {
                    bail!(
                        "`{}.{}` has no other side to filter the related records on",
                        self.table().name,
                        relationship.name
                    );
                };
                Collection::lazy(
                    &session,
                    related,
                    vec![(other_side.to_ascii_lowercase(), id.to_string())],
                )
            }
        };

        let mut st = self.state();
        let collection = st.collections.entry(key).or_insert(collection).clone();
        Ok(collection)
    }
}

impl Related {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Related::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_resource(self) -> Option<Resource> {
        match self {
            Related::Resource(resource) => Some(resource),
            _ => None,
        }
    }

    pub fn into_collection(self) -> Option<Collection> {
        match self {
            Related::Collection(collection) => Some(collection),
            _ => None,
        }
    }
}
