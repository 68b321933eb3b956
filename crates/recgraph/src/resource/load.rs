use super::Resource;
use crate::in_flight::{self, Turn};
use crate::schema::{FieldRef, Relationship, Table};
use crate::transport::Request;
use crate::{bail, Collection, Error, Event, Result, Session};

use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// How backend data is applied to a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Load {
    /// Building a resource from a canonical record
    Create,

    /// Refreshing from the backend; local edits survive
    Fetch,

    /// Reconciling with a save response; backend data wins everywhere
    Save,
}

impl Resource {
    /// Builds a resource from a canonical record. The resource counts as
    /// populated if the record carries an id.
    pub(crate) fn from_canonical(
        session: &Session,
        table: Arc<Table>,
        record: &Map<String, Value>,
    ) -> Result<Resource> {
        let resource = Resource::new(session, table);
        resource.apply(record, Load::Create)?;
        Ok(resource)
    }

    /// Loads the record from the backend unless it is new or already
    /// populated. Concurrent calls share one request.
    pub async fn fetch(&self) -> Result<Resource> {
        self.fetch_if(false).await
    }

    /// Loads the record from the backend even if it is already populated.
    pub async fn refetch(&self) -> Result<Resource> {
        self.fetch_if(true).await
    }

    /// True while a fetch for this resource is outstanding.
    pub fn is_fetching(&self) -> bool {
        self.inner.fetch.is_pending()
    }

    async fn fetch_if(&self, force: bool) -> Result<Resource> {
        let Some(id) = self.id() else {
            return Ok(self.clone());
        };
        if !force && self.is_populated() {
            return Ok(self.clone());
        }

        match self.inner.fetch.turn() {
            Turn::Follower(rx) => in_flight::follow(rx).await?,
            Turn::Leader(leader) => {
                let result = self.request_record(id).await;
                leader.finish(result)?
            }
        }
        Ok(self.clone())
    }

    async fn request_record(&self, id: i64) -> Result<()> {
        let session = self.session().clone();
        let table = self.table().clone();
        let url = session.resource_url(&table.name, id);

        debug!(table = %table.name, id, "fetching resource");
        let response = session
            .transport()
            .request(Request::get(&url).expect_status(404))
            .await?;

        if response.status == 404 {
            return Err(Error::record_not_found(url));
        }
        if !response.is_success() {
            return Err(Error::transport_status(response.status, &url));
        }

        let record = match response.data {
            Value::Object(record) => record,
            other => bail!("expected a record from {url}, got {other}"),
        };

        let canonical = session.serializer().serialize(&record, Some(&table.name))?;
        self.apply(&canonical, Load::Fetch)?;
        self.emit(&Event::Loaded);
        Ok(())
    }

    /// Applies a canonical record without emitting per-field events.
    pub(crate) fn apply(&self, record: &Map<String, Value>, mode: Load) -> Result<()> {
        let session = self.session().clone();
        let table = self.table().clone();

        let keep: HashSet<String> = match mode {
            Load::Fetch => self.state().dirty.iter().cloned().collect(),
            Load::Create | Load::Save => HashSet::new(),
        };

        let id = match record.get("id") {
            Some(id) => id.as_i64(),
            None => match record.get("resource_uri") {
                Some(Value::String(uri)) => session.id_from_url(uri),
                _ => None,
            },
        };

        for (key, value) in record {
            if matches!(key.as_str(), "id" | "resource_uri" | crate::TABLE_NAME_KEY) {
                continue;
            }

            let Some(field) = table.field(key) else {
                self.state().extras.insert(key.clone(), value.clone());
                continue;
            };

            let lower = field.name().to_ascii_lowercase();
            if keep.contains(&lower) {
                trace!(table = %table.name, field = %field.name(), "keeping local edit over fetched value");
                continue;
            }

            match field {
                FieldRef::Literal(field) if table.is_id_field(&field.name) => {}
                FieldRef::Literal(_) => {
                    self.state().values.insert(lower, value.clone());
                }
                FieldRef::Relationship(relationship) => {
                    self.load_relationship(&session, relationship, value, mode)?;
                }
            }
        }

        let mut st = self.state();
        if id.is_some() {
            st.id = id;
        }
        match mode {
            Load::Create => st.populated = st.id.is_some(),
            Load::Fetch => st.populated = true,
            Load::Save => {
                st.populated = true;
                st.dirty.clear();
                st.collections.clear();
            }
        }
        Ok(())
    }

    fn load_relationship(
        &self,
        session: &Session,
        relationship: &Relationship,
        value: &Value,
        mode: Load,
    ) -> Result<()> {
        let related = session.schema().related_table(relationship)?.clone();

        if relationship.is_independent() {
            if relationship.is_to_many() {
                self.state()
                    .values
                    .insert(relationship.name.to_ascii_lowercase(), value.clone());
                return Ok(());
            }

            let (object, reference) = match value {
                Value::Object(record) => {
                    let object = Resource::from_canonical(session, related, record)?;
                    let url = object.url().map_or(Value::Null, Value::String);
                    (Some(object), url)
                }
                Value::String(url) => (self.cached_for_url(relationship, url), value.clone()),
                Value::Number(number) => match number.as_i64() {
                    Some(id) => {
                        let url = session.resource_url(&related.name, id);
                        (self.cached_for_url(relationship, &url), Value::String(url))
                    }
                    None => (None, value.clone()),
                },
                _ => (None, value.clone()),
            };
            self.replace_independent(relationship, object, reference);
            return Ok(());
        }

        if mode == Load::Fetch && self.embedded_needs_saved(relationship) {
            trace!(
                table = %self.table().name,
                field = %relationship.name,
                "keeping edited dependent data over fetched value"
            );
            return Ok(());
        }

        if relationship.is_to_many() {
            match value {
                Value::Array(items) => {
                    let mut members = Vec::with_capacity(items.len());
                    for item in items {
                        match item {
                            Value::Object(record) => {
                                members.push(Resource::from_canonical(session, related.clone(), record)?)
                            }
                            other => warn!(
                                table = %self.table().name,
                                field = %relationship.name,
                                value = %other,
                                "skipping non-record element of dependent collection"
                            ),
                        }
                    }
                    let collection = Collection::dependent(session, related, members);
                    self.replace_dependent_many(relationship, Some(collection), Value::Null);
                }
                Value::String(url) => {
                    warn!(
                        table = %self.table().name,
                        field = %relationship.name,
                        %url,
                        "expected inline data for dependent field; clearing embedded records"
                    );
                    self.replace_dependent_many(relationship, None, value.clone());
                }
                _ => {
                    let collection = Collection::dependent(session, related, vec![]);
                    self.replace_dependent_many(relationship, Some(collection), Value::Null);
                }
            }
            return Ok(());
        }

        match value {
            Value::Object(record) => {
                let child = Resource::from_canonical(session, related, record)?;
                self.replace_dependent_one(relationship, Some(child), Value::Null);
            }
            Value::String(url) => {
                warn!(
                    table = %self.table().name,
                    field = %relationship.name,
                    %url,
                    "expected inline data for dependent field; clearing embedded record"
                );
                self.replace_dependent_one(relationship, None, value.clone());
            }
            _ => {
                self.replace_dependent_one(relationship, None, Value::Null);
            }
        }
        Ok(())
    }

    fn embedded_needs_saved(&self, relationship: &Relationship) -> bool {
        let embedded = self
            .state()
            .dependent
            .get(&relationship.name.to_ascii_lowercase())
            .cloned();
        embedded.is_some_and(|embedded| {
            embedded.members().iter().any(Resource::needs_saved)
        })
    }
}
