mod builder;
pub use builder::Builder;

use crate::rules::BusinessRules;
use crate::serialize::Serializer;
use crate::uri::{id_from_url, parse_resource_url, resource_url, DEFAULT_PREFIX};
use crate::{bail, err, Collection, Resource, Result, Schema, Transport};

use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Entry point for working with backend records.
///
/// Cloning is cheap; every clone shares the schema, transport and rules.
#[derive(Clone)]
pub struct Session {
    shared: Arc<Shared>,
}

struct Shared {
    schema: Arc<Schema>,
    transport: Arc<dyn Transport>,
    config: Config,
    rules: BusinessRules,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Path prefix of every resource URL
    pub api_prefix: String,

    /// Records requested per page by [`Collection::fetch`]
    pub page_size: usize,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            api_prefix: DEFAULT_PREFIX.to_string(),
            page_size: 20,
        }
    }
}

impl Session {
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.shared.schema
    }

    pub fn transport(&self) -> &dyn Transport {
        &*self.shared.transport
    }

    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    pub fn rules(&self) -> &BusinessRules {
        &self.shared.rules
    }

    pub fn serializer(&self) -> Serializer<'_> {
        Serializer::new(&self.shared.schema, &self.shared.config.api_prefix)
    }

    pub fn resource_url(&self, table: &str, id: i64) -> String {
        resource_url(&self.shared.config.api_prefix, table, id)
    }

    pub fn id_from_url(&self, url: &str) -> Option<i64> {
        id_from_url(&self.shared.config.api_prefix, url)
    }

    /// A new record of `table` with every field defaulted.
    pub fn create(&self, table: &str) -> Result<Resource> {
        self.create_with(table, Value::Object(Map::new()))
    }

    /// A new record of `table` initialized from `record`, which may be
    /// partial and use any key casing.
    pub fn create_with(&self, table: &str, record: Value) -> Result<Resource> {
        let Value::Object(record) = record else {
            bail!("expected an object to initialize {table}, got {record}");
        };
        self.deserialize_as(table, &record)
    }

    /// An unpopulated handle to the backend record `id` of `table`.
    pub fn resource(&self, table: &str, id: i64) -> Result<Resource> {
        let table = self.shared.schema.expect_table(table)?.clone();
        Ok(Resource::with_id(self, table, id))
    }

    /// An unpopulated handle to the record a resource URL points at.
    pub fn resource_from_url(&self, url: &str) -> Result<Resource> {
        let parsed = parse_resource_url(&self.shared.config.api_prefix, url)
            .ok_or_else(|| err!("`{url}` is not a resource URL"))?;
        let Some(id) = parsed.id else {
            bail!("`{url}` names a collection, not a record");
        };
        self.resource(&parsed.table, id)
    }

    /// Canonicalizes a raw record. See [`Serializer::serialize`].
    pub fn serialize(&self, record: &Map<String, Value>, table: Option<&str>) -> Result<Map<String, Value>> {
        self.serializer().serialize(record, table)
    }

    /// The canonical form of a live resource.
    pub fn serialize_resource(&self, resource: &Resource) -> Result<Map<String, Value>> {
        self.serializer()
            .serialize(&resource.to_json(), Some(&resource.table().name))
    }

    /// Builds a new resource from a canonical record.
    ///
    /// Every call allocates a new resource, even for an id seen before.
    pub fn deserialize(&self, record: &Map<String, Value>) -> Result<Resource> {
        let table = self.serializer().resolve(record, None)?.clone();
        Resource::from_canonical(self, table, record)
    }

    /// Serializes `record` against `table` and builds a resource from it.
    pub(crate) fn deserialize_as(&self, table: &str, record: &Map<String, Value>) -> Result<Resource> {
        let canonical = self.serializer().serialize(record, Some(table))?;
        let table = self.serializer().resolve(&canonical, Some(table))?.clone();
        Resource::from_canonical(self, table, &canonical)
    }

    /// A lazy collection of `table` matching `filters`.
    ///
    /// Pass `("domainfilter", "true")` to scope the query to the user's
    /// logged-in collection.
    pub fn collection<K, V>(&self, table: &str, filters: &[(K, V)]) -> Result<Collection>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let table = self.shared.schema.expect_table(table)?.clone();
        let filters = filters
            .iter()
            .map(|(key, value)| (key.as_ref().to_ascii_lowercase(), value.as_ref().to_string()))
            .collect();
        Ok(Collection::lazy(self, table, filters))
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("tables", &self.shared.schema.len())
            .field("transport", &self.shared.transport)
            .field("config", &self.shared.config)
            .finish()
    }
}
