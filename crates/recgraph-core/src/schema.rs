mod builder;
pub use builder::{Builder, TableBuilder};

mod field;
pub use field::{Field, FieldType};

mod json;

mod name;
pub use name::Name;

mod relationship;
pub use relationship::{Dependency, Relationship, RelationshipKind};

mod table;
pub use table::{FieldRef, Table, TableId};

mod verify;

use crate::{Error, Result};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of every table known to the client.
///
/// A schema is built once, before any resource is created, and shared by
/// reference afterwards. Lookups by name are case-insensitive.
#[derive(Debug, Default)]
pub struct Schema {
    /// Tables keyed by lower-cased name
    tables: IndexMap<String, Arc<Table>>,

    /// Maps numeric table ids to lower-cased names
    by_id: HashMap<TableId, String>,
}

impl Schema {
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Loads a schema from the backend's JSON datamodel description.
    pub fn from_json(src: &str) -> Result<Schema> {
        json::load(src)
    }

    pub fn tables(&self) -> impl Iterator<Item = &Arc<Table>> {
        self.tables.values()
    }

    /// Get a table by name, ignoring case.
    pub fn table(&self, name: &str) -> Option<&Arc<Table>> {
        self.tables.get(&name.to_ascii_lowercase())
    }

    pub fn table_by_id(&self, id: TableId) -> Option<&Arc<Table>> {
        self.by_id.get(&id).and_then(|name| self.tables.get(name))
    }

    /// Get a table by name, failing with an unknown table error.
    pub fn expect_table(&self, name: &str) -> Result<&Arc<Table>> {
        self.table(name).ok_or_else(|| Error::unknown_table(name))
    }

    /// The table on the other end of `relationship`.
    pub fn related_table(&self, relationship: &Relationship) -> Result<&Arc<Table>> {
        self.expect_table(&relationship.related_table)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    fn insert(&mut self, table: Table) -> Result<()> {
        let key = table.name.to_ascii_lowercase();
        if self.tables.contains_key(&key) {
            return Err(Error::invalid_schema(format!(
                "table `{}` is registered twice",
                table.name
            )));
        }
        if let Some(existing) = self.by_id.get(&table.table_id) {
            return Err(Error::invalid_schema(format!(
                "table `{}` reuses table id {} of `{}`",
                table.name, table.table_id, existing
            )));
        }
        self.by_id.insert(table.table_id, key.clone());
        self.tables.insert(key, Arc::new(table));
        Ok(())
    }
}
