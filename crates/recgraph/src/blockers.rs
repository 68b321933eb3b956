use indexmap::IndexMap;

/// A validation failure that prevents a resource from being saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveBlocker {
    /// Declared name of the field the blocker is attached to
    pub field: String,

    /// Identifies the check that raised it; re-running the check replaces
    /// or clears the blocker under the same key.
    pub key: String,

    /// Message shown to the user
    pub message: String,

    pub source: BlockerSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockerSource {
    /// Required or length check on the field definition
    FieldCheck,

    /// A table-specific rule
    BusinessRule,

    /// A uniqueness rule
    Uniqueness,
}

#[derive(Debug, Default)]
pub(crate) struct SaveBlockers {
    by_key: IndexMap<String, SaveBlocker>,
}

impl SaveBlocker {
    pub fn new(
        field: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
        source: BlockerSource,
    ) -> SaveBlocker {
        SaveBlocker {
            field: field.into(),
            key: key.into(),
            message: message.into(),
            source,
        }
    }
}

impl SaveBlockers {
    /// Returns true if the set changed.
    pub(crate) fn add(&mut self, blocker: SaveBlocker) -> bool {
        if self.by_key.get(&blocker.key) == Some(&blocker) {
            return false;
        }
        self.by_key.insert(blocker.key.clone(), blocker);
        true
    }

    pub(crate) fn remove(&mut self, key: &str) -> Option<SaveBlocker> {
        self.by_key.shift_remove(key)
    }

    pub(crate) fn all(&self) -> Vec<SaveBlocker> {
        self.by_key.values().cloned().collect()
    }

    pub(crate) fn for_field(&self, field: &str) -> Vec<SaveBlocker> {
        self.by_key
            .values()
            .filter(|blocker| blocker.field.eq_ignore_ascii_case(field))
            .cloned()
            .collect()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}
