use super::Error;

/// Error when a save is refused because validation blockers are present on the
/// resource or one of its dependent descendants.
#[derive(Debug)]
pub(super) struct SaveBlockedError {
    table: Box<str>,
    fields: Vec<String>,
}

impl std::error::Error for SaveBlockedError {}

impl core::fmt::Display for SaveBlockedError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "save blocked: {} has unresolved blockers on {}",
            self.table,
            self.fields.join(", ")
        )
    }
}

impl Error {
    /// Creates a save blocked error listing the blocked fields.
    pub fn save_blocked(table: impl Into<String>, fields: Vec<String>) -> Error {
        Error::from(super::ErrorKind::SaveBlocked(SaveBlockedError {
            table: table.into().into(),
            fields,
        }))
    }

    /// Returns `true` if this error is a save blocked error.
    pub fn is_save_blocked(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::SaveBlocked(_))
    }
}
