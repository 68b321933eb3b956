use super::Error;

/// Error when no table can be determined for a record.
///
/// Resolution tries the `_tableName` tag, then the caller-supplied table, then
/// the `resource_uri` path segment.
#[derive(Debug)]
pub(super) struct UnresolvedTableError {
    record: Box<str>,
}

impl std::error::Error for UnresolvedTableError {}

impl core::fmt::Display for UnresolvedTableError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "unable to determine the table of record {}; add a `_tableName` key, a `resource_uri`, or pass the table explicitly",
            self.record
        )
    }
}

impl Error {
    /// Creates an unresolved table error. `record` is a short rendering of the input.
    pub fn unresolved_table(record: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::UnresolvedTable(UnresolvedTableError {
            record: record.into().into(),
        }))
    }

    /// Returns `true` if this error is an unresolved table error.
    pub fn is_unresolved_table(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::UnresolvedTable(_))
    }
}
