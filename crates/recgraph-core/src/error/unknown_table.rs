use super::Error;

/// Error when a table name is not present in the loaded schema.
#[derive(Debug)]
pub(super) struct UnknownTableError {
    name: Box<str>,
}

impl std::error::Error for UnknownTableError {}

impl core::fmt::Display for UnknownTableError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "unknown table `{}`", self.name)
    }
}

impl Error {
    /// Creates an unknown table error.
    pub fn unknown_table(name: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::UnknownTable(UnknownTableError {
            name: name.into().into(),
        }))
    }

    /// Returns `true` if this error is an unknown table error.
    pub fn is_unknown_table(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::UnknownTable(_))
    }
}
