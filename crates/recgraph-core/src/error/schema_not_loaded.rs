use super::Error;

/// Error when the runtime is used before schema metadata has been provided.
#[derive(Debug)]
pub(super) struct SchemaNotLoadedError {
    step: Box<str>,
}

impl std::error::Error for SchemaNotLoadedError {}

impl core::fmt::Display for SchemaNotLoadedError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "schema not loaded; {}", self.step)
    }
}

impl Error {
    /// Creates a schema not loaded error. `step` names the missing bootstrap step.
    pub fn schema_not_loaded(step: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::SchemaNotLoaded(SchemaNotLoadedError {
            step: step.into().into(),
        }))
    }

    /// Returns `true` if this error is a schema not loaded error.
    pub fn is_schema_not_loaded(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::SchemaNotLoaded(_))
    }
}
