mod error;
pub use error::{Error, IntoError};

pub mod schema;
pub use schema::Schema;

pub mod transport;
pub use transport::Transport;

pub mod uri;

/// A Result type alias that uses recgraph's [`Error`] type.
pub type Result<T> = core::result::Result<T, Error>;

pub use async_trait::async_trait;
