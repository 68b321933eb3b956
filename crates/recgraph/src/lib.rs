//! Client-side binding layer between backend records and a live, mutable
//! object graph.
//!
//! A [`Session`] owns the schema, the transport and the business rules.
//! Records arrive as flat JSON with URL foreign keys, pass through the
//! [`Serializer`] and become [`Resource`]s. Owned ("dependent") relationships
//! are embedded inline as child resources or [`Collection`]s; referenced
//! ("independent") ones are fetched on demand.

mod blockers;
pub use blockers::{BlockerSource, SaveBlocker};

pub mod collection;
pub use collection::Collection;

mod event;
pub use event::{Event, ListenerId};

mod in_flight;

pub mod normalize;
pub use normalize::{normalize, Mode, Policy};

pub mod resource;
pub use resource::{FieldValue, Related, Resource};

pub mod rules;
pub use rules::{BusinessRules, FieldRule, UniquenessRule, UniquenessRules};

mod save;

pub mod serialize;
pub use serialize::Serializer;

pub mod session;
pub use session::Session;

pub use recgraph_core::{bail, err, schema, transport, uri, Error, Result, Schema, Transport};

/// Keys the serializer treats as part of every record rather than as fields.
pub const RESERVED_KEYS: [&str; 4] = ["id", "resource_uri", "recordset_info", "_tableName"];

/// The in-memory table tag stamped on canonical records.
pub const TABLE_NAME_KEY: &str = "_tableName";
