//! Error types shared by the encoders and the config loader.

use thiserror::Error;

/// Failure of an encode call.
///
/// Dropped predicates (missing bounds, unsupported operators or geometry
/// types) are not errors: they are logged and left out of the output.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The filter was supplied as JSON text that did not decode.
    #[error("invalid filter descriptor: {0}")]
    Parse(#[from] serde_json::Error),

    /// No attribute, spatial or cross-layer predicate source was supplied.
    #[error("filter descriptor has no predicate to encode")]
    EmptyFilter,

    /// Both `filterFields` and `simpleFilterFields` carry fields.
    #[error("filterFields and simpleFilterFields are mutually exclusive")]
    AmbiguousFieldSources,

    /// `filterFields` were given without any `groupFields` to hang them on.
    #[error("filterFields require at least one group in groupFields")]
    MissingGroups,

    /// A field or group points at a group id that does not exist.
    #[error("'{owner}' references unknown group {group}")]
    UnknownGroup { owner: String, group: String },

    /// Two groups share the same id.
    #[error("group {id} is declared more than once")]
    DuplicateGroup { id: String },

    /// Following parent links from this group leads back to it.
    #[error("group {id} is part of a parent cycle")]
    GroupCycle { id: String },
}

/// Failure while loading an [`EncoderConfig`](crate::config::EncoderConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file does not exist: {0}")]
    Missing(String),

    #[error("cannot read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config file {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
