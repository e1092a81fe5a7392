//! Error types for enemy data loading and configuration.

use thiserror::Error;

/// Errors that can occur when reading enemy data files.
#[derive(Debug, Error)]
pub enum DataLoadError {
    /// File could not be read.
    #[error("Failed to read file '{path}': {details}")]
    ReadError { path: String, details: String },

    /// RON parsing failed.
    #[error("Parse error in '{path}': {details}")]
    ParseError { path: String, details: String },
}

/// Tuning values that would leave the simulation in a broken state.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("No enemy archetypes are defined")]
    NoArchetypes,

    #[error("Wave override for wave {wave} names unknown archetype '{name}'")]
    UnknownArchetype { wave: u32, name: String },

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}
