use std::{io, result::Result as StdResult};

use thiserror::Error;

use crate::id::ElementId;

/// Result type for settop operations.
pub type Result<T> = StdResult<T, Error>;

/// Core error type.
///
/// Conditions that are expected during normal navigation - focusing an empty
/// target, removing a listener that does not exist, going to a scene nobody
/// registered - are not errors. Those operations return `false` instead.
#[derive(PartialEq, Eq, Error, Debug, Clone)]
pub enum Error {
    #[error("unknown scene: {0}")]
    /// A scene name was used that was never registered.
    UnknownScene(String),
    #[error("duplicate scene: {0}")]
    /// A scene was registered twice under the same name.
    DuplicateScene(String),
    #[error("element not found: {0:?}")]
    /// An element id does not refer to a live element.
    ElementNotFound(ElementId),
    #[error("scene: {0}")]
    /// A scene failed while being created or initialized.
    Scene(String),
    #[error("config: {0}")]
    /// Configuration could not be parsed.
    Config(String),
    #[error("io: {0}")]
    /// Terminal or file IO failure.
    Io(String),
    #[error("internal: {0}")]
    /// Internal error.
    Internal(String),
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}
