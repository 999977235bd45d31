use std::fmt;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PresenceError {
    #[error("Encoding error: {0}")]
    Encoding(String),
    #[error("Decoding error: {0}")]
    Decoding(String),
    #[error("Range error: {value} does not fit in {type_name}")]
    Range { type_name: &'static str, value: String },
    #[error("Unsupported type: {type_name} ({detail})")]
    UnsupportedType { type_name: &'static str, detail: String },
    #[error("Config error: {0}")]
    Config(String),
}

impl PresenceError {
    /// Range violations are reported separately but are decoding failures all the same.
    pub fn is_decoding(&self) -> bool {
        matches!(self, Self::Decoding(_) | Self::Range { .. })
    }
    pub fn is_encoding(&self) -> bool {
        matches!(self, Self::Encoding(_))
    }
    /// Prefixes the message with `context`, keeping the kind of error.
    pub fn context(self, context: impl fmt::Display) -> Self {
        match self {
            Self::Encoding(msg) => Self::Encoding(format!("{context}: {msg}")),
            Self::Decoding(msg) => Self::Decoding(format!("{context}: {msg}")),
            Self::Config(msg) => Self::Config(format!("{context}: {msg}")),
            Self::UnsupportedType { type_name, detail } => Self::UnsupportedType {
                type_name,
                detail: format!("{context}: {detail}"),
            },
            range @ Self::Range { .. } => range,
        }
    }
    pub(crate) fn unsupported<T: ?Sized>(detail: impl Into<String>) -> Self {
        Self::UnsupportedType {
            type_name: std::any::type_name::<T>(),
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PresenceError>;

// Helper conversions
impl From<config::ConfigError> for PresenceError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
