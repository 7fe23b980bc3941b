use std::{io, path::PathBuf};

use thiserror::Error;

use crate::mail::TransportError;

pub type Result<T> = std::result::Result<T, LogError>;

#[derive(Debug, Error)]
pub enum LogError {
    /// ローテーション、またはログファイルへの書き込みに失敗した。
    #[error("failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write to console: {0}")]
    Console(#[source] io::Error),

    #[error("failed to format timestamp: {0}")]
    Format(#[from] time::error::Format),

    /// メールの送信に失敗した。蓄積されたログは破棄されていない。
    #[error("failed to send mail: {0}")]
    Transport(#[from] TransportError),

    #[error("failed to read config {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid logging config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl LogError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        LogError::Io {
            action,
            path: path.into(),
            source,
        }
    }
}
