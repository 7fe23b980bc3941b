//! ログ出力の設定ファイル
//!
//! ```toml
//! level = "info"
//!
//! [console]
//! level = "warning"
//!
//! [file]
//! path = "logs/run.log"
//! retention_count = 5
//!
//! [mail]
//! server = "localhost:25"
//! from = "batch@example.com"
//! to = "ops@example.com"
//! subject = "nightly run"
//! level = "error"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{
    error::{LogError, Result},
    level::SeverityLevel,
};

/// ファイルの世代数を省略したときの既定値
pub const DEFAULT_RETENTION_COUNT: u16 = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// しきい値を省略したシンクが使用する重要度。
    #[serde(default)]
    pub level: SeverityLevel,
    pub console: Option<ConsoleConfig>,
    pub file: Option<FileConfig>,
    pub mail: Option<MailConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConsoleConfig {
    pub level: Option<SeverityLevel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileConfig {
    pub path: PathBuf,
    #[serde(default = "default_retention_count")]
    pub retention_count: u16,
    pub level: Option<SeverityLevel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MailConfig {
    pub server: String,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub level: Option<SeverityLevel>,
}

fn default_retention_count() -> u16 {
    DEFAULT_RETENTION_COUNT
}

impl LoggingConfig {
    /// 設定ファイルを読み込む。
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| LogError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = LoggingConfig::from_toml_str("").unwrap();

        assert_eq!(LoggingConfig::default(), config);
        assert_eq!(SeverityLevel::Info, config.level);
    }

    #[test]
    fn test_full_config() {
        let config = LoggingConfig::from_toml_str(
            r#"
            level = "DEBUG"

            [console]

            [file]
            path = "logs/run.log"

            [mail]
            server = "localhost:2525"
            from = "batch@example.com"
            to = "ops@example.com"
            subject = "nightly run"
            level = "error"
            "#,
        )
        .unwrap();

        assert_eq!(SeverityLevel::Debug, config.level);
        assert_eq!(Some(ConsoleConfig::default()), config.console);
        let file = config.file.unwrap();
        assert_eq!(PathBuf::from("logs/run.log"), file.path);
        assert_eq!(DEFAULT_RETENTION_COUNT, file.retention_count);
        assert_eq!(None, file.level);
        let mail = config.mail.unwrap();
        assert_eq!("localhost:2525", mail.server);
        assert_eq!(Some(SeverityLevel::Error), mail.level);
    }

    #[test]
    fn test_invalid_level_is_rejected() {
        let err = LoggingConfig::from_toml_str(r#"level = "notvalid""#).unwrap_err();

        assert!(matches!(err, LogError::ConfigParse(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = LoggingConfig::load(dir.path().join("missing.toml")).unwrap_err();

        assert!(matches!(err, LogError::ConfigRead { .. }));
    }

    #[test]
    fn test_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logging.toml");
        std::fs::write(&path, "[console]\nlevel = \"warn\"\n").unwrap();

        let config = LoggingConfig::load(&path).unwrap();

        assert_eq!(Some(SeverityLevel::Warn), config.console.unwrap().level);
    }
}
