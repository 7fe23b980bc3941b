use std::{fmt, str::FromStr};

use serde::Deserialize;
use time::OffsetDateTime;

/// ログの重要度
///
/// 値が大きいほど重要度が高い。各シンクは、しきい値以上の重要度を持つログのみを記録する。
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum SeverityLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Critical,
}

impl SeverityLevel {
    /// 出力に使用する重要度の名前を返却する。
    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityLevel::Debug => "DEBUG",
            SeverityLevel::Info => "INFO",
            SeverityLevel::Warn => "WARNING",
            SeverityLevel::Error => "ERROR",
            SeverityLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown severity level: {0}")]
pub struct ParseLevelError(String);

impl FromStr for SeverityLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(SeverityLevel::Debug),
            "info" => Ok(SeverityLevel::Info),
            "warn" | "warning" => Ok(SeverityLevel::Warn),
            "error" => Ok(SeverityLevel::Error),
            "critical" => Ok(SeverityLevel::Critical),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

impl TryFrom<String> for SeverityLevel {
    type Error = ParseLevelError;

    fn try_from(value: String) -> Result<Self, ParseLevelError> {
        value.parse()
    }
}

/// 1回のログ呼び出しで各シンクに渡されるレコード
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub level: SeverityLevel,
    pub message: String,
    /// ログを出力した日時。
    pub timestamp: OffsetDateTime,
}

impl LogRecord {
    /// 現在日時で`LogRecord`を作成する。
    ///
    /// ローカルのオフセットを取得できない場合はUTCを使用する。
    pub fn new(level: SeverityLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc()),
        }
    }

    /// `min_level`のしきい値を持つシンクがこのレコードを受け付けるか判定する。
    pub fn is_admitted_by(&self, min_level: SeverityLevel) -> bool {
        self.level >= min_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_ordered() {
        assert!(SeverityLevel::Debug < SeverityLevel::Info);
        assert!(SeverityLevel::Info < SeverityLevel::Warn);
        assert!(SeverityLevel::Warn < SeverityLevel::Error);
        assert!(SeverityLevel::Error < SeverityLevel::Critical);
    }

    #[test]
    fn test_parse_level() {
        assert_eq!("INFO".parse::<SeverityLevel>(), Ok(SeverityLevel::Info));
        assert_eq!("warning".parse::<SeverityLevel>(), Ok(SeverityLevel::Warn));
        assert_eq!(" warn ".parse::<SeverityLevel>(), Ok(SeverityLevel::Warn));
        assert!("notvalid".parse::<SeverityLevel>().is_err());
    }

    #[test]
    fn test_record_admission() {
        let levels = [
            SeverityLevel::Debug,
            SeverityLevel::Info,
            SeverityLevel::Warn,
            SeverityLevel::Error,
            SeverityLevel::Critical,
        ];
        for message_level in levels {
            let record = LogRecord::new(message_level, "x");
            for min_level in levels {
                assert_eq!(
                    message_level >= min_level,
                    record.is_admitted_by(min_level)
                );
            }
        }
    }
}
