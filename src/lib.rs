//! Multi Sink Logger
//!
//! ----------------------------------------------------------------------------
//!
//! このクレートには、`LogManager`構造体が含まれており、この構造体は、1回のログ呼び出しを
//! 複数の出力先（シンク）に振り分けることを目的としている。
//! 長時間実行されるバッチやデーモンの実行記録を残し、終了時に概要をメールで送信するために使用する。
//!
//! `LogManager`は、以下のシンクをそれぞれ最大1つ持ち、シンクごとにしきい値を設定できる。
//!
//! - コンソール: 標準出力にすぐに書き込む。
//! - ファイル: 設定されたとき、既存のログファイルを`{path}.1`, `{path}.2`, ...に退避する。
//!   残す世代数を超えた場合、最も古いファイルから削除する。
//! - メール: ログを蓄積して、`flush_mail`が呼び出されたときに1通のメールとして送信する。

pub mod appenders;
pub mod config;
pub mod console;
pub mod error;
pub mod level;
pub mod mail;
pub mod manager;

pub use appenders::RotatingFileSink;
pub use config::LoggingConfig;
pub use console::ConsoleSink;
pub use error::{LogError, Result};
pub use level::{LogRecord, SeverityLevel};
pub use mail::{
    MailMessage, MailSettings, MailSink, MailTransport, SmtpMailTransport, TransportError,
};
pub use manager::LogManager;
