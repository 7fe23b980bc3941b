use std::path::Path;

use tracing::warn;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::{
    appenders::RotatingFileSink,
    config::LoggingConfig,
    console::ConsoleSink,
    error::Result,
    level::{LogRecord, SeverityLevel},
    mail::{MailSink, MailTransport, SmtpMailTransport},
};

/// 1回のログ呼び出しを、設定されたすべてのシンクに振り分ける。
///
/// 各シンクは最初の`setup_*`の呼び出しで作成され、以降の呼び出しでは再設定される。
/// しきい値を省略した場合、シンクを作成するときはマネージャーの既定値を使用し、
/// 作成済みのシンクではしきい値を変更しない。
pub struct LogManager {
    default_min_level: SeverityLevel,
    file: Option<RotatingFileSink>,
    console: Option<ConsoleSink>,
    mail: Option<MailSink>,
    mail_transport: Option<Box<dyn MailTransport>>,
    console_writer: Option<BoxMakeWriter>,
}

impl LogManager {
    pub fn new(default_min_level: SeverityLevel) -> Self {
        Self {
            default_min_level,
            file: None,
            console: None,
            mail: None,
            mail_transport: None,
            console_writer: None,
        }
    }

    /// 設定ファイルの内容ですべてのシンクを設定した`LogManager`を作成する。
    pub fn from_config(config: &LoggingConfig) -> Result<Self> {
        let mut manager = Self::new(config.level);
        manager.apply_config(config)?;
        Ok(manager)
    }

    /// メールのシンクが使用する送信手段を指定する。既定はSMTP。
    pub fn with_mail_transport(mut self, transport: impl MailTransport + 'static) -> Self {
        self.mail_transport = Some(Box::new(transport));
        self
    }

    /// コンソールのシンクが使用するライターを指定する。既定は標準出力。
    pub fn with_console_writer(mut self, make_writer: BoxMakeWriter) -> Self {
        self.console_writer = Some(make_writer);
        self
    }

    /// 設定ファイルに記述されたシンクを設定する。
    pub fn apply_config(&mut self, config: &LoggingConfig) -> Result<()> {
        if let Some(console) = &config.console {
            self.setup_console(console.level);
        }
        if let Some(file) = &config.file {
            self.setup_file(&file.path, file.retention_count, file.level)?;
        }
        if let Some(mail) = &config.mail {
            self.setup_mail(&mail.server, &mail.from, &mail.to, &mail.subject, mail.level)?;
        }

        Ok(())
    }

    /// ファイルへの出力を設定する。
    ///
    /// # 引数
    ///
    /// * path: ログファイルのパス。空文字列の場合、ファイルへの出力を無効にする。
    /// * retention_count: 残す過去の世代の最大数。
    /// * min_level: 記録するログの最小の重要度。
    pub fn setup_file(
        &mut self,
        path: impl AsRef<Path>,
        retention_count: u16,
        min_level: Option<SeverityLevel>,
    ) -> Result<()> {
        let default = self.default_min_level;
        let sink = self
            .file
            .get_or_insert_with(|| RotatingFileSink::new(min_level.unwrap_or(default)));
        let min_level = min_level.unwrap_or(sink.min_level());

        sink.setup(path, retention_count, min_level)
    }

    /// メールへの出力を設定する。
    ///
    /// 異なる送信先が設定済みで、送信されていないログがある場合は、以前の送信先に送信する。
    pub fn setup_mail(
        &mut self,
        server: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        subject: impl Into<String>,
        min_level: Option<SeverityLevel>,
    ) -> Result<()> {
        let default = self.default_min_level;
        let sink = self.mail.get_or_insert_with(|| {
            let transport = self
                .mail_transport
                .take()
                .unwrap_or_else(|| Box::new(SmtpMailTransport));
            MailSink::new(min_level.unwrap_or(default), transport)
        });
        if let Some(min_level) = min_level {
            sink.set_min_level(min_level);
        }

        sink.setup(server, from, to, subject)
    }

    /// コンソールへの出力を設定する。
    pub fn setup_console(&mut self, min_level: Option<SeverityLevel>) {
        let default = self.default_min_level;
        let sink = self.console.get_or_insert_with(|| {
            let level = min_level.unwrap_or(default);
            match self.console_writer.take() {
                Some(make_writer) => ConsoleSink::with_writer(level, make_writer),
                None => ConsoleSink::new(level),
            }
        });
        let min_level = min_level.unwrap_or(sink.min_level());

        sink.setup(min_level);
    }

    /// すべてのシンクにログを出力する。
    ///
    /// あるシンクで失敗しても、残りのシンクには出力する。失敗した場合は最初のエラーを返却する。
    pub fn log(&mut self, level: SeverityLevel, message: impl Into<String>) -> Result<()> {
        let record = LogRecord::new(level, message);
        let mut result = Ok(());

        if let Some(mail) = self.mail.as_mut() {
            mail.log(&record);
        }
        if let Some(console) = self.console.as_ref() {
            keep_first_error(&mut result, console.write(&record));
        }
        if let Some(file) = self.file.as_mut() {
            keep_first_error(&mut result, file.write(&record));
        }

        result
    }

    pub fn debug(&mut self, message: impl Into<String>) -> Result<()> {
        self.log(SeverityLevel::Debug, message)
    }

    pub fn info(&mut self, message: impl Into<String>) -> Result<()> {
        self.log(SeverityLevel::Info, message)
    }

    pub fn warn(&mut self, message: impl Into<String>) -> Result<()> {
        self.log(SeverityLevel::Warn, message)
    }

    pub fn error(&mut self, message: impl Into<String>) -> Result<()> {
        self.log(SeverityLevel::Error, message)
    }

    pub fn critical(&mut self, message: impl Into<String>) -> Result<()> {
        self.log(SeverityLevel::Critical, message)
    }

    /// 蓄積されたログをメールで送信する。メールが設定されていない場合は何もしない。
    pub fn flush_mail(&mut self) -> Result<()> {
        match self.mail.as_mut() {
            Some(mail) => mail.flush(),
            None => Ok(()),
        }
    }

    pub fn default_min_level(&self) -> SeverityLevel {
        self.default_min_level
    }

    pub fn file_sink(&self) -> Option<&RotatingFileSink> {
        self.file.as_ref()
    }

    pub fn console_sink(&self) -> Option<&ConsoleSink> {
        self.console.as_ref()
    }

    pub fn mail_sink(&self) -> Option<&MailSink> {
        self.mail.as_ref()
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new(SeverityLevel::default())
    }
}

fn keep_first_error(result: &mut Result<()>, next: Result<()>) {
    if let Err(err) = next {
        if result.is_ok() {
            *result = Err(err);
        } else {
            warn!(?err, "additional sink failure");
        }
    }
}
