use lettre::{
    address::AddressError,
    message::{header::ContentType, Mailbox},
    transport::smtp::SMTP_PORT,
    Message, SmtpTransport, Transport,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    error::Result,
    level::{LogRecord, SeverityLevel},
};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid mail server: {0}")]
    Server(String),

    #[error("invalid address {address}: {source}")]
    Address {
        address: String,
        #[source]
        source: AddressError,
    },

    #[error("failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("{0}")]
    Custom(String),
}

/// メールの送信先の設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailSettings {
    /// `host`、または`host:port`形式のSMTPサーバー。
    pub server: String,
    pub from: String,
    pub to: String,
    pub subject: String,
}

/// 送信するメール
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub settings: MailSettings,
    pub body: String,
}

/// メールを送信する手段
pub trait MailTransport: Send {
    fn send(&mut self, message: &MailMessage) -> std::result::Result<(), TransportError>;
}

/// 送信のたびにSMTPサーバーに接続して、平文でメールを送信する。
#[derive(Debug, Default, Clone, Copy)]
pub struct SmtpMailTransport;

impl MailTransport for SmtpMailTransport {
    fn send(&mut self, message: &MailMessage) -> std::result::Result<(), TransportError> {
        let email = compose(message)?;
        let (host, port) = parse_server(&message.settings.server)?;

        let mailer = SmtpTransport::builder_dangerous(host).port(port).build();
        mailer.send(&email)?;

        Ok(())
    }
}

/// `Subject`、`From`、`To`ヘッダーと、テキストの本文を持つメールを作成する。
fn compose(message: &MailMessage) -> std::result::Result<Message, TransportError> {
    let settings = &message.settings;

    let email = Message::builder()
        .from(parse_mailbox(&settings.from)?)
        .to(parse_mailbox(&settings.to)?)
        .subject(settings.subject.clone())
        .header(ContentType::TEXT_PLAIN)
        .body(message.body.clone())?;

    Ok(email)
}

fn parse_mailbox(address: &str) -> std::result::Result<Mailbox, TransportError> {
    address.parse().map_err(|source| TransportError::Address {
        address: address.to_string(),
        source,
    })
}

/// `host:port`をホストとポートに分割する。ポートを省略した場合は25番を使用する。
///
/// IPv6アドレスは`[addr]:port`、またはポートを省略した`addr`、`[addr]`の形式で指定する。
fn parse_server(server: &str) -> std::result::Result<(&str, u16), TransportError> {
    let server = server.trim();
    let invalid = || TransportError::Server(server.to_string());

    let (host, port) = if let Some(rest) = server.strip_prefix('[') {
        let (host, rest) = rest.split_once(']').ok_or_else(invalid)?;
        match rest {
            "" => (host, None),
            _ => (host, Some(rest.strip_prefix(':').ok_or_else(invalid)?)),
        }
    } else if server.find(':') == server.rfind(':') {
        match server.split_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (server, None),
        }
    } else {
        // コロンが2つ以上ある場合は、括弧のないIPv6アドレスとして扱う。
        (server, None)
    };

    let port = match port {
        Some(port) => port.parse().map_err(|_| invalid())?,
        None => SMTP_PORT,
    };
    if host.is_empty() {
        return Err(invalid());
    }

    Ok((host, port))
}

/// ログを蓄積して、まとめてメールで送信するシンク
///
/// `setup`で初期化されたあと、しきい値を満たすメッセージを本文に追記する。
/// `flush`で本文を送信すると未初期化に戻るため、再び`setup`するまでログは蓄積されない。
pub struct MailSink {
    settings: Option<MailSettings>,
    body: String,
    min_level: SeverityLevel,
    transport: Box<dyn MailTransport>,
}

impl MailSink {
    pub fn new(min_level: SeverityLevel, transport: Box<dyn MailTransport>) -> Self {
        Self {
            settings: None,
            body: String::new(),
            min_level,
            transport,
        }
    }

    /// 送信先を設定する。
    ///
    /// 異なる送信先が設定されていて、蓄積されたログがある場合は、以前の送信先に送信してから
    /// 新しい送信先を採用する。送信に失敗した場合は、以前の送信先と蓄積されたログを維持する。
    pub fn setup(
        &mut self,
        server: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        subject: impl Into<String>,
    ) -> Result<()> {
        let settings = MailSettings {
            server: server.into(),
            from: from.into(),
            to: to.into(),
            subject: subject.into(),
        };

        if let Some(current) = &self.settings {
            if *current != settings && !self.body.is_empty() {
                debug!("mail settings changed, sending pending logs");
                self.flush()?;
            }
        }
        self.settings = Some(settings);

        Ok(())
    }

    /// しきい値を満たすメッセージを本文に追記する。未初期化の場合は何もしない。
    pub fn log(&mut self, record: &LogRecord) {
        if self.settings.is_none() || !record.is_admitted_by(self.min_level) {
            return;
        }
        self.body.push_str(&record.message);
        self.body.push('\n');
    }

    /// 蓄積されたログを1通のメールとして送信して、未初期化に戻す。
    ///
    /// 未初期化の場合は何もしない。送信に失敗した場合、蓄積されたログは破棄しない。
    pub fn flush(&mut self) -> Result<()> {
        let Some(settings) = self.settings.take() else {
            return Ok(());
        };
        let message = MailMessage {
            settings,
            body: std::mem::take(&mut self.body),
        };

        match self.transport.send(&message) {
            Ok(()) => {
                info!(
                    to = %message.settings.to,
                    server = %message.settings.server,
                    "log mail sent"
                );
                Ok(())
            }
            Err(err) => {
                warn!(?err, "failed to send log mail, keeping accumulated logs");
                self.settings = Some(message.settings);
                self.body = message.body;
                Err(err.into())
            }
        }
    }

    pub fn is_initialised(&self) -> bool {
        self.settings.is_some()
    }

    pub fn settings(&self) -> Option<&MailSettings> {
        self.settings.as_ref()
    }

    /// 送信されていないメールの本文。
    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn min_level(&self) -> SeverityLevel {
        self.min_level
    }

    pub fn set_min_level(&mut self, min_level: SeverityLevel) {
        self.min_level = min_level;
    }
}
