use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{debug, info};

use crate::config::{MailConfig, SmtpTls};

#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> anyhow::Result<()>;
}

/// Builds the verification mail carrying `otp`.
pub fn otp_mail(to: &str, otp: &str, ttl_minutes: i64) -> OutgoingMail {
    OutgoingMail {
        to: to.to_string(),
        subject: "Your SmartBus verification code".into(),
        text: format!("Your verification code is {otp}. It is valid for {ttl_minutes} minutes."),
        html: format!(
            "<p>Your verification code is <strong>{otp}</strong>. It is valid for {ttl_minutes} minutes.</p>"
        ),
    }
}

#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(host: &str, cfg: &MailConfig) -> anyhow::Result<Self> {
        let tls = match cfg.smtp_tls {
            SmtpTls::None => Tls::None,
            mode => {
                let params = TlsParameters::new(host.into())
                    .with_context(|| format!("tls parameters for {host}"))?;
                match mode {
                    SmtpTls::Starttls => Tls::Required(params),
                    SmtpTls::Wrapper => Tls::Wrapper(params),
                    _ => Tls::Opportunistic(params),
                }
            }
        };
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(cfg.smtp_port)
            .tls(tls);
        if let (Some(user), Some(pass)) = (&cfg.smtp_user, &cfg.smtp_pass) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }
        let from = cfg
            .from
            .parse::<Mailbox>()
            .with_context(|| format!("invalid EMAIL_FROM {:?}", cfg.from))?;
        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> anyhow::Result<()> {
        let to = mail
            .to
            .parse::<Mailbox>()
            .with_context(|| format!("invalid recipient {:?}", mail.to))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject)
            .multipart(MultiPart::alternative_plain_html(mail.text, mail.html))
            .context("build message")?;
        self.transport.send(message).await.context("smtp send")?;
        debug!(to = %mail.to, "mail sent");
        Ok(())
    }
}

/// Development transport: writes the mail to the log instead of sending it.
#[derive(Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> anyhow::Result<()> {
        info!(to = %mail.to, subject = %mail.subject, body = %mail.text, "mail not sent (SMTP_HOST unset)");
        Ok(())
    }
}

pub fn mailer_from_config(cfg: &MailConfig) -> anyhow::Result<Arc<dyn Mailer>> {
    Ok(match cfg.smtp_host.as_deref() {
        Some(host) => Arc::new(SmtpMailer::new(host, cfg)?) as Arc<dyn Mailer>,
        None => Arc::new(LogMailer) as Arc<dyn Mailer>,
    })
}
