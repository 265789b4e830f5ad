//! Outbound SMTP, strictly best-effort: send failures are logged and never
//! surfaced to the request that triggered them.

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config;

pub struct Mailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from_address: String,
    reset_link_base: String,
}

impl Mailer {
    /// Build from config. Without SMTP settings the mailer is disabled and
    /// every send becomes a logged no-op.
    pub fn from_config() -> Self {
        let cfg = &config::config().smtp;
        let transport = match &cfg.host {
            Some(host) => {
                let builder = AsyncSmtpTransport::<Tokio1Executor>::relay(host);
                match builder {
                    Ok(mut builder) => {
                        if let (Some(user), Some(pass)) = (&cfg.username, &cfg.password) {
                            builder =
                                builder.credentials(Credentials::new(user.clone(), pass.clone()));
                        }
                        Some(builder.build())
                    }
                    Err(e) => {
                        warn!("invalid SMTP relay {}: {}; mail disabled", host, e);
                        None
                    }
                }
            }
            None => {
                info!("SMTP not configured; outbound mail disabled");
                None
            }
        };

        Self {
            transport,
            from_address: cfg.from_address.clone(),
            reset_link_base: cfg.reset_link_base.clone(),
        }
    }

    /// Password-expiry reminder, sent once per qualifying request.
    pub fn send_expiry_reminder(self: &Arc<Self>, to: String, days_left: i64) {
        let subject = "Your password is about to expire".to_string();
        let body = format!(
            "Your password expires in {} day(s). Please update it to keep access to your account.",
            days_left
        );
        self.send_in_background(to, subject, body);
    }

    pub fn send_password_reset(self: &Arc<Self>, to: String, reset_token: String) {
        let link = format!("{}/{}", self.reset_link_base, reset_token);
        let subject = "Password reset requested".to_string();
        let body = format!(
            "A password reset was requested for your account. The link below is valid for a short time:\n\n{}\n\nIf you did not request this, you can ignore this email.",
            link
        );
        self.send_in_background(to, subject, body);
    }

    /// Fire-and-forget: spawn the send and log the outcome.
    fn send_in_background(self: &Arc<Self>, to: String, subject: String, body: String) {
        let mailer = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = mailer.send(&to, &subject, &body).await {
                warn!("failed to send mail to {}: {}", to, e);
            }
        });
    }

    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        let transport = match &self.transport {
            Some(t) => t,
            None => {
                info!("mail to {} dropped (SMTP not configured): {}", to, subject);
                return Ok(());
            }
        };

        let message = Message::builder()
            .from(self.from_address.parse()?)
            .to(to.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;

        transport.send(message).await?;
        info!("sent mail to {}: {}", to, subject);
        Ok(())
    }
}
