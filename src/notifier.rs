// =============================================================================
// Notifier — alert emails through the Mailgun HTTP relay
// =============================================================================
//
// Each triggered alert becomes one spawned delivery task. The caller gets the
// task's JoinHandle back and may await it; nobody has to. Relay failures are
// logged inside the task and never retried. The alert was already removed
// from the book when the task was spawned, so a failed send is final.
// =============================================================================

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

use crate::alerts::TriggeredAlert;
use crate::config::MailConfig;
use crate::error::RelayError;

/// A fully rendered email ready for the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
}

/// Anything that can deliver an [`OutboundMail`].
#[async_trait]
pub trait MailRelay: Send + Sync {
    async fn send(&self, mail: &OutboundMail) -> Result<(), RelayError>;
}

// =============================================================================
// Notifier
// =============================================================================

pub struct Notifier {
    relay: Arc<dyn MailRelay>,
    from: String,
}

impl Notifier {
    pub fn new(relay: Arc<dyn MailRelay>, from: impl Into<String>) -> Self {
        Self {
            relay,
            from: from.into(),
        }
    }

    /// Render the fixed alert template.
    pub fn compose(&self, triggered: &TriggeredAlert) -> OutboundMail {
        let alert = &triggered.alert;
        OutboundMail {
            from: self.from.clone(),
            to: alert.email.clone(),
            subject: format!("Price Alert for {}!", alert.symbol),
            text: format!(
                "This is an automated alert from ETF Snapshot.\n\n\
                 The price for {} has reached your target of ${}.\n\n\
                 The current price is ${}.",
                alert.symbol, alert.target_text, triggered.price
            ),
        }
    }

    /// Spawn delivery of one alert email.
    pub fn notify(&self, triggered: TriggeredAlert) -> JoinHandle<Result<(), RelayError>> {
        let mail = self.compose(&triggered);
        let relay = Arc::clone(&self.relay);

        info!(
            symbol = %triggered.alert.symbol,
            to = %mail.to,
            "sending price alert"
        );

        tokio::spawn(async move {
            let result = relay.send(&mail).await;
            if let Err(e) = &result {
                error!(to = %mail.to, error = %e, "failed to send alert email");
            }
            result
        })
    }
}

// =============================================================================
// Mailgun relay
// =============================================================================

pub struct MailgunRelay {
    api_key: String,
    messages_url: String,
    client: reqwest::Client,
}

impl MailgunRelay {
    pub fn new(config: &MailConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("failed to build mail relay HTTP client")?;

        Ok(Self {
            api_key: config.api_key.clone(),
            messages_url: format!(
                "{}/v3/{}/messages",
                config.base_url.trim_end_matches('/'),
                config.domain
            ),
            client,
        })
    }
}

#[async_trait]
impl MailRelay for MailgunRelay {
    #[instrument(skip(self, mail), fields(to = %mail.to), name = "mailgun::send")]
    async fn send(&self, mail: &OutboundMail) -> Result<(), RelayError> {
        let resp = self
            .client
            .post(&self.messages_url)
            .basic_auth("api", Some(&self.api_key))
            .form(&[
                ("from", mail.from.as_str()),
                ("to", mail.to.as_str()),
                ("subject", mail.subject.as_str()),
                ("text", mail.text.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(RelayError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!(response = %body.trim(), "email accepted by relay");
        Ok(())
    }
}
