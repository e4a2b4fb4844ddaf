//! Webhook notification dispatch for received messages.
//!
//! Fire-and-forget HTTP POST of message events as JSON.

use serde::Serialize;
use tracing::warn;

use aprs_core::MessageReport;

/// JSON body posted for each message.
#[derive(Debug, Serialize)]
struct MessagePayload<'a> {
    event_type: &'static str,
    from: &'a str,
    to: &'a str,
    text: &'a str,
    id: Option<&'a str>,
}

impl<'a> From<&'a MessageReport> for MessagePayload<'a> {
    fn from(m: &'a MessageReport) -> Self {
        MessagePayload {
            event_type: "message",
            from: m.source.as_str(),
            to: &m.to,
            text: &m.text,
            id: m.id.as_deref(),
        }
    }
}

/// Dispatches message events to a webhook URL via HTTP POST.
#[derive(Clone)]
pub struct WebhookDispatcher {
    url: String,
    client: reqwest::Client,
}

impl WebhookDispatcher {
    pub fn new(url: &str) -> Self {
        WebhookDispatcher {
            url: url.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Fire-and-forget POST of a message as JSON.
    pub fn notify(&self, message: &MessageReport) {
        let payload = match serde_json::to_value(MessagePayload::from(message)) {
            Ok(v) => v,
            Err(e) => {
                warn!("webhook payload: {e}");
                return;
            }
        };

        let client = self.client.clone();
        let url = self.url.clone();

        tokio::spawn(async move {
            if let Err(e) = client.post(&url).json(&payload).send().await {
                warn!("webhook POST failed: {e}");
            }
        });
    }
}
