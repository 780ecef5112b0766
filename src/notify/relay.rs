use std::time::Duration;

use futures::future::BoxFuture;
use serde::Serialize;

use super::{ChapterNotice, Notifier, NotifyError, NotifyOutcome};

#[derive(Debug, Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: String,
    text: String,
}

/// Hands notices to an HTTP mail relay as JSON
#[derive(Debug, Clone)]
pub struct RelayNotifier {
    client: reqwest::Client,
    url: String,
    from: String,
    token: Option<String>,
}

impl RelayNotifier {
    pub fn new(
        url: String,
        from: String,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url,
            from,
            token,
        })
    }
}

impl Notifier for RelayNotifier {
    fn notify_chapter_complete<'a>(
        &'a self,
        notice: &'a ChapterNotice,
    ) -> BoxFuture<'a, Result<NotifyOutcome, NotifyError>> {
        Box::pin(async move {
            let message = RelayMessage {
                from: &self.from,
                to: &notice.recipient,
                subject: notice.subject(),
                text: notice.body(),
            };
            let mut request = self.client.post(&self.url).json(&message);
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }
            let response = request.send().await?;
            if !response.status().is_success() {
                return Err(NotifyError::Rejected(response.status()));
            }
            Ok(NotifyOutcome::Delivered)
        })
    }
}
