//! Chapter completion notices.
//!
//! Delivery is best effort: [`dispatch`] runs detached from the request that
//! completed the chapter, and failures end up in the log only.

pub mod relay;

use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::{
    config::NotifierConfig,
    outline::{ChapterNumber, CourseOutline},
    store::{ProgressStore, StoreError},
    student::StudentId,
};

pub use relay::RelayNotifier;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChapterNotice {
    pub recipient: String,
    pub chapter_number: ChapterNumber,
    pub chapter_title: String,
    pub homework: Option<String>,
}

impl ChapterNotice {
    pub fn new(recipient: String, chapter_number: ChapterNumber, outline: &CourseOutline) -> Self {
        let chapter = outline.chapter(chapter_number);
        Self {
            recipient,
            chapter_number,
            chapter_title: chapter
                .map(|ch| ch.display_title())
                .unwrap_or_else(|| format!("Chapter {chapter_number}")),
            homework: chapter.and_then(|ch| ch.homework.clone()),
        }
    }

    pub fn subject(&self) -> String {
        format!(
            "Chapter {} complete - new homework available",
            self.chapter_number
        )
    }

    pub fn body(&self) -> String {
        let mut body = format!(
            "Congratulations! You have completed chapter {}: {}.\n\n\
             A new homework assignment is available in your homework space.\n",
            self.chapter_number, self.chapter_title
        );
        if let Some(homework) = &self.homework {
            body.push('\n');
            body.push_str(homework.trim());
            body.push('\n');
        }
        body
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    Delivered,
    /// No transport configured, the notice was only logged
    Simulated,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("recipient lookup failed: {0}")]
    Recipient(#[from] StoreError),
    #[error("mail relay request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("mail relay rejected the message with status {0}")]
    Rejected(reqwest::StatusCode),
}

pub trait Notifier: Send + Sync {
    fn notify_chapter_complete<'a>(
        &'a self,
        notice: &'a ChapterNotice,
    ) -> BoxFuture<'a, Result<NotifyOutcome, NotifyError>>;
}

/// Logs notices instead of sending them
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify_chapter_complete<'a>(
        &'a self,
        notice: &'a ChapterNotice,
    ) -> BoxFuture<'a, Result<NotifyOutcome, NotifyError>> {
        Box::pin(async move {
            info!(
                "no mail relay configured, simulated chapter {} notice for {}",
                notice.chapter_number, notice.recipient
            );
            Ok(NotifyOutcome::Simulated)
        })
    }
}

/// Relay notifier when a relay url is configured, log notifier otherwise
pub fn from_config(
    config: &NotifierConfig,
    token: Option<String>,
) -> anyhow::Result<Arc<dyn Notifier>> {
    match &config.relay_url {
        Some(url) => Ok(Arc::new(RelayNotifier::new(
            url.clone(),
            config.from.clone(),
            token,
            config.timeout(),
        )?)),
        None => Ok(Arc::new(LogNotifier)),
    }
}

/// Look up the recipient and send the completion notice in the background.
/// Errors are logged and dropped.
pub fn dispatch(
    notifier: Arc<dyn Notifier>,
    store: Arc<dyn ProgressStore>,
    outline: Arc<CourseOutline>,
    student: StudentId,
    chapter: ChapterNumber,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let result = async {
            let recipient = store.recipient(student).await?;
            let notice = ChapterNotice::new(recipient, chapter, &outline);
            notifier.notify_chapter_complete(&notice).await
        }
        .await;
        match result {
            Ok(outcome) => info!(
                "chapter {chapter} homework notice for student {student}: {outcome:?}"
            ),
            Err(e) => error!(
                "failed to send chapter {chapter} homework notice to student {student}: {e}"
            ),
        }
    })
}
