//! # Interview Channels
//!
//! The interview talks to the user through two separate capabilities:
//!
//! - [`QuestionAsker`]: request/response. Suspends until an answer arrives.
//! - [`Notifier`]: one-way. Used for the completion message, which is not a
//!   question and must never wait for a reply.
//!
//! The channel-backed implementations let a transport (chat bot, websocket,
//! CLI) sit on the other side of a tokio channel, the same way approval
//! requests are handed to the UI.

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

/// Blocking question/answer capability
#[async_trait]
pub trait QuestionAsker: Send + Sync {
    async fn ask(&self, question: &str) -> anyhow::Result<String>;
}

/// Fire-and-forget message capability
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Notifier that only writes to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str) {
        tracing::info!(message, "Interview notification");
    }
}

/// A question waiting for the transport to answer it
#[derive(Debug)]
pub struct PendingQuestion {
    pub text: String,
    reply_tx: oneshot::Sender<String>,
}

impl PendingQuestion {
    /// Deliver the user's answer back to the interview
    pub fn answer(self, text: impl Into<String>) -> anyhow::Result<()> {
        self.reply_tx
            .send(text.into())
            .map_err(|_| anyhow::anyhow!("Interview is no longer waiting for an answer"))
    }
}

/// [`QuestionAsker`] backed by an mpsc request channel and a oneshot reply
#[derive(Debug, Clone)]
pub struct ChannelAsker {
    tx: mpsc::Sender<PendingQuestion>,
}

#[async_trait]
impl QuestionAsker for ChannelAsker {
    async fn ask(&self, question: &str) -> anyhow::Result<String> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(PendingQuestion {
                text: question.to_string(),
                reply_tx,
            })
            .await
            .map_err(|_| anyhow::anyhow!("Question channel closed"))?;

        reply_rx
            .await
            .map_err(|_| anyhow::anyhow!("Question dropped without an answer"))
    }
}

/// Create a question channel with the given buffer size
pub fn question_channel(buffer: usize) -> (ChannelAsker, mpsc::Receiver<PendingQuestion>) {
    let (tx, rx) = mpsc::channel(buffer);
    (ChannelAsker { tx }, rx)
}

/// [`Notifier`] that forwards messages over an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelNotifier {
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { tx }
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, message: &str) {
        if self.tx.send(message.to_string()).is_err() {
            tracing::debug!("Notification receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_asker_round_trip() {
        let (asker, mut rx) = question_channel(4);

        let responder = tokio::spawn(async move {
            let pending = rx.recv().await.unwrap();
            assert_eq!(pending.text, "What is the name of your project?");
            pending.answer("Green Yard").unwrap();
        });

        let answer = asker
            .ask("What is the name of your project?")
            .await
            .unwrap();
        assert_eq!(answer, "Green Yard");
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn test_channel_asker_fails_when_transport_gone() {
        let (asker, rx) = question_channel(1);
        drop(rx);
        assert!(asker.ask("Anyone there?").await.is_err());
    }

    #[tokio::test]
    async fn test_dropped_question_is_an_error() {
        let (asker, mut rx) = question_channel(1);
        tokio::spawn(async move {
            let pending = rx.recv().await.unwrap();
            drop(pending);
        });
        let err = asker.ask("Hello?").await.unwrap_err();
        assert!(err.to_string().contains("without an answer"));
    }

    #[test]
    fn test_channel_notifier_never_blocks() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let notifier = ChannelNotifier::new(tx);
        notifier.notify("done");
        assert_eq!(rx.try_recv().unwrap(), "done");

        drop(rx);
        notifier.notify("nobody listening");
    }
}
