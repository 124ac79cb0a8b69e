// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock chat channel for deterministic testing.
//!
//! `MockChannel` implements `ChatChannel` with injectable inbound updates and
//! captured outbound traffic for assertions.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use rentbot_core::chat::{EditMessage, InboundUpdate, MessageRef, OutboundMessage};
use rentbot_core::types::{AdapterType, HealthStatus};
use rentbot_core::{ChatChannel, PluginAdapter, RentError};

/// A document passed to `send_document`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentDocument {
    pub chat_id: i64,
    pub path: PathBuf,
    pub caption: Option<String>,
}

/// A mock messaging channel.
///
/// Updates injected via `inject()` are returned by `receive()`; everything
/// the bot sends is captured. After `close()` and once the queue drains,
/// `receive()` fails like a closed update stream.
pub struct MockChannel {
    inbound: Arc<Mutex<VecDeque<InboundUpdate>>>,
    sent: Arc<Mutex<Vec<OutboundMessage>>>,
    edits: Arc<Mutex<Vec<EditMessage>>>,
    answers: Arc<Mutex<Vec<(String, Option<String>)>>>,
    documents: Arc<Mutex<Vec<SentDocument>>>,
    notify: Arc<Notify>,
    closed: AtomicBool,
    fail_sends: AtomicBool,
    next_id: AtomicI32,
}

impl MockChannel {
    pub fn new() -> Self {
        Self {
            inbound: Arc::new(Mutex::new(VecDeque::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            edits: Arc::new(Mutex::new(Vec::new())),
            answers: Arc::new(Mutex::new(Vec::new())),
            documents: Arc::new(Mutex::new(Vec::new())),
            notify: Arc::new(Notify::new()),
            closed: AtomicBool::new(false),
            fail_sends: AtomicBool::new(false),
            next_id: AtomicI32::new(1),
        }
    }

    /// Queue an update for the next `receive()`.
    pub async fn inject(&self, update: InboundUpdate) {
        self.inbound.lock().await.push_back(update);
        self.notify.notify_one();
    }

    /// End the update stream once the queue is drained.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
        self.notify.notify_one();
    }

    /// Make every following send fail with a transport error.
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub async fn sent_messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().await.clone()
    }

    /// Messages delivered to one chat, in order.
    pub async fn sent_to(&self, chat_id: i64) -> Vec<OutboundMessage> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .cloned()
            .collect()
    }

    /// Text of the most recent message to `chat_id`.
    pub async fn last_text(&self, chat_id: i64) -> Option<String> {
        self.sent
            .lock()
            .await
            .iter()
            .rev()
            .find(|m| m.chat_id == chat_id)
            .map(|m| m.text.clone())
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    pub async fn edits(&self) -> Vec<EditMessage> {
        self.edits.lock().await.clone()
    }

    pub async fn answered_callbacks(&self) -> Vec<(String, Option<String>)> {
        self.answers.lock().await.clone()
    }

    pub async fn documents(&self) -> Vec<SentDocument> {
        self.documents.lock().await.clone()
    }

    /// Forget everything captured so far.
    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
        self.edits.lock().await.clear();
        self.answers.lock().await.clear();
        self.documents.lock().await.clear();
    }

    fn check_send(&self) -> Result<(), RentError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(RentError::transport("mock channel send failure"));
        }
        Ok(())
    }

    fn message_ref(&self, chat_id: i64) -> MessageRef {
        MessageRef {
            chat_id,
            message_id: self.next_id.fetch_add(1, Ordering::SeqCst),
        }
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockChannel {
    fn name(&self) -> &str {
        "mock-channel"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, RentError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RentError> {
        self.close();
        Ok(())
    }
}

#[async_trait]
impl ChatChannel for MockChannel {
    async fn connect(&mut self) -> Result<(), RentError> {
        Ok(())
    }

    async fn receive(&self) -> Result<InboundUpdate, RentError> {
        loop {
            let notified = self.notify.notified();
            {
                let mut queue = self.inbound.lock().await;
                if let Some(update) = queue.pop_front() {
                    return Ok(update);
                }
            }
            if self.closed.load(Ordering::SeqCst) {
                return Err(RentError::transport("mock channel closed"));
            }
            notified.await;
        }
    }

    async fn send(&self, msg: OutboundMessage) -> Result<MessageRef, RentError> {
        self.check_send()?;
        let reference = self.message_ref(msg.chat_id);
        self.sent.lock().await.push(msg);
        Ok(reference)
    }

    async fn edit(&self, edit: EditMessage) -> Result<(), RentError> {
        self.check_send()?;
        self.edits.lock().await.push(edit);
        Ok(())
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
    ) -> Result<(), RentError> {
        self.answers
            .lock()
            .await
            .push((callback_id.to_string(), text.map(str::to_string)));
        Ok(())
    }

    async fn send_document(
        &self,
        chat_id: i64,
        path: &Path,
        caption: Option<&str>,
    ) -> Result<MessageRef, RentError> {
        self.check_send()?;
        self.documents.lock().await.push(SentDocument {
            chat_id,
            path: path.to_path_buf(),
            caption: caption.map(str::to_string),
        });
        Ok(self.message_ref(chat_id))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rentbot_core::chat::Sender;

    use super::*;

    fn text(chat_id: i64, body: &str) -> InboundUpdate {
        InboundUpdate::Message {
            chat_id,
            sender: Sender {
                id: chat_id,
                username: None,
                first_name: "Test".into(),
                last_name: String::new(),
                language_code: None,
            },
            text: Some(body.into()),
            contact_phone: None,
        }
    }

    #[tokio::test]
    async fn receive_returns_injected_updates_in_order() {
        let channel = MockChannel::new();
        channel.inject(text(1, "first")).await;
        channel.inject(text(1, "second")).await;
        assert_eq!(channel.receive().await.unwrap(), text(1, "first"));
        assert_eq!(channel.receive().await.unwrap(), text(1, "second"));
    }

    #[tokio::test]
    async fn receive_waits_for_injection() {
        let channel = Arc::new(MockChannel::new());
        let injector = channel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            injector.inject(text(2, "delayed")).await;
        });
        let update = tokio::time::timeout(Duration::from_secs(2), channel.receive())
            .await
            .expect("receive timed out")
            .unwrap();
        assert_eq!(update.chat_id(), 2);
    }

    #[tokio::test]
    async fn close_ends_stream_after_drain() {
        let channel = MockChannel::new();
        channel.inject(text(3, "last")).await;
        channel.close();
        assert!(channel.receive().await.is_ok());
        assert!(channel.receive().await.is_err());
    }

    #[tokio::test]
    async fn sends_are_captured_with_distinct_ids() {
        let channel = MockChannel::new();
        let a = channel.send(OutboundMessage::text(5, "a")).await.unwrap();
        let b = channel.send(OutboundMessage::text(6, "b")).await.unwrap();
        assert_ne!(a.message_id, b.message_id);
        assert_eq!(channel.sent_count().await, 2);
        assert_eq!(channel.last_text(6).await.as_deref(), Some("b"));
        assert_eq!(channel.sent_to(5).await.len(), 1);

        channel.clear_sent().await;
        assert_eq!(channel.sent_count().await, 0);
    }

    #[tokio::test]
    async fn failing_sends_report_transport_errors() {
        let channel = MockChannel::new();
        channel.set_fail_sends(true);
        let err = channel.send(OutboundMessage::text(1, "x")).await.unwrap_err();
        assert!(matches!(err, RentError::Transport { .. }));
        assert_eq!(channel.sent_count().await, 0);
    }
}
