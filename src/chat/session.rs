//! Explicit per-conversation state: message history and cancellation flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use uuid::Uuid;

use super::message::{ChatMessage, Role};

/// Shared handle to a session's stop request.
///
/// The stop endpoint holds one clone and sets it; the controller polls its
/// own clone between deltas.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create a cleared flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the running generation to stop at the next delta boundary.
    pub fn request(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Clear a previous request.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    /// Whether a stop was requested since the last reset.
    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Ordered message history plus cancellation state for one conversation.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    messages: Vec<ChatMessage>,
    cancel: CancelFlag,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Start an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            messages: Vec::new(),
            cancel: CancelFlag::new(),
        }
    }

    /// Session identifier.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Full history, oldest first.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Number of messages.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the session has no messages yet.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Append a message.
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Append a user message.
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(ChatMessage::user(content));
    }

    /// Append an assistant message.
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.push(ChatMessage::assistant(content));
    }

    /// Role of the newest message.
    #[must_use]
    pub fn last_role(&self) -> Option<Role> {
        self.messages.last().map(|m| m.role)
    }

    /// A reply may only be generated when the newest message is the user's.
    #[must_use]
    pub fn awaits_reply(&self) -> bool {
        self.last_role() == Some(Role::User)
    }

    /// Clone of the cancellation handle.
    #[must_use]
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }
}
