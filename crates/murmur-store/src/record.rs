//! Stored message records.
//!
//! A [`ClientMessage`] is what the store actually keeps: the canonical
//! message plus metadata only this client knows about (delivery status,
//! upload progress, local previews, the time the record entered the cache).

use murmur_proto::{ChannelId, Message, MessageId, Timestamp};

/// Delivery status of a message from this client's point of view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DeliveryStatus {
    /// Submitted, not yet confirmed by the server.
    Sending,
    /// Confirmed by the server. Every canonical record is `Sent`.
    #[default]
    Sent,
    /// Submission failed; the record stays visible for retry.
    Failed,
}

/// Upload state of one attached file.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadState {
    /// Fraction uploaded, `0.0..=1.0`.
    pub progress: f32,
    /// Local preview reference (object URL, file path) shown until the
    /// remote asset has loaded.
    pub preview: Option<String>,
}

impl UploadState {
    /// Upload that has not started, with an optional local preview.
    pub fn pending(preview: Option<String>) -> Self {
        Self { progress: 0.0, preview }
    }

    /// Set progress, clamped to `0.0..=1.0`. NaN counts as no progress.
    pub fn set_progress(&mut self, progress: f32) {
        self.progress = if progress.is_nan() { 0.0 } else { progress.clamp(0.0, 1.0) };
    }

    /// True once every byte has been sent.
    pub fn is_complete(&self) -> bool {
        self.progress >= 1.0
    }
}

/// A message as stored in the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientMessage {
    /// Canonical (or optimistic placeholder) message.
    pub message: Message,
    /// Delivery status.
    pub status: DeliveryStatus,
    /// Per-file upload state, parallel to `message.attachments` while
    /// uploading. Empty once nothing is in flight.
    pub uploads: Vec<UploadState>,
    /// Error text of the last failed submission.
    pub error: Option<String>,
    /// When the record first entered the cache. Set by the store.
    pub inserted_at: Option<Timestamp>,
}

impl ClientMessage {
    /// Record for a server-confirmed message.
    pub fn canonical(message: Message) -> Self {
        Self {
            message,
            status: DeliveryStatus::Sent,
            uploads: Vec::new(),
            error: None,
            inserted_at: None,
        }
    }

    /// Placeholder for a message submitted but not yet confirmed.
    pub fn optimistic(message: Message, uploads: Vec<UploadState>) -> Self {
        Self { message, status: DeliveryStatus::Sending, uploads, error: None, inserted_at: None }
    }

    /// Message id.
    pub fn id(&self) -> &MessageId {
        &self.message.id
    }

    /// Channel id.
    pub fn channel_id(&self) -> &ChannelId {
        &self.message.channel_id
    }

    /// Server creation time.
    pub fn created_at(&self) -> Timestamp {
        self.message.created_at
    }

    /// Correlation nonce, if the message was submitted by a client.
    pub fn nonce(&self) -> Option<&str> {
        self.message.nonce.as_deref()
    }

    /// True while the record is a local placeholder.
    pub fn is_optimistic(&self) -> bool {
        self.status != DeliveryStatus::Sent
    }

    /// Merge `candidate` into this (existing) record.
    ///
    /// Canonical fields, status and error come from the candidate. The
    /// insertion stamp of the existing record survives, and so do its upload
    /// states when the candidate carries none.
    pub(crate) fn merge(&mut self, candidate: Self) {
        let inserted_at = self.inserted_at.or(candidate.inserted_at);
        let uploads = if candidate.uploads.is_empty() {
            std::mem::take(&mut self.uploads)
        } else {
            candidate.uploads
        };

        *self = Self {
            message: candidate.message,
            status: candidate.status,
            uploads,
            error: candidate.error,
            inserted_at,
        };
    }
}
