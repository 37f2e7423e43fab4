//! Optimistic message submission.
//!
//! A submission is shown immediately as a `Sending` placeholder keyed by a
//! fresh nonce. The server echoes the nonce on the created message, whether
//! that arrives as the REST response or as a stream event first, and
//! reconciliation collapses the placeholder into the canonical record.

use std::fmt::Display;

use murmur_client::MessageCreate;
use murmur_core::Environment;
use murmur_proto::{Attachment, AuthorId, ChannelId, Message, MessageId, Timestamp};
use murmur_store::{ClientMessage, StoreError, SyncStore, UploadState};

/// Prefix of placeholder ids.
pub const LOCAL_ID_PREFIX: &str = "local-";

/// A file attached to an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    /// File metadata. `url` stays `None` until the upload is stored.
    pub attachment: Attachment,
    /// Local preview shown while uploading.
    pub preview: Option<String>,
}

/// A placeholder in the store and the request that will confirm it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Target channel
    pub channel: ChannelId,
    /// Placeholder id
    pub local_id: MessageId,
    /// REST request body
    pub body: MessageCreate,
}

/// Creates and settles optimistic placeholders.
#[derive(Debug, Clone)]
pub struct Outbox<E> {
    env: E,
}

impl<E: Environment> Outbox<E> {
    /// Outbox drawing nonces from `env`.
    pub fn new(env: E) -> Self {
        Self { env }
    }

    /// Insert a `Sending` placeholder and build its request.
    pub fn prepare(
        &self,
        store: &mut SyncStore,
        channel: &ChannelId,
        author: &AuthorId,
        content: impl Into<String>,
        files: Vec<PendingFile>,
        now: Timestamp,
    ) -> Result<Submission, StoreError> {
        let nonce = self.env.nonce();
        let local_id = MessageId::new(format!("{LOCAL_ID_PREFIX}{nonce}"));

        let (attachments, uploads): (Vec<Attachment>, Vec<UploadState>) = files
            .into_iter()
            .map(|file| (file.attachment, UploadState::pending(file.preview)))
            .unzip();

        let mut message =
            Message::new(local_id.clone(), channel.clone(), author.clone(), content, now)
                .with_nonce(nonce.clone());
        message.attachments.clone_from(&attachments);
        let body = MessageCreate { content: message.content.clone(), nonce, attachments };

        store.insert_optimistic(channel, ClientMessage::optimistic(message, uploads), now)?;
        tracing::debug!(channel = %channel, local = %local_id, "message submitted");

        Ok(Submission { channel: channel.clone(), local_id, body })
    }

    /// Settle a submission with the server's record.
    pub fn confirm(
        &self,
        store: &mut SyncStore,
        submission: &Submission,
        message: Message,
        now: Timestamp,
    ) {
        store.reconcile_by_nonce(&submission.channel, message, now);
    }

    /// Mark a submission failed. The placeholder stays for retry.
    pub fn fail(&self, store: &mut SyncStore, submission: &Submission, error: impl Display) {
        tracing::warn!(
            channel = %submission.channel,
            local = %submission.local_id,
            %error,
            "submission failed"
        );
        store.mark_failed(&submission.channel, &submission.local_id, error.to_string());
    }

    /// Flip a failed placeholder back to `Sending` and rebuild its request.
    ///
    /// `None` if the record is missing, not failed, or carries no nonce.
    pub fn retry(
        &self,
        store: &mut SyncStore,
        channel: &ChannelId,
        local_id: &MessageId,
    ) -> Option<Submission> {
        let record = store.mark_retrying(channel, local_id)?;
        let nonce = record.nonce()?.to_owned();
        let message = record.message;
        Some(Submission {
            channel: channel.clone(),
            local_id: local_id.clone(),
            body: MessageCreate {
                content: message.content,
                nonce,
                attachments: message.attachments,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use murmur_harness::SimEnv;
    use murmur_store::DeliveryStatus;

    use super::*;

    fn at(ms: i64) -> Timestamp {
        Timestamp::from_millis(ms)
    }

    fn file(name: &str) -> PendingFile {
        PendingFile {
            attachment: Attachment {
                filename: name.into(),
                content_type: Some("image/png".into()),
                size: 10,
                url: None,
            },
            preview: Some(format!("blob:{name}")),
        }
    }

    #[test]
    fn prepare_inserts_sending_placeholder() {
        let outbox = Outbox::new(SimEnv::with_seed(1));
        let mut store = SyncStore::default();
        let c1 = ChannelId::new("c1");

        let files = vec![file("a.png")];
        let submission =
            outbox.prepare(&mut store, &c1, &"me".into(), "hello", files, at(5)).unwrap();

        assert!(submission.local_id.as_str().starts_with(LOCAL_ID_PREFIX));
        assert_eq!(submission.body.content, "hello");
        assert_eq!(submission.body.attachments.len(), 1);

        let record = store.message(&c1, &submission.local_id).unwrap();
        assert_eq!(record.status, DeliveryStatus::Sending);
        assert_eq!(record.nonce(), Some(submission.body.nonce.as_str()));
        assert_eq!(record.uploads[0].preview.as_deref(), Some("blob:a.png"));
    }

    #[test]
    fn confirm_collapses_placeholder() {
        let outbox = Outbox::new(SimEnv::with_seed(1));
        let mut store = SyncStore::default();
        let c1 = ChannelId::new("c1");
        let submission =
            outbox.prepare(&mut store, &c1, &"me".into(), "hi", vec![], at(5)).unwrap();

        let server =
            Message::new("m9", "c1", "me", "hi", at(7)).with_nonce(submission.body.nonce.clone());
        outbox.confirm(&mut store, &submission, server, at(8));

        assert_eq!(store.ordered_ids(&c1), [MessageId::new("m9")]);
        assert_eq!(store.message(&c1, &"m9".into()).unwrap().status, DeliveryStatus::Sent);
    }

    #[test]
    fn fail_then_retry() {
        let outbox = Outbox::new(SimEnv::with_seed(1));
        let mut store = SyncStore::default();
        let c1 = ChannelId::new("c1");
        let submission =
            outbox.prepare(&mut store, &c1, &"me".into(), "hi", vec![], at(5)).unwrap();

        outbox.fail(&mut store, &submission, "HTTP 503");
        let record = store.message(&c1, &submission.local_id).unwrap();
        assert_eq!(record.status, DeliveryStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("HTTP 503"));

        let retry = outbox.retry(&mut store, &c1, &submission.local_id).unwrap();
        assert_eq!(retry, submission);
        let record = store.message(&c1, &submission.local_id).unwrap();
        assert_eq!(record.status, DeliveryStatus::Sending);

        // Only failed records can be retried
        assert!(outbox.retry(&mut store, &c1, &submission.local_id).is_none());
    }

    #[test]
    fn nonces_differ_per_submission() {
        let outbox = Outbox::new(SimEnv::with_seed(1));
        let mut store = SyncStore::default();
        let c1 = ChannelId::new("c1");
        let a = outbox.prepare(&mut store, &c1, &"me".into(), "a", vec![], at(1)).unwrap();
        let b = outbox.prepare(&mut store, &c1, &"me".into(), "b", vec![], at(2)).unwrap();
        assert_ne!(a.body.nonce, b.body.nonce);
        assert_eq!(store.message_count(&c1), 2);
    }
}
