//! Canonical entity types.
//!
//! These are the server-confirmed shapes carried by REST responses and
//! stream events. Partial updates arrive as patch types: every field except
//! the identifiers is optional, and `apply` merges a patch into the entity
//! field by field.

use serde::{Deserialize, Serialize};

use crate::{AuthorId, ChannelId, MessageId, Timestamp};

/// A chat channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Channel identifier.
    pub id: ChannelId,
    /// Display name.
    pub name: String,
    /// Free-form topic line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Visible only to invited authors.
    #[serde(default)]
    pub private: bool,
    /// Creation time of the newest message. `None` if the channel is empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_at: Option<Timestamp>,
    /// Author who owns the channel.
    pub owner_id: AuthorId,
}

impl Channel {
    /// Merge a partial update into this channel.
    ///
    /// The patch must target this channel; a patch for another id is ignored.
    pub fn apply(&mut self, patch: &ChannelPatch) {
        if patch.id != self.id {
            return;
        }
        if let Some(name) = &patch.name {
            self.name.clone_from(name);
        }
        if let Some(topic) = &patch.topic {
            self.topic = Some(topic.clone()).filter(|t| !t.is_empty());
        }
        if let Some(private) = patch.private {
            self.private = private;
        }
        if let Some(ts) = patch.last_message_at {
            self.bump_last_message(ts);
        }
        if let Some(owner) = &patch.owner_id {
            self.owner_id.clone_from(owner);
        }
    }

    /// Advance `last_message_at` to `ts` if it is newer.
    pub fn bump_last_message(&mut self, ts: Timestamp) {
        if self.last_message_at.is_none_or(|current| ts > current) {
            self.last_message_at = Some(ts);
        }
    }
}

/// Partial channel update. An empty `topic` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelPatch {
    /// Channel being updated.
    pub id: ChannelId,
    /// New display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New topic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// New privacy flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private: Option<bool>,
    /// Newer last-message time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_at: Option<Timestamp>,
    /// New owner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<AuthorId>,
}

/// Presence status of an author.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    /// Connected and active.
    Online,
    /// Connected, no recent activity.
    Idle,
    /// Connected, notifications muted.
    DoNotDisturb,
    /// Not connected.
    #[default]
    #[serde(other)]
    Offline,
}

/// A chat participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Author identifier.
    pub id: AuthorId,
    /// Login name.
    pub username: String,
    /// Presence status.
    #[serde(default)]
    pub status: PresenceStatus,
    /// Display colors, most significant first (CSS color strings).
    #[serde(default)]
    pub colors: Vec<String>,
    /// Profile text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    /// Cumulative bytes of content sent by this author.
    #[serde(default)]
    pub byte_count: u64,
}

impl Author {
    /// Author with only the required fields set.
    pub fn new(id: impl Into<AuthorId>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            status: PresenceStatus::default(),
            colors: Vec::new(),
            bio: None,
            byte_count: 0,
        }
    }

    /// Merge a partial update into this author.
    pub fn apply(&mut self, patch: &AuthorPatch) {
        if patch.id != self.id {
            return;
        }
        if let Some(username) = &patch.username {
            self.username.clone_from(username);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(colors) = &patch.colors {
            self.colors.clone_from(colors);
        }
        if let Some(bio) = &patch.bio {
            self.bio = Some(bio.clone()).filter(|b| !b.is_empty());
        }
        if let Some(bytes) = patch.byte_count {
            self.byte_count = bytes;
        }
    }
}

/// Partial author update. An empty `bio` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorPatch {
    /// Author being updated.
    pub id: AuthorId,
    /// New login name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// New presence status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PresenceStatus>,
    /// New display colors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<String>>,
    /// New profile text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    /// New cumulative byte count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub byte_count: Option<u64>,
}

impl From<Author> for AuthorPatch {
    fn from(author: Author) -> Self {
        Self {
            id: author.id,
            username: Some(author.username),
            status: Some(author.status),
            colors: Some(author.colors),
            bio: Some(author.bio.unwrap_or_default()),
            byte_count: Some(author.byte_count),
        }
    }
}

/// Kind of message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// Authored content.
    #[default]
    Default,
    /// System notice: an author joined the channel.
    Join,
    /// System notice: an author left the channel.
    Leave,
}

/// File attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Original file name.
    pub filename: String,
    /// MIME type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Size in bytes.
    #[serde(default)]
    pub size: u64,
    /// Remote URL once the upload is stored. `None` while still uploading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Link preview attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    /// Link target.
    pub url: String,
    /// Page title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Page description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Preview image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// A canonical (server-shaped) message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message identifier.
    pub id: MessageId,
    /// Channel the message belongs to.
    pub channel_id: ChannelId,
    /// Sender.
    pub author_id: AuthorId,
    /// Kind of message.
    #[serde(rename = "type", default)]
    pub kind: MessageType,
    /// Text content.
    #[serde(default)]
    pub content: String,
    /// Attached files.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Link previews.
    #[serde(default)]
    pub embeds: Vec<Embed>,
    /// Server creation time; the ordering key for the channel.
    pub created_at: Timestamp,
    /// Last edit time. `None` if never edited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
    /// Client correlation token echoed back from the submitting client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

impl Message {
    /// Plain text message with only the required fields set.
    pub fn new(
        id: impl Into<MessageId>,
        channel_id: impl Into<ChannelId>,
        author_id: impl Into<AuthorId>,
        content: impl Into<String>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            channel_id: channel_id.into(),
            author_id: author_id.into(),
            kind: MessageType::Default,
            content: content.into(),
            attachments: Vec::new(),
            embeds: Vec::new(),
            created_at,
            updated_at: None,
            nonce: None,
        }
    }

    /// Attach a correlation nonce.
    #[must_use]
    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    /// Merge a partial update into this message.
    pub fn apply(&mut self, patch: &MessagePatch) {
        if patch.id != self.id {
            return;
        }
        if let Some(content) = &patch.content {
            self.content.clone_from(content);
        }
        if let Some(attachments) = &patch.attachments {
            self.attachments.clone_from(attachments);
        }
        if let Some(embeds) = &patch.embeds {
            self.embeds.clone_from(embeds);
        }
        if patch.updated_at.is_some() {
            self.updated_at = patch.updated_at;
        }
    }
}

/// Partial message update (edits, late-arriving embeds).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePatch {
    /// Message being updated.
    pub id: MessageId,
    /// Channel of the message.
    pub channel_id: ChannelId,
    /// New content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Replacement attachments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
    /// Replacement embeds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embeds: Option<Vec<Embed>>,
    /// Edit time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> Channel {
        Channel {
            id: "c1".into(),
            name: "general".into(),
            topic: Some("hello".into()),
            private: false,
            last_message_at: Some(Timestamp::from_millis(100)),
            owner_id: "a1".into(),
        }
    }

    #[test]
    fn channel_patch_only_touches_present_fields() {
        let mut c = channel();
        let rename =
            ChannelPatch { id: "c1".into(), name: Some("random".into()), ..Default::default() };
        c.apply(&rename);

        assert_eq!(c.name, "random");
        assert_eq!(c.topic.as_deref(), Some("hello"));
        assert!(!c.private);
    }

    #[test]
    fn channel_patch_empty_topic_clears() {
        let mut c = channel();
        let clear =
            ChannelPatch { id: "c1".into(), topic: Some(String::new()), ..Default::default() };
        c.apply(&clear);
        assert_eq!(c.topic, None);
    }

    #[test]
    fn channel_last_message_never_moves_backwards() {
        let mut c = channel();
        c.bump_last_message(Timestamp::from_millis(50));
        assert_eq!(c.last_message_at, Some(Timestamp::from_millis(100)));
        c.bump_last_message(Timestamp::from_millis(150));
        assert_eq!(c.last_message_at, Some(Timestamp::from_millis(150)));
    }

    #[test]
    fn patch_for_other_id_is_ignored() {
        let mut c = channel();
        c.apply(&ChannelPatch { id: "c2".into(), name: Some("x".into()), ..Default::default() });
        assert_eq!(c.name, "general");
    }

    #[test]
    fn author_patch_merges_fields() {
        let mut a = Author::new("a1", "ada");
        a.apply(&AuthorPatch {
            id: "a1".into(),
            status: Some(PresenceStatus::Idle),
            byte_count: Some(42),
            ..Default::default()
        });
        assert_eq!(a.username, "ada");
        assert_eq!(a.status, PresenceStatus::Idle);
        assert_eq!(a.byte_count, 42);
    }

    #[test]
    fn unknown_presence_falls_back_to_offline() {
        let status: PresenceStatus = serde_json::from_str("\"invisible\"").unwrap();
        assert_eq!(status, PresenceStatus::Offline);
    }

    #[test]
    fn message_decodes_with_defaults() {
        let json = r#"{"id":"m1","channel_id":"c1","author_id":"a1","created_at":10}"#;
        let m: Message = serde_json::from_str(json).unwrap();
        assert_eq!(m.kind, MessageType::Default);
        assert!(m.content.is_empty());
        assert!(m.nonce.is_none());
    }

    #[test]
    fn message_type_uses_wire_names() {
        let json =
            r#"{"id":"m1","channel_id":"c1","author_id":"a1","type":"join","created_at":"10"}"#;
        let m: Message = serde_json::from_str(json).unwrap();
        assert_eq!(m.kind, MessageType::Join);
        assert_eq!(m.created_at, Timestamp::from_millis(10));
    }

    #[test]
    fn message_patch_sets_edit_time() {
        let mut m = Message::new("m1", "c1", "a1", "draft", Timestamp::from_millis(1));
        m.apply(&MessagePatch {
            id: "m1".into(),
            channel_id: "c1".into(),
            content: Some("final".into()),
            attachments: None,
            embeds: None,
            updated_at: Some(Timestamp::from_millis(5)),
        });
        assert_eq!(m.content, "final");
        assert_eq!(m.updated_at, Some(Timestamp::from_millis(5)));
    }
}
