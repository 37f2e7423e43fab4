//! One-line descriptions of stream events.

use murmur_proto::{AuthorId, ChannelId, GatewayEvent, Message, Timestamp};
use murmur_store::SyncStore;

/// Channel an event belongs to, if any.
pub fn event_channel(event: &GatewayEvent) -> Option<&ChannelId> {
    match event {
        GatewayEvent::ChannelCreated(channel) => Some(&channel.id),
        GatewayEvent::ChannelUpdated(patch) => Some(&patch.id),
        GatewayEvent::ChannelDeleted(channel) => Some(&channel.id),
        GatewayEvent::MessageCreated(message) => Some(&message.channel_id),
        GatewayEvent::MessageUpdated(patch) => Some(&patch.channel_id),
        GatewayEvent::MessageDeleted(message) => Some(&message.channel_id),
        GatewayEvent::TypingStarted(typing) => Some(&typing.channel_id),
        GatewayEvent::AuthorUpdated(_) | GatewayEvent::Heartbeat => None,
    }
}

/// Describe an event, resolving names through `store`. Heartbeats are not
/// worth a line.
pub fn event_line(
    store: &SyncStore,
    event: &GatewayEvent,
    ts: Option<Timestamp>,
) -> Option<String> {
    let body = match event {
        GatewayEvent::Heartbeat => return None,
        GatewayEvent::ChannelCreated(channel) => format!("channel #{} created", channel.name),
        GatewayEvent::ChannelUpdated(patch) => {
            format!("channel {} updated", channel_name(store, &patch.id))
        },
        GatewayEvent::ChannelDeleted(channel) => {
            format!("channel {} deleted", channel_name(store, &channel.id))
        },
        GatewayEvent::MessageCreated(message) => message_line(store, message),
        GatewayEvent::MessageUpdated(patch) => {
            format!("{} message {} edited", channel_name(store, &patch.channel_id), patch.id)
        },
        GatewayEvent::MessageDeleted(message) => {
            format!("{} message {} deleted", channel_name(store, &message.channel_id), message.id)
        },
        GatewayEvent::AuthorUpdated(patch) => {
            format!("{} updated their profile", author_name(store, &patch.id))
        },
        GatewayEvent::TypingStarted(typing) => format!(
            "{} {} is typing",
            channel_name(store, &typing.channel_id),
            author_name(store, &typing.author_id)
        ),
    };
    Some(format!("[{}] {body}", ts.map_or_else(|| "-".to_owned(), |ts| ts.to_string())))
}

/// `#channel <author> content`, with a note per attachment.
pub fn message_line(store: &SyncStore, message: &Message) -> String {
    let mut line = format!(
        "{} <{}> {}",
        channel_name(store, &message.channel_id),
        author_name(store, &message.author_id),
        message.content
    );
    for attachment in &message.attachments {
        line.push_str(&format!(" [{}]", attachment.filename));
    }
    line
}

fn channel_name(store: &SyncStore, id: &ChannelId) -> String {
    store.channel(id).map_or_else(|| format!("#{id}"), |c| format!("#{}", c.name))
}

fn author_name(store: &SyncStore, id: &AuthorId) -> String {
    store.author(id).map_or_else(|| id.to_string(), |a| a.username.clone())
}
