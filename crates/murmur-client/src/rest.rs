//! REST collaborator.
//!
//! The sync core reads history, creates and edits messages and lists
//! channels through [`RestApi`]. [`HttpRest`] talks to the server's JSON API
//! with a bearer token.

use async_trait::async_trait;
use murmur_proto::{
    Attachment, Author, AuthorId, Channel, ChannelId, Message, MessageId, Timestamp,
};
use reqwest::{Method, RequestBuilder};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use url::Url;

use crate::RestError;

/// Page query for [`RestApi::fetch_messages`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageQuery {
    /// Only messages created after this time.
    pub after: Option<Timestamp>,
    /// Only messages created before this time.
    pub before: Option<Timestamp>,
    /// Page size.
    pub limit: usize,
}

impl MessageQuery {
    /// The newest `limit` messages.
    pub fn latest(limit: usize) -> Self {
        Self { after: None, before: None, limit }
    }

    /// Up to `limit` messages created before `before`.
    pub fn before(before: Timestamp, limit: usize) -> Self {
        Self { after: None, before: Some(before), limit }
    }

    /// Up to `limit` messages created after `after`.
    pub fn after(after: Timestamp, limit: usize) -> Self {
        Self { after: Some(after), before: None, limit }
    }
}

/// Body of a message submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageCreate {
    /// Message text.
    pub content: String,
    /// Correlation nonce, echoed back on the created message.
    pub nonce: String,
    /// Already-uploaded attachments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

#[derive(Serialize)]
struct MessageEdit<'a> {
    content: &'a str,
}

/// Server REST API as seen by the sync core.
#[async_trait]
pub trait RestApi: Send + Sync {
    /// A page of a channel's messages, oldest first.
    async fn fetch_messages(
        &self,
        channel: &ChannelId,
        query: MessageQuery,
    ) -> Result<Vec<Message>, RestError>;

    /// Submit a message.
    async fn create_message(
        &self,
        channel: &ChannelId,
        body: &MessageCreate,
    ) -> Result<Message, RestError>;

    /// Replace a message's content.
    async fn edit_message(
        &self,
        channel: &ChannelId,
        id: &MessageId,
        content: &str,
    ) -> Result<Message, RestError>;

    /// Delete a message.
    async fn delete_message(&self, channel: &ChannelId, id: &MessageId) -> Result<(), RestError>;

    /// Every channel visible to the session.
    async fn fetch_channels(&self) -> Result<Vec<Channel>, RestError>;

    /// One author's profile.
    async fn fetch_author(&self, id: &AuthorId) -> Result<Author, RestError>;
}

/// [`RestApi`] over HTTP with JSON bodies.
#[derive(Debug, Clone)]
pub struct HttpRest {
    client: reqwest::Client,
    base: Url,
    token: String,
}

impl HttpRest {
    /// Client for the API rooted at `base`.
    pub fn new(base: Url, token: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base, token)
    }

    /// Client sharing an existing HTTP client.
    pub fn with_client(client: reqwest::Client, base: Url, token: impl Into<String>) -> Self {
        Self { client, base, token: token.into() }
    }

    /// `{base}/{segments...}`
    fn endpoint(&self, segments: &[&str]) -> Result<Url, RestError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| RestError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client.request(method, url).bearer_auth(&self.token)
    }

    async fn send(&self, request: RequestBuilder) -> Result<bytes::Bytes, RestError> {
        let response = request.send().await.map_err(|e| RestError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), url = %response.url(), "request rejected");
            return Err(RestError::Status(status.as_u16()));
        }
        response.bytes().await.map_err(|e| RestError::Transport(e.to_string()))
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, RestError> {
        let body = self.send(request).await?;
        serde_json::from_slice(&body).map_err(|e| RestError::Decode(e.to_string()))
    }
}

#[async_trait]
impl RestApi for HttpRest {
    async fn fetch_messages(
        &self,
        channel: &ChannelId,
        query: MessageQuery,
    ) -> Result<Vec<Message>, RestError> {
        let mut url = self.endpoint(&["channels", channel.as_str(), "messages"])?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(after) = query.after {
                pairs.append_pair("after", &after.to_string());
            }
            if let Some(before) = query.before {
                pairs.append_pair("before", &before.to_string());
            }
            pairs.append_pair("limit", &query.limit.to_string());
        }
        let mut messages: Vec<Message> = self.json(self.request(Method::GET, url)).await?;
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(messages)
    }

    async fn create_message(
        &self,
        channel: &ChannelId,
        body: &MessageCreate,
    ) -> Result<Message, RestError> {
        let url = self.endpoint(&["channels", channel.as_str(), "messages"])?;
        self.json(self.request(Method::POST, url).json(body)).await
    }

    async fn edit_message(
        &self,
        channel: &ChannelId,
        id: &MessageId,
        content: &str,
    ) -> Result<Message, RestError> {
        let url = self.endpoint(&["channels", channel.as_str(), "messages", id.as_str()])?;
        self.json(self.request(Method::PATCH, url).json(&MessageEdit { content })).await
    }

    async fn delete_message(&self, channel: &ChannelId, id: &MessageId) -> Result<(), RestError> {
        let url = self.endpoint(&["channels", channel.as_str(), "messages", id.as_str()])?;
        self.send(self.request(Method::DELETE, url)).await.map(drop)
    }

    async fn fetch_channels(&self) -> Result<Vec<Channel>, RestError> {
        let url = self.endpoint(&["channels"])?;
        self.json(self.request(Method::GET, url)).await
    }

    async fn fetch_author(&self, id: &AuthorId) -> Result<Author, RestError> {
        let url = self.endpoint(&["authors", id.as_str()])?;
        self.json(self.request(Method::GET, url)).await
    }
}
