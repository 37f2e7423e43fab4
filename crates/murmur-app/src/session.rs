//! Session orchestration.
//!
//! [`Session`] owns the shared store and the collaborators around it, and
//! runs the async half of every user operation: REST calls, view fetches,
//! persistence. Store locks are never held across an await.

use std::collections::HashMap;

use murmur_client::{MessageQuery, RestApi};
use murmur_core::Environment;
use murmur_proto::{AuthorId, ChannelId, Message, MessageId};
use murmur_store::{ClientMessage, Persistence, SessionUser, SharedStore, lock};

use crate::{
    FetchError, Outbox, PaginatedView, PendingFile, SessionError, StoreSink, Submission,
    ViewAction, ViewConfig, ViewEvent,
};

/// A signed-in client session.
pub struct Session<R, P, E> {
    store: SharedStore,
    rest: R,
    persistence: P,
    env: E,
    outbox: Outbox<E>,
    views: HashMap<ChannelId, PaginatedView>,
    view_config: ViewConfig,
}

impl<R, P, E> Session<R, P, E>
where
    R: RestApi,
    P: Persistence,
    E: Environment,
{
    /// Session over `store`.
    pub fn new(
        store: SharedStore,
        rest: R,
        persistence: P,
        env: E,
        view_config: ViewConfig,
    ) -> Self {
        Self {
            store,
            rest,
            persistence,
            outbox: Outbox::new(env.clone()),
            env,
            views: HashMap::new(),
            view_config,
        }
    }

    /// The shared store.
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Restore persisted state, load the session user's profile and the
    /// channel list.
    pub async fn bootstrap(&mut self, user: &AuthorId) -> Result<(), SessionError> {
        let state = self.persistence.load()?;
        lock(&self.store).restore(state);

        let author = self.rest.fetch_author(user).await?;
        let channels = self.rest.fetch_channels().await?;

        let mut store = lock(&self.store);
        store.set_session_user(SessionUser::from_author(&author));
        store.upsert_author(author);
        tracing::info!(channels = channels.len(), cursor = ?store.cursor(), "session ready");
        store.replace_channels(channels);
        Ok(())
    }

    /// Mount a view for `channel` and load its newest page.
    ///
    /// An already open channel is refreshed. The view stays mounted with
    /// whatever is cached if the fetch fails.
    pub async fn open_channel(
        &mut self,
        channel: &ChannelId,
    ) -> Result<Vec<ViewAction>, SessionError> {
        let config = self.view_config;
        self.views
            .entry(channel.clone())
            .or_insert_with(|| PaginatedView::new(channel.clone(), config));

        let page = self.rest.fetch_messages(channel, MessageQuery::latest(config.page_size)).await?;
        let count = page.len();

        let event = {
            let mut store = lock(&self.store);
            let now = self.env.wall_clock();
            for message in page {
                store.reconcile_by_nonce(channel, message, now);
            }
            ViewEvent::items_from(&store, channel)
        };

        let view = self.view_mut(channel)?;
        view.initial_page_loaded(count);
        Ok(view.handle(event))
    }

    /// Unmount a channel's view. Its records stay in the store.
    pub fn close_channel(&mut self, channel: &ChannelId) {
        self.views.remove(channel);
    }

    /// View of an open channel.
    pub fn view(&self, channel: &ChannelId) -> Option<&PaginatedView> {
        self.views.get(channel)
    }

    fn view_mut(&mut self, channel: &ChannelId) -> Result<&mut PaginatedView, SessionError> {
        self.views.get_mut(channel).ok_or_else(|| SessionError::ChannelNotOpen(channel.clone()))
    }

    /// Feed a host event to a channel's view.
    ///
    /// Fetches the view asks for are executed before returning; the
    /// remaining actions are for the host.
    pub async fn handle_view_event(
        &mut self,
        channel: &ChannelId,
        event: ViewEvent,
    ) -> Result<Vec<ViewAction>, SessionError> {
        let actions = self.view_mut(channel)?.handle(event);
        self.execute(channel, actions).await
    }

    /// Re-read the channel from the store into its view, e.g. after a
    /// [`StoreChange::Messages`](murmur_store::StoreChange::Messages).
    pub fn sync_view(&mut self, channel: &ChannelId) -> Result<Vec<ViewAction>, SessionError> {
        let event = ViewEvent::items_from(&lock(&self.store), channel);
        Ok(self.view_mut(channel)?.handle(event))
    }

    /// Load the page before the oldest loaded message.
    pub async fn load_older(
        &mut self,
        channel: &ChannelId,
    ) -> Result<Vec<ViewAction>, SessionError> {
        let actions = self.view_mut(channel)?.load_older();
        self.execute(channel, actions).await
    }

    async fn execute(
        &mut self,
        channel: &ChannelId,
        actions: Vec<ViewAction>,
    ) -> Result<Vec<ViewAction>, SessionError> {
        let mut output = Vec::new();
        for action in actions {
            let ViewAction::FetchOlder(request) = action else {
                output.push(action);
                continue;
            };

            let query = MessageQuery::before(request.before, request.limit);
            let result =
                self.rest.fetch_messages(&request.channel, query).await.map_err(FetchError::from);

            let now = self.env.wall_clock();
            let Some(view) = self.views.get_mut(channel) else {
                return Err(SessionError::ChannelNotOpen(channel.clone()));
            };
            output.extend(view.complete_fetch(&mut lock(&self.store), result, now));
        }
        Ok(output)
    }

    /// Post a message as the session user.
    ///
    /// The placeholder is visible before the request is sent. On failure it
    /// stays in the store as `Failed` and the error is returned.
    pub async fn send_message(
        &mut self,
        channel: &ChannelId,
        content: impl Into<String>,
        files: Vec<PendingFile>,
    ) -> Result<MessageId, SessionError> {
        let submission = {
            let mut store = lock(&self.store);
            let author =
                store.session_user().map(|u| u.id.clone()).ok_or(SessionError::NotSignedIn)?;
            let now = self.env.wall_clock();
            self.outbox.prepare(&mut store, channel, &author, content, files, now)?
        };
        self.submit(submission).await
    }

    /// Resend a failed message.
    pub async fn retry_message(
        &mut self,
        channel: &ChannelId,
        local_id: &MessageId,
    ) -> Result<MessageId, SessionError> {
        let submission = self
            .outbox
            .retry(&mut lock(&self.store), channel, local_id)
            .ok_or_else(|| SessionError::NotRetryable(local_id.clone()))?;
        self.submit(submission).await
    }

    async fn submit(&self, submission: Submission) -> Result<MessageId, SessionError> {
        let result = self.rest.create_message(&submission.channel, &submission.body).await;
        let mut store = lock(&self.store);
        match result {
            Ok(message) => {
                let id = message.id.clone();
                self.outbox.confirm(&mut store, &submission, message, self.env.wall_clock());
                Ok(id)
            },
            Err(error) => {
                self.outbox.fail(&mut store, &submission, &error);
                Err(error.into())
            },
        }
    }

    /// Replace a message's content.
    pub async fn edit_message(
        &mut self,
        channel: &ChannelId,
        id: &MessageId,
        content: &str,
    ) -> Result<Message, SessionError> {
        let message = self.rest.edit_message(channel, id, content).await?;
        let now = self.env.wall_clock();
        lock(&self.store).upsert(channel, ClientMessage::canonical(message.clone()), now);
        Ok(message)
    }

    /// Delete a message.
    pub async fn delete_message(
        &mut self,
        channel: &ChannelId,
        id: &MessageId,
    ) -> Result<(), SessionError> {
        self.rest.delete_message(channel, id).await?;
        lock(&self.store).remove_message(channel, id);
        Ok(())
    }

    /// Mark everything loaded in `channel` as seen.
    pub fn mark_seen(&self, channel: &ChannelId) {
        let mut store = lock(&self.store);
        if let Some(newest) = store.newest_created_at(channel) {
            store.mark_seen(channel, newest);
        }
    }

    /// Expire typing markers that are due.
    pub fn tick(&self) {
        lock(&self.store).tick(self.env.wall_clock());
    }

    /// Persist the resume cursor and read markers.
    pub fn save(&self) -> Result<(), SessionError> {
        let state = lock(&self.store).persisted_state();
        self.persistence.save(&state)?;
        tracing::debug!(cursor = ?state.cursor, "session state saved");
        Ok(())
    }

    /// Event stream handler writing into this session's store.
    pub fn stream_handler(&self) -> StoreSink<E> {
        StoreSink::new(self.store.clone(), self.env.clone())
    }
}
