//! Paginated, virtualized message view.
//!
//! [`PaginatedView`] is a Sans-IO state machine for one mounted channel.
//! The host feeds it [`ViewEvent`]s and executes the [`ViewAction`]s it
//! returns. Fetch results come back through
//! [`complete_fetch`](PaginatedView::complete_fetch), which merges the page
//! into the store.
//!
//! ```text
//! Initial ──first items──> Pinned <──scroll──> Free
//!                             │                 │
//!                             └──near top───> LoadingOlder ──complete──> Pinned | Free
//! ```
//!
//! Prepending older history moves every item down. To keep the content the
//! user was reading in place, the view records an anchor (first visible item
//! and how far into it the viewport starts) before each fetch, and restores
//! it two painted frames after the merge, once the host has laid out and
//! measured the new items.

use std::{ops::Range, time::Duration};

use murmur_proto::{ChannelId, Message, MessageId, Timestamp};
use murmur_store::SyncStore;

use crate::{FetchError, FetchRequest, ItemHeights, ViewAction, ViewConfig, ViewEvent};

/// Painted frames to wait before restoring the anchor.
const RESTORE_FRAMES: u8 = 2;

/// Lifecycle phase of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewPhase {
    /// Nothing rendered yet.
    Initial,
    /// Following the newest message.
    Pinned,
    /// Scrolled away from the bottom.
    Free,
    /// An older page is in flight.
    LoadingOlder,
}

#[derive(Debug, Clone, PartialEq)]
struct Anchor {
    id: MessageId,
    /// Distance from the item's top edge down to the viewport top.
    offset: f64,
}

#[derive(Debug, Clone, PartialEq)]
struct PendingRestore {
    anchor: Anchor,
    frames_left: u8,
}

/// Scroll, pagination and virtualization state of one channel.
#[derive(Debug, Clone)]
pub struct PaginatedView {
    config: ViewConfig,
    channel: ChannelId,
    items: Vec<MessageId>,
    oldest: Option<Timestamp>,
    heights: ItemHeights,
    scroll_top: f64,
    viewport: f64,
    mounted: bool,
    pinned: bool,
    has_more: bool,
    in_flight: Option<FetchRequest>,
    /// Cursor of the most recent request.
    last_cursor: Option<Timestamp>,
    /// `last_cursor` before the most recent request.
    prior_cursor: Option<Timestamp>,
    anchor: Option<Anchor>,
    restore: Option<PendingRestore>,
    last_error: Option<FetchError>,
}

impl PaginatedView {
    /// Unmounted view of `channel`.
    pub fn new(channel: ChannelId, config: ViewConfig) -> Self {
        Self {
            heights: ItemHeights::new(config.estimated_item_height),
            config,
            channel,
            items: Vec::new(),
            oldest: None,
            scroll_top: 0.0,
            viewport: 0.0,
            mounted: false,
            pinned: true,
            has_more: true,
            in_flight: None,
            last_cursor: None,
            prior_cursor: None,
            anchor: None,
            restore: None,
            last_error: None,
        }
    }

    /// Process one host event.
    pub fn handle(&mut self, event: ViewEvent) -> Vec<ViewAction> {
        match event {
            ViewEvent::Scrolled { scroll_top } => self.on_scrolled(scroll_top),
            ViewEvent::Resized { viewport } => {
                self.viewport = if viewport.is_finite() { viewport.max(0.0) } else { 0.0 };
                let mut actions = self.follow_bottom();
                actions.push(ViewAction::Render);
                actions
            },
            ViewEvent::Measured { id, height } => {
                if !self.heights.set(id, height) {
                    return Vec::new();
                }
                let mut actions = self.follow_bottom();
                actions.push(ViewAction::Render);
                actions
            },
            ViewEvent::ItemsChanged { ids, oldest } => self.on_items_changed(ids, oldest),
            ViewEvent::FramePainted => self.on_frame_painted(),
        }
    }

    /// Ask for the page before the oldest loaded message.
    ///
    /// Yields nothing while a fetch is in flight, an anchor restore is
    /// pending, history is exhausted, or the cursor equals the previous
    /// request's.
    pub fn load_older(&mut self) -> Vec<ViewAction> {
        self.request_older().into_iter().collect()
    }

    /// Hand back the result of a [`ViewAction::FetchOlder`].
    ///
    /// A page is merged into `store` record by record. A page with no unseen
    /// ids, or shorter than the page size, exhausts history. A failure keeps
    /// `has_more` and is surfaced through [`last_error`](Self::last_error);
    /// the next near-top scroll retries the same cursor.
    pub fn complete_fetch(
        &mut self,
        store: &mut SyncStore,
        result: Result<Vec<Message>, FetchError>,
        now: Timestamp,
    ) -> Vec<ViewAction> {
        let Some(request) = self.in_flight.take() else {
            tracing::debug!(channel = %self.channel, "fetch completed with nothing in flight");
            return Vec::new();
        };

        let page = match result {
            Ok(page) => page,
            Err(error) => {
                tracing::warn!(channel = %self.channel, %error, "older page failed");
                self.last_cursor = self.prior_cursor;
                self.anchor = None;
                self.last_error = Some(error);
                return vec![ViewAction::Render];
            },
        };

        let unseen = page.iter().filter(|m| store.message(&self.channel, &m.id).is_none()).count();
        if unseen == 0 {
            tracing::info!(channel = %self.channel, "history exhausted");
            self.has_more = false;
            self.last_cursor = self.prior_cursor;
            self.anchor = None;
            return vec![ViewAction::Render];
        }
        if page.len() < request.limit {
            tracing::info!(channel = %self.channel, received = page.len(), "last page of history");
            self.has_more = false;
        }

        for message in page {
            store.reconcile_by_nonce(&self.channel, message, now);
        }

        let before = self.items.len();
        let ids = store.ordered_ids(&self.channel).to_vec();
        self.sync_items(ids, store.oldest_created_at(&self.channel));

        match self.anchor.take() {
            Some(anchor) if self.items.len() > before => {
                self.restore = Some(PendingRestore { anchor, frames_left: RESTORE_FRAMES });
            },
            _ => {},
        }
        vec![ViewAction::Render]
    }

    /// Record the size of the first page. A short page means there is no
    /// older history.
    pub fn initial_page_loaded(&mut self, count: usize) {
        if count < self.config.page_size {
            self.has_more = false;
        }
    }

    /// Channel shown by this view.
    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    /// Current phase.
    pub fn phase(&self) -> ViewPhase {
        if self.in_flight.is_some() {
            ViewPhase::LoadingOlder
        } else if !self.mounted {
            ViewPhase::Initial
        } else if self.pinned {
            ViewPhase::Pinned
        } else {
            ViewPhase::Free
        }
    }

    /// Message ids in display order.
    pub fn items(&self) -> &[MessageId] {
        &self.items
    }

    /// False once the server has no older history.
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// True while an older page is in flight.
    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// True while the view follows the newest message.
    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    /// True between a prepend and its anchor restore.
    pub fn is_restoring(&self) -> bool {
        self.restore.is_some()
    }

    /// Error of the last failed page fetch. Cleared by the next request.
    pub fn last_error(&self) -> Option<&FetchError> {
        self.last_error.as_ref()
    }

    /// Distance from the content top to the viewport top.
    pub fn scroll_top(&self) -> f64 {
        self.scroll_top
    }

    /// Total content height.
    pub fn content_height(&self) -> f64 {
        self.heights.content_height(&self.items)
    }

    /// Distance from the content top to the top of `id`.
    pub fn item_top(&self, id: &MessageId) -> Option<f64> {
        let index = self.items.iter().position(|i| i == id)?;
        Some(self.heights.offset_of(&self.items, index))
    }

    /// Indices of the items to render, overscan included.
    pub fn visible_range(&self) -> Range<usize> {
        self.heights.window(&self.items, self.scroll_top, self.viewport, self.config.overscan)
    }

    fn max_scroll(&self) -> f64 {
        (self.content_height() - self.viewport).max(0.0)
    }

    fn near_top(&self) -> bool {
        self.scroll_top <= self.config.top_threshold
    }

    fn near_bottom(&self) -> bool {
        self.content_height() - (self.scroll_top + self.viewport) <= self.config.bottom_threshold
    }

    fn scroll_to(&mut self, target: f64) -> ViewAction {
        self.scroll_top = target.clamp(0.0, self.max_scroll());
        ViewAction::ScrollTo { scroll_top: self.scroll_top }
    }

    /// Scroll to the last item if pinned and no restore is pending.
    fn follow_bottom(&mut self) -> Vec<ViewAction> {
        if self.mounted && self.pinned && self.restore.is_none() {
            vec![self.scroll_to(self.max_scroll())]
        } else {
            Vec::new()
        }
    }

    fn sync_items(&mut self, ids: Vec<MessageId>, oldest: Option<Timestamp>) {
        self.items = ids;
        self.oldest = oldest;
        self.heights.retain(&self.items);
    }

    fn on_scrolled(&mut self, scroll_top: f64) -> Vec<ViewAction> {
        let scroll_top = if scroll_top.is_finite() { scroll_top } else { 0.0 };
        self.scroll_top = scroll_top.clamp(0.0, self.max_scroll());
        if self.mounted {
            self.pinned = self.near_bottom();
        }

        let mut actions = vec![ViewAction::Render];
        if self.mounted && self.near_top() {
            actions.extend(self.request_older());
        }
        actions
    }

    fn on_items_changed(
        &mut self,
        ids: Vec<MessageId>,
        oldest: Option<Timestamp>,
    ) -> Vec<ViewAction> {
        let grew = ids.len() > self.items.len();
        self.sync_items(ids, oldest);
        if self.items.is_empty() {
            return vec![ViewAction::Render];
        }

        let mut actions = Vec::new();
        if !self.mounted {
            tracing::debug!(channel = %self.channel, items = self.items.len(), "view mounted");
            self.mounted = true;
            self.pinned = true;
            actions.extend(self.follow_bottom());
        } else if grew {
            actions.extend(self.follow_bottom());
        }
        actions.push(ViewAction::Render);
        actions
    }

    fn on_frame_painted(&mut self) -> Vec<ViewAction> {
        let Some(restore) = self.restore.as_mut() else {
            return Vec::new();
        };
        restore.frames_left = restore.frames_left.saturating_sub(1);
        if restore.frames_left > 0 {
            return Vec::new();
        }
        let Some(PendingRestore { anchor, .. }) = self.restore.take() else {
            return Vec::new();
        };

        let Some(index) = self.items.iter().position(|id| id == &anchor.id) else {
            tracing::debug!(channel = %self.channel, anchor = %anchor.id, "anchor gone");
            return Vec::new();
        };
        let target = self.heights.offset_of(&self.items, index) + anchor.offset;
        let mut actions = vec![self.scroll_to(target), ViewAction::Render];
        self.pinned = self.near_bottom();

        if self.near_top() {
            actions.extend(self.request_older());
        }
        actions
    }

    fn capture_anchor(&self) -> Option<Anchor> {
        let index = self.heights.index_at(&self.items, self.scroll_top)?;
        let top = self.heights.offset_of(&self.items, index);
        Some(Anchor { id: self.items[index].clone(), offset: self.scroll_top - top })
    }

    fn request_older(&mut self) -> Option<ViewAction> {
        if !self.has_more || self.in_flight.is_some() || self.restore.is_some() {
            return None;
        }
        let cursor = self.oldest? - Duration::from_millis(1);
        if self.last_cursor == Some(cursor) {
            tracing::debug!(channel = %self.channel, %cursor, "cursor already requested");
            return None;
        }

        self.anchor = self.capture_anchor();
        self.prior_cursor = self.last_cursor;
        self.last_cursor = Some(cursor);
        self.last_error = None;

        let request = FetchRequest {
            channel: self.channel.clone(),
            before: cursor,
            limit: self.config.page_size,
        };
        tracing::debug!(channel = %self.channel, %cursor, "requesting older page");
        self.in_flight = Some(request.clone());
        Some(ViewAction::FetchOlder(request))
    }
}
