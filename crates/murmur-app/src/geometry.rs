//! Item heights and scroll geometry.
//!
//! Offsets are derived on demand from the item order and the heights the
//! host has measured. Channels hold at most a few thousand items, so a
//! linear walk is cheap enough for every query.

use std::{collections::HashMap, ops::Range};

use murmur_proto::MessageId;

/// Measured item heights with an estimate for the rest.
#[derive(Debug, Clone)]
pub struct ItemHeights {
    estimated: f64,
    measured: HashMap<MessageId, f64>,
}

impl ItemHeights {
    /// No measurements; every item is `estimated` tall.
    pub fn new(estimated: f64) -> Self {
        Self { estimated, measured: HashMap::new() }
    }

    /// Record a measurement. Returns true if the height changed.
    ///
    /// Negative and non-finite heights are treated as zero.
    pub fn set(&mut self, id: MessageId, height: f64) -> bool {
        let height = if height.is_finite() { height.max(0.0) } else { 0.0 };
        let previous = self.measured.insert(id, height);
        previous.is_none_or(|p| (p - height).abs() > f64::EPSILON)
    }

    /// Height of one item.
    pub fn height(&self, id: &MessageId) -> f64 {
        self.measured.get(id).copied().unwrap_or(self.estimated)
    }

    /// Drop measurements for items no longer in `items`.
    pub fn retain(&mut self, items: &[MessageId]) {
        if self.measured.len() > items.len() {
            let live: std::collections::HashSet<&MessageId> = items.iter().collect();
            self.measured.retain(|id, _| live.contains(id));
        }
    }

    /// Distance from the content top to the top of `items[index]`.
    ///
    /// An index past the end yields the total content height.
    pub fn offset_of(&self, items: &[MessageId], index: usize) -> f64 {
        items.iter().take(index).map(|id| self.height(id)).sum()
    }

    /// Total content height.
    pub fn content_height(&self, items: &[MessageId]) -> f64 {
        self.offset_of(items, items.len())
    }

    /// Index of the item covering `offset`: the first item whose bottom edge
    /// lies below it. Clamped to the last item; `None` when empty.
    pub fn index_at(&self, items: &[MessageId], offset: f64) -> Option<usize> {
        let mut bottom = 0.0;
        for (index, id) in items.iter().enumerate() {
            bottom += self.height(id);
            if bottom > offset {
                return Some(index);
            }
        }
        items.len().checked_sub(1)
    }

    /// Indices intersecting `[top, top + viewport)`, widened by `overscan`
    /// items on each side.
    pub fn window(
        &self,
        items: &[MessageId],
        top: f64,
        viewport: f64,
        overscan: usize,
    ) -> Range<usize> {
        let (Some(first), Some(last)) =
            (self.index_at(items, top), self.index_at(items, top + viewport.max(0.0)))
        else {
            return 0..0;
        };
        let start = first.saturating_sub(overscan);
        let end = (last + 1 + overscan).min(items.len());
        start..end
    }
}
