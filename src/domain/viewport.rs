//! Scroll bookkeeping for the open transcript.
//!
//! The coordinator never measures anything itself: the presentation layer
//! reports geometry through [`ScrollMetrics`] and content height changes, and
//! executes the [`ViewportAction`]s returned here.

pub const DEFAULT_BOTTOM_THRESHOLD: f64 = 50.0;
pub const DEFAULT_TOP_THRESHOLD: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub offset: f64,
    pub content_height: f64,
    pub viewport_height: f64,
}

impl ScrollMetrics {
    pub fn distance_from_bottom(&self) -> f64 {
        (self.content_height - self.viewport_height - self.offset).max(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewportAction {
    /// Follow new content to the bottom.
    ScrollToBottom,
    /// Jump to the bottom without animation (conversation switch, first page).
    JumpToBottom,
    /// Set the scroll offset to keep visible messages in place after a prepend.
    RestoreOffset(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportThresholds {
    /// Distance from the bottom that still counts as "at bottom".
    pub bottom: f64,
    /// Offset at or below which the top-of-history sentinel is visible.
    pub top: f64,
}

impl Default for ViewportThresholds {
    fn default() -> Self {
        Self {
            bottom: DEFAULT_BOTTOM_THRESHOLD,
            top: DEFAULT_TOP_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PrependAnchor {
    content_height: f64,
    offset: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewportCoordinator {
    thresholds: ViewportThresholds,
    is_at_bottom: bool,
    unread_count: u32,
    metrics: Option<ScrollMetrics>,
    pending_anchor: Option<PrependAnchor>,
}

impl ViewportCoordinator {
    pub fn new(thresholds: ViewportThresholds) -> Self {
        Self {
            thresholds,
            is_at_bottom: true,
            unread_count: 0,
            metrics: None,
            pending_anchor: None,
        }
    }

    pub fn is_at_bottom(&self) -> bool {
        self.is_at_bottom
    }

    pub fn unread_count(&self) -> u32 {
        self.unread_count
    }

    pub fn metrics(&self) -> Option<ScrollMetrics> {
        self.metrics
    }

    /// Records a scroll position report.
    ///
    /// Returns `true` when the user scrolled upward and the top sentinel is
    /// visible, which is the trigger for loading older history.
    pub fn on_scroll(&mut self, metrics: ScrollMetrics) -> bool {
        let moved_up = self
            .metrics
            .is_some_and(|previous| metrics.offset < previous.offset);

        self.metrics = Some(metrics);
        self.set_at_bottom(metrics.distance_from_bottom() <= self.thresholds.bottom);

        moved_up && metrics.offset <= self.thresholds.top
    }

    /// Applies the new-message policy: follow when at the bottom, otherwise
    /// count the message as unread and leave the position alone.
    pub fn on_message_inserted(&mut self) -> Option<ViewportAction> {
        if self.is_at_bottom {
            self.unread_count = 0;
            Some(ViewportAction::ScrollToBottom)
        } else {
            self.unread_count = self.unread_count.saturating_add(1);
            None
        }
    }

    /// Remembers the geometry right before older messages are committed above
    /// the visible content. Consumed by the next content height report.
    pub fn on_prepend_committed(&mut self) {
        if let Some(metrics) = self.metrics {
            self.pending_anchor = Some(PrependAnchor {
                content_height: metrics.content_height,
                offset: metrics.offset,
            });
        }
    }

    pub fn on_content_resized(&mut self, content_height: f64) -> Option<ViewportAction> {
        let metrics = self.metrics.as_mut()?;
        metrics.content_height = content_height;

        let anchor = self.pending_anchor.take()?;
        let offset = (content_height - anchor.content_height + anchor.offset).max(0.0);
        metrics.offset = offset;

        Some(ViewportAction::RestoreOffset(offset))
    }

    /// Conversation switch: no prepend adjustment, straight to the bottom.
    pub fn reset(&mut self) -> ViewportAction {
        self.metrics = None;
        self.pending_anchor = None;
        self.set_at_bottom(true);
        ViewportAction::JumpToBottom
    }

    /// The first page of a conversation lands below an empty viewport, so it
    /// is shown from the bottom instead of being anchored.
    pub fn on_initial_page(&mut self) -> ViewportAction {
        self.pending_anchor = None;
        self.set_at_bottom(true);
        ViewportAction::JumpToBottom
    }

    pub fn scroll_to_bottom(&mut self) -> ViewportAction {
        self.pending_anchor = None;
        self.set_at_bottom(true);
        ViewportAction::ScrollToBottom
    }

    fn set_at_bottom(&mut self, at_bottom: bool) {
        self.is_at_bottom = at_bottom;
        if at_bottom {
            self.unread_count = 0;
        }
    }
}

impl Default for ViewportCoordinator {
    fn default() -> Self {
        Self::new(ViewportThresholds::default())
    }
}
