//! Scroll position, keyboard and incremental rendering bookkeeping for the
//! thread list. Pure state; the host applies the returned commands.

pub const DEFAULT_BOTTOM_THRESHOLD: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollConfig {
    /// Distance from the newest end, in points, still treated as "at bottom"
    pub bottom_threshold: f64,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            bottom_threshold: DEFAULT_BOTTOM_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollCommand {
    ScrollToEnd,
    ScrollToOffset(f64),
}

#[derive(Debug, Clone)]
pub struct ScrollTracker {
    config: ScrollConfig,
    offset: f64,
    content_height: f64,
    viewport_height: f64,
    /// Saved offset waiting for the first layout with content
    pending_restore: Option<f64>,
    item_count: usize,
    /// Items that arrived while scrolled away from the bottom
    unseen: usize,
}

impl ScrollTracker {
    pub fn new(config: ScrollConfig) -> Self {
        Self {
            config,
            offset: 0.0,
            content_height: 0.0,
            viewport_height: 0.0,
            pending_restore: None,
            item_count: 0,
            unseen: 0,
        }
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn unseen_count(&self) -> usize {
        self.unseen
    }

    fn max_offset(&self) -> f64 {
        (self.content_height - self.viewport_height).max(0.0)
    }

    pub fn distance_from_end(&self) -> f64 {
        (self.max_offset() - self.offset).max(0.0)
    }

    pub fn is_at_bottom(&self) -> bool {
        self.distance_from_end() <= self.config.bottom_threshold
    }

    /// Replay `offset` once content has been laid out.
    pub fn restore(&mut self, offset: f64) {
        self.pending_restore = Some(offset);
    }

    pub fn on_scroll(&mut self, offset: f64) {
        self.offset = offset.max(0.0);
        if self.is_at_bottom() {
            self.unseen = 0;
        }
    }

    /// New content or viewport size. Replays a pending restore on the first
    /// layout with content, otherwise keeps a bottom-pinned list pinned.
    pub fn on_layout(&mut self, content_height: f64, viewport_height: f64) -> Option<ScrollCommand> {
        let was_at_bottom = self.is_at_bottom();
        let grew = content_height > self.content_height;
        self.content_height = content_height;
        self.viewport_height = viewport_height;

        if content_height > 0.0 {
            if let Some(saved) = self.pending_restore.take() {
                self.offset = saved.clamp(0.0, self.max_offset());
                return Some(ScrollCommand::ScrollToOffset(self.offset));
            }
        }

        if grew && was_at_bottom {
            self.offset = self.max_offset();
            return Some(ScrollCommand::ScrollToEnd);
        }
        None
    }

    /// The number of rendered items changed.
    pub fn on_items_changed(&mut self, count: usize) -> Option<ScrollCommand> {
        let first_fill = self.item_count == 0;
        let added = count.saturating_sub(self.item_count);
        self.item_count = count;
        if added == 0 || first_fill || self.pending_restore.is_some() {
            return None;
        }
        if self.is_at_bottom() {
            Some(ScrollCommand::ScrollToEnd)
        } else {
            self.unseen += added;
            None
        }
    }

    /// The "jump to latest" badge was tapped.
    pub fn jump_to_latest(&mut self) -> ScrollCommand {
        self.unseen = 0;
        self.offset = self.max_offset();
        ScrollCommand::ScrollToEnd
    }
}

impl Default for ScrollTracker {
    fn default() -> Self {
        Self::new(ScrollConfig::default())
    }
}

#[derive(Debug, Clone, Default)]
pub struct KeyboardTracker {
    height: f64,
    visible: bool,
}

impl KeyboardTracker {
    pub fn height(&self) -> f64 {
        if self.visible { self.height } else { 0.0 }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Keyboard appeared. A list that was at the bottom stays there.
    pub fn on_show(&mut self, height: f64, scroll: &ScrollTracker) -> Option<ScrollCommand> {
        self.height = height;
        self.visible = true;
        scroll.is_at_bottom().then_some(ScrollCommand::ScrollToEnd)
    }

    pub fn on_hide(&mut self) {
        self.visible = false;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderWindowConfig {
    pub initial: usize,
    pub page: usize,
}

impl Default for RenderWindowConfig {
    fn default() -> Self {
        Self { initial: 20, page: 20 }
    }
}

/// How many of the newest items are rendered. Grows a page at a time as the
/// user reaches the top.
#[derive(Debug, Clone)]
pub struct RenderWindow {
    config: RenderWindowConfig,
    rendered: usize,
    total: usize,
}

impl RenderWindow {
    pub fn new(config: RenderWindowConfig, total: usize) -> Self {
        Self {
            config,
            rendered: config.initial.min(total),
            total,
        }
    }

    pub fn rendered(&self) -> usize {
        self.rendered
    }

    pub fn has_more(&self) -> bool {
        self.rendered < self.total
    }

    /// Returns true if more items were rendered.
    pub fn on_reach_top(&mut self) -> bool {
        let before = self.rendered;
        self.rendered = (self.rendered + self.config.page).min(self.total);
        self.rendered > before
    }

    /// The list length changed. New items extend the window so already
    /// rendered history stays rendered.
    pub fn set_total(&mut self, total: usize) {
        if total > self.total {
            self.rendered += total - self.total;
        }
        self.total = total;
        self.rendered = self.rendered.min(total);
        if self.rendered < self.config.initial {
            self.rendered = self.config.initial.min(total);
        }
    }

    /// The rendered tail of `items`.
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let n = self.rendered.min(items.len());
        &items[items.len() - n..]
    }
}
