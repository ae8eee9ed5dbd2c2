//! Virtualization Module
//!
//! Pure visible-range computation for windowed rendering of large lists and
//! grids. Nothing here owns scroll state: callers pass the current scroll
//! offset on every scroll or resize event and render only the returned range,
//! absolutely positioned at `pixel_offset` inside a container sized to
//! `total_height()`.

mod fixed;
mod grid;
mod variable;


use std::ops::RangeInclusive;

use serde::Serialize;

pub use fixed::FixedList;
pub use grid::Grid;
pub use variable::VariableList;

// == Visible Range ==
/// Inclusive range of item indices to render and the offset of the first one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VisibleRange {
    pub start_index: usize,
    pub end_index: usize,
    /// Distance from the top of the scrollable content to `start_index`
    pub pixel_offset: f64,
}

impl VisibleRange {
    /// Number of items to render. Never zero: empty collections yield no range.
    pub fn item_count(&self) -> usize {
        self.end_index - self.start_index + 1
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices().contains(&index)
    }

    pub fn indices(&self) -> RangeInclusive<usize> {
        self.start_index..=self.end_index
    }
}

// == Virtualizer ==
/// Maps a scroll position to the items that must be rendered.
pub trait Virtualizer {
    /// Returns the range to render, or None when the collection is empty.
    fn visible_range(&self, scroll_top: f64) -> Option<VisibleRange>;

    /// Full scrollable height of the collection.
    fn total_height(&self) -> f64;
}

/// Negative, NaN and infinite offsets behave like 0.
pub(crate) fn sanitize_offset(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Slot size used for index math; non-positive sizes count as 1.
pub(crate) fn effective_size(size: f64) -> f64 {
    if size.is_finite() && size > 0.0 {
        size
    } else {
        1.0
    }
}

/// Fixed-size window math shared by lists and grid rows.
///
/// Returns the inclusive `(start, end)` slot range, or None when `count` is 0.
pub(crate) fn fixed_window(
    count: usize,
    slot_size: f64,
    scroll_top: f64,
    viewport: f64,
    overscan: usize,
) -> Option<(usize, usize)> {
    let last_slot = count.checked_sub(1)?;
    let size = effective_size(slot_size);
    let scroll_top = sanitize_offset(scroll_top);
    let viewport = sanitize_offset(viewport);

    let first_visible = (scroll_top / size).floor() as usize;
    let last_visible = ((scroll_top + viewport) / size).ceil() as usize;

    let end = last_visible.saturating_add(overscan).min(last_slot);
    let start = first_visible.saturating_sub(overscan).min(end);
    Some((start, end))
}
