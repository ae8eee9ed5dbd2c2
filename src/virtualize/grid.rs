//! Row/column grid virtualization.

use serde::{Deserialize, Serialize};

use crate::virtualize::{effective_size, fixed_window, sanitize_offset, VisibleRange, Virtualizer};

// == Grid ==
/// Grid of equally sized cards laid out `items_per_row` to a row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub item_count: usize,
    /// Columns per row; 0 is treated as 1
    pub items_per_row: usize,
    pub item_height: f64,
    /// Vertical space between rows
    pub gap: f64,
    pub container_height: f64,
    /// Extra rows rendered above and below the viewport
    pub overscan: usize,
}

impl Grid {
    pub fn new(
        item_count: usize,
        items_per_row: usize,
        item_height: f64,
        gap: f64,
        container_height: f64,
        overscan: usize,
    ) -> Self {
        Self {
            item_count,
            items_per_row,
            item_height,
            gap,
            container_height,
            overscan,
        }
    }

    // == Columns For Width ==
    /// Number of columns of at least `min_item_width` that fit in `width`.
    ///
    /// Always at least 1.
    pub fn columns_for_width(width: f64, min_item_width: f64, gap: f64) -> usize {
        let gap = sanitize_offset(gap);
        let columns = (sanitize_offset(width) + gap) / (effective_size(min_item_width) + gap);
        (columns.floor() as usize).max(1)
    }

    pub fn row_height(&self) -> f64 {
        self.item_height + sanitize_offset(self.gap)
    }

    pub fn row_count(&self) -> usize {
        self.item_count.div_ceil(self.columns())
    }

    // == Visible Rows ==
    /// Inclusive range of rows to render.
    pub fn visible_rows(&self, scroll_top: f64) -> Option<(usize, usize)> {
        fixed_window(
            self.row_count(),
            self.row_height(),
            scroll_top,
            self.container_height,
            self.overscan,
        )
    }

    fn columns(&self) -> usize {
        self.items_per_row.max(1)
    }
}

impl Virtualizer for Grid {
    fn visible_range(&self, scroll_top: f64) -> Option<VisibleRange> {
        let (start_row, end_row) = self.visible_rows(scroll_top)?;
        let columns = self.columns();

        Some(VisibleRange {
            start_index: start_row * columns,
            end_index: ((end_row + 1) * columns - 1).min(self.item_count - 1),
            pixel_offset: start_row as f64 * self.row_height(),
        })
    }

    fn total_height(&self) -> f64 {
        self.row_count() as f64 * self.row_height()
    }
}
