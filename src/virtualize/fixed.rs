//! Fixed-height list virtualization.

use serde::{Deserialize, Serialize};

use crate::virtualize::{fixed_window, VisibleRange, Virtualizer};

// == Fixed List ==
/// List whose items all share one height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedList {
    pub item_count: usize,
    /// Height of every item; 0 is allowed and only affects positioning
    pub item_height: f64,
    pub container_height: f64,
    /// Extra items rendered above and below the viewport
    pub overscan: usize,
}

impl FixedList {
    pub fn new(item_count: usize, item_height: f64, container_height: f64, overscan: usize) -> Self {
        Self {
            item_count,
            item_height,
            container_height,
            overscan,
        }
    }

    /// Offset of the top edge of `index`.
    pub fn offset_of(&self, index: usize) -> f64 {
        index.min(self.item_count) as f64 * self.item_height
    }
}

impl Virtualizer for FixedList {
    fn visible_range(&self, scroll_top: f64) -> Option<VisibleRange> {
        let (start_index, end_index) = fixed_window(
            self.item_count,
            self.item_height,
            scroll_top,
            self.container_height,
            self.overscan,
        )?;

        Some(VisibleRange {
            start_index,
            end_index,
            pixel_offset: self.offset_of(start_index),
        })
    }

    fn total_height(&self) -> f64 {
        self.item_count as f64 * self.item_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list() -> FixedList {
        FixedList::new(100, 50.0, 200.0, 5)
    }

    #[test]
    fn test_range_at_top() {
        let range = list().visible_range(0.0).unwrap();
        assert_eq!((range.start_index, range.end_index), (0, 9));
        assert_eq!(range.pixel_offset, 0.0);
    }

    #[test]
    fn test_range_after_scrolling() {
        let range = list().visible_range(500.0).unwrap();
        assert_eq!((range.start_index, range.end_index), (5, 19));
        assert!(range.contains(10));
        assert_eq!(range.pixel_offset, 250.0);
    }

    #[test]
    fn test_negative_scroll_behaves_like_zero() {
        assert_eq!(list().visible_range(-300.0), list().visible_range(0.0));
    }

    #[test]
    fn test_zero_item_height_does_not_divide_by_zero() {
        let list = FixedList::new(1000, 0.0, 200.0, 5);
        let range = list.visible_range(10.0).unwrap();

        assert_eq!(range.start_index, 5);
        assert_eq!(range.end_index, 215);
        assert_eq!(range.pixel_offset, 0.0);
        assert_eq!(list.total_height(), 0.0);
    }

    #[test]
    fn test_empty_and_short_lists() {
        assert_eq!(FixedList::new(0, 50.0, 200.0, 5).visible_range(0.0), None);

        let short = FixedList::new(3, 50.0, 200.0, 5).visible_range(0.0).unwrap();
        assert_eq!((short.start_index, short.end_index), (0, 2));
    }

    #[test]
    fn test_total_height_and_offsets() {
        assert_eq!(list().total_height(), 5000.0);
        assert_eq!(list().offset_of(3), 150.0);
        assert_eq!(list().offset_of(500), 5000.0);
    }
}
