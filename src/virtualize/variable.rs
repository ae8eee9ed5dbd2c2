//! Variable-height list virtualization.
//!
//! Items start at an estimated height and are corrected as the renderer
//! measures them. Cumulative offsets are kept in a prefix table so lookups
//! are a binary search and a measurement only re-sums the tail after it.

use tracing::trace;

use crate::virtualize::{effective_size, sanitize_offset, VisibleRange, Virtualizer};

/// Measurements closer than this to the stored height are ignored.
const MEASURE_EPSILON: f64 = 0.5;

// == Variable List ==
#[derive(Debug, Clone, PartialEq)]
pub struct VariableList {
    heights: Vec<f64>,
    /// `offsets[i]` is the top of item `i`; one extra slot holds the total
    offsets: Vec<f64>,
    estimated_item_height: f64,
    container_height: f64,
    overscan: usize,
}

impl VariableList {
    pub fn new(
        item_count: usize,
        estimated_item_height: f64,
        container_height: f64,
        overscan: usize,
    ) -> Self {
        let estimated_item_height = effective_size(estimated_item_height);
        let mut list = Self {
            heights: vec![estimated_item_height; item_count],
            offsets: Vec::with_capacity(item_count + 1),
            estimated_item_height,
            container_height,
            overscan,
        };
        list.rebuild_offsets(0);
        list
    }

    pub fn item_count(&self) -> usize {
        self.heights.len()
    }

    pub fn set_container_height(&mut self, container_height: f64) {
        self.container_height = container_height;
    }

    // == Measure ==
    /// Records the rendered height of `index`.
    ///
    /// Returns true when the layout changed. Repeating a measurement is a no-op.
    pub fn measure(&mut self, index: usize, height: f64) -> bool {
        if !self.apply_measurement(index, height) {
            return false;
        }
        self.rebuild_offsets(index);
        true
    }

    /// Records a batch of measurements with a single offset rebuild.
    pub fn measure_many<I>(&mut self, measurements: I) -> bool
    where
        I: IntoIterator<Item = (usize, f64)>,
    {
        let mut first_changed: Option<usize> = None;
        for (index, height) in measurements {
            if self.apply_measurement(index, height) {
                first_changed = Some(first_changed.map_or(index, |first| first.min(index)));
            }
        }

        match first_changed {
            Some(index) => {
                self.rebuild_offsets(index);
                true
            }
            None => false,
        }
    }

    // == Item Count ==
    /// Grows with estimated heights or truncates, keeping existing measurements.
    pub fn set_item_count(&mut self, item_count: usize) {
        let previous = self.heights.len();
        if item_count == previous {
            return;
        }
        self.heights.resize(item_count, self.estimated_item_height);
        self.rebuild_offsets(previous.min(item_count));
    }

    /// Offset of the top edge of `index`; past-the-end indices map to the total.
    pub fn offset_of(&self, index: usize) -> f64 {
        self.offsets[index.min(self.heights.len())]
    }

    pub fn height_of(&self, index: usize) -> Option<f64> {
        self.heights.get(index).copied()
    }

    /// Item covering the vertical position `y`.
    fn index_at(&self, y: f64) -> usize {
        // offsets[0] == 0 <= y, so the partition point is at least 1
        let after = self.offsets.partition_point(|&offset| offset <= y);
        (after - 1).min(self.heights.len().saturating_sub(1))
    }

    fn apply_measurement(&mut self, index: usize, height: f64) -> bool {
        let Some(current) = self.heights.get_mut(index) else {
            trace!(index, "Ignoring measurement past the end of the list");
            return false;
        };
        let height = sanitize_offset(height);
        if (*current - height).abs() < MEASURE_EPSILON {
            return false;
        }
        *current = height;
        true
    }

    fn rebuild_offsets(&mut self, from: usize) {
        self.offsets.truncate(from + 1);
        if self.offsets.is_empty() {
            self.offsets.push(0.0);
        }
        let mut running = self.offsets[self.offsets.len() - 1];
        for height in &self.heights[self.offsets.len() - 1..] {
            running += height;
            self.offsets.push(running);
        }
    }
}

impl Virtualizer for VariableList {
    fn visible_range(&self, scroll_top: f64) -> Option<VisibleRange> {
        let last_item = self.heights.len().checked_sub(1)?;
        let scroll_top = sanitize_offset(scroll_top);
        let bottom = scroll_top + sanitize_offset(self.container_height);

        let end_index = self
            .index_at(bottom)
            .saturating_add(self.overscan)
            .min(last_item);
        let start_index = self
            .index_at(scroll_top)
            .saturating_sub(self.overscan)
            .min(end_index);

        Some(VisibleRange {
            start_index,
            end_index,
            pixel_offset: self.offsets[start_index],
        })
    }

    fn total_height(&self) -> f64 {
        self.offsets[self.heights.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimated_layout() {
        let list = VariableList::new(100, 40.0, 200.0, 2);

        assert_eq!(list.total_height(), 4000.0);
        assert_eq!(list.offset_of(10), 400.0);

        let range = list.visible_range(400.0).unwrap();
        assert_eq!((range.start_index, range.end_index), (8, 17));
        assert_eq!(range.pixel_offset, 320.0);
    }

    #[test]
    fn test_measure_shifts_following_offsets() {
        let mut list = VariableList::new(10, 40.0, 100.0, 0);

        assert!(list.measure(2, 100.0));
        assert_eq!(list.offset_of(2), 80.0);
        assert_eq!(list.offset_of(3), 180.0);
        assert_eq!(list.total_height(), 460.0);
        assert_eq!(list.height_of(2), Some(100.0));

        // item 2 now spans [80, 180)
        let range = list.visible_range(100.0).unwrap();
        assert_eq!(range.start_index, 2);
        assert_eq!(range.pixel_offset, 80.0);
    }

    #[test]
    fn test_measure_is_idempotent() {
        let mut list = VariableList::new(10, 40.0, 100.0, 0);

        assert!(list.measure(4, 64.0));
        let snapshot = list.clone();
        assert!(!list.measure(4, 64.0));
        assert!(!list.measure(4, 64.2));
        assert_eq!(list, snapshot);
    }

    #[test]
    fn test_measure_out_of_bounds_is_ignored() {
        let mut list = VariableList::new(3, 40.0, 100.0, 0);
        assert!(!list.measure(3, 10.0));
        assert_eq!(list.height_of(3), None);
        assert_eq!(list.total_height(), 120.0);
    }

    #[test]
    fn test_measure_many_rebuilds_once() {
        let mut list = VariableList::new(5, 10.0, 100.0, 0);

        assert!(list.measure_many([(3, 30.0), (1, 20.0), (1, 20.0)]));
        assert_eq!(list.offset_of(2), 30.0);
        assert_eq!(list.offset_of(4), 70.0);
        assert_eq!(list.total_height(), 80.0);

        assert!(!list.measure_many([(3, 30.0)]));
    }

    #[test]
    fn test_set_item_count_keeps_measurements() {
        let mut list = VariableList::new(3, 10.0, 100.0, 0);
        list.measure(1, 50.0);

        list.set_item_count(5);
        assert_eq!(list.total_height(), 90.0);
        assert_eq!(list.height_of(1), Some(50.0));

        list.set_item_count(1);
        assert_eq!(list.item_count(), 1);
        assert_eq!(list.total_height(), 10.0);

        list.set_item_count(0);
        assert_eq!(list.visible_range(0.0), None);
        assert_eq!(list.total_height(), 0.0);
    }

    #[test]
    fn test_scroll_past_content_and_nan() {
        let list = VariableList::new(10, 40.0, 100.0, 1);

        let end = list.visible_range(1e9).unwrap();
        assert_eq!((end.start_index, end.end_index), (8, 9));

        assert_eq!(list.visible_range(f64::NAN), list.visible_range(0.0));
    }
}
