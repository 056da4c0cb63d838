//! Windowed rendering of long row lists.
//!
//! Only rows that intersect the viewport (plus an overscan margin) are
//! materialized. Spacers above and below the window keep the total
//! scrollable extent equal to `len * row_height` wherever the window sits.

use std::ops::Range;

/// Materialized slice of a list plus its spacers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: usize,
    pub end: usize,
    pub padding_top: usize,
    pub padding_bottom: usize,
}

impl Window {
    pub const EMPTY: Window = Window { start: 0, end: 0, padding_top: 0, padding_bottom: 0 };

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Viewport geometry, in the same unit as the row height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub scroll_offset: usize,
    pub height: usize,
}

/// Compute the rows to materialize for `len` rows of `row_height` each.
pub fn compute(len: usize, row_height: usize, viewport: Viewport, overscan: usize) -> Window {
    if len == 0 || row_height == 0 {
        return Window::EMPTY;
    }

    let total = len.saturating_mul(row_height);
    let top = viewport.scroll_offset.min(total);
    let bottom = top.saturating_add(viewport.height).min(total);

    let first_visible = (top / row_height).min(len);
    let last_visible = bottom.div_ceil(row_height).min(len).max(first_visible);

    let start = first_visible.saturating_sub(overscan);
    let end = last_visible.saturating_add(overscan).min(len);

    Window {
        start,
        end,
        padding_top: start.saturating_mul(row_height),
        padding_bottom: (len - end).saturating_mul(row_height),
    }
}

/// Scroll position and cursor for a row list with one-unit rows.
///
/// The list length changes whenever filters or sorting change; call
/// [`ScrollState::reset`] then so the view starts from the top.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollState {
    pub offset: usize,
    pub cursor: usize,
    len: usize,
}

impl ScrollState {
    pub fn new(len: usize) -> Self {
        Self { offset: 0, cursor: 0, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// New list contents: back to the top.
    pub fn reset(&mut self, len: usize) {
        *self = Self::new(len);
    }

    /// Same list, new length (e.g. a refresh): clamp instead of jumping.
    pub fn set_len(&mut self, len: usize, viewport_height: usize) {
        self.len = len;
        self.cursor = self.cursor.min(len.saturating_sub(1));
        self.follow_cursor(viewport_height);
    }

    pub fn move_cursor(&mut self, delta: isize, viewport_height: usize) {
        if self.len == 0 {
            return;
        }
        let max = self.len - 1;
        self.cursor = self.cursor.saturating_add_signed(delta).min(max);
        self.follow_cursor(viewport_height);
    }

    pub fn cursor_to_start(&mut self) {
        self.cursor = 0;
        self.offset = 0;
    }

    pub fn cursor_to_end(&mut self, viewport_height: usize) {
        self.cursor = self.len.saturating_sub(1);
        self.follow_cursor(viewport_height);
    }

    /// Scroll just enough to keep the cursor visible, never past the end.
    fn follow_cursor(&mut self, viewport_height: usize) {
        let height = viewport_height.max(1);
        if self.cursor < self.offset {
            self.offset = self.cursor;
        } else if self.cursor >= self.offset + height {
            self.offset = self.cursor + 1 - height;
        }
        self.offset = self.offset.min(self.len.saturating_sub(height));
    }

    pub fn window(&self, viewport_height: usize, overscan: usize) -> Window {
        compute(
            self.len,
            1,
            Viewport { scroll_offset: self.offset, height: viewport_height },
            overscan,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vp(scroll_offset: usize, height: usize) -> Viewport {
        Viewport { scroll_offset, height }
    }

    fn assert_extent(w: &Window, len: usize, h: usize) {
        assert_eq!(w.padding_top + w.len() * h + w.padding_bottom, len * h);
    }

    #[test]
    fn test_top_of_list() {
        let w = compute(1000, 41, vp(0, 410), 10);
        assert_eq!(w.start, 0);
        assert_eq!(w.end, 20);
        assert_eq!(w.padding_top, 0);
        assert_extent(&w, 1000, 41);
    }

    #[test]
    fn test_middle_of_list() {
        // Rows 100..110 visible, 10 rows overscan each side.
        let w = compute(1000, 41, vp(4100, 410), 10);
        assert_eq!(w.range(), 90..120);
        assert_eq!(w.padding_top, 90 * 41);
        assert_eq!(w.padding_bottom, 880 * 41);
    }

    #[test]
    fn test_partial_row_included() {
        let w = compute(100, 10, vp(15, 20), 0);
        assert_eq!(w.range(), 1..4);
    }

    #[test]
    fn test_scroll_past_end_clamps() {
        let w = compute(50, 10, vp(10_000, 100), 2);
        assert_eq!(w.end, 50);
        assert_eq!(w.start, 48);
        assert_extent(&w, 50, 10);
    }

    #[test]
    fn test_empty_list() {
        assert_eq!(compute(0, 41, vp(0, 400), 10), Window::EMPTY);
        assert_eq!(compute(10, 0, vp(0, 400), 10), Window::EMPTY);
    }

    #[test]
    fn test_extent_invariant_everywhere() {
        for len in [1, 7, 100, 5000] {
            for h in [1, 3, 41] {
                for offset in [0, 1, 40, 999, 200_000, usize::MAX] {
                    for (height, k) in
                        [(0, 0), (10, 0), (400, 10), (1_000_000, 3), (usize::MAX, usize::MAX)]
                    {
                        let w = compute(len, h, vp(offset, height), k);
                        assert!(w.start <= w.end && w.end <= len);
                        assert_extent(&w, len, h);
                    }
                }
            }
        }
    }

    #[test]
    fn test_huge_viewport_covers_rest_of_list() {
        let w = compute(100, 1, vp(5, usize::MAX), 0);
        assert_eq!((w.start, w.end), (5, 100));
        assert_extent(&w, 100, 1);
    }

    #[test]
    fn test_materialized_count_independent_of_len() {
        let counts: Vec<usize> = [1_000, 10_000, 100_000]
            .iter()
            .map(|&len| compute(len, 41, vp(20_500, 410), 10).len())
            .collect();
        assert!(counts.windows(2).all(|w| w[0] == w[1]));
        assert!(counts[0] <= 410 / 41 + 1 + 20);
    }

    #[test]
    fn test_scroll_state_follows_cursor() {
        let mut s = ScrollState::new(100);
        s.move_cursor(15, 10);
        assert_eq!(s.cursor, 15);
        assert_eq!(s.offset, 6);
        s.move_cursor(-20, 10);
        assert_eq!(s.cursor, 0);
        assert_eq!(s.offset, 0);
        s.cursor_to_end(10);
        assert_eq!(s.cursor, 99);
        assert_eq!(s.offset, 90);
    }

    #[test]
    fn test_scroll_state_reset_and_clamp() {
        let mut s = ScrollState::new(100);
        s.cursor_to_end(10);
        s.set_len(20, 10);
        assert_eq!(s.cursor, 19);
        assert_eq!(s.offset, 10);
        s.reset(5);
        assert_eq!((s.cursor, s.offset, s.len()), (0, 0, 5));
        let w = s.window(10, 2);
        assert_eq!(w.range(), 0..5);
    }
}
