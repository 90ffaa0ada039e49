//! Screen geometry the host surface supplies for scrolling and popovers.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollContainer {
    pub rect: Rect,
    pub scroll_top: f64,
}

/// Position-to-screen mapping provided by whatever renders the document.
pub trait ViewGeometry {
    fn coords_at_pos(&self, pos: usize) -> Option<Rect>;
    fn surface_rect(&self) -> Rect;
    fn scroll_container(&self) -> Option<ScrollContainer>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PopoverAnchor {
    /// Distance from the surface's left edge.
    Left(f64),
    /// Distance from the surface's right edge.
    Right(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PopoverPlacement {
    pub top: f64,
    pub anchor: PopoverAnchor,
}

/// Anchors the popover to whichever surface edge the selection midpoint is
/// closer to, `offset` pixels above the selection.
pub fn place_popover(start: Rect, end: Rect, surface: Rect, offset: f64) -> PopoverPlacement {
    let midpoint = (start.left + end.left) / 2.0;
    let from_left = midpoint - surface.left;
    let from_right = surface.right - midpoint;
    let anchor = if from_right < from_left {
        PopoverAnchor::Right(from_right)
    } else {
        PopoverAnchor::Left(from_left)
    };
    PopoverPlacement {
        top: start.top.min(end.top) - surface.top - offset,
        anchor,
    }
}

/// Fixed-pitch geometry: positions flow left to right in rows of
/// `columns` cells. Used by the CLI host and in tests.
#[derive(Debug, Clone)]
pub struct GridGeometry {
    pub surface: Rect,
    pub columns: usize,
    pub cell_width: f64,
    pub line_height: f64,
    pub scroll_top: f64,
}

impl GridGeometry {
    pub fn new(columns: usize, cell_width: f64, line_height: f64) -> Self {
        let columns = columns.max(1);
        Self {
            surface: Rect::new(0.0, 0.0, columns as f64 * cell_width, f64::MAX),
            columns,
            cell_width,
            line_height,
            scroll_top: 0.0,
        }
    }
}

impl ViewGeometry for GridGeometry {
    fn coords_at_pos(&self, pos: usize) -> Option<Rect> {
        let row = (pos / self.columns) as f64;
        let column = (pos % self.columns) as f64;
        let left = self.surface.left + column * self.cell_width;
        let top = self.surface.top + row * self.line_height;
        Some(Rect::new(left, top, left + self.cell_width, top + self.line_height))
    }

    fn surface_rect(&self) -> Rect {
        self.surface
    }

    fn scroll_container(&self) -> Option<ScrollContainer> {
        Some(ScrollContainer {
            rect: self.surface,
            scroll_top: self.scroll_top,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_popover_anchors_to_nearer_edge() {
        let surface = Rect::new(0.0, 100.0, 800.0, 900.0);
        let left = place_popover(
            Rect::new(100.0, 300.0, 110.0, 320.0),
            Rect::new(200.0, 340.0, 210.0, 360.0),
            surface,
            40.0,
        );
        assert_eq!(left.anchor, PopoverAnchor::Left(150.0));
        assert_eq!(left.top, 160.0);

        let right = place_popover(
            Rect::new(600.0, 300.0, 610.0, 320.0),
            Rect::new(700.0, 300.0, 710.0, 320.0),
            surface,
            40.0,
        );
        assert_eq!(right.anchor, PopoverAnchor::Right(150.0));
    }

    #[test]
    fn test_grid_geometry_wraps_rows() {
        let grid = GridGeometry::new(10, 8.0, 20.0);
        let rect = grid.coords_at_pos(23).unwrap();
        assert_eq!(rect.left, 24.0);
        assert_eq!(rect.top, 40.0);
        assert_eq!(grid.surface_rect().width(), 80.0);
    }
}
