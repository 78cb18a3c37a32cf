//! Panel placement: anchor point first, then clamp against the viewport.
//!
//! Placement is a second pass. The host renders the panel invisibly to
//! measure it (the size depends on the button set), and only then can the
//! box be pushed back inside the viewport.

use crate::constants::{CARET_GAP, PANEL_MARGIN, POINTER_GAP};
use crate::geometry::{Point, Rect, Size, Viewport};

/// Where the panel should attach, already resolved to viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnchorPoint {
    /// Collapsed range at the selection's focus point. The panel sits just
    /// above and to the right of it.
    Caret(Rect),
    /// Pointer position. The panel is centered horizontally over it.
    Pointer(Point),
    /// Bounding box of a field. The panel is centered over the box.
    Field(Rect),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementConfig {
    pub margin: f64,
    pub caret_gap: f64,
    pub pointer_gap: f64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            margin: PANEL_MARGIN,
            caret_gap: CARET_GAP,
            pointer_gap: POINTER_GAP,
        }
    }
}

impl PlacementConfig {
    /// Placement tuned for a character-cell grid where one unit is one cell.
    pub const fn cells() -> Self {
        Self {
            margin: 1.0,
            caret_gap: 0.0,
            pointer_gap: 1.0,
        }
    }
}

/// Compute the top-left corner of a panel of `size` attached to `anchor`.
pub fn place(anchor: AnchorPoint, size: Size, viewport: Viewport, cfg: &PlacementConfig) -> Point {
    let (mut left, mut top, below) = match anchor {
        AnchorPoint::Caret(caret) => (
            caret.right(),
            caret.top() - size.height - cfg.caret_gap,
            caret.bottom() + cfg.caret_gap,
        ),
        AnchorPoint::Pointer(p) => (
            p.x - size.width / 2.0,
            p.y - size.height - cfg.pointer_gap,
            p.y + cfg.pointer_gap,
        ),
        AnchorPoint::Field(field) => (
            field.center_x() - size.width / 2.0,
            field.top() - size.height - cfg.caret_gap,
            field.bottom() + cfg.caret_gap,
        ),
    };

    if left + size.width > viewport.width {
        left = viewport.width - size.width - cfg.margin;
    }
    if top < 0.0 {
        top = below;
    }
    // Also covers panels wider than the viewport.
    if left < cfg.margin {
        left = cfg.margin;
    }
    Point::new(left, top)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PANEL: Size = Size::new(120.0, 30.0);
    const VIEW: Viewport = Viewport::new(800.0, 600.0);

    #[test]
    fn caret_anchor_sits_above_and_right() {
        let caret = Rect::caret(200.0, 300.0, 16.0);
        let pos = place(
            AnchorPoint::Caret(caret),
            PANEL,
            VIEW,
            &PlacementConfig::default(),
        );
        assert_eq!(pos, Point::new(200.0, 300.0 - 30.0 - CARET_GAP));
    }

    #[test]
    fn right_edge_overflow_left_aligns_against_margin() {
        let caret = Rect::caret(780.0, 300.0, 16.0);
        let pos = place(
            AnchorPoint::Caret(caret),
            PANEL,
            VIEW,
            &PlacementConfig::default(),
        );
        assert_eq!(pos.x, VIEW.width - PANEL.width - PANEL_MARGIN);
    }

    #[test]
    fn negative_top_flips_below_anchor() {
        let caret = Rect::caret(100.0, 10.0, 16.0);
        let pos = place(
            AnchorPoint::Caret(caret),
            PANEL,
            VIEW,
            &PlacementConfig::default(),
        );
        assert_eq!(pos.y, 26.0 + CARET_GAP);

        let pos = place(
            AnchorPoint::Pointer(Point::new(300.0, 5.0)),
            PANEL,
            VIEW,
            &PlacementConfig::default(),
        );
        assert_eq!(pos.y, 5.0 + POINTER_GAP);
    }

    #[test]
    fn pointer_near_left_edge_is_clamped_to_margin() {
        let pos = place(
            AnchorPoint::Pointer(Point::new(4.0, 300.0)),
            PANEL,
            VIEW,
            &PlacementConfig::default(),
        );
        assert_eq!(pos.x, PANEL_MARGIN);
    }

    #[test]
    fn panel_wider_than_viewport_never_goes_negative() {
        let wide = Size::new(900.0, 30.0);
        let pos = place(
            AnchorPoint::Pointer(Point::new(400.0, 300.0)),
            wide,
            VIEW,
            &PlacementConfig::default(),
        );
        assert!(pos.x >= 0.0);
    }

    #[test]
    fn field_anchor_centers_over_box() {
        let field = Rect::new(100.0, 200.0, 300.0, 24.0);
        let pos = place(
            AnchorPoint::Field(field),
            PANEL,
            VIEW,
            &PlacementConfig::default(),
        );
        assert_eq!(pos.x, 250.0 - 60.0);
        assert_eq!(pos.y, 200.0 - 30.0 - CARET_GAP);
    }
}
