use serde::{Deserialize, Serialize};

/// The effective transform of a layer at one instant.
///
/// `x`/`y` are the offset of the layer center from the canvas center, in
/// canvas pixels. `rotation` is in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerTransform {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    pub rotation: f64,
    /// Opacity (0.0–1.0).
    pub opacity: f64,
}

impl LayerTransform {
    /// Identity transform: centered, scale 1, no rotation, fully opaque.
    pub fn identity() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale: 1.0,
            rotation: 0.0,
            opacity: 1.0,
        }
    }
}

impl Default for LayerTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// An integer pixel rectangle. `x`/`y` may be negative (off-canvas placement).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl Rect {
    pub fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn right(&self) -> i64 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> i64 {
        self.y.saturating_add(self.height)
    }

    /// Overlap of two rectangles, or None when they do not overlap.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        let r = Rect::new(x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0));
        if r.is_empty() {
            None
        } else {
            Some(r)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_identity() {
        let t = LayerTransform::identity();
        assert_eq!(t.x, 0.0);
        assert_eq!(t.y, 0.0);
        assert_eq!(t.scale, 1.0);
        assert_eq!(t.rotation, 0.0);
        assert_eq!(t.opacity, 1.0);
    }

    #[test]
    fn test_rect_intersect_partial() {
        let canvas = Rect::new(0, 0, 100, 100);
        let layer = Rect::new(-20, 90, 50, 50);
        let r = canvas.intersect(&layer).unwrap();
        assert_eq!(r, Rect::new(0, 90, 30, 10));
    }

    #[test]
    fn test_rect_intersect_disjoint() {
        let canvas = Rect::new(0, 0, 100, 100);
        assert!(canvas.intersect(&Rect::new(100, 0, 10, 10)).is_none());
        assert!(canvas.intersect(&Rect::new(-10, -10, 10, 10)).is_none());
    }

    #[test]
    fn test_rect_intersect_extreme_offsets() {
        let canvas = Rect::new(0, 0, 100, 100);
        assert!(canvas.intersect(&Rect::new(i64::MAX, 0, 10, 10)).is_none());
        assert!(canvas.intersect(&Rect::new(0, i64::MIN, 10, 10)).is_none());
        let huge = Rect::new(i64::MIN, i64::MIN, i64::MAX, i64::MAX);
        assert!(canvas.intersect(&huge).is_none());
    }
}
