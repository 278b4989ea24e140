/// Width and height of an image, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}
impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Length of the shorter side.
    #[must_use]
    pub fn shorter_side(&self) -> u32 {
        self.width.min(self.height)
    }
}

/// A rectangle in pixel units, measured from the top-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}
impl Rect {
    pub fn new(left: u32, top: u32, width: u32, height: u32) -> Self {
        Self { left, top, width, height }
    }

    /// A rectangle with zero width or height covers no pixels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether the rectangle lies entirely inside an image of `bounds`.
    /// Overflowing coordinates never fit.
    #[must_use]
    pub fn fits_within(&self, bounds: Dimensions) -> bool {
        let right = self.left.checked_add(self.width);
        let bottom = self.top.checked_add(self.height);
        matches!((right, bottom), (Some(r), Some(b)) if r <= bounds.width && b <= bounds.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Rect::new(0, 0, 100, 50), true)]
    #[case(Rect::new(10, 10, 90, 40), true)]
    #[case(Rect::new(10, 10, 91, 40), false)]
    #[case(Rect::new(0, 0, 100, 51), false)]
    #[case(Rect::new(u32::MAX, 0, 1, 1), false)]
    fn test_fits_within(#[case] rect: Rect, #[case] expected: bool) {
        assert_eq!(rect.fits_within(Dimensions::new(100, 50)), expected);
    }

    #[test]
    fn test_shorter_side() {
        assert_eq!(Dimensions::new(1920, 1080).shorter_side(), 1080);
        assert_eq!(Dimensions::new(200, 400).shorter_side(), 200);
    }
}
