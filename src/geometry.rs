//! Plain geometry values shared by layout, animation and the node tree.

/// Immutable width/height pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Dimension {
    pub width: f32,
    pub height: f32,
}

impl Dimension {
    pub const ZERO: Dimension = Dimension {
        width: 0.0,
        height: 0.0,
    };

    /// Negative components are clamped to zero.
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.width == 0.0 && self.height == 0.0
    }

    /// Grow by the horizontal and vertical extent of `insets`.
    pub fn expand(&self, insets: Insets) -> Self {
        Self::new(
            self.width + insets.horizontal(),
            self.height + insets.vertical(),
        )
    }

    /// Linear interpolation between two sizes, `t` in [0, 1].
    pub fn lerp(&self, to: Dimension, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        Self::new(
            self.width + (to.width - self.width) * t,
            self.height + (to.height - self.height) * t,
        )
    }
}

impl From<(u32, u32)> for Dimension {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width as f32, height as f32)
    }
}

/// Box edges, used for container padding and image border widths.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Insets {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Insets {
    pub const ZERO: Insets = Insets {
        top: 0.0,
        right: 0.0,
        bottom: 0.0,
        left: 0.0,
    };

    pub fn uniform(value: f32) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }
}

impl std::ops::Add for Insets {
    type Output = Insets;

    fn add(self, rhs: Insets) -> Insets {
        Insets {
            top: self.top + rhs.top,
            right: self.right + rhs.right,
            bottom: self.bottom + rhs.bottom,
            left: self.left + rhs.left,
        }
    }
}

/// Viewport metrics reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub scroll_top: f32,
    pub scroll_left: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            scroll_top: 0.0,
            scroll_left: 0.0,
        }
    }

    pub fn size(&self) -> Dimension {
        Dimension::new(self.width, self.height)
    }
}
