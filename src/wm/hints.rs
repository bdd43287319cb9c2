//! Hints Module
//!
//! Parsing of WM_NORMAL_HINTS and struts, size constraints and gravity.

use crate::shared::{Borders, Geometry};

// WM_SIZE_HINTS flag bits (ICCCM 4.1.2.3)
const P_MIN_SIZE: u32 = 1 << 4;
const P_MAX_SIZE: u32 = 1 << 5;
const P_RESIZE_INC: u32 = 1 << 6;
const P_ASPECT: u32 = 1 << 7;
const P_BASE_SIZE: u32 = 1 << 8;
const P_WIN_GRAVITY: u32 = 1 << 9;

/// Window gravity (X11 numbering; `Static` also covers `Forget`/unknown values)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gravity {
    #[default]
    NorthWest,
    North,
    NorthEast,
    West,
    Center,
    East,
    SouthWest,
    South,
    SouthEast,
    Static,
}

impl Gravity {
    pub fn from_raw(value: u32) -> Self {
        match value {
            1 => Self::NorthWest,
            2 => Self::North,
            3 => Self::NorthEast,
            4 => Self::West,
            5 => Self::Center,
            6 => Self::East,
            7 => Self::SouthWest,
            8 => Self::South,
            9 => Self::SouthEast,
            _ => Self::Static,
        }
    }

    /// Offset to subtract from a requested position so that the reference
    /// point of this gravity stays put once the frame is added.
    pub fn delta(self, borders: &Borders) -> (i32, i32) {
        let Borders { north, south, east, west } = *borders;
        match self {
            Self::NorthWest => (-west, -north),
            Self::North => (0, -north),
            Self::NorthEast => (west, -north),
            Self::West => (-west, 0),
            Self::Center => ((east + west) / 2, (north + south) / 2),
            Self::East => (west, 0),
            Self::SouthWest => (-west, south),
            Self::South => (0, south),
            Self::SouthEast => (west, south),
            Self::Static => (0, 0),
        }
    }
}

/// Resolved size hints with ICCCM defaults filled in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeHints {
    pub min_width: u32,
    pub min_height: u32,
    pub max_width: u32,
    pub max_height: u32,
    pub width_inc: u32,
    pub height_inc: u32,
    pub base_width: u32,
    pub base_height: u32,
    /// (min numerator, min denominator, max numerator, max denominator)
    pub aspect: Option<(u32, u32, u32, u32)>,
    pub gravity: Gravity,
}

impl Default for SizeHints {
    fn default() -> Self {
        Self {
            min_width: 1,
            min_height: 1,
            max_width: u32::MAX,
            max_height: u32::MAX,
            width_inc: 1,
            height_inc: 1,
            base_width: 0,
            base_height: 0,
            aspect: None,
            gravity: Gravity::NorthWest,
        }
    }
}

impl SizeHints {
    /// Parse the 18 CARD32 values of a WM_SIZE_HINTS property. Short or empty
    /// properties yield the defaults.
    pub fn parse(values: &[u32]) -> Self {
        let mut hints = Self::default();
        if values.len() < 18 {
            return hints;
        }
        let flags = values[0];

        if flags & P_MIN_SIZE != 0 {
            hints.min_width = values[5].max(1);
            hints.min_height = values[6].max(1);
        }
        if flags & P_MAX_SIZE != 0 {
            hints.max_width = values[7].max(hints.min_width);
            hints.max_height = values[8].max(hints.min_height);
        }
        if flags & P_RESIZE_INC != 0 {
            hints.width_inc = values[9].max(1);
            hints.height_inc = values[10].max(1);
        }
        if flags & P_ASPECT != 0 {
            hints.aspect = Some((values[11], values[12], values[13], values[14]));
        }
        if flags & P_BASE_SIZE != 0 {
            hints.base_width = values[15];
            hints.base_height = values[16];
        } else if flags & P_MIN_SIZE != 0 {
            hints.base_width = hints.min_width;
            hints.base_height = hints.min_height;
        }
        if flags & P_WIN_GRAVITY != 0 {
            hints.gravity = Gravity::from_raw(values[17]);
        }
        hints
    }

    /// Clamp a content size to these hints and to the screen.
    pub fn constrain(&self, width: u32, height: u32, screen: Geometry) -> (u32, u32) {
        let mut width = width.clamp(self.min_width, self.max_width);
        let mut height = height.clamp(self.min_height, self.max_height);

        if self.width_inc > 1 && width > self.base_width {
            width -= (width - self.base_width) % self.width_inc;
        }
        if self.height_inc > 1 && height > self.base_height {
            height -= (height - self.base_height) % self.height_inc;
        }

        if let Some((min_x, min_y, max_x, max_y)) = self.aspect {
            let (w, h) = (u64::from(width), u64::from(height));
            if min_x > 0 && min_y > 0 && w * u64::from(min_y) < h * u64::from(min_x) {
                height = (w * u64::from(min_y) / u64::from(min_x)) as u32;
            }
            let h = u64::from(height);
            if max_x > 0 && max_y > 0 && w * u64::from(max_y) > h * u64::from(max_x) {
                width = (h * u64::from(max_x) / u64::from(max_y)) as u32;
            }
        }

        width = width.min(screen.width).max(1);
        height = height.min(screen.height).max(1);
        (width, height)
    }
}

/// Screen-edge reservation (`_NET_WM_STRUT` / `_NET_WM_STRUT_PARTIAL`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Strut {
    pub left: u32,
    pub right: u32,
    pub top: u32,
    pub bottom: u32,
}

impl Strut {
    /// Both property forms start with left, right, top, bottom.
    pub fn parse(values: &[u32]) -> Option<Self> {
        match values {
            [left, right, top, bottom, ..] => Some(Self {
                left: *left,
                right: *right,
                top: *top,
                bottom: *bottom,
            }),
            _ => None,
        }
    }

    /// Screen area left over once all `struts` are reserved. Each side is
    /// capped at the screen size, whatever the client asked for.
    pub fn work_area<'a>(screen: Geometry, struts: impl IntoIterator<Item = &'a Strut>) -> Geometry {
        let reserved = struts.into_iter().fold(Strut::default(), |acc, s| Strut {
            left: acc.left.max(s.left.min(screen.width)),
            right: acc.right.max(s.right.min(screen.width)),
            top: acc.top.max(s.top.min(screen.height)),
            bottom: acc.bottom.max(s.bottom.min(screen.height)),
        });
        Geometry {
            x: screen.x + reserved.left as i32,
            y: screen.y + reserved.top as i32,
            width: screen.width.saturating_sub(reserved.left.saturating_add(reserved.right)).max(1),
            height: screen.height.saturating_sub(reserved.top.saturating_add(reserved.bottom)).max(1),
        }
    }
}
