//! Shared window geometry
//!
//! Plain geometry values shared by the core, the X11 backend and the shell.

/// Window geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }
}

/// Decoration thickness on each side of a content window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Borders {
    pub north: i32,
    pub south: i32,
    pub east: i32,
    pub west: i32,
}

impl Borders {
    /// Outer frame geometry for a content window placed at `content`.
    pub fn frame_of(&self, content: Geometry) -> Geometry {
        Geometry {
            x: content.x - self.west,
            y: content.y - self.north,
            width: content.width + (self.east + self.west) as u32,
            height: content.height + (self.north + self.south) as u32,
        }
    }

    /// Position of the content window inside its frame.
    pub fn inset(&self, width: u32, height: u32) -> Geometry {
        Geometry::new(self.west, self.north, width, height)
    }
}
