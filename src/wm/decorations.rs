//! Frame decorations geometry for stile
//!
//! Border thickness per side and the classification of a frame-relative
//! pointer position into a border zone. Drawing is left to the shell.

use crate::shared::{Borders, Geometry};
use crate::wm::client::Client;
use crate::wm::client_flags::{BorderFlags, Status};
use crate::wm::moveresize::ResizeDirection;
use crate::wm::settings::Settings;

/// What a pointer position on a frame refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BorderAction {
    #[default]
    None,
    Move,
    Menu,
    Close,
    Maximize,
    Minimize,
    Resize(ResizeDirection),
}

/// Pointer shapes the core asks the server for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorKind {
    Default,
    Move,
    Resize(ResizeDirection),
}

impl BorderAction {
    pub fn cursor(self) -> CursorKind {
        match self {
            Self::Move => CursorKind::Move,
            Self::Resize(direction) => CursorKind::Resize(direction),
            _ => CursorKind::Default,
        }
    }
}

/// Decoration thickness around a client with the given border flags.
pub fn border_sizes(border: BorderFlags, settings: &Settings) -> Borders {
    let outline = if border.contains(BorderFlags::OUTLINE) {
        settings.border_width as i32
    } else {
        0
    };
    let title = if border.contains(BorderFlags::TITLE) {
        settings.title_height as i32
    } else {
        0
    };
    Borders {
        north: outline + title,
        south: outline,
        east: outline,
        west: outline,
    }
}

/// Root geometry of a client's frame. A shaded frame keeps only its
/// decorations.
pub fn frame_geometry(client: &Client, settings: &Settings) -> Geometry {
    let borders = border_sizes(client.border, settings);
    let mut frame = borders.frame_of(client.geometry);
    if client.status.contains(Status::SHADED) {
        frame.height = (borders.north + borders.south) as u32;
    }
    frame
}

/// Classify a frame-relative position. Pure: depends only on the client's
/// size, decorations and shade state plus the configured thickness.
pub fn classify(client: &Client, settings: &Settings, x: i32, y: i32) -> BorderAction {
    let border = client.border;
    let bsize = if border.contains(BorderFlags::OUTLINE) {
        settings.border_width as i32
    } else {
        0
    };
    let title = if border.contains(BorderFlags::TITLE) {
        settings.title_height as i32
    } else {
        0
    };
    let shaded = client.status.contains(Status::SHADED);
    let width = client.geometry.width as i32;
    let height = if shaded { 0 } else { client.geometry.height as i32 };

    if title > 0 && y >= bsize && y < bsize + title && x >= bsize && x < bsize + width {
        if width >= title && x < bsize + title {
            return BorderAction::Menu;
        }
        let mut offset = bsize + width - title;
        for (flag, action) in [
            (BorderFlags::CLOSE, BorderAction::Close),
            (BorderFlags::MAXIMIZE, BorderAction::Maximize),
            (BorderFlags::MINIMIZE, BorderAction::Minimize),
        ] {
            if border.contains(flag) && offset > bsize + title {
                if x >= offset {
                    return action;
                }
                offset -= title;
            }
        }
        return if border.contains(BorderFlags::MOVE) {
            BorderAction::Move
        } else {
            BorderAction::None
        };
    }

    if !border.contains(BorderFlags::RESIZE) || bsize == 0 {
        return BorderAction::None;
    }

    let north = bsize + title;
    let total_width = width + 2 * bsize;
    let total_height = north + height + bsize;
    let west = x < bsize;
    let east = x >= bsize + width;
    let top = y < bsize;
    let bottom = y >= north + height;

    if shaded {
        return match (west, east) {
            (true, _) => BorderAction::Resize(ResizeDirection::Left),
            (_, true) => BorderAction::Resize(ResizeDirection::Right),
            _ => BorderAction::None,
        };
    }
    if !(west || east || top || bottom) {
        return BorderAction::None;
    }

    let corner = (settings.title_height as i32).max(bsize);
    let side = west || east;
    let edge = top || bottom;
    let upper = top || (side && y < corner);
    let lower = bottom || (side && y >= total_height - corner);
    let left = west || (edge && x < corner);
    let right = east || (edge && x >= total_width - corner);

    let direction = match (upper, lower, left, right) {
        (true, _, true, _) => ResizeDirection::TopLeft,
        (true, _, _, true) => ResizeDirection::TopRight,
        (true, _, _, _) => ResizeDirection::Top,
        (_, true, true, _) => ResizeDirection::BottomLeft,
        (_, true, _, true) => ResizeDirection::BottomRight,
        (_, true, _, _) => ResizeDirection::Bottom,
        (_, _, true, _) => ResizeDirection::Left,
        (_, _, _, true) => ResizeDirection::Right,
        _ => return BorderAction::None,
    };
    BorderAction::Resize(direction)
}
