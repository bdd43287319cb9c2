//! Client Flags
//!
//! Bitfield flags for client decorations and state.

use bitflags::bitflags;

bitflags! {
    /// Decorations and the interactions they allow
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BorderFlags: u16 {
        const OUTLINE   = 1 << 0;
        const TITLE     = 1 << 1;
        const MINIMIZE  = 1 << 2;
        const MAXIMIZE  = 1 << 3;
        const CLOSE     = 1 << 4;
        const RESIZE    = 1 << 5;
        const MOVE      = 1 << 6;
        /// The window may be rolled up into its title bar
        const SHADE     = 1 << 7;
    }
}

impl Default for BorderFlags {
    fn default() -> Self {
        Self::all()
    }
}

bitflags! {
    /// Client status
    ///
    /// `MAPPED` and `MINIMIZED` are never set together; use the setters on
    /// [`Client`](crate::wm::client::Client) rather than toggling them here.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Status: u32 {
        const MAPPED     = 1 << 0;
        const MINIMIZED  = 1 << 1;
        const SHADED     = 1 << 2;
        const MAXIMIZED  = 1 << 3;
        const WITHDRAWN  = 1 << 4;
        /// Hidden from the taskbar and pager
        const NOLIST     = 1 << 5;
        /// Transient dialog; property changes are passed on to the shell
        const WMDIALOG   = 1 << 6;
        const ACTIVE     = 1 << 7;
        /// Frame unmapped because the client's desktop is not shown
        const HIDDEN     = 1 << 8;
    }
}

/// Desktop membership. A sticky client belongs to every desktop and has no
/// concrete index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesktopAssignment {
    Sticky,
    On(u32),
}

impl DesktopAssignment {
    pub fn is_sticky(self) -> bool {
        matches!(self, Self::Sticky)
    }

    /// Whether the client should be visible while `desktop` is shown.
    pub fn shows_on(self, desktop: u32) -> bool {
        match self {
            Self::Sticky => true,
            Self::On(index) => index == desktop,
        }
    }
}

/// Stacking layers (the legacy `_WIN_LAYER` scale)
pub const LAYER_BOTTOM: u8 = 0;
pub const LAYER_NORMAL: u8 = 4;
pub const LAYER_TOP: u8 = 12;
