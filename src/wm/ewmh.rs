//! EWMH (Extended Window Manager Hints) implementation
//!
//! Interned atoms and the decoding of client messages and property changes
//! into closed enums, so handlers never compare atoms themselves.

use anyhow::Result;

use crate::wm::server::{Atom, ClientMessage};

/// ICCCM WM_STATE values
pub const WM_STATE_WITHDRAWN: u32 = 0;
pub const WM_STATE_NORMAL: u32 = 1;
pub const WM_STATE_ICONIC: u32 = 3;

/// Legacy `_WIN_STATE` bits
pub const WIN_STATE_STICKY: u32 = 1 << 0;
pub const WIN_STATE_MINIMIZED: u32 = 1 << 1;
pub const WIN_STATE_MAXIMIZED_VERT: u32 = 1 << 2;
pub const WIN_STATE_MAXIMIZED_HORIZ: u32 = 1 << 3;
pub const WIN_STATE_HIDDEN: u32 = 1 << 4;
pub const WIN_STATE_SHADED: u32 = 1 << 5;

/// `_NET_WM_DESKTOP` value for "all desktops"
pub const ALL_DESKTOPS: u32 = 0xFFFF_FFFF;

/// Predefined property types
pub const XA_ATOM: Atom = 4;
pub const XA_CARDINAL: Atom = 6;
pub const XA_WINDOW: Atom = 33;

/// Holds all interned atoms
#[derive(Debug, Clone)]
pub struct Atoms {
    // ICCCM
    pub wm_protocols: Atom,
    pub wm_delete_window: Atom,
    pub wm_state: Atom,
    pub wm_change_state: Atom,
    pub wm_colormap_windows: Atom,
    pub wm_name: Atom,
    pub wm_normal_hints: Atom,
    pub wm_hints: Atom,
    pub utf8_string: Atom,
    // Root properties
    pub net_supported: Atom,
    pub net_supporting_wm_check: Atom,
    pub net_client_list: Atom,
    pub net_client_list_stacking: Atom,
    pub net_number_of_desktops: Atom,
    pub net_current_desktop: Atom,
    pub net_active_window: Atom,
    // Client messages
    pub net_close_window: Atom,
    pub net_moveresize_window: Atom,
    pub net_system_tray_opcode: Atom,
    // Client properties
    pub net_wm_name: Atom,
    pub net_wm_desktop: Atom,
    pub net_wm_icon: Atom,
    pub net_wm_strut: Atom,
    pub net_wm_strut_partial: Atom,
    pub net_frame_extents: Atom,
    pub net_wm_window_type: Atom,
    pub net_wm_window_type_dialog: Atom,
    pub net_wm_state: Atom,
    pub net_wm_state_sticky: Atom,
    pub net_wm_state_maximized_vert: Atom,
    pub net_wm_state_maximized_horz: Atom,
    pub net_wm_state_shaded: Atom,
    pub net_wm_state_hidden: Atom,
    pub net_wm_state_skip_taskbar: Atom,
    pub net_wm_state_skip_pager: Atom,
    // GNOME legacy hints
    pub win_state: Atom,
    pub win_layer: Atom,
    // Session control
    pub stile_restart: Atom,
    pub stile_exit: Atom,
}

impl Atoms {
    /// Intern all required atoms through `intern`
    pub fn new<F>(mut intern: F) -> Result<Self>
    where
        F: FnMut(&str) -> Result<Atom>,
    {
        Ok(Self {
            wm_protocols: intern("WM_PROTOCOLS")?,
            wm_delete_window: intern("WM_DELETE_WINDOW")?,
            wm_state: intern("WM_STATE")?,
            wm_change_state: intern("WM_CHANGE_STATE")?,
            wm_colormap_windows: intern("WM_COLORMAP_WINDOWS")?,
            wm_name: intern("WM_NAME")?,
            wm_normal_hints: intern("WM_NORMAL_HINTS")?,
            wm_hints: intern("WM_HINTS")?,
            utf8_string: intern("UTF8_STRING")?,
            net_supported: intern("_NET_SUPPORTED")?,
            net_supporting_wm_check: intern("_NET_SUPPORTING_WM_CHECK")?,
            net_client_list: intern("_NET_CLIENT_LIST")?,
            net_client_list_stacking: intern("_NET_CLIENT_LIST_STACKING")?,
            net_number_of_desktops: intern("_NET_NUMBER_OF_DESKTOPS")?,
            net_current_desktop: intern("_NET_CURRENT_DESKTOP")?,
            net_active_window: intern("_NET_ACTIVE_WINDOW")?,
            net_close_window: intern("_NET_CLOSE_WINDOW")?,
            net_moveresize_window: intern("_NET_MOVERESIZE_WINDOW")?,
            net_system_tray_opcode: intern("_NET_SYSTEM_TRAY_OPCODE")?,
            net_wm_name: intern("_NET_WM_NAME")?,
            net_wm_desktop: intern("_NET_WM_DESKTOP")?,
            net_wm_icon: intern("_NET_WM_ICON")?,
            net_wm_strut: intern("_NET_WM_STRUT")?,
            net_wm_strut_partial: intern("_NET_WM_STRUT_PARTIAL")?,
            net_frame_extents: intern("_NET_FRAME_EXTENTS")?,
            net_wm_window_type: intern("_NET_WM_WINDOW_TYPE")?,
            net_wm_window_type_dialog: intern("_NET_WM_WINDOW_TYPE_DIALOG")?,
            net_wm_state: intern("_NET_WM_STATE")?,
            net_wm_state_sticky: intern("_NET_WM_STATE_STICKY")?,
            net_wm_state_maximized_vert: intern("_NET_WM_STATE_MAXIMIZED_VERT")?,
            net_wm_state_maximized_horz: intern("_NET_WM_STATE_MAXIMIZED_HORZ")?,
            net_wm_state_shaded: intern("_NET_WM_STATE_SHADED")?,
            net_wm_state_hidden: intern("_NET_WM_STATE_HIDDEN")?,
            net_wm_state_skip_taskbar: intern("_NET_WM_STATE_SKIP_TASKBAR")?,
            net_wm_state_skip_pager: intern("_NET_WM_STATE_SKIP_PAGER")?,
            win_state: intern("_WIN_STATE")?,
            win_layer: intern("_WIN_LAYER")?,
            stile_restart: intern("_STILE_RESTART")?,
            stile_exit: intern("_STILE_EXIT")?,
        })
    }

    /// Atoms advertised in `_NET_SUPPORTED`
    pub fn supported(&self) -> Vec<Atom> {
        vec![
            self.net_supported,
            self.net_supporting_wm_check,
            self.net_client_list,
            self.net_client_list_stacking,
            self.net_number_of_desktops,
            self.net_current_desktop,
            self.net_active_window,
            self.net_close_window,
            self.net_moveresize_window,
            self.net_wm_name,
            self.net_wm_desktop,
            self.net_wm_icon,
            self.net_wm_strut,
            self.net_wm_strut_partial,
            self.net_frame_extents,
            self.net_wm_window_type,
            self.net_wm_window_type_dialog,
            self.net_wm_state,
            self.net_wm_state_sticky,
            self.net_wm_state_maximized_vert,
            self.net_wm_state_maximized_horz,
            self.net_wm_state_shaded,
            self.net_wm_state_hidden,
            self.net_wm_state_skip_taskbar,
            self.net_wm_state_skip_pager,
        ]
    }

    /// Decode a client message. Never fails: unknown types come back as
    /// [`ProtocolMessage::Unrecognized`].
    pub fn decode(&self, message: &ClientMessage) -> ProtocolMessage {
        let data = message.data;
        let kind = message.message_type;

        if kind == self.net_system_tray_opcode {
            ProtocolMessage::SystemTrayOpcode
        } else if kind == self.win_state {
            ProtocolMessage::WinState { mask: data[0], flags: data[1] }
        } else if kind == self.win_layer {
            ProtocolMessage::WinLayer(data[0])
        } else if kind == self.wm_change_state {
            ProtocolMessage::ChangeState(data[0])
        } else if kind == self.net_active_window {
            ProtocolMessage::ActivateWindow
        } else if kind == self.net_wm_desktop {
            ProtocolMessage::SetDesktop(data[0])
        } else if kind == self.net_close_window {
            ProtocolMessage::CloseWindow
        } else if kind == self.net_moveresize_window {
            ProtocolMessage::MoveResize(MoveResizeRequest::decode(&data))
        } else if kind == self.net_wm_state {
            ProtocolMessage::WmState {
                action: StateAction::from_raw(data[0]),
                raw_action: data[0],
                first: self.state_property(data[1]),
                second: self.state_property(data[2]),
            }
        } else if kind == self.stile_restart {
            ProtocolMessage::Restart
        } else if kind == self.stile_exit {
            ProtocolMessage::Exit
        } else if kind == self.net_current_desktop {
            ProtocolMessage::CurrentDesktop(data[0])
        } else {
            ProtocolMessage::Unrecognized(kind)
        }
    }

    fn state_property(&self, atom: Atom) -> Option<StateProperty> {
        if atom == 0 {
            None
        } else if atom == self.net_wm_state_sticky {
            Some(StateProperty::Sticky)
        } else if atom == self.net_wm_state_maximized_vert {
            Some(StateProperty::MaximizedVert)
        } else if atom == self.net_wm_state_maximized_horz {
            Some(StateProperty::MaximizedHorz)
        } else if atom == self.net_wm_state_shaded {
            Some(StateProperty::Shaded)
        } else {
            None
        }
    }

    /// Which client property a PropertyNotify refers to
    pub fn classify_property(&self, atom: Atom) -> WatchedProperty {
        if atom == self.wm_name || atom == self.net_wm_name {
            WatchedProperty::Name
        } else if atom == self.wm_normal_hints {
            WatchedProperty::NormalHints
        } else if atom == self.wm_colormap_windows {
            WatchedProperty::ColormapWindows
        } else if atom == self.net_wm_icon {
            WatchedProperty::Icon
        } else if atom == self.net_wm_strut || atom == self.net_wm_strut_partial {
            WatchedProperty::Strut
        } else {
            WatchedProperty::Other
        }
    }
}

/// `_NET_WM_STATE` action field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateAction {
    Remove,
    Add,
    Toggle,
}

impl StateAction {
    pub fn from_raw(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Remove),
            1 => Some(Self::Add),
            2 => Some(Self::Toggle),
            _ => None,
        }
    }
}

/// `_NET_WM_STATE` properties the manager acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateProperty {
    Sticky,
    MaximizedVert,
    MaximizedHorz,
    Shaded,
}

/// Decoded `_NET_MOVERESIZE_WINDOW` payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveResizeRequest {
    /// Raw gravity, 0 meaning "use the window's own"
    pub gravity: u32,
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl MoveResizeRequest {
    pub fn decode(data: &[u32; 5]) -> Self {
        let gravity = data[0] & 0xFF;
        let flags = data[0] >> 8;
        let has = |bit: u32| flags & (1 << bit) != 0;
        Self {
            gravity,
            x: has(0).then_some(data[1] as i32),
            y: has(1).then_some(data[2] as i32),
            width: has(2).then_some(data[3]),
            height: has(3).then_some(data[4]),
        }
    }
}

/// A recognized client message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolMessage {
    /// `_WIN_STATE`: bits in `mask` are set to their value in `flags`
    WinState { mask: u32, flags: u32 },
    /// `_WIN_LAYER`
    WinLayer(u32),
    /// `WM_CHANGE_STATE`
    ChangeState(u32),
    /// `_NET_ACTIVE_WINDOW`
    ActivateWindow,
    /// `_NET_WM_DESKTOP`
    SetDesktop(u32),
    /// `_NET_CLOSE_WINDOW`
    CloseWindow,
    /// `_NET_MOVERESIZE_WINDOW`
    MoveResize(MoveResizeRequest),
    /// `_NET_WM_STATE`
    WmState {
        action: Option<StateAction>,
        raw_action: u32,
        first: Option<StateProperty>,
        second: Option<StateProperty>,
    },
    Restart,
    Exit,
    /// `_NET_CURRENT_DESKTOP`
    CurrentDesktop(u32),
    /// `_NET_SYSTEM_TRAY_OPCODE`, handled by the dock
    SystemTrayOpcode,
    Unrecognized(Atom),
}

impl ProtocolMessage {
    /// Whether the message is only meaningful when sent to the root
    pub fn is_root_message(&self) -> bool {
        matches!(self, Self::Restart | Self::Exit | Self::CurrentDesktop(_))
    }
}

/// Client properties the manager watches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchedProperty {
    Name,
    NormalHints,
    ColormapWindows,
    Icon,
    Strut,
    Other,
}

#[cfg(test)]
pub(crate) fn test_atoms() -> Atoms {
    let mut next = 100;
    Atoms::new(|_| {
        next += 1;
        Ok(next)
    })
    .expect("counter interning cannot fail")
}
