//! Window Server Module
//!
//! The boundary between the window manager core and the display server.
//! Events arrive as [`ServerEvent`] values already decoded by the backend, and
//! every request the core makes goes through [`WindowServer`]. The X11
//! implementation lives in [`display`](crate::wm::display); tests use the fake
//! in [`testing`](crate::wm::testing).

use std::time::Duration;

use anyhow::Result;
use bitflags::bitflags;

use crate::shared::Geometry;
use crate::wm::decorations::CursorKind;

pub use x11rb::protocol::xproto::{Atom, Colormap, Timestamp, Window};

/// Core pointer buttons
pub const BUTTON_LEFT: u8 = 1;
pub const BUTTON_MIDDLE: u8 = 2;
pub const BUTTON_RIGHT: u8 = 3;
pub const BUTTON_WHEEL_UP: u8 = 4;
pub const BUTTON_WHEEL_DOWN: u8 = 5;

/// Modifier bits of a key/button state
pub const MOD_SHIFT: u16 = 1 << 0;
pub const MOD_LOCK: u16 = 1 << 1;
pub const MOD_CONTROL: u16 = 1 << 2;
pub const MOD_1: u16 = 1 << 3;
pub const MOD_2: u16 = 1 << 4;
pub const MOD_4: u16 = 1 << 6;

bitflags! {
    /// Fields present in a configure request (X11 value mask bits)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ConfigMask: u16 {
        const X            = 1 << 0;
        const Y            = 1 << 1;
        const WIDTH        = 1 << 2;
        const HEIGHT       = 1 << 3;
        const BORDER_WIDTH = 1 << 4;
        const SIBLING      = 1 << 5;
        const STACK_MODE   = 1 << 6;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StackMode {
    #[default]
    Above,
    Below,
    TopIf,
    BottomIf,
    Opposite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfigureRequest {
    pub window: Window,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub border_width: u32,
    pub sibling: Window,
    pub stack_mode: StackMode,
    pub value_mask: ConfigMask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientMessage {
    pub window: Window,
    pub message_type: Atom,
    pub format: u8,
    pub data: [u32; 5],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotionEvent {
    pub window: Window,
    pub x: i32,
    pub y: i32,
    pub root_x: i32,
    pub root_y: i32,
    pub is_hint: bool,
    pub time: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonKind {
    Press,
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    pub kind: ButtonKind,
    pub window: Window,
    pub button: u8,
    /// Position relative to `window`
    pub x: i32,
    pub y: i32,
    pub root_x: i32,
    pub root_y: i32,
    pub state: u16,
    pub time: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub window: Window,
    pub keycode: u8,
    pub state: u16,
    pub root_x: i32,
    pub root_y: i32,
    pub time: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossingEvent {
    pub window: Window,
    pub x: i32,
    pub y: i32,
    pub root_x: i32,
    pub root_y: i32,
}

/// A display server event as seen by the core
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    ConfigureRequest(ConfigureRequest),
    MapRequest { window: Window },
    PropertyNotify { window: Window, atom: Atom },
    ClientMessage(ClientMessage),
    UnmapNotify { window: Window },
    Expose { window: Window, area: Geometry, count: u16 },
    ColormapNotify { window: Window, colormap: Colormap, new: bool },
    DestroyNotify { window: Window },
    SelectionClear { owner: Window, selection: Atom, time: Timestamp },
    ResizeRequest { window: Window, width: u32, height: u32 },
    MotionNotify(MotionEvent),
    Button(ButtonEvent),
    KeyPress(KeyEvent),
    KeyRelease(KeyEvent),
    EnterNotify(CrossingEvent),
    LeaveNotify(CrossingEvent),
    ShapeNotify { window: Window },
    ConfigureNotify { window: Window },
    CreateNotify { window: Window },
    MapNotify { window: Window },
    ReparentNotify { window: Window },
    GraphicsExposure,
    NoExposure,
    /// Any other event, by response type
    Unknown(u8),
}

impl ServerEvent {
    /// Window the event is about, if any
    pub fn window(&self) -> Option<Window> {
        match self {
            Self::ConfigureRequest(e) => Some(e.window),
            Self::ClientMessage(e) => Some(e.window),
            Self::MotionNotify(e) => Some(e.window),
            Self::Button(e) => Some(e.window),
            Self::KeyPress(e) | Self::KeyRelease(e) => Some(e.window),
            Self::EnterNotify(e) | Self::LeaveNotify(e) => Some(e.window),
            Self::MapRequest { window }
            | Self::PropertyNotify { window, .. }
            | Self::UnmapNotify { window }
            | Self::Expose { window, .. }
            | Self::ColormapNotify { window, .. }
            | Self::DestroyNotify { window }
            | Self::ResizeRequest { window, .. }
            | Self::ShapeNotify { window }
            | Self::ConfigureNotify { window }
            | Self::CreateNotify { window }
            | Self::MapNotify { window }
            | Self::ReparentNotify { window } => Some(*window),
            Self::SelectionClear { owner, .. } => Some(*owner),
            Self::GraphicsExposure | Self::NoExposure | Self::Unknown(_) => None,
        }
    }
}

/// Geometry changes for a single configure call; `None` fields are left alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowChanges {
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub border_width: Option<u32>,
    pub sibling: Option<Window>,
    pub stack_mode: Option<StackMode>,
}

impl WindowChanges {
    pub fn geometry(geometry: Geometry) -> Self {
        Self {
            x: Some(geometry.x),
            y: Some(geometry.y),
            width: Some(geometry.width),
            height: Some(geometry.height),
            ..Self::default()
        }
    }
}

/// Attributes of a window the manager does not own yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClientAttributes {
    pub override_redirect: bool,
    pub viewable: bool,
    pub geometry: Geometry,
    pub border_width: u32,
    pub colormap: Colormap,
}

/// Requests the core issues to the display server.
///
/// Calls are fire-and-forget: an `Err` means the connection is gone and is
/// fatal to the caller.
pub trait WindowServer {
    fn root(&self) -> Window;
    fn screen_size(&self) -> (u32, u32);
    /// Whether shape notifications are delivered
    fn has_shape(&self) -> bool;

    /// Number of events already queued locally
    fn pending(&mut self) -> Result<usize>;
    /// Block until the connection is readable or `timeout` elapses.
    /// Returns `true` if data arrived.
    fn wait_readable(&mut self, timeout: Duration) -> Result<bool>;
    /// Next event, blocking if nothing is queued
    fn next_event(&mut self) -> Result<ServerEvent>;
    /// Remove and return every queued event matching `filter`, oldest first
    fn take_queued(&mut self, filter: &dyn Fn(&ServerEvent) -> bool) -> Result<Vec<ServerEvent>>;

    fn configure(&mut self, window: Window, changes: &WindowChanges) -> Result<()>;
    fn move_resize(&mut self, window: Window, geometry: Geometry) -> Result<()> {
        self.configure(window, &WindowChanges::geometry(geometry))
    }
    fn map(&mut self, window: Window) -> Result<()>;
    fn unmap(&mut self, window: Window) -> Result<()>;
    /// Restack so that `windows[0]` is topmost
    fn restack(&mut self, windows: &[Window]) -> Result<()>;
    fn define_cursor(&mut self, window: Window, cursor: CursorKind) -> Result<()>;
    /// Tell `window` its geometry with a synthetic ConfigureNotify
    fn send_configure_notify(&mut self, window: Window, geometry: Geometry) -> Result<()>;
    /// Copy the bounding shape of `content` onto `frame`
    fn apply_shape(&mut self, frame: Window, content: Window, offset: (i32, i32)) -> Result<()>;

    fn sync(&mut self) -> Result<()>;
    fn grab_server(&mut self) -> Result<()>;
    fn ungrab_server(&mut self) -> Result<()>;
    /// Let a grabbed click through to the client
    fn replay_pointer(&mut self, time: Timestamp) -> Result<()>;
    fn grab_pointer(&mut self, window: Window, cursor: CursorKind) -> Result<bool>;
    fn ungrab_pointer(&mut self) -> Result<()>;
    fn grab_keyboard(&mut self, window: Window) -> Result<bool>;
    fn ungrab_keyboard(&mut self) -> Result<()>;
    fn grab_key(&mut self, window: Window, modifiers: u16, keycode: u8) -> Result<()>;
    fn keycodes_for(&mut self, keysym: u32) -> Result<Vec<u8>>;
    fn keysym_for(&mut self, keycode: u8) -> Result<u32>;

    fn set_input_focus(&mut self, window: Window, time: Timestamp) -> Result<()>;
    fn install_colormap(&mut self, colormap: Colormap) -> Result<()>;
    /// Children of the root, bottom first
    fn query_tree(&mut self) -> Result<Vec<Window>>;
    /// `None` if the window is already gone
    fn attributes(&mut self, window: Window) -> Result<Option<ClientAttributes>>;
    fn create_frame(&mut self, geometry: Geometry, background: u32) -> Result<Window>;
    /// Reparent `content` into `frame` at `(x, y)`, add it to the save set,
    /// select client events and grab buttons for click replay.
    fn adopt(&mut self, content: Window, frame: Window, x: i32, y: i32) -> Result<()>;
    /// Reparent `content` back to the root at `(x, y)`
    fn release(&mut self, content: Window, x: i32, y: i32) -> Result<()>;
    fn destroy_window(&mut self, window: Window) -> Result<()>;
    fn kill_client(&mut self, window: Window) -> Result<()>;
    fn send_client_message(&mut self, window: Window, message_type: Atom, data: [u32; 5]) -> Result<()>;

    fn intern_atom(&mut self, name: &str) -> Result<Atom>;
    fn get_property32(&mut self, window: Window, property: Atom) -> Result<Vec<u32>>;
    fn get_text(&mut self, window: Window, property: Atom) -> Result<Option<String>>;
    fn set_property32(&mut self, window: Window, property: Atom, kind: Atom, values: &[u32]) -> Result<()>;
    fn delete_property(&mut self, window: Window, property: Atom) -> Result<()>;
    fn atom_name(&mut self, atom: Atom) -> Result<String>;
}
