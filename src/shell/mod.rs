//! Shell Module
//!
//! The desktop pieces that live outside the window manager core: taskbar,
//! pager, clock, tray and dock, menus, icons, swallowed windows and popups.
//! The core only talks to them through [`Shell`].

pub mod headless;

use std::time::Instant;

use crate::shared::Geometry;
use crate::wm::client::Client;
use crate::wm::server::{Atom, ClientMessage, ServerEvent, Window};

pub use headless::Headless;

/// Subsystems offered events nothing else handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claimant {
    Tray,
    Dialog,
    Swallow,
    Popup,
}

impl Claimant {
    /// Order in which claimants are asked
    pub const ORDER: [Claimant; 4] = [Self::Tray, Self::Dialog, Self::Swallow, Self::Popup];
}

/// Collaborators called from the event handlers.
///
/// Refresh calls are idempotent. Calls returning `bool` report whether the
/// shell took care of the request.
pub trait Shell {
    /// Periodic tick for timers (taskbar, tray button, clock, tray, popups)
    fn signal(&mut self, now: Instant, pointer_x: i32, pointer_y: i32);

    fn update_taskbar(&mut self);
    fn update_pager(&mut self);

    /// Redraw a client's frame, optionally limited to `area`
    fn draw_border(&mut self, client: &Client, area: Option<Geometry>);
    fn load_icon(&mut self, window: Window);

    fn show_window_menu(&mut self, window: Window, x: i32, y: i32);
    /// Returns `false` if no menu is bound to `button`
    fn show_root_menu(&mut self, button: u8, x: i32, y: i32) -> bool;

    /// Offer an unhandled event to one fallback subsystem
    fn claim(&mut self, claimant: Claimant, event: &ServerEvent) -> bool;

    /// Whether a map request is for a window waiting to be swallowed; if so
    /// the shell has taken it.
    fn check_swallow_map(&mut self, window: Window) -> bool;

    fn dock_selection_clear(&mut self, owner: Window, selection: Atom) -> bool;
    fn dock_resize_request(&mut self, window: Window, width: u32, height: u32) -> bool;
    /// An unmanaged window went away; `true` if it was docked
    fn dock_destroy(&mut self, window: Window) -> bool;
    fn dock_message(&mut self, message: &ClientMessage);

    fn run_command(&mut self, command: &str);
}
