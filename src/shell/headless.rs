//! Shell without any desktop widgets
//!
//! Used when stile runs as a bare window manager: refreshes are no-ops,
//! nothing is docked or swallowed and commands are spawned through `sh`.

use std::process::{Command, Stdio};
use std::time::Instant;

use tracing::{debug, trace, warn};

use crate::shared::Geometry;
use crate::shell::{Claimant, Shell};
use crate::wm::client::Client;
use crate::wm::server::{Atom, ClientMessage, ServerEvent, Window};

#[derive(Debug, Default)]
pub struct Headless;

impl Shell for Headless {
    fn signal(&mut self, _now: Instant, _pointer_x: i32, _pointer_y: i32) {}

    fn update_taskbar(&mut self) {}

    fn update_pager(&mut self) {}

    fn draw_border(&mut self, client: &Client, area: Option<Geometry>) {
        trace!("draw border 0x{:x} {:?}", client.window, area);
    }

    fn load_icon(&mut self, window: Window) {
        trace!("load icon 0x{:x}", window);
    }

    fn show_window_menu(&mut self, window: Window, x: i32, y: i32) {
        debug!("No window menu for 0x{:x} at ({}, {})", window, x, y);
    }

    fn show_root_menu(&mut self, _button: u8, _x: i32, _y: i32) -> bool {
        false
    }

    fn claim(&mut self, _claimant: Claimant, _event: &ServerEvent) -> bool {
        false
    }

    fn check_swallow_map(&mut self, _window: Window) -> bool {
        false
    }

    fn dock_selection_clear(&mut self, _owner: Window, _selection: Atom) -> bool {
        false
    }

    fn dock_resize_request(&mut self, _window: Window, _width: u32, _height: u32) -> bool {
        false
    }

    fn dock_destroy(&mut self, _window: Window) -> bool {
        false
    }

    fn dock_message(&mut self, message: &ClientMessage) {
        debug!("No dock for tray message to 0x{:x}", message.window);
    }

    fn run_command(&mut self, command: &str) {
        debug!("Running {:?}", command);
        // sh exits as soon as the command is backgrounded, so reaping it
        // here leaves no zombie behind
        match detached(command).spawn().and_then(|mut child| child.wait()) {
            Ok(status) if !status.success() => warn!("Failed to run {:?}: {}", command, status),
            Ok(_) => {}
            Err(e) => warn!("Failed to run {:?}: {}", command, e),
        }
    }
}

fn detached(command: &str) -> Command {
    let mut sh = Command::new("sh");
    sh.arg("-c").arg(format!("{command} &")).stdin(Stdio::null());
    sh
}
