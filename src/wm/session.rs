//! Session Module
//!
//! State persistence: per-client properties that survive a restart of the
//! manager, and the root properties pagers and taskbars read.

use anyhow::Result;
use tracing::trace;

use crate::shell::Shell;
use crate::wm::client::Client;
use crate::wm::client_flags::{DesktopAssignment, Status};
use crate::wm::decorations::border_sizes;
use crate::wm::ewmh::*;
use crate::wm::server::{Atom, Window, WindowServer};
use crate::wm::settings::Settings;
use crate::wm::WindowManager;

/// Everything `write_state` publishes for one client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientState {
    pub wm_state: u32,
    pub net_state: Vec<Atom>,
    pub desktop: u32,
    pub win_state: u32,
    pub layer: u32,
    /// left, right, top, bottom
    pub frame_extents: [u32; 4],
}

impl ClientState {
    pub fn of(client: &Client, atoms: &Atoms, settings: &Settings) -> Self {
        let status = client.status;
        let wm_state = if status.contains(Status::WITHDRAWN) {
            WM_STATE_WITHDRAWN
        } else if status.contains(Status::MINIMIZED) {
            WM_STATE_ICONIC
        } else {
            WM_STATE_NORMAL
        };

        let mut net_state = Vec::new();
        let mut win_state = 0;
        if client.desktop.is_sticky() {
            net_state.push(atoms.net_wm_state_sticky);
            win_state |= WIN_STATE_STICKY;
        }
        if status.contains(Status::MAXIMIZED) {
            net_state.push(atoms.net_wm_state_maximized_vert);
            net_state.push(atoms.net_wm_state_maximized_horz);
            win_state |= WIN_STATE_MAXIMIZED_VERT | WIN_STATE_MAXIMIZED_HORIZ;
        }
        if status.contains(Status::SHADED) {
            net_state.push(atoms.net_wm_state_shaded);
            win_state |= WIN_STATE_SHADED;
        }
        if status.contains(Status::MINIMIZED) {
            net_state.push(atoms.net_wm_state_hidden);
            win_state |= WIN_STATE_MINIMIZED;
        }
        if status.contains(Status::NOLIST) {
            net_state.push(atoms.net_wm_state_skip_taskbar);
            net_state.push(atoms.net_wm_state_skip_pager);
            win_state |= WIN_STATE_HIDDEN;
        }

        let desktop = match client.desktop {
            DesktopAssignment::Sticky => ALL_DESKTOPS,
            DesktopAssignment::On(d) => d,
        };
        let borders = border_sizes(client.border, settings);

        Self {
            wm_state,
            net_state,
            desktop,
            win_state,
            layer: client.layer as u32,
            frame_extents: [
                borders.west as u32,
                borders.east as u32,
                borders.north as u32,
                borders.south as u32,
            ],
        }
    }
}

impl<S: WindowServer, H: Shell> WindowManager<S, H> {
    /// Publish a client's state on its content window
    pub fn write_state(&mut self, window: Window) -> Result<()> {
        let Some(client) = self.clients.get(window) else {
            return Ok(());
        };
        let state = ClientState::of(client, &self.atoms, &self.settings);
        trace!("State of 0x{:x}: {:?}", window, state);

        let atoms = &self.atoms;
        let server = &mut self.server;
        server.set_property32(window, atoms.wm_state, atoms.wm_state, &[state.wm_state, 0])?;
        server.set_property32(window, atoms.net_wm_state, XA_ATOM, &state.net_state)?;
        server.set_property32(window, atoms.net_wm_desktop, XA_CARDINAL, &[state.desktop])?;
        server.set_property32(window, atoms.win_state, XA_CARDINAL, &[state.win_state])?;
        server.set_property32(window, atoms.win_layer, XA_CARDINAL, &[state.layer])?;
        server.set_property32(window, atoms.net_frame_extents, XA_CARDINAL, &state.frame_extents)
    }

    /// Root properties set once at startup
    pub fn write_root_state(&mut self) -> Result<()> {
        let root = self.root;
        let supported = self.atoms.supported();
        let atoms = &self.atoms;
        let server = &mut self.server;
        server.set_property32(root, atoms.net_supported, XA_ATOM, &supported)?;
        server.set_property32(root, atoms.net_number_of_desktops, XA_CARDINAL, &[self.desktops.count])?;
        server.set_property32(root, atoms.net_current_desktop, XA_CARDINAL, &[self.desktops.current])?;
        self.update_client_lists()
    }

    /// `_NET_CLIENT_LIST` and `_NET_CLIENT_LIST_STACKING`, oldest and
    /// bottom-most first
    pub fn update_client_lists(&mut self) -> Result<()> {
        let bottom_up: Vec<Window> = self.stacking_order().into_iter().rev().collect();
        self.server
            .set_property32(self.root, self.atoms.net_client_list, XA_WINDOW, &self.clients.managed_order())?;
        self.server
            .set_property32(self.root, self.atoms.net_client_list_stacking, XA_WINDOW, &bottom_up)
    }

    /// Remove the properties that only make sense while managed
    pub fn clear_state(&mut self, window: Window) -> Result<()> {
        for property in [self.atoms.net_wm_state, self.atoms.net_frame_extents] {
            self.server.delete_property(window, property)?;
        }
        Ok(())
    }
}
