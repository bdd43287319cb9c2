//! Workspace Module
//!
//! Virtual desktops. Clients off the current desktop keep their state but
//! have their frames unmapped and carry [`Status::HIDDEN`].

use anyhow::Result;
use tracing::debug;

use crate::shell::Shell;
use crate::wm::client_flags::Status;
use crate::wm::ewmh::XA_CARDINAL;
use crate::wm::server::{Window, WindowServer};
use crate::wm::WindowManager;

/// Current desktop and how many there are
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Desktops {
    pub current: u32,
    pub count: u32,
}

impl Desktops {
    pub fn new(count: u32) -> Self {
        Self { current: 0, count: count.max(1) }
    }

    pub fn next(&self) -> u32 {
        (self.current + 1) % self.count
    }

    pub fn previous(&self) -> u32 {
        (self.current + self.count - 1) % self.count
    }
}

impl<S: WindowServer, H: Shell> WindowManager<S, H> {
    /// Switch to `desktop`; out of range requests are ignored
    pub fn change_desktop(&mut self, desktop: u32) -> Result<()> {
        if desktop >= self.desktops.count || desktop == self.desktops.current {
            return Ok(());
        }
        debug!("Switching to desktop {}", desktop);
        self.desktops.current = desktop;

        for window in self.clients.windows() {
            self.update_visibility(window)?;
        }
        if let Some(active) = self.active {
            if self.clients.get(active).is_none_or(|c| c.status.contains(Status::HIDDEN)) {
                if let Some(client) = self.clients.get_mut(active) {
                    client.status.remove(Status::ACTIVE);
                }
                self.active = None;
            }
        }

        self.server
            .set_property32(self.root, self.atoms.net_current_desktop, XA_CARDINAL, &[desktop])?;
        self.shell.update_taskbar();
        self.shell.update_pager();
        Ok(())
    }

    pub fn next_desktop(&mut self) -> Result<()> {
        self.change_desktop(self.desktops.next())
    }

    pub fn previous_desktop(&mut self) -> Result<()> {
        self.change_desktop(self.desktops.previous())
    }

    /// Map or unmap a client's frame to match its desktop
    pub(crate) fn update_visibility(&mut self, window: Window) -> Result<()> {
        let current = self.desktops.current;
        let Some(client) = self.clients.get_mut(window) else {
            return Ok(());
        };
        let show = client.desktop.shows_on(current);
        let hidden = client.status.contains(Status::HIDDEN);
        let shown = client.is_mapped() || client.status.contains(Status::SHADED);
        let frame = client.parent;

        if show && hidden {
            client.status.remove(Status::HIDDEN);
            if shown {
                self.server.map(frame)?;
            }
        } else if !show && !hidden {
            client.status.insert(Status::HIDDEN);
            if shown {
                self.server.unmap(frame)?;
            }
        }
        Ok(())
    }
}
