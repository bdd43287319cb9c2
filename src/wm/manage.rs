//! Taking windows under management and letting them go.

use anyhow::Result;
use tracing::{debug, info};

use crate::shell::Shell;
use crate::wm::client::Client;
use crate::wm::client_flags::{DesktopAssignment, Status, LAYER_TOP};
use crate::wm::decorations::{border_sizes, frame_geometry};
use crate::wm::ewmh::{ALL_DESKTOPS, WM_STATE_ICONIC, XA_WINDOW};
use crate::wm::hints::{SizeHints, Strut};
use crate::wm::server::{Window, WindowServer};
use crate::wm::WindowManager;

impl<S: WindowServer, H: Shell> WindowManager<S, H> {
    /// Frame and manage `window`. Returns `None` for windows that are gone
    /// or must not be managed (override-redirect).
    ///
    /// `already_mapped` is set for windows found viewable at startup; their
    /// reparenting produces an unmap the manager must not act on.
    pub fn add_client(&mut self, window: Window, already_mapped: bool) -> Result<Option<Window>> {
        let Some(attributes) = self.server.attributes(window)? else {
            debug!("Window 0x{:x} vanished before it could be managed", window);
            return Ok(None);
        };
        if attributes.override_redirect {
            debug!("Window 0x{:x} is override-redirect, skipping", window);
            return Ok(None);
        }
        if self.clients.contains(window) {
            return Ok(Some(window));
        }

        let mut client = Client::new(window, 0, attributes.geometry);
        client.colormap = attributes.colormap;
        client.name = self.fetch_name(window)?;
        client.hints = self.fetch_size_hints(window)?;
        client.strut = self.fetch_strut(window)?;
        client.colormap_windows = self.server.get_property32(window, self.atoms.wm_colormap_windows)?;

        let types = self.server.get_property32(window, self.atoms.net_wm_window_type)?;
        if types.contains(&self.atoms.net_wm_window_type_dialog) {
            client.status.insert(Status::WMDIALOG);
        }

        // State left behind by a previous manager (or a previous run of this one)
        let current = self.desktops.current;
        client.desktop = match self.server.get_property32(window, self.atoms.net_wm_desktop)?.first() {
            Some(&ALL_DESKTOPS) => DesktopAssignment::Sticky,
            Some(&d) if d < self.desktops.count => DesktopAssignment::On(d),
            _ => DesktopAssignment::On(current),
        };
        if let Some(&layer) = self.server.get_property32(window, self.atoms.win_layer)?.first() {
            if layer <= LAYER_TOP as u32 {
                client.layer = layer as u8;
            }
        }
        let iconic = self.server.get_property32(window, self.atoms.wm_state)?.first() == Some(&WM_STATE_ICONIC);
        if iconic {
            client.set_minimized();
        } else {
            client.set_mapped();
        }
        let hidden = !client.desktop.shows_on(current);
        if hidden {
            client.status.insert(Status::HIDDEN);
        }

        let borders = border_sizes(client.border, &self.settings);
        let frame = self
            .server
            .create_frame(frame_geometry(&client, &self.settings), self.settings.frame_background)?;
        client.parent = frame;
        self.server.adopt(window, frame, borders.west, borders.north)?;
        if self.server.has_shape() {
            self.server.apply_shape(frame, window, (borders.west, borders.north))?;
        }

        if iconic {
            if already_mapped {
                client.ignore_unmap += 1;
                self.server.unmap(window)?;
            }
        } else {
            if already_mapped {
                client.ignore_unmap += 1;
            }
            self.server.map(window)?;
            if !hidden {
                self.server.map(frame)?;
            }
        }

        info!("Managing window 0x{:x} ({:?}) in frame 0x{:x}", window, client.name, frame);
        self.clients.insert(client);
        self.write_state(window)?;
        self.update_client_lists()?;
        self.shell.load_icon(window);
        self.shell.update_taskbar();
        self.shell.update_pager();
        Ok(Some(window))
    }

    /// Forget a client whose content window is gone and destroy its frame
    pub fn remove_client(&mut self, window: Window) -> Result<()> {
        let Some(client) = self.clients.remove(window) else {
            return Ok(());
        };
        info!("Unmanaging window 0x{:x}", window);
        if self.active == Some(window) {
            self.active = None;
            self.server
                .set_property32(self.root, self.atoms.net_active_window, XA_WINDOW, &[0])?;
        }
        self.server.destroy_window(client.parent)?;
        self.update_client_lists()?;
        self.shell.update_taskbar();
        self.shell.update_pager();
        Ok(())
    }

    /// Manage the viewable children of the root found at startup
    pub fn manage_existing(&mut self) -> Result<()> {
        for window in self.server.query_tree()? {
            let manageable = self
                .server
                .attributes(window)?
                .is_some_and(|a| a.viewable && !a.override_redirect);
            if manageable && self.clients.find(window).is_none() {
                self.add_client(window, true)?;
            }
        }
        Ok(())
    }

    /// Hand every client back to the root, bottom-most first, leaving it
    /// mapped where its content was
    pub fn release_all(&mut self) -> Result<()> {
        let order: Vec<Window> = self.stacking_order().into_iter().rev().collect();
        for window in order {
            let Some(client) = self.clients.remove(window) else {
                continue;
            };
            self.clear_state(window)?;
            self.server.release(window, client.geometry.x, client.geometry.y)?;
            self.server.destroy_window(client.parent)?;
        }
        info!("Released all clients");
        Ok(())
    }

    fn fetch_name(&mut self, window: Window) -> Result<String> {
        if let Some(name) = self.server.get_text(window, self.atoms.net_wm_name)? {
            return Ok(name);
        }
        Ok(self.server.get_text(window, self.atoms.wm_name)?.unwrap_or_default())
    }

    fn fetch_size_hints(&mut self, window: Window) -> Result<SizeHints> {
        Ok(SizeHints::parse(&self.server.get_property32(window, self.atoms.wm_normal_hints)?))
    }

    fn fetch_strut(&mut self, window: Window) -> Result<Option<Strut>> {
        let partial = self.server.get_property32(window, self.atoms.net_wm_strut_partial)?;
        if let Some(strut) = Strut::parse(&partial) {
            return Ok(Some(strut));
        }
        Ok(Strut::parse(&self.server.get_property32(window, self.atoms.net_wm_strut)?))
    }

    pub(crate) fn read_name(&mut self, window: Window) -> Result<()> {
        let name = self.fetch_name(window)?;
        if let Some(client) = self.clients.get_mut(window) {
            client.name = name;
        }
        Ok(())
    }

    pub(crate) fn read_size_hints(&mut self, window: Window) -> Result<()> {
        let hints = self.fetch_size_hints(window)?;
        if let Some(client) = self.clients.get_mut(window) {
            client.hints = hints;
        }
        Ok(())
    }

    pub(crate) fn read_strut(&mut self, window: Window) -> Result<()> {
        let strut = self.fetch_strut(window)?;
        if let Some(client) = self.clients.get_mut(window) {
            client.strut = strut;
        }
        Ok(())
    }

    pub(crate) fn read_colormap_windows(&mut self, window: Window) -> Result<()> {
        let windows = self.server.get_property32(window, self.atoms.wm_colormap_windows)?;
        if let Some(client) = self.clients.get_mut(window) {
            client.colormap_windows = windows;
        }
        Ok(())
    }
}
