//! Focus Module
//!
//! Input focus, the active client and colormap installation.

use anyhow::Result;
use tracing::debug;

use crate::shell::Shell;
use crate::wm::client::Client;
use crate::wm::client_flags::Status;
use crate::wm::ewmh::XA_WINDOW;
use crate::wm::server::{Window, WindowServer};
use crate::wm::WindowManager;

impl<S: WindowServer, H: Shell> WindowManager<S, H> {
    /// Whether `client` can take focus right now
    fn focusable(&self, client: &Client) -> bool {
        client.is_mapped()
            && !client.status.intersects(Status::HIDDEN | Status::NOLIST)
            && client.desktop.shows_on(self.desktops.current)
    }

    /// Give the input focus to a mapped client on the current desktop
    pub fn focus_client(&mut self, window: Window) -> Result<()> {
        match self.clients.get(window) {
            Some(client) if client.is_mapped() && !client.status.contains(Status::HIDDEN) => {}
            _ => return Ok(()),
        }

        if let Some(previous) = self.active.filter(|w| *w != window) {
            if let Some(client) = self.clients.get_mut(previous) {
                client.status.remove(Status::ACTIVE);
                self.shell.draw_border(client, None);
            }
        }
        if let Some(client) = self.clients.get_mut(window) {
            client.status.insert(Status::ACTIVE);
        }
        self.active = Some(window);
        debug!("Focusing window 0x{:x}", window);

        self.server.set_input_focus(window, 0)?;
        self.update_client_colormap(window)?;
        self.server
            .set_property32(self.root, self.atoms.net_active_window, XA_WINDOW, &[window])?;
        if let Some(client) = self.clients.get(window) {
            self.shell.draw_border(client, None);
        }
        self.shell.update_taskbar();
        Ok(())
    }

    /// Install the colormaps of the active client: its colormap windows
    /// first, lowest priority last, then its own
    pub fn update_client_colormap(&mut self, window: Window) -> Result<()> {
        if self.active != Some(window) {
            return Ok(());
        }
        let Some(client) = self.clients.get(window) else {
            return Ok(());
        };
        let (own, listed) = (client.colormap, client.colormap_windows.clone());

        for sub in listed.iter().rev() {
            if *sub == window {
                continue;
            }
            if let Some(attributes) = self.server.attributes(*sub)? {
                if attributes.colormap != 0 {
                    self.server.install_colormap(attributes.colormap)?;
                }
            }
        }
        if own != 0 {
            self.server.install_colormap(own)?;
        }
        Ok(())
    }

    /// Focus and raise the least recently raised focusable client
    pub fn focus_next(&mut self) -> Result<()> {
        let next = self
            .clients
            .stacking()
            .iter()
            .rev()
            .copied()
            .find(|w| Some(*w) != self.active && self.clients.get(*w).is_some_and(|c| self.focusable(c)));
        if let Some(window) = next {
            self.raise_client(window)?;
            self.focus_client(window)?;
        }
        Ok(())
    }

    /// Focus the client just below the active one, wrapping to the top
    pub fn focus_next_stacked(&mut self) -> Result<()> {
        let order = self.stacking_order();
        let start = self
            .active
            .and_then(|active| order.iter().position(|w| *w == active))
            .map_or(0, |i| i + 1);
        let next = order
            .iter()
            .cycle()
            .skip(start)
            .take(order.len())
            .copied()
            .find(|w| self.clients.get(*w).is_some_and(|c| self.focusable(c)));
        if let Some(window) = next {
            self.focus_client(window)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::Geometry;
    use crate::wm::testing::*;

    #[test]
    fn focus_moves_active_flag() {
        let mut wm = harness();
        let first = manage(&mut wm, 10, Geometry::new(0, 0, 100, 100));
        let second = manage(&mut wm, 11, Geometry::new(0, 0, 100, 100));

        wm.focus_client(first).unwrap();
        wm.focus_client(second).unwrap();
        assert_eq!(wm.active, Some(second));
        assert!(!wm.clients.get(first).unwrap().status.contains(Status::ACTIVE));
        assert!(wm.clients.get(second).unwrap().status.contains(Status::ACTIVE));
        assert!(wm.server.requests.contains(&Request::Focus(second)));
        assert_eq!(wm.server.properties[&(wm.root, wm.atoms.net_active_window)], vec![second]);
        assert_eq!(wm.shell.count(&ShellCall::DrawBorder(first)), 2);
    }

    #[test]
    fn minimized_client_cannot_take_focus() {
        let mut wm = harness();
        let window = manage(&mut wm, 10, Geometry::new(0, 0, 100, 100));
        wm.minimize_client(window).unwrap();
        wm.focus_client(window).unwrap();
        assert_eq!(wm.active, None);
    }

    #[test]
    fn colormaps_installed_for_active_client() {
        let mut wm = harness();
        let window = manage(&mut wm, 10, Geometry::new(0, 0, 100, 100));
        wm.server.add_window(30, Geometry::new(0, 0, 10, 10));
        wm.server.windows.get_mut(&30).unwrap().colormap = 0x77;
        let client = wm.clients.get_mut(window).unwrap();
        client.colormap = 0x55;
        client.colormap_windows = vec![30];

        wm.update_client_colormap(window).unwrap();
        assert!(wm.server.requests.is_empty());

        wm.focus_client(window).unwrap();
        let installed: Vec<_> = wm
            .server
            .requests
            .iter()
            .filter(|r| matches!(r, Request::InstallColormap(_)))
            .cloned()
            .collect();
        assert_eq!(installed, vec![Request::InstallColormap(0x77), Request::InstallColormap(0x55)]);
    }

    #[test]
    fn focus_next_cycles_through_everyone() {
        let mut wm = harness();
        let a = manage(&mut wm, 10, Geometry::new(0, 0, 100, 100));
        let b = manage(&mut wm, 11, Geometry::new(0, 0, 100, 100));
        let c = manage(&mut wm, 12, Geometry::new(0, 0, 100, 100));
        wm.focus_client(c).unwrap();

        let mut seen = Vec::new();
        for _ in 0..3 {
            wm.focus_next().unwrap();
            seen.push(wm.active.unwrap());
        }
        assert_eq!(seen, vec![a, b, c]);
    }

    #[test]
    fn focus_next_stacked_walks_down_and_wraps() {
        let mut wm = harness();
        let a = manage(&mut wm, 10, Geometry::new(0, 0, 100, 100));
        let b = manage(&mut wm, 11, Geometry::new(0, 0, 100, 100));
        wm.focus_client(b).unwrap();

        wm.focus_next_stacked().unwrap();
        assert_eq!(wm.active, Some(a));
        wm.focus_next_stacked().unwrap();
        assert_eq!(wm.active, Some(b));
        assert_eq!(wm.stacking_order(), vec![b, a]);
    }
}
