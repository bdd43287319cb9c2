//! Window actions on managed clients: geometry, minimize/restore, maximize,
//! shade, desktop membership, withdraw and close.

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::shared::Geometry;
use crate::shell::Shell;
use crate::wm::client::Cancel;
use crate::wm::client_flags::{BorderFlags, DesktopAssignment, Status, LAYER_TOP};
use crate::wm::decorations::{border_sizes, frame_geometry};
use crate::wm::hints::Strut;
use crate::wm::server::*;
use crate::wm::WindowManager;

impl<S: WindowServer, H: Shell> WindowManager<S, H> {
    /// Give a client new content geometry and move its frame along
    pub fn set_client_geometry(&mut self, window: Window, geometry: Geometry) -> Result<()> {
        let Some(client) = self.clients.get_mut(window) else {
            return Ok(());
        };
        client.geometry = geometry;
        let frame = frame_geometry(client, &self.settings);
        let inset = border_sizes(client.border, &self.settings).inset(geometry.width, geometry.height);
        let parent = client.parent;
        self.server.move_resize(parent, frame)?;
        self.server.move_resize(window, inset)
    }

    /// Whether the content window is currently mapped on the server
    fn content_visible(&self, window: Window) -> bool {
        self.clients
            .get(window)
            .is_some_and(|c| c.is_mapped() && !c.status.contains(Status::SHADED))
    }

    pub fn minimize_client(&mut self, window: Window) -> Result<()> {
        let visible = self.content_visible(window);
        let Some(client) = self.clients.get_mut(window) else {
            return Ok(());
        };
        if client.is_minimized() {
            return Ok(());
        }
        info!("Minimizing window 0x{:x}", window);
        client.cancel_controller(Cancel::Finish);
        client.set_minimized();
        let frame = client.parent;
        if visible {
            client.ignore_unmap += 1;
            self.server.unmap(window)?;
        }
        self.server.unmap(frame)?;
        if self.active == Some(window) {
            self.active = None;
        }
        self.write_state(window)?;
        self.shell.update_taskbar();
        self.shell.update_pager();
        Ok(())
    }

    /// Show a minimized or unmapped client on the current desktop
    pub fn restore_client(&mut self, window: Window, raise: bool) -> Result<()> {
        let current = self.desktops.current;
        let Some(client) = self.clients.get_mut(window) else {
            return Ok(());
        };
        if !client.is_mapped() {
            info!("Restoring window 0x{:x}", window);
            client.set_mapped();
            client.status.remove(Status::HIDDEN | Status::WITHDRAWN);
            if !client.desktop.shows_on(current) {
                client.desktop = DesktopAssignment::On(current);
            }
            let frame = client.parent;
            if !client.status.contains(Status::SHADED) {
                self.server.map(window)?;
            }
            self.server.map(frame)?;
            self.write_state(window)?;
        }
        if raise {
            self.raise_client(window)?;
        }
        self.shell.update_taskbar();
        self.shell.update_pager();
        Ok(())
    }

    /// Toggle between the work area and the saved geometry
    pub fn maximize_client(&mut self, window: Window) -> Result<()> {
        if self.clients.get(window).is_some_and(|c| c.status.contains(Status::SHADED)) {
            self.unshade_client(window)?;
        }
        let area = Strut::work_area(self.settings.screen, self.clients.iter().filter_map(|c| c.strut.as_ref()));
        let Some(client) = self.clients.get_mut(window) else {
            return Ok(());
        };
        client.cancel_controller(Cancel::Finish);

        let geometry = if client.status.contains(Status::MAXIMIZED) {
            debug!("Unmaximizing window 0x{:x}", window);
            client.status.remove(Status::MAXIMIZED);
            client.restore_geometry.take().unwrap_or(client.geometry)
        } else {
            info!("Maximizing window 0x{:x}", window);
            client.status.insert(Status::MAXIMIZED);
            client.restore_geometry = Some(client.geometry);
            let borders = border_sizes(client.border, &self.settings);
            let width = (area.width as i32 - borders.west - borders.east).max(1) as u32;
            let height = (area.height as i32 - borders.north - borders.south).max(1) as u32;
            let (width, height) = client.hints.constrain(width, height, self.settings.screen);
            Geometry::new(area.x + borders.west, area.y + borders.north, width, height)
        };

        self.set_client_geometry(window, geometry)?;
        self.server.send_configure_notify(window, geometry)?;
        self.write_state(window)?;
        if let Some(client) = self.clients.get(window) {
            self.shell.draw_border(client, None);
        }
        Ok(())
    }

    /// Roll the client up into its title bar
    pub fn shade_client(&mut self, window: Window) -> Result<()> {
        let visible = self.content_visible(window);
        let Some(client) = self.clients.get_mut(window) else {
            return Ok(());
        };
        if client.status.contains(Status::SHADED)
            || !client.border.contains(BorderFlags::SHADE | BorderFlags::TITLE)
        {
            return Ok(());
        }
        debug!("Shading window 0x{:x}", window);
        client.cancel_controller(Cancel::Finish);
        client.status.insert(Status::SHADED);
        if visible {
            client.ignore_unmap += 1;
            self.server.unmap(window)?;
        }
        let frame = frame_geometry(client, &self.settings);
        let parent = client.parent;
        self.server.move_resize(parent, frame)?;
        self.write_state(window)?;
        if let Some(client) = self.clients.get(window) {
            self.shell.draw_border(client, None);
        }
        Ok(())
    }

    pub fn unshade_client(&mut self, window: Window) -> Result<()> {
        let Some(client) = self.clients.get_mut(window) else {
            return Ok(());
        };
        if !client.status.contains(Status::SHADED) {
            return Ok(());
        }
        debug!("Unshading window 0x{:x}", window);
        client.cancel_controller(Cancel::Finish);
        client.status.remove(Status::SHADED);
        let mapped = client.is_mapped();
        let frame = frame_geometry(client, &self.settings);
        let parent = client.parent;
        if mapped {
            self.server.map(window)?;
        }
        self.server.move_resize(parent, frame)?;
        self.write_state(window)?;
        if let Some(client) = self.clients.get(window) {
            self.shell.draw_border(client, None);
        }
        Ok(())
    }

    /// Show the client on every desktop, or pin it to the current one
    pub fn set_sticky(&mut self, window: Window, sticky: bool) -> Result<()> {
        let current = self.desktops.current;
        let Some(client) = self.clients.get_mut(window) else {
            return Ok(());
        };
        if client.desktop.is_sticky() == sticky {
            return Ok(());
        }
        client.cancel_controller(Cancel::Finish);
        client.desktop = if sticky {
            DesktopAssignment::Sticky
        } else {
            DesktopAssignment::On(current)
        };
        self.update_visibility(window)?;
        self.write_state(window)?;
        self.shell.update_taskbar();
        self.shell.update_pager();
        Ok(())
    }

    /// Move the client to `desktop`. Out of range desktops are ignored.
    pub fn set_desktop(&mut self, window: Window, desktop: u32) -> Result<()> {
        if desktop >= self.desktops.count {
            debug!("Desktop {} out of range for 0x{:x}", desktop, window);
            return Ok(());
        }
        let Some(client) = self.clients.get_mut(window) else {
            return Ok(());
        };
        client.cancel_controller(Cancel::Finish);
        client.desktop = DesktopAssignment::On(desktop);
        self.update_visibility(window)?;
        self.write_state(window)?;
        self.shell.update_taskbar();
        self.shell.update_pager();
        Ok(())
    }

    /// Unmap the client and mark it withdrawn
    pub fn withdraw_client(&mut self, window: Window) -> Result<()> {
        let visible = self.content_visible(window);
        let Some(client) = self.clients.get_mut(window) else {
            return Ok(());
        };
        debug!("Withdrawing window 0x{:x}", window);
        client.cancel_controller(Cancel::Finish);
        let frame = client.parent;
        let shown = client.is_mapped() || client.status.contains(Status::SHADED);
        client.set_unmapped();
        client.status.insert(Status::WITHDRAWN);
        if visible {
            client.ignore_unmap += 1;
            self.server.unmap(window)?;
        }
        if shown {
            self.server.unmap(frame)?;
        }
        if self.active == Some(window) {
            self.active = None;
        }
        self.write_state(window)?;
        self.shell.update_taskbar();
        self.shell.update_pager();
        Ok(())
    }

    /// Ask the client to close, or kill it if it does not speak
    /// WM_DELETE_WINDOW
    pub fn delete_client(&mut self, window: Window) -> Result<()> {
        let protocols = self.server.get_property32(window, self.atoms.wm_protocols)?;
        if protocols.contains(&self.atoms.wm_delete_window) {
            info!("Closing window 0x{:x}", window);
            let data = [self.atoms.wm_delete_window, 0, 0, 0, 0];
            self.server.send_client_message(window, self.atoms.wm_protocols, data)
        } else {
            info!("Killing window 0x{:x}", window);
            self.server.kill_client(window)
        }
    }

    pub fn set_layer(&mut self, window: Window, layer: u32) -> Result<()> {
        if layer > LAYER_TOP as u32 {
            warn!("Invalid layer {} for 0x{:x}", layer, window);
            return Ok(());
        }
        let Some(client) = self.clients.get_mut(window) else {
            return Ok(());
        };
        client.cancel_controller(Cancel::Finish);
        client.layer = layer as u8;
        self.restack()?;
        self.write_state(window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::client_flags::LAYER_NORMAL;
    use crate::wm::testing::*;

    fn setup() -> (TestWm, Window, Window) {
        let mut wm = harness();
        let window = manage(&mut wm, 10, Geometry::new(100, 100, 400, 300));
        let frame = frame_of(&wm, window);
        (wm, window, frame)
    }

    #[test]
    fn minimize_and_restore() {
        let (mut wm, window, frame) = setup();
        wm.active = Some(window);

        wm.minimize_client(window).unwrap();
        let client = wm.clients.get(window).unwrap();
        assert!(client.is_minimized() && !client.is_mapped());
        assert_eq!(client.ignore_unmap, 1);
        assert_eq!(wm.active, None);
        let requests = wm.server.take_requests();
        assert!(requests.contains(&Request::Unmap(window)));
        assert!(requests.contains(&Request::Unmap(frame)));

        wm.restore_client(window, true).unwrap();
        assert!(wm.clients.get(window).unwrap().is_mapped());
        let requests = wm.server.take_requests();
        assert!(requests.contains(&Request::Map(window)));
        assert!(requests.contains(&Request::Map(frame)));
    }

    #[test]
    fn own_unmap_does_not_unmanage() {
        let (mut wm, window, frame) = setup();
        wm.shade_client(window).unwrap();
        wm.server.take_requests();

        wm.handle_unmap_notify(window).unwrap();
        assert!(wm.clients.get(window).unwrap().is_mapped());
        assert!(!wm.server.requests.contains(&Request::Unmap(frame)));
        assert_eq!(wm.clients.get(window).unwrap().ignore_unmap, 0);
    }

    #[test]
    fn maximize_fills_work_area_and_toggles_back() {
        let (mut wm, window, frame) = setup();
        let panel = manage(&mut wm, 20, Geometry::new(0, 0, 1024, 30));
        wm.clients.get_mut(panel).unwrap().strut = Some(Strut { top: 30, ..Strut::default() });

        wm.maximize_client(window).unwrap();
        let client = wm.clients.get(window).unwrap();
        assert!(client.status.contains(Status::MAXIMIZED));
        assert_eq!(client.geometry, Geometry::new(4, 54, 1016, 710));
        assert!(wm
            .server
            .requests
            .contains(&Request::Configure(frame, WindowChanges::geometry(Geometry::new(0, 30, 1024, 738)))));

        wm.maximize_client(window).unwrap();
        let client = wm.clients.get(window).unwrap();
        assert!(!client.status.contains(Status::MAXIMIZED));
        assert_eq!(client.geometry, Geometry::new(100, 100, 400, 300));
        assert_eq!(client.restore_geometry, None);
    }

    #[test]
    fn maximize_survives_bogus_strut() {
        let (mut wm, window, _) = setup();
        let panel = manage(&mut wm, 20, Geometry::new(0, 0, 1024, 30));
        wm.clients.get_mut(panel).unwrap().strut = Strut::parse(&[u32::MAX, 1, 0, 0]);

        wm.maximize_client(window).unwrap();
        let client = wm.clients.get(window).unwrap();
        assert!(client.status.contains(Status::MAXIMIZED));
        assert_eq!((client.geometry.width, client.geometry.height), (1, 740));
    }

    #[test]
    fn shade_collapses_frame_to_title() {
        let (mut wm, window, frame) = setup();
        wm.shade_client(window).unwrap();
        assert!(wm.clients.get(window).unwrap().status.contains(Status::SHADED));
        assert_eq!(
            wm.server.take_requests()[..2],
            [
                Request::Unmap(window),
                Request::Configure(frame, WindowChanges::geometry(Geometry::new(96, 76, 408, 28))),
            ]
        );

        wm.unshade_client(window).unwrap();
        let requests = wm.server.take_requests();
        assert!(requests.contains(&Request::Map(window)));
        assert!(requests.contains(&Request::Configure(frame, WindowChanges::geometry(Geometry::new(96, 76, 408, 328)))));
    }

    #[test]
    fn shade_needs_a_title_bar() {
        let (mut wm, window, _) = setup();
        wm.clients.get_mut(window).unwrap().border.remove(BorderFlags::TITLE);
        wm.shade_client(window).unwrap();
        assert!(!wm.clients.get(window).unwrap().status.contains(Status::SHADED));
        assert!(wm.server.requests.is_empty());
    }

    #[test]
    fn desktop_out_of_range_is_ignored() {
        let (mut wm, window, frame) = setup();
        wm.set_desktop(window, 4).unwrap();
        assert_eq!(wm.clients.get(window).unwrap().desktop, DesktopAssignment::On(0));

        wm.set_desktop(window, 2).unwrap();
        let client = wm.clients.get(window).unwrap();
        assert_eq!(client.desktop, DesktopAssignment::On(2));
        assert!(client.status.contains(Status::HIDDEN));
        assert!(wm.server.requests.contains(&Request::Unmap(frame)));
    }

    #[test]
    fn sticky_client_shows_everywhere() {
        let (mut wm, window, _) = setup();
        wm.set_sticky(window, true).unwrap();
        assert!(wm.clients.get(window).unwrap().desktop.is_sticky());
        wm.change_desktop(3).unwrap();
        assert!(!wm.clients.get(window).unwrap().status.contains(Status::HIDDEN));

        wm.set_sticky(window, false).unwrap();
        assert_eq!(wm.clients.get(window).unwrap().desktop, DesktopAssignment::On(3));
    }

    #[test]
    fn delete_prefers_the_protocol() {
        let (mut wm, window, _) = setup();
        let (protocols, delete) = (wm.atoms.wm_protocols, wm.atoms.wm_delete_window);
        wm.server.properties.insert((window, protocols), vec![delete]);

        wm.delete_client(window).unwrap();
        assert_eq!(
            wm.server.requests,
            vec![Request::ClientMessage(window, protocols, [delete, 0, 0, 0, 0])]
        );
    }

    #[test]
    fn withdraw_marks_client() {
        let (mut wm, window, frame) = setup();
        wm.withdraw_client(window).unwrap();
        let client = wm.clients.get(window).unwrap();
        assert!(client.status.contains(Status::WITHDRAWN));
        assert!(!client.is_mapped());
        assert!(wm.server.requests.contains(&Request::Unmap(frame)));
    }

    #[test]
    fn layer_above_top_is_rejected() {
        let (mut wm, window, _) = setup();
        wm.set_layer(window, 13).unwrap();
        assert_eq!(wm.clients.get(window).unwrap().layer, LAYER_NORMAL);
        wm.set_layer(window, 12).unwrap();
        assert_eq!(wm.clients.get(window).unwrap().layer, LAYER_TOP);
    }
}
