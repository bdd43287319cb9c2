//! Client lifecycle events: configure requests, map/unmap/destroy, property
//! and colormap changes, exposure and shape updates.

use anyhow::Result;
use tracing::{debug, trace};

use crate::shared::Geometry;
use crate::shell::Shell;
use crate::wm::client::Cancel;
use crate::wm::client_flags::{DesktopAssignment, Status};
use crate::wm::decorations::border_sizes;
use crate::wm::ewmh::WatchedProperty;
use crate::wm::server::*;
use crate::wm::settings::FocusModel;
use crate::wm::WindowManager;

impl<S: WindowServer, H: Shell> WindowManager<S, H> {
    pub(crate) fn handle_configure_request(&mut self, request: &ConfigureRequest) -> Result<()> {
        let Some(window) = self.clients.find_by_window(request.window) else {
            return self.configure_unmanaged(request);
        };
        let Some(client) = self.clients.get_mut(window) else {
            return Ok(());
        };
        client.cancel_controller(Cancel::Finish);

        let mask = request.value_mask;
        let mut geometry = client.geometry;
        let mut changed = false;
        if mask.contains(ConfigMask::WIDTH) && request.width != geometry.width {
            geometry.width = request.width;
            changed = true;
        }
        if mask.contains(ConfigMask::HEIGHT) && request.height != geometry.height {
            geometry.height = request.height;
            changed = true;
        }
        if mask.contains(ConfigMask::X) && request.x != geometry.x {
            geometry.x = request.x;
            changed = true;
        }
        if mask.contains(ConfigMask::Y) && request.y != geometry.y {
            geometry.y = request.y;
            changed = true;
        }
        if !changed {
            trace!("configure request for 0x{:x} changes nothing", window);
            return Ok(());
        }

        let (width, height) = client.hints.constrain(geometry.width, geometry.height, self.settings.screen);
        geometry.width = width;
        geometry.height = height;
        self.set_client_geometry(window, geometry)
    }

    /// Grant a request from a window we do not manage, but never larger than
    /// the screen
    fn configure_unmanaged(&mut self, request: &ConfigureRequest) -> Result<()> {
        let mask = request.value_mask;
        let screen = self.settings.screen;
        let changes = WindowChanges {
            x: mask.contains(ConfigMask::X).then_some(request.x),
            y: mask.contains(ConfigMask::Y).then_some(request.y),
            width: mask.contains(ConfigMask::WIDTH).then_some(request.width.min(screen.width)),
            height: mask.contains(ConfigMask::HEIGHT).then_some(request.height.min(screen.height)),
            border_width: mask.contains(ConfigMask::BORDER_WIDTH).then_some(request.border_width),
            sibling: mask.contains(ConfigMask::SIBLING).then_some(request.sibling),
            stack_mode: mask.contains(ConfigMask::STACK_MODE).then_some(request.stack_mode),
        };
        self.server.configure(request.window, &changes)
    }

    pub(crate) fn handle_map_request(&mut self, window: Window) -> Result<()> {
        if self.shell.check_swallow_map(window) {
            debug!("0x{:x} swallowed", window);
            return Ok(());
        }

        match self.clients.find_by_window(window) {
            None => {
                self.server.sync()?;
                self.server.grab_server()?;
                match self.add_client(window, false)? {
                    Some(added) => {
                        if self.settings.focus_model == FocusModel::Click {
                            self.focus_client(added)?;
                        }
                    }
                    None => self.server.map(window)?,
                }
                self.server.sync()?;
                self.server.ungrab_server()?;
            }
            Some(window) => {
                let current = self.desktops.current;
                let Some(client) = self.clients.get_mut(window) else {
                    return Ok(());
                };
                if !client.is_mapped() {
                    client.set_mapped();
                    client.status.remove(Status::HIDDEN | Status::WITHDRAWN);
                    if !client.desktop.shows_on(current) {
                        client.desktop = DesktopAssignment::On(current);
                    }
                    let frame = client.parent;
                    self.server.map(window)?;
                    self.server.map(frame)?;
                    self.raise_client(window)?;
                    if self.settings.focus_model == FocusModel::Click {
                        self.focus_client(window)?;
                    }
                    self.write_state(window)?;
                    self.shell.update_taskbar();
                    self.shell.update_pager();
                }
            }
        }
        self.restack()
    }

    pub(crate) fn handle_unmap_notify(&mut self, window: Window) -> Result<()> {
        match self.clients.find(window) {
            Some(content) if content == window => {
                let destroyed = self.server.take_queued(
                    &|e| matches!(e, ServerEvent::DestroyNotify { window: w } if *w == window),
                )?;
                if !destroyed.is_empty() {
                    self.handle_destroy_notify(window)?;
                    return Ok(());
                }

                let Some(client) = self.clients.get_mut(window) else {
                    return Ok(());
                };
                if client.ignore_unmap > 0 {
                    client.ignore_unmap -= 1;
                    return Ok(());
                }
                client.cancel_controller(Cancel::Destroyed);
                if client.is_mapped() {
                    client.status.remove(Status::MAPPED);
                    let frame = client.parent;
                    self.server.unmap(frame)?;
                    if self.active == Some(window) {
                        self.active = None;
                    }
                    self.write_state(window)?;
                    self.shell.update_taskbar();
                    self.shell.update_pager();
                }
            }
            Some(_) => {}
            None => {
                self.shell.dock_destroy(window);
            }
        }
        Ok(())
    }

    pub(crate) fn handle_destroy_notify(&mut self, window: Window) -> Result<bool> {
        match self.clients.find(window) {
            Some(content) if content == window => {
                if let Some(client) = self.clients.get_mut(window) {
                    client.cancel_controller(Cancel::Destroyed);
                }
                self.remove_client(window)?;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Ok(self.shell.dock_destroy(window)),
        }
    }

    pub(crate) fn handle_property_notify(&mut self, window: Window, atom: Atom) -> Result<bool> {
        let Some(window) = self.clients.find(window) else {
            return Ok(true);
        };

        let changed = match self.atoms.classify_property(atom) {
            WatchedProperty::Name => {
                self.read_name(window)?;
                true
            }
            WatchedProperty::NormalHints => {
                self.read_size_hints(window)?;
                true
            }
            WatchedProperty::ColormapWindows => {
                self.read_colormap_windows(window)?;
                self.update_client_colormap(window)?;
                false
            }
            WatchedProperty::Icon => {
                self.shell.load_icon(window);
                true
            }
            WatchedProperty::Strut => {
                self.read_strut(window)?;
                false
            }
            WatchedProperty::Other => false,
        };

        let Some(client) = self.clients.get(window) else {
            return Ok(true);
        };
        if changed {
            self.shell.draw_border(client, None);
            self.shell.update_taskbar();
            self.shell.update_pager();
        }
        Ok(!client.status.contains(Status::WMDIALOG))
    }

    pub(crate) fn handle_colormap_change(&mut self, window: Window, colormap: Colormap, new: bool) -> Result<()> {
        if !new {
            return Ok(());
        }
        if let Some(window) = self.clients.find(window) {
            if let Some(client) = self.clients.get_mut(window) {
                client.colormap = colormap;
            }
            self.update_client_colormap(window)?;
        }
        Ok(())
    }

    /// Redraw exposed frames. Exposure of a dialog's content is left for
    /// the dialog subsystem.
    pub(crate) fn handle_expose(&mut self, window: Window, area: Geometry, count: u16) -> bool {
        let Some(content) = self.clients.find(window) else {
            return count != 0;
        };
        let Some(client) = self.clients.get(content) else {
            return true;
        };
        if window == client.parent {
            self.shell.draw_border(client, Some(area));
            true
        } else {
            !client.status.contains(Status::WMDIALOG)
        }
    }

    pub(crate) fn handle_shape_notify(&mut self, window: Window) -> Result<()> {
        let Some(client) = self.clients.find(window).and_then(|w| self.clients.get(w)) else {
            return Ok(());
        };
        let borders = border_sizes(client.border, &self.settings);
        self.server.apply_shape(client.parent, client.window, (borders.west, borders.north))
    }
}
