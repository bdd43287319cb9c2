//! NetWM Module
//!
//! Client message handlers: ICCCM state changes, EWMH requests from clients
//! and pagers, legacy GNOME hints, and the manager's own restart/exit
//! messages on the root window.

use anyhow::Result;
use tracing::debug;

use crate::shell::Shell;
use crate::wm::client::Cancel;
use crate::wm::client_flags::Status;
use crate::wm::decorations::border_sizes;
use crate::wm::ewmh::*;
use crate::wm::hints::Gravity;
use crate::wm::server::*;
use crate::wm::{Shutdown, WindowManager};

/// `_NET_WM_STATE` properties named by one message
#[derive(Debug, Default, Clone, Copy)]
struct StateChange {
    sticky: bool,
    maximize: bool,
    shade: bool,
}

impl StateChange {
    fn collect(properties: [Option<StateProperty>; 2]) -> Self {
        let mut change = Self::default();
        for property in properties.into_iter().flatten() {
            match property {
                StateProperty::Sticky => change.sticky = true,
                StateProperty::MaximizedVert | StateProperty::MaximizedHorz => change.maximize = true,
                StateProperty::Shaded => change.shade = true,
            }
        }
        change
    }
}

impl<S: WindowServer, H: Shell> WindowManager<S, H> {
    pub(crate) fn handle_client_message(&mut self, message: &ClientMessage) -> Result<()> {
        let decoded = self.atoms.decode(message);
        if decoded == ProtocolMessage::SystemTrayOpcode {
            self.shell.dock_message(message);
            return Ok(());
        }

        if let Some(window) = self.clients.find(message.window) {
            if decoded.is_root_message() {
                debug!("Ignoring root message {:?} sent to 0x{:x}", decoded, window);
                return Ok(());
            }
            self.handle_client_request(window, decoded)
        } else if message.window == self.root {
            self.handle_root_request(decoded)
        } else {
            debug!("Ignoring {:?} for unmanaged window 0x{:x}", decoded, message.window);
            Ok(())
        }
    }

    fn handle_client_request(&mut self, window: Window, message: ProtocolMessage) -> Result<()> {
        match message {
            ProtocolMessage::WinState { mask, flags } => {
                if mask & WIN_STATE_STICKY != 0 {
                    self.set_sticky(window, flags & WIN_STATE_STICKY != 0)?;
                }
                if mask & WIN_STATE_HIDDEN != 0 {
                    if let Some(client) = self.clients.get_mut(window) {
                        client.status.set(Status::NOLIST, flags & WIN_STATE_HIDDEN != 0);
                    }
                    self.write_state(window)?;
                    self.shell.update_taskbar();
                    self.shell.update_pager();
                }
            }
            ProtocolMessage::WinLayer(layer) => self.set_layer(window, layer)?,
            ProtocolMessage::ChangeState(state) => {
                if let Some(client) = self.clients.get_mut(window) {
                    client.cancel_controller(Cancel::Finish);
                }
                match state {
                    WM_STATE_WITHDRAWN => self.withdraw_client(window)?,
                    WM_STATE_ICONIC => self.minimize_client(window)?,
                    WM_STATE_NORMAL => self.restore_client(window, true)?,
                    other => debug!("WM_CHANGE_STATE to {} ignored for 0x{:x}", other, window),
                }
            }
            ProtocolMessage::ActivateWindow => {
                self.restore_client(window, true)?;
                self.focus_client(window)?;
            }
            ProtocolMessage::SetDesktop(ALL_DESKTOPS) => self.set_sticky(window, true)?,
            ProtocolMessage::SetDesktop(desktop) => {
                if let Some(client) = self.clients.get_mut(window) {
                    client.cancel_controller(Cancel::Finish);
                }
                self.set_desktop(window, desktop)?;
            }
            ProtocolMessage::CloseWindow => self.delete_client(window)?,
            ProtocolMessage::MoveResize(request) => self.handle_net_moveresize(window, request)?,
            ProtocolMessage::WmState { action, raw_action, first, second } => match action {
                Some(action) => self.handle_net_wm_state(window, action, StateChange::collect([first, second]))?,
                None => debug!("Bad _NET_WM_STATE action: {}", raw_action),
            },
            ProtocolMessage::Unrecognized(atom) => {
                debug!("Unknown ClientMessage to client: {}", self.describe_atom(atom));
            }
            ProtocolMessage::SystemTrayOpcode
            | ProtocolMessage::Restart
            | ProtocolMessage::Exit
            | ProtocolMessage::CurrentDesktop(_) => {}
        }
        Ok(())
    }

    fn handle_root_request(&mut self, message: ProtocolMessage) -> Result<()> {
        match message {
            ProtocolMessage::Restart => self.request_shutdown(Shutdown::Restart),
            ProtocolMessage::Exit => self.request_shutdown(Shutdown::Exit),
            ProtocolMessage::CurrentDesktop(desktop) => self.change_desktop(desktop)?,
            ProtocolMessage::Unrecognized(atom) => {
                debug!("Unknown ClientMessage to root: {}", self.describe_atom(atom));
            }
            other => debug!("Ignoring {:?} on the root window", other),
        }
        Ok(())
    }

    /// Name of `atom` for logging. A bad atom from a client is not an error.
    fn describe_atom(&mut self, atom: Atom) -> String {
        self.server.atom_name(atom).unwrap_or_else(|e| {
            debug!("Could not name atom {}: {:#}", atom, e);
            format!("#{atom}")
        })
    }

    /// `_NET_MOVERESIZE_WINDOW`: the requested position is the frame's
    /// reference point under the given gravity. Size hints are not applied.
    fn handle_net_moveresize(&mut self, window: Window, request: MoveResizeRequest) -> Result<()> {
        let Some(client) = self.clients.get_mut(window) else {
            return Ok(());
        };
        client.cancel_controller(Cancel::Finish);
        debug!("_NET_MOVERESIZE_WINDOW for 0x{:x}: {:?}", window, request);

        let gravity = if request.gravity == 0 {
            client.hints.gravity
        } else {
            Gravity::from_raw(request.gravity)
        };
        let (dx, dy) = gravity.delta(&border_sizes(client.border, &self.settings));

        let mut geometry = client.geometry;
        if let Some(width) = request.width {
            geometry.width = width.max(1);
        }
        if let Some(height) = request.height {
            geometry.height = height.max(1);
        }
        if let Some(x) = request.x {
            geometry.x = x - dx;
        }
        if let Some(y) = request.y {
            geometry.y = y - dy;
        }

        self.set_client_geometry(window, geometry)?;
        self.write_state(window)?;
        self.server.send_configure_notify(window, geometry)
    }

    fn handle_net_wm_state(&mut self, window: Window, action: StateAction, change: StateChange) -> Result<()> {
        let Some(client) = self.clients.get(window) else {
            return Ok(());
        };
        let maximized = client.status.contains(Status::MAXIMIZED);
        let sticky = client.desktop.is_sticky();
        let shaded = client.status.contains(Status::SHADED);

        match action {
            StateAction::Remove => {
                if change.sticky {
                    self.set_sticky(window, false)?;
                }
                if change.maximize && maximized {
                    self.maximize_client(window)?;
                }
                if change.shade {
                    self.unshade_client(window)?;
                }
            }
            StateAction::Add => {
                if change.sticky {
                    self.set_sticky(window, true)?;
                }
                if change.maximize && !maximized {
                    self.maximize_client(window)?;
                }
                if change.shade {
                    self.shade_client(window)?;
                }
            }
            StateAction::Toggle => {
                if change.sticky {
                    self.set_sticky(window, !sticky)?;
                }
                if change.maximize {
                    self.maximize_client(window)?;
                }
                if change.shade {
                    if shaded {
                        self.unshade_client(window)?;
                    } else {
                        self.shade_client(window)?;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::Geometry;
    use crate::wm::client_flags::DesktopAssignment;
    use crate::wm::testing::*;

    fn setup() -> (TestWm, Window) {
        let mut wm = harness();
        let window = manage(&mut wm, 10, Geometry::new(100, 100, 400, 300));
        (wm, window)
    }

    fn send(wm: &mut TestWm, window: Window, message_type: Atom, data: [u32; 5]) {
        let message = ClientMessage { window, message_type, format: 32, data };
        wm.handle_client_message(&message).unwrap();
    }

    fn status(wm: &TestWm, window: Window) -> Status {
        wm.clients.get(window).unwrap().status
    }

    #[test]
    fn change_state_minimizes_restores_and_withdraws() {
        let (mut wm, window) = setup();
        let change = wm.atoms.wm_change_state;

        send(&mut wm, window, change, [WM_STATE_ICONIC, 0, 0, 0, 0]);
        assert!(status(&wm, window).contains(Status::MINIMIZED));
        send(&mut wm, window, change, [WM_STATE_NORMAL, 0, 0, 0, 0]);
        assert!(status(&wm, window).contains(Status::MAPPED));
        send(&mut wm, window, change, [WM_STATE_WITHDRAWN, 0, 0, 0, 0]);
        assert!(status(&wm, window).contains(Status::WITHDRAWN));
    }

    #[test]
    fn desktop_requests() {
        let (mut wm, window) = setup();
        let desktop = wm.atoms.net_wm_desktop;

        send(&mut wm, window, desktop, [9, 0, 0, 0, 0]);
        assert_eq!(wm.clients.get(window).unwrap().desktop, DesktopAssignment::On(0));
        send(&mut wm, window, desktop, [ALL_DESKTOPS, 0, 0, 0, 0]);
        assert!(wm.clients.get(window).unwrap().desktop.is_sticky());
        send(&mut wm, window, desktop, [2, 0, 0, 0, 0]);
        assert_eq!(wm.clients.get(window).unwrap().desktop, DesktopAssignment::On(2));
    }

    #[test]
    fn activate_restores_and_focuses() {
        let (mut wm, window) = setup();
        wm.minimize_client(window).unwrap();
        let active = wm.atoms.net_active_window;

        send(&mut wm, window, active, [2, 0, 0, 0, 0]);
        assert!(status(&wm, window).contains(Status::MAPPED));
        assert_eq!(wm.active, Some(window));
    }

    #[test]
    fn close_request_from_frame_window() {
        let (mut wm, window) = setup();
        let frame = frame_of(&wm, window);
        let close = wm.atoms.net_close_window;
        send(&mut wm, frame, close, [0; 5]);
        assert!(wm.server.requests.contains(&Request::Kill(window)));
    }

    #[test]
    fn moveresize_places_frame_at_requested_point() {
        let (mut wm, window) = setup();
        let moveresize = wm.atoms.net_moveresize_window;

        send(&mut wm, window, moveresize, [(0b11 << 8), 200, 150, 0, 0]);
        let geometry = wm.clients.get(window).unwrap().geometry;
        assert_eq!(geometry, Geometry::new(204, 174, 400, 300));
        assert!(wm.server.requests.contains(&Request::ConfigureNotify(window, geometry)));

        // static gravity: position is the content's own
        send(&mut wm, window, moveresize, [(0b1111 << 8) | 10, 10, 20, 640, 480]);
        assert_eq!(wm.clients.get(window).unwrap().geometry, Geometry::new(10, 20, 640, 480));
    }

    #[test]
    fn moveresize_size_only_keeps_position() {
        let (mut wm, window) = setup();
        let moveresize = wm.atoms.net_moveresize_window;
        send(&mut wm, window, moveresize, [(1 << 10) | 1, 0, 0, 250, 0]);
        assert_eq!(wm.clients.get(window).unwrap().geometry, Geometry::new(100, 100, 250, 300));
    }

    #[test]
    fn wm_state_add_and_remove_are_idempotent() {
        let (mut wm, window) = setup();
        let (state, vert, horz) = (
            wm.atoms.net_wm_state,
            wm.atoms.net_wm_state_maximized_vert,
            wm.atoms.net_wm_state_maximized_horz,
        );

        send(&mut wm, window, state, [0, vert, horz, 0, 0]);
        assert!(!status(&wm, window).contains(Status::MAXIMIZED));

        send(&mut wm, window, state, [1, vert, horz, 0, 0]);
        assert!(status(&wm, window).contains(Status::MAXIMIZED));
        send(&mut wm, window, state, [1, vert, 0, 0, 0]);
        assert!(status(&wm, window).contains(Status::MAXIMIZED));
        assert_eq!(wm.clients.get(window).unwrap().restore_geometry, Some(Geometry::new(100, 100, 400, 300)));

        send(&mut wm, window, state, [2, horz, 0, 0, 0]);
        assert!(!status(&wm, window).contains(Status::MAXIMIZED));
    }

    #[test]
    fn wm_state_toggles_sticky_and_shade() {
        let (mut wm, window) = setup();
        let (state, sticky, shaded) = (
            wm.atoms.net_wm_state,
            wm.atoms.net_wm_state_sticky,
            wm.atoms.net_wm_state_shaded,
        );

        send(&mut wm, window, state, [2, sticky, shaded, 0, 0]);
        assert!(wm.clients.get(window).unwrap().desktop.is_sticky());
        assert!(status(&wm, window).contains(Status::SHADED));

        send(&mut wm, window, state, [2, sticky, shaded, 0, 0]);
        assert!(!wm.clients.get(window).unwrap().desktop.is_sticky());
        assert!(!status(&wm, window).contains(Status::SHADED));

        send(&mut wm, window, state, [7, sticky, 0, 0, 0]);
        assert!(!wm.clients.get(window).unwrap().desktop.is_sticky());
    }

    #[test]
    fn legacy_hidden_bit_hides_from_task_list() {
        let (mut wm, window) = setup();
        let win_state = wm.atoms.win_state;
        send(&mut wm, window, win_state, [WIN_STATE_HIDDEN, WIN_STATE_HIDDEN, 0, 0, 0]);
        assert!(status(&wm, window).contains(Status::NOLIST));
        assert_eq!(wm.shell.count(&ShellCall::UpdateTaskbar), 1);

        send(&mut wm, window, win_state, [WIN_STATE_HIDDEN, 0, 0, 0, 0]);
        assert!(!status(&wm, window).contains(Status::NOLIST));
    }

    #[test]
    fn legacy_layer() {
        let (mut wm, window) = setup();
        let layer = wm.atoms.win_layer;
        send(&mut wm, window, layer, [6, 0, 0, 0, 0]);
        assert_eq!(wm.clients.get(window).unwrap().layer, 6);
    }

    #[test]
    fn tray_opcode_always_goes_to_the_dock() {
        let (mut wm, window) = setup();
        let opcode = wm.atoms.net_system_tray_opcode;
        send(&mut wm, window, opcode, [0; 5]);
        send(&mut wm, 500, opcode, [0; 5]);
        assert_eq!(wm.shell.calls, vec![ShellCall::DockMessage(window), ShellCall::DockMessage(500)]);
    }

    #[test]
    fn root_messages() {
        let (mut wm, window) = setup();
        let root = wm.root;
        let (exit, restart, current) = (wm.atoms.stile_exit, wm.atoms.stile_restart, wm.atoms.net_current_desktop);

        send(&mut wm, window, exit, [0; 5]);
        assert_eq!(wm.shutdown, None);

        send(&mut wm, root, current, [2, 0, 0, 0, 0]);
        assert_eq!(wm.desktops.current, 2);
        send(&mut wm, root, restart, [0; 5]);
        assert_eq!(wm.shutdown, Some(Shutdown::Restart));
        send(&mut wm, root, exit, [0; 5]);
        assert_eq!(wm.shutdown, Some(Shutdown::Exit));
    }

    #[test]
    fn unknown_messages_change_nothing() {
        let (mut wm, window) = setup();
        let bogus = wm.server.intern_atom("_BOGUS").unwrap();
        send(&mut wm, window, bogus, [1, 2, 3, 4, 5]);
        send(&mut wm, 500, bogus, [1, 2, 3, 4, 5]);
        assert!(wm.server.requests.is_empty());
        assert!(wm.shell.calls.is_empty());
    }

    #[test]
    fn message_with_invalid_atom_is_ignored() {
        let (mut wm, window) = setup();
        let root = wm.root;
        send(&mut wm, window, 0xDEAD_BEEF, [0; 5]);
        send(&mut wm, root, 0xDEAD_BEEF, [0; 5]);

        wm.server.push(message(window, 0xDEAD_BEEF, [0; 5]));
        wm.server.push(motion(window, 0, 0, 1, 1));
        let returned = wm.wait_for_event().unwrap();
        assert!(matches!(returned, Some(ServerEvent::MotionNotify(_))));
        assert!(wm.server.requests.is_empty());
    }

    #[test]
    fn moveresize_all_fields_with_client_gravity() {
        let (mut wm, window) = setup();
        let moveresize = wm.atoms.net_moveresize_window;

        send(&mut wm, window, moveresize, [0b1111 << 8, 300, 200, 500, 350]);
        let geometry = wm.clients.get(window).unwrap().geometry;
        assert_eq!(geometry, Geometry::new(304, 224, 500, 350));
        assert!(wm.server.requests.contains(&Request::ConfigureNotify(window, geometry)));
    }

    #[test]
    fn moveresize_during_drag_wins() {
        let (mut wm, window) = setup();
        let frame = frame_of(&wm, window);
        let moveresize = wm.atoms.net_moveresize_window;

        wm.server.push(message(window, moveresize, [(0b11 << 8) | 10, 500, 500, 0, 0]));
        wm.server.push(motion(frame, 0, 0, 20, 30));
        wm.server.push(release(frame, 1, 0, 0, 5));
        wm.move_client(window, 50, 10).unwrap();

        let client = wm.clients.get(window).unwrap();
        assert_eq!((client.geometry.x, client.geometry.y), (500, 500));
        assert!(client.controller.is_none());
    }

    #[test]
    fn maximize_during_drag_stays_on_work_area() {
        let (mut wm, window) = setup();
        let frame = frame_of(&wm, window);
        let (state, vert) = (wm.atoms.net_wm_state, wm.atoms.net_wm_state_maximized_vert);

        wm.server.push(message(window, state, [1, vert, 0, 0, 0]));
        wm.server.push(motion(frame, 0, 0, 300, 400));
        wm.server.push(release(frame, 1, 0, 0, 5));
        wm.move_client(window, 50, 10).unwrap();

        let client = wm.clients.get(window).unwrap();
        assert!(client.status.contains(Status::MAXIMIZED));
        assert_eq!(client.geometry, Geometry::new(4, 24, 1016, 740));
    }
}
