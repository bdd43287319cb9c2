//! MoveResize Module
//!
//! Interactive moving and resizing with the pointer or the keyboard. Each
//! operation runs its own event loop on top of `wait_for_event`, so window
//! management events keep being handled while the user drags. The client
//! carries a [`Controller`] for the duration; any handler that needs to
//! change the client first cancels it, and the loop stops at the next event.

use anyhow::Result;
use tracing::debug;

use crate::shared::Geometry;
use crate::shell::Shell;
use crate::wm::client::Controller;
use crate::wm::client_flags::{BorderFlags, Status};
use crate::wm::decorations::{border_sizes, CursorKind};
use crate::wm::hints::SizeHints;
use crate::wm::keyboard::KeyAction;
use crate::wm::server::*;
use crate::wm::WindowManager;

/// Resize direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeDirection {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

impl ResizeDirection {
    fn moves_left(self) -> bool {
        matches!(self, Self::TopLeft | Self::Left | Self::BottomLeft)
    }

    fn moves_right(self) -> bool {
        matches!(self, Self::TopRight | Self::Right | Self::BottomRight)
    }

    fn moves_top(self) -> bool {
        matches!(self, Self::TopLeft | Self::Top | Self::TopRight)
    }

    fn moves_bottom(self) -> bool {
        matches!(self, Self::BottomLeft | Self::Bottom | Self::BottomRight)
    }
}

/// New content geometry after dragging the `direction` edge by `(dx, dy)`.
/// The opposite edges stay where they were.
pub fn resize_geometry(
    start: Geometry,
    direction: ResizeDirection,
    dx: i32,
    dy: i32,
    hints: &SizeHints,
    screen: Geometry,
) -> Geometry {
    let mut width = start.width as i32;
    let mut height = start.height as i32;
    if direction.moves_left() {
        width -= dx;
    } else if direction.moves_right() {
        width += dx;
    }
    if direction.moves_top() {
        height -= dy;
    } else if direction.moves_bottom() {
        height += dy;
    }

    let (width, height) = hints.constrain(width.max(1) as u32, height.max(1) as u32, screen);
    let x = if direction.moves_left() {
        start.right() - width as i32
    } else {
        start.x
    };
    let y = if direction.moves_top() {
        start.bottom() - height as i32
    } else {
        start.y
    };
    Geometry::new(x, y, width, height)
}

impl<S: WindowServer, H: Shell> WindowManager<S, H> {
    /// Attach a fresh controller to `window`, replacing any previous one
    fn begin_interaction(&mut self, window: Window) -> Option<(Controller, Window)> {
        let client = self.clients.get_mut(window)?;
        client.cancel_controller(crate::wm::client::Cancel::Finish);
        let controller = Controller::new();
        client.controller = Some(controller.clone());
        Some((controller, client.parent))
    }

    /// Detach the controller and tell the client where it ended up
    fn end_interaction(&mut self, window: Window, moved: bool) -> Result<()> {
        let Some(client) = self.clients.get_mut(window) else {
            return Ok(());
        };
        client.controller = None;
        if moved {
            let geometry = client.geometry;
            self.server.send_configure_notify(window, geometry)?;
            self.write_state(window)?;
        }
        Ok(())
    }

    /// Move a client with the pointer, `(start_x, start_y)` being the press
    /// position relative to the frame. Returns whether the client moved.
    pub fn move_client(&mut self, window: Window, start_x: i32, start_y: i32) -> Result<bool> {
        match self.clients.get(window) {
            Some(client) if client.border.contains(BorderFlags::MOVE) => {}
            _ => return Ok(false),
        }
        let Some((controller, frame)) = self.begin_interaction(window) else {
            return Ok(false);
        };
        if !self.server.grab_pointer(frame, CursorKind::Move)? {
            debug!("Pointer grab failed, not moving 0x{:x}", window);
            self.end_interaction(window, false)?;
            return Ok(false);
        }

        let mut moved = false;
        loop {
            let event = self.wait_for_event()?;
            if let Some(reason) = controller.cancelled() {
                debug!("Move of 0x{:x} stopped: {:?}", window, reason);
                break;
            }
            match event {
                None => break,
                Some(ServerEvent::Button(button)) if button.kind == ButtonKind::Release => break,
                Some(ServerEvent::MotionNotify(motion)) => {
                    let motion = self.discard_motion_events(motion, frame)?;
                    let Some(client) = self.clients.get_mut(window) else {
                        break;
                    };
                    let borders = border_sizes(client.border, &self.settings);
                    let x = motion.root_x - start_x + borders.west;
                    let y = motion.root_y - start_y + borders.north;
                    if (x, y) != (client.geometry.x, client.geometry.y) {
                        client.geometry.x = x;
                        client.geometry.y = y;
                        moved = true;
                        let changes = WindowChanges {
                            x: Some(x - borders.west),
                            y: Some(y - borders.north),
                            ..WindowChanges::default()
                        };
                        self.server.configure(frame, &changes)?;
                    }
                }
                Some(_) => {}
            }
        }

        self.server.ungrab_pointer()?;
        self.end_interaction(window, moved)?;
        Ok(moved)
    }

    /// Resize a client by dragging the `direction` edge
    pub fn resize_client(
        &mut self,
        window: Window,
        direction: ResizeDirection,
        start_x: i32,
        start_y: i32,
    ) -> Result<bool> {
        let (start, frame_origin) = match self.clients.get(window) {
            Some(client) if client.border.contains(BorderFlags::RESIZE) => {
                let borders = border_sizes(client.border, &self.settings);
                let origin = (client.geometry.x - borders.west, client.geometry.y - borders.north);
                (client.geometry, origin)
            }
            _ => return Ok(false),
        };
        let Some((controller, frame)) = self.begin_interaction(window) else {
            return Ok(false);
        };
        if !self.server.grab_pointer(frame, CursorKind::Resize(direction))? {
            debug!("Pointer grab failed, not resizing 0x{:x}", window);
            self.end_interaction(window, false)?;
            return Ok(false);
        }

        let anchor = (frame_origin.0 + start_x, frame_origin.1 + start_y);
        let mut resized = false;
        loop {
            let event = self.wait_for_event()?;
            if let Some(reason) = controller.cancelled() {
                debug!("Resize of 0x{:x} stopped: {:?}", window, reason);
                break;
            }
            match event {
                None => break,
                Some(ServerEvent::Button(button)) if button.kind == ButtonKind::Release => break,
                Some(ServerEvent::MotionNotify(motion)) => {
                    let motion = self.discard_motion_events(motion, frame)?;
                    let Some(client) = self.clients.get(window) else {
                        break;
                    };
                    let dy = if client.status.contains(Status::SHADED) {
                        0
                    } else {
                        motion.root_y - anchor.1
                    };
                    let geometry = resize_geometry(
                        start,
                        direction,
                        motion.root_x - anchor.0,
                        dy,
                        &client.hints,
                        self.settings.screen,
                    );
                    if geometry != client.geometry {
                        resized = true;
                        self.set_client_geometry(window, geometry)?;
                    }
                }
                Some(_) => {}
            }
        }

        self.server.ungrab_pointer()?;
        self.end_interaction(window, resized)?;
        Ok(resized)
    }

    /// Move the active client with the arrow keys until select or escape
    pub fn move_client_keyboard(&mut self, window: Window) -> Result<bool> {
        self.keyboard_interaction(window, false)
    }

    /// Resize the active client with the arrow keys until select or escape
    pub fn resize_client_keyboard(&mut self, window: Window) -> Result<bool> {
        self.keyboard_interaction(window, true)
    }

    fn keyboard_interaction(&mut self, window: Window, resize: bool) -> Result<bool> {
        let required = if resize { BorderFlags::RESIZE } else { BorderFlags::MOVE };
        let original = match self.clients.get(window) {
            Some(client) if client.border.contains(required) => client.geometry,
            _ => return Ok(false),
        };
        let Some((controller, frame)) = self.begin_interaction(window) else {
            return Ok(false);
        };
        if !self.server.grab_keyboard(frame)? {
            debug!("Keyboard grab failed for 0x{:x}", window);
            self.end_interaction(window, false)?;
            return Ok(false);
        }

        let step = self.settings.move_step as i32;
        let mut changed = false;
        loop {
            let event = self.wait_for_event()?;
            if controller.cancelled().is_some() {
                break;
            }
            let key = match event {
                None | Some(ServerEvent::Button(_)) => break,
                Some(ServerEvent::KeyPress(key)) => key,
                Some(_) => continue,
            };
            let action = self.key_action(&key)?;
            let (dx, dy) = match action {
                Some(KeyAction::Up) => (0, -step),
                Some(KeyAction::Down) => (0, step),
                Some(KeyAction::Left) => (-step, 0),
                Some(KeyAction::Right) => (step, 0),
                Some(KeyAction::Select) => break,
                Some(KeyAction::Escape) => {
                    if changed {
                        self.set_client_geometry(window, original)?;
                        changed = false;
                    }
                    break;
                }
                _ => continue,
            };
            let Some(current) = self.clients.get(window) else {
                break;
            };
            let mut geometry = current.geometry;
            if resize {
                let hints = current.hints;
                let dx = dx.signum() * hints.width_inc.max(step as u32) as i32;
                let dy = dy.signum() * hints.height_inc.max(step as u32) as i32;
                geometry = resize_geometry(
                    geometry,
                    ResizeDirection::BottomRight,
                    dx,
                    dy,
                    &hints,
                    self.settings.screen,
                );
            } else {
                geometry.x += dx;
                geometry.y += dy;
            }
            if geometry != current.geometry {
                changed = true;
                self.set_client_geometry(window, geometry)?;
            }
        }

        self.server.ungrab_keyboard()?;
        self.end_interaction(window, changed)?;
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::client::Cancel;
    use crate::wm::testing::*;

    const SCREEN: Geometry = Geometry { x: 0, y: 0, width: 1024, height: 768 };

    #[test]
    fn left_edge_keeps_right_edge_fixed() {
        let start = Geometry::new(100, 100, 400, 300);
        let g = resize_geometry(start, ResizeDirection::Left, -50, 0, &SizeHints::default(), SCREEN);
        assert_eq!(g, Geometry::new(50, 100, 450, 300));
        assert_eq!(g.right(), start.right());
    }

    #[test]
    fn top_right_grows_up_and_right() {
        let start = Geometry::new(100, 100, 400, 300);
        let g = resize_geometry(start, ResizeDirection::TopRight, 20, -30, &SizeHints::default(), SCREEN);
        assert_eq!(g, Geometry::new(100, 70, 420, 330));
    }

    #[test]
    fn resize_never_collapses() {
        let start = Geometry::new(100, 100, 40, 30);
        let g = resize_geometry(start, ResizeDirection::BottomRight, -500, -500, &SizeHints::default(), SCREEN);
        assert_eq!((g.width, g.height), (1, 1));
    }

    #[test]
    fn drag_moves_frame_and_reports_geometry() {
        let mut wm = harness();
        let window = manage(&mut wm, 10, Geometry::new(100, 100, 400, 300));
        let frame = frame_of(&wm, window);

        wm.server.push(motion(frame, 0, 0, 120, 90));
        wm.server.push(motion(frame, 0, 0, 150, 95));
        wm.server.push(release(frame, 1, 0, 0, 5));
        assert!(wm.move_client(window, 50, 10).unwrap());

        let client = wm.clients.get(window).unwrap();
        assert_eq!((client.geometry.x, client.geometry.y), (104, 109));
        assert!(client.controller.is_none());
        let requests = wm.server.take_requests();
        assert!(requests.contains(&Request::ConfigureNotify(window, Geometry::new(104, 109, 400, 300))));
        assert!(requests.contains(&Request::UngrabPointer));
    }

    #[test]
    fn release_without_motion_reports_no_movement() {
        let mut wm = harness();
        let window = manage(&mut wm, 10, Geometry::new(100, 100, 400, 300));
        let frame = frame_of(&wm, window);

        wm.server.push(release(frame, 1, 0, 0, 5));
        assert!(!wm.move_client(window, 50, 10).unwrap());
        assert!(!wm.server.requests.iter().any(|r| matches!(r, Request::ConfigureNotify(..))));
    }

    #[test]
    fn configure_request_during_drag_cancels_it() {
        let mut wm = harness();
        let window = manage(&mut wm, 10, Geometry::new(100, 100, 400, 300));
        let frame = frame_of(&wm, window);

        wm.server.push(ServerEvent::ConfigureRequest(ConfigureRequest {
            window,
            width: 200,
            value_mask: ConfigMask::WIDTH,
            ..ConfigureRequest::default()
        }));
        // never reached: the loop stops on the cancelled controller
        wm.server.push(motion(frame, 0, 0, 500, 500));
        wm.server.push(release(frame, 1, 0, 0, 5));

        assert!(!wm.move_client(window, 50, 10).unwrap());
        let client = wm.clients.get(window).unwrap();
        assert_eq!(client.geometry, Geometry::new(100, 100, 200, 300));
        assert!(client.controller.is_none());
    }

    #[test]
    fn destroy_during_resize_ends_it() {
        let mut wm = harness();
        let window = manage(&mut wm, 10, Geometry::new(100, 100, 400, 300));

        wm.server.push(ServerEvent::DestroyNotify { window });
        wm.server.push(release(0, 1, 0, 0, 5));
        assert!(!wm.resize_client(window, ResizeDirection::Right, 407, 100).unwrap());
        assert!(wm.clients.get(window).is_none());
    }

    #[test]
    fn drag_bottom_right_corner() {
        let mut wm = harness();
        let window = manage(&mut wm, 10, Geometry::new(100, 100, 400, 300));
        let frame = frame_of(&wm, window);

        // frame origin is (96, 76); press at the corner
        wm.server.push(motion(frame, 0, 0, 96 + 405 + 30, 76 + 327 + 20));
        wm.server.push(release(frame, 1, 0, 0, 5));
        assert!(wm.resize_client(window, ResizeDirection::BottomRight, 405, 327).unwrap());
        assert_eq!(wm.clients.get(window).unwrap().geometry, Geometry::new(100, 100, 430, 320));
    }

    #[test]
    fn cancel_reason_is_recorded() {
        let mut wm = harness();
        let window = manage(&mut wm, 10, Geometry::new(100, 100, 400, 300));
        let (controller, _) = wm.begin_interaction(window).unwrap();
        wm.clients.get_mut(window).unwrap().cancel_controller(Cancel::Destroyed);
        assert_eq!(controller.cancelled(), Some(Cancel::Destroyed));
    }
}
