//! Button handling and click/drag disambiguation on frames

use anyhow::Result;
use tracing::trace;

use crate::shell::Shell;
use crate::wm::client_flags::BorderFlags;
use crate::wm::decorations::{classify, BorderAction};
use crate::wm::server::*;
use crate::wm::settings::FocusModel;
use crate::wm::WindowManager;

/// Memory of the last press on a frame's move area.
///
/// There is a single slot for the whole manager: a press on one frame
/// followed by a press on another within the double-click limits counts as
/// a double click on the second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BorderClick {
    pub last_time: Timestamp,
    pub last_x: i32,
    pub last_y: i32,
    /// A drag-free press is waiting for its second half
    pub pending: bool,
}

impl BorderClick {
    /// Whether a press at `(x, y)` and `time` completes a double click
    pub fn is_double(&self, time: Timestamp, x: i32, y: i32, speed: u32, delta: u32) -> bool {
        let elapsed = time.abs_diff(self.last_time);
        self.pending
            && elapsed > 0
            && elapsed <= speed
            && x.abs_diff(self.last_x) <= delta
            && y.abs_diff(self.last_y) <= delta
    }

    pub fn remember(&mut self, time: Timestamp, x: i32, y: i32) {
        *self = Self { last_time: time, last_x: x, last_y: y, pending: true };
    }

    pub fn reset(&mut self) {
        self.pending = false;
    }
}

impl<S: WindowServer, H: Shell> WindowManager<S, H> {
    pub(crate) fn handle_button(&mut self, event: &ButtonEvent) -> Result<()> {
        if let Some(window) = self.clients.find_by_frame(event.window) {
            self.raise_client(window)?;
            if self.settings.focus_model == FocusModel::Click {
                self.focus_client(window)?;
            }
            match event.button {
                BUTTON_LEFT => self.dispatch_border_button(event, window)?,
                BUTTON_MIDDLE => {
                    self.move_client(window, event.x, event.y)?;
                }
                BUTTON_RIGHT => {
                    if let Some(client) = self.clients.get(window) {
                        let mut x = event.x + client.geometry.x;
                        let mut y = event.y + client.geometry.y;
                        if client.border.contains(BorderFlags::OUTLINE) {
                            x -= self.settings.border_width as i32;
                            y -= self.settings.border_width as i32;
                        }
                        if client.border.contains(BorderFlags::TITLE) {
                            y -= self.settings.title_height as i32;
                        }
                        self.shell.show_window_menu(window, x, y);
                    }
                }
                BUTTON_WHEEL_UP => self.shade_client(window)?,
                BUTTON_WHEEL_DOWN => self.unshade_client(window)?,
                _ => {}
            }
        } else if event.window == self.root && event.kind == ButtonKind::Press {
            if !self.shell.show_root_menu(event.button, event.x, event.y) {
                match event.button {
                    BUTTON_WHEEL_UP => self.previous_desktop()?,
                    BUTTON_WHEEL_DOWN => self.next_desktop()?,
                    _ => {}
                }
            }
        } else if let Some(window) = self.clients.find_by_window(event.window) {
            if matches!(event.button, BUTTON_LEFT | BUTTON_MIDDLE | BUTTON_RIGHT) {
                self.raise_client(window)?;
                if self.settings.focus_model == FocusModel::Click {
                    self.focus_client(window)?;
                }
                if event.state & MOD_1 != 0 {
                    self.move_client(window, event.x, event.y)?;
                }
            }
            self.server.replay_pointer(event.time)?;
        }

        self.shell.update_pager();
        Ok(())
    }

    /// Button 1 on a frame: act on the border zone under the pointer
    fn dispatch_border_button(&mut self, event: &ButtonEvent, window: Window) -> Result<()> {
        let Some(client) = self.clients.get(window) else {
            return Ok(());
        };
        let action = classify(client, &self.settings, event.x, event.y);
        let press = event.kind == ButtonKind::Press;
        trace!("border {:?} on 0x{:x} ({:?})", action, window, event.kind);

        match action {
            BorderAction::Resize(direction) if press => {
                self.resize_client(window, direction, event.x, event.y)?;
            }
            BorderAction::Move if press => {
                let double = self.border_click.is_double(
                    event.time,
                    event.x,
                    event.y,
                    self.settings.double_click_speed,
                    self.settings.double_click_delta,
                );
                if double {
                    self.maximize_client(window)?;
                    self.border_click.reset();
                } else if self.move_client(window, event.x, event.y)? {
                    self.border_click.reset();
                } else {
                    self.border_click.remember(event.time, event.x, event.y);
                }
            }
            BorderAction::Menu if press => {
                let bsize = if client.border.contains(BorderFlags::OUTLINE) {
                    self.settings.border_width as i32
                } else {
                    0
                };
                let x = client.geometry.x + event.x - bsize;
                let y = client.geometry.y + event.y - self.settings.title_height as i32 - bsize;
                self.shell.show_window_menu(window, x, y);
            }
            BorderAction::Close if !press => self.delete_client(window)?,
            BorderAction::Maximize if !press => self.maximize_client(window)?,
            BorderAction::Minimize if !press => self.minimize_client(window)?,
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::Geometry;
    use crate::wm::client_flags::Status;
    use crate::wm::testing::*;

    fn setup() -> (TestWm, Window, Window) {
        let mut wm = harness();
        let window = manage(&mut wm, 10, Geometry::new(100, 100, 400, 300));
        let frame = frame_of(&wm, window);
        (wm, window, frame)
    }

    fn maximized(wm: &TestWm, window: Window) -> bool {
        wm.clients.get(window).unwrap().status.contains(Status::MAXIMIZED)
    }

    #[test]
    fn double_click_on_title_maximizes() {
        let (mut wm, window, frame) = setup();

        // each press starts a move that ends on the queued release
        wm.server.push(release(frame, 1, 100, 10, 1010));
        wm.process_event(press(frame, 1, 100, 10, 1000)).unwrap();
        assert!(wm.border_click.pending);
        assert!(!maximized(&wm, window));

        wm.process_event(press(frame, 1, 101, 11, 1200)).unwrap();
        assert!(maximized(&wm, window));
        assert!(!wm.border_click.pending);
    }

    #[test]
    fn late_second_press_does_not_maximize() {
        let (mut wm, window, frame) = setup();

        wm.server.push(release(frame, 1, 100, 10, 1010));
        wm.process_event(press(frame, 1, 100, 10, 1000)).unwrap();

        wm.server.push(release(frame, 1, 100, 10, 1510));
        wm.process_event(press(frame, 1, 100, 10, 1500)).unwrap();
        assert!(!maximized(&wm, window));
        assert!(wm.border_click.pending);
        assert_eq!(wm.border_click.last_time, 1500);
    }

    #[test]
    fn third_press_after_expiry_does_not_maximize() {
        let (mut wm, window, frame) = setup();

        wm.server.push(release(frame, 1, 100, 10, 1010));
        wm.process_event(press(frame, 1, 100, 10, 1000)).unwrap();
        wm.process_event(press(frame, 1, 100, 10, 1100)).unwrap();
        assert!(maximized(&wm, window));

        wm.server.push(release(frame, 1, 100, 10, 2010));
        wm.process_event(press(frame, 1, 100, 10, 2000)).unwrap();
        assert!(maximized(&wm, window));
    }

    #[test]
    fn press_too_far_away_starts_a_new_click() {
        let (mut wm, window, frame) = setup();

        wm.server.push(release(frame, 1, 100, 10, 1010));
        wm.process_event(press(frame, 1, 100, 10, 1000)).unwrap();
        wm.server.push(release(frame, 1, 150, 10, 1110));
        wm.process_event(press(frame, 1, 150, 10, 1100)).unwrap();
        assert!(!maximized(&wm, window));
        assert_eq!(wm.border_click.last_x, 150);
    }

    #[test]
    fn drag_clears_pending_click() {
        let (mut wm, window, frame) = setup();

        wm.server.push(release(frame, 1, 100, 10, 1010));
        wm.process_event(press(frame, 1, 100, 10, 1000)).unwrap();
        assert!(wm.border_click.pending);

        wm.server.push(motion(frame, 150, 40, 246, 126));
        wm.server.push(release(frame, 1, 150, 40, 1650));
        wm.process_event(press(frame, 1, 100, 10, 1600)).unwrap();
        assert!(!maximized(&wm, window));
        assert!(!wm.border_click.pending);
        assert_eq!(wm.clients.get(window).unwrap().geometry.x, 150);
    }

    #[test]
    fn close_button_acts_on_release_only() {
        let (mut wm, window, frame) = setup();

        wm.process_event(press(frame, 1, 385, 10, 1000)).unwrap();
        assert!(!wm.server.requests.iter().any(|r| matches!(r, Request::Kill(_))));

        wm.process_event(release(frame, 1, 385, 10, 1010)).unwrap();
        assert!(wm.server.requests.contains(&Request::Kill(window)));
    }

    #[test]
    fn menu_button_anchors_inside_the_frame() {
        let (mut wm, window, frame) = setup();
        wm.process_event(press(frame, 1, 10, 10, 1000)).unwrap();
        assert!(wm.shell.calls.contains(&ShellCall::WindowMenu(window, 106, 86)));
    }

    #[test]
    fn right_click_opens_window_menu() {
        let (mut wm, window, frame) = setup();
        wm.process_event(press(frame, 3, 50, 30, 1000)).unwrap();
        assert!(wm.shell.calls.contains(&ShellCall::WindowMenu(window, 146, 106)));
        assert_eq!(wm.active, Some(window));
    }

    #[test]
    fn wheel_on_root_switches_desktop_without_a_menu() {
        let mut wm = harness();
        let root = wm.root;
        wm.process_event(press(root, 5, 0, 0, 1)).unwrap();
        assert_eq!(wm.desktops.current, 1);
        wm.process_event(press(root, 4, 0, 0, 2)).unwrap();
        assert_eq!(wm.desktops.current, 0);

        wm.shell.root_menu = true;
        wm.process_event(press(root, 5, 0, 0, 3)).unwrap();
        assert_eq!(wm.desktops.current, 0);
    }

    #[test]
    fn click_in_content_is_replayed() {
        let (mut wm, window, _) = setup();
        wm.process_event(press(window, 1, 5, 5, 1000)).unwrap();
        assert!(wm.server.requests.contains(&Request::ReplayPointer));
        assert_eq!(wm.active, Some(window));
        assert!(wm.shell.calls.contains(&ShellCall::UpdatePager));
    }
}
