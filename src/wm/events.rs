//! Events Module
//!
//! Primary dispatch (`wait_for_event`) routes window management events to
//! their handlers and offers anything left over to the shell's fallback
//! claimants. The first event nobody claims is returned to the caller, which
//! hands it to secondary dispatch (`process_event`) for pointer and keyboard
//! handling.

use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{debug, trace};

use crate::shell::{Claimant, Shell};
use crate::wm::client_flags::BorderFlags;
use crate::wm::decorations::{classify, BorderAction, CursorKind};
use crate::wm::server::{CrossingEvent, MotionEvent, ServerEvent, Window, WindowServer};
use crate::wm::settings::FocusModel;
use crate::wm::WindowManager;

/// Longest the outer wait blocks before the periodic signal runs anyway
pub const WAIT_QUANTUM: Duration = Duration::from_secs(1);

/// Minimum spacing between two periodic signals
pub const SIGNAL_INTERVAL: Duration = Duration::from_millis(50);

impl<S: WindowServer, H: Shell> WindowManager<S, H> {
    /// Handle events until one is left unhandled by both the core and the
    /// fallback claimants, and return it. Returns `None` once a shutdown has
    /// been requested.
    pub fn wait_for_event(&mut self) -> Result<Option<ServerEvent>> {
        loop {
            while self.server.pending()? == 0 {
                if !self.server.wait_readable(WAIT_QUANTUM)? {
                    self.signal();
                }
            }
            self.signal();

            let event = self.server.next_event()?;
            trace!("event {:?}", event);

            let handled = self.dispatch(&event)? || self.offer(&event);
            if !handled {
                return Ok(Some(event));
            }
            if self.shutdown.is_some() {
                return Ok(None);
            }
        }
    }

    /// Route one event. Returns whether it was handled.
    fn dispatch(&mut self, event: &ServerEvent) -> Result<bool> {
        let handled = match event {
            ServerEvent::ConfigureRequest(request) => {
                self.handle_configure_request(request)?;
                true
            }
            ServerEvent::MapRequest { window } => {
                self.handle_map_request(*window)?;
                true
            }
            ServerEvent::PropertyNotify { window, atom } => self.handle_property_notify(*window, *atom)?,
            ServerEvent::ClientMessage(message) => {
                self.handle_client_message(message)?;
                true
            }
            ServerEvent::UnmapNotify { window } => {
                self.handle_unmap_notify(*window)?;
                true
            }
            ServerEvent::Expose { window, area, count } => self.handle_expose(*window, *area, *count),
            ServerEvent::ColormapNotify { window, colormap, new } => {
                self.handle_colormap_change(*window, *colormap, *new)?;
                true
            }
            ServerEvent::DestroyNotify { window } => self.handle_destroy_notify(*window)?,
            ServerEvent::SelectionClear { owner, selection, .. } => {
                self.shell.dock_selection_clear(*owner, *selection)
            }
            ServerEvent::ResizeRequest { window, width, height } => {
                self.shell.dock_resize_request(*window, *width, *height)
            }
            ServerEvent::MotionNotify(motion) => {
                self.set_pointer(motion.root_x, motion.root_y);
                false
            }
            ServerEvent::ConfigureNotify { .. }
            | ServerEvent::CreateNotify { .. }
            | ServerEvent::MapNotify { .. }
            | ServerEvent::ReparentNotify { .. }
            | ServerEvent::GraphicsExposure
            | ServerEvent::NoExposure => true,
            ServerEvent::ShapeNotify { window } if self.server.has_shape() => {
                self.handle_shape_notify(*window)?;
                true
            }
            _ => false,
        };
        Ok(handled)
    }

    /// Offer an event to the fallback claimants in order
    fn offer(&mut self, event: &ServerEvent) -> bool {
        Claimant::ORDER
            .iter()
            .any(|claimant| self.shell.claim(*claimant, event))
    }

    /// Periodic callback into the shell, throttled
    pub fn signal(&mut self) {
        self.signal_at(Instant::now());
    }

    pub fn signal_at(&mut self, now: Instant) {
        if let Some(last) = self.last_signal {
            if now.saturating_duration_since(last) < SIGNAL_INTERVAL {
                return;
            }
        }
        self.last_signal = Some(now);
        let (x, y) = self.pointer;
        self.shell.signal(now, x, y);
    }

    /// Secondary dispatch for pointer and keyboard events
    pub fn process_event(&mut self, event: ServerEvent) -> Result<()> {
        match event {
            ServerEvent::Button(button) => self.handle_button(&button)?,
            ServerEvent::KeyPress(key) => self.handle_key_press(&key)?,
            ServerEvent::EnterNotify(crossing) => self.handle_enter_notify(&crossing)?,
            ServerEvent::LeaveNotify(crossing) => self.handle_leave_notify(&crossing)?,
            ServerEvent::MotionNotify(motion) => {
                let latest = self.coalesce_motion(motion)?;
                self.handle_motion_notify(&latest)?;
            }
            ServerEvent::DestroyNotify { .. }
            | ServerEvent::Expose { .. }
            | ServerEvent::KeyRelease(_)
            | ServerEvent::ConfigureNotify { .. } => {}
            other => debug!("Unknown event type: {:?}", other),
        }
        Ok(())
    }

    /// Drain queued motion, feeding every sample to the pointer cache, and
    /// return the newest sample
    fn coalesce_motion(&mut self, motion: MotionEvent) -> Result<MotionEvent> {
        let mut latest = motion;
        for event in self.server.take_queued(&|e| matches!(e, ServerEvent::MotionNotify(_)))? {
            if let ServerEvent::MotionNotify(sample) = event {
                self.set_pointer(sample.root_x, sample.root_y);
                latest = sample;
            }
        }
        Ok(latest)
    }

    /// Drain queued motion like [`Self::coalesce_motion`] but keep only
    /// samples for `window`, falling back to `motion`
    pub fn discard_motion_events(&mut self, motion: MotionEvent, window: Window) -> Result<MotionEvent> {
        let mut latest = motion;
        for event in self.server.take_queued(&|e| matches!(e, ServerEvent::MotionNotify(_)))? {
            if let ServerEvent::MotionNotify(sample) = event {
                self.set_pointer(sample.root_x, sample.root_y);
                if sample.window == window {
                    latest = sample;
                }
            }
        }
        Ok(latest)
    }

    fn handle_enter_notify(&mut self, event: &CrossingEvent) -> Result<()> {
        self.set_pointer(event.root_x, event.root_y);

        let Some(window) = self.clients.find(event.window) else {
            return Ok(());
        };
        if self.settings.focus_model == FocusModel::Sloppy && self.active != Some(window) {
            self.focus_client(window)?;
        }

        let Some(client) = self.clients.get_mut(window) else {
            return Ok(());
        };
        if client.parent == event.window {
            client.border_action = classify(client, &self.settings, event.x, event.y);
            self.server.define_cursor(client.parent, client.border_action.cursor())?;
        } else if client.border_action != BorderAction::None {
            client.border_action = BorderAction::None;
            self.server.define_cursor(client.parent, CursorKind::Default)?;
        }
        Ok(())
    }

    fn handle_leave_notify(&mut self, event: &CrossingEvent) -> Result<()> {
        self.set_pointer(event.root_x, event.root_y);
        if self.clients.find_by_frame(event.window).is_some() {
            self.server.define_cursor(event.window, CursorKind::Default)?;
        }
        Ok(())
    }

    fn handle_motion_notify(&mut self, event: &MotionEvent) -> Result<()> {
        if event.is_hint {
            return Ok(());
        }
        self.set_pointer(event.root_x, event.root_y);

        let Some(window) = self.clients.find_by_frame(event.window) else {
            return Ok(());
        };
        let Some(client) = self.clients.get_mut(window) else {
            return Ok(());
        };
        if client.border.contains(BorderFlags::OUTLINE) {
            let action = classify(client, &self.settings, event.x, event.y);
            if client.border_action != action {
                client.border_action = action;
                self.server.define_cursor(client.parent, action.cursor())?;
            }
        }
        Ok(())
    }
}
