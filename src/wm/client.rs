use std::cell::Cell;
use std::rc::Rc;

use crate::shared::Geometry;
use crate::wm::client_flags::{BorderFlags, DesktopAssignment, Status, LAYER_NORMAL};
use crate::wm::decorations::BorderAction;
use crate::wm::hints::{SizeHints, Strut};
use crate::wm::server::{Colormap, Window};

/// Why an interactive operation was asked to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cancel {
    /// Another request is about to change the window; finish cleanly
    Finish,
    /// The window is gone
    Destroyed,
}

/// Cancellation handle for an in-flight interactive move or resize.
///
/// The loop driving the operation keeps one clone and polls
/// [`Controller::cancelled`]; the client keeps the other so handlers that
/// mutate the window can call [`Controller::cancel`] first.
#[derive(Debug, Clone, Default)]
pub struct Controller(Rc<Cell<Option<Cancel>>>);

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self, reason: Cancel) {
        if self.0.get().is_none() {
            self.0.set(Some(reason));
        }
    }

    pub fn cancelled(&self) -> Option<Cancel> {
        self.0.get()
    }
}

/// Window Manager client state
/// Represents a window being managed by the WM
#[derive(Debug)]
pub struct Client {
    /// Content window
    pub window: Window,

    /// Frame window wrapping the content
    pub parent: Window,

    /// Content geometry; `x`/`y` are the content's root position
    pub geometry: Geometry,

    /// Geometry to return to when unmaximizing
    pub restore_geometry: Option<Geometry>,

    pub hints: SizeHints,
    pub border: BorderFlags,
    pub status: Status,
    pub desktop: DesktopAssignment,
    pub layer: u8,

    pub colormap: Colormap,
    /// WM_COLORMAP_WINDOWS
    pub colormap_windows: Vec<Window>,

    pub strut: Option<Strut>,

    /// Window title
    pub name: String,

    /// Set while an interactive move/resize runs on this client
    pub controller: Option<Controller>,

    /// Last classified border zone, for cursor feedback
    pub border_action: BorderAction,

    /// UnmapNotify events caused by our own reparenting
    pub ignore_unmap: u32,
}

impl Client {
    pub fn new(window: Window, parent: Window, geometry: Geometry) -> Self {
        Self {
            window,
            parent,
            geometry,
            restore_geometry: None,
            hints: SizeHints::default(),
            border: BorderFlags::default(),
            status: Status::empty(),
            desktop: DesktopAssignment::On(0),
            layer: LAYER_NORMAL,
            colormap: 0,
            colormap_windows: Vec::new(),
            strut: None,
            name: String::new(),
            controller: None,
            border_action: BorderAction::None,
            ignore_unmap: 0,
        }
    }

    pub fn is_mapped(&self) -> bool {
        self.status.contains(Status::MAPPED)
    }

    pub fn is_minimized(&self) -> bool {
        self.status.contains(Status::MINIMIZED)
    }

    pub fn set_mapped(&mut self) {
        self.status.remove(Status::MINIMIZED);
        self.status.insert(Status::MAPPED);
    }

    pub fn set_minimized(&mut self) {
        self.status.remove(Status::MAPPED);
        self.status.insert(Status::MINIMIZED);
    }

    pub fn set_unmapped(&mut self) {
        self.status.remove(Status::MAPPED | Status::MINIMIZED);
    }

    /// Ask a running interactive operation to stop before this client is
    /// mutated. The handle is dropped either way.
    pub fn cancel_controller(&mut self, reason: Cancel) {
        if let Some(controller) = self.controller.take() {
            controller.cancel(reason);
        }
    }
}
