//! Window registry
//!
//! Managed clients keyed by content window, with a frame index and the
//! stacking order.

use std::collections::HashMap;

use crate::wm::client::Client;
use crate::wm::server::Window;

#[derive(Debug, Default)]
pub struct ClientList {
    clients: HashMap<Window, Client>,
    /// frame -> content
    frames: HashMap<Window, Window>,
    /// Content windows, topmost first
    stack: Vec<Window>,
    /// Content windows, oldest first
    order: Vec<Window>,
}

impl ClientList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content window of the client owning `window`, which may be either its
    /// content or its frame.
    pub fn find(&self, window: Window) -> Option<Window> {
        if self.clients.contains_key(&window) {
            Some(window)
        } else {
            self.find_by_frame(window)
        }
    }

    pub fn find_by_window(&self, window: Window) -> Option<Window> {
        self.clients.contains_key(&window).then_some(window)
    }

    pub fn find_by_frame(&self, frame: Window) -> Option<Window> {
        let content = self.frames.get(&frame).copied()?;
        debug_assert!(self.clients.contains_key(&content), "frame {frame:#x} without content");
        Some(content)
    }

    pub fn get(&self, window: Window) -> Option<&Client> {
        self.clients.get(&window)
    }

    pub fn get_mut(&mut self, window: Window) -> Option<&mut Client> {
        self.clients.get_mut(&window)
    }

    pub fn contains(&self, window: Window) -> bool {
        self.clients.contains_key(&window)
    }

    /// Add a client on top of the stack. A client already registered under
    /// the same content window is replaced.
    pub fn insert(&mut self, client: Client) {
        let window = client.window;
        if let Some(old) = self.clients.remove(&window) {
            self.frames.remove(&old.parent);
            self.stack.retain(|w| *w != window);
        } else {
            self.order.push(window);
        }
        self.frames.insert(client.parent, window);
        self.stack.insert(0, window);
        self.clients.insert(window, client);
    }

    pub fn remove(&mut self, window: Window) -> Option<Client> {
        let client = self.clients.remove(&window)?;
        self.frames.remove(&client.parent);
        self.stack.retain(|w| *w != window);
        self.order.retain(|w| *w != window);
        Some(client)
    }

    /// Move a client to the top of the stack
    pub fn raise(&mut self, window: Window) {
        if self.clients.contains_key(&window) {
            self.stack.retain(|w| *w != window);
            self.stack.insert(0, window);
        }
    }

    /// Content windows, topmost first
    pub fn stacking(&self) -> &[Window] {
        &self.stack
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Client> {
        self.stack.iter().filter_map(|w| self.clients.get(w))
    }

    pub fn windows(&self) -> Vec<Window> {
        self.stack.clone()
    }

    /// Content windows in the order they were managed
    pub fn managed_order(&self) -> Vec<Window> {
        self.order.clone()
    }
}
