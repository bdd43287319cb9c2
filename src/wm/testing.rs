//! In-memory window server and shell for tests
//!
//! `FakeServer` serves a scripted event queue and records every request;
//! `RecordingShell` records every collaborator call.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};

use crate::config::KeyConfig;
use crate::shared::Geometry;
use crate::shell::{Claimant, Shell};
use crate::wm::client::Client;
use crate::wm::decorations::CursorKind;
use crate::wm::server::*;
use crate::wm::settings::Settings;
use crate::wm::WindowManager;

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Configure(Window, WindowChanges),
    Map(Window),
    Unmap(Window),
    Restack(Vec<Window>),
    DefineCursor(Window, CursorKind),
    ConfigureNotify(Window, Geometry),
    ApplyShape(Window, Window),
    Sync,
    GrabServer,
    UngrabServer,
    ReplayPointer,
    GrabPointer(Window),
    UngrabPointer,
    GrabKeyboard(Window),
    UngrabKeyboard,
    GrabKey(u16, u8),
    Focus(Window),
    InstallColormap(Colormap),
    CreateFrame(Window, Geometry),
    Adopt(Window, Window),
    Release(Window, i32, i32),
    Destroy(Window),
    Kill(Window),
    ClientMessage(Window, Atom, [u32; 5]),
    SetProperty(Window, Atom, Vec<u32>),
    DeleteProperty(Window, Atom),
}

impl Request {
    /// Requests that change what is on screen
    pub fn is_geometry(&self) -> bool {
        matches!(self, Self::Configure(..) | Self::ConfigureNotify(..))
    }
}

pub struct FakeServer {
    pub requests: Vec<Request>,
    pub events: VecDeque<ServerEvent>,
    pub properties: HashMap<(Window, Atom), Vec<u32>>,
    pub texts: HashMap<(Window, Atom), String>,
    pub windows: HashMap<Window, ClientAttributes>,
    pub shape: bool,
    /// keysym -> keycode
    pub keymap: HashMap<u32, u8>,
    atoms: HashMap<String, Atom>,
    next_window: Window,
}

impl FakeServer {
    pub fn new() -> Self {
        Self {
            requests: Vec::new(),
            events: VecDeque::new(),
            properties: HashMap::new(),
            texts: HashMap::new(),
            windows: HashMap::new(),
            shape: true,
            keymap: HashMap::new(),
            atoms: HashMap::new(),
            next_window: 0x100_0000,
        }
    }

    /// A mappable top-level window
    pub fn add_window(&mut self, window: Window, geometry: Geometry) {
        self.windows.insert(
            window,
            ClientAttributes { geometry, ..ClientAttributes::default() },
        );
    }

    pub fn push(&mut self, event: ServerEvent) {
        self.events.push_back(event);
    }

    pub fn take_requests(&mut self) -> Vec<Request> {
        std::mem::take(&mut self.requests)
    }

    pub fn atom(&self, name: &str) -> Atom {
        self.atoms[name]
    }
}

impl WindowServer for FakeServer {
    fn root(&self) -> Window {
        1
    }

    fn screen_size(&self) -> (u32, u32) {
        (1024, 768)
    }

    fn has_shape(&self) -> bool {
        self.shape
    }

    fn pending(&mut self) -> Result<usize> {
        Ok(self.events.len())
    }

    fn wait_readable(&mut self, _timeout: Duration) -> Result<bool> {
        if self.events.is_empty() {
            Err(anyhow!("event queue exhausted"))
        } else {
            Ok(true)
        }
    }

    fn next_event(&mut self) -> Result<ServerEvent> {
        self.events.pop_front().ok_or_else(|| anyhow!("event queue exhausted"))
    }

    fn take_queued(&mut self, filter: &dyn Fn(&ServerEvent) -> bool) -> Result<Vec<ServerEvent>> {
        let (taken, kept): (Vec<_>, Vec<_>) = self.events.drain(..).partition(|e| filter(e));
        self.events = kept.into();
        Ok(taken)
    }

    fn configure(&mut self, window: Window, changes: &WindowChanges) -> Result<()> {
        self.requests.push(Request::Configure(window, *changes));
        Ok(())
    }

    fn map(&mut self, window: Window) -> Result<()> {
        self.requests.push(Request::Map(window));
        Ok(())
    }

    fn unmap(&mut self, window: Window) -> Result<()> {
        self.requests.push(Request::Unmap(window));
        Ok(())
    }

    fn restack(&mut self, windows: &[Window]) -> Result<()> {
        self.requests.push(Request::Restack(windows.to_vec()));
        Ok(())
    }

    fn define_cursor(&mut self, window: Window, cursor: CursorKind) -> Result<()> {
        self.requests.push(Request::DefineCursor(window, cursor));
        Ok(())
    }

    fn send_configure_notify(&mut self, window: Window, geometry: Geometry) -> Result<()> {
        self.requests.push(Request::ConfigureNotify(window, geometry));
        Ok(())
    }

    fn apply_shape(&mut self, frame: Window, content: Window, _offset: (i32, i32)) -> Result<()> {
        self.requests.push(Request::ApplyShape(frame, content));
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        self.requests.push(Request::Sync);
        Ok(())
    }

    fn grab_server(&mut self) -> Result<()> {
        self.requests.push(Request::GrabServer);
        Ok(())
    }

    fn ungrab_server(&mut self) -> Result<()> {
        self.requests.push(Request::UngrabServer);
        Ok(())
    }

    fn replay_pointer(&mut self, _time: Timestamp) -> Result<()> {
        self.requests.push(Request::ReplayPointer);
        Ok(())
    }

    fn grab_pointer(&mut self, window: Window, _cursor: CursorKind) -> Result<bool> {
        self.requests.push(Request::GrabPointer(window));
        Ok(true)
    }

    fn ungrab_pointer(&mut self) -> Result<()> {
        self.requests.push(Request::UngrabPointer);
        Ok(())
    }

    fn grab_keyboard(&mut self, window: Window) -> Result<bool> {
        self.requests.push(Request::GrabKeyboard(window));
        Ok(true)
    }

    fn ungrab_keyboard(&mut self) -> Result<()> {
        self.requests.push(Request::UngrabKeyboard);
        Ok(())
    }

    fn grab_key(&mut self, _window: Window, modifiers: u16, keycode: u8) -> Result<()> {
        self.requests.push(Request::GrabKey(modifiers, keycode));
        Ok(())
    }

    fn keycodes_for(&mut self, keysym: u32) -> Result<Vec<u8>> {
        Ok(self.keymap.get(&keysym).copied().into_iter().collect())
    }

    fn keysym_for(&mut self, keycode: u8) -> Result<u32> {
        Ok(self
            .keymap
            .iter()
            .find(|(_, code)| **code == keycode)
            .map(|(sym, _)| *sym)
            .unwrap_or(0))
    }

    fn set_input_focus(&mut self, window: Window, _time: Timestamp) -> Result<()> {
        self.requests.push(Request::Focus(window));
        Ok(())
    }

    fn install_colormap(&mut self, colormap: Colormap) -> Result<()> {
        self.requests.push(Request::InstallColormap(colormap));
        Ok(())
    }

    fn query_tree(&mut self) -> Result<Vec<Window>> {
        let mut children: Vec<Window> = self.windows.keys().copied().collect();
        children.sort_unstable();
        Ok(children)
    }

    fn attributes(&mut self, window: Window) -> Result<Option<ClientAttributes>> {
        Ok(self.windows.get(&window).copied())
    }

    fn create_frame(&mut self, geometry: Geometry, _background: u32) -> Result<Window> {
        self.next_window += 1;
        self.requests.push(Request::CreateFrame(self.next_window, geometry));
        Ok(self.next_window)
    }

    fn adopt(&mut self, content: Window, frame: Window, _x: i32, _y: i32) -> Result<()> {
        self.requests.push(Request::Adopt(content, frame));
        Ok(())
    }

    fn release(&mut self, content: Window, x: i32, y: i32) -> Result<()> {
        self.requests.push(Request::Release(content, x, y));
        Ok(())
    }

    fn destroy_window(&mut self, window: Window) -> Result<()> {
        self.requests.push(Request::Destroy(window));
        Ok(())
    }

    fn kill_client(&mut self, window: Window) -> Result<()> {
        self.requests.push(Request::Kill(window));
        Ok(())
    }

    fn send_client_message(&mut self, window: Window, message_type: Atom, data: [u32; 5]) -> Result<()> {
        self.requests.push(Request::ClientMessage(window, message_type, data));
        Ok(())
    }

    fn intern_atom(&mut self, name: &str) -> Result<Atom> {
        let next = 100 + self.atoms.len() as Atom;
        Ok(*self.atoms.entry(name.to_string()).or_insert(next))
    }

    fn get_property32(&mut self, window: Window, property: Atom) -> Result<Vec<u32>> {
        Ok(self.properties.get(&(window, property)).cloned().unwrap_or_default())
    }

    fn get_text(&mut self, window: Window, property: Atom) -> Result<Option<String>> {
        Ok(self.texts.get(&(window, property)).cloned())
    }

    fn set_property32(&mut self, window: Window, property: Atom, _kind: Atom, values: &[u32]) -> Result<()> {
        self.properties.insert((window, property), values.to_vec());
        self.requests.push(Request::SetProperty(window, property, values.to_vec()));
        Ok(())
    }

    fn delete_property(&mut self, window: Window, property: Atom) -> Result<()> {
        self.properties.remove(&(window, property));
        self.requests.push(Request::DeleteProperty(window, property));
        Ok(())
    }

    fn atom_name(&mut self, atom: Atom) -> Result<String> {
        self.atoms
            .iter()
            .find(|(_, a)| **a == atom)
            .map(|(name, _)| name.clone())
            .ok_or_else(|| anyhow!("X11 error: Atom (BadAtom) for {atom}"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShellCall {
    Signal(i32, i32),
    UpdateTaskbar,
    UpdatePager,
    DrawBorder(Window),
    LoadIcon(Window),
    WindowMenu(Window, i32, i32),
    RootMenu(u8, i32, i32),
    Claim(Claimant),
    DockSelectionClear(Window),
    DockResize(Window),
    DockDestroy(Window),
    DockMessage(Window),
    Run(String),
}

#[derive(Default)]
pub struct RecordingShell {
    pub calls: Vec<ShellCall>,
    /// Windows waiting to be swallowed
    pub swallow: HashSet<Window>,
    /// Docked windows
    pub docked: HashSet<Window>,
    /// Claimant that accepts every offered event
    pub claimer: Option<Claimant>,
    pub root_menu: bool,
    pub signals: Vec<Instant>,
}

impl RecordingShell {
    pub fn count(&self, call: &ShellCall) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }
}

impl Shell for RecordingShell {
    fn signal(&mut self, now: Instant, pointer_x: i32, pointer_y: i32) {
        self.signals.push(now);
        self.calls.push(ShellCall::Signal(pointer_x, pointer_y));
    }

    fn update_taskbar(&mut self) {
        self.calls.push(ShellCall::UpdateTaskbar);
    }

    fn update_pager(&mut self) {
        self.calls.push(ShellCall::UpdatePager);
    }

    fn draw_border(&mut self, client: &Client, _area: Option<Geometry>) {
        self.calls.push(ShellCall::DrawBorder(client.window));
    }

    fn load_icon(&mut self, window: Window) {
        self.calls.push(ShellCall::LoadIcon(window));
    }

    fn show_window_menu(&mut self, window: Window, x: i32, y: i32) {
        self.calls.push(ShellCall::WindowMenu(window, x, y));
    }

    fn show_root_menu(&mut self, button: u8, x: i32, y: i32) -> bool {
        self.calls.push(ShellCall::RootMenu(button, x, y));
        self.root_menu
    }

    fn claim(&mut self, claimant: Claimant, _event: &ServerEvent) -> bool {
        self.calls.push(ShellCall::Claim(claimant));
        self.claimer == Some(claimant)
    }

    fn check_swallow_map(&mut self, window: Window) -> bool {
        self.swallow.remove(&window)
    }

    fn dock_selection_clear(&mut self, owner: Window, _selection: Atom) -> bool {
        self.calls.push(ShellCall::DockSelectionClear(owner));
        false
    }

    fn dock_resize_request(&mut self, window: Window, _width: u32, _height: u32) -> bool {
        self.calls.push(ShellCall::DockResize(window));
        self.docked.contains(&window)
    }

    fn dock_destroy(&mut self, window: Window) -> bool {
        self.calls.push(ShellCall::DockDestroy(window));
        self.docked.remove(&window)
    }

    fn dock_message(&mut self, message: &ClientMessage) {
        self.calls.push(ShellCall::DockMessage(message.window));
    }

    fn run_command(&mut self, command: &str) {
        self.calls.push(ShellCall::Run(command.to_string()));
    }
}

pub type TestWm = WindowManager<FakeServer, RecordingShell>;

/// A window manager over the fakes with default settings (4px border,
/// 20px title, 4 desktops, click to focus)
pub fn harness() -> TestWm {
    harness_with(Settings::default(), &[])
}

pub fn harness_with(settings: Settings, keys: &[KeyConfig]) -> TestWm {
    WindowManager::new(FakeServer::new(), RecordingShell::default(), settings, keys)
        .expect("fake server cannot fail")
}

/// Manage `window` at `geometry` and forget the requests that caused
pub fn manage(wm: &mut TestWm, window: Window, geometry: Geometry) -> Window {
    wm.server.add_window(window, geometry);
    wm.add_client(window, false)
        .expect("fake server cannot fail")
        .expect("window is manageable");
    wm.server.take_requests();
    wm.shell.calls.clear();
    window
}

pub fn frame_of(wm: &TestWm, window: Window) -> Window {
    wm.clients.get(window).expect("managed").parent
}

pub fn press(window: Window, button: u8, x: i32, y: i32, time: Timestamp) -> ServerEvent {
    ServerEvent::Button(ButtonEvent {
        kind: ButtonKind::Press,
        window,
        button,
        x,
        y,
        root_x: x,
        root_y: y,
        state: 0,
        time,
    })
}

pub fn release(window: Window, button: u8, x: i32, y: i32, time: Timestamp) -> ServerEvent {
    match press(window, button, x, y, time) {
        ServerEvent::Button(event) => ServerEvent::Button(ButtonEvent { kind: ButtonKind::Release, ..event }),
        other => other,
    }
}

pub fn motion(window: Window, x: i32, y: i32, root_x: i32, root_y: i32) -> ServerEvent {
    ServerEvent::MotionNotify(MotionEvent { window, x, y, root_x, root_y, is_hint: false, time: 0 })
}

pub fn message(window: Window, message_type: Atom, data: [u32; 5]) -> ServerEvent {
    ServerEvent::ClientMessage(ClientMessage { window, message_type, format: 32, data })
}
