//! Display Module
//!
//! The X11 implementation of [`WindowServer`] over an x11rb connection.
//! Events are decoded into [`ServerEvent`] as they are read and kept in a
//! local queue, so the core can look ahead (`take_queued`) before acting.
//! Waiting with a timeout uses mio on the connection's file descriptor.

use std::collections::VecDeque;
use std::os::unix::io::{AsRawFd, RawFd};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::{debug, info, trace, warn};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::errors::ReplyError;
use x11rb::protocol::shape::{self, ConnectionExt as _};
use x11rb::protocol::xproto::{self, ConnectionExt as _, *};
use x11rb::protocol::{ErrorKind, Event};
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;
use x11rb::{CURRENT_TIME, NONE};

use crate::shared::Geometry;
use crate::wm::decorations::CursorKind;
use crate::wm::moveresize::ResizeDirection;
use crate::wm::server::{
    Atom, ButtonEvent, ButtonKind, ClientAttributes, ClientMessage, Colormap, ConfigMask, ConfigureRequest,
    CrossingEvent, KeyEvent, MotionEvent, ServerEvent, StackMode, Timestamp, Window, WindowChanges,
    WindowServer,
};

const X11_TOKEN: mio::Token = mio::Token(0);

/// Glyphs from the core cursor font
mod glyph {
    pub const LEFT_PTR: u16 = 68;
    pub const FLEUR: u16 = 52;
    pub const TOP_LEFT_CORNER: u16 = 134;
    pub const TOP_SIDE: u16 = 138;
    pub const TOP_RIGHT_CORNER: u16 = 136;
    pub const RIGHT_SIDE: u16 = 96;
    pub const BOTTOM_RIGHT_CORNER: u16 = 14;
    pub const BOTTOM_SIDE: u16 = 16;
    pub const BOTTOM_LEFT_CORNER: u16 = 12;
    pub const LEFT_SIDE: u16 = 70;
}

/// Cursors created once at startup
#[derive(Debug)]
struct Cursors {
    default: Cursor,
    moving: Cursor,
    /// Clockwise from the top-left corner
    resize: [Cursor; 8],
}

impl Cursors {
    fn new(conn: &RustConnection) -> Result<Self> {
        let font = conn.generate_id()?;
        conn.open_font(font, b"cursor")?;

        let create = |glyph: u16| -> Result<Cursor> {
            let cursor = conn.generate_id()?;
            conn.create_glyph_cursor(cursor, font, font, glyph, glyph + 1, 0, 0, 0, 0xffff, 0xffff, 0xffff)?;
            Ok(cursor)
        };

        let cursors = Self {
            default: create(glyph::LEFT_PTR)?,
            moving: create(glyph::FLEUR)?,
            resize: [
                create(glyph::TOP_LEFT_CORNER)?,
                create(glyph::TOP_SIDE)?,
                create(glyph::TOP_RIGHT_CORNER)?,
                create(glyph::RIGHT_SIDE)?,
                create(glyph::BOTTOM_RIGHT_CORNER)?,
                create(glyph::BOTTOM_SIDE)?,
                create(glyph::BOTTOM_LEFT_CORNER)?,
                create(glyph::LEFT_SIDE)?,
            ],
        };
        conn.close_font(font)?;
        Ok(cursors)
    }

    fn get(&self, kind: CursorKind) -> Cursor {
        match kind {
            CursorKind::Default => self.default,
            CursorKind::Move => self.moving,
            CursorKind::Resize(direction) => self.resize[match direction {
                ResizeDirection::TopLeft => 0,
                ResizeDirection::Top => 1,
                ResizeDirection::TopRight => 2,
                ResizeDirection::Right => 3,
                ResizeDirection::BottomRight => 4,
                ResizeDirection::Bottom => 5,
                ResizeDirection::BottomLeft => 6,
                ResizeDirection::Left => 7,
            }],
        }
    }
}

/// Keycode/keysym table fetched from the server
#[derive(Debug, Clone, Default)]
pub struct KeyboardMap {
    min_keycode: u8,
    per_keycode: usize,
    keysyms: Vec<u32>,
}

impl KeyboardMap {
    pub fn new(min_keycode: u8, per_keycode: u8, keysyms: Vec<u32>) -> Self {
        Self { min_keycode, per_keycode: per_keycode as usize, keysyms }
    }

    fn fetch(conn: &RustConnection) -> Result<Self> {
        let setup = conn.setup();
        let count = setup.max_keycode - setup.min_keycode + 1;
        let reply = conn
            .get_keyboard_mapping(setup.min_keycode, count)?
            .reply()
            .context("Failed to read keyboard mapping")?;
        Ok(Self::new(setup.min_keycode, reply.keysyms_per_keycode, reply.keysyms))
    }

    /// Keycodes producing `keysym`, shifted or not
    pub fn keycodes_for(&self, keysym: u32) -> Vec<u8> {
        if self.per_keycode == 0 {
            return Vec::new();
        }
        self.keysyms
            .chunks(self.per_keycode)
            .enumerate()
            .filter(|(_, syms)| syms.iter().take(2).any(|s| *s == keysym))
            .map(|(i, _)| self.min_keycode.wrapping_add(i as u8))
            .collect()
    }

    /// Unshifted keysym of `keycode`, 0 if none
    pub fn keysym_for(&self, keycode: u8) -> u32 {
        let Some(index) = keycode.checked_sub(self.min_keycode) else {
            return 0;
        };
        self.keysyms.get(index as usize * self.per_keycode).copied().unwrap_or(0)
    }
}

/// An X11 display connection acting as the window manager of one screen
pub struct X11Server {
    conn: RustConnection,
    root: Window,
    screen_size: (u32, u32),
    depth: u8,
    shape: bool,
    cursors: Cursors,
    keyboard: KeyboardMap,
    /// Owner of `WM_Sn` and target of `_NET_SUPPORTING_WM_CHECK`
    check_window: Window,
    queue: VecDeque<ServerEvent>,
    poll: mio::Poll,
    poll_events: mio::Events,
}

impl X11Server {
    /// Connect to `$DISPLAY` and take over window management of the
    /// default screen. Fails if another manager is running.
    pub fn connect() -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None).context("Failed to connect to X server")?;
        let screen = &conn.setup().roots[screen_num];
        let root = screen.root;
        let screen_size = (screen.width_in_pixels as u32, screen.height_in_pixels as u32);
        let depth = screen.root_depth;
        info!("Connected to X server, screen {}, root window 0x{:x}", screen_num, root);
        info!("Screen size: {}x{}", screen_size.0, screen_size.1);

        let check_window = Self::become_manager(&conn, root, depth, screen_num)?;

        let shape = conn.extension_information(shape::X11_EXTENSION_NAME)?.is_some();
        debug!("Shape extension present: {}", shape);

        let cursors = Cursors::new(&conn)?;
        conn.change_window_attributes(root, &ChangeWindowAttributesAux::new().cursor(cursors.default))?;
        let keyboard = KeyboardMap::fetch(&conn)?;

        let poll = mio::Poll::new().context("Failed to create mio Poll")?;
        let fd: RawFd = conn.stream().as_raw_fd();
        poll.registry()
            .register(&mut mio::unix::SourceFd(&fd), X11_TOKEN, mio::Interest::READABLE)
            .context("Failed to register X11 FD with mio")?;
        conn.flush()?;

        Ok(Self {
            conn,
            root,
            screen_size,
            depth,
            shape,
            cursors,
            keyboard,
            check_window,
            queue: VecDeque::new(),
            poll,
            poll_events: mio::Events::with_capacity(1),
        })
    }

    /// Claim `WM_Sn`, select substructure redirection on the root and set
    /// up the supporting window
    fn become_manager(conn: &RustConnection, root: Window, depth: u8, screen_num: usize) -> Result<Window> {
        let selection = conn
            .intern_atom(false, format!("WM_S{}", screen_num).as_bytes())?
            .reply()
            .context("Failed to intern WM selection atom")?
            .atom;
        let owner = conn.get_selection_owner(selection)?.reply()?.owner;
        if owner != NONE {
            bail!("Another window manager is already running (window 0x{:x})", owner);
        }

        let check_window = conn.generate_id()?;
        conn.create_window(
            depth,
            check_window,
            root,
            -100,
            -100,
            1,
            1,
            0,
            WindowClass::INPUT_OUTPUT,
            x11rb::COPY_FROM_PARENT,
            &CreateWindowAux::new().override_redirect(1),
        )?;
        conn.set_selection_owner(check_window, selection, CURRENT_TIME)?
            .check()
            .context("Failed to set WM selection owner")?;

        let mask = EventMask::SUBSTRUCTURE_REDIRECT
            | EventMask::SUBSTRUCTURE_NOTIFY
            | EventMask::BUTTON_PRESS
            | EventMask::BUTTON_RELEASE
            | EventMask::PROPERTY_CHANGE
            | EventMask::COLOR_MAP_CHANGE
            | EventMask::KEY_PRESS;
        conn.change_window_attributes(root, &ChangeWindowAttributesAux::new().event_mask(mask))?
            .check()
            .context("Failed to select events on root window - is another WM running?")?;

        let intern = |name: &str| -> Result<Atom> { Ok(conn.intern_atom(false, name.as_bytes())?.reply()?.atom) };
        let check = intern("_NET_SUPPORTING_WM_CHECK")?;
        let name = intern("_NET_WM_NAME")?;
        let utf8 = intern("UTF8_STRING")?;
        for window in [root, check_window] {
            conn.change_property32(PropMode::REPLACE, window, check, AtomEnum::WINDOW, &[check_window])?;
        }
        conn.change_property8(PropMode::REPLACE, check_window, name, utf8, b"stile")?;
        debug!("WM: Supporting window 0x{:x} owns WM_S{}", check_window, screen_num);
        Ok(check_window)
    }

    /// Read everything the connection has buffered into the queue
    fn fill(&mut self) -> Result<()> {
        while let Some(event) = self.conn.poll_for_event()? {
            if let Some(event) = decode(event) {
                self.queue.push_back(event);
            }
        }
        Ok(())
    }

    fn cursor(&self, kind: CursorKind) -> Cursor {
        self.cursors.get(kind)
    }
}

fn decode(event: Event) -> Option<ServerEvent> {
    let decoded = match event {
        Event::ConfigureRequest(e) => ServerEvent::ConfigureRequest(ConfigureRequest {
            window: e.window,
            x: e.x as i32,
            y: e.y as i32,
            width: e.width as u32,
            height: e.height as u32,
            border_width: e.border_width as u32,
            sibling: e.sibling,
            stack_mode: stack_mode_from(e.stack_mode),
            value_mask: ConfigMask::from_bits_truncate(u16::from(e.value_mask)),
        }),
        Event::MapRequest(e) => ServerEvent::MapRequest { window: e.window },
        Event::PropertyNotify(e) => ServerEvent::PropertyNotify { window: e.window, atom: e.atom },
        Event::ClientMessage(e) => ServerEvent::ClientMessage(ClientMessage {
            window: e.window,
            message_type: e.type_,
            format: e.format,
            data: e.data.as_data32(),
        }),
        Event::UnmapNotify(e) => ServerEvent::UnmapNotify { window: e.window },
        Event::Expose(e) => ServerEvent::Expose {
            window: e.window,
            area: Geometry::new(e.x as i32, e.y as i32, e.width as u32, e.height as u32),
            count: e.count,
        },
        Event::ColormapNotify(e) => ServerEvent::ColormapNotify {
            window: e.window,
            colormap: e.colormap,
            new: e.new,
        },
        Event::DestroyNotify(e) => ServerEvent::DestroyNotify { window: e.window },
        Event::SelectionClear(e) => ServerEvent::SelectionClear {
            owner: e.owner,
            selection: e.selection,
            time: e.time,
        },
        Event::ResizeRequest(e) => ServerEvent::ResizeRequest {
            window: e.window,
            width: e.width as u32,
            height: e.height as u32,
        },
        Event::MotionNotify(e) => ServerEvent::MotionNotify(MotionEvent {
            window: e.event,
            x: e.event_x as i32,
            y: e.event_y as i32,
            root_x: e.root_x as i32,
            root_y: e.root_y as i32,
            is_hint: e.detail == Motion::HINT,
            time: e.time,
        }),
        Event::ButtonPress(e) => ServerEvent::Button(button_event(ButtonKind::Press, &e)),
        Event::ButtonRelease(e) => ServerEvent::Button(button_event(ButtonKind::Release, &e)),
        Event::KeyPress(e) => ServerEvent::KeyPress(key_event(&e)),
        Event::KeyRelease(e) => ServerEvent::KeyRelease(key_event(&e)),
        Event::EnterNotify(e) => ServerEvent::EnterNotify(crossing_event(&e)),
        Event::LeaveNotify(e) => ServerEvent::LeaveNotify(crossing_event(&e)),
        Event::ShapeNotify(e) => ServerEvent::ShapeNotify { window: e.affected_window },
        Event::ConfigureNotify(e) => ServerEvent::ConfigureNotify { window: e.window },
        Event::CreateNotify(e) => ServerEvent::CreateNotify { window: e.window },
        Event::MapNotify(e) => ServerEvent::MapNotify { window: e.window },
        Event::ReparentNotify(e) => ServerEvent::ReparentNotify { window: e.window },
        Event::GraphicsExposure(_) => ServerEvent::GraphicsExposure,
        Event::NoExposure(_) => ServerEvent::NoExposure,
        Event::Error(e) => {
            match e.error_kind {
                // Requests racing with windows going away
                ErrorKind::Window | ErrorKind::Drawable | ErrorKind::Match => {
                    trace!("X11 error (expected for destroyed windows): {:?}", e);
                }
                _ => warn!("X11 error: {:?}", e),
            }
            return None;
        }
        Event::Unknown(bytes) => ServerEvent::Unknown(bytes.first().map_or(0, |b| b & 0x7f)),
        other => {
            trace!("Undecoded event {:?}", other);
            ServerEvent::Unknown(0)
        }
    };
    Some(decoded)
}

fn stack_mode_from(mode: xproto::StackMode) -> StackMode {
    match mode {
        xproto::StackMode::BELOW => StackMode::Below,
        xproto::StackMode::TOP_IF => StackMode::TopIf,
        xproto::StackMode::BOTTOM_IF => StackMode::BottomIf,
        xproto::StackMode::OPPOSITE => StackMode::Opposite,
        _ => StackMode::Above,
    }
}

fn stack_mode_to(mode: StackMode) -> xproto::StackMode {
    match mode {
        StackMode::Above => xproto::StackMode::ABOVE,
        StackMode::Below => xproto::StackMode::BELOW,
        StackMode::TopIf => xproto::StackMode::TOP_IF,
        StackMode::BottomIf => xproto::StackMode::BOTTOM_IF,
        StackMode::Opposite => xproto::StackMode::OPPOSITE,
    }
}

fn button_event(kind: ButtonKind, e: &ButtonPressEvent) -> ButtonEvent {
    ButtonEvent {
        kind,
        window: e.event,
        button: e.detail,
        x: e.event_x as i32,
        y: e.event_y as i32,
        root_x: e.root_x as i32,
        root_y: e.root_y as i32,
        state: u16::from(e.state),
        time: e.time,
    }
}

fn key_event(e: &KeyPressEvent) -> KeyEvent {
    KeyEvent {
        window: e.event,
        keycode: e.detail,
        state: u16::from(e.state),
        root_x: e.root_x as i32,
        root_y: e.root_y as i32,
        time: e.time,
    }
}

fn crossing_event(e: &EnterNotifyEvent) -> CrossingEvent {
    CrossingEvent {
        window: e.event,
        x: e.event_x as i32,
        y: e.event_y as i32,
        root_x: e.root_x as i32,
        root_y: e.root_y as i32,
    }
}

/// Turn an X11 error reply into `None`; connection failures stay errors
fn checked<T>(reply: Result<T, ReplyError>) -> Result<Option<T>> {
    match reply {
        Ok(value) => Ok(Some(value)),
        Err(ReplyError::X11Error(e)) => {
            trace!("Request failed: {:?}", e.error_kind);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

impl WindowServer for X11Server {
    fn root(&self) -> Window {
        self.root
    }

    fn screen_size(&self) -> (u32, u32) {
        self.screen_size
    }

    fn has_shape(&self) -> bool {
        self.shape
    }

    fn pending(&mut self) -> Result<usize> {
        self.conn.flush()?;
        self.fill()?;
        Ok(self.queue.len())
    }

    fn wait_readable(&mut self, timeout: Duration) -> Result<bool> {
        if self.pending()? > 0 {
            return Ok(true);
        }
        if let Err(e) = self.poll.poll(&mut self.poll_events, Some(timeout)) {
            if e.kind() != std::io::ErrorKind::Interrupted {
                return Err(e).context("X11 socket poll failed");
            }
        }
        self.fill()?;
        Ok(!self.queue.is_empty())
    }

    fn next_event(&mut self) -> Result<ServerEvent> {
        self.conn.flush()?;
        loop {
            if let Some(event) = self.queue.pop_front() {
                return Ok(event);
            }
            let event = self.conn.wait_for_event()?;
            if let Some(event) = decode(event) {
                return Ok(event);
            }
        }
    }

    fn take_queued(&mut self, filter: &dyn Fn(&ServerEvent) -> bool) -> Result<Vec<ServerEvent>> {
        self.fill()?;
        let (taken, kept): (Vec<_>, Vec<_>) = self.queue.drain(..).partition(|e| filter(e));
        self.queue = kept.into();
        Ok(taken)
    }

    fn configure(&mut self, window: Window, changes: &WindowChanges) -> Result<()> {
        let aux = ConfigureWindowAux {
            x: changes.x,
            y: changes.y,
            width: changes.width,
            height: changes.height,
            border_width: changes.border_width,
            sibling: changes.sibling,
            stack_mode: changes.stack_mode.map(stack_mode_to),
        };
        self.conn.configure_window(window, &aux)?;
        Ok(())
    }

    fn map(&mut self, window: Window) -> Result<()> {
        self.conn.map_window(window)?;
        Ok(())
    }

    fn unmap(&mut self, window: Window) -> Result<()> {
        self.conn.unmap_window(window)?;
        Ok(())
    }

    fn restack(&mut self, windows: &[Window]) -> Result<()> {
        let Some((&top, rest)) = windows.split_first() else {
            return Ok(());
        };
        self.conn
            .configure_window(top, &ConfigureWindowAux::new().stack_mode(xproto::StackMode::ABOVE))?;
        let mut above = top;
        for &window in rest {
            self.conn.configure_window(
                window,
                &ConfigureWindowAux::new().sibling(above).stack_mode(xproto::StackMode::BELOW),
            )?;
            above = window;
        }
        Ok(())
    }

    fn define_cursor(&mut self, window: Window, cursor: CursorKind) -> Result<()> {
        let cursor = self.cursor(cursor);
        self.conn
            .change_window_attributes(window, &ChangeWindowAttributesAux::new().cursor(cursor))?;
        Ok(())
    }

    fn send_configure_notify(&mut self, window: Window, geometry: Geometry) -> Result<()> {
        let event = ConfigureNotifyEvent {
            response_type: CONFIGURE_NOTIFY_EVENT,
            sequence: 0,
            event: window,
            window,
            above_sibling: NONE,
            x: geometry.x as i16,
            y: geometry.y as i16,
            width: geometry.width as u16,
            height: geometry.height as u16,
            border_width: 0,
            override_redirect: false,
        };
        self.conn.send_event(false, window, EventMask::STRUCTURE_NOTIFY, event)?;
        Ok(())
    }

    fn apply_shape(&mut self, frame: Window, content: Window, offset: (i32, i32)) -> Result<()> {
        if !self.shape {
            return Ok(());
        }
        let shaped = checked(self.conn.shape_query_extents(content)?.reply())?.is_some_and(|r| r.bounding_shaped);
        if shaped {
            self.conn.shape_combine(
                shape::SO::SET,
                shape::SK::BOUNDING,
                shape::SK::BOUNDING,
                frame,
                offset.0 as i16,
                offset.1 as i16,
                content,
            )?;
        } else {
            self.conn.shape_mask(shape::SO::SET, shape::SK::BOUNDING, frame, 0, 0, NONE)?;
        }
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        self.conn.get_input_focus()?.reply()?;
        Ok(())
    }

    fn grab_server(&mut self) -> Result<()> {
        self.conn.grab_server()?;
        Ok(())
    }

    fn ungrab_server(&mut self) -> Result<()> {
        self.conn.ungrab_server()?;
        Ok(())
    }

    fn replay_pointer(&mut self, time: Timestamp) -> Result<()> {
        self.conn.allow_events(Allow::REPLAY_POINTER, time)?;
        Ok(())
    }

    fn grab_pointer(&mut self, window: Window, cursor: CursorKind) -> Result<bool> {
        let mask = EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE | EventMask::POINTER_MOTION;
        let reply = self
            .conn
            .grab_pointer(false, window, mask, GrabMode::ASYNC, GrabMode::ASYNC, NONE, self.cursor(cursor), CURRENT_TIME)?
            .reply()?;
        Ok(reply.status == GrabStatus::SUCCESS)
    }

    fn ungrab_pointer(&mut self) -> Result<()> {
        self.conn.ungrab_pointer(CURRENT_TIME)?;
        Ok(())
    }

    fn grab_keyboard(&mut self, window: Window) -> Result<bool> {
        let reply = self
            .conn
            .grab_keyboard(true, window, CURRENT_TIME, GrabMode::ASYNC, GrabMode::ASYNC)?
            .reply()?;
        Ok(reply.status == GrabStatus::SUCCESS)
    }

    fn ungrab_keyboard(&mut self) -> Result<()> {
        self.conn.ungrab_keyboard(CURRENT_TIME)?;
        Ok(())
    }

    fn grab_key(&mut self, window: Window, modifiers: u16, keycode: u8) -> Result<()> {
        self.conn
            .grab_key(true, window, ModMask::from(modifiers), keycode, GrabMode::ASYNC, GrabMode::ASYNC)?;
        Ok(())
    }

    fn keycodes_for(&mut self, keysym: u32) -> Result<Vec<u8>> {
        Ok(self.keyboard.keycodes_for(keysym))
    }

    fn keysym_for(&mut self, keycode: u8) -> Result<u32> {
        Ok(self.keyboard.keysym_for(keycode))
    }

    fn set_input_focus(&mut self, window: Window, time: Timestamp) -> Result<()> {
        self.conn.set_input_focus(InputFocus::POINTER_ROOT, window, time)?;
        Ok(())
    }

    fn install_colormap(&mut self, colormap: Colormap) -> Result<()> {
        self.conn.install_colormap(colormap)?;
        Ok(())
    }

    fn query_tree(&mut self) -> Result<Vec<Window>> {
        let children = self.conn.query_tree(self.root)?.reply()?.children;
        Ok(children.into_iter().filter(|w| *w != self.check_window).collect())
    }

    fn attributes(&mut self, window: Window) -> Result<Option<ClientAttributes>> {
        let attributes = self.conn.get_window_attributes(window)?;
        let geometry = self.conn.get_geometry(window)?;
        let (Some(attributes), Some(geometry)) = (checked(attributes.reply())?, checked(geometry.reply())?) else {
            return Ok(None);
        };
        Ok(Some(ClientAttributes {
            override_redirect: attributes.override_redirect,
            viewable: attributes.map_state == MapState::VIEWABLE,
            geometry: Geometry::new(
                geometry.x as i32,
                geometry.y as i32,
                geometry.width as u32,
                geometry.height as u32,
            ),
            border_width: geometry.border_width as u32,
            colormap: attributes.colormap,
        }))
    }

    fn create_frame(&mut self, geometry: Geometry, background: u32) -> Result<Window> {
        let frame = self.conn.generate_id()?;
        // No SUBSTRUCTURE_NOTIFY: content unmap/destroy arrive once, through
        // the content's own structure events
        let mask = EventMask::SUBSTRUCTURE_REDIRECT
            | EventMask::BUTTON_PRESS
            | EventMask::BUTTON_RELEASE
            | EventMask::POINTER_MOTION
            | EventMask::EXPOSURE
            | EventMask::ENTER_WINDOW
            | EventMask::LEAVE_WINDOW
            | EventMask::KEY_PRESS;
        self.conn.create_window(
            self.depth,
            frame,
            self.root,
            geometry.x as i16,
            geometry.y as i16,
            geometry.width.max(1) as u16,
            geometry.height.max(1) as u16,
            0,
            WindowClass::INPUT_OUTPUT,
            x11rb::COPY_FROM_PARENT,
            &CreateWindowAux::new()
                .background_pixel(background)
                .override_redirect(1)
                .event_mask(mask)
                .cursor(self.cursors.default),
        )?;
        trace!("Created frame 0x{:x} at {:?}", frame, geometry);
        Ok(frame)
    }

    fn adopt(&mut self, content: Window, frame: Window, x: i32, y: i32) -> Result<()> {
        self.conn.change_save_set(SetMode::INSERT, content)?;
        self.conn
            .configure_window(content, &ConfigureWindowAux::new().border_width(0))?;
        self.conn.reparent_window(content, frame, x as i16, y as i16)?;
        let mask = EventMask::PROPERTY_CHANGE | EventMask::STRUCTURE_NOTIFY | EventMask::COLOR_MAP_CHANGE;
        self.conn
            .change_window_attributes(content, &ChangeWindowAttributesAux::new().event_mask(mask))?;
        // Clicks on the content are replayed after focusing
        self.conn.grab_button(
            true,
            content,
            EventMask::BUTTON_PRESS,
            GrabMode::SYNC,
            GrabMode::ASYNC,
            NONE,
            NONE,
            ButtonIndex::ANY,
            ModMask::ANY,
        )?;
        if self.shape {
            self.conn.shape_select_input(content, true)?;
        }
        Ok(())
    }

    fn release(&mut self, content: Window, x: i32, y: i32) -> Result<()> {
        self.conn.ungrab_button(ButtonIndex::ANY, content, ModMask::ANY)?;
        self.conn.reparent_window(content, self.root, x as i16, y as i16)?;
        self.conn.map_window(content)?;
        self.conn.change_save_set(SetMode::DELETE, content)?;
        Ok(())
    }

    fn destroy_window(&mut self, window: Window) -> Result<()> {
        self.conn.destroy_window(window)?;
        Ok(())
    }

    fn kill_client(&mut self, window: Window) -> Result<()> {
        self.conn.kill_client(window)?;
        Ok(())
    }

    fn send_client_message(&mut self, window: Window, message_type: Atom, data: [u32; 5]) -> Result<()> {
        let event = ClientMessageEvent::new(32, window, message_type, data);
        self.conn.send_event(false, window, EventMask::NO_EVENT, event)?;
        Ok(())
    }

    fn intern_atom(&mut self, name: &str) -> Result<Atom> {
        Ok(self
            .conn
            .intern_atom(false, name.as_bytes())?
            .reply()
            .with_context(|| format!("Failed to intern {}", name))?
            .atom)
    }

    fn get_property32(&mut self, window: Window, property: Atom) -> Result<Vec<u32>> {
        let reply = checked(self.conn.get_property(false, window, property, AtomEnum::ANY, 0, 1024)?.reply())?;
        Ok(reply
            .and_then(|r| r.value32().map(|values| values.collect()))
            .unwrap_or_default())
    }

    fn get_text(&mut self, window: Window, property: Atom) -> Result<Option<String>> {
        let reply = checked(self.conn.get_property(false, window, property, AtomEnum::ANY, 0, 1024)?.reply())?;
        Ok(reply
            .filter(|r| r.format == 8 && !r.value.is_empty())
            .map(|r| String::from_utf8_lossy(&r.value).into_owned()))
    }

    fn set_property32(&mut self, window: Window, property: Atom, kind: Atom, values: &[u32]) -> Result<()> {
        self.conn
            .change_property32(PropMode::REPLACE, window, property, kind, values)?;
        Ok(())
    }

    fn delete_property(&mut self, window: Window, property: Atom) -> Result<()> {
        self.conn.delete_property(window, property)?;
        Ok(())
    }

    fn atom_name(&mut self, atom: Atom) -> Result<String> {
        Ok(match checked(self.conn.get_atom_name(atom)?.reply())? {
            Some(reply) => String::from_utf8_lossy(&reply.name).into_owned(),
            None => format!("#{atom}"),
        })
    }
}

impl Drop for X11Server {
    fn drop(&mut self) {
        let _ = self.conn.destroy_window(self.check_window);
        let _ = self.conn.flush();
    }
}
