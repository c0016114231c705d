use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::traits::{MessageEvent, MessageListener, Window, WindowId, WindowRef};

static NEXT_WINDOW_ID: AtomicU64 = AtomicU64::new(1);

/// A message recorded by [`SimWindow::post_message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    pub data: String,
    pub target_origin: String,
}

/// In-memory window.
///
/// Children hold strong references to their parents, never the reverse, so a
/// tree of `SimWindow`s is dropped as soon as its leaves are.
pub struct SimWindow {
    id: WindowId,
    parent: Option<Rc<SimWindow>>,
    name: RefCell<String>,
    hash: RefCell<String>,
    closed: Cell<bool>,
    posted: RefCell<Vec<PostedMessage>>,
    listeners: RefCell<Vec<MessageListener>>,
    local_events: RefCell<Vec<String>>,
}

impl SimWindow {
    fn with_parent(parent: Option<Rc<SimWindow>>) -> Rc<Self> {
        Rc::new(Self {
            id: WindowId::new(NEXT_WINDOW_ID.fetch_add(1, Ordering::Relaxed)),
            parent,
            name: RefCell::new(String::new()),
            hash: RefCell::new(String::new()),
            closed: Cell::new(false),
            posted: RefCell::new(Vec::new()),
            listeners: RefCell::new(Vec::new()),
            local_events: RefCell::new(Vec::new()),
        })
    }

    /// Create a top-level window.
    pub fn top() -> Rc<Self> {
        Self::with_parent(None)
    }

    /// Create a window nested directly inside `parent`.
    pub fn child_of(parent: &Rc<SimWindow>) -> Rc<Self> {
        Self::with_parent(Some(Rc::clone(parent)))
    }

    /// Build a nesting chain `[top, ..., leaf]` with `nesting` frames below top.
    ///
    /// The returned vector always has `nesting + 1` windows.
    pub fn chain(nesting: usize) -> Vec<Rc<Self>> {
        let mut windows = Vec::with_capacity(nesting + 1);
        let mut current = Self::top();
        windows.push(Rc::clone(&current));
        for _ in 0..nesting {
            current = Self::child_of(&current);
            windows.push(Rc::clone(&current));
        }
        windows
    }

    /// Set the window name.
    pub fn set_name(&self, name: impl Into<String>) {
        *self.name.borrow_mut() = name.into();
    }

    /// Set the location hash.
    pub fn set_location_hash(&self, hash: impl Into<String>) {
        *self.hash.borrow_mut() = hash.into();
    }

    /// Mark the window as closed. Later posts are dropped.
    pub fn close(&self) {
        self.closed.set(true);
    }

    /// Whether [`SimWindow::close`] was called.
    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }

    /// Messages posted to this window, oldest first.
    pub fn posted(&self) -> Vec<PostedMessage> {
        self.posted.borrow().clone()
    }

    /// Drain the posted-message record.
    pub fn take_posted(&self) -> Vec<PostedMessage> {
        std::mem::take(&mut *self.posted.borrow_mut())
    }

    /// Number of installed message listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Local events dispatched on this window, oldest first.
    pub fn local_events(&self) -> Vec<String> {
        self.local_events.borrow().clone()
    }

    /// Whether a local event with this name was dispatched.
    pub fn has_fired(&self, event: &str) -> bool {
        self.local_events.borrow().iter().any(|e| e == event)
    }

    /// Deliver a message event to every installed listener.
    ///
    /// Returns the number of listeners invoked. Listeners may install further
    /// listeners while running; those only see later events.
    pub fn deliver(&self, event: &MessageEvent) -> usize {
        let listeners: Vec<MessageListener> = self.listeners.borrow().clone();
        for listener in &listeners {
            listener(event);
        }
        listeners.len()
    }

    /// Deliver a string payload from `source`.
    pub fn deliver_text(&self, source: Option<WindowId>, data: impl Into<String>) -> usize {
        self.deliver(&MessageEvent::text(source, data))
    }
}

impl Window for SimWindow {
    fn id(&self) -> WindowId {
        self.id
    }

    fn parent(&self) -> Option<WindowRef> {
        self.parent
            .as_ref()
            .map(|parent| Rc::clone(parent) as WindowRef)
    }

    fn post_message(&self, data: &str, target_origin: &str) {
        if self.closed.get() {
            tracing::trace!(window = %self.id, "post to closed window dropped");
            return;
        }
        self.posted.borrow_mut().push(PostedMessage {
            data: data.to_string(),
            target_origin: target_origin.to_string(),
        });
    }

    fn add_message_listener(&self, listener: MessageListener) {
        self.listeners.borrow_mut().push(listener);
    }

    fn name(&self) -> String {
        self.name.borrow().clone()
    }

    fn location_hash(&self) -> String {
        self.hash.borrow().clone()
    }

    fn dispatch_local_event(&self, event: &str) {
        self.local_events.borrow_mut().push(event.to_string());
    }
}

impl fmt::Debug for SimWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimWindow")
            .field("id", &self.id)
            .field("parent", &self.parent.as_ref().map(|p| p.id))
            .field("closed", &self.closed.get())
            .finish()
    }
}
