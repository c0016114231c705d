//! The per-frame messaging session.
//!
//! [`FrameContext`] ties a resolved [`Identity`] to an installed
//! [`Dispatcher`] and exposes the request/observe verbs creatives use.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use serde::de::DeserializeOwned;
use serde::Serialize;
use xframe_envelope::{
    encode_envelope_with_marker, EmbedContextPayload, EmbedSize, EmbedState, Envelope,
    IntersectionPayload, MessageType, ResizeOutcome,
};
use xframe_window::{MessageEvent, WindowRef};

#[cfg(feature = "schema")]
use xframe_schema::SchemaRegistry;

use crate::boot::{BootData, ContextMetadata};
use crate::config::ContextConfig;
use crate::dispatch::{DispatchOutcome, Dispatcher, LoopState};
use crate::error::Result;
use crate::identity::{resolve_identity, Identity};
use crate::registry::{CallbackRegistry, Registration};
use crate::sentinel::Sentinel;

type MetadataObserver = Rc<dyn Fn(&ContextMetadata)>;

#[derive(Default)]
struct MetadataObservers {
    next_id: u64,
    by_id: BTreeMap<u64, MetadataObserver>,
}

impl MetadataObservers {
    fn snapshot(&self) -> Vec<MetadataObserver> {
        self.by_id.values().cloned().collect()
    }
}

/// Handle for one [`FrameContext::on_metadata`] observer.
///
/// Dropping it leaves the observer installed. Call
/// [`unregister`](Self::unregister) to remove it.
#[derive(Debug, Clone)]
pub struct MetadataSubscription {
    observers: Weak<RefCell<MetadataObservers>>,
    id: u64,
}

impl MetadataSubscription {
    pub fn is_active(&self) -> bool {
        self.observers
            .upgrade()
            .is_some_and(|observers| observers.borrow().by_id.contains_key(&self.id))
    }

    /// Remove the observer. Returns true when this call removed it.
    pub fn unregister(&self) -> bool {
        let Some(observers) = self.observers.upgrade() else {
            return false;
        };
        let removed = observers.borrow_mut().by_id.remove(&self.id);
        let was_active = removed.is_some();
        drop(removed);
        if was_active {
            tracing::debug!(observer = self.id, "metadata observer unregistered");
        }
        was_active
    }
}

/// Configures and constructs a [`FrameContext`].
pub struct FrameContextBuilder {
    window: WindowRef,
    config: ContextConfig,
    boot: Option<BootData>,
    #[cfg(feature = "schema")]
    schemas: Option<Rc<SchemaRegistry>>,
}

impl FrameContextBuilder {
    pub fn new(window: WindowRef) -> Self {
        Self {
            window,
            config: ContextConfig::default(),
            boot: None,
            #[cfg(feature = "schema")]
            schemas: None,
        }
    }

    pub fn config(mut self, config: ContextConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `boot` instead of reading boot data from the window.
    pub fn boot_data(mut self, boot: BootData) -> Self {
        self.boot = Some(boot);
        self
    }

    /// Drop inbound messages that fail their type's schema.
    #[cfg(feature = "schema")]
    pub fn schema_registry(mut self, schemas: Rc<SchemaRegistry>) -> Self {
        self.schemas = Some(schemas);
        self
    }

    /// Resolve identity, install the listener and announce readiness.
    ///
    /// Any error leaves the window untouched: no listener, no ready event.
    pub fn build(self) -> Result<FrameContext> {
        let Self {
            window,
            config,
            boot,
            #[cfg(feature = "schema")]
            schemas,
        } = self;

        config.validate()?;
        let boot = match boot {
            Some(boot) => boot,
            None => BootData::from_window(window.as_ref())?,
        };
        let identity = resolve_identity(&window, boot.sentinel(), &config)?;

        let registry = CallbackRegistry::new();
        let dispatcher = Dispatcher::new(
            identity.target_id(),
            identity.sentinel().clone(),
            registry.clone(),
            &config,
        );
        #[cfg(feature = "schema")]
        let dispatcher = match schemas {
            Some(schemas) => dispatcher.with_schema_registry(schemas),
            None => dispatcher,
        };
        let dispatcher = Rc::new(dispatcher);
        dispatcher.install(window.as_ref());

        let metadata = ContextMetadata::from(&boot.context);
        window.dispatch_local_event(&config.ready_event);
        tracing::info!(
            depth = identity.depth(),
            target = %identity.target_id(),
            event = %config.ready_event,
            "frame context ready"
        );

        Ok(FrameContext {
            window,
            config,
            boot,
            identity,
            metadata: Rc::new(RefCell::new(metadata)),
            metadata_observers: Rc::new(RefCell::new(MetadataObservers::default())),
            registry,
            dispatcher,
        })
    }
}

/// A frame's messaging session with its target ancestor.
///
/// Not `Send`: the context lives on the frame's event loop thread.
pub struct FrameContext {
    window: WindowRef,
    config: ContextConfig,
    boot: BootData,
    identity: Identity,
    metadata: Rc<RefCell<ContextMetadata>>,
    metadata_observers: Rc<RefCell<MetadataObservers>>,
    registry: CallbackRegistry,
    dispatcher: Rc<Dispatcher>,
}

impl FrameContext {
    /// Build a context from the window's own boot data with default config.
    pub fn new(window: WindowRef) -> Result<Self> {
        Self::builder(window).build()
    }

    pub fn with_config(window: WindowRef, config: ContextConfig) -> Result<Self> {
        Self::builder(window).config(config).build()
    }

    pub fn builder(window: WindowRef) -> FrameContextBuilder {
        FrameContextBuilder::new(window)
    }

    pub fn sentinel(&self) -> &Sentinel {
        self.identity.sentinel()
    }

    pub fn depth(&self) -> usize {
        self.identity.depth()
    }

    pub fn boot(&self) -> &BootData {
        &self.boot
    }

    /// Current metadata: boot data overlaid with handshake updates.
    pub fn metadata(&self) -> ContextMetadata {
        self.metadata.borrow().clone()
    }

    pub fn window(&self) -> &WindowRef {
        &self.window
    }

    pub fn target_window(&self) -> &WindowRef {
        self.identity.target()
    }

    pub fn ancestors(&self) -> &[WindowRef] {
        self.identity.ancestors()
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn registry(&self) -> &CallbackRegistry {
        &self.registry
    }

    pub fn is_ready(&self) -> bool {
        self.dispatcher.state() == LoopState::Listening
    }

    /// Feed an event through the dispatch loop directly, as if the window
    /// had delivered it.
    pub fn handle_message(&self, event: &MessageEvent) -> DispatchOutcome {
        self.dispatcher.handle_message(event)
    }

    /// Post `{ sentinel, type, ...payload }` to the target window.
    ///
    /// Encoding failures are logged and the message is dropped.
    pub fn send<T: Serialize + ?Sized>(&self, message_type: &str, payload: &T) {
        let wire = match encode_envelope_with_marker(
            &self.config.marker,
            message_type,
            self.sentinel().as_str(),
            payload,
        ) {
            Ok(wire) => wire,
            Err(err) => {
                tracing::warn!(message_type, error = %err, "failed to encode outbound message");
                return;
            }
        };
        tracing::trace!(message_type, "posting to target");
        self.target_window()
            .post_message(&wire, &self.config.target_origin);
    }

    /// Install a raw callback for `message_type`, replacing any previous one.
    pub fn register_callback<F>(&self, message_type: &str, callback: F) -> Registration
    where
        F: Fn(&Envelope) + 'static,
    {
        self.registry.register(message_type, callback)
    }

    fn register_typed<T, F>(&self, message_type: MessageType, callback: F) -> Registration
    where
        T: DeserializeOwned,
        F: Fn(&T) + 'static,
    {
        self.registry
            .register(message_type.as_str(), move |envelope: &Envelope| {
                match envelope.payload::<T>() {
                    Ok(payload) => callback(&payload),
                    Err(err) => tracing::debug!(
                        message_type = %message_type,
                        error = %err,
                        "dropping undecodable payload"
                    ),
                }
            })
    }

    /// Ask the host for page metadata.
    ///
    /// Each `embed-context` reply is merged into [`metadata`](Self::metadata)
    /// and then passed to every [`on_metadata`](Self::on_metadata) observer.
    pub fn request_metadata(&self) -> Registration {
        let metadata = Rc::clone(&self.metadata);
        let observers = Rc::clone(&self.metadata_observers);
        let registration = self.register_typed(
            MessageType::EmbedContext,
            move |update: &EmbedContextPayload| {
                let changed = metadata.borrow_mut().apply(update);
                tracing::debug!(changed, "metadata handshake reply");

                let snapshot = metadata.borrow().clone();
                let observers = observers.borrow().snapshot();
                for observer in observers {
                    observer(&snapshot);
                }
            },
        );
        self.send(MessageType::SendEmbedContext.as_str(), &());
        registration
    }

    /// Observe metadata updates delivered by [`request_metadata`](Self::request_metadata).
    ///
    /// Observers run in subscription order.
    pub fn on_metadata<F>(&self, callback: F) -> MetadataSubscription
    where
        F: Fn(&ContextMetadata) + 'static,
    {
        let mut observers = self.metadata_observers.borrow_mut();
        let id = observers.next_id;
        observers.next_id = observers.next_id.wrapping_add(1);
        observers.by_id.insert(id, Rc::new(callback));
        MetadataSubscription {
            observers: Rc::downgrade(&self.metadata_observers),
            id,
        }
    }

    /// Receive page visibility changes until unregistered.
    pub fn observe_page_visibility<F>(&self, callback: F) -> Registration
    where
        F: Fn(&EmbedState) + 'static,
    {
        let registration = self.register_typed(MessageType::EmbedState, callback);
        self.send(MessageType::SendEmbedState.as_str(), &());
        registration
    }

    /// Receive intersection batches until unregistered.
    pub fn observe_intersection<F>(&self, callback: F) -> Registration
    where
        F: Fn(&IntersectionPayload) + 'static,
    {
        let registration = self.register_typed(MessageType::Intersection, callback);
        self.send(MessageType::SendIntersections.as_str(), &());
        registration
    }

    /// Called when the host grants a resize. Register before
    /// [`request_resize`](Self::request_resize).
    pub fn on_resize_success<F>(&self, callback: F) -> Registration
    where
        F: Fn(ResizeOutcome) + 'static,
    {
        self.register_typed(MessageType::EmbedSizeChanged, move |outcome: &ResizeOutcome| {
            callback(*outcome)
        })
    }

    /// Called when the host refuses a resize.
    pub fn on_resize_denied<F>(&self, callback: F) -> Registration
    where
        F: Fn(ResizeOutcome) + 'static,
    {
        self.register_typed(MessageType::EmbedSizeDenied, move |outcome: &ResizeOutcome| {
            callback(*outcome)
        })
    }

    /// Ask the host to resize the frame. The answer, if any, arrives through
    /// the resize callbacks.
    pub fn request_resize(&self, height: f64, width: f64) {
        self.send(MessageType::EmbedSize.as_str(), &EmbedSize { width, height });
    }
}

impl fmt::Debug for FrameContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameContext")
            .field("window", &self.window.id())
            .field("identity", &self.identity)
            .field("registry", &self.registry)
            .field("ready", &self.is_ready())
            .finish()
    }
}
