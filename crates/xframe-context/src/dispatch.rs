//! The single inbound listener.
//!
//! Every protocol message for this frame passes through
//! [`Dispatcher::handle_message`], which filters by source window, marker and
//! sentinel before handing the envelope to the callback registry.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use xframe_envelope::{decode_envelope_with_marker, has_marker};
use xframe_window::{MessageEvent, MessageListener, Window, WindowId};

#[cfg(feature = "schema")]
use xframe_schema::SchemaRegistry;

use crate::config::ContextConfig;
use crate::registry::{CallbackRegistry, DispatchResult};
use crate::sentinel::Sentinel;

/// Listener lifecycle. `Listening` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Uninstalled,
    Listening,
}

/// What happened to one inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A callback ran to completion.
    Delivered,
    /// Valid protocol message with no callback for its type.
    NoCallback,
    /// The callback panicked; the panic was contained.
    CallbackPanicked,
    /// Sent by some window other than the target.
    RejectedSource,
    /// Not a string, missing the marker, or oversized.
    NotProtocol,
    /// Marker present but the body is not a JSON object with a type.
    Malformed,
    /// Sentinel absent or different from ours.
    SentinelMismatch,
    /// Failed the schema registered for its type.
    SchemaRejected,
}

impl DispatchOutcome {
    pub const fn as_str(self) -> &'static str {
        match self {
            DispatchOutcome::Delivered => "delivered",
            DispatchOutcome::NoCallback => "no-callback",
            DispatchOutcome::CallbackPanicked => "callback-panicked",
            DispatchOutcome::RejectedSource => "rejected-source",
            DispatchOutcome::NotProtocol => "not-protocol",
            DispatchOutcome::Malformed => "malformed",
            DispatchOutcome::SentinelMismatch => "sentinel-mismatch",
            DispatchOutcome::SchemaRejected => "schema-rejected",
        }
    }

    /// Whether the message reached the callback stage.
    pub const fn is_accepted(self) -> bool {
        matches!(
            self,
            DispatchOutcome::Delivered
                | DispatchOutcome::NoCallback
                | DispatchOutcome::CallbackPanicked
        )
    }
}

impl fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<DispatchResult> for DispatchOutcome {
    fn from(result: DispatchResult) -> Self {
        match result {
            DispatchResult::Delivered => DispatchOutcome::Delivered,
            DispatchResult::NoCallback => DispatchOutcome::NoCallback,
            DispatchResult::Panicked => DispatchOutcome::CallbackPanicked,
        }
    }
}

/// Filters inbound events and routes accepted envelopes to the registry.
pub struct Dispatcher {
    target: WindowId,
    sentinel: Sentinel,
    marker: String,
    max_message_len: usize,
    registry: CallbackRegistry,
    #[cfg(feature = "schema")]
    schemas: Option<Rc<SchemaRegistry>>,
    state: Cell<LoopState>,
}

impl Dispatcher {
    pub fn new(
        target: WindowId,
        sentinel: Sentinel,
        registry: CallbackRegistry,
        config: &ContextConfig,
    ) -> Self {
        Self {
            target,
            sentinel,
            marker: config.marker.clone(),
            max_message_len: config.max_message_len,
            registry,
            #[cfg(feature = "schema")]
            schemas: None,
            state: Cell::new(LoopState::Uninstalled),
        }
    }

    /// Validate accepted envelopes against `schemas` before dispatch.
    #[cfg(feature = "schema")]
    pub fn with_schema_registry(mut self, schemas: Rc<SchemaRegistry>) -> Self {
        self.schemas = Some(schemas);
        self
    }

    pub fn state(&self) -> LoopState {
        self.state.get()
    }

    pub fn target(&self) -> WindowId {
        self.target
    }

    pub fn registry(&self) -> &CallbackRegistry {
        &self.registry
    }

    /// Attach the listener to `window`. Only the first call installs;
    /// later calls return false.
    pub fn install(self: &Rc<Self>, window: &dyn Window) -> bool {
        if self.state.get() == LoopState::Listening {
            tracing::warn!(window = %window.id(), "dispatch loop already installed");
            return false;
        }

        let dispatcher = Rc::clone(self);
        let listener: MessageListener = Rc::new(move |event: &MessageEvent| {
            dispatcher.handle_message(event);
        });
        window.add_message_listener(listener);
        self.state.set(LoopState::Listening);

        tracing::debug!(
            window = %window.id(),
            target = %self.target,
            depth = self.sentinel.depth(),
            "dispatch loop listening"
        );
        true
    }

    /// Run one inbound event through the filters and, if it survives, the
    /// registry.
    pub fn handle_message(&self, event: &MessageEvent) -> DispatchOutcome {
        let outcome = self.route(event);
        tracing::trace!(outcome = %outcome, "inbound message handled");
        outcome
    }

    fn route(&self, event: &MessageEvent) -> DispatchOutcome {
        if event.source != Some(self.target) {
            return DispatchOutcome::RejectedSource;
        }

        let Some(data) = event.data_str() else {
            return DispatchOutcome::NotProtocol;
        };
        if data.len() > self.max_message_len || !has_marker(data, &self.marker) {
            return DispatchOutcome::NotProtocol;
        }

        let Some(envelope) = decode_envelope_with_marker(&self.marker, data) else {
            tracing::debug!(len = data.len(), "dropping undecodable protocol message");
            return DispatchOutcome::Malformed;
        };

        if envelope.sentinel() != Some(self.sentinel.as_str()) {
            return DispatchOutcome::SentinelMismatch;
        }

        let Some(message_type) = envelope.message_type() else {
            tracing::debug!("dropping protocol message without a type");
            return DispatchOutcome::Malformed;
        };

        #[cfg(feature = "schema")]
        if let Some(schemas) = &self.schemas {
            if let Err(err) = schemas.validate_envelope(&envelope) {
                tracing::debug!(message_type, error = %err, "dropping schema-invalid message");
                return DispatchOutcome::SchemaRejected;
            }
        }

        tracing::trace!(message_type, "dispatching");
        self.registry.dispatch(&envelope).into()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("target", &self.target)
            .field("sentinel", &self.sentinel)
            .field("marker", &self.marker)
            .field("state", &self.state.get())
            .field("registry", &self.registry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use serde_json::json;
    use xframe_envelope::encode_envelope;
    use xframe_window::SimWindow;

    use super::*;

    const SENTINEL: &str = "0-42";

    fn setup() -> (Rc<SimWindow>, Rc<SimWindow>, Rc<Dispatcher>) {
        let windows = SimWindow::chain(1);
        let (host, frame) = (Rc::clone(&windows[0]), Rc::clone(&windows[1]));
        let dispatcher = Rc::new(Dispatcher::new(
            host.id(),
            Sentinel::parse(SENTINEL).expect("valid sentinel"),
            CallbackRegistry::new(),
            &ContextConfig::default(),
        ));
        (host, frame, dispatcher)
    }

    fn wire(message_type: &str, sentinel: &str) -> String {
        encode_envelope(message_type, sentinel, &()).expect("encodes")
    }

    #[test]
    fn installs_exactly_once() {
        let (_host, frame, dispatcher) = setup();
        assert_eq!(dispatcher.state(), LoopState::Uninstalled);
        assert!(dispatcher.install(frame.as_ref()));
        assert!(!dispatcher.install(frame.as_ref()));
        assert_eq!(dispatcher.state(), LoopState::Listening);
        assert_eq!(frame.listener_count(), 1);
    }

    #[test]
    fn delivers_matching_messages() {
        let (host, _frame, dispatcher) = setup();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _registration = dispatcher.registry().register("embed-state", move |envelope| {
            sink.borrow_mut().push(envelope.get("pageHidden").cloned());
        });

        let data = encode_envelope("embed-state", SENTINEL, &json!({ "pageHidden": true }))
            .expect("encodes");
        let outcome = dispatcher.handle_message(&MessageEvent::text(Some(host.id()), data));

        assert_eq!(outcome, DispatchOutcome::Delivered);
        assert_eq!(*seen.borrow(), vec![Some(json!(true))]);
    }

    #[test]
    fn filters_in_order() {
        let (host, frame, dispatcher) = setup();
        let _registration = dispatcher.registry().register("embed-state", |_| {});
        let from_host = |data: serde_json::Value| {
            dispatcher.handle_message(&MessageEvent::new(Some(host.id()), data))
        };

        let good = wire("embed-state", SENTINEL);
        assert_eq!(
            dispatcher.handle_message(&MessageEvent::text(Some(frame.id()), good.clone())),
            DispatchOutcome::RejectedSource
        );
        assert_eq!(
            dispatcher.handle_message(&MessageEvent::text(None, good.clone())),
            DispatchOutcome::RejectedSource
        );
        assert_eq!(from_host(json!({ "sentinel": SENTINEL })), DispatchOutcome::NotProtocol);
        assert_eq!(from_host(json!("hello")), DispatchOutcome::NotProtocol);
        assert_eq!(from_host(json!("amp-{oops")), DispatchOutcome::Malformed);
        assert_eq!(
            from_host(json!(wire("embed-state", "0-43"))),
            DispatchOutcome::SentinelMismatch
        );
        assert_eq!(
            from_host(json!(r#"amp-{"type":"embed-state"}"#)),
            DispatchOutcome::SentinelMismatch
        );
        assert_eq!(
            from_host(json!(r#"amp-{"sentinel":"0-42"}"#)),
            DispatchOutcome::Malformed
        );
        assert_eq!(
            from_host(json!(wire("intersection", SENTINEL))),
            DispatchOutcome::NoCallback
        );
        assert_eq!(from_host(json!(good)), DispatchOutcome::Delivered);
    }

    #[test]
    fn oversized_messages_are_not_protocol() {
        let windows = SimWindow::chain(1);
        let config = ContextConfig {
            max_message_len: 16,
            ..ContextConfig::default()
        };
        let dispatcher = Dispatcher::new(
            windows[0].id(),
            Sentinel::parse(SENTINEL).expect("valid sentinel"),
            CallbackRegistry::new(),
            &config,
        );
        let outcome = dispatcher.handle_message(&MessageEvent::text(
            Some(windows[0].id()),
            wire("embed-state", SENTINEL),
        ));
        assert_eq!(outcome, DispatchOutcome::NotProtocol);
    }

    #[test]
    fn installed_listener_routes_window_events() {
        let (host, frame, dispatcher) = setup();
        let hits = Rc::new(std::cell::Cell::new(0));
        let counter = Rc::clone(&hits);
        let _registration = dispatcher
            .registry()
            .register("intersection", move |_| counter.set(counter.get() + 1));
        dispatcher.install(frame.as_ref());

        frame.deliver_text(Some(host.id()), wire("intersection", SENTINEL));
        frame.deliver_text(Some(frame.id()), wire("intersection", SENTINEL));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn outcome_names() {
        assert_eq!(DispatchOutcome::SentinelMismatch.to_string(), "sentinel-mismatch");
        assert!(DispatchOutcome::NoCallback.is_accepted());
        assert!(!DispatchOutcome::SchemaRejected.is_accepted());
    }

    #[cfg(feature = "schema")]
    #[test]
    fn schema_rejections_skip_callbacks() {
        let (host, _frame, dispatcher) = setup();
        let schemas = Rc::new(SchemaRegistry::builtin().expect("builtin schemas compile"));
        let dispatcher = Rc::new(
            Rc::try_unwrap(dispatcher)
                .expect("sole owner")
                .with_schema_registry(schemas),
        );
        let hits = Rc::new(std::cell::Cell::new(0));
        let counter = Rc::clone(&hits);
        let _registration = dispatcher
            .registry()
            .register("embed-state", move |_| counter.set(counter.get() + 1));

        let bad = encode_envelope("embed-state", SENTINEL, &json!({ "pageHidden": "yes" }))
            .expect("encodes");
        let good = encode_envelope("embed-state", SENTINEL, &json!({ "pageHidden": false }))
            .expect("encodes");

        assert_eq!(
            dispatcher.handle_message(&MessageEvent::text(Some(host.id()), bad)),
            DispatchOutcome::SchemaRejected
        );
        assert_eq!(
            dispatcher.handle_message(&MessageEvent::text(Some(host.id()), good)),
            DispatchOutcome::Delivered
        );
        assert_eq!(hits.get(), 1);
    }
}
