//! End-to-end protocol scenarios against simulated windows.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::{json, Value};
use xframe_context::{ContextError, DispatchOutcome, FrameContext};
use xframe_envelope::{decode_envelope, encode_envelope, EmbedState, ResizeOutcome};
use xframe_window::{MessageEvent, SimWindow, Window, WindowRef};

const SENTINEL: &str = "1-291921";

/// A frame nested two deep whose sentinel targets the middle window.
struct Harness {
    top: Rc<SimWindow>,
    host: Rc<SimWindow>,
    frame: Rc<SimWindow>,
    context: FrameContext,
}

impl Harness {
    fn with_boot(boot: Value) -> Self {
        let windows = SimWindow::chain(2);
        windows[2].set_name(boot.to_string());
        let frame: WindowRef = windows[2].clone();
        let context = FrameContext::new(frame).expect("context should build");
        Self {
            top: Rc::clone(&windows[0]),
            host: Rc::clone(&windows[1]),
            frame: Rc::clone(&windows[2]),
            context,
        }
    }

    fn new() -> Self {
        Self::with_boot(boot_fixture(SENTINEL))
    }

    /// Deliver `payload` as `message_type` from the host window.
    fn from_host(&self, message_type: &str, payload: Value) -> usize {
        let wire = encode_envelope(message_type, SENTINEL, &payload).expect("encodes");
        self.frame.deliver_text(Some(self.host.id()), wire)
    }

    fn outbound_types(&self) -> Vec<String> {
        self.host
            .take_posted()
            .iter()
            .filter_map(|posted| decode_envelope(&posted.data))
            .filter_map(|envelope| envelope.message_type().map(str::to_string))
            .collect()
    }
}

fn boot_fixture(sentinel: &str) -> Value {
    json!({
        "_context": {
            "location": "foo.com",
            "canonicalUrl": "foo.com",
            "clientId": "123",
            "pageViewId": "1",
            "sentinel": sentinel,
            "startTime": "0",
            "referrer": "baz.net"
        }
    })
}

fn spy() -> (Rc<Cell<u32>>, impl Fn(u32) + Clone) {
    let hits = Rc::new(Cell::new(0));
    let counter = Rc::clone(&hits);
    (hits, move |_: u32| counter.set(counter.get() + 1))
}

#[test]
fn malformed_sentinels_install_no_listener() {
    for sentinel in ["", "abc", "1-", "-1", "1-2-3", "a1-2", "1-2b", "1.5-2"] {
        let windows = SimWindow::chain(2);
        windows[2].set_name(boot_fixture(sentinel).to_string());
        let frame: WindowRef = windows[2].clone();

        let err = FrameContext::new(frame).expect_err("malformed sentinel");
        assert!(
            matches!(err, ContextError::MalformedSentinel(_)),
            "{sentinel:?} gave {err}"
        );
        assert_eq!(windows[2].listener_count(), 0);
        assert!(!windows[2].has_fired("windowContextCreated"));
    }
}

#[test]
fn boot_context_is_exposed() {
    let harness = Harness::new();
    let metadata = harness.context.metadata();

    assert_eq!(harness.context.sentinel().as_str(), SENTINEL);
    assert_eq!(harness.context.depth(), 1);
    assert_eq!(harness.context.target_window().id(), harness.host.id());
    assert_eq!(harness.context.ancestors().len(), 2);
    assert!(metadata.location.is_some_and(|l| l == "foo.com"));
    assert_eq!(metadata.referrer.as_deref(), Some("baz.net"));
    assert!(harness.frame.has_fired("windowContextCreated"));
}

#[test]
fn metadata_handshake_fills_legacy_context() {
    let windows = SimWindow::chain(2);
    windows[2].set_location_hash(format!("#amp3pSentinel={SENTINEL}"));
    let frame: WindowRef = windows[2].clone();
    let context = FrameContext::new(frame).expect("legacy boot");
    assert!(context.metadata().location.is_none());

    let notified = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&notified);
    context.on_metadata(move |metadata| sink.borrow_mut().push(metadata.clone()));
    let _registration = context.request_metadata();

    let posted = windows[1].take_posted();
    assert_eq!(posted.len(), 1);
    let request = decode_envelope(&posted[0].data).expect("marker-encoded request");
    assert_eq!(request.message_type(), Some("send-embed-context"));
    assert_eq!(request.sentinel(), Some(SENTINEL));

    let reply = boot_fixture(SENTINEL)["_context"].clone();
    let wire = encode_envelope("embed-context", SENTINEL, &reply).expect("encodes");
    windows[2].deliver_text(Some(windows[1].id()), wire);

    let metadata = context.metadata();
    assert!(metadata.location.as_ref().is_some_and(|l| l == "foo.com"));
    assert_eq!(metadata.canonical_url.as_deref(), Some("foo.com"));
    assert_eq!(metadata.client_id.as_deref(), Some("123"));
    assert_eq!(metadata.page_view_id.as_deref(), Some("1"));
    assert_eq!(metadata.start_time.as_deref(), Some("0"));
    assert_eq!(metadata.referrer.as_deref(), Some("baz.net"));
    assert_eq!(context.sentinel().as_str(), SENTINEL);
    assert_eq!(*notified.borrow(), vec![metadata]);
}

#[test]
fn intersection_streams_until_unregistered() {
    let harness = Harness::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let registration = harness.context.observe_intersection(move |payload| {
        let latest = payload.latest().map(|change| change.viewable_percentage());
        sink.borrow_mut().push(latest);
    });
    assert_eq!(harness.outbound_types(), vec!["send-intersections"]);

    let change = |visible: f64| {
        json!({
            "changes": [{
                "time": 1.0,
                "boundingClientRect": { "left": 0, "top": 0, "width": 100, "height": 100 },
                "intersectionRect": { "left": 0, "top": 0, "width": 100, "height": visible }
            }]
        })
    };
    harness.from_host("intersection", change(50.0));
    harness.from_host("intersection", change(100.0));
    assert_eq!(*seen.borrow(), vec![Some(50.0), Some(100.0)]);

    assert!(registration.unregister());
    harness.from_host("intersection", change(0.0));
    assert_eq!(seen.borrow().len(), 2);
    assert!(!registration.unregister());
}

#[test]
fn page_visibility_streams() {
    let harness = Harness::new();
    let states = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&states);
    let _registration = harness
        .context
        .observe_page_visibility(move |state| sink.borrow_mut().push(*state));
    assert_eq!(harness.outbound_types(), vec!["send-embed-state"]);

    harness.from_host("embed-state", json!({ "inViewport": true, "pageHidden": false }));
    harness.from_host("embed-state", json!({ "inViewport": false, "pageHidden": true }));
    assert_eq!(
        *states.borrow(),
        vec![
            EmbedState {
                in_viewport: true,
                page_hidden: false
            },
            EmbedState {
                in_viewport: false,
                page_hidden: true
            },
        ]
    );
}

#[test]
fn resize_denial_fires_only_denied_callback() {
    let harness = Harness::new();
    let (success_hits, on_success) = spy();
    let denied = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&denied);

    let _success = harness
        .context
        .on_resize_success(move |_| on_success(0));
    let _denied = harness
        .context
        .on_resize_denied(move |outcome| *sink.borrow_mut() = Some(outcome));
    harness.context.request_resize(100.0, 200.0);

    let posted = harness.host.take_posted();
    assert_eq!(posted.len(), 1);
    let request = decode_envelope(&posted[0].data).expect("marker-encoded");
    assert_eq!(request.message_type(), Some("embed-size"));
    assert_eq!(request.get("width"), Some(&json!(200.0)));
    assert_eq!(request.get("height"), Some(&json!(100.0)));

    harness.from_host(
        "embed-size-denied",
        json!({ "requestedHeight": 100, "requestedWidth": 200 }),
    );
    assert_eq!(success_hits.get(), 0);
    assert_eq!(
        *denied.borrow(),
        Some(ResizeOutcome {
            requested_height: Some(100.0),
            requested_width: Some(200.0)
        })
    );
}

#[test]
fn resize_success_fires_only_success_callback() {
    let harness = Harness::new();
    let (success_hits, on_success) = spy();
    let (denied_hits, on_denied) = spy();
    let _success = harness
        .context
        .on_resize_success(move |_| on_success(0));
    let _denied = harness.context.on_resize_denied(move |_| on_denied(0));

    harness.context.request_resize(50.0, 320.0);
    harness.from_host("embed-size-changed", json!({ "requestedHeight": 50.5 }));
    assert_eq!(success_hits.get(), 1);
    assert_eq!(denied_hits.get(), 0);
}

#[test]
fn foreign_sources_never_reach_callbacks() {
    let harness = Harness::new();
    let (hits, on_state) = spy();
    let _registration = harness
        .context
        .observe_page_visibility(move |_| on_state(0));

    let wire = encode_envelope("embed-state", SENTINEL, &json!({})).expect("encodes");
    for source in [Some(harness.top.id()), Some(harness.frame.id()), None] {
        let outcome = harness
            .context
            .handle_message(&MessageEvent::text(source, wire.clone()));
        assert_eq!(outcome, DispatchOutcome::RejectedSource);
        harness.frame.deliver_text(source, wire.clone());
    }
    assert_eq!(hits.get(), 0);
}

#[test]
fn foreign_sentinels_never_reach_callbacks() {
    let harness = Harness::new();
    let (hits, on_change) = spy();
    let _a = harness.context.observe_intersection({
        let on_change = on_change.clone();
        move |_| on_change(0)
    });
    let _b = harness.context.observe_page_visibility(move |_| on_change(0));

    for sentinel in ["1-291922", "0-291921", "", "1-291921 "] {
        for message_type in ["intersection", "embed-state"] {
            let wire = encode_envelope(message_type, sentinel, &json!({})).expect("encodes");
            let outcome = harness
                .context
                .handle_message(&MessageEvent::text(Some(harness.host.id()), wire));
            assert_eq!(outcome, DispatchOutcome::SentinelMismatch);
        }
    }
    assert_eq!(hits.get(), 0);
}

#[test]
fn page_noise_is_ignored() {
    let harness = Harness::new();
    let (hits, on_state) = spy();
    let _registration = harness
        .context
        .observe_page_visibility(move |_| on_state(0));
    let host = Some(harness.host.id());

    let noise = [
        json!({ "sentinel": SENTINEL, "type": "embed-state" }),
        json!(42),
        json!("hello"),
        json!("amp-"),
        json!("amp-[1,2,3]"),
        json!(format!("amp-{{\"sentinel\":\"{SENTINEL}\"}}")),
    ];
    for data in noise {
        let outcome = harness.context.handle_message(&MessageEvent::new(host, data));
        assert!(!outcome.is_accepted(), "accepted {outcome}");
    }
    assert_eq!(hits.get(), 0);
}

#[test]
fn replacement_semantics() {
    let harness = Harness::new();
    let (first_hits, first) = spy();
    let (second_hits, second) = spy();

    let stale = harness.context.observe_page_visibility(move |_| first(0));
    let _fresh = harness.context.observe_page_visibility(move |_| second(0));
    harness.from_host("embed-state", json!({}));
    assert_eq!(first_hits.get(), 0);
    assert_eq!(second_hits.get(), 1);

    // a stale handle must not remove the replacement
    assert!(!stale.unregister());
    harness.from_host("embed-state", json!({}));
    assert_eq!(second_hits.get(), 2);
}

#[test]
fn panicking_callback_is_isolated() {
    let harness = Harness::new();
    let (hits, on_state) = spy();
    let _boom = harness
        .context
        .observe_intersection(|_| panic!("creative bug"));
    let _ok = harness
        .context
        .observe_page_visibility(move |_| on_state(0));
    let host = Some(harness.host.id());

    let intersection = encode_envelope("intersection", SENTINEL, &json!({})).expect("encodes");
    let state = encode_envelope("embed-state", SENTINEL, &json!({})).expect("encodes");

    assert_eq!(
        harness
            .context
            .handle_message(&MessageEvent::text(host, intersection.clone())),
        DispatchOutcome::CallbackPanicked
    );
    assert_eq!(
        harness
            .context
            .handle_message(&MessageEvent::text(host, state.clone())),
        DispatchOutcome::Delivered
    );
    assert_eq!(
        harness
            .context
            .handle_message(&MessageEvent::text(host, intersection)),
        DispatchOutcome::CallbackPanicked
    );
    harness.frame.deliver_text(host, state);
    assert_eq!(hits.get(), 2);
}

#[test]
fn callback_may_unregister_itself() {
    let harness = Harness::new();
    let slot = Rc::new(RefCell::new(None::<xframe_context::Registration>));
    let hits = Rc::new(Cell::new(0));

    let inner_slot = Rc::clone(&slot);
    let inner_hits = Rc::clone(&hits);
    let registration = harness.context.observe_intersection(move |_| {
        inner_hits.set(inner_hits.get() + 1);
        if let Some(registration) = inner_slot.borrow().as_ref() {
            registration.unregister();
        }
    });
    *slot.borrow_mut() = Some(registration);

    harness.from_host("intersection", json!({}));
    harness.from_host("intersection", json!({}));
    assert_eq!(hits.get(), 1);
}

#[test]
fn independent_contexts_do_not_share_state() {
    let first = Harness::new();
    let second = Harness::with_boot(boot_fixture("1-5"));
    let (first_hits, on_first) = spy();
    let _registration = first
        .context
        .observe_page_visibility(move |_| on_first(0));

    second.from_host("embed-state", json!({}));
    assert_eq!(first_hits.get(), 0);
    assert!(second.context.registry().is_empty());
    assert_eq!(first.context.registry().len(), 1);
}
