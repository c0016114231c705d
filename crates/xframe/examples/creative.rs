//! A creative two frames below the page, talking to a simulated host.
//!
//! Run with:
//!   cargo run --example creative
//!
//! The host side answers each request the frame posts: metadata, one
//! visibility update, one intersection batch, and a resize denial.

use std::rc::Rc;

use serde_json::json;
use xframe::context::{FrameContext, Sentinel};
use xframe::envelope::{decode_envelope, encode_envelope, MessageType};
use xframe::window::{SimWindow, Window, WindowRef};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let windows = SimWindow::chain(2);
    let host = Rc::clone(&windows[1]);
    let frame = Rc::clone(&windows[2]);

    let sentinel = Sentinel::generate(1);
    frame.set_name(
        json!({
            "_context": { "sentinel": sentinel.as_str(), "location": "https://pub.example/article" },
            "width": 300,
            "height": 250
        })
        .to_string(),
    );

    let context = FrameContext::new(Rc::clone(&frame) as WindowRef)?;
    eprintln!(
        "frame ready: depth={} target={}",
        context.depth(),
        context.target_window().id()
    );

    let _observer =
        context.on_metadata(|metadata| eprintln!("metadata: referrer={:?}", metadata.referrer));
    let _metadata = context.request_metadata();
    let _visibility = context.observe_page_visibility(|state| {
        eprintln!("visibility: in_viewport={} hidden={}", state.in_viewport, state.page_hidden)
    });
    let intersection = context.observe_intersection(|payload| {
        if let Some(change) = payload.latest() {
            eprintln!("intersection: {:.0}% visible", change.viewable_percentage());
        }
    });
    let _granted = context.on_resize_success(|outcome| eprintln!("resize granted: {outcome:?}"));
    let _denied = context.on_resize_denied(|outcome| eprintln!("resize denied: {outcome:?}"));
    context.request_resize(600.0, 300.0);

    // Host side: answer everything the frame asked for.
    for posted in host.take_posted() {
        let Some(request) = decode_envelope(&posted.data) else {
            continue;
        };
        let Some(sentinel) = request.sentinel() else {
            continue;
        };
        let reply = match request.message_type().and_then(|t| t.parse().ok()) {
            Some(MessageType::SendEmbedContext) => encode_envelope(
                MessageType::EmbedContext.as_str(),
                sentinel,
                &json!({ "referrer": "https://search.example", "pageViewId": 7 }),
            )?,
            Some(MessageType::SendEmbedState) => encode_envelope(
                MessageType::EmbedState.as_str(),
                sentinel,
                &json!({ "inViewport": true, "pageHidden": false }),
            )?,
            Some(MessageType::SendIntersections) => encode_envelope(
                MessageType::Intersection.as_str(),
                sentinel,
                &json!({ "changes": [{
                    "time": 16.0,
                    "boundingClientRect": { "left": 0, "top": 0, "width": 300, "height": 250 },
                    "intersectionRect": { "left": 0, "top": 0, "width": 300, "height": 100 }
                }] }),
            )?,
            Some(MessageType::EmbedSize) => encode_envelope(
                MessageType::EmbedSizeDenied.as_str(),
                sentinel,
                &json!({
                    "requestedHeight": request.get("height"),
                    "requestedWidth": request.get("width")
                }),
            )?,
            _ => continue,
        };
        frame.deliver_text(Some(host.id()), reply);
    }

    intersection.unregister();
    eprintln!("final metadata: {:?}", context.metadata());
    Ok(())
}
