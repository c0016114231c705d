use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use xframe_context::{
    BootData, ContextConfig, ContextError, ContextMetadata, DispatchOutcome, FrameContext,
    Sentinel,
};
use xframe_envelope::decode_envelope_with_marker;
use xframe_schema::SchemaRegistry;
use xframe_window::{MessageEvent, SimWindow, Window, WindowId, WindowRef};

use crate::cmd::ReplayArgs;
use crate::exit::{
    context_error, io_error, schema_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE,
};
use crate::output::{print_json, print_pretty, print_raw, print_table, schema_id, OutputFormat};

/// Which window a recorded message claims to come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
enum ReplaySource {
    #[default]
    Target,
    Other,
    None,
}

impl ReplaySource {
    fn as_str(self) -> &'static str {
        match self {
            ReplaySource::Target => "target",
            ReplaySource::Other => "other",
            ReplaySource::None => "none",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReplayLine {
    #[serde(default)]
    from: ReplaySource,
    data: Value,
}

#[derive(Serialize)]
struct EventOutput<'a> {
    schema_id: String,
    line: usize,
    from: ReplaySource,
    message_type: Option<&'a str>,
    outcome: &'static str,
}

#[derive(Serialize)]
struct SummaryOutput {
    schema_id: String,
    events: usize,
    requests_posted: usize,
    outcomes: BTreeMap<&'static str, usize>,
    metadata: ContextMetadata,
}

/// The simulated window tree a replay runs in.
struct Stage {
    target: Rc<SimWindow>,
    bystander: Rc<SimWindow>,
    context: FrameContext,
}

impl Stage {
    fn source_id(&self, from: ReplaySource) -> Option<WindowId> {
        match from {
            ReplaySource::Target => Some(self.target.id()),
            ReplaySource::Other => Some(self.bystander.id()),
            ReplaySource::None => None,
        }
    }
}

pub fn run(args: ReplayArgs, format: OutputFormat) -> CliResult<i32> {
    let lines = parse_lines(&read_input(&args.file)?)?;
    let stage = build_stage(&args)?;
    let _registrations = subscribe(&stage.context);

    let mut outcomes: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut table_rows = Vec::new();

    for (line_no, line) in &lines {
        let message_type = line
            .data
            .as_str()
            .and_then(|wire| decode_envelope_with_marker(&args.marker, wire))
            .and_then(|envelope| envelope.message_type().map(str::to_string));
        let event = MessageEvent::new(stage.source_id(line.from), line.data.clone());
        let outcome = stage.context.handle_message(&event);
        *outcomes.entry(outcome.as_str()).or_default() += 1;

        match format {
            OutputFormat::Json => print_json(&EventOutput {
                schema_id: schema_id("replay-event"),
                line: *line_no,
                from: line.from,
                message_type: message_type.as_deref(),
                outcome: outcome.as_str(),
            }),
            OutputFormat::Table => table_rows.push(vec![
                line_no.to_string(),
                line.from.as_str().to_string(),
                message_type.unwrap_or_else(|| "-".to_string()),
                outcome.to_string(),
            ]),
            OutputFormat::Pretty => print_pretty(&[
                ("line", line_no.to_string()),
                ("from", line.from.as_str().to_string()),
                ("type", message_type.unwrap_or_else(|| "-".to_string())),
                ("outcome", outcome.to_string()),
            ]),
            OutputFormat::Raw => print_raw(outcome.as_str()),
        }
    }

    let summary = SummaryOutput {
        schema_id: schema_id("replay-summary"),
        events: lines.len(),
        requests_posted: stage.target.posted().len(),
        outcomes,
        metadata: stage.context.metadata(),
    };
    tracing::info!(
        events = summary.events,
        delivered = summary.outcomes.get("delivered").copied().unwrap_or(0),
        "replay finished"
    );

    match format {
        OutputFormat::Json => print_json(&summary),
        OutputFormat::Table => {
            print_table(&["LINE", "FROM", "TYPE", "OUTCOME"], table_rows);
            let rows = summary
                .outcomes
                .iter()
                .map(|(outcome, count)| vec![outcome.to_string(), count.to_string()])
                .collect();
            print_table(&["OUTCOME", "COUNT"], rows);
        }
        OutputFormat::Pretty => print_pretty(&[
            ("events", summary.events.to_string()),
            ("requests_posted", summary.requests_posted.to_string()),
            (
                "delivered",
                summary
                    .outcomes
                    .get(DispatchOutcome::Delivered.as_str())
                    .copied()
                    .unwrap_or(0)
                    .to_string(),
            ),
        ]),
        OutputFormat::Raw => {}
    }

    Ok(SUCCESS)
}

fn read_input(path: &Path) -> CliResult<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|err| io_error("reading stdin", err))?;
        return Ok(text);
    }
    std::fs::read_to_string(path)
        .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))
}

/// Parse JSONL, skipping blank lines and `#` comments. Line numbers are
/// 1-based.
fn parse_lines(text: &str) -> CliResult<Vec<(usize, ReplayLine)>> {
    let mut lines = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let line: ReplayLine = serde_json::from_str(trimmed).map_err(|err| {
            CliError::new(DATA_INVALID, format!("line {}: {err}", index + 1))
        })?;
        lines.push((index + 1, line));
    }
    Ok(lines)
}

fn boot_data(args: &ReplayArgs) -> CliResult<BootData> {
    match (&args.boot, &args.sentinel) {
        (Some(text), _) => BootData::parse(text).map_err(|err| context_error("--boot", err)),
        (None, Some(raw)) => Sentinel::parse(raw)
            .map(|sentinel| BootData::legacy(&sentinel))
            .map_err(|err| context_error("--sentinel", err)),
        (None, None) => Err(CliError::new(USAGE, "provide --boot or --sentinel")),
    }
}

/// Nest a frame deep enough that its sentinel depth names a real ancestor.
fn build_stage(args: &ReplayArgs) -> CliResult<Stage> {
    let boot = boot_data(args)?;
    let sentinel =
        Sentinel::parse(boot.sentinel()).map_err(|err| context_error("boot sentinel", err))?;

    let config = ContextConfig {
        marker: args.marker.clone(),
        ..ContextConfig::default()
    };
    // The frame sits one below its target, so the chain holds depth + 1 ancestors.
    if sentinel.depth() >= config.max_ancestor_depth {
        let err = ContextError::AncestorChainTooDeep {
            max: config.max_ancestor_depth,
        };
        return Err(CliError::new(DATA_INVALID, format!("boot sentinel: {err}")));
    }

    let windows = SimWindow::chain(sentinel.depth() + 1);
    let target = Rc::clone(&windows[sentinel.depth()]);
    let frame: WindowRef = Rc::clone(&windows[sentinel.depth() + 1]) as WindowRef;

    let mut builder = FrameContext::builder(frame).config(config).boot_data(boot);
    if args.validate {
        let schemas =
            SchemaRegistry::builtin().map_err(|err| schema_error("loading built-in schemas", err))?;
        builder = builder.schema_registry(Rc::new(schemas));
    }
    let context = builder
        .build()
        .map_err(|err| context_error("frame context", err))?;

    Ok(Stage {
        target,
        bystander: SimWindow::top(),
        context,
    })
}

/// Subscribe to every reply type so deliveries show up in the outcomes.
fn subscribe(context: &FrameContext) -> Vec<xframe_context::Registration> {
    vec![
        context.request_metadata(),
        context.observe_page_visibility(|state| {
            tracing::info!(
                in_viewport = state.in_viewport,
                page_hidden = state.page_hidden,
                "embed-state"
            );
        }),
        context.observe_intersection(|payload| {
            tracing::info!(
                changes = payload.changes.len(),
                visible = payload.latest().map(|c| c.viewable_percentage()).unwrap_or(0.0),
                "intersection"
            );
        }),
        context.on_resize_success(|outcome| {
            tracing::info!(
                height = ?outcome.requested_height,
                width = ?outcome.requested_width,
                "resize granted"
            );
        }),
        context.on_resize_denied(|outcome| {
            tracing::info!(
                height = ?outcome.requested_height,
                width = ?outcome.requested_width,
                "resize denied"
            );
        }),
    ]
}
