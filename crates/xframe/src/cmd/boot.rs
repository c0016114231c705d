use serde::Serialize;
use serde_json::{Map, Value};
use xframe_context::{BootData, Sentinel};

use crate::cmd::BootArgs;
use crate::exit::{context_error, CliResult, SUCCESS};
use crate::output::{
    or_dash, preview, print_json, print_pretty, print_raw, print_table, schema_id, OutputFormat,
};

#[derive(Serialize)]
struct BootOutput<'a> {
    schema_id: String,
    source: &'static str,
    depth: usize,
    context: &'a xframe_context::BootContext,
    attributes: &'a Map<String, Value>,
}

pub fn run(args: BootArgs, format: OutputFormat) -> CliResult<i32> {
    let (boot, source) = parse(&args.text).map_err(|err| context_error("boot data", err))?;
    let sentinel =
        Sentinel::parse(boot.sentinel()).map_err(|err| context_error("boot sentinel", err))?;

    match format {
        OutputFormat::Json => print_json(&BootOutput {
            schema_id: schema_id("boot"),
            source,
            depth: sentinel.depth(),
            context: &boot.context,
            attributes: &boot.attributes,
        }),
        OutputFormat::Table => print_table(&["FIELD", "VALUE"], rows(&boot, &sentinel, source)),
        OutputFormat::Pretty => print_pretty(&[
            ("source", source.to_string()),
            ("sentinel", sentinel.to_string()),
            ("depth", sentinel.depth().to_string()),
            (
                "location",
                or_dash(boot.context.location.as_ref().map(|l| l.href())),
            ),
            ("attributes", boot.attributes.len().to_string()),
        ]),
        OutputFormat::Raw => print_raw(sentinel.as_str()),
    }

    Ok(SUCCESS)
}

/// Parse boot JSON, falling back to a legacy `amp3pSentinel=` hash.
fn parse(text: &str) -> xframe_context::Result<(BootData, &'static str)> {
    match BootData::parse(text) {
        Ok(boot) => Ok((boot, "json")),
        Err(err) => match Sentinel::from_hash(text)? {
            Some(sentinel) => Ok((BootData::legacy(&sentinel), "legacy-hash")),
            None => Err(err),
        },
    }
}

fn rows(boot: &BootData, sentinel: &Sentinel, source: &str) -> Vec<Vec<String>> {
    let context = &boot.context;
    let mut rows = vec![
        vec!["SOURCE".to_string(), source.to_string()],
        vec!["SENTINEL".to_string(), sentinel.to_string()],
        vec!["DEPTH".to_string(), sentinel.depth().to_string()],
        vec![
            "LOCATION".to_string(),
            or_dash(context.location.as_ref().map(|l| l.href())),
        ],
        vec![
            "CANONICAL_URL".to_string(),
            or_dash(context.canonical_url.as_deref()),
        ],
        vec!["CLIENT_ID".to_string(), or_dash(context.client_id.as_deref())],
        vec![
            "PAGE_VIEW_ID".to_string(),
            or_dash(context.page_view_id.as_deref()),
        ],
        vec![
            "START_TIME".to_string(),
            or_dash(context.start_time.as_deref()),
        ],
        vec!["REFERRER".to_string(), or_dash(context.referrer.as_deref())],
    ];
    for (key, value) in &boot.attributes {
        rows.push(vec![format!("@{key}"), preview(value)]);
    }
    rows
}
