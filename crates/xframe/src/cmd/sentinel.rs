use serde::Serialize;
use xframe_context::Sentinel;

use crate::cmd::SentinelArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_fields, print_json, print_pretty, print_raw, schema_id, OutputFormat};

#[derive(Serialize)]
struct SentinelOutput {
    schema_id: String,
    sentinel: String,
    depth: usize,
}

pub fn run(args: SentinelArgs, format: OutputFormat) -> CliResult<i32> {
    let sentinel = Sentinel::generate(args.depth);
    tracing::debug!(depth = sentinel.depth(), "generated sentinel");

    match format {
        OutputFormat::Json => print_json(&SentinelOutput {
            schema_id: schema_id("sentinel"),
            sentinel: sentinel.to_string(),
            depth: sentinel.depth(),
        }),
        OutputFormat::Table => print_fields(&[
            ("sentinel", sentinel.to_string()),
            ("depth", sentinel.depth().to_string()),
        ]),
        OutputFormat::Pretty => print_pretty(&[
            ("sentinel", sentinel.to_string()),
            ("depth", sentinel.depth().to_string()),
        ]),
        OutputFormat::Raw => print_raw(sentinel.as_str()),
    }

    Ok(SUCCESS)
}
