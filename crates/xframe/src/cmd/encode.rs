use serde::Serialize;
use serde_json::Value;
use xframe_context::Sentinel;
use xframe_envelope::encode_envelope_with_marker;

use crate::cmd::EncodeArgs;
use crate::exit::{context_error, envelope_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_fields, print_json, print_pretty, print_raw, schema_id, OutputFormat};

#[derive(Serialize)]
struct EncodeOutput<'a> {
    schema_id: String,
    message_type: &'a str,
    sentinel: &'a str,
    wire: &'a str,
}

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let sentinel =
        Sentinel::parse(&args.sentinel).map_err(|err| context_error("--sentinel", err))?;
    if args.message_type.is_empty() {
        return Err(CliError::new(USAGE, "--type must not be empty"));
    }
    let payload = parse_payload(args.json.as_deref())?;

    let wire = encode_envelope_with_marker(
        &args.marker,
        &args.message_type,
        sentinel.as_str(),
        &payload,
    )
    .map_err(|err| envelope_error("encode failed", err))?;

    if args.message_type.parse::<xframe_envelope::MessageType>().is_err() {
        tracing::warn!(message_type = %args.message_type, "not a built-in message type");
    }

    match format {
        OutputFormat::Json => print_json(&EncodeOutput {
            schema_id: schema_id("encoded"),
            message_type: &args.message_type,
            sentinel: sentinel.as_str(),
            wire: &wire,
        }),
        OutputFormat::Table => print_fields(&[
            ("type", args.message_type.clone()),
            ("sentinel", sentinel.to_string()),
            ("wire", wire.clone()),
        ]),
        OutputFormat::Pretty => print_pretty(&[
            ("type", args.message_type.clone()),
            ("sentinel", sentinel.to_string()),
            ("wire", wire.clone()),
        ]),
        OutputFormat::Raw => print_raw(&wire),
    }

    Ok(SUCCESS)
}

fn parse_payload(json: Option<&str>) -> CliResult<Value> {
    match json {
        None => Ok(Value::Null),
        Some(text) => serde_json::from_str(text)
            .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}"))),
    }
}
