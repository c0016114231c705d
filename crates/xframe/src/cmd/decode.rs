use std::io::Read;

use serde::Serialize;
use serde_json::{Map, Value};
use xframe_envelope::{decode_envelope_with_marker, Envelope};
use xframe_schema::SchemaRegistry;

use crate::cmd::DecodeArgs;
use crate::exit::{io_error, schema_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{
    or_dash, preview, print_json, print_pretty, print_raw, print_table, schema_id, OutputFormat,
};

#[derive(Serialize)]
struct DecodeOutput<'a> {
    schema_id: String,
    message_type: Option<&'a str>,
    sentinel: Option<&'a str>,
    validated: bool,
    fields: &'a Map<String, Value>,
}

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let wire = read_wire(&args)?;
    let envelope = decode(&args.marker, &wire)?;

    if let Some(expected) = &args.sentinel {
        if envelope.sentinel() != Some(expected.as_str()) {
            return Err(CliError::new(
                DATA_INVALID,
                format!(
                    "sentinel mismatch: expected {expected}, got {}",
                    envelope.sentinel().unwrap_or("<none>")
                ),
            ));
        }
    }

    if args.validate {
        let registry = SchemaRegistry::builtin()
            .map_err(|err| schema_error("loading built-in schemas", err))?;
        registry
            .validate_envelope(&envelope)
            .map_err(|err| schema_error("validation failed", err))?;
    }

    print_envelope(&envelope, args.validate, format);
    Ok(SUCCESS)
}

fn read_wire(args: &DecodeArgs) -> CliResult<String> {
    if let Some(wire) = &args.wire {
        return Ok(wire.clone());
    }
    if !args.stdin {
        return Err(CliError::new(USAGE, "provide a wire string or --stdin"));
    }
    let mut wire = String::new();
    std::io::stdin()
        .read_to_string(&mut wire)
        .map_err(|err| io_error("reading stdin", err))?;
    Ok(wire.trim_end_matches(['\r', '\n']).to_string())
}

fn decode(marker: &str, wire: &str) -> CliResult<Envelope> {
    if !wire.starts_with(marker) {
        return Err(CliError::new(
            DATA_INVALID,
            format!("not a protocol message: missing '{marker}' marker"),
        ));
    }
    decode_envelope_with_marker(marker, wire).ok_or_else(|| {
        CliError::new(
            DATA_INVALID,
            "not a protocol message: body is not a JSON object",
        )
    })
}

fn print_envelope(envelope: &Envelope, validated: bool, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&DecodeOutput {
            schema_id: schema_id("envelope"),
            message_type: envelope.message_type(),
            sentinel: envelope.sentinel(),
            validated,
            fields: envelope.fields(),
        }),
        OutputFormat::Table => {
            let rows = envelope
                .fields()
                .iter()
                .map(|(key, value)| vec![key.clone(), preview(value)])
                .collect();
            print_table(&["FIELD", "VALUE"], rows);
        }
        OutputFormat::Pretty => print_pretty(&[
            ("type", or_dash(envelope.message_type())),
            ("sentinel", or_dash(envelope.sentinel())),
            ("fields", envelope.fields().len().to_string()),
            ("validated", validated.to_string()),
        ]),
        OutputFormat::Raw => {
            print_raw(&Value::Object(envelope.fields().clone()).to_string());
        }
    }
}
