use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod boot;
pub mod decode;
pub mod encode;
pub mod replay;
pub mod sentinel;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode a protocol message into its wire form.
    Encode(EncodeArgs),
    /// Decode a wire string and show the envelope.
    Decode(DecodeArgs),
    /// Parse boot data from a frame name or hash fragment.
    Boot(BootArgs),
    /// Generate a fresh sentinel.
    Sentinel(SentinelArgs),
    /// Feed recorded inbound messages through a frame context.
    Replay(ReplayArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Boot(args) => boot::run(args, format),
        Command::Sentinel(args) => sentinel::run(args, format),
        Command::Replay(args) => replay::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Message type, e.g. embed-size.
    #[arg(long = "type", value_name = "TYPE")]
    pub message_type: String,
    /// Sentinel of the frame, `<depth>-<random>`.
    #[arg(long)]
    pub sentinel: String,
    /// JSON object merged into the envelope.
    #[arg(long)]
    pub json: Option<String>,
    /// Wire marker.
    #[arg(long, default_value = xframe_envelope::MARKER)]
    pub marker: String,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Wire string to decode.
    #[arg(conflicts_with = "stdin")]
    pub wire: Option<String>,
    /// Read the wire string from stdin.
    #[arg(long)]
    pub stdin: bool,
    /// Fail unless the envelope carries this sentinel.
    #[arg(long)]
    pub sentinel: Option<String>,
    /// Validate against the built-in schema for the message type.
    #[arg(long)]
    pub validate: bool,
    /// Wire marker.
    #[arg(long, default_value = xframe_envelope::MARKER)]
    pub marker: String,
}

#[derive(Args, Debug)]
pub struct BootArgs {
    /// Window name or location hash as the loader set it.
    pub text: String,
}

#[derive(Args, Debug)]
pub struct SentinelArgs {
    /// Ancestor index of the host window, counted from the top.
    #[arg(long, default_value = "0")]
    pub depth: usize,
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// JSONL file of `{"from": "target"|"other"|"none", "data": ...}` lines; `-` reads stdin.
    pub file: PathBuf,
    /// Boot data for the simulated frame (window name form).
    #[arg(long, conflicts_with = "sentinel", required_unless_present = "sentinel")]
    pub boot: Option<String>,
    /// Sentinel for the simulated frame when no boot data is given.
    #[arg(long)]
    pub sentinel: Option<String>,
    /// Drop messages that fail the built-in schemas.
    #[arg(long)]
    pub validate: bool,
    /// Wire marker.
    #[arg(long, default_value = xframe_envelope::MARKER)]
    pub marker: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
