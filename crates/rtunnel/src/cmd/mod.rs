use clap::{Args, Subcommand, ValueEnum};
use rtunnel_proto::{ErrorCategory, Flags, FrameType};
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod codes;
pub mod decode;
pub mod encode;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode a single frame to stdout or a file.
    Encode(EncodeArgs),
    /// Decode frames from a file or stdin and print them.
    Decode(DecodeArgs),
    /// List the protocol error code registry.
    Codes(CodesArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args),
        Command::Decode(args) => decode::run(args, format),
        Command::Codes(args) => codes::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum FrameTypeArg {
    Auth,
    OpenStream,
    Data,
    Close,
    Heartbeat,
}

impl From<FrameTypeArg> for FrameType {
    fn from(arg: FrameTypeArg) -> Self {
        match arg {
            FrameTypeArg::Auth => FrameType::Auth,
            FrameTypeArg::OpenStream => FrameType::OpenStream,
            FrameTypeArg::Data => FrameType::Data,
            FrameTypeArg::Close => FrameType::Close,
            FrameTypeArg::Heartbeat => FrameType::Heartbeat,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum FlagArg {
    EndStream,
    Ack,
    Error,
}

impl From<FlagArg> for Flags {
    fn from(arg: FlagArg) -> Self {
        match arg {
            FlagArg::EndStream => Flags::END_STREAM,
            FlagArg::Ack => Flags::ACK,
            FlagArg::Error => Flags::ERROR,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum CategoryArg {
    Generic,
    Auth,
    Stream,
}

impl From<CategoryArg> for ErrorCategory {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::Generic => ErrorCategory::Generic,
            CategoryArg::Auth => ErrorCategory::Auth,
            CategoryArg::Stream => ErrorCategory::Stream,
        }
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Frame type.
    #[arg(long = "type", short = 't', value_name = "TYPE")]
    pub frame_type: FrameTypeArg,
    /// Stream ID (0 = control plane).
    #[arg(long, short = 's', default_value = "0")]
    pub stream: u32,
    /// Flags to set (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub flags: Vec<FlagArg>,
    /// Raw string payload.
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
    /// Write the encoded frame to this file instead of stdout.
    #[arg(long, short = 'o', value_name = "PATH")]
    pub out: Option<PathBuf>,
    /// Append to the output file rather than truncating it.
    #[arg(long, requires = "out")]
    pub append: bool,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// File holding one or more encoded frames. Reads stdin when absent or "-".
    pub path: Option<PathBuf>,
    /// Stop after decoding N frames.
    #[arg(long)]
    pub count: Option<usize>,
    /// Reject frames whose declared length exceeds this many bytes.
    #[arg(long, value_name = "BYTES")]
    pub max_frame_size: Option<usize>,
}

#[derive(Args, Debug)]
pub struct CodesArgs {
    /// Only list codes in this category.
    #[arg(long)]
    pub category: Option<CategoryArg>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build and protocol details.
    #[arg(long)]
    pub extended: bool,
}
