use std::io::{self, IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use rtunnel_proto::{Flags, Frame};
use serde::Serialize;

const PREVIEW_LIMIT: usize = 256;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct FrameOutput {
    index: usize,
    version: u8,
    frame_type: &'static str,
    type_code: u8,
    flags: Vec<&'static str>,
    stream_id: u32,
    plane: &'static str,
    payload_size: usize,
    payload: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorOutput>,
}

#[derive(Serialize)]
struct ErrorOutput {
    code: u16,
    name: &'static str,
    message: String,
}

impl FrameOutput {
    fn new(index: usize, frame: &Frame) -> Self {
        let error = match frame.error_payload() {
            Some(Ok(payload)) => Some(ErrorOutput {
                code: payload.code.as_u16(),
                name: payload.code.name(),
                message: payload.message,
            }),
            _ => None,
        };

        Self {
            index,
            version: frame.version,
            frame_type: frame.frame_type.name(),
            type_code: frame.frame_type.as_u8(),
            flags: flag_names(frame.flags),
            stream_id: frame.stream_id,
            plane: if frame.is_control_frame() {
                "control"
            } else {
                "data"
            },
            payload_size: frame.payload.len(),
            payload: payload_preview(frame.payload.as_ref()),
            error,
        }
    }
}

pub fn print_frame(index: usize, frame: &Frame, format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Json => {
            let out = FrameOutput::new(index, frame);
            writeln!(
                io::stdout().lock(),
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            )?;
        }
        OutputFormat::Table => {
            let out = FrameOutput::new(index, frame);
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["#", "TYPE", "FLAGS", "STREAM", "SIZE", "PAYLOAD"])
                .add_row(vec![
                    out.index.to_string(),
                    out.frame_type.to_string(),
                    display_flags(&out.flags),
                    out.stream_id.to_string(),
                    out.payload_size.to_string(),
                    describe_payload(&out),
                ]);
            writeln!(io::stdout().lock(), "{table}")?;
        }
        OutputFormat::Pretty => {
            let out = FrameOutput::new(index, frame);
            writeln!(
                io::stdout().lock(),
                "#{} type={} ({}) flags={} stream={} ({}) size={} payload={}",
                out.index,
                out.frame_type,
                out.type_code,
                display_flags(&out.flags),
                out.stream_id,
                out.plane,
                out.payload_size,
                describe_payload(&out)
            )?;
        }
        OutputFormat::Raw => {
            print_raw(frame.payload.as_ref())?;
        }
    }
    Ok(())
}

pub fn print_raw(data: &[u8]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    out.write_all(data)?;
    out.flush()
}

pub fn flag_names(flags: Flags) -> Vec<&'static str> {
    flags
        .iter()
        .map(|flag| {
            if flag == Flags::END_STREAM {
                "END_STREAM"
            } else if flag == Flags::ACK {
                "ACK"
            } else if flag == Flags::ERROR {
                "ERROR"
            } else {
                "RESERVED"
            }
        })
        .collect()
}

fn display_flags(names: &[&str]) -> String {
    if names.is_empty() {
        "-".to_string()
    } else {
        names.join("|")
    }
}

fn describe_payload(out: &FrameOutput) -> String {
    match &out.error {
        Some(err) => format!("{} ({}): {}", err.name, err.code, err.message),
        None => out.payload.clone(),
    }
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) if text.len() <= PREVIEW_LIMIT => text.to_string(),
        Ok(text) => {
            let mut end = PREVIEW_LIMIT;
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... ({} bytes)", &text[..end], payload.len())
        }
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}
