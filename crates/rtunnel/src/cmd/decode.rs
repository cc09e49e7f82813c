use std::fs::File;
use std::io::{self, Read};

use rtunnel_proto::{FrameConfig, FrameReader, HEADER_SIZE, MAX_FRAME_SIZE};

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, io_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let max_frame_size = args.max_frame_size.unwrap_or(MAX_FRAME_SIZE);
    if max_frame_size < HEADER_SIZE {
        return Err(CliError::new(
            USAGE,
            format!("--max-frame-size must be at least {HEADER_SIZE} bytes"),
        ));
    }

    let source: Box<dyn Read> = match &args.path {
        Some(path) if path.as_os_str() != "-" => Box::new(
            File::open(path)
                .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))?,
        ),
        _ => Box::new(io::stdin().lock()),
    };

    let mut reader = FrameReader::with_config(source, FrameConfig { max_frame_size });
    let mut decoded = 0usize;

    while args.count.is_none_or(|count| decoded < count) {
        let frame = match reader.read_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(err) => {
                return Err(frame_error(
                    &format!("failed decoding frame #{decoded}"),
                    err,
                ))
            }
        };

        print_frame(decoded, &frame, format)
            .map_err(|err| io_error("failed writing stdout", err))?;
        decoded += 1;
    }

    tracing::debug!(frames = decoded, "decode finished");
    Ok(SUCCESS)
}
