use std::fs::{self, OpenOptions};
use std::io::Write;

use bytes::{Bytes, BytesMut};
use rtunnel_proto::{encode_frame, Flags, Frame};

use crate::cmd::EncodeArgs;
use crate::exit::{io_error, protocol_error, CliResult, SUCCESS};
use crate::output::print_raw;

pub fn run(args: EncodeArgs) -> CliResult<i32> {
    let payload = resolve_payload(&args)?;
    let flags = args
        .flags
        .iter()
        .fold(Flags::empty(), |acc, flag| acc | Flags::from(*flag));
    let frame = Frame::new(args.frame_type.into(), args.stream, payload).with_flags(flags);

    let mut buf = BytesMut::with_capacity(frame.wire_size());
    encode_frame(&frame, &mut buf).map_err(|err| protocol_error("encode failed", err))?;

    tracing::debug!(
        frame_type = frame.frame_type.name(),
        stream_id = frame.stream_id,
        flags = frame.flags.bits(),
        wire_size = buf.len(),
        "encoded frame"
    );

    match &args.out {
        Some(path) => {
            let context = format!("failed writing {}", path.display());
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .append(args.append)
                .truncate(!args.append)
                .open(path)
                .map_err(|err| io_error(&context, err))?;
            file.write_all(&buf).map_err(|err| io_error(&context, err))?;
        }
        None => print_raw(&buf).map_err(|err| io_error("failed writing stdout", err))?,
    }

    Ok(SUCCESS)
}

fn resolve_payload(args: &EncodeArgs) -> CliResult<Bytes> {
    if let Some(data) = &args.data {
        return Ok(Bytes::copy_from_slice(data.as_bytes()));
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map(Bytes::from)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Ok(Bytes::new())
}
