use std::io;

use futures::StreamExt;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    select,
};
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tracing::{debug, info, warn};

use crate::{
    message::{decode, encode, Message, MAX_FRAME_LEN},
    session::Role,
};

const LINE_ENDINGS: &[char] = &['\n', '\r'];

/// Drives one chat session over an established stream until either
/// direction ends.
///
/// The two pumps run as independent tasks; their only shared state is the
/// stream itself, split into a read half and a write half. The first pump to
/// terminate ends the session and the surviving pump is cancelled at its
/// suspension point, after which both halves are dropped and the stream is
/// closed.
pub async fn run<S>(stream: S, role: Role)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (read_half, write_half) = tokio::io::split(stream);

    let mut inbound = tokio::spawn(pump_inbound(read_half, tokio::io::stdout()));
    let mut outbound = tokio::spawn(pump_outbound(
        BufReader::new(tokio::io::stdin()),
        write_half,
        role,
    ));

    select! {
        _ = &mut inbound => {
            outbound.abort();
            let _ = outbound.await;
        }
        _ = &mut outbound => {
            inbound.abort();
            let _ = inbound.await;
        }
    }
}

/// Reads local input line by line, tags each line with this session's role,
/// and writes it to the stream as one frame per message, flushing
/// immediately. Ends on local EOF or the first write error, closing the
/// write half on the way out.
pub async fn pump_outbound<R, W>(mut input: R, mut writer: W, role: Role)
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        match input.read_line(&mut line).await {
            Ok(0) => {
                info!("local input closed");
                break;
            }
            Ok(_) => {}
            Err(error) => {
                warn!(%error, "failed to read local input");
                break;
            }
        }

        if line.trim().is_empty() {
            continue;
        }

        let message = Message {
            source: role.to_string(),
            text: line.clone(),
        };
        let frame = match encode(&message) {
            Ok(frame) => frame,
            Err(error) => {
                // A too-long line is dropped, not truncated; the session keeps going.
                warn!(%error, "message not sent");
                continue;
            }
        };

        if let Err(error) = write_frame(&mut writer, &frame).await {
            warn!("write stream with error: {error}");
            break;
        }
    }

    close_writer(&mut writer).await;
}

/// Reads bounded frames from the stream, decodes each one, and renders it
/// to the local output surface. Blank frames are skipped; stream errors and
/// undecodable frames end the pump.
pub async fn pump_inbound<R, W>(reader: R, mut out: W)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut frames = FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_FRAME_LEN));

    loop {
        let next = match frames.next().await {
            Some(next) => next,
            None => {
                info!("peer stream closed");
                break;
            }
        };
        let line = match next {
            Ok(line) => line,
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                warn!("peer sent an oversized frame, closing the session");
                break;
            }
            Err(LinesCodecError::Io(error)) => {
                warn!("read stream with error: {error}");
                break;
            }
        };

        if line.is_empty() {
            continue;
        }

        let message = match decode(line.as_bytes()) {
            Ok(message) => message,
            Err(error) => {
                warn!(%error, "undecodable frame from peer, closing the session");
                break;
            }
        };

        if let Err(error) = render(&mut out, &message).await {
            warn!(%error, "failed to write to local output");
            break;
        }
    }
}

async fn write_frame<W>(writer: &mut W, frame: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(frame).await?;
    writer.flush().await
}

async fn render<W>(out: &mut W, message: &Message) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let text = message.text.trim_end_matches(LINE_ENDINGS);
    let line = format!("<{}> {text}\n", message.source);
    out.write_all(line.as_bytes()).await?;
    out.flush().await
}

async fn close_writer<W>(writer: &mut W)
where
    W: AsyncWrite + Unpin,
{
    // Closing twice is harmless; the peer may already have torn the stream down.
    if let Err(error) = writer.shutdown().await {
        debug!(%error, "stream already closed");
    }
}
