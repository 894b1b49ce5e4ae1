//! Standard I/O transport.
//!
//! Line-delimited UTF-8 JSON over two byte streams: one envelope or one
//! batch array per line. The read loop feeds the session; replies and
//! server-originated traffic leave through the framed writer, one line
//! per envelope. EOF on the input stops the loop and clears the session's
//! output slot.

use futures::{FutureExt, SinkExt, StreamExt};
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::sync::Mutex;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};

use coremcp_server::Session;

/// Drive a session over the current process's stdin/stdout.
pub async fn run(session: Session) -> io::Result<()> {
    serve(session, tokio::io::stdin(), tokio::io::stdout()).await
}

/// Drive a session over an arbitrary reader/writer pair until EOF.
pub async fn serve<R, W>(session: Session, reader: R, writer: W) -> io::Result<()>
where
    R: AsyncRead + Send + Unpin + 'static,
    W: AsyncWrite + Send + Unpin + 'static,
{
    let writer = Arc::new(Mutex::new(FramedWrite::new(writer, LinesCodec::new())));

    let sink_writer = Arc::clone(&writer);
    session.set_output(Arc::new(move |text: String| {
        let writer = Arc::clone(&sink_writer);
        async move {
            let mut framed = writer.lock().await;
            framed
                .send(text)
                .await
                .map_err(|e| io::Error::other(e.to_string()))
        }
        .boxed()
    }));

    let mut lines = FramedRead::new(BufReader::new(reader), LinesCodec::new());
    let result = loop {
        match lines.next().await {
            Some(Ok(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                session.ingest(&line).await;
            }
            Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                tracing::warn!("dropping overlong input line");
            }
            Some(Err(LinesCodecError::Io(e))) => break Err(e),
            None => break Ok(()),
        }
    };

    session.clear_output();
    result
}
