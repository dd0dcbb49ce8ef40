//! RESP front-end
//!
//! Speaks the Redis serialization protocol over raw TCP so that ordinary Redis
//! clients can read through the cache. Only `GET` is supported.

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::AppState;
use crate::error::{ProxyError, Result};

// == Limits ==
/// Largest accepted bulk string, in bytes
pub const MAX_BULK_LEN: usize = 512 * 1024 * 1024;

/// Largest accepted number of arguments in one command
pub const MAX_ARRAY_LEN: usize = 1024 * 1024;

/// Longest accepted header or inline command line, in bytes
pub const MAX_LINE_LEN: usize = 64 * 1024;

// == Reply ==
/// A reply written back to a RESP client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `$<len>\r\n<bytes>\r\n`
    Bulk(Bytes),
    /// `$-1\r\n`
    Null,
    /// `-<message>\r\n`
    Error(String),
}

impl Reply {
    /// Appends the wire encoding of this reply to `buf`.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            Reply::Bulk(value) => {
                buf.push(b'$');
                buf.extend_from_slice(value.len().to_string().as_bytes());
                buf.extend_from_slice(b"\r\n");
                buf.extend_from_slice(value);
                buf.extend_from_slice(b"\r\n");
            }
            Reply::Null => buf.extend_from_slice(b"$-1\r\n"),
            Reply::Error(message) => {
                // Error lines cannot carry line breaks
                buf.push(b'-');
                buf.extend(
                    message
                        .bytes()
                        .map(|b| if matches!(b, b'\r' | b'\n') { b' ' } else { b }),
                );
                buf.extend_from_slice(b"\r\n");
            }
        }
    }
}

// == Server ==
/// Accepts RESP clients on `listener` until `shutdown` resolves.
///
/// Each connection is handled on its own task. On shutdown the listener stops
/// accepting, every connection finishes the command it is serving and closes,
/// and `serve` returns once all of them are done.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send,
{
    tokio::pin!(shutdown);
    let (stop_tx, stop_rx) = watch::channel(false);
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            Some(joined) = connections.join_next(), if !connections.is_empty() => {
                if let Err(e) = joined {
                    warn!(error = %e, "RESP connection task failed");
                }
            }
            accepted = listener.accept() => {
                let (socket, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!(error = %e, "Failed to accept RESP connection");
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        continue;
                    }
                };

                let state = state.clone();
                let mut stop = stop_rx.clone();
                connections.spawn(async move {
                    debug!(%peer, "RESP client connected");
                    let stopped = async move {
                        let _ = stop.wait_for(|&stopped| stopped).await;
                    };
                    match serve_connection(socket, state, stopped).await {
                        Ok(()) => debug!(%peer, "RESP client disconnected"),
                        Err(e) => warn!(%peer, error = %e, "RESP connection closed"),
                    }
                });
            }
        }
    }

    drop(listener);
    let _ = stop_tx.send(true);
    info!(open = connections.len(), "RESP listener stopped, draining connections");
    while let Some(joined) = connections.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "RESP connection task failed");
        }
    }
    info!("RESP connections drained");
    Ok(())
}

/// Serves commands from one client until it disconnects.
///
/// Pipelined commands are answered in order. A framing error is reported to
/// the client and then ends the connection.
pub async fn handle_connection<S>(stream: S, state: AppState) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    serve_connection(stream, state, std::future::pending::<()>()).await
}

/// [`handle_connection`] that also returns once `stop` resolves while the
/// connection is waiting for its next command.
async fn serve_connection<S, F>(stream: S, state: AppState, stop: F) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
    F: Future<Output = ()>,
{
    tokio::pin!(stop);
    let mut stream = BufReader::new(stream);
    let mut out = Vec::new();

    loop {
        out.clear();

        let command = tokio::select! {
            biased;
            _ = &mut stop => return Ok(()),
            command = read_command(&mut stream) => command,
        };

        let args = match command {
            Ok(Some(args)) => args,
            Ok(None) => return Ok(()),
            Err(err @ ProxyError::Protocol(_)) => {
                Reply::Error(format!("ERR {}", err)).encode(&mut out);
                stream.write_all(&out).await?;
                stream.flush().await?;
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        if args.is_empty() {
            continue;
        }

        dispatch(&state, &args).await.encode(&mut out);
        stream.write_all(&out).await?;
        stream.flush().await?;
    }
}

/// Routes one command to its handler.
pub async fn dispatch(state: &AppState, args: &[Bytes]) -> Reply {
    let Some((name, rest)) = args.split_first() else {
        return Reply::Error("ERR empty command".to_string());
    };

    if name.eq_ignore_ascii_case(b"GET") {
        get(state, rest).await
    } else {
        Reply::Error(format!(
            "ERR unsupported command '{}'",
            String::from_utf8_lossy(name)
        ))
    }
}

async fn get(state: &AppState, args: &[Bytes]) -> Reply {
    let [key] = args else {
        return Reply::Error("ERR wrong number of arguments for 'get' command".to_string());
    };
    let Ok(key) = std::str::from_utf8(key) else {
        return Reply::Error("ERR can't parse key string".to_string());
    };

    match state.read_through(key).await {
        Ok(Some(value)) => Reply::Bulk(value),
        Ok(None) => Reply::Null,
        Err(e) => {
            warn!(key, error = %e, "Backend lookup failed");
            Reply::Error(format!("ERR {}", e))
        }
    }
}

// == Parsing ==
/// Reads the next command as a list of arguments.
///
/// Accepts both multibulk arrays (`*N\r\n$len\r\n...`) and inline commands.
/// Returns `None` on a clean end of stream and an empty list for no-op input
/// such as a blank line or `*0`.
pub async fn read_command<R>(reader: &mut R) -> Result<Option<Vec<Bytes>>>
where
    R: AsyncBufRead + Unpin,
{
    let Some(line) = read_line(reader).await? else {
        return Ok(None);
    };

    let Some(count) = line.strip_prefix(b"*") else {
        let args = line
            .split(|b| b.is_ascii_whitespace())
            .filter(|part| !part.is_empty())
            .map(Bytes::copy_from_slice)
            .collect();
        return Ok(Some(args));
    };

    let count = parse_int(count, "multibulk length")?;
    if count <= 0 {
        return Ok(Some(Vec::new()));
    }
    let count = usize::try_from(count)
        .ok()
        .filter(|&n| n <= MAX_ARRAY_LEN)
        .ok_or_else(|| ProxyError::Protocol("invalid multibulk length".to_string()))?;

    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        args.push(read_bulk(reader).await?);
    }
    Ok(Some(args))
}

async fn read_bulk<R>(reader: &mut R) -> Result<Bytes>
where
    R: AsyncBufRead + Unpin,
{
    let line = read_line(reader).await?.ok_or_else(unexpected_eof)?;
    let Some(len) = line.strip_prefix(b"$") else {
        return Err(ProxyError::Protocol(format!(
            "expected '$', got '{}'",
            line.first().map(|&b| b as char).unwrap_or(' ')
        )));
    };

    let len = usize::try_from(parse_int(len, "bulk length")?)
        .ok()
        .filter(|&n| n <= MAX_BULK_LEN)
        .ok_or_else(|| ProxyError::Protocol("invalid bulk length".to_string()))?;

    // Grows with the bytes that actually arrive, not with the declared length
    let mut buf = Vec::new();
    (&mut *reader)
        .take(len as u64 + 2)
        .read_to_end(&mut buf)
        .await?;
    if buf.len() < len + 2 {
        return Err(unexpected_eof());
    }
    if !buf.ends_with(b"\r\n") {
        return Err(ProxyError::Protocol(
            "expected CRLF after bulk string".to_string(),
        ));
    }
    buf.truncate(len);
    Ok(Bytes::from(buf))
}

/// Reads one line, stripping the trailing `\r\n` (or bare `\n`).
async fn read_line<R>(reader: &mut R) -> Result<Option<Vec<u8>>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let limit = (MAX_LINE_LEN + 2) as u64;
    let n = (&mut *reader)
        .take(limit)
        .read_until(b'\n', &mut line)
        .await?;

    if n == 0 {
        return Ok(None);
    }
    if line.last() != Some(&b'\n') {
        return Err(if n as u64 >= limit {
            ProxyError::Protocol("line too long".to_string())
        } else {
            unexpected_eof()
        });
    }

    line.pop();
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Ok(Some(line))
}

fn parse_int(raw: &[u8], what: &str) -> Result<i64> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ProxyError::Protocol(format!("invalid {}", what)))
}

fn unexpected_eof() -> ProxyError {
    ProxyError::Protocol("unexpected end of stream".to_string())
}
