//! RESP2 request framing and reply encoding.
//!
//! Requests arrive either as arrays of bulk strings (what client libraries
//! send) or as whitespace-separated inline commands (what `redis-cli` and
//! `telnet` send).

use std::io;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

const MAX_LINE_LEN: u64 = 64 * 1024;
const MAX_ARGS: usize = 1024 * 1024;
const MAX_BULK_LEN: usize = 512 * 1024 * 1024;
// Payload buffers grow with the bytes actually received, not the declared length.
const BULK_PREALLOC: usize = 16 * 1024;

#[derive(Debug, Error)]
pub(crate) enum ProtocolError {
    #[error("connection i/o failed")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Malformed(&'static str),
}

/// A single reply frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Reply {
    Simple(&'static str),
    Error(String),
    Integer(i64),
    Bulk(Vec<u8>),
    Nil,
}

impl Reply {
    pub(crate) const fn ok() -> Self {
        Self::Simple("OK")
    }

    pub(crate) fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Self::Simple(text) => {
                out.push(b'+');
                out.extend_from_slice(text.as_bytes());
            }
            Self::Error(message) => {
                out.push(b'-');
                out.extend_from_slice(message.as_bytes());
            }
            Self::Integer(value) => {
                out.push(b':');
                out.extend_from_slice(value.to_string().as_bytes());
            }
            Self::Bulk(payload) => {
                out.push(b'$');
                out.extend_from_slice(payload.len().to_string().as_bytes());
                out.extend_from_slice(b"\r\n");
                out.extend_from_slice(payload);
            }
            Self::Nil => out.extend_from_slice(b"$-1"),
        }
        out.extend_from_slice(b"\r\n");
    }
}

/// Read the next command. `Ok(None)` means the peer closed the connection
/// between commands.
pub(crate) async fn read_command<R>(reader: &mut R) -> Result<Option<Vec<Vec<u8>>>, ProtocolError>
where
    R: AsyncBufRead + Unpin,
{
    let Some(line) = read_line(reader).await? else {
        return Ok(None);
    };

    let Some(count) = line.strip_prefix(b"*") else {
        return Ok(Some(
            line.split(u8::is_ascii_whitespace)
                .filter(|part| !part.is_empty())
                .map(<[u8]>::to_vec)
                .collect(),
        ));
    };

    let count = parse_len(count)?;
    if count > MAX_ARGS {
        return Err(ProtocolError::Malformed("too many arguments"));
    }
    let mut args = Vec::with_capacity(count.min(16));
    for _ in 0..count {
        let header = read_line(reader)
            .await?
            .ok_or(ProtocolError::Malformed("unexpected end of stream"))?;
        let len = header
            .strip_prefix(b"$")
            .ok_or(ProtocolError::Malformed("expected bulk string"))
            .and_then(parse_len)?;
        if len > MAX_BULK_LEN {
            return Err(ProtocolError::Malformed("bulk string too large"));
        }
        let framed = len + 2;
        let mut payload = Vec::with_capacity(framed.min(BULK_PREALLOC));
        (&mut *reader)
            .take(framed as u64)
            .read_to_end(&mut payload)
            .await?;
        if payload.len() < framed {
            return Err(ProtocolError::Malformed("unexpected end of stream"));
        }
        if !payload.ends_with(b"\r\n") {
            return Err(ProtocolError::Malformed("bulk string missing terminator"));
        }
        payload.truncate(len);
        args.push(payload);
    }
    Ok(Some(args))
}

async fn read_line<R>(reader: &mut R) -> Result<Option<Vec<u8>>, ProtocolError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let read = (&mut *reader)
        .take(MAX_LINE_LEN)
        .read_until(b'\n', &mut line)
        .await?;
    if read == 0 {
        return Ok(None);
    }
    if line.pop() != Some(b'\n') {
        return Err(ProtocolError::Malformed("line too long or truncated"));
    }
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Ok(Some(line))
}

fn parse_len(raw: &[u8]) -> Result<usize, ProtocolError> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|text| text.parse().ok())
        .ok_or(ProtocolError::Malformed("invalid length"))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn parse(raw: &[u8]) -> Result<Option<Vec<Vec<u8>>>, ProtocolError> {
        let mut reader = raw;
        read_command(&mut reader).await
    }

    fn encoded(reply: &Reply) -> Vec<u8> {
        let mut out = Vec::new();
        reply.encode(&mut out);
        out
    }

    #[tokio::test]
    async fn array_of_bulk_strings_is_parsed() -> Result<(), ProtocolError> {
        let args = parse(b"*2\r\n$3\r\nGET\r\n$8\r\ntest-key\r\n").await?;
        assert_eq!(args, Some(vec![b"GET".to_vec(), b"test-key".to_vec()]));
        Ok(())
    }

    #[tokio::test]
    async fn bulk_strings_are_binary_safe() -> Result<(), ProtocolError> {
        let args = parse(b"*1\r\n$4\r\na\r\nb\r\n").await?;
        assert_eq!(args, Some(vec![b"a\r\nb".to_vec()]));
        Ok(())
    }

    #[tokio::test]
    async fn inline_commands_split_on_whitespace() -> Result<(), ProtocolError> {
        let args = parse(b"PING  hello\r\n").await?;
        assert_eq!(args, Some(vec![b"PING".to_vec(), b"hello".to_vec()]));
        assert_eq!(parse(b"\r\n").await?, Some(Vec::new()));
        Ok(())
    }

    #[tokio::test]
    async fn end_of_stream_between_commands_is_clean() -> Result<(), ProtocolError> {
        assert_eq!(parse(b"").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn malformed_frames_are_rejected() {
        assert!(matches!(
            parse(b"*1\r\n:5\r\n").await,
            Err(ProtocolError::Malformed("expected bulk string"))
        ));
        assert!(matches!(
            parse(b"*x\r\n").await,
            Err(ProtocolError::Malformed("invalid length"))
        ));
        assert!(matches!(
            parse(b"*1\r\n$3\r\nGETXX").await,
            Err(ProtocolError::Malformed("bulk string missing terminator"))
        ));
        assert!(matches!(
            parse(b"*2\r\n$3\r\nGET\r\n").await,
            Err(ProtocolError::Malformed("unexpected end of stream"))
        ));
    }

    #[tokio::test]
    async fn oversized_declared_length_without_payload_is_truncated_stream() {
        assert!(matches!(
            parse(b"*1\r\n$536870912\r\nabc").await,
            Err(ProtocolError::Malformed("unexpected end of stream"))
        ));
        assert!(matches!(
            parse(b"*1\r\n$536870913\r\n").await,
            Err(ProtocolError::Malformed("bulk string too large"))
        ));
    }

    #[test]
    fn replies_encode_as_resp2() {
        assert_eq!(encoded(&Reply::ok()), b"+OK\r\n");
        assert_eq!(
            encoded(&Reply::Error("ERR boom".into())),
            b"-ERR boom\r\n"
        );
        assert_eq!(encoded(&Reply::Integer(2)), b":2\r\n");
        assert_eq!(
            encoded(&Reply::Bulk(b"test-val".to_vec())),
            b"$8\r\ntest-val\r\n"
        );
        assert_eq!(encoded(&Reply::Nil), b"$-1\r\n");
    }
}
