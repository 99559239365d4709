//! Purpose: HTTP/1.1 request-head reading and fixed-shape response writing.
//! Exports: `RequestHead`, `HeadOutcome`, `Status`, `read_head`, `parse_head`, response writers.
//! Role: Wire layer under the endpoint router; one request per connection, then close.
//! Invariants: Request heads are capped at 16 KiB.
//! Invariants: Every response carries Content-Type, Content-Length, Connection: close, Server.
//! Invariants: Header lookup is case-insensitive; values are trimmed.

use bstr::ByteSlice;
use std::io::{self, Read, Write};

pub(crate) const MAX_HEAD_BYTES: usize = 16 * 1024;
pub(crate) const SERVER_TOKEN: &str = concat!("tcp-ip/", env!("CARGO_PKG_VERSION"));

const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

#[derive(Debug)]
pub(crate) enum HeadOutcome {
    /// Terminator seen (or EOF after partial data). `spill` holds body bytes
    /// that arrived in the same reads as the head.
    Complete { head: Vec<u8>, spill: Vec<u8> },
    /// Connection closed before any byte arrived.
    Empty,
    /// Cap reached without a terminator.
    TooLarge,
}

pub(crate) fn read_head<R: Read>(reader: &mut R) -> io::Result<HeadOutcome> {
    let mut buf: Vec<u8> = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    loop {
        if let Some(pos) = buf.find(HEAD_TERMINATOR) {
            let spill = buf.split_off(pos + HEAD_TERMINATOR.len());
            return Ok(HeadOutcome::Complete { head: buf, spill });
        }
        if buf.len() >= MAX_HEAD_BYTES {
            return Ok(HeadOutcome::TooLarge);
        }
        let n = reader.read(&mut chunk)?;
        if n == 0 {
            if buf.is_empty() {
                return Ok(HeadOutcome::Empty);
            }
            // Peer closed mid-head; parse what arrived.
            return Ok(HeadOutcome::Complete {
                head: buf,
                spill: Vec::new(),
            });
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

#[derive(Debug)]
pub(crate) struct RequestHead {
    pub(crate) method: String,
    pub(crate) target: String,
    pub(crate) version: String,
    headers: Vec<(String, String)>,
}

impl RequestHead {
    pub(crate) fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Returns `None` when there is no parsable request line.
pub(crate) fn parse_head(head: &[u8]) -> Option<RequestHead> {
    let text = head.to_str().ok()?;
    let mut lines = text.split("\r\n");
    let request_line = lines.next()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_string();
    let target = parts.next()?.to_string();
    let version = parts.next().unwrap_or_default().to_string();

    let mut headers = Vec::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }

    Some(RequestHead {
        method,
        target,
        version,
        headers,
    })
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Status {
    Ok,
    Created,
    BadRequest,
    NotFound,
    MethodNotAllowed,
    InternalServerError,
}

impl Status {
    pub(crate) fn reason_line(self) -> &'static str {
        match self {
            Status::Ok => "200 OK",
            Status::Created => "201 Created",
            Status::BadRequest => "400 Bad Request",
            Status::NotFound => "404 Not Found",
            Status::MethodNotAllowed => "405 Method Not Allowed",
            Status::InternalServerError => "500 Internal Server Error",
        }
    }
}

pub(crate) fn render_head(status: Status, content_type: &str, body_len: u64) -> String {
    format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\nServer: {}\r\n\r\n",
        status.reason_line(),
        content_type,
        body_len,
        SERVER_TOKEN,
    )
}

pub(crate) fn write_response<W: Write>(
    out: &mut W,
    status: Status,
    content_type: &str,
    body: &[u8],
) -> io::Result<()> {
    out.write_all(render_head(status, content_type, body.len() as u64).as_bytes())?;
    out.write_all(body)?;
    out.flush()
}

/// HEAD variant: advertises `body_len` without sending a body.
pub(crate) fn write_head_only<W: Write>(
    out: &mut W,
    status: Status,
    content_type: &str,
    body_len: u64,
) -> io::Result<()> {
    out.write_all(render_head(status, content_type, body_len).as_bytes())?;
    out.flush()
}
