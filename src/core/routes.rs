//! Purpose: Endpoint dispatch for the embedded HTTP service.
//! Exports: `handle_connection`, `is_safe_filename`, `MAX_BODY_BYTES`.
//! Role: Maps one request head onto the fixed endpoint set and writes one response.
//! Invariants: File names never traverse out of the configured directory.
//! Invariants: POST bodies are capped at 1 GiB and must arrive in full.
//! Notes: Responses always close the connection; there is no keep-alive.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use tracing::debug;

use crate::core::http::{self, HeadOutcome, RequestHead, Status};

pub(crate) const MAX_BODY_BYTES: u64 = 1_073_741_824;

const TEXT: &str = "text/plain";
const OCTET: &str = "application/octet-stream";

pub(crate) fn handle_connection<S: Read + Write>(conn: &mut S, files_dir: &Path) -> io::Result<()> {
    let (head, spill) = match http::read_head(conn)? {
        HeadOutcome::Complete { head, spill } => (head, spill),
        HeadOutcome::Empty => return Ok(()),
        HeadOutcome::TooLarge => {
            return http::write_response(conn, Status::BadRequest, TEXT, b"");
        }
    };

    let Some(request) = http::parse_head(&head) else {
        return http::write_response(conn, Status::BadRequest, TEXT, b"");
    };
    debug!(
        method = %request.method,
        target = %request.target,
        version = %request.version,
        "request"
    );

    match request.method.as_str() {
        "GET" => respond_read(conn, &request, files_dir, false),
        "HEAD" => respond_read(conn, &request, files_dir, true),
        "POST" => respond_post(conn, &request, files_dir, spill),
        _ => http::write_response(conn, Status::MethodNotAllowed, TEXT, b""),
    }
}

fn respond_read<S: Write>(
    conn: &mut S,
    request: &RequestHead,
    files_dir: &Path,
    head_only: bool,
) -> io::Result<()> {
    let target = request.target.as_str();
    if target == "/" {
        return send(conn, Status::Ok, TEXT, b"Hello, world!", head_only);
    }
    if let Some(echo) = target.strip_prefix("/echo/") {
        return send(conn, Status::Ok, TEXT, echo.as_bytes(), head_only);
    }
    if target == "/user-agent" {
        return match request.header("User-Agent") {
            Some(agent) => send(conn, Status::Ok, TEXT, agent.as_bytes(), head_only),
            None => http::write_response(conn, Status::BadRequest, TEXT, b""),
        };
    }
    if let Some(name) = target.strip_prefix("/files/") {
        if !is_safe_filename(name) {
            return http::write_response(conn, Status::BadRequest, TEXT, b"");
        }
        return serve_file(conn, files_dir, name, head_only);
    }
    http::write_response(conn, Status::NotFound, TEXT, b"")
}

fn serve_file<S: Write>(
    conn: &mut S,
    files_dir: &Path,
    name: &str,
    head_only: bool,
) -> io::Result<()> {
    let path = files_dir.join(name);
    if head_only {
        return match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => http::write_head_only(conn, Status::Ok, OCTET, meta.len()),
            _ => http::write_response(conn, Status::NotFound, TEXT, b""),
        };
    }
    match fs::read(&path) {
        Ok(bytes) => http::write_response(conn, Status::Ok, OCTET, &bytes),
        Err(_) => http::write_response(conn, Status::NotFound, TEXT, b""),
    }
}

fn respond_post<S: Read + Write>(
    conn: &mut S,
    request: &RequestHead,
    files_dir: &Path,
    spill: Vec<u8>,
) -> io::Result<()> {
    let Some(name) = request.target.strip_prefix("/files/") else {
        return http::write_response(conn, Status::NotFound, TEXT, b"");
    };
    if !is_safe_filename(name) {
        return http::write_response(conn, Status::BadRequest, TEXT, b"");
    }
    let Some(length) = request
        .header("Content-Length")
        .and_then(|value| value.parse::<u64>().ok())
    else {
        return http::write_response(conn, Status::BadRequest, TEXT, b"");
    };
    if length > MAX_BODY_BYTES {
        return http::write_response(conn, Status::BadRequest, TEXT, b"");
    }

    let body = match read_body(conn, spill, length as usize) {
        Ok(Some(body)) => body,
        // Peer closed before delivering the declared length.
        Ok(None) => return http::write_response(conn, Status::BadRequest, TEXT, b""),
        Err(_) => return http::write_response(conn, Status::InternalServerError, TEXT, b""),
    };

    match fs::write(files_dir.join(name), &body) {
        Ok(()) => http::write_response(conn, Status::Created, TEXT, b""),
        Err(_) => http::write_response(conn, Status::InternalServerError, TEXT, b""),
    }
}

fn read_body<S: Read>(conn: &mut S, spill: Vec<u8>, length: usize) -> io::Result<Option<Vec<u8>>> {
    let mut body = spill;
    if body.len() > length {
        body.truncate(length);
    }
    if body.len() < length {
        let remaining = (length - body.len()) as u64;
        body.reserve(remaining as usize);
        conn.by_ref().take(remaining).read_to_end(&mut body)?;
    }
    if body.len() < length {
        return Ok(None);
    }
    Ok(Some(body))
}

fn send<S: Write>(
    conn: &mut S,
    status: Status,
    content_type: &str,
    body: &[u8],
    head_only: bool,
) -> io::Result<()> {
    if head_only {
        http::write_head_only(conn, status, content_type, body.len() as u64)
    } else {
        http::write_response(conn, status, content_type, body)
    }
}

pub(crate) fn is_safe_filename(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    if name.starts_with('/') || name.contains("..") || name.contains('\\') {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct FakeConn {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl FakeConn {
        fn new(wire: &[u8]) -> Self {
            Self {
                input: Cursor::new(wire.to_vec()),
                output: Vec::new(),
            }
        }

        fn response(&self) -> String {
            String::from_utf8_lossy(&self.output).into_owned()
        }
    }

    impl Read for FakeConn {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for FakeConn {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.output.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn roundtrip(wire: &[u8], files_dir: &Path) -> String {
        let mut conn = FakeConn::new(wire);
        handle_connection(&mut conn, files_dir).expect("handle");
        conn.response()
    }

    #[test]
    fn root_serves_hello() {
        let dir = tempfile::tempdir().expect("tempdir");
        let response = roundtrip(b"GET / HTTP/1.1\r\n\r\n", dir.path());
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.ends_with("\r\n\r\nHello, world!"));
    }

    #[test]
    fn echo_returns_suffix_verbatim() {
        let dir = tempfile::tempdir().expect("tempdir");
        let response = roundtrip(b"GET /echo/abc%20def HTTP/1.1\r\n\r\n", dir.path());
        assert!(response.contains("Content-Length: 9"));
        assert!(response.ends_with("abc%20def"));
    }

    #[test]
    fn user_agent_echoes_header() {
        let dir = tempfile::tempdir().expect("tempdir");
        let response = roundtrip(
            b"GET /user-agent HTTP/1.1\r\nUser-Agent: foo/1.2\r\n\r\n",
            dir.path(),
        );
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.ends_with("foo/1.2"));
    }

    #[test]
    fn user_agent_without_header_is_bad_request() {
        let dir = tempfile::tempdir().expect("tempdir");
        let response = roundtrip(b"GET /user-agent HTTP/1.1\r\nHost: x\r\n\r\n", dir.path());
        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    #[test]
    fn unknown_target_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let response = roundtrip(b"GET /missing HTTP/1.1\r\n\r\n", dir.path());
        assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
    }

    #[test]
    fn unsupported_method_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let response = roundtrip(b"DELETE / HTTP/1.1\r\n\r\n", dir.path());
        assert!(response.starts_with("HTTP/1.1 405 Method Not Allowed\r\n"));
    }

    #[test]
    fn head_reports_length_without_body() {
        let dir = tempfile::tempdir().expect("tempdir");
        let response = roundtrip(b"HEAD /echo/four HTTP/1.1\r\n\r\n", dir.path());
        assert!(response.contains("Content-Length: 4"));
        assert!(response.ends_with("\r\n\r\n"));
    }

    #[test]
    fn files_get_reads_from_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("greeting"), b"hi there").expect("write");
        let response = roundtrip(b"GET /files/greeting HTTP/1.1\r\n\r\n", dir.path());
        assert!(response.contains("Content-Type: application/octet-stream"));
        assert!(response.ends_with("hi there"));
    }

    #[test]
    fn files_get_missing_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let response = roundtrip(b"GET /files/absent HTTP/1.1\r\n\r\n", dir.path());
        assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
    }

    #[test]
    fn files_post_writes_body() {
        let dir = tempfile::tempdir().expect("tempdir");
        let response = roundtrip(
            b"POST /files/note HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello",
            dir.path(),
        );
        assert!(response.starts_with("HTTP/1.1 201 Created\r\n"));
        let written = std::fs::read(dir.path().join("note")).expect("read back");
        assert_eq!(written, b"hello");
    }

    #[test]
    fn files_post_without_length_is_bad_request() {
        let dir = tempfile::tempdir().expect("tempdir");
        let response = roundtrip(b"POST /files/note HTTP/1.1\r\n\r\nhello", dir.path());
        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    #[test]
    fn files_post_short_body_is_bad_request() {
        let dir = tempfile::tempdir().expect("tempdir");
        let response = roundtrip(
            b"POST /files/note HTTP/1.1\r\nContent-Length: 50\r\n\r\nshort",
            dir.path(),
        );
        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(!dir.path().join("note").exists());
    }

    #[test]
    fn files_post_over_cap_is_bad_request() {
        let dir = tempfile::tempdir().expect("tempdir");
        let wire = format!(
            "POST /files/big HTTP/1.1\r\nContent-Length: {}\r\n\r\n",
            MAX_BODY_BYTES + 1
        );
        let response = roundtrip(wire.as_bytes(), dir.path());
        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    #[test]
    fn oversized_head_is_bad_request() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut wire = b"GET /echo/".to_vec();
        wire.resize(http::MAX_HEAD_BYTES + 512, b'a');
        let response = roundtrip(&wire, dir.path());
        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    #[test]
    fn unparsable_request_line_is_bad_request() {
        let dir = tempfile::tempdir().expect("tempdir");
        let bare = roundtrip(b"GET\r\n\r\n", dir.path());
        assert!(bare.starts_with("HTTP/1.1 400 Bad Request\r\n"));

        let binary = roundtrip(b"\xff\xfe\x01\r\n\r\n", dir.path());
        assert!(binary.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    #[test]
    fn safe_filename_policy() {
        assert!(is_safe_filename("notes.txt"));
        assert!(is_safe_filename("sub/dir-file"));
        assert!(!is_safe_filename(""));
        assert!(!is_safe_filename("/etc/passwd"));
        assert!(!is_safe_filename("../secret"));
        assert!(!is_safe_filename("a..b"));
        assert!(!is_safe_filename("win\\path"));
    }

    #[test]
    fn traversal_target_is_bad_request() {
        let dir = tempfile::tempdir().expect("tempdir");
        let response = roundtrip(b"GET /files/../outside HTTP/1.1\r\n\r\n", dir.path());
        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }
}
