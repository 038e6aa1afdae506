//! The per-connection request handler: parses one HTTP request, classifies
//! it as static or dynamic, and produces exactly one response. Pure
//! per-connection logic — no knowledge of the queue or the thread pool.

use std::fs::{self, File};
use std::io;
use std::os::unix::fs::PermissionsExt;

use log::{debug, warn};
use memmap2::Mmap;

use crate::cgi;
use crate::http;
use crate::net::Connection;
use crate::queue::UNKNOWN_WEIGHT;

/// Bound on the request line / header line length, and on the pre-accept
/// peek buffer.
pub const MAXBUF: usize = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Static,
    Dynamic,
}

#[derive(Debug)]
pub struct PathTraversal;

/// URI normalization. Returns the derived filename, the CGI query
/// string (empty unless dynamic), and the static/dynamic classification.
pub fn normalize_uri(uri: &str) -> Result<(String, String, Classification), PathTraversal> {
    if uri.contains("..") {
        return Err(PathTraversal);
    }

    if !uri.contains("cgi") {
        let mut filename = format!(".{uri}");
        if uri.ends_with('/') {
            filename.push_str("index.html");
        }
        Ok((filename, String::new(), Classification::Static))
    } else {
        match uri.split_once('?') {
            Some((path, query)) => Ok((format!(".{path}"), query.to_string(), Classification::Dynamic)),
            None => Ok((format!(".{uri}"), String::new(), Classification::Dynamic)),
        }
    }
}

/// Parses the request line out of a raw peeked buffer without consuming
/// anything from the socket, returning (method, uri, version) or `None`
/// if fewer than three whitespace-separated tokens are present.
fn parse_request_line(line: &str) -> Option<(&str, &str, &str)> {
    let mut parts = line.trim_end_matches(['\r', '\n']).split_whitespace();
    let method = parts.next()?;
    let uri = parts.next()?;
    let version = parts.next()?;
    Some((method, uri, version))
}

/// The pre-accept size peek used by SFF. Returns the byte size of
/// the static file the GET would serve, or [`UNKNOWN_WEIGHT`] on any
/// disqualifying condition.
pub fn peek_weight(conn: &Connection) -> i64 {
    let mut buf = [0u8; MAXBUF];
    let n = match conn.peek(&mut buf[..MAXBUF - 1]) {
        Ok(n) if n > 0 => n,
        _ => return UNKNOWN_WEIGHT,
    };

    let data = &buf[..n];
    let line_len = data
        .iter()
        .position(|&b| b == b'\n')
        .map(|i| i + 1)
        .unwrap_or(n);

    let Ok(line) = std::str::from_utf8(&data[..line_len]) else {
        return UNKNOWN_WEIGHT;
    };

    let Some((method, uri, _version)) = parse_request_line(line) else {
        return UNKNOWN_WEIGHT;
    };

    if !method.eq_ignore_ascii_case("GET") {
        return UNKNOWN_WEIGHT;
    }

    let Ok((filename, _, classification)) = normalize_uri(uri) else {
        return UNKNOWN_WEIGHT;
    };

    if classification != Classification::Static {
        return UNKNOWN_WEIGHT;
    }

    match fs::metadata(&filename) {
        Ok(meta) => meta.len() as i64,
        Err(_) => UNKNOWN_WEIGHT,
    }
}

/// Handles one already-accepted connection end to end, logging (rather
/// than propagating) any transport-level failure — a bad or disconnected
/// client must never take down the worker loop.
pub fn handle_connection(conn: &mut Connection) {
    if let Err(e) = handle_connection_inner(conn) {
        warn!("connection from {} abandoned: {e}", conn.peer_addr());
    }
}

fn handle_connection_inner(conn: &mut Connection) -> io::Result<()> {
    let line = conn.read_line(MAXBUF)?;
    if line.is_empty() {
        return Ok(());
    }

    let text = String::from_utf8_lossy(&line).into_owned();
    let Some((method, uri, _version)) = parse_request_line(&text) else {
        conn.write_all(&http::error_response(400, "Bad Request", "malformed request line"))?;
        return Ok(());
    };
    let method = method.to_string();
    let uri = uri.to_string();

    debug!("{method} {uri} from {}", conn.peer_addr());

    if uri.contains("..") {
        conn.write_all(&http::error_response(
            403,
            "Path traversal attempt detected in URI",
            &uri,
        ))?;
        return Ok(());
    }

    let is_get = method.eq_ignore_ascii_case("GET");
    let is_post = method.eq_ignore_ascii_case("POST");
    if !is_get && !is_post {
        conn.write_all(&http::error_response(501, "Method not implemented", &method))?;
        return Ok(());
    }

    // uri has already been checked for ".."; normalize_uri cannot fail here.
    let (filename, cgi_args, classification) = normalize_uri(&uri).expect("no .. present");

    let content_length = match read_content_length(conn)? {
        Some(len) => len,
        None => return Ok(()),
    };

    let body = if is_post {
        if content_length == 0 {
            conn.write_all(&http::error_response(
                411,
                "Missing required Content-Length",
                &uri,
            ))?;
            return Ok(());
        }

        let mut buf = Vec::new();
        if buf.try_reserve_exact(content_length).is_err() {
            conn.write_all(&http::error_response(
                500,
                "Could not allocate request body buffer",
                &uri,
            ))?;
            return Ok(());
        }
        buf.resize(content_length, 0);
        conn.read_exact(&mut buf)?;
        buf
    } else {
        Vec::new()
    };

    let metadata = match fs::metadata(&filename) {
        Ok(m) => m,
        Err(_) => {
            conn.write_all(&http::error_response(
                404,
                "Could not find file requested",
                &filename,
            ))?;
            return Ok(());
        }
    };

    match classification {
        Classification::Static => {
            if is_post {
                conn.write_all(&http::error_response(
                    405,
                    "POST not allowed on static content",
                    &filename,
                ))?;
                return Ok(());
            }
            if !metadata.is_file() || !readable_by_owner(&metadata) {
                conn.write_all(&http::error_response(
                    403,
                    "Access denied to requested file",
                    &filename,
                ))?;
                return Ok(());
            }
            serve_static(conn, &filename, metadata.len() as usize)?;
        }
        Classification::Dynamic => {
            if !metadata.is_file() || !executable_by_owner(&metadata) {
                conn.write_all(&http::error_response(
                    403,
                    "CGI program is not executable",
                    &filename,
                ))?;
                return Ok(());
            }
            if is_post {
                cgi::run_post(conn, &filename, &cgi_args, &body)?;
            } else {
                cgi::run_get(conn, &filename, &cgi_args)?;
            }
        }
    }

    Ok(())
}

/// Reads headers until the `\r\n` terminator, capturing `Content-Length`
/// if present (case-insensitively), defaulting to 0. Returns `None` if
/// the connection hit EOF before the terminator.
fn read_content_length(conn: &mut Connection) -> io::Result<Option<usize>> {
    let mut content_length = 0usize;

    loop {
        let line = conn.read_line(MAXBUF)?;
        if line.is_empty() {
            return Ok(None);
        }
        if line == b"\r\n" || line == b"\n" {
            break;
        }

        let Ok(text) = std::str::from_utf8(&line) else {
            continue;
        };
        let text = text.trim_end_matches(['\r', '\n']);

        if let Some((key, value)) = text.split_once(':') {
            if key.trim().eq_ignore_ascii_case("content-length") {
                if let Ok(n) = value.trim().parse::<usize>() {
                    content_length = n;
                }
            }
        }
    }

    Ok(Some(content_length))
}

fn readable_by_owner(meta: &fs::Metadata) -> bool {
    meta.permissions().mode() & 0o400 != 0
}

fn executable_by_owner(meta: &fs::Metadata) -> bool {
    meta.permissions().mode() & 0o100 != 0
}

fn serve_static(conn: &mut Connection, filename: &str, size: usize) -> io::Result<()> {
    let content_type = http::content_type_for(filename);
    conn.write_all(&http::static_response_headers(200, "OK", size, content_type))?;

    if size == 0 {
        return Ok(());
    }

    let file = File::open(filename)?;
    let mmap = unsafe { Mmap::map(&file)? };
    conn.write_all(&mmap[..])
}
