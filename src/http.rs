//! Response formatting: status lines, the static-file content-type table,
//! and the shared error-page template.

const SERVER_HEADER: &str = "Server: OSTEP WebServer\r\n";

pub fn status_line(code: u16, short: &str) -> String {
    format!("HTTP/1.0 {code} {short}\r\n")
}

/// Content type by substring containment in the filename, first match
/// wins in this order, falling back to `text/plain`.
pub fn content_type_for(filename: &str) -> &'static str {
    const TABLE: &[(&str, &str)] = &[
        (".html", "text/html"),
        (".gif", "image/gif"),
        (".jpg", "image/jpeg"),
        (".pdf", "application/pdf"),
        (".css", "text/css"),
        (".js", "application/javascript"),
    ];

    TABLE
        .iter()
        .find(|(suffix, _)| filename.contains(suffix))
        .map(|(_, mime)| *mime)
        .unwrap_or("text/plain")
}

/// Builds a complete static-response header block (status line, server,
/// content-length, content-type, blank line). The body is written
/// separately by the caller (typically a memory-mapped file region).
pub fn static_response_headers(code: u16, short: &str, content_length: usize, content_type: &str) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(status_line(code, short).as_bytes());
    out.extend_from_slice(SERVER_HEADER.as_bytes());
    out.extend_from_slice(format!("Content-Length: {content_length}\r\n").as_bytes());
    out.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
    out.extend_from_slice(b"\r\n");
    out
}

/// Minimal prelude for a CGI response: status line + Server header, with
/// no blank line yet — the CGI child is responsible for the remaining
/// headers and the separator.
pub fn cgi_prelude() -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(status_line(200, "OK").as_bytes());
    out.extend_from_slice(SERVER_HEADER.as_bytes());
    out
}

pub fn status_text(code: u16) -> &'static str {
    match code {
        200 => "OK",
        204 => "No Content",
        403 => "Forbidden",
        404 => "Not found",
        405 => "Method Not Allowed",
        411 => "Length Required",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        _ => "Error",
    }
}

/// Renders the shared HTML error body and wraps it with headers, matching
/// Same template for every error, `errnum`/`shortmsg`/`longmsg`/
/// `cause` interpolated, `Content-Type: text/html`.
pub fn error_response(code: u16, longmsg: &str, cause: &str) -> Vec<u8> {
    let short = status_text(code);
    let body = format!(
        "<html><head><title>OSTEP WebServer Error</title></head>\
         <body bgcolor=\"ffffff\">\n\
         <h2>{code} {short}</h2>\n\
         <p>{longmsg}: {cause}</p>\n\
         <hr><em>OSTEP WebServer</em>\n\
         </body></html>\n"
    );

    let mut out = Vec::new();
    out.extend_from_slice(status_line(code, short).as_bytes());
    out.extend_from_slice(SERVER_HEADER.as_bytes());
    out.extend_from_slice(format!("Content-Length: {}\r\n", body.len()).as_bytes());
    out.extend_from_slice(b"Content-Type: text/html\r\n");
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(body.as_bytes());
    out
}
