//! Sample CGI program: reads `QUERY_STRING`/`CONTENT_LENGTH` and stdin,
//! writes headers + body to stdout. Used by the integration tests to
//! exercise the server's CGI dispatch path.

use std::io::{self, Read, Write};

fn main() -> io::Result<()> {
    let query = std::env::var("QUERY_STRING").unwrap_or_default();

    let mut body = String::new();
    if let Ok(len) = std::env::var("CONTENT_LENGTH") {
        if let Ok(len) = len.parse::<usize>() {
            let mut buf = vec![0u8; len];
            io::stdin().read_exact(&mut buf)?;
            body = String::from_utf8_lossy(&buf).into_owned();
        }
    }

    let payload = format!("query_string={query}&body={body}");
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write!(out, "Content-Type: text/plain\r\n")?;
    write!(out, "Content-Length: {}\r\n", payload.len())?;
    write!(out, "\r\n")?;
    write!(out, "{payload}")?;
    out.flush()
}
