//! CGI dispatch. Spawn-per-request is the design
//! contract: each dynamic request gets its own child process with its
//! standard streams redirected, `std::process::Command` standing in for
//! the classic fork+exec+dup2 sequence.

use std::io::{self, Write};
use std::os::fd::{FromRawFd, IntoRawFd};
use std::process::{Command, Stdio};

use log::debug;

use crate::http;
use crate::net::Connection;

/// GET-style CGI: no request body, just `QUERY_STRING`.
pub fn run_get(conn: &mut Connection, filename: &str, query_string: &str) -> io::Result<()> {
    conn.write_all(&http::cgi_prelude())?;

    let out_fd = duplicate_as_stdio(conn)?;
    debug!("spawning CGI {filename} (GET, query_string={query_string:?})");

    let mut child = Command::new(filename)
        .env("QUERY_STRING", query_string)
        .stdout(out_fd)
        .spawn()?;

    child.wait()?;
    Ok(())
}

/// POST-style CGI: the body is forwarded over a pipe to the child's
/// stdin; the write end is closed (dropped) once the whole body has been
/// written, signalling EOF to the child.
pub fn run_post(conn: &mut Connection, filename: &str, query_string: &str, body: &[u8]) -> io::Result<()> {
    conn.write_all(&http::cgi_prelude())?;

    let out_fd = duplicate_as_stdio(conn)?;
    debug!(
        "spawning CGI {filename} (POST, {} byte body, query_string={query_string:?})",
        body.len()
    );

    let mut child = Command::new(filename)
        .env("QUERY_STRING", query_string)
        .env("CONTENT_LENGTH", body.len().to_string())
        .stdin(Stdio::piped())
        .stdout(out_fd)
        .spawn()?;

    {
        let mut stdin = child.stdin.take().expect("stdin was requested as piped");
        stdin.write_all(body)?;
    } // dropping `stdin` here closes the pipe's write end

    child.wait()?;
    Ok(())
}

/// Duplicates the connection's underlying file descriptor into a `Stdio`
/// suitable for handing to a child process's stdout — the CGI program
/// writes its response body directly to the client socket.
fn duplicate_as_stdio(conn: &Connection) -> io::Result<Stdio> {
    let cloned = conn.stream().try_clone()?;
    // SAFETY: `cloned` owns a fresh, valid, open file descriptor that we
    // immediately hand off to `Stdio` without any other use of it.
    Ok(unsafe { Stdio::from_raw_fd(cloned.into_raw_fd()) })
}
