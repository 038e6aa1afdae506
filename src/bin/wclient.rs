//! Trivial single-shot HTTP/1.0 client: connect, send one request line
//! (and optional body), print the raw response to stdout. Not part of
//! the scheduling core — a debugging/manual-testing interface the core
//! consumes as an external collaborator.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::process::ExitCode;

fn usage() -> ! {
    eprintln!("usage: wclient <host:port> <method> <path> [body]");
    std::process::exit(1);
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 3 {
        usage();
    }

    let addr = &args[0];
    let method = &args[1];
    let path = &args[2];
    let body = args.get(3).map(String::as_str).unwrap_or("");

    if let Err(e) = run(addr, method, path, body) {
        eprintln!("wclient: {e}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run(addr: &str, method: &str, path: &str, body: &str) -> io::Result<()> {
    let mut stream = TcpStream::connect(addr)?;

    let mut request = format!("{method} {path} HTTP/1.0\r\n");
    if !body.is_empty() {
        request.push_str(&format!("Content-Length: {}\r\n", body.len()));
    }
    request.push_str("\r\n");
    request.push_str(body);

    stream.write_all(request.as_bytes())?;

    let mut response = Vec::new();
    stream.read_to_end(&mut response)?;
    io::stdout().write_all(&response)
}
