//! Blocking socket I/O primitives.
//!
//! This is the thin, directly-testable layer the admission/scheduling core
//! builds on: open a listening endpoint, accept connections, read/write
//! byte ranges, read one `\n`-terminated line bounded by a maximum length,
//! and peek the first bytes of a connection without consuming them. None
//! of it knows about HTTP, the queue, or worker threads.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};

use socket2::{Domain, Socket, Type};

/// Backlog handed to `listen(2)`. `std::net::TcpListener::bind` hardcodes a
/// backlog of 128 with no way to change it, so the listening socket is
/// built by hand via `socket2` instead.
const LISTEN_BACKLOG: i32 = 1024;

/// One accepted connection. Cheap to move into the scheduling queue; the
/// worker that eventually dequeues it owns it exclusively until drop.
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
}

impl Connection {
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Reads bytes into `buf` without removing them from the socket's
    /// receive buffer, returning how many bytes were read.
    pub fn peek(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.peek(buf)
    }

    /// Reads a single `\n`-terminated line, one byte at a time, bounded by
    /// `max_len`. Returns an empty vector iff EOF was reached before any
    /// byte was read; a connection that's closed mid-line yields whatever
    /// was read so far rather than being silently discarded.
    pub fn read_line(&mut self, max_len: usize) -> io::Result<Vec<u8>> {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];

        loop {
            let n = self.stream.read(&mut byte)?;
            if n == 0 {
                break;
            }
            line.push(byte[0]);
            if byte[0] == b'\n' || line.len() >= max_len {
                break;
            }
        }

        Ok(line)
    }

    pub fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.stream.read_exact(buf)
    }

    pub fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.stream.write_all(buf)
    }

    pub fn shutdown_read(&self) -> io::Result<()> {
        self.stream.shutdown(std::net::Shutdown::Read)
    }

    /// Access to the raw stream, used only where we must hand a live file
    /// descriptor to a child process (CGI stdout redirection) or mmap a
    /// response body write.
    pub fn stream(&self) -> &TcpStream {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut TcpStream {
        &mut self.stream
    }
}

/// Binds a listening socket on all interfaces at `port` with an explicit
/// backlog, matching the architecture's "large fixed backlog" requirement
/// rather than the standard library's hardcoded default.
pub fn listen(port: u16) -> io::Result<TcpListener> {
    let addr: std::net::SocketAddr = (std::net::Ipv4Addr::UNSPECIFIED, port).into();

    let socket = Socket::new(Domain::IPV4, Type::STREAM, None)?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(LISTEN_BACKLOG)?;

    Ok(socket.into())
}

/// Accepts one connection from `listener`, blocking until a client arrives.
pub fn accept(listener: &TcpListener) -> io::Result<Connection> {
    let (stream, peer) = listener.accept()?;
    Ok(Connection { stream, peer })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use std::thread;

    #[test]
    fn test_read_line_stops_at_newline() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let client = thread::spawn(move || {
            let mut stream = TcpStream::connect(addr).unwrap();
            stream.write_all(b"GET / HTTP/1.0\r\nHost: x\r\n\r\n").unwrap();
        });

        let mut conn = accept(&listener).unwrap();
        let line = conn.read_line(4096).unwrap();
        assert_eq!(line, b"GET / HTTP/1.0\r\n");
        client.join().unwrap();
    }

    #[test]
    fn test_read_line_returns_empty_on_immediate_eof() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let client = thread::spawn(move || {
            let stream = TcpStream::connect(addr).unwrap();
            drop(stream);
        });

        let mut conn = accept(&listener).unwrap();
        let line = conn.read_line(4096).unwrap();
        assert!(line.is_empty());
        client.join().unwrap();
    }

    #[test]
    fn test_listen_accepts_a_connection_on_an_ephemeral_port() {
        let listener = listen(0).unwrap();
        let addr = listener.local_addr().unwrap();
        assert_ne!(addr.port(), 0);

        let client = thread::spawn(move || TcpStream::connect(addr).unwrap());
        let conn = accept(&listener).unwrap();

        assert_eq!(conn.peer_addr(), client.join().unwrap().local_addr().unwrap());
    }

    #[test]
    fn test_peek_does_not_consume() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let client = thread::spawn(move || {
            let mut stream = TcpStream::connect(addr).unwrap();
            stream.write_all(b"hello").unwrap();
            thread::sleep(std::time::Duration::from_millis(50));
        });

        let conn = accept(&listener).unwrap();
        let mut buf = [0u8; 16];
        let n = conn.peek(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello");

        let mut conn = conn;
        let mut again = vec![0u8; n];
        conn.read_exact(&mut again).unwrap();
        assert_eq!(again, b"hello");
        client.join().unwrap();
    }
}
