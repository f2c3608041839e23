//! Nonblocking socket transport, abstracted behind a narrow trait so the
//! readiness loop never names `mio` or `std::net` directly.

use std::io::{self, Read, Write};
use std::net::SocketAddr;

use mio::{Interest, Registry, Token};

/// A nonblocking, readiness-multiplexer-registerable byte stream.
pub trait Transport: Read + Write + Send {
    fn register(&mut self, registry: &Registry, token: Token, interest: Interest) -> io::Result<()>;
    fn reregister(&mut self, registry: &Registry, token: Token, interest: Interest) -> io::Result<()>;
    fn deregister(&mut self, registry: &Registry) -> io::Result<()>;
    /// Pending socket error, if any — used right after a writable event to
    /// tell a completed nonblocking connect from a failed one.
    fn take_error(&self) -> io::Result<Option<io::Error>>;
}

/// Host backend: a nonblocking TCP stream.
pub struct TcpTransport {
    stream: mio::net::TcpStream,
}

impl TcpTransport {
    /// Begin a nonblocking connect. The connection completes asynchronously;
    /// callers observe completion as a write-readiness event.
    pub fn connect(addr: SocketAddr) -> io::Result<Self> {
        Ok(Self { stream: mio::net::TcpStream::connect(addr)? })
    }
}

impl Read for TcpTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for TcpTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

impl Transport for TcpTransport {
    fn register(&mut self, registry: &Registry, token: Token, interest: Interest) -> io::Result<()> {
        registry.register(&mut self.stream, token, interest)
    }

    fn reregister(&mut self, registry: &Registry, token: Token, interest: Interest) -> io::Result<()> {
        registry.reregister(&mut self.stream, token, interest)
    }

    fn deregister(&mut self, registry: &Registry) -> io::Result<()> {
        registry.deregister(&mut self.stream)
    }

    fn take_error(&self) -> io::Result<Option<io::Error>> {
        self.stream.take_error()
    }
}
