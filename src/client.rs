use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};

use bytes::BytesMut;

use crate::protocol::{Codec, Value};

/// Blocking client over `std::net::TcpStream`.
pub struct Client {
    stream: TcpStream,
    codec: Codec,
    read_buffer: BytesMut,
}

impl Client {
    pub fn connect(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        Ok(Self {
            stream,
            codec: Codec::default(),
            read_buffer: BytesMut::with_capacity(4096),
        })
    }

    pub fn stream(&self) -> &TcpStream {
        &self.stream
    }

    /// Sends one request without waiting for its response.
    pub fn send<A: AsRef<[u8]>>(&mut self, args: &[A]) -> io::Result<()> {
        let mut frame = BytesMut::new();
        self.codec.encode_request(args, &mut frame);
        self.stream.write_all(&frame)
    }

    /// Blocks until one full response frame has arrived.
    pub fn receive(&mut self) -> io::Result<Value> {
        let mut chunk = [0u8; 4096];
        loop {
            match self.codec.decode_response(&mut self.read_buffer) {
                Ok(Some(value)) => return Ok(value),
                Ok(None) => {}
                Err(e) => return Err(io::Error::new(io::ErrorKind::InvalidData, e)),
            }
            let n = self.stream.read(&mut chunk)?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed by server",
                ));
            }
            self.read_buffer.extend_from_slice(&chunk[..n]);
        }
    }

    pub fn call<A: AsRef<[u8]>>(&mut self, args: &[A]) -> io::Result<Value> {
        self.send(args)?;
        self.receive()
    }
}
