use std::io::{self, ErrorKind, Read, Write};
use std::time::Instant;

use bytes::{Buf, BytesMut};
use mio::{net::TcpStream, Interest, Token};

use crate::protocol::{Codec, ProtocolError, Value};

const READ_CHUNK: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    AwaitingRequest,
    SendingResponse,
    Closed,
}

impl ClientState {
    /// Readiness the socket should be registered for in this state.
    pub fn interest(self) -> Interest {
        match self {
            ClientState::SendingResponse => Interest::WRITABLE,
            _ => Interest::READABLE,
        }
    }
}

pub struct Client {
    pub socket: TcpStream,
    pub token: Token,
    pub read_buffer: BytesMut,
    pub write_buffer: BytesMut,
    pub state: ClientState,
    pub last_active: Instant,
    /// Readiness currently registered with the poller.
    pub interest: Interest,
    /// The peer has shut down its side of the connection.
    pub peer_closed: bool,
}

impl Client {
    pub fn new(socket: TcpStream, token: Token, now: Instant) -> Self {
        Self {
            socket,
            token,
            read_buffer: BytesMut::with_capacity(4096),
            write_buffer: BytesMut::new(),
            state: ClientState::AwaitingRequest,
            last_active: now,
            interest: Interest::READABLE,
            peer_closed: false,
        }
    }

    /// Reads until the socket would block or the peer closes.
    pub fn read_data(&mut self) -> io::Result<usize> {
        if self.state != ClientState::AwaitingRequest || self.peer_closed {
            return Ok(0);
        }

        let mut chunk = [0u8; READ_CHUNK];
        let mut total_read = 0;

        loop {
            match self.socket.read(&mut chunk) {
                Ok(0) => {
                    // Connection closed by client
                    self.peer_closed = true;
                    break;
                }
                Ok(n) => {
                    log::debug!("Read {} bytes from client {}", n, self.token.0);
                    self.read_buffer.extend_from_slice(&chunk[..n]);
                    total_read += n;
                }
                // No more data available right now
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::error!("Error reading from client {}: {}", self.token.0, e);
                    self.state = ClientState::Closed;
                    return Err(e);
                }
            }
        }

        Ok(total_read)
    }

    /// Takes the next complete request out of the read buffer.
    pub fn next_request(&mut self, codec: &Codec) -> Result<Option<Vec<Vec<u8>>>, ProtocolError> {
        codec.decode_request(&mut self.read_buffer)
    }

    pub fn add_response(&mut self, codec: &Codec, response: &Value) {
        let before = self.write_buffer.len();
        codec.encode_response(response, &mut self.write_buffer);
        log::debug!(
            "Queued {} byte response for client {}",
            self.write_buffer.len() - before,
            self.token.0
        );
        self.state = ClientState::SendingResponse;
    }

    /// Writes until the buffer drains or the socket would block. A drained
    /// buffer returns the client to `AwaitingRequest`.
    pub fn write_data(&mut self) -> io::Result<usize> {
        let mut total_written = 0;

        while self.write_buffer.has_remaining() {
            match self.socket.write(&self.write_buffer) {
                Ok(0) => {
                    self.state = ClientState::Closed;
                    return Err(io::Error::new(ErrorKind::WriteZero, "socket closed"));
                }
                Ok(n) => {
                    log::debug!("Wrote {} bytes to client {}", n, self.token.0);
                    self.write_buffer.advance(n);
                    total_written += n;
                }
                // Socket not ready for more writing
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(total_written),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::error!("Error writing to client {}: {}", self.token.0, e);
                    self.state = ClientState::Closed;
                    return Err(e);
                }
            }
        }

        // Finished writing all data
        self.write_buffer.clear();
        if self.state == ClientState::SendingResponse {
            self.state = ClientState::AwaitingRequest;
        }
        Ok(total_written)
    }

    pub fn close(&mut self) {
        self.state = ClientState::Closed;
        self.read_buffer.clear();
        self.write_buffer.clear();
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, ClientState::Closed)
    }
}
