use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::time::{Duration, Instant};

use mio::net::TcpListener;
use mio::{Events, Interest, Poll, Token, Waker};

use super::client::{Client, ClientState};
use super::config::ServerConfig;
use super::event_loop_handle::{EventLoopHandle, EventLoopMessage};
use super::idle_list::IdleList;
use crate::commands::{CommandExecutor, CommandParser, KvCommandExecutor};
use crate::protocol::Codec;

const SERVER_TOKEN: Token = Token(0);
const WAKER_TOKEN: Token = Token(usize::MAX);

pub struct EventLoop {
    poll: Poll,
    events: Events,
    server: TcpListener,
    clients: HashMap<Token, Client>,
    idle: IdleList,
    command_executor: KvCommandExecutor,
    codec: Codec,
    config: ServerConfig,
    next_token: usize,

    #[allow(dead_code)] // kept alive for the handles
    waker: Arc<Waker>,
    message_receiver: Receiver<EventLoopMessage>,
    event_loop_handle: EventLoopHandle,
}

impl EventLoop {
    pub fn new(mut server: TcpListener, config: ServerConfig) -> io::Result<Self> {
        let poll = Poll::new()?;
        let events = Events::with_capacity(1024);
        let waker = Arc::new(Waker::new(poll.registry(), WAKER_TOKEN)?);

        let (sender, receiver) = mpsc::channel();
        let handle = EventLoopHandle::new(sender, Arc::clone(&waker));

        poll.registry()
            .register(&mut server, SERVER_TOKEN, Interest::READABLE)?;

        Ok(EventLoop {
            poll,
            events,
            server,
            clients: HashMap::new(),
            idle: IdleList::new(),
            command_executor: KvCommandExecutor::new(),
            codec: Codec::new(config.max_message_size, config.max_args),
            config,
            next_token: 1, // 0 is reserved for the listener
            waker,
            message_receiver: receiver,
            event_loop_handle: handle,
        })
    }

    pub fn get_handle(&self) -> EventLoopHandle {
        self.event_loop_handle.clone()
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.server.local_addr()
    }

    pub fn run(&mut self) -> io::Result<()> {
        log::info!("Event loop started");

        loop {
            let timeout = self.calculate_poll_timeout(Instant::now());

            // Block until events are ready or timeout
            if let Err(e) = self.poll.poll(&mut self.events, Some(timeout)) {
                if e.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(e);
            }

            if self.process_messages() {
                self.close_all_clients();
                self.command_executor.flush();
                log::info!("Event loop stopped");
                return Ok(());
            }

            // Collect events to avoid borrowing conflicts
            let ready: Vec<(Token, bool, bool)> = self
                .events
                .iter()
                .map(|event| {
                    (
                        event.token(),
                        event.is_readable() || event.is_read_closed() || event.is_error(),
                        event.is_writable() || event.is_write_closed() || event.is_error(),
                    )
                })
                .collect();

            let mut accept = false;
            for (token, readable, writable) in ready {
                match token {
                    SERVER_TOKEN => accept = true,
                    WAKER_TOKEN => continue,
                    token => self.handle_client_event(token, readable, writable),
                }
            }

            // Clean up closed connections
            self.cleanup_closed_clients();

            let now = Instant::now();
            self.evict_idle_clients(now);
            self.command_executor
                .expire_keys(now, self.config.expire_batch);

            if accept {
                self.handle_new_connections()?;
            }
        }
    }

    /// Returns true when the loop was asked to stop.
    fn process_messages(&mut self) -> bool {
        let mut shutdown = false;
        while let Ok(message) = self.message_receiver.try_recv() {
            match message {
                EventLoopMessage::Shutdown => shutdown = true,
            }
        }
        shutdown
    }

    fn handle_new_connections(&mut self) -> io::Result<()> {
        loop {
            match self.server.accept() {
                Ok((mut socket, addr)) => {
                    let token = Token(self.next_token);
                    self.next_token += 1;

                    log::info!("New client connection from {} with token {}", addr, token.0);

                    // Register new client for read events
                    self.poll
                        .registry()
                        .register(&mut socket, token, Interest::READABLE)?;

                    self.clients
                        .insert(token, Client::new(socket, token, Instant::now()));
                    self.idle.push_back(token);
                }
                // No more connections to accept right now
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    // Out of descriptors and similar; the listener stays usable.
                    log::error!("Error accepting connection: {}", e);
                    break;
                }
            }
        }

        Ok(())
    }

    fn handle_client_event(&mut self, token: Token, readable: bool, writable: bool) {
        let Some(client) = self.clients.get_mut(&token) else {
            return;
        };
        client.last_active = Instant::now();
        self.idle.touch(token);

        // Ignore readiness the current state is not waiting for
        match client.state {
            ClientState::AwaitingRequest if readable => {}
            ClientState::SendingResponse if writable => {}
            _ => return,
        }

        if let Err(e) = self.drive_client(token) {
            log::warn!("Closing client {}: {}", token.0, e);
            if let Some(client) = self.clients.get_mut(&token) {
                client.close();
            }
        }
    }

    /// Runs a connection's state machine until it has to wait for the socket.
    fn drive_client(&mut self, token: Token) -> io::Result<()> {
        loop {
            let Some(client) = self.clients.get_mut(&token) else {
                return Ok(());
            };

            match client.state {
                ClientState::AwaitingRequest => {
                    client.read_data()?;
                    self.process_client_commands(token);

                    let Some(client) = self.clients.get_mut(&token) else {
                        return Ok(());
                    };
                    if client.state == ClientState::SendingResponse {
                        // Flush right away; most responses fit the socket buffer.
                        continue;
                    }
                    if client.peer_closed && !client.is_closed() {
                        if client.read_buffer.is_empty() {
                            log::info!("Client {} closed connection", token.0);
                        } else {
                            log::warn!("Client {}: unexpected EOF", token.0);
                        }
                        client.close();
                    }
                    break;
                }
                ClientState::SendingResponse => {
                    client.write_data()?;
                    // Socket buffer full, wait for the next writable event
                    if client.state == ClientState::SendingResponse {
                        break;
                    }
                }
                ClientState::Closed => break,
            }
        }

        self.update_interest(token)
    }

    fn process_client_commands(&mut self, token: Token) {
        let codec = self.codec;
        loop {
            let Some(client) = self.clients.get_mut(&token) else {
                return;
            };
            let args = match client.next_request(&codec) {
                Ok(Some(args)) => args,
                Ok(None) => return,
                Err(e) => {
                    log::warn!("Protocol error from client {}: {}", token.0, e);
                    client.close();
                    return;
                }
            };

            log::debug!("Processing command from client {}: {} args", token.0, args.len());

            let response = match CommandParser::parse(args) {
                Ok(command) => self.command_executor.execute(command),
                Err(error) => {
                    log::debug!("Rejected command from client {}: {}", token.0, error);
                    error.to_value()
                }
            };

            if let Some(client) = self.clients.get_mut(&token) {
                client.add_response(&codec, &response);
            }
        }
    }

    fn update_interest(&mut self, token: Token) -> io::Result<()> {
        let Some(client) = self.clients.get_mut(&token) else {
            return Ok(());
        };
        if client.is_closed() {
            return Ok(());
        }
        let wanted = client.state.interest();
        if wanted != client.interest {
            self.poll
                .registry()
                .reregister(&mut client.socket, token, wanted)?;
            client.interest = wanted;
        }
        Ok(())
    }

    /// The nearest of the oldest idle deadline, the next TTL, and the
    /// configured ceiling.
    fn calculate_poll_timeout(&self, now: Instant) -> Duration {
        let idle_deadline = self
            .idle
            .front()
            .and_then(|token| self.clients.get(&token))
            .map(|client| client.last_active + self.config.idle_timeout);

        let deadline = [idle_deadline, self.command_executor.next_expiry()]
            .into_iter()
            .flatten()
            .min();

        match deadline {
            Some(deadline) => deadline
                .saturating_duration_since(now)
                .min(self.config.default_poll_timeout),
            None => self.config.default_poll_timeout,
        }
    }

    fn evict_idle_clients(&mut self, now: Instant) {
        while let Some(token) = self.idle.front() {
            let expired = match self.clients.get(&token) {
                Some(client) => client.last_active + self.config.idle_timeout <= now,
                None => true,
            };
            if !expired {
                break;
            }
            log::info!("Removing idle connection {}", token.0);
            self.close_client(token);
        }
    }

    fn close_client(&mut self, token: Token) {
        self.idle.remove(token);
        if let Some(mut client) = self.clients.remove(&token) {
            log::info!("Closing client connection {}", token.0);
            let _ = self.poll.registry().deregister(&mut client.socket);
        }
    }

    fn cleanup_closed_clients(&mut self) {
        let closed_tokens: Vec<Token> = self
            .clients
            .iter()
            .filter(|(_, client)| client.is_closed())
            .map(|(token, _)| *token)
            .collect();

        for token in closed_tokens {
            self.close_client(token);
        }
    }

    fn close_all_clients(&mut self) {
        let tokens: Vec<Token> = self.clients.keys().copied().collect();
        for token in tokens {
            self.close_client(token);
        }
    }
}
