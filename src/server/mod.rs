pub mod client;
pub mod config;
pub mod event_loop;
pub mod event_loop_handle;
pub mod idle_list;

pub use config::{ServerConfig, ServerConfigBuilder};
pub use event_loop_handle::EventLoopHandle;

use event_loop::EventLoop;
use mio::net::TcpListener;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};

pub struct KvServer {
    event_loop: EventLoop,
}

impl KvServer {
    pub fn new(config: ServerConfig) -> io::Result<Self> {
        let address = config
            .addr()
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Invalid address"))?;

        let listener = TcpListener::bind(address)?;
        log::info!("Server listening on {}", listener.local_addr()?);

        let event_loop = EventLoop::new(listener, config)?;

        Ok(Self { event_loop })
    }

    /// The bound address, useful when the configured port is 0.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.event_loop.local_addr()
    }

    pub fn handle(&self) -> EventLoopHandle {
        self.event_loop.get_handle()
    }

    pub fn run(&mut self) -> io::Result<()> {
        log::info!("Starting server event loop");
        self.event_loop.run()
    }
}
