use std::sync::mpsc::Sender;
use std::sync::Arc;

use mio::Waker;

#[derive(Debug)]
pub enum EventLoopMessage {
    Shutdown,
}

/// Lets other threads talk to a running event loop.
#[derive(Debug, Clone)]
pub struct EventLoopHandle {
    sender: Sender<EventLoopMessage>,
    waker: Arc<Waker>,
}

impl EventLoopHandle {
    pub fn new(sender: Sender<EventLoopMessage>, waker: Arc<Waker>) -> Self {
        EventLoopHandle { sender, waker }
    }

    /// Asks the loop to close every connection and return from `run`.
    pub fn shutdown(&self) {
        self.send(EventLoopMessage::Shutdown);
    }

    fn send(&self, message: EventLoopMessage) {
        if let Err(e) = self.sender.send(message) {
            log::error!("Failed to send message to event loop: {}", e);
            return;
        }

        if let Err(e) = self.waker.wake() {
            log::error!("Failed to wake event loop: {}", e);
        }
    }
}
