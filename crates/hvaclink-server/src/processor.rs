//! The command processor boundary.
//!
//! The multiplexer calls a [`CommandProcessor`] once per decoded packet, in
//! arrival order, from its own thread. State the processor shares with other
//! threads (a UI, a simulation) belongs behind [`spawn_processor`], which
//! moves the processor onto a worker and talks to it by message passing.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::JoinHandle;
use std::time::Duration;

use hvaclink_frame::Packet;
use tracing::{debug, warn};

/// Interprets one decoded packet and optionally produces a response.
///
/// An empty string means "no response". Unknown commands must return an
/// empty response rather than panic, and `handle` must not block
/// indefinitely.
pub trait CommandProcessor {
    fn handle(&mut self, command: &str, data: &str) -> String;
}

impl<F> CommandProcessor for F
where
    F: FnMut(&str, &str) -> String,
{
    fn handle(&mut self, command: &str, data: &str) -> String {
        self(command, data)
    }
}

struct Request {
    packet: Packet,
    reply: mpsc::SyncSender<String>,
}

/// Message-passing handle to a processor running on its own thread.
///
/// Implements [`CommandProcessor`], so it plugs straight into the server.
/// Clones share the same worker.
#[derive(Clone)]
pub struct ProcessorClient {
    requests: mpsc::Sender<Request>,
    reply_timeout: Duration,
}

impl ProcessorClient {
    /// How long [`CommandProcessor::handle`] waits for the worker's reply.
    pub fn reply_timeout(&self) -> Duration {
        self.reply_timeout
    }
}

impl CommandProcessor for ProcessorClient {
    fn handle(&mut self, command: &str, data: &str) -> String {
        let (reply, response) = mpsc::sync_channel(1);
        let request = Request {
            packet: Packet::new(command, data),
            reply,
        };
        if self.requests.send(request).is_err() {
            warn!(command, "processor worker has stopped, dropping packet");
            return String::new();
        }

        match response.recv_timeout(self.reply_timeout) {
            Ok(response) => response,
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    command,
                    timeout = ?self.reply_timeout,
                    "processor did not reply in time, dropping response"
                );
                String::new()
            }
            Err(RecvTimeoutError::Disconnected) => {
                warn!(command, "processor worker dropped request");
                String::new()
            }
        }
    }
}

impl std::fmt::Debug for ProcessorClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorClient")
            .field("reply_timeout", &self.reply_timeout)
            .finish()
    }
}

/// Move `processor` onto a dedicated thread.
///
/// The worker exits once every [`ProcessorClient`] clone is dropped.
pub fn spawn_processor<P>(
    mut processor: P,
    reply_timeout: Duration,
) -> std::io::Result<(ProcessorClient, JoinHandle<()>)>
where
    P: CommandProcessor + Send + 'static,
{
    let (requests, inbox) = mpsc::channel::<Request>();
    let worker = std::thread::Builder::new()
        .name("hvaclink-processor".to_string())
        .spawn(move || {
            for request in inbox {
                let response = processor.handle(request.packet.command(), request.packet.data());
                // The caller may have timed out and gone away.
                let _ = request.reply.send(response);
            }
            debug!("processor worker exiting");
        })?;

    Ok((
        ProcessorClient {
            requests,
            reply_timeout,
        },
        worker,
    ))
}
