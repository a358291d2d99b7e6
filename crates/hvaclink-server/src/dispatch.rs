use std::collections::VecDeque;

use hvaclink_frame::Packet;
use hvaclink_transport::{Connection, WriteOutcome};
use tracing::{debug, trace};

use crate::config::WritePolicy;
use crate::processor::CommandProcessor;

/// Where responses for the packets being dispatched are written.
pub trait ResponseSink {
    fn send_response(&mut self, bytes: &[u8]) -> std::io::Result<WriteOutcome>;
}

/// A session connection viewed as a response sink under a write policy.
pub struct ConnectionSink<'a> {
    conn: &'a mut Connection,
    policy: WritePolicy,
}

impl<'a> ConnectionSink<'a> {
    pub fn new(conn: &'a mut Connection, policy: WritePolicy) -> Self {
        Self { conn, policy }
    }
}

impl ResponseSink for ConnectionSink<'_> {
    fn send_response(&mut self, bytes: &[u8]) -> std::io::Result<WriteOutcome> {
        match self.policy {
            WritePolicy::Buffered => self.conn.send_buffered(bytes),
            WritePolicy::BestEffort => self.conn.send_best_effort(bytes),
        }
    }
}

/// Tally of one drain of the dispatch queue.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Packets handed to the processor.
    pub dispatched: usize,
    /// Responses fully written.
    pub written: usize,
    /// Responses left (wholly or partly) in the pending write buffer.
    pub queued: usize,
    /// Responses discarded: not writable, or the sink had already failed.
    pub dropped: usize,
    /// First write error seen. Later responses in the same drain are dropped.
    pub write_error: Option<std::io::Error>,
}

/// FIFO of decoded packets awaiting the command processor.
///
/// Insertion order is processing order. The multiplexer drains it to empty
/// after each read, before it waits for readiness again.
#[derive(Debug, Default)]
pub struct DispatchQueue {
    packets: VecDeque<Packet>,
}

impl DispatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, packet: Packet) {
        self.packets.push_back(packet);
    }

    pub fn pop(&mut self) -> Option<Packet> {
        self.packets.pop_front()
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Hand every queued packet to `processor`, head first, writing each
    /// non-empty response to `sink` before the next packet is processed.
    ///
    /// Every packet is processed even after a write error, so the queue is
    /// always empty on return.
    pub fn drain<P, S>(&mut self, processor: &mut P, sink: &mut S) -> DispatchReport
    where
        P: CommandProcessor + ?Sized,
        S: ResponseSink + ?Sized,
    {
        let mut report = DispatchReport::default();

        while let Some(packet) = self.packets.pop_front() {
            debug!(
                command = packet.command(),
                data = packet.data(),
                "dispatching packet"
            );
            let response = processor.handle(packet.command(), packet.data());
            report.dispatched += 1;

            if response.is_empty() {
                continue;
            }
            if report.write_error.is_some() {
                report.dropped += 1;
                continue;
            }

            trace!(response = %response, "response packet");
            match sink.send_response(response.as_bytes()) {
                Ok(WriteOutcome::Written) => report.written += 1,
                Ok(WriteOutcome::Queued) => report.queued += 1,
                Ok(WriteOutcome::Dropped) => {
                    debug!(
                        command = packet.command(),
                        "connection not writable, dropping response"
                    );
                    report.dropped += 1;
                }
                Err(err) => {
                    report.dropped += 1;
                    report.write_error = Some(err);
                }
            }
        }

        report
    }
}

impl Extend<Packet> for DispatchQueue {
    fn extend<I: IntoIterator<Item = Packet>>(&mut self, iter: I) {
        self.packets.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use hvaclink_frame::{FrameAssembler, FrameConfig};

    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        writes: Vec<String>,
        outcome: Option<WriteOutcome>,
        fail_after: Option<usize>,
    }

    impl ResponseSink for RecordingSink {
        fn send_response(&mut self, bytes: &[u8]) -> std::io::Result<WriteOutcome> {
            if self.fail_after == Some(self.writes.len()) {
                return Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
            }
            self.writes.push(String::from_utf8_lossy(bytes).into_owned());
            Ok(self.outcome.unwrap_or(WriteOutcome::Written))
        }
    }

    fn echo(command: &str, data: &str) -> String {
        format!("*{command}|{data}|&")
    }

    #[test]
    fn fifo_order() {
        let mut queue = DispatchQueue::new();
        queue.push(Packet::new("A", "1"));
        queue.push(Packet::new("B", "2"));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop(), Some(Packet::new("A", "1")));
        assert_eq!(queue.pop(), Some(Packet::new("B", "2")));
        assert!(queue.pop().is_none());
    }

    #[test]
    fn drain_dispatches_in_decode_order_and_empties_queue() {
        let mut queue = DispatchQueue::new();
        let mut asm = FrameAssembler::new(FrameConfig::default());
        asm.push(b"junk*RS||&more*VS|x|&*GZ1|3|&", &mut queue);

        let mut calls = Vec::new();
        let mut processor = |command: &str, data: &str| {
            calls.push((command.to_string(), data.to_string()));
            echo(command, data)
        };
        let mut sink = RecordingSink::default();
        let report = queue.drain(&mut processor, &mut sink);

        assert!(queue.is_empty());
        assert_eq!(report.dispatched, 3);
        assert_eq!(report.written, 3);
        assert_eq!(sink.writes, vec!["*RS||&", "*VS|x|&", "*GZ1|3|&"]);
        assert_eq!(
            calls,
            vec![
                ("RS".to_string(), String::new()),
                ("VS".to_string(), "x".to_string()),
                ("GZ1".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn empty_response_is_not_written() {
        let mut queue = DispatchQueue::new();
        queue.push(Packet::new("UNKNOWN", ""));
        let mut processor = |_: &str, _: &str| String::new();
        let mut sink = RecordingSink::default();

        let report = queue.drain(&mut processor, &mut sink);
        assert_eq!(report.dispatched, 1);
        assert!(sink.writes.is_empty());
    }

    #[test]
    fn not_writable_responses_are_counted_as_dropped() {
        let mut queue = DispatchQueue::new();
        queue.push(Packet::new("GZ1", "3"));
        let mut processor = echo;
        let mut sink = RecordingSink {
            outcome: Some(WriteOutcome::Dropped),
            ..RecordingSink::default()
        };

        let report = queue.drain(&mut processor, &mut sink);
        assert_eq!(report.dropped, 1);
        assert_eq!(report.written, 0);
    }

    #[test]
    fn write_error_stops_writes_but_processes_every_packet() {
        let mut queue = DispatchQueue::new();
        for i in 0..4 {
            queue.push(Packet::new("N", i.to_string()));
        }
        let mut handled = 0;
        let mut processor = |command: &str, data: &str| {
            handled += 1;
            echo(command, data)
        };
        let mut sink = RecordingSink {
            fail_after: Some(1),
            ..RecordingSink::default()
        };

        let report = queue.drain(&mut processor, &mut sink);
        assert!(queue.is_empty());
        assert_eq!(report.dispatched, 4);
        assert_eq!(report.written, 1);
        assert_eq!(report.dropped, 3);
        assert!(report.write_error.is_some());
        drop(processor);
        assert_eq!(handled, 4);
    }
}
