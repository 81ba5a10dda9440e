//! Node core: owns the byte link, drives the receive state machine and
//! routes validated frames.
//!
//! # Scheduling
//!
//! Everything runs on the caller's thread. [`Node::spin`] is the one
//! cooperative step: it runs liveness housekeeping, then drains at most
//! [`MAX_BYTES_PER_SPIN`] inbound bytes through the parser, dispatching
//! each completed frame before the next byte is consumed. The only
//! blocking call is [`Node::get_param`], which blocks by spinning itself.
//!
//! # Handler re-entrancy
//!
//! Subscriber handlers receive only the payload bytes; the node is
//! exclusively borrowed for the duration of dispatch, so a handler cannot
//! publish on the same link. A handler that needs to react should record
//! what it saw and let the driving loop publish after `spin` returns.

use crate::clock::MonotonicClock;
use crate::error::{Error, Result};
use crate::messages::{
    LogLevel, LogMessage, ParamResponse, RequestParam, TimeStamp, TopicInfo, WireMessage,
};
use crate::protocol::{
    ErrorCounters, Frame, FrameBuffer, FrameParser, MAX_BYTES_PER_SPIN, MAX_PAYLOAD,
    TOPIC_LOG, TOPIC_NEGOTIATION, TOPIC_PARAMETER_REQUEST, TOPIC_TIME,
};
use crate::registry::{Publisher, TopicRegistry};
use crate::sync::{LinkState, TickAction, TimeSync};
use crate::transport::Transport;

/// Protocol engine endpoint for one byte link.
pub struct Node {
    link: Box<dyn Transport>,
    clock: Box<dyn MonotonicClock>,
    parser: FrameParser,
    counters: ErrorCounters,
    registry: TopicRegistry,
    time_sync: TimeSync,
    param_response: Option<ParamResponse>,
    tx_frame: FrameBuffer,
}

impl Node {
    /// Create a node over the given link and clock.
    pub fn new(link: Box<dyn Transport>, clock: Box<dyn MonotonicClock>) -> Self {
        Self {
            link,
            clock,
            parser: FrameParser::new(),
            counters: ErrorCounters::default(),
            registry: TopicRegistry::new(),
            time_sync: TimeSync::new(),
            param_response: None,
            tx_frame: FrameBuffer::new(),
        }
    }

    /// Register a publisher; the returned handle is passed to [`publish`].
    ///
    /// [`publish`]: Node::publish
    pub fn advertise(&mut self, topic_name: &str, message_type: &str) -> Result<Publisher> {
        let publisher = self.registry.advertise(topic_name, message_type)?;
        log::debug!(
            "Advertised {} ({}) as wire topic {}",
            topic_name,
            message_type,
            publisher.id()
        );
        Ok(publisher)
    }

    /// Register a subscriber handler, returning its wire topic ID.
    ///
    /// The handler returns false to flag a payload it could not decode.
    pub fn subscribe<F>(&mut self, topic_name: &str, message_type: &str, handler: F) -> Result<u16>
    where
        F: FnMut(&[u8]) -> bool + Send + 'static,
    {
        let id = self
            .registry
            .subscribe(topic_name, message_type, Box::new(handler))?;
        log::debug!(
            "Subscribed {} ({}) as wire topic {}",
            topic_name,
            message_type,
            id
        );
        Ok(id)
    }

    /// Serialize and send one message under the publisher's topic.
    pub fn publish<M: WireMessage>(&mut self, publisher: &Publisher, message: &M) -> Result<()> {
        self.send_message(publisher.id(), message)
    }

    /// Send an already-serialized payload under an explicit wire topic.
    pub fn publish_raw(&mut self, topic_id: u16, payload: &[u8]) -> Result<()> {
        self.send_frame(topic_id, payload)
    }

    /// One cooperative step: liveness housekeeping, then a bounded drain
    /// of the link. Returns the number of bytes consumed.
    ///
    /// Parse-level damage never surfaces here (see [`Node::counters`]);
    /// the only errors are transport failures and [`Error::LinkClosed`].
    pub fn spin(&mut self) -> Result<usize> {
        match self.time_sync.tick(self.clock.millis()) {
            TickAction::ConnectionLost => self.parser.reset(),
            TickAction::SendSyncRequest => self.send_sync_probe()?,
            TickAction::None => {}
        }

        let mut chunk = [0u8; MAX_BYTES_PER_SPIN];
        let n = self.link.read(&mut chunk)?;
        for &byte in &chunk[..n] {
            if let Some(frame) = self.parser.push(byte, &mut self.counters) {
                self.dispatch(&frame)?;
            }
        }
        Ok(n)
    }

    /// Blocking parameter lookup; drives [`Node::spin`] until the peer
    /// answers or `timeout_ms` elapses.
    pub fn get_param(&mut self, name: &str, timeout_ms: u64) -> Result<ParamResponse> {
        self.param_response = None;
        self.send_message(
            TOPIC_PARAMETER_REQUEST,
            &RequestParam {
                name: name.to_string(),
            },
        )?;

        let started_ms = self.clock.millis();
        while self.param_response.is_none() {
            self.spin()?;
            if self.clock.millis() - started_ms > timeout_ms {
                log::warn!("Parameter {} timed out after {}ms", name, timeout_ms);
                return Err(Error::ParamTimeout);
            }
        }
        self.param_response.take().ok_or(Error::ParamTimeout)
    }

    /// Send a log record to the peer's logging sink.
    pub fn log(&mut self, level: LogLevel, msg: &str) -> Result<()> {
        self.send_message(
            TOPIC_LOG,
            &LogMessage {
                level,
                msg: msg.to_string(),
            },
        )
    }

    pub fn log_debug(&mut self, msg: &str) -> Result<()> {
        self.log(LogLevel::Debug, msg)
    }

    pub fn log_info(&mut self, msg: &str) -> Result<()> {
        self.log(LogLevel::Info, msg)
    }

    pub fn log_warn(&mut self, msg: &str) -> Result<()> {
        self.log(LogLevel::Warn, msg)
    }

    pub fn log_error(&mut self, msg: &str) -> Result<()> {
        self.log(LogLevel::Error, msg)
    }

    pub fn log_fatal(&mut self, msg: &str) -> Result<()> {
        self.log(LogLevel::Fatal, msg)
    }

    /// Peer-epoch wall clock (local uptime until the first sync lands).
    pub fn now(&self) -> TimeStamp {
        self.time_sync.now(self.clock.millis())
    }

    /// True while time syncs keep completing within the timeout window.
    pub fn connected(&self) -> bool {
        self.time_sync.connected()
    }

    /// Connection lifecycle detail behind [`Node::connected`].
    pub fn link_state(&self) -> LinkState {
        self.time_sync.state()
    }

    /// Receive-path fault counters.
    pub fn counters(&self) -> ErrorCounters {
        self.counters
    }

    /// Flush pending output and drop the synchronized state.
    pub fn shutdown(&mut self) -> Result<()> {
        self.parser.reset();
        self.time_sync.disconnect();
        self.link.flush()?;
        log::info!("Node shut down");
        Ok(())
    }

    /// Route one validated frame by wire topic.
    fn dispatch(&mut self, frame: &Frame) -> Result<()> {
        match frame.topic_id() {
            TOPIC_NEGOTIATION => {
                log::debug!("Negotiation request from peer");
                self.request_time_sync()?;
                self.announce_topics()?;
            }
            TOPIC_TIME => {
                let now_ms = self.clock.millis();
                self.time_sync.complete(frame.payload(), now_ms);
            }
            TOPIC_PARAMETER_REQUEST => {
                if let Some(response) = ParamResponse::decode(frame.payload()) {
                    self.param_response = Some(response);
                }
            }
            id => {
                if let Some(handler) = self.registry.handler_for(id) {
                    if !handler(frame.payload()) {
                        self.counters.note_malformed();
                    }
                } else {
                    // Unroutable frames land in the checksum counter,
                    // matching what counterpart firmware reports.
                    log::debug!("No route for wire topic {}", id);
                    self.counters.note_checksum();
                }
            }
        }
        Ok(())
    }

    /// Start a handshake unless one is already in flight.
    fn request_time_sync(&mut self) -> Result<()> {
        if self.time_sync.begin_request(self.clock.millis()) {
            self.send_sync_probe()?;
        }
        Ok(())
    }

    /// The probe is a default (all-zero) stamp; any frame on the time
    /// topic prompts the device to answer with its current clock.
    fn send_sync_probe(&mut self) -> Result<()> {
        self.send_message(TOPIC_TIME, &TimeStamp::default())
    }

    /// Declare every registered topic to the peer, publishers first.
    fn announce_topics(&mut self) -> Result<()> {
        let announcements: Vec<(u16, TopicInfo)> = self.registry.announcements().collect();
        log::debug!("Announcing {} topics", announcements.len());
        for (wire_topic, info) in &announcements {
            self.send_message(*wire_topic, info)?;
        }
        Ok(())
    }

    fn send_message<M: WireMessage>(&mut self, topic_id: u16, message: &M) -> Result<()> {
        let len = message.encoded_len();
        if len > MAX_PAYLOAD {
            return Err(Error::PayloadTooLarge {
                len,
                max: MAX_PAYLOAD,
            });
        }

        let mut buf = [0u8; MAX_PAYLOAD];
        let written = message.encode(&mut buf).ok_or(Error::PayloadTooLarge {
            len,
            max: MAX_PAYLOAD,
        })?;
        self.send_frame(topic_id, &buf[..written])
    }

    fn send_frame(&mut self, topic_id: u16, payload: &[u8]) -> Result<()> {
        self.tx_frame.set_frame(topic_id, payload)?;
        self.link.write_all(self.tx_frame.as_bytes())?;
        self.link.flush()
    }
}
