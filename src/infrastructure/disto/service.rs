//! Disto Session Module
//!
//! Drives the read → acknowledge → classify → parse → dispatch cycle over an
//! open line channel and forwards the results to an output sink.

use crate::domain::gestures::Gesture;
use crate::domain::measurement::Measurement;
use crate::domain::models::{AppEvent, ConnectionStatus, MessageSeverity, StatusMessage};
use crate::infrastructure::disto::connection::{LineChannel, TransportError};
use crate::infrastructure::disto::protocol::{self, LineCategory, Record, ACK};
use crate::infrastructure::output_sink::{Key, OutputSink};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

/// Pause between lines while draining in `poll`
const POLL_LINE_DELAY: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    /// Read and discard one line after each ACK
    pub drain_after_ack: bool,
    /// Publish hexdumps, device errors and key events
    pub debug: bool,
}

/// What a single line turned into
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    Idle,
    DeviceError(String),
    Data {
        measurement: Option<Measurement>,
        gestures: Vec<Gesture>,
        unknown_keys: Vec<i32>,
    },
}

/// One Disto link. `Closed` until a channel is handed to [`DistoSession::open`].
pub struct DistoSession<C, S> {
    channel: Option<C>,
    sink: S,
    options: SessionOptions,
    event_sender: mpsc::UnboundedSender<AppEvent>,
}

impl<C: LineChannel, S: OutputSink> DistoSession<C, S> {
    pub fn new(
        sink: S,
        options: SessionOptions,
        event_sender: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            channel: None,
            sink,
            options,
            event_sender,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        if self.channel.is_some() {
            ConnectionStatus::ChannelOpen
        } else {
            ConnectionStatus::Closed
        }
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.options.debug = debug;
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Take ownership of an open channel and send the initial ACK
    pub fn open(&mut self, mut channel: C) -> Result<(), TransportError> {
        self.close();

        channel.write_all(ACK)?;
        info!("Serial port {} opened", channel.name());
        self.send_log(
            format!("{} opened", channel.name()),
            MessageSeverity::Success,
        );
        self.send_log(
            "Keypresses will be sent to the currently active application".to_string(),
            MessageSeverity::Warning,
        );

        self.channel = Some(channel);
        let _ = self
            .event_sender
            .send(AppEvent::ConnectionStatus(ConnectionStatus::ChannelOpen));
        Ok(())
    }

    /// Drop the channel, closing the port
    pub fn close(&mut self) {
        if let Some(channel) = self.channel.take() {
            info!("Serial port {} closed", channel.name());
            self.send_log(format!("{} closed", channel.name()), MessageSeverity::Info);
            let _ = self
                .event_sender
                .send(AppEvent::ConnectionStatus(ConnectionStatus::Closed));
        }
    }

    /// Blocking reader loop. Returns `Ok` once `cancel` is set, at most one
    /// read timeout later; the channel is closed either way.
    pub fn run(&mut self, cancel: &AtomicBool) -> Result<(), TransportError> {
        while !cancel.load(Ordering::Relaxed) {
            if let Err(e) = self.step() {
                return Err(self.fail(e));
            }
        }

        info!("Stop requested");
        self.close();
        Ok(())
    }

    /// Process every line that is already buffered, without waiting for more.
    /// Meant to be called from a host event loop tick.
    pub fn poll(&mut self) -> Result<usize, TransportError> {
        match self.drain_pending() {
            Ok(count) => Ok(count),
            Err(e) => Err(self.fail(e)),
        }
    }

    fn drain_pending(&mut self) -> Result<usize, TransportError> {
        let mut processed = 0;

        loop {
            let waiting = match self.channel.as_mut() {
                Some(channel) => channel.bytes_waiting()?,
                None => return Ok(processed),
            };
            if waiting == 0 {
                break;
            }

            match self.step()? {
                Some(_) => processed += 1,
                None => break,
            }
            std::thread::sleep(POLL_LINE_DELAY);
        }

        Ok(processed)
    }

    /// Read one line, acknowledge it and act on it. `None` when the read
    /// timed out without data.
    pub fn step(&mut self) -> Result<Option<LineOutcome>, TransportError> {
        let channel = self.channel.as_mut().ok_or(TransportError::Closed)?;

        let raw = channel.read_line()?;
        if raw.is_empty() {
            return Ok(None);
        }

        channel.write_all(ACK)?;
        trace!("ACK sent");

        if self.options.drain_after_ack {
            let echo = channel.read_line()?;
            trace!("Discarded post-ACK line {:?}", String::from_utf8_lossy(&echo));
        }

        Ok(Some(self.process_line(&raw)))
    }

    /// Classify and dispatch one raw line. Touches the sink but never the channel.
    pub fn process_line(&mut self, raw: &[u8]) -> LineOutcome {
        let line = protocol::decode_line(raw);

        match protocol::classify(&line) {
            LineCategory::Idle => LineOutcome::Idle,
            LineCategory::Error => {
                self.publish_raw(raw);
                warn!("Device reported {}", line);
                if self.options.debug {
                    self.send_log(line.clone(), MessageSeverity::Error);
                }
                LineOutcome::DeviceError(line)
            }
            LineCategory::Data => {
                self.publish_raw(raw);
                debug!("Data line {:?}", line);
                self.dispatch(protocol::parse_record(&line))
            }
        }
    }

    fn dispatch(&mut self, record: Record) -> LineOutcome {
        if record.is_empty() {
            trace!("No distance or key fields in record");
        }

        let mut gestures = Vec::new();
        let mut unknown_keys = Vec::new();

        for &code in &record.key_codes {
            match Gesture::from_key_code(code) {
                Some(gesture) => {
                    info!("Key {} -> {}", code, gesture);
                    self.sink.perform(gesture);
                    if self.options.debug {
                        let _ = self.event_sender.send(AppEvent::Gesture(gesture));
                    }
                    gestures.push(gesture);
                }
                None => {
                    debug!("Unknown key code {}", code);
                    if self.options.debug {
                        let _ = self.event_sender.send(AppEvent::UnknownKey(code));
                    }
                    unknown_keys.push(code);
                }
            }
        }

        let measurement = Measurement::aggregate(&record.distances_mm);
        if let Some(m) = measurement {
            info!("{}", m.label());
            let _ = self.event_sender.send(AppEvent::Measurement(m));
            self.sink.type_text(&m.as_text());
            self.sink.press_and_release(Key::Enter);
        }

        LineOutcome::Data {
            measurement,
            gestures,
            unknown_keys,
        }
    }

    fn publish_raw(&self, raw: &[u8]) {
        if self.options.debug {
            let _ = self.event_sender.send(AppEvent::RawLine(protocol::hexdump(raw)));
        }
    }

    fn fail(&mut self, e: TransportError) -> TransportError {
        error!("Transport error: {}", e);
        self.send_log(e.to_string(), MessageSeverity::Error);
        self.close();
        e
    }

    fn send_log(&self, message: String, severity: MessageSeverity) {
        let _ = self
            .event_sender
            .send(AppEvent::LogMessage(StatusMessage { message, severity }));
    }
}
