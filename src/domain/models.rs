use crate::domain::gestures::Gesture;
use crate::domain::measurement::Measurement;

/// Events published by the serial session for whoever is watching
#[derive(Debug, Clone)]
pub enum AppEvent {
    ConnectionStatus(ConnectionStatus),
    LogMessage(StatusMessage),
    Measurement(Measurement),
    Gesture(Gesture),
    UnknownKey(i32),
    /// Hexdump of a raw device line (debug only)
    RawLine(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Closed,
    ChannelOpen,
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub message: String,
    pub severity: MessageSeverity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSeverity {
    Info,
    Success,
    Warning,
    Error,
}
