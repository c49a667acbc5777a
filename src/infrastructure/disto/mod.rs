//! Disto Module
//!
//! Bridges a Leica Disto on a Bluetooth serial port to keyboard input.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                      DistoSession                        │
//! │   (read → ACK → classify → parse → dispatch to sink)     │
//! └─────────────────────┬───────────────────────────────────┘
//!                       │
//!            ┌──────────┴──────────┐
//!            │                     │
//!            ▼                     ▼
//!     ┌────────────┐        ┌────────────┐
//!     │ Connection │        │  Protocol  │
//!     │            │        │            │
//!     │ - Serial   │        │ - Tokens   │
//!     │   port     │        │ - Classify │
//!     │ - Lines    │        │ - Fields   │
//!     └────────────┘        └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`protocol`] - Wire constants, line classification and field parsing
//! - [`connection`] - Serial port opening and the line channel abstraction
//! - [`service`] - Session state machine and processing loop

pub mod connection;
pub mod protocol;
pub mod service;

pub use connection::{ConnectionConfig, LineChannel, SerialChannel, TransportError};
pub use service::{DistoSession, SessionOptions};
