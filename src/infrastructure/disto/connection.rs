//! Serial Connection Module
//!
//! Opens the Disto's Bluetooth serial port and exposes it as a line channel.

use crate::domain::settings::Settings;
use crate::infrastructure::disto::protocol;
use serialport::{DataBits, Parity, SerialPort, StopBits};
use std::io::{self, BufRead, BufReader, Write};
use std::time::Duration;
use tracing::{info, trace};

/// Channel open/read/write failure. Always fatal for the session.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("could not open {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },
    #[error("serial read failed: {0}")]
    Read(#[source] io::Error),
    #[error("serial write failed: {0}")]
    Write(#[source] io::Error),
    #[error("serial port is not open")]
    Closed,
}

/// Line-oriented view of the device link.
///
/// There is exactly one reader per channel; interleaved reads would break
/// line framing.
pub trait LineChannel {
    /// Read one line including its terminator. Returns whatever arrived,
    /// possibly nothing, once the read timeout expires.
    fn read_line(&mut self) -> Result<Vec<u8>, TransportError>;

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Bytes that can be read without blocking
    fn bytes_waiting(&mut self) -> Result<usize, TransportError>;

    fn name(&self) -> &str;
}

/// Configuration for opening the serial link
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub port: String,
    pub baud_rate: u32,
    pub read_timeout: Duration,
}

impl ConnectionConfig {
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: protocol::DEFAULT_BAUD_RATE,
            read_timeout: Duration::from_millis(protocol::DEFAULT_READ_TIMEOUT_MS),
        }
    }

    pub fn from_settings(port: impl Into<String>, settings: &Settings) -> Self {
        Self {
            baud_rate: settings.baud_rate,
            read_timeout: Duration::from_millis(settings.read_timeout_ms),
            ..Self::new(port)
        }
    }
}

/// Serial port channel (8N1, no flow control)
pub struct SerialChannel {
    name: String,
    reader: BufReader<Box<dyn SerialPort>>,
}

impl SerialChannel {
    /// Open the port. On Windows this is where the pairing dialog pops up
    /// for an unpaired Disto (code 0000).
    pub fn open(config: &ConnectionConfig) -> Result<Self, TransportError> {
        info!(
            "Opening serial port {} at {} baud",
            config.port, config.baud_rate
        );

        let port = serialport::new(&config.port, config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(config.read_timeout)
            .open()
            .map_err(|source| TransportError::Open {
                port: config.port.clone(),
                source,
            })?;

        Ok(Self {
            name: config.port.clone(),
            reader: BufReader::new(port),
        })
    }
}

impl LineChannel for SerialChannel {
    fn read_line(&mut self) -> Result<Vec<u8>, TransportError> {
        let mut line = Vec::new();
        match self.reader.read_until(b'\n', &mut line) {
            Ok(_) => Ok(line),
            // Partial data stays in `line`
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                if !line.is_empty() {
                    trace!("Read timed out with {} bytes pending", line.len());
                }
                Ok(line)
            }
            Err(e) => Err(TransportError::Read(e)),
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let port = self.reader.get_mut();
        port.write_all(bytes).map_err(TransportError::Write)?;
        port.flush().map_err(TransportError::Write)
    }

    fn bytes_waiting(&mut self) -> Result<usize, TransportError> {
        let pending = self
            .reader
            .get_ref()
            .bytes_to_read()
            .map_err(|e| TransportError::Read(e.into()))?;
        Ok(pending as usize + self.reader.buffer().len())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConnectionConfig::new("COM5");
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.read_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_config_from_settings() {
        let settings = Settings {
            baud_rate: 9600,
            read_timeout_ms: 250,
            ..Default::default()
        };
        let config = ConnectionConfig::from_settings("/dev/rfcomm0", &settings);
        assert_eq!(config.port, "/dev/rfcomm0");
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.read_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_open_missing_port_is_transport_error() {
        let config = ConnectionConfig::new("/dev/disto-keys-does-not-exist");
        match SerialChannel::open(&config) {
            Err(TransportError::Open { port, .. }) => {
                assert_eq!(port, "/dev/disto-keys-does-not-exist")
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("opened a port that does not exist"),
        }
    }
}
