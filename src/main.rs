use anyhow::Context;
use clap::Parser;
use disto_keys::domain::models::{AppEvent, MessageSeverity};
use disto_keys::domain::settings::{Settings, SettingsService};
use disto_keys::infrastructure::disto::{
    ConnectionConfig, DistoSession, SerialChannel, SessionOptions, TransportError,
};
use disto_keys::infrastructure::logging;
use disto_keys::infrastructure::output_sink::{LogSink, OutputSink};
use std::io::Write;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Leica Disto Bluetooth serial data to keyboard presses
#[derive(Parser, Debug)]
#[command(name = "disto_keys", version)]
struct Args {
    /// Serial port the Disto is paired on, e.g. COM5 or /dev/rfcomm0
    port: String,

    /// Baud rate (default 115200)
    #[arg(long)]
    baud: Option<u32>,

    /// Read timeout in milliseconds (default 1000)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Read and discard one line after every ACK
    #[arg(long)]
    drain_after_ack: bool,

    /// Show raw lines, device errors and key codes
    #[arg(long)]
    debug: bool,

    /// Log key presses instead of sending them
    #[arg(long)]
    dry_run: bool,

    /// Store the serial options above as the new defaults
    #[arg(long)]
    save_settings: bool,
}

impl Args {
    fn apply(&self, settings: &mut Settings) {
        if let Some(baud) = self.baud {
            settings.baud_rate = baud;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            settings.read_timeout_ms = timeout_ms;
        }
        if self.drain_after_ack {
            settings.drain_after_ack = true;
        }
        if self.debug {
            settings.debug_raw_lines = true;
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let mut settings_service = SettingsService::new().context("Failed to load settings")?;
    args.apply(settings_service.get_mut());
    let settings = settings_service.get().clone();

    let _logging_guard = logging::init_logger(&settings.log_settings, settings.debug_raw_lines)
        .map_err(|e| eprintln!("Failed to initialize logging: {}", e))
        .ok();

    if args.save_settings {
        settings_service.save()?;
        info!("Settings saved to {}", settings_service.path().display());
    }

    info!("Starting Disto keyboard bridge");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    runtime.block_on(bridge(args.port, settings, args.dry_run))
}

async fn bridge(port: String, settings: Settings, dry_run: bool) -> anyhow::Result<()> {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let cancel = Arc::new(AtomicBool::new(false));
    let reporter = tokio::spawn(report_events(event_rx, std::io::stdout()));

    let config = ConnectionConfig::from_settings(port, &settings);
    let options = SessionOptions {
        drain_after_ack: settings.drain_after_ack,
        debug: settings.debug_raw_lines,
    };

    let worker_cancel = cancel.clone();
    let worker = tokio::task::spawn_blocking(move || -> Result<(), TransportError> {
        let mut session = DistoSession::new(output_sink(dry_run), options, event_tx);
        let channel = SerialChannel::open(&config)?;
        session.open(channel)?;
        session.run(&worker_cancel)
    });
    tokio::pin!(worker);

    let result = tokio::select! {
        result = &mut worker => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupt received, closing serial port");
            cancel.store(true, Ordering::Relaxed);
            worker.await
        }
    };

    // The reporter prints the closed notice once the session has dropped
    // its sender, including when the port never opened
    let _ = reporter.await;

    result.context("Serial worker stopped unexpectedly")??;
    Ok(())
}

#[cfg(windows)]
fn output_sink(dry_run: bool) -> Box<dyn OutputSink + Send> {
    use disto_keys::infrastructure::input_simulator::InputSimulator;

    if dry_run {
        Box::new(LogSink)
    } else {
        Box::new(InputSimulator::new())
    }
}

#[cfg(not(windows))]
fn output_sink(dry_run: bool) -> Box<dyn OutputSink + Send> {
    if !dry_run {
        tracing::warn!("Keystroke injection is only available on Windows, logging key presses instead");
    }
    Box::new(LogSink)
}

/// Console readout of session events, ending with the closed notice once
/// the session is gone
async fn report_events<W: Write>(
    mut events: mpsc::UnboundedReceiver<AppEvent>,
    mut out: W,
) -> W {
    while let Some(event) = events.recv().await {
        let written = match event {
            AppEvent::Measurement(m) => writeln!(out, "{}", m.label()),
            AppEvent::Gesture(gesture) => writeln!(out, "{}", gesture),
            AppEvent::UnknownKey(code) => writeln!(out, "Unknown key code {}", code),
            AppEvent::RawLine(dump) => write!(out, "{}", dump),
            AppEvent::LogMessage(status) => match status.severity {
                MessageSeverity::Error | MessageSeverity::Warning => {
                    writeln!(out, "! {}", status.message)
                }
                MessageSeverity::Info | MessageSeverity::Success => {
                    writeln!(out, "{}", status.message)
                }
            },
            AppEvent::ConnectionStatus(status) => {
                tracing::debug!("Connection status: {:?}", status);
                Ok(())
            }
        };
        if let Err(e) = written {
            tracing::warn!("Console write failed: {}", e);
        }
    }

    info!("Serial port closed");
    if let Err(e) = writeln!(out, "Serial port closed").and_then(|_| out.flush()) {
        tracing::warn!("Console write failed: {}", e);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use disto_keys::domain::gestures::Gesture;
    use disto_keys::domain::measurement::Measurement;

    fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    #[tokio::test]
    async fn test_closed_notice_after_events() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(AppEvent::Measurement(Measurement::aggregate(&[100]).unwrap()))
            .unwrap();
        tx.send(AppEvent::Gesture(Gesture::Up)).unwrap();
        tx.send(AppEvent::UnknownKey(-2)).unwrap();
        drop(tx);

        let out = output(report_events(rx, Vec::new()).await);
        assert_eq!(
            out,
            "val=100.0\nup\nUnknown key code -2\nSerial port closed\n"
        );
    }

    #[tokio::test]
    async fn test_closed_notice_when_port_never_opened() {
        let (tx, rx) = mpsc::unbounded_channel::<AppEvent>();
        drop(tx);

        let out = output(report_events(rx, Vec::new()).await);
        assert_eq!(out, "Serial port closed\n");
    }
}
