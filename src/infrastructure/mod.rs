pub mod disto;
#[cfg(windows)]
pub mod input_simulator;
pub mod logging;
pub mod output_sink;
