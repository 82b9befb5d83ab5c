pub mod config;
pub mod control;
pub mod rx;
pub mod timing;
pub mod tx;
pub mod uart;

pub use config::UartConfig;
pub use uart::{PortInputs, PortOutputs, Status, Uart};

/// Clock period of the reference system clock, in simulation time units.
pub const CLOCK_PERIOD: u64 = 10;
/// Clocks per bit with the default timing source (320 time units per bit).
pub const DEFAULT_DIVIDER: u16 = 32;
