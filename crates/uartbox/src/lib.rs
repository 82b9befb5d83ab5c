use anyhow::{Context, Result};
use uartbox_bench::{loopback_sweep, Scenario};
use uartbox_core::control::ControlWord;
use uartbox_core::{Uart, UartConfig};

pub enum SessionType {
    /// Transmit one byte, receive one byte, read it back.
    Reference,
    /// TX pin wired to RX pin for every 7-bit payload.
    Loopback,
}

/// Knobs taken from the command line.
#[derive(Clone, Copy, Debug, Default)]
pub struct Options {
    pub alternate_clock: bool,
    pub majority: bool,
    pub tx_payload: Option<u8>,
    pub rx_byte: Option<u8>,
}

pub fn run(session: SessionType, options: Options) -> Result<()> {
    let uart = Uart::new(UartConfig::default())?;
    match session {
        SessionType::Reference => run_reference(uart, options),
        SessionType::Loopback => run_loopback(uart),
    }
}

pub fn run_reference(uart: Uart, options: Options) -> Result<()> {
    let mut control_bits = ControlWord::empty();
    control_bits.set(ControlWord::CLK_SEL, options.alternate_clock);
    control_bits.set(ControlWord::MODE_OSL, options.majority);

    let divider = uart.config().divider(uartbox_core::timing::ClockSelect::from_bit(
        options.alternate_clock,
    ));
    let scenario = Scenario::builder()
        .control_bits(control_bits.bits())
        .bit_time(uartbox_core::CLOCK_PERIOD * divider as u64)
        .tx_payload(options.tx_payload.unwrap_or(0x55))
        .rx_byte(options.rx_byte.unwrap_or(0xAA))
        .build();

    let report = scenario.check(uart).context("reference session failed")?;
    println!("TX sent byte: 0x{:02X}", scenario.tx_payload);
    println!("TX busy for {} clocks after release", report.tx_busy_clocks);
    println!("RX received byte: 0x{:02X}", report.rx_received);
    println!(
        "TX interrupt: {}, RX interrupt: {}",
        report.tx_irq as u8, report.rx_irq as u8
    );
    println!("Session completed at t={}", report.elapsed);
    Ok(())
}

pub fn run_loopback(uart: Uart) -> Result<()> {
    let payloads: Vec<u8> = (0u8..0x80).collect();
    let received = loopback_sweep(uart, &payloads)?;
    let mismatches: Vec<(u8, u8)> = payloads
        .iter()
        .zip(&received)
        .filter(|(sent, got)| sent != got)
        .map(|(&sent, &got)| (sent, got))
        .collect();
    for (sent, got) in &mismatches {
        log::error!("loopback: sent 0x{:02X}, got 0x{:02X}", sent, got);
    }
    anyhow::ensure!(
        mismatches.is_empty(),
        "{} of {} payloads came back wrong",
        mismatches.len(),
        payloads.len()
    );
    println!("Loopback passed for {} payloads", payloads.len());
    Ok(())
}

/// Parse a byte given as hex (`0x55`) or decimal (`85`).
pub fn parse_byte(text: &str) -> Result<u8> {
    let value = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => text.parse::<u8>(),
    };
    value.with_context(|| format!("'{}' is not a byte value", text))
}
