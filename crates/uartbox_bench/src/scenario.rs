//! The reference transmit/receive session, replayed against a device.

use anyhow::{bail, ensure, Result};
use typed_builder::TypedBuilder;
use uartbox_common::frame::{self, FRAME_BITS};
use uartbox_common::Clocked;
use uartbox_core::control::ControlWord;
use uartbox_core::{PortInputs, PortOutputs, Status};

use crate::bench::TestBench;

const EN: u8 = ControlWord::TR_EN.bits();
const WRITE: u8 = ControlWord::TX_DATA_W_EN.bits();
const LOAD: u8 = ControlWord::TR_DATA_LOAD.bits();
const READ: u8 = ControlWord::RX_DATA_READ_EN.bits();

#[derive(Clone, Debug, TypedBuilder)]
pub struct Scenario {
    /// Time units per clock.
    #[builder(default = uartbox_core::CLOCK_PERIOD)]
    pub clock_period: u64,
    /// Time units per serial bit.
    #[builder(default = uartbox_core::CLOCK_PERIOD * uartbox_core::DEFAULT_DIVIDER as u64)]
    pub bit_time: u64,
    /// Extra control bits held for the whole session (`clk_sel`, `mode_osl`).
    #[builder(default = 0)]
    pub control_bits: u8,
    /// 7-bit transmit payload.
    #[builder(default = 0x55)]
    pub tx_payload: u8,
    #[builder(default = 0xAA)]
    pub rx_byte: u8,
    /// Clocks to wait for the transmitter before giving up.
    #[builder(default = 1000)]
    pub busy_timeout: u32,
    /// Clocks between the end of the stop bit and the read strobe.
    #[builder(default = 50)]
    pub settle_clocks: u32,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ScenarioReport {
    /// Clocks busy stayed high after the load strobe was released.
    pub tx_busy_clocks: u32,
    pub tx_completed: bool,
    /// Byte decoded from the TX line, if it was framed correctly.
    pub tx_frame: Option<u8>,
    /// Receive-ready interrupt just before the read strobe.
    pub rx_ready_before_read: bool,
    /// Output data port after the read strobe edge.
    pub rx_received: u8,
    /// Interrupt bits after the read strobe edge.
    pub tx_irq: bool,
    pub rx_irq: bool,
    /// Raw status port after the read strobe edge.
    pub status: u8,
    pub elapsed: u64,
}

impl Scenario {
    fn clocks_per_bit(&self) -> usize {
        (self.bit_time / self.clock_period.max(1)) as usize
    }

    pub fn run<D>(&self, device: D) -> Result<ScenarioReport>
    where
        D: Clocked<Input = PortInputs, Output = PortOutputs>,
    {
        ensure!(self.clock_period > 0, "clock period must be non-zero");
        ensure!(
            self.tx_payload < 0x80,
            "transmit payload {:#04x} does not fit the 7-bit data port",
            self.tx_payload
        );
        let clocks_per_bit = self.clocks_per_bit();
        ensure!(
            clocks_per_bit >= 2,
            "bit time {} is shorter than two clocks",
            self.bit_time
        );

        let mut tb = TestBench::new(device, self.clock_period);
        let mut report = ScenarioReport::default();
        let en = EN | self.control_bits;

        // Reset. The RX line idles high (mark) throughout.
        tb.set_reset_n(false);
        tb.set_control(0);
        tb.set_data(0x01);
        tb.wait_time(10 * self.clock_period);
        tb.set_reset_n(true);
        tb.rising_edge();
        for _ in 0..10 {
            tb.rising_edge();
        }

        log::info!("bench: transmitting {:#04x}", self.tx_payload);
        tb.set_control(en);
        tb.set_data((self.tx_payload << 1) | 1);
        tb.rising_edge();

        let mut tx_lines = Vec::with_capacity(FRAME_BITS * clocks_per_bit);
        tb.set_control(en | WRITE | LOAD);
        for _ in 0..5 {
            let out = tb.rising_edge();
            if out.status.contains(Status::TX_BUSY) {
                tx_lines.push(out.tx_line());
            }
        }
        tb.set_control(en);
        while tb.outputs().status.contains(Status::TX_BUSY)
            && report.tx_busy_clocks < self.busy_timeout
        {
            let out = tb.rising_edge();
            if out.status.contains(Status::TX_BUSY) {
                tx_lines.push(out.tx_line());
            }
            report.tx_busy_clocks += 1;
        }
        report.tx_completed = report.tx_busy_clocks < self.busy_timeout;
        if report.tx_completed {
            log::info!("bench: transmission completed");
        } else {
            log::warn!("bench: transmitter still busy after {} clocks", self.busy_timeout);
        }
        report.tx_frame = decode_line(&tx_lines, clocks_per_bit);

        log::info!("bench: receiving {:#04x}", self.rx_byte);
        for level in frame::encode(self.rx_byte) {
            tb.set_rx_line(level);
            tb.wait_time(self.bit_time);
        }
        for _ in 0..self.settle_clocks {
            tb.rising_edge();
        }
        report.rx_ready_before_read = tb.outputs().status.contains(Status::RX_READY);

        tb.set_control(en | READ);
        let out = tb.rising_edge();
        report.rx_received = out.data;
        report.tx_irq = out.status.contains(Status::TX_COMPLETE);
        report.rx_irq = out.status.contains(Status::RX_READY);
        report.status = out.uio_out();
        log::info!(
            "bench: received {:#04x}, tx irq {}, rx irq {}",
            report.rx_received,
            report.tx_irq as u8,
            report.rx_irq as u8
        );

        tb.set_control(en);
        tb.wait_time(1000);
        report.elapsed = tb.now();
        Ok(report)
    }

    /// Run and compare against what this scenario sent.
    pub fn check<D>(&self, device: D) -> Result<ScenarioReport>
    where
        D: Clocked<Input = PortInputs, Output = PortOutputs>,
    {
        let report = self.run(device)?;
        if !report.tx_completed {
            bail!("transmitter timed out after {} clocks", self.busy_timeout);
        }
        match report.tx_frame {
            Some(byte) if byte == self.tx_payload => {}
            Some(byte) => bail!(
                "TX line carried {:#04x}, expected {:#04x}",
                byte,
                self.tx_payload
            ),
            None => bail!("TX line did not carry a valid frame"),
        }
        ensure!(
            report.rx_ready_before_read,
            "receive-ready interrupt never asserted"
        );
        ensure!(
            report.rx_received == self.rx_byte,
            "received {:#04x}, expected {:#04x}",
            report.rx_received,
            self.rx_byte
        );
        Ok(report)
    }
}

/// Decode a TX line trace that starts on the start-bit edge.
fn decode_line(lines: &[bool], clocks_per_bit: usize) -> Option<u8> {
    let mut bits = [frame::IDLE_LEVEL; FRAME_BITS];
    for (i, bit) in bits.iter_mut().enumerate() {
        *bit = *lines.get(i * clocks_per_bit + clocks_per_bit / 2)?;
    }
    frame::decode(&bits)
}

/// Send every payload in `payloads` out of the TX pin and back into the RX
/// pin, returning what the read strobe produced for each.
pub fn loopback_sweep<D>(device: D, payloads: &[u8]) -> Result<Vec<u8>>
where
    D: Clocked<Input = PortInputs, Output = PortOutputs>,
{
    let mut tb = TestBench::new(device, uartbox_core::CLOCK_PERIOD);
    tb.set_reset_n(false);
    tb.rising_edge();
    tb.set_reset_n(true);

    let mut received = Vec::with_capacity(payloads.len());
    for &payload in payloads {
        ensure!(payload < 0x80, "payload {:#04x} exceeds 7 bits", payload);
        let mut control = EN;
        let mut ready_seen = false;
        // Idle, strobe, then run until the byte lands and the line is idle.
        for clock in 0..2000u32 {
            let line = tb.outputs().tx_line();
            tb.set_data((payload << 1) | line as u8);
            tb.set_control(control);
            let out = tb.rising_edge();
            control = match clock {
                0 => EN | WRITE | LOAD,
                _ => EN,
            };
            if out.status.contains(Status::RX_READY) {
                ready_seen = true;
            }
            if ready_seen && !out.status.contains(Status::TX_BUSY) && clock > 1 {
                break;
            }
        }
        ensure!(ready_seen, "payload {:#04x} never looped back", payload);

        tb.set_control(EN | READ);
        let out = tb.rising_edge();
        received.push(out.data);
        tb.set_control(EN);
        tb.rising_edge();
    }
    Ok(received)
}
