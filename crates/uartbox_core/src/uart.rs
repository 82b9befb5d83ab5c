//! Control/status register bank.
//!
//! [`Uart`] is the device seen from the pins. Every [`Uart::tick`] is one
//! rising clock edge: the control word and data port are sampled, decoded
//! into commands, both engines take one step and the status and output data
//! ports are updated. Nothing reaches an output without passing an edge.

use anyhow::{Context, Result};
use bitflags::bitflags;
use uartbox_common::Clocked;

use crate::config::UartConfig;
use crate::control::{self, Command, ControlWord};
use crate::rx::{RxEngine, RxInput, RxOutput, RxState, SampleMode};
use crate::timing::ClockSelect;
use crate::tx::{TxEngine, TxInput, TxOutput, TxState};

bitflags! {
    /// Output status port (`uio_out`). Bits 0 and 3 are reserved and read 0.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
    pub struct Status: u8 {
        /// Transmit-complete interrupt.
        const TX_COMPLETE = 1 << 1;
        /// Receive-ready interrupt.
        const RX_READY = 1 << 2;
        /// Live level of the serial output line.
        const TX_LINE = 1 << 4;
        /// Transmit engine mid-frame.
        const TX_BUSY = 1 << 5;
        /// Last frame was dropped for a low stop bit. Cleared by a read.
        const FRAMING_ERROR = 1 << 6;
        /// A received byte was replaced before it was read. Cleared by a read.
        const OVERRUN = 1 << 7;
    }
}

impl Status {
    fn aggregate(tx: &TxOutput, rx: &RxOutput) -> Self {
        let mut status = Status::empty();
        status.set(Status::TX_COMPLETE, tx.complete);
        status.set(Status::RX_READY, rx.ready);
        status.set(Status::TX_LINE, tx.line);
        status.set(Status::TX_BUSY, tx.busy);
        status.set(Status::FRAMING_ERROR, rx.framing_error);
        status.set(Status::OVERRUN, rx.overrun);
        status
    }
}

/// Pins sampled on a rising edge.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PortInputs {
    /// Active-low reset.
    pub reset_n: bool,
    /// Control word (`ui_in`).
    pub control: u8,
    /// Shared data port (`uio_in`): bit 0 RX line, bits 7:1 TX payload.
    pub data: u8,
}

impl Default for PortInputs {
    fn default() -> Self {
        Self {
            reset_n: true,
            control: 0,
            data: 0,
        }
    }
}

/// Pins driven after a rising edge.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct PortOutputs {
    /// Output data port (`uo_out`).
    pub data: u8,
    pub status: Status,
}

impl PortOutputs {
    #[inline]
    pub fn uio_out(&self) -> u8 {
        self.status.bits()
    }

    #[inline]
    pub fn tx_line(&self) -> bool {
        self.status.contains(Status::TX_LINE)
    }
}

pub struct Uart {
    config: UartConfig,
    tx: TxEngine,
    rx: RxEngine,
    /// Control word sampled on the previous edge, for strobe edges.
    last_control: ControlWord,
    /// Output data port register.
    data_out: u8,
    /// Clocks the output data port keeps its value after the read strobe.
    hold: u8,
    status: Status,
    cycles: u64,
}

impl Default for Uart {
    fn default() -> Self {
        Self::from_config(UartConfig::default())
    }
}

impl Uart {
    pub fn new(config: UartConfig) -> Result<Self> {
        config.validate().context("invalid uart configuration")?;
        Ok(Self::from_config(config))
    }

    fn from_config(config: UartConfig) -> Self {
        log::info!(
            "uart init: {} clocks per bit (clk_sel=0), {} clocks per bit (clk_sel=1)",
            config.primary_divider,
            config.alternate_divider
        );
        let tx = TxEngine::new(config.sticky_tx_irq);
        Self {
            config,
            tx,
            rx: RxEngine::default(),
            last_control: ControlWord::empty(),
            data_out: 0,
            hold: 0,
            status: Status::aggregate(&tx.output(), &RxOutput::default()),
            cycles: 0,
        }
    }

    pub fn config(&self) -> &UartConfig {
        &self.config
    }

    pub fn tx_state(&self) -> TxState {
        self.tx.state()
    }

    pub fn rx_state(&self) -> RxState {
        self.rx.state()
    }

    /// Received byte register, without going through the read strobe.
    pub fn received(&self) -> u8 {
        self.rx.data()
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn outputs(&self) -> PortOutputs {
        PortOutputs {
            data: self.data_out,
            status: self.status,
        }
    }

    /// Clock edges since the last reset.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn tick(&mut self, input: &PortInputs) -> PortOutputs {
        if !input.reset_n {
            self.reset();
            return self.outputs();
        }
        self.cycles += 1;

        let word = ControlWord::from_port(input.control);
        let commands = control::decode(word, self.last_control, input.data);
        self.last_control = word;

        let divider = self.config.divider(ClockSelect::default());
        let mut tx_in = TxInput {
            divider,
            ..Default::default()
        };
        let mut rx_in = RxInput {
            enable: false,
            line: control::rx_line(input.data),
            mode: SampleMode::default(),
            divider,
            read: false,
        };
        for command in commands.iter() {
            match command {
                Command::Enable(enable) => rx_in.enable = enable,
                Command::SetMode(mode) => rx_in.mode = mode,
                Command::SetClockSource(select) => {
                    let divider = self.config.divider(select);
                    tx_in.divider = divider;
                    rx_in.divider = divider;
                }
                Command::LoadTx(byte) => tx_in.write = Some(byte),
                Command::StartTx => tx_in.start = true,
                Command::ReadRx => rx_in.read = true,
            }
        }

        let (tx, tx_out) = self.tx.step(&tx_in);
        let (rx, rx_out) = self.rx.step(&rx_in);
        self.tx = tx;
        self.rx = rx;
        self.status = Status::aggregate(&tx_out, &rx_out);

        if commands.route_rx {
            self.data_out = rx_out.data;
            self.hold = 1;
        } else if self.hold > 0 {
            self.hold -= 1;
        } else {
            self.data_out = 0;
        }

        self.outputs()
    }

    pub fn reset(&mut self) {
        if self.cycles > 0 {
            log::info!("uart reset after {} cycles", self.cycles);
        }
        self.tx = TxEngine::new(self.config.sticky_tx_irq);
        self.rx = RxEngine::default();
        self.last_control = ControlWord::empty();
        self.data_out = 0;
        self.hold = 0;
        self.status = Status::aggregate(&self.tx.output(), &self.rx.output());
        self.cycles = 0;
    }
}

impl Clocked for Uart {
    type Input = PortInputs;
    type Output = PortOutputs;

    fn tick(&mut self, input: &PortInputs) -> PortOutputs {
        Uart::tick(self, input)
    }

    fn reset(&mut self) {
        Uart::reset(self)
    }

    fn name(&self) -> String {
        "uartbox core".to_string()
    }
}

#[cfg(test)]
mod tests;
