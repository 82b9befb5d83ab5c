//! Transmit engine.
//!
//! Serializes the transmit data register onto the TX line: one start bit,
//! eight data bits least significant first, one stop bit. `busy` covers
//! exactly those ten bit periods.

use uartbox_common::frame::{DATA_BITS, IDLE_LEVEL, START_LEVEL, STOP_LEVEL};

use crate::timing::BitTimer;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum TxState {
    #[default]
    Idle,
    /// Shift register captured, start bit on the line.
    Loading,
    /// Data bit `n` on the line.
    Shifting(u8),
    StopBit,
    /// Frame finished; lasts one clock.
    Done,
}

/// Inputs sampled on one clock edge.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub struct TxInput {
    /// Write to the transmit data register.
    pub write: Option<u8>,
    /// Start strobe.
    pub start: bool,
    /// Clocks per bit for a frame started on this edge.
    pub divider: u16,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TxOutput {
    /// Serial output line level.
    pub line: bool,
    pub busy: bool,
    /// Transmit-complete interrupt.
    pub complete: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub struct TxEngine {
    state: TxState,
    /// Transmit data register.
    data: u8,
    shift: u8,
    timer: BitTimer,
    irq: bool,
    sticky_irq: bool,
}

impl TxEngine {
    pub fn new(sticky_irq: bool) -> Self {
        Self {
            sticky_irq,
            ..Default::default()
        }
    }

    #[inline]
    pub fn state(&self) -> TxState {
        self.state
    }

    #[inline]
    pub fn data(&self) -> u8 {
        self.data
    }

    #[inline]
    pub fn is_busy(&self) -> bool {
        matches!(
            self.state,
            TxState::Loading | TxState::Shifting(_) | TxState::StopBit
        )
    }

    pub fn line(&self) -> bool {
        match self.state {
            TxState::Idle | TxState::Done => IDLE_LEVEL,
            TxState::Loading => START_LEVEL,
            TxState::Shifting(bit) => (self.shift >> bit) & 0x1 != 0,
            TxState::StopBit => STOP_LEVEL,
        }
    }

    pub fn output(&self) -> TxOutput {
        TxOutput {
            line: self.line(),
            busy: self.is_busy(),
            complete: self.irq,
        }
    }

    /// Transition function for one clock edge. `self` is left untouched; the
    /// caller commits the returned state.
    pub fn step(&self, input: &TxInput) -> (Self, TxOutput) {
        let mut next = *self;
        let busy = self.is_busy();

        if let Some(byte) = input.write {
            if busy {
                log::debug!("tx: ignoring data write {:#04x} while busy", byte);
            } else {
                next.data = byte;
            }
        }

        match self.state {
            TxState::Idle | TxState::Done => {
                if self.state == TxState::Done {
                    next.state = TxState::Idle;
                    if !self.sticky_irq {
                        next.irq = false;
                    }
                }
                if input.start {
                    next.shift = next.data;
                    next.timer = BitTimer::started(input.divider);
                    next.irq = false;
                    next.state = TxState::Loading;
                    log::debug!(
                        "tx: start frame {:#04x}, {} clocks per bit",
                        next.shift,
                        input.divider
                    );
                }
            }
            TxState::Loading => {
                if next.timer.advance() {
                    next.state = TxState::Shifting(0);
                }
            }
            TxState::Shifting(bit) => {
                if next.timer.advance() {
                    next.state = if usize::from(bit) + 1 < DATA_BITS {
                        TxState::Shifting(bit + 1)
                    } else {
                        TxState::StopBit
                    };
                }
            }
            TxState::StopBit => {
                if next.timer.advance() {
                    next.state = TxState::Done;
                    next.irq = true;
                    log::debug!("tx: frame {:#04x} sent", next.shift);
                }
            }
        }

        if busy && input.start {
            log::debug!("tx: ignoring start while busy");
        }
        if next.state != self.state {
            log::trace!("tx: {:?} -> {:?}", self.state, next.state);
        }

        (next, next.output())
    }
}
