//! Receive engine.
//!
//! The RX pin passes a two-stage synchronizer. A falling edge on an armed,
//! enabled receiver starts a frame; the start bit is confirmed half a bit
//! period later and every following bit is sampled at its midpoint. The
//! receiver disarms after a framing error and re-arms once the line has been
//! seen high again, so a line held low never produces a stream of frames.

use uartbox_common::frame::{DATA_BITS, IDLE_LEVEL, START_LEVEL, STOP_LEVEL};

use crate::timing::BitTimer;

/// Clocks at the end of a bit window that take part in the majority vote.
const MAJORITY_WINDOW: u16 = 3;

/// How a data or stop bit is resolved. Latched at frame start.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum SampleMode {
    /// Take the line level at the bit midpoint.
    #[default]
    Midpoint,
    /// Majority of the three clocks ending at the bit midpoint.
    Majority,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum RxState {
    #[default]
    Idle,
    /// Falling edge seen, waiting for the start bit midpoint.
    StartDetect,
    /// Waiting for the midpoint of data bit `n`.
    Sampling(u8),
    StopCheck,
    /// Byte committed on the previous edge; lasts one clock.
    Ready,
}

/// Inputs sampled on one clock edge.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub struct RxInput {
    /// Gate for new frames. Frames already in flight always complete.
    pub enable: bool,
    /// Raw (unsynchronized) RX pin.
    pub line: bool,
    pub mode: SampleMode,
    /// Clocks per bit for a frame starting on this edge.
    pub divider: u16,
    /// Read strobe: clears the ready interrupt and error flags.
    pub read: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub struct RxOutput {
    /// Received byte register.
    pub data: u8,
    /// Receive-ready interrupt.
    pub ready: bool,
    pub framing_error: bool,
    pub overrun: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RxEngine {
    state: RxState,
    sync: [bool; 2],
    armed: bool,
    timer: BitTimer,
    mode: SampleMode,
    votes: u8,
    shadow: u8,
    data: u8,
    ready: bool,
    framing_error: bool,
    overrun: bool,
}

impl Default for RxEngine {
    fn default() -> Self {
        Self {
            state: RxState::Idle,
            // Reset low: arming needs a real high level on the pin.
            sync: [START_LEVEL; 2],
            armed: false,
            timer: BitTimer::default(),
            mode: SampleMode::default(),
            votes: 0,
            shadow: 0,
            data: 0,
            ready: false,
            framing_error: false,
            overrun: false,
        }
    }
}

impl RxEngine {
    #[inline]
    pub fn state(&self) -> RxState {
        self.state
    }

    #[inline]
    pub fn data(&self) -> u8 {
        self.data
    }

    #[inline]
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn output(&self) -> RxOutput {
        RxOutput {
            data: self.data,
            ready: self.ready,
            framing_error: self.framing_error,
            overrun: self.overrun,
        }
    }

    /// Transition function for one clock edge. `self` is left untouched; the
    /// caller commits the returned state.
    pub fn step(&self, input: &RxInput) -> (Self, RxOutput) {
        let mut next = *self;
        let line = self.sync[1];
        next.sync = [input.line, self.sync[0]];

        if input.read {
            next.ready = false;
            next.framing_error = false;
            next.overrun = false;
        }

        match self.state {
            RxState::Idle | RxState::Ready => {
                next.state = RxState::Idle;
                if line == IDLE_LEVEL {
                    next.armed = true;
                } else if self.armed && input.enable {
                    next.armed = false;
                    next.timer = BitTimer::started(input.divider);
                    next.mode = input.mode;
                    next.state = RxState::StartDetect;
                }
            }
            RxState::StartDetect => {
                next.timer.advance();
                if next.timer.count() >= next.timer.half() {
                    if line == START_LEVEL {
                        next.timer.restart();
                        next.votes = 0;
                        next.shadow = 0;
                        next.state = RxState::Sampling(0);
                    } else {
                        log::debug!("rx: start bit glitch rejected");
                        next.armed = true;
                        next.state = RxState::Idle;
                    }
                }
            }
            RxState::Sampling(bit) => {
                if let Some(level) = next.sample(line) {
                    next.shadow |= (level as u8) << bit;
                    next.state = if usize::from(bit) + 1 < DATA_BITS {
                        RxState::Sampling(bit + 1)
                    } else {
                        RxState::StopCheck
                    };
                }
            }
            RxState::StopCheck => {
                if let Some(level) = next.sample(line) {
                    if level == STOP_LEVEL {
                        if next.ready {
                            log::warn!(
                                "rx: overrun, byte {:#04x} replaced before it was read",
                                next.data
                            );
                            next.overrun = true;
                        }
                        next.data = next.shadow;
                        next.ready = true;
                        next.state = RxState::Ready;
                        log::debug!("rx: received {:#04x}", next.data);
                    } else {
                        log::warn!("rx: framing error, dropping {:#04x}", next.shadow);
                        next.framing_error = true;
                        next.state = RxState::Idle;
                    }
                }
            }
        }

        if next.state != self.state {
            log::trace!("rx: {:?} -> {:?}", self.state, next.state);
        }

        (next, next.output())
    }

    /// Advance the bit timer by one clock and resolve the bit on the clock
    /// that ends the window.
    fn sample(&mut self, line: bool) -> Option<bool> {
        let voting = self.timer.remaining() <= MAJORITY_WINDOW;
        let tick = self.timer.advance();
        if voting && line {
            self.votes += 1;
        }
        if !tick {
            return None;
        }
        let level = match self.mode {
            SampleMode::Midpoint => line,
            SampleMode::Majority => self.votes >= 2,
        };
        self.votes = 0;
        Some(level)
    }
}
