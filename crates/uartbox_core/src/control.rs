//! Control word decoding.
//!
//! The control port multiplexes an enable, two configuration bits and three
//! strobes into one byte. [`decode`] turns it into tagged [`Command`]s so the
//! engines never look at raw bit positions.

use bitflags::bitflags;

use crate::rx::SampleMode;
use crate::timing::ClockSelect;

bitflags! {
    /// Raw control port (`ui_in`). Bits 6 and 7 are unused.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
    pub struct ControlWord: u8 {
        /// Engine enable.
        const TR_EN = 1 << 0;
        /// Receive sampling mode: 0 midpoint, 1 majority vote.
        const MODE_OSL = 1 << 1;
        /// Timing source select.
        const CLK_SEL = 1 << 2;
        /// Latch bits 7:1 of the data port into the transmit data register.
        const TX_DATA_W_EN = 1 << 3;
        /// Start a transmission (rising edge).
        const TR_DATA_LOAD = 1 << 4;
        /// Read/acknowledge the received byte.
        const RX_DATA_READ_EN = 1 << 5;
    }
}

impl ControlWord {
    pub fn from_port(raw: u8) -> Self {
        Self::from_bits_truncate(raw)
    }

    /// `flag` asserted together with `TR_EN`.
    #[inline]
    fn strobe(self, flag: ControlWord) -> bool {
        self.contains(ControlWord::TR_EN | flag)
    }
}

/// Shared data port bit carrying the receive line.
pub const RX_LINE_BIT: u8 = 0;

/// Transmit payload carried on bits 7:1 of the data port.
#[inline]
pub fn tx_payload(data_port: u8) -> u8 {
    (data_port >> 1) & 0x7F
}

#[inline]
pub fn rx_line(data_port: u8) -> bool {
    (data_port >> RX_LINE_BIT) & 0x1 != 0
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Command {
    Enable(bool),
    SetMode(SampleMode),
    SetClockSource(ClockSelect),
    /// Write the transmit data register.
    LoadTx(u8),
    StartTx,
    /// Acknowledge the received byte and clear the receive interrupt.
    ReadRx,
}

/// Everything one control word asks for on a single clock edge.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct CommandSet {
    pub enable: bool,
    pub mode: SampleMode,
    pub clock: ClockSelect,
    pub load_tx: Option<u8>,
    pub start_tx: bool,
    pub read_rx: bool,
    /// Route the received byte register onto the output data port.
    pub route_rx: bool,
}

impl CommandSet {
    /// Commands in the order they must be applied. `LoadTx` comes before
    /// `StartTx` so a write and a load on the same edge send the new byte.
    pub fn iter(&self) -> impl Iterator<Item = Command> {
        [
            Some(Command::Enable(self.enable)),
            Some(Command::SetMode(self.mode)),
            Some(Command::SetClockSource(self.clock)),
            self.load_tx.map(Command::LoadTx),
            self.start_tx.then_some(Command::StartTx),
            self.read_rx.then_some(Command::ReadRx),
        ]
        .into_iter()
        .flatten()
    }
}

/// Decode `word` sampled on this edge. `previous` is the word sampled on the
/// edge before and is only used for strobe edge detection.
pub fn decode(word: ControlWord, previous: ControlWord, data_port: u8) -> CommandSet {
    let rising = |flag| word.strobe(flag) && !previous.strobe(flag);
    CommandSet {
        enable: word.contains(ControlWord::TR_EN),
        mode: if word.contains(ControlWord::MODE_OSL) {
            SampleMode::Majority
        } else {
            SampleMode::Midpoint
        },
        clock: ClockSelect::from_bit(word.contains(ControlWord::CLK_SEL)),
        load_tx: word
            .strobe(ControlWord::TX_DATA_W_EN)
            .then(|| tx_payload(data_port)),
        start_tx: rising(ControlWord::TR_DATA_LOAD),
        read_rx: rising(ControlWord::RX_DATA_READ_EN),
        route_rx: word.strobe(ControlWord::RX_DATA_READ_EN),
    }
}
