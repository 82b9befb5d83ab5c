//! Serial frame layout shared by the core and its drivers.
//!
//! A frame is one start bit (low), eight data bits least significant first
//! and one stop bit (high). There is no parity bit. The line idles high.

pub const DATA_BITS: usize = 8;
pub const FRAME_BITS: usize = 1 + DATA_BITS + 1;

pub const START_LEVEL: bool = false;
pub const STOP_LEVEL: bool = true;
pub const IDLE_LEVEL: bool = true;

/// Line levels for `byte`, in transmission order.
pub fn encode(byte: u8) -> [bool; FRAME_BITS] {
    let mut bits = [IDLE_LEVEL; FRAME_BITS];
    bits[0] = START_LEVEL;
    for (i, bit) in bits[1..=DATA_BITS].iter_mut().enumerate() {
        *bit = (byte >> i) & 0x1 != 0;
    }
    bits[FRAME_BITS - 1] = STOP_LEVEL;
    bits
}

/// Inverse of [`encode`]. Returns `None` when the start or stop bit is at
/// the wrong level.
pub fn decode(bits: &[bool; FRAME_BITS]) -> Option<u8> {
    if bits[0] != START_LEVEL || bits[FRAME_BITS - 1] != STOP_LEVEL {
        log::trace!("rejecting frame with bad framing bits: {:?}", bits);
        return None;
    }
    let byte = bits[1..=DATA_BITS]
        .iter()
        .enumerate()
        .fold(0u8, |acc, (i, &bit)| acc | ((bit as u8) << i));
    Some(byte)
}
