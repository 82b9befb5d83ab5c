//! Bit-timing generator.
//!
//! There is no free-running baud clock. Each engine owns a [`BitTimer`] that
//! is restarted at a frame boundary with the divider resolved from the
//! current [`ClockSelect`], so a change of `clk_sel` mid-frame only takes
//! effect on the next frame.

/// Shortest usable bit period: the receiver needs half a period to confirm
/// the start bit and three clocks per bit for the majority vote.
pub const MIN_DIVIDER: u16 = 4;

/// Timing source picked by `clk_sel`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum ClockSelect {
    #[default]
    Primary,
    Alternate,
}

impl ClockSelect {
    pub fn from_bit(bit: bool) -> Self {
        if bit {
            ClockSelect::Alternate
        } else {
            ClockSelect::Primary
        }
    }
}

/// Clocks per bit for each timing source.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BaudConfig {
    /// `clk_sel` = 0. 32 matches a 320 time-unit bit at a 10 time-unit clock.
    pub primary_divider: u16,
    /// `clk_sel` = 1.
    pub alternate_divider: u16,
}

impl Default for BaudConfig {
    fn default() -> Self {
        Self {
            primary_divider: crate::DEFAULT_DIVIDER,
            alternate_divider: crate::DEFAULT_DIVIDER / 2,
        }
    }
}

impl BaudConfig {
    #[inline]
    pub fn divider(&self, select: ClockSelect) -> u16 {
        match select {
            ClockSelect::Primary => self.primary_divider,
            ClockSelect::Alternate => self.alternate_divider,
        }
    }
}

/// Phase counter producing one tick per bit period.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub struct BitTimer {
    divider: u16,
    count: u16,
}

impl BitTimer {
    /// A timer whose first tick lands `divider` clocks from now.
    pub fn started(divider: u16) -> Self {
        Self { divider, count: 0 }
    }

    /// Restart the current period without changing the divider.
    #[inline]
    pub fn restart(&mut self) {
        self.count = 0;
    }

    /// Advance one clock. Returns `true` on the clock that completes a bit
    /// period, at which point the counter wraps to zero.
    #[inline]
    pub fn advance(&mut self) -> bool {
        self.count = self.count.saturating_add(1);
        if self.count >= self.divider {
            self.count = 0;
            true
        } else {
            false
        }
    }

    /// Clocks left in the current period, counting the next one.
    #[inline]
    pub fn remaining(&self) -> u16 {
        self.divider.saturating_sub(self.count)
    }

    #[inline]
    pub fn count(&self) -> u16 {
        self.count
    }

    #[inline]
    pub fn divider(&self) -> u16 {
        self.divider
    }

    #[inline]
    pub fn half(&self) -> u16 {
        self.divider / 2
    }
}
