use anyhow::{ensure, Result};
use typed_builder::TypedBuilder;

use crate::timing::{BaudConfig, ClockSelect, MIN_DIVIDER};

/// Parameters the control interface cannot express.
///
/// ```
/// use uartbox_core::UartConfig;
///
/// let config = UartConfig::builder().primary_divider(16).build();
/// assert!(config.validate().is_ok());
/// ```
#[derive(Copy, Clone, Debug, Eq, PartialEq, TypedBuilder)]
pub struct UartConfig {
    /// Clocks per bit with `clk_sel` = 0.
    #[builder(default = crate::DEFAULT_DIVIDER)]
    pub primary_divider: u16,
    /// Clocks per bit with `clk_sel` = 1.
    #[builder(default = crate::DEFAULT_DIVIDER / 2)]
    pub alternate_divider: u16,
    /// Hold the transmit-complete interrupt until the next transmission
    /// starts instead of pulsing it for one clock.
    #[builder(default = false)]
    pub sticky_tx_irq: bool,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl UartConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.primary_divider >= MIN_DIVIDER,
            "primary divider {} is below the minimum of {}",
            self.primary_divider,
            MIN_DIVIDER
        );
        ensure!(
            self.alternate_divider >= MIN_DIVIDER,
            "alternate divider {} is below the minimum of {}",
            self.alternate_divider,
            MIN_DIVIDER
        );
        Ok(())
    }

    pub fn baud(&self) -> BaudConfig {
        BaudConfig {
            primary_divider: self.primary_divider,
            alternate_divider: self.alternate_divider,
        }
    }

    #[inline]
    pub fn divider(&self, select: ClockSelect) -> u16 {
        self.baud().divider(select)
    }
}
