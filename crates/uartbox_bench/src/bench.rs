use uartbox_common::Clocked;
use uartbox_core::{PortInputs, PortOutputs};

/// Drives a clocked device the way a simulator test would: pins are set
/// between edges and time advances in simulation units.
pub struct TestBench<D> {
    device: D,
    /// Time units per clock.
    clock_period: u64,
    now: u64,
    edges: u64,
    inputs: PortInputs,
    outputs: PortOutputs,
}

impl<D> TestBench<D>
where
    D: Clocked<Input = PortInputs, Output = PortOutputs>,
{
    pub fn new(device: D, clock_period: u64) -> Self {
        log::debug!(
            "bench: driving '{}' with a {} unit clock",
            device.name(),
            clock_period
        );
        Self {
            device,
            clock_period: clock_period.max(1),
            now: 0,
            edges: 0,
            inputs: PortInputs::default(),
            outputs: PortOutputs::default(),
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn edges(&self) -> u64 {
        self.edges
    }

    pub fn outputs(&self) -> PortOutputs {
        self.outputs
    }

    pub fn set_reset_n(&mut self, level: bool) {
        self.inputs.reset_n = level;
    }

    pub fn set_control(&mut self, control: u8) {
        self.inputs.control = control;
    }

    pub fn set_data(&mut self, data: u8) {
        self.inputs.data = data;
    }

    pub fn data(&self) -> u8 {
        self.inputs.data
    }

    /// Drive the RX pin (data port bit 0), leaving the payload bits alone.
    pub fn set_rx_line(&mut self, level: bool) {
        self.inputs.data = (self.inputs.data & 0xFE) | level as u8;
    }

    /// Advance to the next rising edge and clock the device.
    pub fn rising_edge(&mut self) -> PortOutputs {
        self.now = (self.now / self.clock_period + 1) * self.clock_period;
        self.clock()
    }

    /// Let `units` of time pass, clocking every edge on the way. An edge
    /// landing exactly at the end still samples the current pins.
    pub fn wait_time(&mut self, units: u64) -> PortOutputs {
        let end = self.now + units;
        loop {
            let next_edge = (self.now / self.clock_period + 1) * self.clock_period;
            if next_edge > end {
                break;
            }
            self.now = next_edge;
            self.clock();
        }
        self.now = end;
        self.outputs
    }

    fn clock(&mut self) -> PortOutputs {
        self.edges += 1;
        self.outputs = self.device.tick(&self.inputs);
        self.outputs
    }
}
