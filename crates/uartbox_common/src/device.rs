/// A device advanced one rising clock edge at a time.
///
/// Drivers (the test bench, the frontend) only talk to devices through this
/// trait: they present the input pins, clock the edge and sample whatever the
/// device drives afterwards.
pub trait Clocked {
    type Input;
    type Output;

    /// Advance one rising edge with `input` sampled at that edge.
    fn tick(&mut self, input: &Self::Input) -> Self::Output;
    /// Asynchronous reset back to the power-on state.
    fn reset(&mut self);

    fn name(&self) -> String;
}
