mod bench;
mod scenario;

pub use bench::TestBench;
pub use scenario::{loopback_sweep, Scenario, ScenarioReport};
