pub mod device;
pub mod frame;

pub use device::Clocked;
