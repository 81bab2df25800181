pub mod inverter;
pub mod system_reading;

pub use inverter::{DeviceInfo, InverterReading, InverterRecord};
pub use system_reading::SystemReading;
