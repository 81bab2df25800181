pub mod domain;
pub mod merge;

pub use domain::{DeviceInfo, InverterReading, InverterRecord, SystemReading};
pub use merge::merge_inverters;
