use std::collections::HashMap;

use crate::domain::{DeviceInfo, InverterReading, InverterRecord};

/// Left-join production samples with inventory entries on the serial number.
///
/// Every reading yields exactly one record, in input order. A reading whose
/// serial is missing from the inventory keeps `device: None`. When the
/// inventory lists a serial more than once, the first entry wins.
pub fn merge_inverters(readings: Vec<InverterReading>, devices: &[DeviceInfo]) -> Vec<InverterRecord> {
    let mut by_serial: HashMap<&str, &DeviceInfo> = HashMap::with_capacity(devices.len());
    for device in devices {
        by_serial.entry(device.serial_num.as_str()).or_insert(device);
    }

    readings
        .into_iter()
        .map(|production| {
            let device = by_serial.get(production.serial_number.as_str()).map(|d| (*d).clone());
            InverterRecord { production, device }
        })
        .collect()
}
