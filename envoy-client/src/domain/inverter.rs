/// Per-device production sample.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct InverterReading {
    pub serial_number: String,
    pub last_report_date: i64,
    pub last_report_watts: i64,
    pub max_report_watts: i64,
}

impl InverterReading {
    pub fn is_valid(&self) -> bool {
        self.last_report_date > 0
    }
}

/// Inventory entry of a single micro-inverter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DeviceInfo {
    pub serial_num: String,
    pub part_num: String,
    pub installed: Option<i64>,
    pub device_status: Vec<String>,
    pub last_rpt_date: Option<i64>,
    pub admin_state: Option<i64>,
    pub dev_type: Option<i64>,
    pub created_date: Option<i64>,
    pub img_load_date: Option<i64>,
    pub img_pnum_running: Option<String>,
    pub ptpn: Option<String>,
    pub chaneid: Option<String>,
    pub producing: bool,
    pub communicating: bool,
    pub provisioned: bool,
    pub operating: bool,
}

/// Production sample joined with its inventory entry, if the gateway listed one.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct InverterRecord {
    pub production: InverterReading,
    pub device: Option<DeviceInfo>,
}

impl InverterRecord {
    pub fn serial_number(&self) -> &str {
        &self.production.serial_number
    }

    pub fn is_valid(&self) -> bool {
        self.production.is_valid()
    }
}
