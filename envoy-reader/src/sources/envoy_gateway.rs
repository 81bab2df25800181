use std::time::Duration;

use envoy_client::{merge_inverters, DeviceInfo, InverterReading, InverterRecord, SystemReading};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::{get_text, http_client};
use crate::pipeline::{FetchError, TelemetrySource};

const SYSTEM_PRODUCTION_PATH: &str = "/production.json";
const INVERTER_PRODUCTION_PATH: &str = "/api/v1/production/inverters";
const INVENTORY_PATH: &str = "/inventory.json";

/// Production entry type holding the micro-inverter totals.
const INVERTERS_TYPE: &str = "inverters";
/// Inventory device class of the micro-inverters.
const INVERTER_DEVICE_CLASS: &str = "PCU";

/// Local Envoy gateway, queried over HTTP with basic auth.
///
/// A new HTTP client is built for every fetch and dropped when it returns.
pub struct EnvoyGateway {
    base_url: String,
    username: String,
    password: String,
    timeout: Duration,
}

impl EnvoyGateway {
    pub fn new(base_url: &str, username: &str, password: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
            timeout,
        }
    }

    pub fn describe(&self) -> String {
        format!("envoy gateway {} as {}", self.base_url, self.username)
    }

    async fn get(&self, client: &reqwest::Client, path: &str) -> Result<String, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        let request = client.get(&url).basic_auth(&self.username, Some(&self.password));
        get_text(&url, request).await
    }
}

#[async_trait::async_trait]
impl TelemetrySource for EnvoyGateway {
    async fn fetch_system_readings(&self) -> Result<Vec<SystemReading>, FetchError> {
        let client = http_client(self.timeout)?;
        let body = self.get(&client, SYSTEM_PRODUCTION_PATH).await?;
        parse_system_production(&body)
    }

    async fn fetch_inverter_records(&self) -> Result<Vec<InverterRecord>, FetchError> {
        let client = http_client(self.timeout)?;
        let (production, inventory) = tokio::try_join!(
            self.get(&client, INVERTER_PRODUCTION_PATH),
            self.get(&client, INVENTORY_PATH)
        )?;

        let readings = parse_inverter_production(&production)?;
        let devices = parse_inventory(&inventory)?;
        Ok(merge_inverters(readings, &devices))
    }
}

/// Accepts integers, floats, numeric strings and null.
fn flex_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
        }
        _ => None,
    })
}

/// Accepts strings and numbers, the gateway firmware is not consistent.
fn flex_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

#[derive(Deserialize)]
struct IncomingProductionList {
    production: Option<Vec<IncomingProduction>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IncomingProduction {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default, deserialize_with = "flex_i64")]
    active_count: Option<i64>,
    #[serde(default, deserialize_with = "flex_i64")]
    reading_time: Option<i64>,
    #[serde(default, deserialize_with = "flex_i64")]
    w_now: Option<i64>,
    #[serde(default, deserialize_with = "flex_i64")]
    wh_lifetime: Option<i64>,
}

impl From<IncomingProduction> for SystemReading {
    fn from(i: IncomingProduction) -> Self {
        SystemReading {
            reading_time: i.reading_time.unwrap_or(0),
            active_count: i.active_count.unwrap_or(0),
            w_now: i.w_now.unwrap_or(0),
            wh_lifetime: i.wh_lifetime.unwrap_or(0),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IncomingInverterProduction {
    #[serde(default, deserialize_with = "flex_string")]
    serial_number: Option<String>,
    #[serde(default, deserialize_with = "flex_i64")]
    last_report_date: Option<i64>,
    #[serde(default, deserialize_with = "flex_i64")]
    last_report_watts: Option<i64>,
    #[serde(default, deserialize_with = "flex_i64")]
    max_report_watts: Option<i64>,
}

impl From<IncomingInverterProduction> for InverterReading {
    fn from(i: IncomingInverterProduction) -> Self {
        InverterReading {
            serial_number: i.serial_number.unwrap_or_default(),
            last_report_date: i.last_report_date.unwrap_or(0),
            last_report_watts: i.last_report_watts.unwrap_or(0),
            max_report_watts: i.max_report_watts.unwrap_or(0),
        }
    }
}

#[derive(Deserialize)]
struct IncomingInventoryGroup {
    #[serde(rename = "type", default)]
    kind: String,
    devices: Option<Vec<IncomingDevice>>,
}

#[derive(Deserialize)]
struct IncomingDevice {
    #[serde(default, deserialize_with = "flex_string")]
    serial_num: Option<String>,
    #[serde(default, deserialize_with = "flex_string")]
    part_num: Option<String>,
    #[serde(default, deserialize_with = "flex_i64")]
    installed: Option<i64>,
    #[serde(default)]
    device_status: Option<Vec<String>>,
    #[serde(default, deserialize_with = "flex_i64")]
    last_rpt_date: Option<i64>,
    #[serde(default, deserialize_with = "flex_i64")]
    admin_state: Option<i64>,
    #[serde(default, deserialize_with = "flex_i64")]
    dev_type: Option<i64>,
    #[serde(default, deserialize_with = "flex_i64")]
    created_date: Option<i64>,
    #[serde(default, deserialize_with = "flex_i64")]
    img_load_date: Option<i64>,
    #[serde(default, deserialize_with = "flex_string")]
    img_pnum_running: Option<String>,
    #[serde(default, deserialize_with = "flex_string")]
    ptpn: Option<String>,
    #[serde(default, deserialize_with = "flex_string")]
    chaneid: Option<String>,
    #[serde(default)]
    producing: Option<bool>,
    #[serde(default)]
    communicating: Option<bool>,
    #[serde(default)]
    provisioned: Option<bool>,
    #[serde(default)]
    operating: Option<bool>,
}

impl From<IncomingDevice> for DeviceInfo {
    fn from(i: IncomingDevice) -> Self {
        DeviceInfo {
            serial_num: i.serial_num.unwrap_or_default(),
            part_num: i.part_num.unwrap_or_default(),
            installed: i.installed,
            device_status: i.device_status.unwrap_or_default(),
            last_rpt_date: i.last_rpt_date,
            admin_state: i.admin_state,
            dev_type: i.dev_type,
            created_date: i.created_date,
            img_load_date: i.img_load_date,
            img_pnum_running: i.img_pnum_running,
            ptpn: i.ptpn,
            chaneid: i.chaneid,
            producing: i.producing.unwrap_or(false),
            communicating: i.communicating.unwrap_or(false),
            provisioned: i.provisioned.unwrap_or(false),
            operating: i.operating.unwrap_or(false),
        }
    }
}

/// Production summaries of type `inverters`; metering entries are ignored.
pub fn parse_system_production(body: &str) -> Result<Vec<SystemReading>, FetchError> {
    let list: IncomingProductionList =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(format!("production.json: {e}")))?;

    let production = list
        .production
        .ok_or_else(|| FetchError::MissingData("production.json has no production list".to_string()))?;

    Ok(production
        .into_iter()
        .filter(|p| p.kind == INVERTERS_TYPE)
        .map(SystemReading::from)
        .collect())
}

pub fn parse_inverter_production(body: &str) -> Result<Vec<InverterReading>, FetchError> {
    let readings: Option<Vec<IncomingInverterProduction>> =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(format!("inverter production: {e}")))?;

    let readings = readings.ok_or_else(|| FetchError::MissingData("inverter production is null".to_string()))?;
    Ok(readings.into_iter().map(InverterReading::from).collect())
}

/// Inverter-class devices of the inventory document.
///
/// An empty document, a missing inverter group or an empty device list are
/// all errors: none of them can be told apart from a malformed response.
pub fn parse_inventory(body: &str) -> Result<Vec<DeviceInfo>, FetchError> {
    let groups: Option<Vec<IncomingInventoryGroup>> =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(format!("inventory.json: {e}")))?;

    let groups = match groups {
        Some(groups) if !groups.is_empty() => groups,
        _ => return Err(FetchError::MissingData("inventory.json is empty".to_string())),
    };

    let devices = groups
        .into_iter()
        .find(|g| g.kind == INVERTER_DEVICE_CLASS)
        .ok_or_else(|| FetchError::MissingData(format!("inventory has no {INVERTER_DEVICE_CLASS} devices")))?
        .devices
        .unwrap_or_default();

    if devices.is_empty() {
        return Err(FetchError::MissingData(format!(
            "inventory {INVERTER_DEVICE_CLASS} device list is empty"
        )));
    }

    Ok(devices.into_iter().map(DeviceInfo::from).collect())
}
