/// Aggregate production of all micro-inverters as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SystemReading {
    pub reading_time: i64,
    pub active_count: i64,
    pub w_now: i64,
    pub wh_lifetime: i64,
}

impl SystemReading {
    /// A reading without a positive unix timestamp is absent and must not be written.
    pub fn is_valid(&self) -> bool {
        self.reading_time > 0
    }
}
