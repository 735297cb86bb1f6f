use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Header columns every source file must carry.
pub const SOURCE_COLUMNS: [&str; 3] = ["timestamp", "payment_method", "total"];

/// One row of a truck's source file, exactly as the terminal wrote it.
/// Empty fields decode as `None`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct RawRecord {
    pub timestamp: Option<String>,
    pub payment_method: Option<String>,
    pub total: Option<String>,
}

impl RawRecord {
    pub fn new(timestamp: &str, payment_method: &str, total: &str) -> Self {
        Self {
            timestamp: Some(timestamp.to_string()),
            payment_method: Some(payment_method.to_string()),
            total: Some(total.to_string()),
        }
    }
}

/// A validated transaction. `total` is always inside the open interval
/// (0, 100). Serialized field order is the combined artifact's column order.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CleanedRecord {
    #[serde(with = "super::timestamp::serde_format")]
    pub timestamp: NaiveDateTime,
    pub payment_method: String,
    pub total: f64,
    pub truck_id: u32,
}

impl CleanedRecord {
    /// Renders the record back into source-file shape, dropping the truck id.
    pub fn to_raw(&self) -> RawRecord {
        RawRecord {
            timestamp: Some(super::format_timestamp(&self.timestamp)),
            payment_method: Some(self.payment_method.clone()),
            total: Some(self.total.to_string()),
        }
    }
}
