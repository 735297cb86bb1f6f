use chrono::{DateTime, NaiveDateTime};

const OUTPUT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parses the timestamp shapes terminals emit. Values carrying an offset are
/// normalized to UTC before the offset is dropped.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

/// Fractional seconds are only written when non-zero.
pub fn format_timestamp(value: &NaiveDateTime) -> String {
    value.format(OUTPUT_FORMAT).to_string()
}

pub(crate) mod serde_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(
        value: &NaiveDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {raw}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_parse_accepted_shapes() {
        let expected = NaiveDate::from_ymd_opt(2024, 11, 30)
            .unwrap()
            .and_hms_opt(23, 15, 0)
            .unwrap();

        assert_eq!(parse_timestamp("2024-11-30 23:15:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-11-30T23:15:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-11-30 23:15"), Some(expected));
        assert_eq!(parse_timestamp(" 2024-11-30 23:15:00 "), Some(expected));
        assert_eq!(parse_timestamp("2024-12-01T01:15:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-11-30T23:15:00Z"), Some(expected));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("2024-13-01 00:00:00"), None);
        assert_eq!(parse_timestamp("2024-02-30 10:00:00"), None);
    }

    #[test]
    fn test_format_round_trips() {
        let whole = parse_timestamp("2024-11-30 23:15:00").unwrap();
        assert_eq!(format_timestamp(&whole), "2024-11-30 23:15:00");

        let fractional = parse_timestamp("2024-11-30 23:15:00.250").unwrap();
        assert_eq!(parse_timestamp(&format_timestamp(&fractional)), Some(fractional));
    }
}
