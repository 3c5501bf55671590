//! Shared serde utilities for domain models

/// Reads `null` the same as a missing field. The task service sends
/// `"output": null` until a task has started.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + serde::Deserialize<'de>,
{
    let value: Option<T> = serde::Deserialize::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

/// Lenient optional timestamps: RFC 3339, or naive ISO 8601 read as UTC.
/// The task service emits naive datetimes for some fields.
pub mod timestamp_opt {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(ts: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match ts {
            Some(t) => serializer.serialize_some(&t.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) => parse(&s).map(Some).map_err(serde::de::Error::custom),
        }
    }

    pub fn parse(s: &str) -> Result<DateTime<Utc>, String> {
        if let Ok(t) = DateTime::parse_from_rfc3339(s) {
            return Ok(t.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|e| format!("invalid timestamp {s:?}: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct TestStruct {
        #[serde(
            default,
            with = "timestamp_opt",
            skip_serializing_if = "Option::is_none"
        )]
        at: Option<DateTime<Utc>>,
    }

    #[derive(Deserialize)]
    struct TextStruct {
        #[serde(default, deserialize_with = "null_as_default")]
        text: String,
    }

    #[test]
    fn null_text_reads_as_empty() {
        let obj: TextStruct = serde_json::from_str(r#"{"text":null}"#).unwrap();
        assert_eq!(obj.text, "");
        let obj: TextStruct = serde_json::from_str("{}").unwrap();
        assert_eq!(obj.text, "");
        let obj: TextStruct = serde_json::from_str(r#"{"text":"hi"}"#).unwrap();
        assert_eq!(obj.text, "hi");
    }

    #[test]
    fn parses_rfc3339() {
        let obj: TestStruct = serde_json::from_str(r#"{"at":"2024-05-01T10:00:00+02:00"}"#).unwrap();
        assert_eq!(obj.at, Some(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()));
    }

    #[test]
    fn parses_naive_as_utc() {
        let obj: TestStruct =
            serde_json::from_str(r#"{"at":"2024-05-01T10:00:00.123456"}"#).unwrap();
        let at = obj.at.unwrap();
        assert_eq!(at.timestamp(), Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap().timestamp());
    }

    #[test]
    fn null_and_missing_are_none() {
        let obj: TestStruct = serde_json::from_str(r#"{"at":null}"#).unwrap();
        assert!(obj.at.is_none());
        let obj: TestStruct = serde_json::from_str("{}").unwrap();
        assert!(obj.at.is_none());
    }

    #[test]
    fn rejects_garbage() {
        assert!(serde_json::from_str::<TestStruct>(r#"{"at":"yesterday"}"#).is_err());
    }

    #[test]
    fn none_omitted_from_json() {
        let obj = TestStruct { at: None };
        assert_eq!(serde_json::to_string(&obj).unwrap(), "{}");
    }
}
