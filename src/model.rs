use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity classification of a seismic event.
///
/// The wire value is a lowercase string. Anything unrecognized degrades to
/// `Safe` rather than failing the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Alert,
    Warning,
    Safe,
}

impl EventStatus {
    pub fn from_wire(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "alert" => EventStatus::Alert,
            "warning" => EventStatus::Warning,
            _ => EventStatus::Safe,
        }
    }

    /// Severity derived from magnitude, used when the upstream record
    /// carries no status field.
    pub fn for_magnitude(magnitude: f64) -> Self {
        if magnitude >= 5.0 {
            EventStatus::Alert
        } else if magnitude >= 3.0 {
            EventStatus::Warning
        } else {
            EventStatus::Safe
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Alert => "alert",
            EventStatus::Warning => "warning",
            EventStatus::Safe => "safe",
        }
    }
}

/// One seismic event, validated and normalized. Immutable once stored;
/// an update arrives as a whole new record under the same id.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub id: String,
    pub place: String,
    pub latitude: f64,
    pub longitude: f64,
    pub magnitude: f64,
    /// Kilometers. May be negative (above-datum events).
    pub depth: f64,
    pub time: DateTime<Utc>,
    pub status: EventStatus,
}

/// Wire shape of one event as the backend serializes it. Every field is
/// optional here so one malformed record can be dropped without aborting
/// the surrounding batch.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRecord {
    pub id: Option<serde_json::Value>,
    pub place: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub magnitude: Option<f64>,
    pub depth: Option<f64>,
    pub time: Option<serde_json::Value>,
    pub status: Option<String>,
}

#[derive(Debug)]
pub enum RecordError {
    MissingField(&'static str),
    OutOfRange(&'static str, f64),
    BadTime(String),
}

impl std::fmt::Display for RecordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordError::MissingField(name) => write!(f, "Missing field: {}", name),
            RecordError::OutOfRange(name, value) => {
                write!(f, "Field {} out of range: {}", name, value)
            }
            RecordError::BadTime(raw) => write!(f, "Unparseable event time: {}", raw),
        }
    }
}

impl std::error::Error for RecordError {}

impl TryFrom<RawRecord> for EventRecord {
    type Error = RecordError;

    fn try_from(raw: RawRecord) -> Result<Self, Self::Error> {
        // The backend sends numeric primary keys; other feeds send string ids.
        // Both normalize to a string key.
        let id = match raw.id {
            Some(serde_json::Value::String(s)) if !s.is_empty() => s,
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => return Err(RecordError::MissingField("id")),
        };

        let place = raw.place.ok_or(RecordError::MissingField("place"))?;
        let latitude = raw.latitude.ok_or(RecordError::MissingField("latitude"))?;
        let longitude = raw.longitude.ok_or(RecordError::MissingField("longitude"))?;
        let magnitude = raw.magnitude.ok_or(RecordError::MissingField("magnitude"))?;
        let depth = raw.depth.ok_or(RecordError::MissingField("depth"))?;

        if !(-90.0..=90.0).contains(&latitude) {
            return Err(RecordError::OutOfRange("latitude", latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(RecordError::OutOfRange("longitude", longitude));
        }
        if magnitude < 0.0 {
            return Err(RecordError::OutOfRange("magnitude", magnitude));
        }

        let time = parse_event_time(raw.time.ok_or(RecordError::MissingField("time"))?)?;

        let status = match raw.status {
            Some(s) => EventStatus::from_wire(&s),
            None => EventStatus::for_magnitude(magnitude),
        };

        Ok(EventRecord {
            id,
            place,
            latitude,
            longitude,
            magnitude,
            depth,
            time,
            status,
        })
    }
}

/// Event times arrive as RFC 3339 strings from the dashboard backend and as
/// epoch milliseconds from USGS-shaped feeds. Accept both.
fn parse_event_time(value: serde_json::Value) -> Result<DateTime<Utc>, RecordError> {
    match value {
        serde_json::Value::String(s) => DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| RecordError::BadTime(s)),
        serde_json::Value::Number(n) => {
            let millis = n.as_i64().ok_or_else(|| RecordError::BadTime(n.to_string()))?;
            DateTime::<Utc>::from_timestamp_millis(millis)
                .ok_or_else(|| RecordError::BadTime(millis.to_string()))
        }
        other => Err(RecordError::BadTime(other.to_string())),
    }
}
