use std::fmt;

use chrono::{DateTime, Local};

use crate::error::{Result, WeatherError};

/// Unit system requested from the provider.
///
/// Parsing is case-sensitive; anything unrecognised is kept verbatim and
/// forwarded to the provider unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Units {
    Imperial,
    Metric,
    Standard,
    Other(String),
}

impl Units {
    pub fn as_str(&self) -> &str {
        match self {
            Units::Imperial => "imperial",
            Units::Metric => "metric",
            Units::Standard => "standard",
            Units::Other(raw) => raw.as_str(),
        }
    }

    /// Single-letter temperature label shown next to values.
    pub fn letter(&self) -> char {
        match self {
            Units::Imperial => 'F',
            Units::Metric => 'C',
            _ => 'K',
        }
    }
}

/// Unit letter for an optional units value; an absent value means the
/// provider default, which is Kelvin.
pub fn unit_letter(units: Option<&Units>) -> char {
    units.map_or('K', Units::letter)
}

impl From<&str> for Units {
    fn from(value: &str) -> Self {
        match value {
            "imperial" => Units::Imperial,
            "metric" => Units::Metric,
            "standard" => Units::Standard,
            other => Units::Other(other.to_string()),
        }
    }
}

impl From<String> for Units {
    fn from(value: String) -> Self {
        Units::from(value.as_str())
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct WeatherRequest {
    pub city: String,
    pub units: Option<Units>,
}

impl WeatherRequest {
    pub fn new(city: impl Into<String>, units: Option<Units>) -> Self {
        Self { city: city.into(), units }
    }
}

/// One point-in-time snapshot for a city, as reported by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReading {
    pub description: String,
    pub icon: String,
    pub temperature: f64,
    pub humidity_pct: u8,
    pub wind_speed: f64,
    /// Epoch seconds.
    pub sunrise: i64,
    /// Epoch seconds.
    pub sunset: i64,
}

impl WeatherReading {
    pub fn sunrise_local(&self) -> Result<DateTime<Local>> {
        epoch_to_local(self.sunrise)
    }

    pub fn sunset_local(&self) -> Result<DateTime<Local>> {
        epoch_to_local(self.sunset)
    }
}

/// Converts epoch seconds into local wall-clock time.
pub fn epoch_to_local(ts: i64) -> Result<DateTime<Local>> {
    DateTime::from_timestamp(ts, 0)
        .map(|utc| utc.with_timezone(&Local))
        .ok_or_else(|| WeatherError::MalformedResponse(format!("timestamp {ts} is out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_letter_follows_units() {
        assert_eq!(unit_letter(Some(&Units::Imperial)), 'F');
        assert_eq!(unit_letter(Some(&Units::Metric)), 'C');
        assert_eq!(unit_letter(Some(&Units::Standard)), 'K');
        assert_eq!(unit_letter(Some(&Units::from("kelvinish"))), 'K');
        assert_eq!(unit_letter(None), 'K');
    }

    #[test]
    fn units_parsing_is_case_sensitive() {
        assert_eq!(Units::from("metric"), Units::Metric);
        assert_eq!(Units::from("Metric"), Units::Other("Metric".into()));
        assert_eq!(unit_letter(Some(&Units::from("IMPERIAL"))), 'K');
    }

    #[test]
    fn unknown_units_are_kept_verbatim() {
        let units = Units::from("furlongs");
        assert_eq!(units.as_str(), "furlongs");
        assert_eq!(units.to_string(), "furlongs");
    }

    #[test]
    fn epoch_conversion_rejects_out_of_range() {
        assert!(epoch_to_local(1_700_000_000).is_ok());
        let err = epoch_to_local(i64::MAX).unwrap_err();
        assert!(matches!(err, WeatherError::MalformedResponse(_)));
    }
}
