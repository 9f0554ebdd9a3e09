//! Presentation mapping: turns provider readings into the flat contexts the
//! templates render.
//!
//! Everything here is pure. The caller supplies the current instant so the
//! output only depends on the arguments.

use chrono::{DateTime, Duration, Local};
use serde::{Serialize, Serializer};

use crate::{
    error::Result,
    model::{Units, WeatherReading, unit_letter},
};

/// `str(datetime)`-style wall-clock rendering.
pub const WALL_CLOCK_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Format expected by `<input type="date">`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Days of history offered by the home page date picker.
pub const HISTORY_DAYS: i64 = 5;

fn wall_clock<S: Serializer>(dt: &DateTime<Local>, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&dt.format(WALL_CLOCK_FORMAT))
}

fn date_only<S: Serializer>(dt: &DateTime<Local>, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&dt.format(DATE_FORMAT))
}

#[derive(Debug, Clone, Serialize)]
pub struct HomeContext {
    #[serde(serialize_with = "date_only")]
    pub min_date: DateTime<Local>,
    #[serde(serialize_with = "date_only")]
    pub max_date: DateTime<Local>,
}

/// Default range for the historical date picker. Nothing consumes it yet.
pub fn home_context(now: DateTime<Local>) -> HomeContext {
    HomeContext {
        min_date: now - Duration::days(HISTORY_DAYS),
        max_date: now,
    }
}

/// Per-city values shared by the results and comparison pages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityInfo {
    pub city: String,
    pub description: String,
    pub temp: f64,
    pub humidity: u8,
    pub wind_speed: f64,
    #[serde(serialize_with = "wall_clock")]
    pub sunrise: DateTime<Local>,
    #[serde(serialize_with = "wall_clock")]
    pub sunset: DateTime<Local>,
}

impl CityInfo {
    pub fn from_reading(city: &str, reading: &WeatherReading) -> Result<Self> {
        Ok(Self {
            city: city.to_string(),
            description: reading.description.clone(),
            temp: reading.temperature,
            humidity: reading.humidity_pct,
            wind_speed: reading.wind_speed,
            sunrise: reading.sunrise_local()?,
            sunset: reading.sunset_local()?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultsContext {
    #[serde(serialize_with = "wall_clock")]
    pub date: DateTime<Local>,
    #[serde(flatten)]
    pub info: CityInfo,
    pub units_letter: char,
    pub icon_url: String,
}

pub fn icon_url(image_host: &str, icon: &str) -> String {
    format!("http://{image_host}/img/wn/{icon}@2x.png")
}

pub fn results_context(
    now: DateTime<Local>,
    city: &str,
    units: Option<&Units>,
    reading: &WeatherReading,
    image_host: &str,
) -> Result<ResultsContext> {
    Ok(ResultsContext {
        date: now,
        info: CityInfo::from_reading(city, reading)?,
        units_letter: unit_letter(units),
        icon_url: icon_url(image_host, &reading.icon),
    })
}

/// Rounds half away from zero to `digits` decimal places.
pub fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}

/// Signed differences between two readings, always first minus second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Differences {
    /// One decimal place.
    pub temp_difference: f64,
    /// Whole percent.
    pub hum_difference: f64,
    /// Two decimal places.
    pub wind_difference: f64,
    /// Hours, one decimal place.
    pub sunset_difference: f64,
}

impl Differences {
    pub fn between(first: &WeatherReading, second: &WeatherReading) -> Self {
        let humidity = f64::from(first.humidity_pct) - f64::from(second.humidity_pct);
        // Provider timestamps are unchecked here, so subtract in f64 to avoid overflow.
        let sunset_secs = first.sunset as f64 - second.sunset as f64;

        Self {
            temp_difference: round_to(first.temperature - second.temperature, 1),
            hum_difference: round_to(humidity, 0),
            wind_difference: round_to(first.wind_speed - second.wind_speed, 2),
            sunset_difference: round_to(sunset_secs / 3600.0, 1),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonContext {
    #[serde(serialize_with = "wall_clock")]
    pub date: DateTime<Local>,
    pub units_letter: char,
    #[serde(flatten)]
    pub differences: Differences,
    pub city1_info: CityInfo,
    pub city2_info: CityInfo,
}

pub fn comparison_context(
    now: DateTime<Local>,
    (city1, reading1): (&str, &WeatherReading),
    (city2, reading2): (&str, &WeatherReading),
    units: Option<&Units>,
) -> Result<ComparisonContext> {
    // Validates both timestamps before any arithmetic on them.
    let city1_info = CityInfo::from_reading(city1, reading1)?;
    let city2_info = CityInfo::from_reading(city2, reading2)?;

    Ok(ComparisonContext {
        date: now,
        units_letter: unit_letter(units),
        differences: Differences::between(reading1, reading2),
        city1_info,
        city2_info,
    })
}
