use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::fmt;

use crate::{
    config::DEFAULT_API_URL,
    error::{Result, WeatherError},
    model::{WeatherReading, WeatherRequest},
};

use super::WeatherProvider;

#[derive(Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_API_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url,
            http: Client::new(),
        }
    }

    async fn fetch_current(&self, request: &WeatherRequest) -> Result<WeatherReading> {
        let mut query = vec![
            ("q", request.city.as_str()),
            ("appid", self.api_key.as_str()),
        ];
        if let Some(units) = &request.units {
            query.push(("units", units.as_str()));
        }

        log::debug!(
            "OpenWeather current request: city={:?} units={}",
            request.city,
            request.units.as_ref().map_or("<default>", |u| u.as_str()),
        );

        // The request URL carries the key, so it is stripped from transport errors.
        let res = self.http.get(&self.base_url).query(&query).send().await.map_err(|e| {
            let e = e.without_url();
            log::warn!("OpenWeather request for {:?} failed: {}", request.city, e);
            WeatherError::ProviderUnavailable(e)
        })?;

        let status = res.status();
        let body = res.text().await.map_err(|e| WeatherError::ProviderUnavailable(e.without_url()))?;

        if !status.is_success() {
            log::warn!("OpenWeather answered {} for {:?}", status, request.city);
            return Err(status_error(status, &request.city, &body));
        }

        let parsed: OwCurrentResponse = serde_json::from_str(&body)?;
        parsed.into_reading()
    }
}

impl fmt::Debug for OpenWeatherProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenWeatherProvider")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    sunrise: i64,
    sunset: i64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    weather: Vec<OwWeather>,
    main: OwMain,
    wind: OwWind,
    sys: OwSys,
}

impl OwCurrentResponse {
    fn into_reading(self) -> Result<WeatherReading> {
        let weather = self.weather.into_iter().next().ok_or_else(|| {
            WeatherError::MalformedResponse("`weather` contains no conditions".to_string())
        })?;

        Ok(WeatherReading {
            description: weather.description,
            icon: weather.icon,
            temperature: self.main.temp,
            humidity_pct: self.main.humidity,
            wind_speed: self.wind.speed,
            sunrise: self.sys.sunrise,
            sunset: self.sys.sunset,
        })
    }
}

/// Error body OpenWeather sends alongside non-2xx statuses.
#[derive(Debug, Deserialize)]
struct OwErrorBody {
    message: String,
}

fn status_error(status: StatusCode, city: &str, body: &str) -> WeatherError {
    if status == StatusCode::NOT_FOUND {
        return WeatherError::CityNotFound(city.to_string());
    }

    let message = serde_json::from_str::<OwErrorBody>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| truncate_body(body));

    WeatherError::ProviderStatus { status: status.as_u16(), message }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn get_weather(&self, request: &WeatherRequest) -> Result<WeatherReading> {
        self.fetch_current(request).await
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
