use crate::{
    Config, WeatherReading, WeatherRequest, error::Result,
    provider::openweather::OpenWeatherProvider,
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod openweather;

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Fetch the current conditions for one (city, units) pair.
    ///
    /// Every call goes out to the provider; readings are never cached.
    async fn get_weather(&self, request: &WeatherRequest) -> Result<WeatherReading>;
}

/// Construct the provider from config. Fails when no API key is configured.
pub fn provider_from_config(config: &Config) -> Result<Arc<dyn WeatherProvider>> {
    let api_key = config.require_api_key()?;

    Ok(Arc::new(OpenWeatherProvider::with_base_url(
        api_key.to_owned(),
        config.api_url.clone(),
    )))
}
