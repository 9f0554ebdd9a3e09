//! Core library for the `weather` web front-end.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The weather provider abstraction and its OpenWeather client
//! - Shared domain models (units, requests, readings)
//! - Presentation mapping from readings to template contexts
//!
//! It is used by `weather-web`, but can also be reused by other binaries or services.

pub mod config;
pub mod error;
pub mod model;
pub mod present;
pub mod provider;

pub use config::Config;
pub use error::WeatherError;
pub use model::{Units, WeatherReading, WeatherRequest, unit_letter};
pub use provider::{WeatherProvider, openweather::OpenWeatherProvider, provider_from_config};
