use thiserror::Error;

/// Failure kinds surfaced by the provider client and the presentation mapper.
///
/// Every kind fails the whole request; nothing here carries partial data.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Missing required parameter '{0}'")]
    InvalidParameter(&'static str),

    #[error("Weather provider is unavailable: {0}")]
    ProviderUnavailable(#[from] reqwest::Error),

    #[error("City '{0}' was not found by the weather provider")]
    CityNotFound(String),

    #[error("Weather provider request failed with status {status}: {message}")]
    ProviderStatus { status: u16, message: String },

    #[error("Malformed weather provider response: {0}")]
    MalformedResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl WeatherError {
    /// HTTP status a web front-end should answer with for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            WeatherError::InvalidParameter(_) => 400,
            WeatherError::CityNotFound(_) => 404,
            WeatherError::ProviderUnavailable(_)
            | WeatherError::ProviderStatus { .. }
            | WeatherError::MalformedResponse(_) => 502,
            WeatherError::Config(_) => 500,
        }
    }
}

impl From<serde_json::Error> for WeatherError {
    fn from(err: serde_json::Error) -> Self {
        WeatherError::MalformedResponse(err.to_string())
    }
}

pub type Result<T, E = WeatherError> = std::result::Result<T, E>;
