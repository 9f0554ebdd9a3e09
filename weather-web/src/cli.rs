use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Text};
use std::{net::SocketAddr, sync::Arc};
use weather_core::{
    Config, Units, WeatherRequest,
    present::{self, ComparisonContext, ResultsContext},
    provider_from_config,
};

use crate::{render::Renderer, server};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather web front-end")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP server.
    Serve {
        /// Listen address; overrides the configured one.
        #[arg(long)]
        address: Option<SocketAddr>,
    },

    /// Store the provider API key and listen address in the config file.
    Configure,

    /// Show the current weather for a city.
    Show {
        city: String,

        /// "imperial", "metric" or "standard"; other values go to the provider as-is.
        #[arg(long, short)]
        units: Option<String>,
    },

    /// Compare the current weather of two cities.
    Compare {
        city1: String,
        city2: String,

        #[arg(long, short)]
        units: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Serve { address } => serve(address).await,
            Command::Configure => configure(),
            Command::Show { city, units } => show(city, units.map(Units::from)).await,
            Command::Compare { city1, city2, units } => {
                compare(city1, city2, units.map(Units::from)).await
            }
        }
    }
}

async fn serve(address: Option<SocketAddr>) -> Result<()> {
    let config = Config::load()?;
    log::debug!("Loaded configuration: {config:?}");

    let provider = provider_from_config(&config)?;
    let renderer = Renderer::new().context("Failed to load page templates")?;
    let state = server::AppState::new(provider, Arc::new(renderer), &config.image_host);

    server::run(address.unwrap_or(config.bind_address), state).await;
    Ok(())
}

fn configure() -> Result<()> {
    let mut config = Config::load_file()?;

    let api_key = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    let default_address = config.bind_address.to_string();
    let address = Text::new("Listen address:")
        .with_default(&default_address)
        .prompt()
        .context("Failed to read listen address")?;

    config.bind_address = address
        .parse()
        .with_context(|| format!("Invalid listen address '{address}'"))?;
    if !api_key.trim().is_empty() {
        config.api_key = Some(api_key.trim().to_string());
    }

    let path = config.save()?;
    println!("Configuration saved to {}", path.display());
    Ok(())
}

async fn show(city: String, units: Option<Units>) -> Result<()> {
    let config = Config::load()?;
    let provider = provider_from_config(&config)?;

    let reading = provider
        .get_weather(&WeatherRequest::new(city.clone(), units.clone()))
        .await
        .with_context(|| format!("Failed to fetch weather for '{city}'"))?;

    let ctx =
        present::results_context(Local::now(), &city, units.as_ref(), &reading, &config.image_host)?;
    println!("{}", format_results(&ctx));
    Ok(())
}

async fn compare(city1: String, city2: String, units: Option<Units>) -> Result<()> {
    let config = Config::load()?;
    let provider = provider_from_config(&config)?;

    let request1 = WeatherRequest::new(city1.clone(), units.clone());
    let request2 = WeatherRequest::new(city2.clone(), units.clone());
    let (reading1, reading2) =
        tokio::try_join!(provider.get_weather(&request1), provider.get_weather(&request2))
            .context("Failed to fetch weather for comparison")?;

    let ctx = present::comparison_context(
        Local::now(),
        (&city1, &reading1),
        (&city2, &reading2),
        units.as_ref(),
    )?;
    println!("{}", format_comparison(&ctx));
    Ok(())
}

fn format_results(ctx: &ResultsContext) -> String {
    let info = &ctx.info;
    let unit = ctx.units_letter;

    format!(
        "{city}: {description}\n\
         \x20 Temperature: {temp} °{unit}\n\
         \x20 Humidity:    {humidity}%\n\
         \x20 Wind speed:  {wind}\n\
         \x20 Sunrise:     {sunrise}\n\
         \x20 Sunset:      {sunset}\n\
         \x20 Icon:        {icon}",
        city = info.city,
        description = info.description,
        temp = info.temp,
        humidity = info.humidity,
        wind = info.wind_speed,
        sunrise = info.sunrise.format(present::WALL_CLOCK_FORMAT),
        sunset = info.sunset.format(present::WALL_CLOCK_FORMAT),
        icon = ctx.icon_url,
    )
}

fn format_comparison(ctx: &ComparisonContext) -> String {
    let (a, b) = (&ctx.city1_info, &ctx.city2_info);
    let d = &ctx.differences;
    let unit = ctx.units_letter;

    format!(
        "{} vs {}\n\
         \x20 Temperature: {} °{unit} vs {} °{unit} ({:+.1})\n\
         \x20 Humidity:    {}% vs {}% ({:+.0})\n\
         \x20 Wind speed:  {} vs {} ({:+.2})\n\
         \x20 Sunset:      {} vs {} ({:+.1} h)",
        a.city,
        b.city,
        a.temp,
        b.temp,
        d.temp_difference,
        a.humidity,
        b.humidity,
        d.hum_difference,
        a.wind_speed,
        b.wind_speed,
        d.wind_difference,
        a.sunset.format(present::WALL_CLOCK_FORMAT),
        b.sunset.format(present::WALL_CLOCK_FORMAT),
        d.sunset_difference,
    )
}
