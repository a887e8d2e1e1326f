//! OpenWeatherMap-style current weather lookup.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use super::http_client;
use crate::collaborators::WeatherProvider;
use crate::config::AssistantConfig;
use crate::error::{CoreError, CoreResult};

#[derive(Debug, Deserialize)]
pub struct WeatherResponse {
    pub name: String,
    pub sys: WeatherSys,
    pub main: WeatherMain,
    pub weather: Vec<WeatherCondition>,
    pub wind: WeatherWind,
}

#[derive(Debug, Deserialize)]
pub struct WeatherSys {
    #[serde(default)]
    pub country: String,
}

#[derive(Debug, Deserialize)]
pub struct WeatherMain {
    pub temp: f64,
    pub feels_like: f64,
    pub humidity: f64,
}

#[derive(Debug, Deserialize)]
pub struct WeatherCondition {
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct WeatherWind {
    pub speed: f64,
}

#[derive(Debug, Deserialize)]
struct GeoLookup {
    city: Option<String>,
}

pub struct OpenWeatherProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    geo_lookup_url: String,
    fallback_city: String,
}

impl OpenWeatherProvider {
    pub fn from_config(config: &AssistantConfig) -> Self {
        Self {
            client: http_client(config.http_timeout()),
            api_key: config.weather_api_key.clone(),
            base_url: config.weather_base_url.clone(),
            geo_lookup_url: config.geo_lookup_url.clone(),
            fallback_city: config.fallback_city.clone(),
        }
    }

    /// City from IP geolocation; any failure falls back to the configured city.
    async fn locate(&self) -> String {
        let lookup = async {
            let res = self.client.get(&self.geo_lookup_url).send().await?;
            res.error_for_status()?.json::<GeoLookup>().await
        };
        match lookup.await {
            Ok(GeoLookup { city: Some(city) }) if !city.trim().is_empty() => city,
            Ok(_) => self.fallback_city.clone(),
            Err(e) => {
                warn!(target: "jarvis::weather", error = %e, "geolocation failed; using fallback city");
                self.fallback_city.clone()
            }
        }
    }
}

/// Spoken report: city, country, condition, temperature in C and F, feels-like, humidity, wind.
pub fn format_report(data: &WeatherResponse) -> String {
    let condition = data
        .weather
        .first()
        .map(|c| capitalize(&c.description))
        .unwrap_or_else(|| "Unknown conditions".to_string());
    let temp_f = data.main.temp * 9.0 / 5.0 + 32.0;
    format!(
        "Weather in {}, {}: {}, {:.1}°C ({:.1}°F), Feels like {:.1}°C, Humidity: {}%, Wind: {} m/s",
        data.name,
        data.sys.country,
        condition,
        data.main.temp,
        temp_f,
        data.main.feels_like,
        data.main.humidity,
        data.wind.speed
    )
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn get(&self, city: Option<&str>) -> CoreResult<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| CoreError::unavailable("weather", "no API key configured"))?;

        let city = match city.map(str::trim).filter(|c| !c.is_empty()) {
            Some(c) => c.to_string(),
            None => self.locate().await,
        };
        debug!(target: "jarvis::weather", city = %city, "fetching weather");

        let res = self
            .client
            .get(&self.base_url)
            .query(&[("q", city.as_str()), ("appid", api_key), ("units", "metric")])
            .send()
            .await
            .map_err(|e| CoreError::unavailable("weather", e))?;

        match res.status() {
            StatusCode::OK => {
                let data: WeatherResponse = res
                    .json()
                    .await
                    .map_err(|e| CoreError::unavailable("weather", e))?;
                Ok(format_report(&data))
            }
            StatusCode::NOT_FOUND => Err(CoreError::NotFound(format!(
                "City '{}' not found. Please check the spelling.",
                city
            ))),
            status => Err(CoreError::unavailable(
                "weather",
                format!("HTTP {}", status.as_u16()),
            )),
        }
    }
}
