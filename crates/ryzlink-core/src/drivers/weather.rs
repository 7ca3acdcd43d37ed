//! Current weather from openweathermap.org
//!
//! The query is carried in the profile's host string and the request itself
//! is a plain GET of `/get`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::protocol::commands::{HttpConfig, HttpQuery, HttpQueryMethod, HttpReceive};
use crate::protocol::payload::{decode_json, parse_ring_status, strip_framing, HTTP_STATUS_OK};
use crate::protocol::{ModemError, TransactionEngine};

/// Weather service settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherSettings {
    /// openweathermap.org API key
    pub api_key: String,
    /// Service endpoint without scheme
    pub endpoint: String,
    /// Modem HTTP profile slot
    pub profile_id: u8,
}

impl Default for WeatherSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: "api.openweathermap.org/data/2.5/weather".to_string(),
            profile_id: 1,
        }
    }
}

/// Current conditions for one location
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    /// Short text such as "light rain"
    pub description: String,
    /// Kelvin
    pub temperature: f64,
    /// Relative humidity in percent
    pub humidity: f64,
}

#[derive(Deserialize)]
struct Conditions {
    weather: Vec<Summary>,
    main: Readings,
}

#[derive(Deserialize)]
struct Summary {
    description: String,
}

#[derive(Deserialize)]
struct Readings {
    temp: f64,
    humidity: f64,
}

impl WeatherReport {
    /// Extract the report from a service response
    pub fn from_json(value: serde_json::Value) -> Result<Self, ModemError> {
        let conditions: Conditions = serde_json::from_value(value)
            .map_err(|e| ModemError::MalformedPayload(format!("unexpected weather data: {}", e)))?;
        let description = conditions
            .weather
            .into_iter()
            .next()
            .map(|s| s.description)
            .ok_or_else(|| ModemError::MalformedPayload("no weather summary".to_string()))?;
        Ok(Self {
            description,
            temperature: conditions.main.temp,
            humidity: conditions.main.humidity,
        })
    }
}

/// Fetches weather reports
pub struct WeatherDriver<'e> {
    engine: &'e mut TransactionEngine,
    settings: WeatherSettings,
    timeout: Duration,
}

impl<'e> WeatherDriver<'e> {
    /// Driver running on `engine`
    pub fn new(engine: &'e mut TransactionEngine, settings: WeatherSettings) -> Self {
        let timeout = engine.default_timeout();
        Self {
            engine,
            settings,
            timeout,
        }
    }

    /// Host string selecting `location`
    pub fn host_for(&self, location: &str) -> String {
        format!(
            "{}?appid={}&q={}",
            self.settings.endpoint, self.settings.api_key, location
        )
    }

    /// Current weather for `location`
    pub async fn fetch(&mut self, location: &str) -> Result<WeatherReport, ModemError> {
        let config = HttpConfig::new(self.settings.profile_id, self.host_for(location));
        self.engine.transact(&config, self.timeout).await?;

        let query = HttpQuery {
            profile_id: self.settings.profile_id,
            method: HttpQueryMethod::Get,
            resource: "/get".to_string(),
        };
        let ring = self.engine.transact(&query, self.timeout).await?;
        let status = parse_ring_status(&ring)?;
        if status != HTTP_STATUS_OK {
            return Err(ModemError::HttpStatus(status));
        }

        let receive = HttpReceive {
            profile_id: self.settings.profile_id,
        };
        let raw = self.engine.transact(&receive, self.timeout).await?;
        WeatherReport::from_json(decode_json(strip_framing(&raw)?)?)
    }
}
