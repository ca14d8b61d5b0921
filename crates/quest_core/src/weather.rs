use crate::error::AppError;
use serde::Deserialize;
use std::sync::mpsc;
use std::time::Duration;

/// Current conditions for a location, as reported by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionSnapshot {
    pub location: String,
    pub description: String,
    pub temperature_c: f64,
}

/// Seam for the external weather service. The core never calls the
/// network directly, so tests substitute their own provider.
pub trait WeatherProvider {
    fn fetch_current(&self, location: &str) -> Result<ConditionSnapshot, AppError>;
}

/// wttr.in JSON ("format=j1") client with bounded timeouts. Any
/// transport or decode problem degrades to an error; nothing here blocks
/// indefinitely or panics.
pub struct WttrProvider {
    agent: ureq::Agent,
}

impl WttrProvider {
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout_connect(Duration::from_secs(5))
                .timeout_read(Duration::from_secs(10))
                .build(),
        }
    }
}

impl Default for WttrProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct WttrReply {
    current_condition: Vec<WttrCondition>,
}

#[derive(Debug, Deserialize)]
struct WttrCondition {
    #[serde(rename = "temp_C")]
    temp_c: String,
    #[serde(rename = "weatherDesc")]
    weather_desc: Vec<WttrText>,
}

#[derive(Debug, Deserialize)]
struct WttrText {
    value: String,
}

impl WeatherProvider for WttrProvider {
    fn fetch_current(&self, location: &str) -> Result<ConditionSnapshot, AppError> {
        let trimmed = location.trim();
        if trimmed.is_empty() {
            return Err(AppError::invalid_input("location is required"));
        }

        let url = format!("https://wttr.in/{}?format=j1", trimmed.replace(' ', "+"));
        let body = self
            .agent
            .get(&url)
            .call()
            .map_err(|err| AppError::io(err.to_string()))?
            .into_string()
            .map_err(|err| AppError::io(err.to_string()))?;

        let reply: WttrReply = serde_json::from_str(&body)
            .map_err(|err| AppError::invalid_data(err.to_string()))?;
        let condition = reply
            .current_condition
            .first()
            .ok_or_else(|| AppError::invalid_data("reply carries no current conditions"))?;

        let temperature_c = condition
            .temp_c
            .parse::<f64>()
            .map_err(|_| AppError::invalid_data("temperature is not a number"))?;
        let description = condition
            .weather_desc
            .first()
            .map(|text| text.value.trim().to_string())
            .unwrap_or_default();

        Ok(ConditionSnapshot {
            location: trimmed.to_string(),
            description,
            temperature_c,
        })
    }
}

/// Provider selected when lookups are switched off via `QUEST_OFFLINE`.
pub struct OfflineProvider;

impl WeatherProvider for OfflineProvider {
    fn fetch_current(&self, _location: &str) -> Result<ConditionSnapshot, AppError> {
        Err(AppError::io("weather lookups are disabled"))
    }
}

pub fn provider_from_env() -> Box<dyn WeatherProvider + Send> {
    if std::env::var("QUEST_OFFLINE").is_ok() {
        Box::new(OfflineProvider)
    } else {
        Box::new(WttrProvider::new())
    }
}

/// Runs the lookup on its own thread and hands the outcome back through
/// a channel. The lookup never touches store state and has no ordering
/// dependency with task mutations.
pub fn fetch_in_background(
    provider: Box<dyn WeatherProvider + Send>,
    location: String,
) -> mpsc::Receiver<Result<ConditionSnapshot, AppError>> {
    let (sender, receiver) = mpsc::channel();
    std::thread::spawn(move || {
        let result = provider.fetch_current(&location);
        let _ = sender.send(result);
    });
    receiver
}
