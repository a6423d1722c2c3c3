//! The `get_weather` tool: a mock forecast provider.
//!
//! Shapes its output like a real weather API — city codes, conditions,
//! temperature, humidity, wind, AQI — but samples the values. Swap
//! `mock_forecast` for a real HTTP call to productionize.

use crate::ToolDef;
use crate::tools::core::{Tool, ToolFuture};
use crate::tools::spec::ToolSpec;
use chrono::Utc;
use rand::Rng;
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::info;

/// Supported cities and their provider codes.
const CITY_CODES: &[(&str, &str)] = &[
    ("beijing", "101010100"),
    ("shanghai", "101020100"),
    ("guangzhou", "101280100"),
    ("shenzhen", "101280600"),
    ("hangzhou", "101210101"),
    ("chengdu", "101270101"),
    ("wuhan", "101200101"),
    ("xian", "101110101"),
    ("nanjing", "101190101"),
    ("chongqing", "101040100"),
];

const CONDITIONS: &[&str] = &[
    "sunny",
    "partly cloudy",
    "overcast",
    "light rain",
    "heavy rain",
    "snow",
];

const WIND_DIRECTIONS: &[&str] = &["north", "south", "east", "west"];

/// Temperature unit for the response.
#[derive(Deserialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TempUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

/// Typed arguments for the `get_weather` tool.
#[derive(Deserialize, JsonSchema)]
pub struct WeatherArgs {
    /// City name, e.g. 'beijing' or 'hangzhou'.
    pub location: String,
    /// Date in YYYY-MM-DD format; defaults to today.
    #[serde(default)]
    pub date: Option<String>,
    /// Temperature unit; defaults to celsius.
    #[serde(default)]
    pub unit: Option<TempUnit>,
}

/// Mock weather lookup tool.
pub struct Weather;

impl Tool for Weather {
    fn definition(&self) -> ToolDef {
        ToolSpec::builder("get_weather")
            .purpose("Get the weather for a city on a given date")
            .when_to_use(
                "When the user asks about weather, whether to bring an umbrella, \
                 or what to wear",
            )
            .when_not_to_use("For the current time or date — use get_current_time instead")
            .parameters_for::<WeatherArgs>()
            .example(
                "get_weather(location='beijing')",
                "today's condition, temperature, humidity, wind, AQI",
            )
            .output_format("JSON: {success, data: {...}} or {success: false, error}")
            .to_tool_def()
    }

    fn execute(&self, arguments: &str) -> ToolFuture<'_> {
        let arguments = arguments.to_string();
        Box::pin(async move {
            let args: WeatherArgs = match crate::tools::core::parse_tool_args(&arguments) {
                Ok(a) => a,
                Err(e) => return e,
            };

            let Some((city, code)) = lookup_city(&args.location) else {
                let supported: Vec<&str> = CITY_CODES.iter().map(|(c, _)| *c).collect();
                return serde_json::json!({
                    "success": false,
                    "error": format!(
                        "no code for city '{}'; supported cities: {}",
                        args.location,
                        supported.join(", ")
                    ),
                })
                .to_string();
            };

            let date = args
                .date
                .unwrap_or_else(|| Utc::now().format("%Y-%m-%d").to_string());
            let mut data = mock_forecast(city, code, &date);

            if args.unit.unwrap_or_default() == TempUnit::Fahrenheit {
                if let Some(celsius) = data["temperature"].as_f64() {
                    let fahrenheit = celsius * 9.0 / 5.0 + 32.0;
                    data["temperature"] = serde_json::json!((fahrenheit * 10.0).round() / 10.0);
                }
                data["unit"] = serde_json::json!("F");
            } else {
                data["unit"] = serde_json::json!("C");
            }

            info!("weather lookup: {city} on {date}");
            serde_json::json!({ "success": true, "data": data }).to_string()
        })
    }
}

/// Exact match first, then fuzzy containment either way.
fn lookup_city(location: &str) -> Option<(&'static str, &'static str)> {
    let lowered = location.to_lowercase();
    CITY_CODES
        .iter()
        .find(|(city, _)| *city == lowered)
        .or_else(|| {
            CITY_CODES
                .iter()
                .find(|(city, _)| city.contains(lowered.as_str()) || lowered.contains(city))
        })
        .copied()
}

/// Sampled stand-in for a provider call.
fn mock_forecast(city: &str, code: &str, date: &str) -> serde_json::Value {
    let mut rng = rand::thread_rng();
    serde_json::json!({
        "location": city,
        "city_code": code,
        "date": date,
        "temperature": rng.gen_range(15..=35),
        "condition": CONDITIONS[rng.gen_range(0..CONDITIONS.len())],
        "humidity": rng.gen_range(40..=90),
        "wind_speed": rng.gen_range(1..=20),
        "wind_direction": WIND_DIRECTIONS[rng.gen_range(0..WIND_DIRECTIONS.len())],
        "aqi": rng.gen_range(30..=200),
    })
}
