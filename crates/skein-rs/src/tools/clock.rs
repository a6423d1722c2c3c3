//! The `get_current_time` tool: timezone-aware date and time lookup.

use crate::ToolDef;
use crate::tools::core::{Tool, ToolFuture};
use crate::tools::spec::ToolSpec;
use chrono::Utc;
use chrono_tz::Tz;
use schemars::JsonSchema;
use serde::Deserialize;
use std::str::FromStr;

/// City aliases for callers that pass a city instead of an IANA zone name.
const CITY_ALIASES: &[(&str, &str)] = &[
    ("beijing", "Asia/Shanghai"),
    ("shanghai", "Asia/Shanghai"),
    ("tokyo", "Asia/Tokyo"),
    ("new york", "America/New_York"),
    ("london", "Europe/London"),
    ("paris", "Europe/Paris"),
    ("sydney", "Australia/Sydney"),
    ("los angeles", "America/Los_Angeles"),
];

/// Output format for the time string.
#[derive(Deserialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimeFormat {
    #[default]
    Full,
    DateOnly,
    TimeOnly,
}

/// Typed arguments for the `get_current_time` tool.
#[derive(Deserialize, JsonSchema)]
pub struct TimeArgs {
    /// IANA timezone like 'Asia/Shanghai' or 'America/New_York', or a city
    /// name like 'tokyo'. Defaults to UTC.
    #[serde(default)]
    pub timezone: Option<String>,
    /// Output format; defaults to 'full'.
    #[serde(default)]
    pub format: Option<TimeFormat>,
}

/// Current date/time tool.
pub struct Clock;

impl Tool for Clock {
    fn definition(&self) -> ToolDef {
        ToolSpec::builder("get_current_time")
            .purpose("Get the current date and time, optionally in a specific timezone")
            .when_to_use("When the user asks for the time, the date, or a timezone conversion")
            .when_not_to_use("For historical dates or date arithmetic; this only reads the clock")
            .parameters_for::<TimeArgs>()
            .example(
                "get_current_time(timezone='Asia/Tokyo')",
                "current date and time in Tokyo",
            )
            .output_format(
                "JSON: {success, data: {datetime, timezone, timestamp, weekday}} \
                 or {success: false, error}",
            )
            .to_tool_def()
    }

    fn execute(&self, arguments: &str) -> ToolFuture<'_> {
        let arguments = arguments.to_string();
        Box::pin(async move {
            let args: TimeArgs = match crate::tools::core::parse_tool_args(&arguments) {
                Ok(a) => a,
                Err(e) => return e,
            };

            let tz = match resolve_timezone(args.timezone.as_deref()) {
                Ok(tz) => tz,
                Err(e) => {
                    return serde_json::json!({ "success": false, "error": e }).to_string();
                }
            };

            let now = Utc::now().with_timezone(&tz);
            let datetime = match args.format.unwrap_or_default() {
                TimeFormat::Full => now.format("%Y-%m-%d %H:%M:%S").to_string(),
                TimeFormat::DateOnly => now.format("%Y-%m-%d").to_string(),
                TimeFormat::TimeOnly => now.format("%H:%M:%S").to_string(),
            };

            serde_json::json!({
                "success": true,
                "data": {
                    "datetime": datetime,
                    "timezone": tz.name(),
                    "timestamp": now.timestamp(),
                    "weekday": now.format("%A").to_string(),
                },
            })
            .to_string()
        })
    }
}

/// Resolve an IANA zone name or a known city alias. `None` means UTC.
pub fn resolve_timezone(name: Option<&str>) -> Result<Tz, String> {
    let Some(name) = name else {
        return Ok(Tz::UTC);
    };

    if let Ok(tz) = Tz::from_str(name) {
        return Ok(tz);
    }

    let lowered = name.to_lowercase();
    if let Some((_, zone)) = CITY_ALIASES.iter().find(|(city, _)| *city == lowered) {
        return Tz::from_str(zone).map_err(|e| format!("bad alias table entry: {e}"));
    }

    Err(format!(
        "unknown timezone '{name}': use an IANA name like 'Europe/London' or a known city"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_iana_names_and_aliases() {
        assert_eq!(resolve_timezone(None).unwrap(), Tz::UTC);
        assert_eq!(
            resolve_timezone(Some("Asia/Shanghai")).unwrap().name(),
            "Asia/Shanghai"
        );
        assert_eq!(
            resolve_timezone(Some("Tokyo")).unwrap().name(),
            "Asia/Tokyo"
        );
        assert_eq!(
            resolve_timezone(Some("new york")).unwrap().name(),
            "America/New_York"
        );
    }

    #[test]
    fn unknown_timezone_is_an_error() {
        let err = resolve_timezone(Some("atlantis")).unwrap_err();
        assert!(err.contains("unknown timezone"));
    }

    #[tokio::test]
    async fn full_format_includes_date_and_time() {
        let result = Clock.execute(r#"{"timezone": "Europe/Paris"}"#).await;
        let parsed: serde_json::Value = serde_json::from_str(&result).unwrap();
        assert_eq!(parsed["success"], true);
        assert_eq!(parsed["data"]["timezone"], "Europe/Paris");
        let datetime = parsed["data"]["datetime"].as_str().unwrap();
        assert_eq!(datetime.len(), "2026-01-01 00:00:00".len());
    }

    #[tokio::test]
    async fn time_only_format() {
        let result = Clock.execute(r#"{"format": "time_only"}"#).await;
        let parsed: serde_json::Value = serde_json::from_str(&result).unwrap();
        let datetime = parsed["data"]["datetime"].as_str().unwrap();
        assert_eq!(datetime.len(), "00:00:00".len());
    }

    #[tokio::test]
    async fn bad_timezone_reports_error() {
        let result = Clock.execute(r#"{"timezone": "Mars/Olympus"}"#).await;
        let parsed: serde_json::Value = serde_json::from_str(&result).unwrap();
        assert_eq!(parsed["success"], false);
    }
}
