//! Calendar lookup tool.
//!
//! There is no calendar backend yet, so every lookup reports an empty slot.
//! The tool still checks its inputs so the model gets useful feedback when it
//! sends a malformed date.

use async_trait::async_trait;
use chrono::NaiveDate;
use palaver_core::error::ToolError;
use palaver_core::message::ToolArguments;
use palaver_core::tool::{ParamType, ParameterSchema, Tool};

/// Date format the model is asked to use.
pub const DATE_FORMAT: &str = "%m/%d/%y";

pub struct CalendarTool;

#[async_trait]
impl Tool for CalendarTool {
    fn name(&self) -> &str {
        "GetCalendar"
    }

    fn description(&self) -> &str {
        "Returns the user's calendar events for the given day"
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .required_property("date", ParamType::String, "The date to search for in the format MM/DD/YY")
            .property("hour", ParamType::String, "The hour of the day to search for in 24h format")
    }

    async fn invoke(&self, arguments: &ToolArguments) -> Result<String, ToolError> {
        let date = arguments
            .get("date")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'date' argument".into()))?;

        let day = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT).map_err(|_| {
            ToolError::InvalidArguments(format!("date '{date}' is not in MM/DD/YY format"))
        })?;

        let hour = match arguments.get("hour").and_then(|v| v.as_str()) {
            Some(raw) => Some(parse_hour(raw)?),
            None => None,
        };

        tracing::debug!(%day, ?hour, "Calendar lookup");

        let date = day.format(DATE_FORMAT);
        Ok(match hour {
            Some(h) => format!("Sorry, no events for day {date}, hour {h:02}"),
            None => format!("Sorry, no events for day {date}"),
        })
    }
}

/// Accepts "14", "14h" and "14:00".
fn parse_hour(raw: &str) -> Result<u32, ToolError> {
    let trimmed = raw.trim();
    let digits = trimmed
        .split([':', 'h', 'H'])
        .next()
        .unwrap_or(trimmed);
    match digits.parse::<u32>() {
        Ok(h) if h < 24 => Ok(h),
        _ => Err(ToolError::InvalidArguments(format!(
            "hour '{raw}' is not an hour between 0 and 23"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: serde_json::Value) -> ToolArguments {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn date_only() {
        let out = CalendarTool.invoke(&args(json!({"date": "03/14/26"}))).await.unwrap();
        assert_eq!(out, "Sorry, no events for day 03/14/26");
    }

    #[tokio::test]
    async fn date_and_hour() {
        let out = CalendarTool
            .invoke(&args(json!({"date": "03/14/26", "hour": "9"})))
            .await
            .unwrap();
        assert_eq!(out, "Sorry, no events for day 03/14/26, hour 09");
    }

    #[tokio::test]
    async fn hour_with_minutes() {
        let out = CalendarTool
            .invoke(&args(json!({"date": "12/01/25", "hour": "14:30"})))
            .await
            .unwrap();
        assert!(out.ends_with("hour 14"));
    }

    #[tokio::test]
    async fn malformed_date_rejected() {
        let err = CalendarTool
            .invoke(&args(json!({"date": "2026-03-14"})))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(ref m) if m.contains("MM/DD/YY")));
    }

    #[tokio::test]
    async fn out_of_range_hour_rejected() {
        let err = CalendarTool
            .invoke(&args(json!({"date": "03/14/26", "hour": "25"})))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[test]
    fn schema_requires_date_only() {
        let schema = CalendarTool.schema();
        assert_eq!(schema.required, vec!["date".to_string()]);
        assert_eq!(schema.properties.len(), 2);
    }
}
