//! Current time tool: lets the model resolve "today" and "tomorrow".

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone};
use palaver_core::error::ToolError;
use palaver_core::message::ToolArguments;
use palaver_core::tool::{ParamType, ParameterSchema, Tool};

pub struct CurrentTimeTool;

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &str {
        "CurrentTime"
    }

    fn description(&self) -> &str {
        "Returns the current local date and time. Dates use the MM/DD/YY format."
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new().property(
            "include_weekday",
            ParamType::Boolean,
            "Whether to include the day of the week",
        )
    }

    async fn invoke(&self, arguments: &ToolArguments) -> Result<String, ToolError> {
        let weekday = arguments
            .get("include_weekday")
            .and_then(|v| v.as_bool())
            .unwrap_or(true);
        Ok(describe(&Local::now(), weekday))
    }
}

fn describe<Tz: TimeZone>(now: &DateTime<Tz>, weekday: bool) -> String
where
    Tz::Offset: std::fmt::Display,
{
    if weekday {
        now.format("%A %m/%d/%y %H:%M").to_string()
    } else {
        now.format("%m/%d/%y %H:%M").to_string()
    }
}
