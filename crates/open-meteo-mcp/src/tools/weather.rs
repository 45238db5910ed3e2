//! The `get_current_weather` capability.

use std::sync::Arc;

use futures::FutureExt;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    model::{Content, JsonObject, Tool, schema_for_type},
    toolset::{ToolError, ToolSetBuilder, ToolSetError},
    weather::WeatherClient,
};

pub const GET_CURRENT_WEATHER: &str = "get_current_weather";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetCurrentWeatherArgs {
    /// The city to get the weather for
    pub city: String,
}

pub fn get_current_weather_tool() -> Tool {
    Tool::new(
        GET_CURRENT_WEATHER,
        "Get the current weather in a given location",
        schema_for_type::<GetCurrentWeatherArgs>(),
    )
}

fn parse_args(arguments: Option<JsonObject>) -> Result<GetCurrentWeatherArgs, ToolError> {
    serde_json::from_value(Value::Object(arguments.unwrap_or_default()))
        .map_err(|e| ToolError::InvalidParameters(e.to_string()))
}

/// Register the weather capability. The collaborator's result is returned
/// verbatim as pretty JSON; its failures become execution errors that the
/// engine folds into text results.
pub fn register(
    builder: ToolSetBuilder,
    client: Arc<WeatherClient>,
) -> Result<ToolSetBuilder, ToolSetError> {
    builder.register(get_current_weather_tool(), move |arguments| {
        let client = Arc::clone(&client);
        async move {
            let args = parse_args(arguments)?;
            let report = client
                .fetch_current(&args.city)
                .await
                .map_err(|e| ToolError::Execution(e.to_string()))?;
            let text = serde_json::to_string_pretty(&report)
                .map_err(|e| ToolError::Execution(e.to_string()))?;
            Ok(vec![Content::text(text)])
        }
        .boxed()
    })
}
