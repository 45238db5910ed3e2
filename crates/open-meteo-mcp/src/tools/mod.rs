//! The fixed capability registry served by this process.

use std::sync::Arc;

use crate::{
    toolset::{ToolSet, ToolSetError},
    weather::WeatherClient,
};

pub mod weather;

pub use weather::GET_CURRENT_WEATHER;

/// Build the registry in its fixed registration order.
pub fn weather_toolset(client: Arc<WeatherClient>) -> Result<ToolSet, ToolSetError> {
    let builder = ToolSet::builder();
    let builder = weather::register(builder, client)?;
    Ok(builder.build())
}
