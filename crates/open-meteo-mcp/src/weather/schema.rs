//! Open-Meteo payload shapes. Typed deserialization is the validation
//! step: a payload that does not fit these shapes is rejected as invalid.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodingResponse {
    #[serde(default)]
    pub results: Option<Vec<City>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub id: i64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub country_code: String,
    pub timezone: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub latitude: f64,
    pub longitude: f64,
    pub generationtime_ms: f64,
    pub utc_offset_seconds: i64,
    pub timezone: String,
    pub timezone_abbreviation: String,
    pub elevation: f64,
    pub hourly_units: HourlyUnits,
    pub hourly: HourlySeries,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyUnits {
    pub time: String,
    pub temperature_2m: String,
    pub rain: String,
    pub relative_humidity_2m: String,
    pub visibility: String,
    pub weather_code: String,
    pub precipitation: String,
    pub precipitation_probability: String,
    pub apparent_temperature: String,
    pub dew_point_2m: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlySeries {
    pub time: Vec<String>,
    pub temperature_2m: Vec<f64>,
    pub rain: Vec<f64>,
    pub relative_humidity_2m: Vec<f64>,
    pub visibility: Vec<f64>,
    pub weather_code: Vec<f64>,
    pub precipitation: Vec<f64>,
    pub precipitation_probability: Vec<f64>,
    pub apparent_temperature: Vec<f64>,
    pub dew_point_2m: Vec<f64>,
}

/// What `get_current_weather` returns: the matched city together with its
/// hourly forecast, serialized as pretty JSON text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub city: City,
    pub weather: Forecast,
}
