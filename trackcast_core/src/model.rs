//! Track and weather data as delivered by the server.
//!
//! Field names follow the wire format; camelCase aliases are accepted.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use trackcast_env::LatLng;

use crate::error::ViewError;

/// One GPS sample of a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    /// Position in the route, starting at 0
    pub index: usize,

    #[serde(alias = "latitude")]
    pub lat: f64,

    #[serde(alias = "longitude")]
    pub lon: f64,

    /// Elevation in meters
    #[serde(alias = "elevation", default)]
    pub ele: f64,

    #[serde(alias = "timestamp", default, deserialize_with = "timestamp::deserialize_opt")]
    pub time: Option<DateTime<Utc>>,
}

impl TrackPoint {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lon)
    }
}

/// A single weather observation or forecast. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherSample {
    /// °C
    #[serde(default)]
    pub temperature: Option<f64>,

    /// mm
    #[serde(default)]
    pub precipitation: Option<f64>,

    /// %
    #[serde(default, alias = "precipitationProbability")]
    pub precipitation_probability: Option<f64>,

    /// m/s
    #[serde(default, alias = "windSpeed")]
    pub wind_speed: Option<f64>,

    /// Degrees clockwise from north
    #[serde(default, alias = "windDirection")]
    pub wind_direction: Option<f64>,

    /// %
    #[serde(default, alias = "cloudCover")]
    pub cloud_cover: Option<f64>,

    #[serde(default, alias = "conditionIcon")]
    pub icon: Option<String>,
}

impl WeatherSample {
    /// Wind direction, rejected when outside `[0, 360]`.
    pub fn checked_wind_direction(&self) -> Result<Option<f64>, ViewError> {
        match self.wind_direction {
            Some(deg) if !(0.0..=360.0).contains(&deg) => Err(ViewError::OutOfRangeWindDirection(deg)),
            other => Ok(other),
        }
    }
}

/// Station metadata for a sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherSource {
    #[serde(default)]
    pub id: Option<u64>,

    #[serde(default)]
    pub station_name: Option<String>,

    #[serde(default)]
    pub observation_type: Option<String>,

    /// Distance from the requested point, in meters
    #[serde(default)]
    pub distance: Option<f64>,
}

/// A sample together with where it came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    #[serde(rename = "weather", alias = "sample")]
    pub sample: WeatherSample,

    #[serde(default)]
    pub source: WeatherSource,
}

/// A track point that may carry weather.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherTrackPoint {
    pub index: usize,

    pub point: LatLng,

    #[serde(default, alias = "elevation")]
    pub ele: Option<f64>,

    /// Time the route is expected to pass this point
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub date: DateTime<Utc>,

    #[serde(rename = "weather_point?", alias = "isWeatherPoint", alias = "is_weather_point", default)]
    pub is_weather_point: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<Weather>,
}

impl WeatherTrackPoint {
    /// The single eligibility predicate used by both map and chart.
    pub fn is_eligible(&self) -> bool {
        self.is_weather_point && self.weather.is_some()
    }

    /// The sample of an eligible point.
    pub fn sample(&self) -> Option<&WeatherSample> {
        if !self.is_weather_point {
            return None;
        }
        self.weather.as_ref().map(|w| &w.sample)
    }
}

/// Returns the weather-eligible points in their original order.
pub fn eligible_weather_points(points: &[WeatherTrackPoint]) -> Vec<&WeatherTrackPoint> {
    points.iter().filter(|p| p.is_eligible()).collect()
}

/// Which quantity family the chart shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Temperature,
    Precipitation,
    Wind,
}

impl DisplayMode {
    pub const ALL: [DisplayMode; 3] = [DisplayMode::Temperature, DisplayMode::Precipitation, DisplayMode::Wind];

    /// Human-readable label used for chart titles and the mode picker.
    pub fn label(&self) -> &'static str {
        match self {
            DisplayMode::Temperature => "Temperature",
            DisplayMode::Precipitation => "Precipitation",
            DisplayMode::Wind => "Wind",
        }
    }
}

impl std::fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for DisplayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "temperature" => Ok(DisplayMode::Temperature),
            "precipitation" => Ok(DisplayMode::Precipitation),
            "wind" => Ok(DisplayMode::Wind),
            other => Err(format!("unknown display mode: {}", other)),
        }
    }
}

/// ISO-8601 timestamps as servers send them, with or without a UTC offset.
///
/// Offset-less values are read as UTC.
pub(crate) mod timestamp {
    use super::*;

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| naive.and_utc())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw)))
    }

    pub fn deserialize_opt<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => parse(&raw)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(index: usize, flagged: bool, with_weather: bool) -> WeatherTrackPoint {
        WeatherTrackPoint {
            index,
            point: LatLng::new(52.0, 7.0),
            ele: None,
            date: DateTime::parse_from_rfc3339("2024-06-01T08:00:00Z").unwrap().with_timezone(&Utc),
            is_weather_point: flagged,
            weather: with_weather.then(Weather::default),
        }
    }

    #[test]
    fn test_eligibility_requires_flag_and_weather() {
        assert!(point(0, true, true).is_eligible());
        assert!(!point(0, true, false).is_eligible());
        assert!(!point(0, false, true).is_eligible());
    }

    #[test]
    fn test_eligible_points_preserve_order() {
        let points = vec![
            point(0, false, false),
            point(1, true, true),
            point(2, true, false),
            point(3, true, true),
            point(4, false, true),
        ];
        let indices: Vec<usize> = eligible_weather_points(&points).iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![1, 3]);
    }

    #[test]
    fn test_wind_direction_range() {
        let mut sample = WeatherSample::default();
        assert_eq!(sample.checked_wind_direction().unwrap(), None);

        sample.wind_direction = Some(360.0);
        assert_eq!(sample.checked_wind_direction().unwrap(), Some(360.0));

        sample.wind_direction = Some(400.0);
        assert!(matches!(
            sample.checked_wind_direction(),
            Err(ViewError::OutOfRangeWindDirection(d)) if d == 400.0
        ));
    }

    #[test]
    fn test_weather_point_wire_format() {
        let json = r#"{
            "index": 3,
            "point": {"lat": 52.1, "lon": 7.1},
            "date": "2024-06-01T10:00:00+02:00",
            "weather_point?": true,
            "weather": {
                "weather": {"temperature": 18.5, "precipitation_probability": null, "icon": "cloudy"},
                "source": {"station_name": "Münster/Osnabrück"}
            }
        }"#;
        let p: WeatherTrackPoint = serde_json::from_str(json).unwrap();
        assert!(p.is_eligible());
        let sample = p.sample().unwrap();
        assert_eq!(sample.temperature, Some(18.5));
        assert_eq!(sample.precipitation_probability, None);
        assert_eq!(p.date.to_rfc3339(), "2024-06-01T08:00:00+00:00");
    }

    #[test]
    fn test_timestamps_without_offset_read_as_utc() {
        let json = r#"{"index": 0, "point": {"lat": 52.0, "lon": 7.0}, "date": "2024-06-01T08:00:00"}"#;
        let p: WeatherTrackPoint = serde_json::from_str(json).unwrap();
        assert_eq!(p.date.to_rfc3339(), "2024-06-01T08:00:00+00:00");

        let t: TrackPoint =
            serde_json::from_str(r#"{"index": 0, "lat": 52.0, "lon": 7.0, "time": "2024-06-01T08:00:00.500"}"#).unwrap();
        assert_eq!(t.time.map(|t| t.timestamp_millis() % 1000), Some(500));

        let none: TrackPoint = serde_json::from_str(r#"{"index": 0, "lat": 52.0, "lon": 7.0, "time": null}"#).unwrap();
        assert_eq!(none.time, None);

        assert!(timestamp::parse("yesterday").is_none());
    }

    #[test]
    fn test_display_mode_parse() {
        assert_eq!("Wind".parse::<DisplayMode>().unwrap(), DisplayMode::Wind);
        assert!("humidity".parse::<DisplayMode>().is_err());
        let mode: DisplayMode = serde_json::from_str("\"precipitation\"").unwrap();
        assert_eq!(mode, DisplayMode::Precipitation);
    }
}
