//! Decoding and validation of server pushes.
//!
//! Payloads are checked here, at the boundary, so renderers only ever see
//! well-formed coordinates and consistently indexed tracks.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use trackcast_env::{LatLng, PushEnvelope};

use crate::error::PayloadError;
use crate::model::{timestamp, DisplayMode, TrackPoint, WeatherTrackPoint};

pub const EVENT_INIT: &str = "map:init";
pub const EVENT_ROUTE_UPDATE: &str = "map:drawGpxFileUpdate";
pub const EVENT_WEATHER_UPDATE: &str = "map:drawWeatherUpdate";

const MAX_ZOOM: f64 = 22.0;

/// Initial map view plus the first route.
#[derive(Debug, Clone, PartialEq)]
pub struct InitPayload {
    pub center: LatLng,
    pub zoom: u8,
    pub points: Vec<TrackPoint>,
}

/// A replacement route.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteUpdatePayload {
    pub points: Vec<TrackPoint>,
}

/// Weather along the route, optionally with a display mode for the chart.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherUpdatePayload {
    pub points: Vec<WeatherTrackPoint>,
    pub mode: Option<DisplayMode>,
}

/// A validated server push.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    Init(InitPayload),
    RouteUpdate(RouteUpdatePayload),
    WeatherUpdate(WeatherUpdatePayload),
}

impl PushEvent {
    /// Canonical wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            PushEvent::Init(_) => EVENT_INIT,
            PushEvent::RouteUpdate(_) => EVENT_ROUTE_UPDATE,
            PushEvent::WeatherUpdate(_) => EVENT_WEATHER_UPDATE,
        }
    }

    /// Decodes and validates an envelope.
    pub fn decode(envelope: &PushEnvelope) -> Result<Self, PayloadError> {
        let event = envelope.event.as_str();
        let malformed = |source: serde_json::Error| PayloadError::Malformed {
            event: event.to_string(),
            source,
        };

        match event {
            EVENT_INIT | "init" => {
                let wire: WireInit = serde_json::from_slice(&envelope.payload).map_err(malformed)?;
                let center = LatLng::new(wire.initial.lat, wire.initial.lon);
                validate_coordinate(0, center)?;
                if !wire.initial.zoom.is_finite() || !(0.0..=MAX_ZOOM).contains(&wire.initial.zoom) {
                    return Err(PayloadError::InvalidZoom(wire.initial.zoom));
                }
                Ok(PushEvent::Init(InitPayload {
                    center,
                    zoom: wire.initial.zoom.round() as u8,
                    points: validate_track(wire.points)?,
                }))
            }
            EVENT_ROUTE_UPDATE | "routeUpdate" => {
                let wire: WireRouteUpdate = serde_json::from_slice(&envelope.payload).map_err(malformed)?;
                Ok(PushEvent::RouteUpdate(RouteUpdatePayload {
                    points: validate_track(wire.points)?,
                }))
            }
            EVENT_WEATHER_UPDATE | "chart:drawWeatherUpdate" | "weatherUpdate" => {
                let wire: WireWeatherUpdate = serde_json::from_slice(&envelope.payload).map_err(malformed)?;
                for p in &wire.points {
                    validate_coordinate(p.index, p.point)?;
                }
                Ok(PushEvent::WeatherUpdate(WeatherUpdatePayload {
                    points: wire.points,
                    mode: wire.mode,
                }))
            }
            other => Err(PayloadError::UnknownEvent(other.to_string())),
        }
    }

    /// Encodes the event back into its wire envelope.
    pub fn encode(&self) -> Result<PushEnvelope, serde_json::Error> {
        let value = match self {
            PushEvent::Init(p) => json!({
                "initial": { "lat": p.center.lat, "lon": p.center.lon, "zoom": p.zoom },
                "points": p.points,
            }),
            PushEvent::RouteUpdate(p) => json!({ "points": p.points }),
            PushEvent::WeatherUpdate(p) => match p.mode {
                Some(mode) => json!({ "points": p.points, "mode": mode }),
                None => json!({ "points": p.points }),
            },
        };
        Ok(PushEnvelope::new(self.name(), serde_json::to_vec(&value)?))
    }
}

#[derive(Deserialize)]
struct WireView {
    lat: f64,
    lon: f64,
    zoom: f64,
}

#[derive(Deserialize)]
struct WireInit {
    #[serde(alias = "center")]
    initial: WireView,
    points: Vec<WireTrackPoint>,
}

#[derive(Deserialize)]
struct WireRouteUpdate {
    points: Vec<WireTrackPoint>,
}

#[derive(Deserialize)]
struct WireWeatherUpdate {
    points: Vec<WeatherTrackPoint>,
    #[serde(default)]
    mode: Option<DisplayMode>,
}

/// GPX exports often omit the index; it is filled in from the position.
#[derive(Deserialize)]
struct WireTrackPoint {
    #[serde(default)]
    index: Option<usize>,
    #[serde(alias = "latitude")]
    lat: f64,
    #[serde(alias = "longitude")]
    lon: f64,
    #[serde(alias = "elevation", default)]
    ele: f64,
    #[serde(alias = "timestamp", default, deserialize_with = "timestamp::deserialize_opt")]
    time: Option<DateTime<Utc>>,
}

fn validate_coordinate(index: usize, p: LatLng) -> Result<(), PayloadError> {
    let valid = p.lat.is_finite()
        && p.lon.is_finite()
        && (-90.0..=90.0).contains(&p.lat)
        && (-180.0..=180.0).contains(&p.lon);
    if valid {
        Ok(())
    } else {
        Err(PayloadError::InvalidCoordinate {
            index,
            lat: p.lat,
            lon: p.lon,
        })
    }
}

fn validate_track(points: Vec<WireTrackPoint>) -> Result<Vec<TrackPoint>, PayloadError> {
    points
        .into_iter()
        .enumerate()
        .map(|(position, wire)| {
            if let Some(index) = wire.index {
                if index != position {
                    return Err(PayloadError::IndexMismatch { position, index });
                }
            }
            validate_coordinate(position, LatLng::new(wire.lat, wire.lon))?;
            Ok(TrackPoint {
                index: position,
                lat: wire.lat,
                lon: wire.lon,
                ele: if wire.ele.is_finite() { wire.ele } else { 0.0 },
                time: wire.time,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(event: &str, body: &str) -> PushEnvelope {
        PushEnvelope::new(event, body.as_bytes().to_vec())
    }

    #[test]
    fn test_decode_init_without_indices() {
        let body = r#"{
            "initial": {"lat": 52.0, "lon": 7.0, "zoom": 10},
            "points": [
                {"lat": 52.0, "lon": 7.0, "ele": 60.0, "time": "2024-06-01T08:00:00Z"},
                {"lat": 52.1, "lon": 7.1, "ele": 61.0, "time": "2024-06-01T08:10:00Z"}
            ]
        }"#;
        let event = PushEvent::decode(&envelope("map:init", body)).unwrap();
        match event {
            PushEvent::Init(init) => {
                assert_eq!(init.zoom, 10);
                assert_eq!(init.points.len(), 2);
                assert_eq!(init.points[1].index, 1);
                assert!(init.points[0].time.is_some());
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_decode_accepts_long_field_names() {
        let body = r#"{
            "center": {"lat": 52.0, "lon": 7.0, "zoom": 10},
            "points": [{"index": 0, "latitude": 52.0, "longitude": 7.0, "elevation": 3.5,
                        "timestamp": "2024-06-01T08:00:00Z"}]
        }"#;
        let event = PushEvent::decode(&envelope("init", body)).unwrap();
        assert_eq!(event.name(), EVENT_INIT);
    }

    #[test]
    fn test_route_update_accepts_offsetless_time() {
        let body = r#"{"points": [{"index": 0, "lat": 52.0, "lon": 7.0, "time": "2024-06-01T08:00:00"}]}"#;
        match PushEvent::decode(&envelope("map:drawGpxFileUpdate", body)).unwrap() {
            PushEvent::RouteUpdate(update) => {
                let time = update.points[0].time.unwrap();
                assert_eq!(time.to_rfc3339(), "2024-06-01T08:00:00+00:00");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_weather_update_accepts_offsetless_date() {
        let body = r#"{"points": [{"index": 0, "point": {"lat": 52.0, "lon": 7.0},
                        "date": "2024-06-01T08:00:00", "weather_point?": false}]}"#;
        match PushEvent::decode(&envelope("map:drawWeatherUpdate", body)).unwrap() {
            PushEvent::WeatherUpdate(update) => {
                assert_eq!(update.points[0].date.to_rfc3339(), "2024-06-01T08:00:00+00:00");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unparseable_time() {
        let body = r#"{"points": [{"lat": 52.0, "lon": 7.0, "time": "soon"}]}"#;
        let err = PushEvent::decode(&envelope("routeUpdate", body)).unwrap_err();
        assert!(matches!(err, PayloadError::Malformed { .. }));
    }

    #[test]
    fn test_rejects_index_mismatch() {
        let body = r#"{"points": [{"index": 0, "lat": 1.0, "lon": 1.0}, {"index": 5, "lat": 1.0, "lon": 1.0}]}"#;
        let err = PushEvent::decode(&envelope("map:drawGpxFileUpdate", body)).unwrap_err();
        assert!(matches!(err, PayloadError::IndexMismatch { position: 1, index: 5 }));
    }

    #[test]
    fn test_rejects_out_of_range_coordinate() {
        let body = r#"{"points": [{"lat": 95.0, "lon": 1.0}]}"#;
        let err = PushEvent::decode(&envelope("routeUpdate", body)).unwrap_err();
        assert!(matches!(err, PayloadError::InvalidCoordinate { index: 0, .. }));
    }

    #[test]
    fn test_rejects_bad_zoom() {
        let body = r#"{"initial": {"lat": 52.0, "lon": 7.0, "zoom": 40}, "points": []}"#;
        let err = PushEvent::decode(&envelope("map:init", body)).unwrap_err();
        assert!(matches!(err, PayloadError::InvalidZoom(z) if z == 40.0));
    }

    #[test]
    fn test_rejects_unknown_and_malformed() {
        assert!(matches!(
            PushEvent::decode(&envelope("map:explode", "{}")),
            Err(PayloadError::UnknownEvent(_))
        ));
        assert!(matches!(
            PushEvent::decode(&envelope("map:drawWeatherUpdate", "{\"points\": 3}")),
            Err(PayloadError::Malformed { .. })
        ));
    }

    #[test]
    fn test_weather_update_with_mode() {
        let body = r#"{"points": [], "mode": "wind"}"#;
        let event = PushEvent::decode(&envelope("chart:drawWeatherUpdate", body)).unwrap();
        assert_eq!(
            event,
            PushEvent::WeatherUpdate(WeatherUpdatePayload {
                points: Vec::new(),
                mode: Some(DisplayMode::Wind),
            })
        );
    }

    #[test]
    fn test_encode_then_decode_init() {
        let event = PushEvent::Init(InitPayload {
            center: LatLng::new(52.0, 7.0),
            zoom: 10,
            points: vec![TrackPoint {
                index: 0,
                lat: 52.0,
                lon: 7.0,
                ele: 0.0,
                time: None,
            }],
        });
        let decoded = PushEvent::decode(&event.encode().unwrap()).unwrap();
        assert_eq!(decoded, event);
    }
}
