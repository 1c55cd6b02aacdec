//! Weather Overlay Renderer - one popup marker per weather-eligible point.

use chrono::FixedOffset;
use maud::{html, Markup};
use tracing::{debug, warn};
use trackcast_env::{LayerId, MapSurface, MarkerIcon};

use crate::config::ViewConfig;
use crate::error::ViewError;
use crate::model::{eligible_weather_points, WeatherSample, WeatherTrackPoint};
use crate::route::rollback;

/// Shown in place of any missing or rejected value.
pub const UNAVAILABLE: &str = "N/A";

const COMPASS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];

/// Draws a marker for every eligible point, in filtered order.
///
/// The returned handles are indexed exactly like `eligible_weather_points(points)`;
/// chart activation relies on that.
pub fn render_weather_markers<M: MapSurface + ?Sized>(
    map: &mut M,
    points: &[WeatherTrackPoint],
    config: &ViewConfig,
) -> Result<Vec<LayerId>, ViewError> {
    let eligible = eligible_weather_points(points);
    if eligible.is_empty() && config.require_weather_points {
        return Err(ViewError::NoWeatherData);
    }

    let offset = config.display_offset();
    let mut created = Vec::with_capacity(eligible.len());
    for point in &eligible {
        let result = map
            .create_marker(point.point, &MarkerIcon::Weather { label: point.index })
            .and_then(|marker| {
                created.push(marker);
                map.bind_popup(marker, &weather_popup(point, offset).into_string(), config.popup_options)
            });
        if let Err(e) = result {
            rollback(map, &created);
            return Err(e.into());
        }
    }

    debug!("rendered {} weather markers from {} points", created.len(), points.len());
    Ok(created)
}

/// Popup body for one weather point.
pub fn weather_popup(point: &WeatherTrackPoint, offset: FixedOffset) -> Markup {
    let empty = WeatherSample::default();
    let sample = point.sample().unwrap_or(&empty);
    let local = point.date.with_timezone(&offset);
    let station = point.weather.as_ref().and_then(|w| w.source.station_name.as_deref());

    html! {
        div class="weather-popup" {
            div class="headline" {
                (sample.icon.as_deref().unwrap_or("no icon available")) " " (maybe_number(sample.temperature)) "°C"
            }
            ul {
                li class="time" { (local.format("%d.%m.%Y %H:%M").to_string()) }
                li { (maybe_number(sample.precipitation_probability)) "% chance of rain" }
                li { (maybe_number(sample.precipitation)) "mm precipitation" }
                li { "Wind Direction: " (wind_direction_label(sample, point.index)) }
                li { (maybe_number(sample.wind_speed)) " m/s wind speed" }
                li { (maybe_number(sample.cloud_cover)) "% cloud cover" }
                @if let Some(station) = station {
                    li class="station" { (station) }
                }
            }
        }
    }
}

/// Formats an optional number, never substituting zero for a gap.
pub fn maybe_number(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => v.to_string(),
        _ => UNAVAILABLE.to_string(),
    }
}

/// Maps degrees onto an 8-point compass label.
pub fn compass_point(degrees: f64) -> &'static str {
    let sector = ((degrees % 360.0) / 45.0).round() as usize % COMPASS.len();
    COMPASS[sector]
}

fn wind_direction_label(sample: &WeatherSample, index: usize) -> &'static str {
    match sample.checked_wind_direction() {
        Ok(Some(deg)) => compass_point(deg),
        Ok(None) => UNAVAILABLE,
        Err(e) => {
            warn!("weather point {}: {}", index, e);
            UNAVAILABLE
        }
    }
}
