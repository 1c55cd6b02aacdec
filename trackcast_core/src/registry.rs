//! Overlay Registry - the single owner of every live map handle.
//!
//! Each overlay family (route, weather markers) has its own slot. A new
//! generation can only be stored into an empty slot, so callers have to run
//! the matching `clear_*` first:
//!
//! ```text
//! clear_route(map) ──► render_route(map, points) ──► set_route(overlay)
//! ```
//!
//! Clearing is idempotent and never fails; a handle the surface no longer
//! knows about is logged and skipped.

use tracing::{debug, warn};
use trackcast_env::{LayerId, MapSurface};

use crate::error::{OverlayFamily, ViewError};

/// Handles making up one rendered route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteOverlay {
    pub polyline: LayerId,
    pub start_marker: LayerId,
    pub end_marker: LayerId,
    pub direction_markers: Vec<LayerId>,
}

impl RouteOverlay {
    /// Every handle in the overlay.
    pub fn layers(&self) -> impl Iterator<Item = LayerId> + '_ {
        [self.polyline, self.start_marker, self.end_marker]
            .into_iter()
            .chain(self.direction_markers.iter().copied())
    }

    pub fn layer_count(&self) -> usize {
        3 + self.direction_markers.len()
    }
}

/// Current generation of each overlay family.
#[derive(Debug, Default)]
pub struct OverlayRegistry {
    route: Option<RouteOverlay>,
    weather_markers: Vec<LayerId>,
}

impl OverlayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self) -> Option<&RouteOverlay> {
        self.route.as_ref()
    }

    /// Weather markers, indexed like the filtered weather-point sequence.
    pub fn weather_markers(&self) -> &[LayerId] {
        &self.weather_markers
    }

    /// Removes the route polyline, endpoints and direction markers.
    ///
    /// Returns the number of layers removed from the surface.
    pub fn clear_route<M: MapSurface + ?Sized>(&mut self, map: &mut M) -> usize {
        let Some(route) = self.route.take() else {
            return 0;
        };
        let removed = remove_all(map, route.layers(), OverlayFamily::Route);
        debug!("cleared route ({} layers)", removed);
        removed
    }

    /// Removes every weather marker.
    ///
    /// Returns the number of layers removed from the surface.
    pub fn clear_weather_markers<M: MapSurface + ?Sized>(&mut self, map: &mut M) -> usize {
        if self.weather_markers.is_empty() {
            return 0;
        }
        let markers = std::mem::take(&mut self.weather_markers);
        let removed = remove_all(map, markers.into_iter(), OverlayFamily::WeatherMarkers);
        debug!("cleared weather markers ({} layers)", removed);
        removed
    }

    /// Stores a freshly rendered route. The slot must be empty.
    pub fn set_route(&mut self, overlay: RouteOverlay) -> Result<(), ViewError> {
        if self.route.is_some() {
            return Err(ViewError::OverlayNotCleared(OverlayFamily::Route));
        }
        self.route = Some(overlay);
        Ok(())
    }

    /// Stores a freshly rendered marker set. The slot must be empty.
    pub fn set_weather_markers(&mut self, markers: Vec<LayerId>) -> Result<(), ViewError> {
        if !self.weather_markers.is_empty() {
            return Err(ViewError::OverlayNotCleared(OverlayFamily::WeatherMarkers));
        }
        self.weather_markers = markers;
        Ok(())
    }

    /// Opens the popup of the `index`-th weather marker.
    pub fn open_weather_popup<M: MapSurface + ?Sized>(&self, map: &mut M, index: usize) -> Result<(), ViewError> {
        let marker = self
            .weather_markers
            .get(index)
            .ok_or(ViewError::StaleIndexReference {
                index,
                len: self.weather_markers.len(),
            })?;
        map.open_popup(*marker)?;
        Ok(())
    }
}

fn remove_all<M: MapSurface + ?Sized>(
    map: &mut M,
    layers: impl Iterator<Item = LayerId>,
    family: OverlayFamily,
) -> usize {
    let mut removed = 0;
    for layer in layers {
        match map.remove_layer(layer) {
            Ok(()) => removed += 1,
            Err(e) => warn!("clearing {}: {}", family, e),
        }
    }
    removed
}
