//! Route Renderer - track points to polyline, endpoints and direction arrows.

use tracing::{debug, warn};
use trackcast_env::{LayerId, MapSurface, MarkerIcon};

use crate::config::ViewConfig;
use crate::error::ViewError;
use crate::geometry::{bearing_degrees, direction_stride, sample_indices, to_polyline};
use crate::model::TrackPoint;
use crate::registry::RouteOverlay;

/// Draws a route onto `map` and returns its handles.
///
/// The registry is not touched; the caller sequences clear-then-set. If the
/// surface fails part way, every layer drawn by this call is removed again.
pub fn render_route<M: MapSurface + ?Sized>(
    map: &mut M,
    points: &[TrackPoint],
    config: &ViewConfig,
) -> Result<RouteOverlay, ViewError> {
    if points.is_empty() {
        return Err(ViewError::EmptyRoute);
    }

    let mut created = Vec::new();
    match draw(map, points, config, &mut created) {
        Ok(overlay) => {
            debug!(
                "rendered route: {} points, {} direction markers",
                points.len(),
                overlay.direction_markers.len()
            );
            Ok(overlay)
        }
        Err(e) => {
            rollback(map, &created);
            Err(e)
        }
    }
}

fn draw<M: MapSurface + ?Sized>(
    map: &mut M,
    points: &[TrackPoint],
    config: &ViewConfig,
    created: &mut Vec<LayerId>,
) -> Result<RouteOverlay, ViewError> {
    let polyline = map.create_polyline(&to_polyline(points), &config.route_style)?;
    created.push(polyline);

    let stride = direction_stride(points.len(), config.direction_marker_target);
    let mut direction_markers = Vec::new();
    for i in sample_indices(points.len(), stride) {
        let here = points[i].position();
        let icon = MarkerIcon::Direction {
            rotation_deg: bearing_degrees(here, points[i + 1].position()),
            label: i + 1,
        };
        let marker = map.create_marker(here, &icon)?;
        created.push(marker);
        direction_markers.push(marker);
    }

    let endpoint = MarkerIcon::Endpoint {
        color: config.endpoint_color.clone(),
        radius: config.endpoint_radius,
    };
    let start_marker = map.create_marker(points[0].position(), &endpoint)?;
    created.push(start_marker);
    let end_marker = map.create_marker(points[points.len() - 1].position(), &endpoint)?;
    created.push(end_marker);

    Ok(RouteOverlay {
        polyline,
        start_marker,
        end_marker,
        direction_markers,
    })
}

/// Removes layers drawn by a failed render call.
pub(crate) fn rollback<M: MapSurface + ?Sized>(map: &mut M, created: &[LayerId]) {
    for layer in created {
        if let Err(e) = map.remove_layer(*layer) {
            warn!("rollback of {}: {}", layer, e);
        }
    }
}
