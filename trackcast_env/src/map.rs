//! Map capability surface.

use crate::error::EnvError;
use crate::types::{Bounds, LatLng, LayerId, MarkerIcon, PolylineStyle, PopupOptions};

/// Minimal set of map primitives the view engine draws with.
///
/// # Implementations
///
/// - **Browser**: a thin binding over the page's tile map widget
/// - **Headless**: `RecordingMap`, which keeps every live layer in memory
///
/// # Layer Lifecycle
///
/// ```text
/// create_* ──► LayerId ──► bind_popup / open_popup ──► remove_layer
/// ```
///
/// Every layer created through this trait is attached to the map immediately.
/// A handle is dead once passed to `remove_layer`.
pub trait MapSurface: Send + 'static {
    /// Draws a polyline through `points` in order.
    fn create_polyline(&mut self, points: &[LatLng], style: &PolylineStyle) -> Result<LayerId, EnvError>;

    /// Places a marker at `at`.
    fn create_marker(&mut self, at: LatLng, icon: &MarkerIcon) -> Result<LayerId, EnvError>;

    /// Attaches a popup body to an existing marker.
    fn bind_popup(&mut self, layer: LayerId, html: &str, options: PopupOptions) -> Result<(), EnvError>;

    /// Opens the popup bound to `layer`.
    fn open_popup(&mut self, layer: LayerId) -> Result<(), EnvError>;

    /// Removes a layer from the map.
    ///
    /// # Returns
    /// * `Ok(())` - The layer was removed
    /// * `Err(EnvError::UnknownLayer)` - The handle was never issued or is already gone
    fn remove_layer(&mut self, layer: LayerId) -> Result<(), EnvError>;

    /// Moves the viewport so that `bounds` is fully visible.
    fn fit_bounds(&mut self, bounds: Bounds);

    /// Centers the viewport at `center` with the given zoom level.
    fn set_view(&mut self, center: LatLng, zoom: u8);
}
