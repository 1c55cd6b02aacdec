//! Error types for the view engine.

use thiserror::Error;
use trackcast_env::EnvError;

/// The overlay family an operation concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayFamily {
    Route,
    WeatherMarkers,
    Chart,
}

impl std::fmt::Display for OverlayFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverlayFamily::Route => write!(f, "route"),
            OverlayFamily::WeatherMarkers => write!(f, "weather markers"),
            OverlayFamily::Chart => write!(f, "chart"),
        }
    }
}

/// Errors raised while rendering or synchronizing views.
#[derive(Debug, Error)]
pub enum ViewError {
    /// A route payload carried no points
    #[error("Route has no points")]
    EmptyRoute,

    /// No weather-eligible points while the policy requires at least one
    #[error("No weather-eligible points in payload")]
    NoWeatherData,

    /// A chart activation index outside the current marker set
    #[error("Stale index {index} (current marker count {len})")]
    StaleIndexReference { index: usize, len: usize },

    /// Wind direction outside [0, 360]
    #[error("Wind direction {0} out of range [0, 360]")]
    OutOfRangeWindDirection(f64),

    /// `set_*` called while the previous generation is still registered
    #[error("Previous {0} generation was not cleared")]
    OverlayNotCleared(OverlayFamily),

    /// Event not valid in the controller's current state
    #[error("Event {event} not valid in state {state}")]
    InvalidTransition { event: String, state: String },

    /// Malformed push payload
    #[error("Invalid payload: {0}")]
    InvalidPayload(#[from] PayloadError),

    /// Failure reported by a capability surface
    #[error("Surface error: {0}")]
    Surface(#[from] EnvError),

    /// A bus handler reported a failure
    #[error("Handler error: {0}")]
    Handler(String),
}

impl ViewError {
    /// Creates an invalid-transition error.
    pub fn transition(event: impl Into<String>, state: impl std::fmt::Display) -> Self {
        Self::InvalidTransition {
            event: event.into(),
            state: state.to_string(),
        }
    }

    /// Creates a handler error.
    pub fn handler(msg: impl Into<String>) -> Self {
        Self::Handler(msg.into())
    }
}

/// Errors raised while decoding a server push at the boundary.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// Event name not recognised
    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    /// JSON did not match the expected shape
    #[error("Malformed JSON for {event}: {source}")]
    Malformed {
        event: String,
        #[source]
        source: serde_json::Error,
    },

    /// Coordinate not finite or outside WGS84 range
    #[error("Point {index}: invalid coordinate ({lat}, {lon})")]
    InvalidCoordinate { index: usize, lat: f64, lon: f64 },

    /// Track point index disagrees with its position in the sequence
    #[error("Point at position {position} carries index {index}")]
    IndexMismatch { position: usize, index: usize },

    /// Zoom level outside the supported range
    #[error("Zoom {0} out of range")]
    InvalidZoom(f64),
}
