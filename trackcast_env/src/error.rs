//! Error types for the capability surfaces.

use thiserror::Error;

/// Errors a capability surface can report back to the view engine.
#[derive(Debug, Error)]
pub enum EnvError {
    /// The handle is not known to this surface (already removed, or foreign)
    #[error("Unknown layer: {0}")]
    UnknownLayer(String),

    /// The surface refused to create a layer
    #[error("Layer creation failed: {0}")]
    LayerCreation(String),

    /// Chart surface failure
    #[error("Chart error: {0}")]
    ChartError(String),

    /// The push channel was closed or the send buffer is gone
    #[error("Push channel closed")]
    ChannelClosed,
}

impl EnvError {
    /// Creates an unknown-layer error.
    pub fn unknown_layer(layer: impl std::fmt::Display) -> Self {
        Self::UnknownLayer(layer.to_string())
    }

    /// Creates a layer-creation error.
    pub fn layer_creation(msg: impl Into<String>) -> Self {
        Self::LayerCreation(msg.into())
    }

    /// Creates a chart error.
    pub fn chart(msg: impl Into<String>) -> Self {
        Self::ChartError(msg.into())
    }
}
