use thiserror::Error;

use crate::scene::EntityId;

/// Failures while reading scene geometry into the spatial index.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SceneError {
    #[error("entity {0:?} is not part of the scene")]
    UnknownEntity(EntityId),

    #[error("index {index} is out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },

    #[error("{count} vertices/indices do not form whole triangles")]
    IncompleteTriangle { count: usize },
}

/// Rejected controller settings.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SettingsError {
    #[error("`{field}` must be finite and greater than zero (got {value})")]
    NotPositive { field: &'static str, value: f32 },

    #[error("capsule radius {radius} does not fit in player height {height}")]
    CapsuleTooShort { radius: f32, height: f32 },

    #[error("`{field}` must lie in [{min}, {max}] (got {value})")]
    OutOfRange {
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
}
