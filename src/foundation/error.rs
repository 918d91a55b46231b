use std::time::Duration;

/// Convenience result type used across offscene.
pub type OffsceneResult<T> = Result<T, OffsceneError>;

/// Top-level error taxonomy used by the renderer APIs.
///
/// Every failure of the render protocol is surfaced as one of these variants at the
/// [`crate::SceneHost`] boundary; none of them is allowed to escape as a panic or a hang.
#[derive(thiserror::Error, Debug)]
pub enum OffsceneError {
    /// Invalid caller-provided data (sizes, fps, protocol misuse).
    #[error("validation error: {0}")]
    Validation(String),

    /// The scene document could not be read, parsed or instantiated.
    #[error("scene load error: {0}")]
    SceneLoad(String),

    /// The graphics context could not be made current on the render thread.
    #[error("context acquire error: {0}")]
    ContextAcquire(String),

    /// Drawing or read-back failed on the render thread.
    #[error("render error: {0}")]
    Render(String),

    /// The render worker did not reply within the configured timeout.
    #[error("timeout: render worker did not reply within {0:?}")]
    Timeout(Duration),

    /// The render worker is gone or was abandoned after a timeout.
    #[error("render worker faulted: {0}")]
    WorkerFaulted(String),

    /// The process-wide rendering platform is unavailable.
    #[error("platform error: {0}")]
    Platform(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl OffsceneError {
    /// Build a [`OffsceneError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`OffsceneError::SceneLoad`] value.
    pub fn scene_load(msg: impl Into<String>) -> Self {
        Self::SceneLoad(msg.into())
    }

    /// Build a [`OffsceneError::ContextAcquire`] value.
    pub fn context_acquire(msg: impl Into<String>) -> Self {
        Self::ContextAcquire(msg.into())
    }

    /// Build a [`OffsceneError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`OffsceneError::WorkerFaulted`] value.
    pub fn worker_faulted(msg: impl Into<String>) -> Self {
        Self::WorkerFaulted(msg.into())
    }

    /// Build a [`OffsceneError::Platform`] value.
    pub fn platform(msg: impl Into<String>) -> Self {
        Self::Platform(msg.into())
    }

    /// Return `true` for errors after which the render worker can no longer be used.
    pub fn is_fatal_for_session(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::WorkerFaulted(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
