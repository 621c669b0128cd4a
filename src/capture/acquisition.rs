//! Stream acquisition
//!
//! Requests the screen and webcam streams a recording session needs.

use super::traits::{CaptureError, CaptureProvider, MediaConstraints, MediaStream, StreamHandle};

/// Request a display-sharing stream from the provider
pub async fn acquire_screen_stream(
    provider: &dyn CaptureProvider,
) -> Result<StreamHandle, CaptureError> {
    tracing::debug!("Requesting screen stream");
    let stream = provider.get_display_media(MediaConstraints::video()).await?;
    tracing::info!(
        "Screen stream acquired: {} ({})",
        stream.id(),
        stream.dimension()
    );
    Ok(stream)
}

/// Request a camera stream from the provider
pub async fn acquire_webcam_stream(
    provider: &dyn CaptureProvider,
) -> Result<StreamHandle, CaptureError> {
    tracing::debug!("Requesting webcam stream");
    let stream = provider.get_user_media(MediaConstraints::video()).await?;
    tracing::info!(
        "Webcam stream acquired: {} ({})",
        stream.id(),
        stream.dimension()
    );
    Ok(stream)
}

/// Acquire the screen stream, then the webcam stream.
///
/// If the webcam request fails the screen stream is released before the
/// error is returned, so a failed start never holds a device.
pub async fn acquire_streams(
    provider: &dyn CaptureProvider,
) -> Result<(StreamHandle, StreamHandle), CaptureError> {
    let screen = acquire_screen_stream(provider).await?;

    match acquire_webcam_stream(provider).await {
        Ok(webcam) => Ok((screen, webcam)),
        Err(e) => {
            tracing::debug!("Releasing screen stream {} after webcam failure", screen.id());
            screen.stop_tracks();
            Err(e)
        }
    }
}
