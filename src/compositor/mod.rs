//! Stream compositor
//!
//! Draws the screen stream as the canvas background and the webcam stream,
//! masked by the overlay shape, on top of it. The draw loop runs once per
//! paced frame until cancelled, and the canvas is re-exposed as a
//! capturable stream for the recorder.

pub mod canvas;
pub mod pacer;
pub mod shape;
pub mod surface;

pub use canvas::PixelCanvas;
pub use pacer::{FramePacer, IntervalPacer};
pub use shape::{circle_clip, rounded_rect_clip, OverlayShape};
pub use surface::{DrawingSurface, SharedSurface};

use crate::capture::{MediaStream, StreamHandle, StreamKind};
use crate::geometry::{resolve_position, CategoricalPosition, Dimension, Point};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Compositor errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompositorError {
    #[error("Canvas has no draw surface")]
    CanvasNotReady,

    #[error("{0} stream is not live")]
    SourceNotLive(StreamKind),
}

/// Where and how the webcam overlay is drawn
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayLayout {
    /// Canvas size; the screen stream is scaled to fill it
    pub screen: Dimension,
    /// Size the webcam stream is scaled to
    pub overlay: Dimension,
    pub position: CategoricalPosition,
    pub margin: f64,
    pub shape: OverlayShape,
}

impl OverlayLayout {
    /// Top-left corner of the overlay box
    pub fn origin(&self) -> Point {
        resolve_position(self.position, self.screen, self.overlay, self.margin)
    }
}

/// Layout shared between the command surface and a running draw loop.
/// Changes apply from the next frame.
pub type SharedLayout = Arc<RwLock<OverlayLayout>>;

/// Emitted by the draw loop when something happens it cannot handle itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompositorEvent {
    /// A source stream stopped without the loop being cancelled
    SourceEnded { kind: StreamKind, stream_id: Uuid },
}

/// Stops a draw loop and counts the frames it drew
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
    frames: Arc<AtomicU64>,
}

impl CancelHandle {
    /// Stop the loop. Takes effect before the next frame is drawn.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            tracing::debug!("Draw loop cancelled after {} frames", self.frames_drawn());
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames.load(Ordering::SeqCst)
    }

    fn record_frame(&self) {
        self.frames.fetch_add(1, Ordering::SeqCst);
    }
}

/// Result of wiring two streams into the canvas
pub struct CompositeOutput {
    pub output_stream: StreamHandle,
    pub cancel: CancelHandle,
    pub task: JoinHandle<()>,
}

/// Draw one composite frame.
///
/// A source without a frame (not started yet, or already stopped) is skipped.
/// Returns `true` if anything was drawn.
pub fn draw_frame(
    surface: &mut dyn DrawingSurface,
    screen: &dyn MediaStream,
    webcam: &dyn MediaStream,
    layout: &OverlayLayout,
) -> bool {
    let mut drew = false;
    let canvas_w = layout.screen.width() as f64;
    let canvas_h = layout.screen.height() as f64;

    if let Some(frame) = screen.latest_frame() {
        surface.draw_image(&frame, 0.0, 0.0, canvas_w, canvas_h);
        drew = true;
    }

    if let Some(frame) = webcam.latest_frame() {
        let origin = layout.origin();
        let overlay = layout.overlay;
        layout.shape.clip(surface, origin, overlay, |surface| {
            surface.draw_image(
                &frame,
                origin.x,
                origin.y,
                overlay.width() as f64,
                overlay.height() as f64,
            );
        });
        drew = true;
    }

    drew
}

/// Wire the screen and webcam streams into `surface` and start the draw loop.
///
/// The canvas is sized to the layout's screen dimension and one frame is
/// drawn before the output stream is derived, so the recorder never sees an
/// empty surface. Later edits to the layout's screen dimension do not resize
/// a running canvas. The loop runs on `pacer` until the returned cancel handle
/// fires or a source stream ends; in the latter case a
/// `CompositorEvent::SourceEnded` is sent on `events`.
pub fn begin_composite(
    screen: StreamHandle,
    webcam: StreamHandle,
    surface: SharedSurface,
    layout: SharedLayout,
    mut pacer: Box<dyn FramePacer>,
    events: Option<mpsc::UnboundedSender<CompositorEvent>>,
) -> Result<CompositeOutput, CompositorError> {
    for stream in [&screen, &webcam] {
        if !stream.is_live() {
            return Err(CompositorError::SourceNotLive(stream.kind()));
        }
    }

    let cancel = CancelHandle::default();

    let (output_stream, canvas_dimension) = {
        let current = *layout.read();
        let mut surface = surface.lock();
        surface.set_dimension(current.screen);
        if surface.dimension().is_none() {
            return Err(CompositorError::CanvasNotReady);
        }
        draw_frame(&mut *surface, screen.as_ref(), webcam.as_ref(), &current);
        cancel.record_frame();
        (surface.capture_stream()?, current.screen)
    };

    tracing::info!(
        "Compositing screen {} with webcam {} into {}",
        screen.id(),
        webcam.id(),
        output_stream.id()
    );

    let loop_cancel = cancel.clone();
    let task = tokio::spawn(async move {
        loop {
            pacer.next_frame().await;

            if loop_cancel.is_cancelled() {
                break;
            }

            if let Some(ended) = [&screen, &webcam].into_iter().find(|s| !s.is_live()) {
                tracing::warn!("{} stream {} ended during compositing", ended.kind(), ended.id());
                if let Some(events) = &events {
                    let _ = events.send(CompositorEvent::SourceEnded {
                        kind: ended.kind(),
                        stream_id: ended.id(),
                    });
                }
                break;
            }

            // The canvas keeps the size it was given at start
            let current = OverlayLayout {
                screen: canvas_dimension,
                ..*layout.read()
            };
            let mut surface = surface.lock();
            if loop_cancel.is_cancelled() {
                break;
            }
            draw_frame(&mut *surface, screen.as_ref(), webcam.as_ref(), &current);
            loop_cancel.record_frame();
        }
        tracing::debug!("Draw loop exited after {} frames", loop_cancel.frames_drawn());
    });

    Ok(CompositeOutput {
        output_stream,
        cancel,
        task,
    })
}
