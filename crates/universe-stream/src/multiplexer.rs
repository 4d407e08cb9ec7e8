//! Stream multiplexer: fans published frames out to MJPEG viewers.
//!
//! Every `GET /video` response subscribes to the pump's broadcast channel and
//! streams frames from that moment on. The channel is bounded; a viewer that
//! falls behind loses its oldest frames and carries on, so the pump and the
//! other viewers never wait on it. When the client goes away hyper drops the
//! body stream, which closes the subscription and deregisters the viewer.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures::Stream;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::connections::ConnectionGuard;
use crate::frame::{Frame, FRAME_CONTENT_TYPE, STREAM_CONTENT_TYPE};
use crate::server::AppState;

pub const CROSS_ORIGIN_RESOURCE_POLICY: HeaderName = HeaderName::from_static("cross-origin-resource-policy");

struct Viewer {
    frames: broadcast::Receiver<Frame>,
    shutdown: CancellationToken,
    guard: ConnectionGuard,
    dropped: u64,
}

/// Multipart chunks for one viewer, ending on shutdown or when the pump goes
/// away.
pub fn viewer_stream(
    frames: broadcast::Receiver<Frame>,
    shutdown: CancellationToken,
    guard: ConnectionGuard,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    let viewer = Viewer {
        frames,
        shutdown,
        guard,
        dropped: 0,
    };

    futures::stream::unfold(viewer, |mut viewer| async move {
        loop {
            let next = tokio::select! {
                _ = viewer.shutdown.cancelled() => return None,
                next = viewer.frames.recv() => next,
            };
            match next {
                Ok(frame) => return Some((Ok(frame.to_multipart_chunk()), viewer)),
                Err(RecvError::Lagged(n)) => {
                    viewer.dropped += n;
                    debug!(
                        "Viewer {} lagged, dropped {} frames ({} total)",
                        viewer.guard.id(),
                        n,
                        viewer.dropped
                    );
                }
                Err(RecvError::Closed) => return None,
            }
        }
    })
}

/// `GET /video`: unbounded `multipart/x-mixed-replace` stream.
pub async fn video_handler(State(state): State<Arc<AppState>>) -> Response {
    let guard = state.viewers.register();
    info!("Viewer {} subscribed to video stream", guard.id());

    let stream = viewer_stream(state.frames.subscribe(), state.shutdown.clone(), guard);
    (
        [
            (header::CONTENT_TYPE, STREAM_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache"),
            (CROSS_ORIGIN_RESOURCE_POLICY, "cross-origin"),
        ],
        Body::from_stream(stream),
    )
        .into_response()
}

/// `GET /snapshot.jpg`: the most recent frame as a single image.
pub async fn snapshot_handler(State(state): State<Arc<AppState>>) -> Response {
    let latest = state.latest.borrow().clone();
    match latest {
        Some(frame) => (
            [
                (header::CONTENT_TYPE, FRAME_CONTENT_TYPE),
                (header::CACHE_CONTROL, "no-cache"),
                (CROSS_ORIGIN_RESOURCE_POLICY, "cross-origin"),
            ],
            frame.data,
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "no frame produced yet").into_response(),
    }
}
