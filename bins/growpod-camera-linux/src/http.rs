//! axum front end for the camera routes.
//!
//! Camera work blocks, so every handler runs it on the blocking pool. A
//! stream keeps one blocking task for its lifetime and hands parts to the
//! response body through a small channel; when the client goes away the
//! channel closes and the stream ends on its next write.

use crate::sim::SimCamera;
use axum::{
    body::Body,
    extract::{RawQuery, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response as AxumResponse},
    routing::get,
    Router,
};
use growpod_protocol::codec::{STREAM_CONTENT_TYPE, STREAM_HEADERS};
use growpod_protocol::routes::Route;
use growpod_server::{CameraApp, PartSink, Response};
use std::borrow::Cow;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tower_http::trace::TraceLayer;

/// Shared application state.
pub type SharedApp = Arc<CameraApp<SimCamera>>;

/// Parts buffered between the stream task and the socket.
const STREAM_BUFFER: usize = 8;

/// Build the router serving every camera route.
pub fn router(app: SharedApp) -> Router {
    let mut router = Router::new();
    for route in Route::ALL {
        router = router.route(
            route.path(),
            get(move |State(app): State<SharedApp>, RawQuery(query): RawQuery| {
                serve(app, route, query.unwrap_or_default())
            }),
        );
    }
    router.with_state(app).layer(TraceLayer::new_for_http())
}

async fn serve(app: SharedApp, route: Route, query: String) -> AxumResponse {
    if route == Route::Stream {
        return stream(app, query).await;
    }

    match tokio::task::spawn_blocking(move || app.handle(route, &query)).await {
        Ok(Some(response)) => into_axum(response),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            tracing::error!("Handler for {} panicked: {}", route.path(), e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn into_axum(response: Response) -> AxumResponse {
    let mut builder = axum::http::Response::builder().status(response.status);
    if let Some(content_type) = response.content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    for (name, value) in &response.headers {
        builder = builder.header(*name, value.as_str());
    }

    let body = match response.body {
        Cow::Borrowed(bytes) => Body::from(bytes),
        Cow::Owned(bytes) => Body::from(bytes),
    };
    match builder.body(body) {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("Failed to build response: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Forwards stream parts to the response body.
struct ChannelSink {
    tx: mpsc::Sender<Vec<u8>>,
}

impl PartSink for ChannelSink {
    type Error = &'static str;

    fn send(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        self.tx
            .blocking_send(bytes.to_vec())
            .map_err(|_| "client disconnected")
    }
}

async fn stream(app: SharedApp, query: String) -> AxumResponse {
    let (opened_tx, opened_rx) = oneshot::channel::<Option<Response>>();
    let (part_tx, part_rx) = mpsc::channel::<Vec<u8>>(STREAM_BUFFER);

    tokio::task::spawn_blocking(move || {
        let stream = match app.open_stream(&query) {
            Ok(stream) => stream,
            Err(response) => {
                let _ = opened_tx.send(Some(response));
                return;
            }
        };
        if opened_tx.send(None).is_err() {
            return;
        }
        stream.run(&mut ChannelSink { tx: part_tx });
    });

    match opened_rx.await {
        Ok(None) => {}
        Ok(Some(response)) => return into_axum(response),
        Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }

    let parts = futures::stream::unfold(part_rx, |mut rx| async move {
        rx.recv().await.map(|part| (Ok::<_, Infallible>(part), rx))
    });

    let mut builder = axum::http::Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, STREAM_CONTENT_TYPE);
    for (name, value) in STREAM_HEADERS {
        builder = builder.header(name, value);
    }
    match builder.body(Body::from_stream(parts)) {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("Failed to build stream response: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use futures::StreamExt;
    use growpod_core::{CameraHub, CameraSettings, FrameSize};
    use growpod_server::DeviceInfo;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_app() -> SharedApp {
        let hub = CameraHub::new(SimCamera::with_frame_size(FrameSize::Qvga));
        let settings = CameraSettings {
            frame_size: FrameSize::Qvga,
            ..CameraSettings::defaults()
        };
        hub.apply_settings(&settings).unwrap();
        Arc::new(
            CameraApp::new(hub, DeviceInfo::default()).with_frame_interval(Duration::from_millis(5)),
        )
    }

    async fn get(app: &SharedApp, uri: &str) -> AxumResponse {
        router(app.clone())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_bytes(response: AxumResponse) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    fn content_type(response: &AxumResponse) -> &str {
        response.headers()[header::CONTENT_TYPE].to_str().unwrap()
    }

    #[tokio::test]
    async fn test_pages() {
        let app = test_app();
        for uri in ["/", "/preview", "/settings"] {
            let response = get(&app, uri).await;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(content_type(&response), "text/html");
        }

        let favicon = get(&app, "/favicon.ico").await;
        assert_eq!(favicon.status(), StatusCode::NO_CONTENT);

        let missing = get(&app, "/nope").await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_status_json() {
        let app = test_app();
        let response = get(&app, "/status").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(content_type(&response), "application/json");

        let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(json["camera"], "OV3660");
        assert_eq!(json["resolution"], "QXGA");
        assert_eq!(json["format"], "JPEG");
        assert_eq!(json["aec"], true);
    }

    #[tokio::test]
    async fn test_control() {
        let app = test_app();

        let response = get(&app, "/control?var=aec&val=0").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await, b"OK");
        assert!(!app.hub().read_settings().unwrap().aec);

        let response = get(&app, "/control?var=bogus&val=1").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = get(&app, "/control?var=aec").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_capture() {
        let app = test_app();
        let response = get(&app, "/capture").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(content_type(&response), "image/jpeg");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "inline; filename=capture.jpg"
        );

        let jpeg = body_bytes(response).await;
        assert_eq!(&jpeg[..2], &[0xffu8, 0xd8]);
    }

    #[tokio::test]
    async fn test_stream_restores_on_disconnect() {
        let app = test_app();
        let response = get(&app, "/stream?quality=20").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(content_type(&response), STREAM_CONTENT_TYPE);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        assert_eq!(app.hub().active_streams(), 1);

        let mut body = response.into_body().into_data_stream();
        let first = body.next().await.unwrap().unwrap();
        assert!(first.starts_with(b"--frame\r\nContent-Type: image/jpeg\r\n"));
        drop(body);

        // The stream task notices on its next write.
        for _ in 0..200 {
            if app.hub().active_streams() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(app.hub().active_streams(), 0);

        let settings = app.hub().read_settings().unwrap();
        assert_eq!(settings.frame_size, FrameSize::Qvga);
        assert_eq!(settings.quality, 4);
    }

    #[tokio::test]
    async fn test_unread_stream_does_not_block_status() {
        let app = test_app();
        let stream = get(&app, "/stream").await;
        assert_eq!(stream.status(), StatusCode::OK);

        // Let the stream fill its buffer while nobody reads the body.
        tokio::time::sleep(Duration::from_millis(200)).await;

        let status = tokio::time::timeout(Duration::from_secs(3), get(&app, "/status"))
            .await
            .expect("/status blocked behind an unread stream");
        assert_eq!(status.status(), StatusCode::OK);

        let control = tokio::time::timeout(Duration::from_secs(3), get(&app, "/control?var=aec&val=0"))
            .await
            .expect("/control blocked behind an unread stream");
        assert_eq!(control.status(), StatusCode::OK);

        drop(stream);
    }
}
