//! Route table on the ESP-IDF HTTP server.
//!
//! Every route is a `GET` handler delegating to the shared [`CameraApp`].
//! `/capture` and `/stream` write straight from the driver's frame buffer.

use crate::camera::EspCamera;
use crate::config::DeviceConfig;
use anyhow::Result;
use embedded_svc::http::Method;
use embedded_svc::io::Write;
use esp_idf_svc::http::server::{Configuration, EspHttpConnection, EspHttpServer, Request};
use growpod_protocol::codec::{split_uri, STREAM_CONTENT_TYPE, STREAM_HEADERS};
use growpod_protocol::routes::{Route, CONTENT_TYPE_JPEG};
use growpod_server::{CameraApp, PartSink, Response, CAPTURE_HEADERS};
use log::{info, warn};
use std::fmt::Display;
use std::sync::Arc;

/// Shared application state of the firmware.
pub type EspCameraApp = CameraApp<EspCamera>;

type HttpRequest<'r, 'c> = Request<&'r mut EspHttpConnection<'c>>;

/// Start the HTTP server and register all routes.
///
/// The returned server must be kept alive to keep serving.
pub fn start_server(app: Arc<EspCameraApp>, config: &DeviceConfig) -> Result<EspHttpServer<'static>> {
    let mut server = EspHttpServer::new(&Configuration {
        http_port: config.http_port,
        stack_size: config.http_stack_size,
        max_uri_handlers: config.max_uri_handlers,
        ..Default::default()
    })?;

    for route in Route::ALL {
        let app = Arc::clone(&app);
        server.fn_handler(route.path(), Method::Get, move |req| handle(&app, route, req))?;
    }

    info!("HTTP server started on port {} ({} routes)", config.http_port, Route::ALL.len());
    Ok(server)
}

fn handle(app: &EspCameraApp, route: Route, req: HttpRequest<'_, '_>) -> Result<()> {
    let (_, query) = split_uri(req.uri());
    let query = query.to_string();

    match route {
        Route::Capture => serve_capture(app, req),
        Route::Stream => serve_stream(app, &query, req),
        other => match app.handle(other, &query) {
            Some(response) => send(req, &response),
            None => Ok(()),
        },
    }
}

/// Write a complete [`Response`].
fn send(req: HttpRequest<'_, '_>, response: &Response) -> Result<()> {
    let mut headers: Vec<(&str, &str)> = Vec::with_capacity(response.headers.len() + 1);
    if let Some(content_type) = response.content_type {
        headers.push(("Content-Type", content_type));
    }
    headers.extend(response.headers.iter().map(|(name, value)| (*name, value.as_str())));

    let mut out = req.into_response(response.status, Some(response.reason()), &headers)?;
    out.write_all(&response.body)?;
    Ok(())
}

fn serve_capture(app: &EspCameraApp, req: HttpRequest<'_, '_>) -> Result<()> {
    app.capture_with(|jpeg| match jpeg {
        Ok(jpeg) => {
            let mut headers = vec![("Content-Type", CONTENT_TYPE_JPEG)];
            headers.extend(CAPTURE_HEADERS);
            let mut out = req.into_response(200, Some("OK"), &headers)?;
            out.write_all(jpeg.data)?;
            Ok(())
        }
        Err(response) => send(req, &response),
    })
}

fn serve_stream(app: &EspCameraApp, query: &str, req: HttpRequest<'_, '_>) -> Result<()> {
    let stream = match app.open_stream(query) {
        Ok(stream) => stream,
        Err(response) => return send(req, &response),
    };

    let mut headers = vec![("Content-Type", STREAM_CONTENT_TYPE)];
    headers.extend(STREAM_HEADERS);
    let mut out = req.into_response(200, Some("OK"), &headers)?;

    info!("Stream client connected (quality {})", stream.quality());
    let summary = stream.run(&mut WriterSink(&mut out));
    if summary.frames == 0 {
        warn!("Stream closed before the first frame");
    }
    Ok(())
}

/// Stream parts go straight to the response body.
struct WriterSink<W>(W);

impl<W> PartSink for WriterSink<W>
where
    W: Write,
    W::Error: Display,
{
    type Error = W::Error;

    fn send(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        self.0.write_all(bytes)
    }
}
