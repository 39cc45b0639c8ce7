//! Local development server for the send-message endpoint.

use std::convert::Infallible;
use std::net::SocketAddr;

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::json;
use shift_notifier::api::{handle_send_message, respond};
use shift_notifier::{telemetry, Config, Notifier};
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

const ROUTES: [&str; 2] = ["/send-message", "/api/send-message"];

async fn route(
    req: Request<Incoming>,
    notifier: Notifier,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let path = req.uri().path().to_string();
    let method = req.method().clone();
    info!("Processing {} request for path: {}", method, path);

    let response = if !ROUTES.contains(&path.as_str()) {
        warn!("No route for {}", path);
        respond(
            StatusCode::NOT_FOUND,
            Some(json!({ "error": "not found" })),
            &uuid::Uuid::new_v4().to_string(),
        )
    } else {
        match req.into_body().collect().await {
            Ok(collected) => {
                let body = collected.to_bytes();
                debug!("Received body with {} bytes", body.len());
                handle_send_message(&notifier, &method, &body).await
            }
            Err(e) => {
                error!("Failed to read request body: {}", e);
                respond(
                    StatusCode::BAD_REQUEST,
                    Some(json!({ "error": format!("invalid request body: {}", e) })),
                    &uuid::Uuid::new_v4().to_string(),
                )
            }
        }
    };

    let (parts, body) = response.into_parts();
    Ok(Response::from_parts(parts, Full::new(Bytes::from(body))))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    telemetry::init();

    let config = Config::from_env()?;
    info!(?config, "Configuration loaded");
    let notifier = Notifier::from_config(&config)?;

    let port = match std::env::var("PORT") {
        Ok(raw) => raw.parse::<u16>()?,
        Err(_) => 3000,
    };
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let mut incoming = TcpListenerStream::new(TcpListener::bind(addr).await?);
    info!("Shift notifier listening on http://{}", addr);

    while let Some(stream) = incoming.next().await {
        let stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Failed to accept connection: {}", e);
                continue;
            }
        };

        let notifier = notifier.clone();
        tokio::spawn(async move {
            let service = service_fn(move |req| route(req, notifier.clone()));
            if let Err(e) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                debug!("Connection closed with error: {}", e);
            }
        });
    }

    Ok(())
}
