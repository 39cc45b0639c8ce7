//! Transport-neutral HTTP handling for `POST /send-message`, shared by the
//! serverless function and the local server.

use http::{Method, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::notifier::{Notifier, NotifyError};

#[derive(Deserialize, Debug, Default)]
struct SendMessageRequest {
    mobile: Option<String>,
}

fn parse_request(body: &[u8]) -> Result<SendMessageRequest, NotifyError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        debug!("Received empty body");
        return Ok(SendMessageRequest::default());
    }

    serde_json::from_slice::<SendMessageRequest>(body).map_err(|e| {
        warn!("Failed to parse JSON body: {}", e);
        NotifyError::InvalidBody(e.to_string())
    })
}

pub async fn handle_send_message(
    notifier: &Notifier,
    method: &Method,
    body: &[u8],
) -> Response<String> {
    let trace_id = uuid::Uuid::new_v4().to_string();
    let span = info_span!("send_message", %trace_id, %method);

    async {
        if method == Method::OPTIONS {
            debug!("Answering CORS preflight");
            return respond(StatusCode::NO_CONTENT, None, &trace_id);
        }
        if method != Method::POST {
            warn!("Unsupported method");
            return respond(
                StatusCode::METHOD_NOT_ALLOWED,
                Some(json!({ "error": "method not allowed" })),
                &trace_id,
            );
        }

        let outcome = match parse_request(body) {
            Ok(request) => notifier.send(request.mobile.as_deref()).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(sent) => {
                info!("Request processing completed successfully");
                match serde_json::to_value(&sent) {
                    Ok(body) => respond(StatusCode::OK, Some(body), &trace_id),
                    Err(e) => {
                        error!("Failed to serialize response: {}", e);
                        respond(
                            StatusCode::INTERNAL_SERVER_ERROR,
                            Some(json!({ "error": e.to_string() })),
                            &trace_id,
                        )
                    }
                }
            }
            Err(e) => {
                let status = e.status();
                if status.is_server_error() {
                    error!("Send failed: {}", e);
                } else {
                    warn!(status = status.as_u16(), "Send refused: {}", e);
                }
                respond(status, Some(e.error_body()), &trace_id)
            }
        }
    }
    .instrument(span)
    .await
}

/// JSON response with permissive CORS and the request's trace id.
pub fn respond(status: StatusCode, body: Option<Value>, trace_id: &str) -> Response<String> {
    let mut response = Response::new(body.map(|b| b.to_string()).unwrap_or_default());
    *response.status_mut() = status;

    let headers = response.headers_mut();
    headers.insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("application/json"),
    );
    headers.insert(
        http::header::ACCESS_CONTROL_ALLOW_ORIGIN,
        http::HeaderValue::from_static("*"),
    );
    headers.insert(
        http::header::ACCESS_CONTROL_ALLOW_METHODS,
        http::HeaderValue::from_static("POST, OPTIONS"),
    );
    headers.insert(
        http::header::ACCESS_CONTROL_ALLOW_HEADERS,
        http::HeaderValue::from_static("Content-Type, Authorization"),
    );
    if let Ok(value) = http::HeaderValue::from_str(trace_id) {
        headers.insert("x-trace-id", value);
    }
    response
}
