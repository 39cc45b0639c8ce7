use shift_notifier::{telemetry, Config, Notifier};
use tracing::{error, info};
use vercel_runtime::{run, Error};

mod api {
    use shift_notifier::api::handle_send_message;
    use shift_notifier::Notifier;
    use tracing::{debug, instrument};
    pub use vercel_runtime::{Body, Error, Request, Response};

    #[instrument(level = "debug", skip_all, fields(path = %req.uri().path()))]
    pub async fn handler(req: Request, notifier: Notifier) -> Result<Response<Body>, Error> {
        let method = req.method().clone();

        let body_bytes = match req.into_body() {
            Body::Binary(bytes) => {
                debug!("Received binary body with {} bytes", bytes.len());
                bytes
            }
            Body::Text(text) => {
                debug!("Received text body with {} characters", text.len());
                text.into_bytes()
            }
            Body::Empty => {
                debug!("Received empty body");
                Vec::new()
            }
        };

        let (parts, body) = handle_send_message(&notifier, &method, &body_bytes)
            .await
            .into_parts();
        Ok(Response::from_parts(parts, body.into()))
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    telemetry::init();
    info!("Shift notifier function initiated...");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return Err(e.into());
        }
    };
    info!(?config, "Configuration loaded");

    let notifier = Notifier::from_config(&config)?;

    match run(move |req| api::handler(req, notifier.clone())).await {
        Ok(_) => {
            info!("API server shutdown gracefully");
            Ok(())
        }
        Err(e) => {
            error!("API server error: {}", e);
            Err(e)
        }
    }
}
