//! The send-message pipeline: validate, read, render, dispatch.

use std::sync::Arc;

use http::StatusCode;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::dispatch::{DispatchError, Dispatcher, MsgClubClient};
use crate::record::ProductionRecord;
use crate::render::render;
use crate::store::{PgProductionStore, ProductionStore, StoreError};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("mobile missing")]
    MobileMissing,

    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("no tbm9 data found")]
    NoRecord,

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl NotifyError {
    pub fn status(&self) -> StatusCode {
        match self {
            NotifyError::MobileMissing | NotifyError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            NotifyError::NoRecord => StatusCode::NOT_FOUND,
            NotifyError::Dispatch(_) | NotifyError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_body(&self) -> Value {
        json!({ "error": self.to_string() })
    }
}

/// Success body returned to the caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentNotification {
    pub status: &'static str,
    pub mobile: String,
    pub total_production: i64,
    pub db_record: ProductionRecord,
    pub msg_club: Value,
}

#[derive(Clone)]
pub struct Notifier {
    store: Arc<dyn ProductionStore>,
    dispatcher: Arc<dyn Dispatcher>,
    sender_id: String,
}

impl Notifier {
    pub fn new(
        store: Arc<dyn ProductionStore>,
        dispatcher: Arc<dyn Dispatcher>,
        sender_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            dispatcher,
            sender_id: sender_id.into(),
        }
    }

    /// Wires the Postgres store and the MsgClub client from configuration.
    pub fn from_config(config: &Config) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let store = PgProductionStore::connect_lazy(&config.database_url, config.max_db_connections)?;
        let dispatcher = MsgClubClient::new(config.provider_endpoint(), config.provider_timeout)?;
        Ok(Self::new(
            Arc::new(store),
            Arc::new(dispatcher),
            config.sender_id.clone(),
        ))
    }

    #[instrument(level = "info", skip(self))]
    pub async fn send(&self, mobile: Option<&str>) -> Result<SentNotification, NotifyError> {
        let mobile = mobile.unwrap_or_default().trim();
        if mobile.is_empty() {
            warn!("Rejecting request without a mobile number");
            return Err(NotifyError::MobileMissing);
        }

        let latest = self
            .store
            .latest_record()
            .await?
            .ok_or(NotifyError::NoRecord)?;
        info!(sno = latest.sno, "Loaded latest tbm9 record");

        let total_production = self.store.count_for_date(latest.production_date).await?;
        info!(total_production, "Counted production for shift date");

        let payload = render(&latest, total_production, mobile, &self.sender_id);
        let msg_club = self.dispatcher.dispatch(&payload).await?;
        info!("Template message sent to {}", mobile);

        Ok(SentNotification {
            status: "sent",
            mobile: mobile.to_string(),
            total_production,
            db_record: latest,
            msg_club,
        })
    }
}
