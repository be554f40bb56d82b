//! Forecast backend: async forecast fetching.
//! All network work runs off the caller's thread; results sent via mpsc.

use std::sync::mpsc::Sender;
use std::sync::Arc;

use raincast_weather::{ForecastClient, ForecastError};
use tokio::runtime::Handle;

use super::DashboardMessage;
use crate::models::ForecastTicket;

/// Error type for forecast operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForecastFetchError {
    Network(String),
    InvalidApiKey,
    Cancelled,
}

impl std::fmt::Display for ForecastFetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForecastFetchError::Network(s) => write!(f, "Forecast error: {}", s),
            ForecastFetchError::InvalidApiKey => write!(f, "Forecast API key rejected"),
            ForecastFetchError::Cancelled => write!(f, "Forecast request cancelled"),
        }
    }
}

impl std::error::Error for ForecastFetchError {}

impl From<ForecastError> for ForecastFetchError {
    fn from(e: ForecastError) -> Self {
        match e {
            ForecastError::InvalidApiKey | ForecastError::MissingApiKey => {
                ForecastFetchError::InvalidApiKey
            }
            ForecastError::Cancelled => ForecastFetchError::Cancelled,
            other => ForecastFetchError::Network(other.to_string()),
        }
    }
}

/// Request the forecast for a ticket asynchronously.
/// Sends `ForecastDone` on the channel when complete.
pub fn request_forecast(
    runtime: &Handle,
    tx: &Sender<DashboardMessage>,
    client: Arc<ForecastClient>,
    ticket: ForecastTicket,
) {
    let tx = tx.clone();
    runtime.spawn(async move {
        let result = client
            .get_forecast(ticket.coordinate, &ticket.range, &ticket.cancel)
            .await
            .map_err(ForecastFetchError::from);

        if let Ok(points) = &result {
            tracing::debug!(seq = ticket.seq, "Fetched {} forecast points", points.len());
        }
        let _ = tx.send(DashboardMessage::ForecastDone {
            seq: ticket.seq,
            result,
        });
    });
}
