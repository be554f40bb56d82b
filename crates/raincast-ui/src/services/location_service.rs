//! Location backend: resolves the device location off the caller's thread.
//! Results are sent via mpsc.

use std::sync::mpsc::Sender;
use std::sync::Arc;

use raincast_weather::{LocationResolver, PositionSource};
use tokio::runtime::Handle;

use super::DashboardMessage;
use crate::models::LocationTicket;

/// Request a location refresh asynchronously.
/// Sends `LocationDone` on the channel when complete.
pub fn request_location<S>(
    runtime: &Handle,
    tx: &Sender<DashboardMessage>,
    resolver: Arc<LocationResolver<S>>,
    ticket: LocationTicket,
) where
    S: PositionSource + 'static,
{
    let tx = tx.clone();
    runtime.spawn(async move {
        let resolved = resolver.resolve_location(&ticket.cancel).await;
        tracing::info!(
            seq = ticket.seq,
            fallback = resolved.is_fallback(),
            "Location resolved: {}",
            resolved.location.display_name
        );
        let _ = tx.send(DashboardMessage::LocationDone {
            seq: ticket.seq,
            result: resolved,
        });
    });
}
