use std::sync::Arc;

use futures::{Stream, StreamExt};
use tracing::debug;

use crate::bearers::BearerList;

use super::urc::{ServiceEvent, decode_service_urc};

/// Handles ongoing monitoring of Telit service notifications.
///
/// Watches the unsolicited line stream and reacts to loss-of-service
/// signals by force-disconnecting every bearer the daemon tracks for this
/// modem. This runs outside any command sequence; a sequence in flight
/// neither delays nor observes it.
pub struct ServiceMonitor {
    task: tokio::task::JoinHandle<()>,
}

impl ServiceMonitor {
    /// Start watching `lines` in a background task.
    pub fn start<S>(mut lines: S, bearers: Arc<dyn BearerList>) -> Self
    where
        S: Stream<Item = String> + Send + Unpin + 'static,
    {
        let task = tokio::spawn(async move {
            while let Some(line) = lines.next().await {
                match decode_service_urc(&line) {
                    Some(ServiceEvent::ServiceLost) => {
                        debug!("service lost happened");
                        bearers.disconnect_all().await;
                    }
                    Some(ServiceEvent::RrcIdle) => {
                        debug!("NR5G RRC idle status");
                        bearers.disconnect_all().await;
                    }
                    Some(ServiceEvent::ServiceAcquired) => {
                        debug!("service PLMN acquired");
                    }
                    Some(ServiceEvent::RrcConnected) => {
                        debug!("NR5G RRC connected");
                    }
                    None => {}
                }
            }
        });

        Self { task }
    }
}

impl Drop for ServiceMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}
