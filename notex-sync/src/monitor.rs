/// Connectivity monitor
///
/// Polls `GET /health` on a fixed interval and keeps the client's online flag
/// current. When the API comes back after an outage, the replay queue is
/// flushed before the next probe.
///
/// # Example
///
/// ```no_run
/// use notex_sync::{client::OfflineClient, monitor::ConnectivityMonitor};
/// use std::time::Duration;
///
/// # async fn example(client: OfflineClient) -> Result<(), notex_sync::error::SyncError> {
/// let monitor = ConnectivityMonitor::new(client, Duration::from_secs(5));
/// let shutdown = monitor.shutdown_token();
///
/// let handle = tokio::spawn(async move { monitor.run().await });
/// shutdown.cancel();
/// handle.await.ok();
/// # Ok(())
/// # }
/// ```

use crate::client::OfflineClient;
use crate::sync::{replay_queue, ReplayReport};
use crate::transport::{ApiRequest, ApiResponse};
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub const HEALTH_ROUTE: &str = "/health";

/// A 2xx answer whose `status`, when present, is `healthy`
fn is_healthy(response: &ApiResponse) -> bool {
    response.is_success()
        && response
            .body
            .get("status")
            .map_or(true, |status| status == "healthy")
}

/// What a single probe observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    StillOnline,
    StillOffline,
    WentOffline,
    /// Came back; carries the result of the replay that followed
    CameOnline(ReplayReport),
}

pub struct ConnectivityMonitor {
    client: OfflineClient,
    poll_interval: Duration,
    shutdown_token: CancellationToken,
}

impl ConnectivityMonitor {
    pub fn new(client: OfflineClient, poll_interval: Duration) -> Self {
        ConnectivityMonitor {
            client,
            poll_interval,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Token that stops [`ConnectivityMonitor::run`] when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Probes the API once and reacts to the result
    pub async fn check(&self) -> Transition {
        // Probe the transport directly: the client would answer locally while offline
        let reachable = match self.client.transport().send(&ApiRequest::get(HEALTH_ROUTE)).await {
            Ok(response) => is_healthy(&response),
            Err(e) => {
                tracing::debug!(error = %e, "Health probe failed");
                false
            }
        };

        let was_online = self.client.set_online(reachable);

        match (was_online, reachable) {
            (true, true) => Transition::StillOnline,
            (false, false) => Transition::StillOffline,
            (true, false) => {
                tracing::warn!("API unreachable, working offline");
                Transition::WentOffline
            }
            (false, true) => {
                tracing::info!("API reachable again");
                let report = match replay_queue(self.client.transport().as_ref(), self.client.store()).await {
                    Ok(report) => report,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to finish offline replay");
                        ReplayReport::default()
                    }
                };
                Transition::CameOnline(report)
            }
        }
    }

    /// Runs until the shutdown token is cancelled
    pub async fn run(&self) {
        tracing::info!(interval_secs = self.poll_interval.as_secs(), "Connectivity monitor starting");

        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown_token.cancelled() => break,
                _ = ticker.tick() => {
                    self.check().await;
                }
            }
        }

        tracing::info!("Connectivity monitor stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{OfflineStore, QueueAction};
    use crate::transport::{Method, MockTransport};
    use serde_json::json;
    use std::sync::Arc;

    fn setup() -> (ConnectivityMonitor, OfflineClient, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::new());
        let client = OfflineClient::new(transport.clone(), Arc::new(OfflineStore::in_memory()));
        let monitor = ConnectivityMonitor::new(client.clone(), Duration::from_secs(5));
        (monitor, client, transport)
    }

    #[tokio::test]
    async fn test_transitions() {
        let (monitor, client, transport) = setup();

        assert_eq!(monitor.check().await, Transition::StillOnline);

        transport.set_reachable(false);
        assert_eq!(monitor.check().await, Transition::WentOffline);
        assert!(!client.is_online());
        assert_eq!(monitor.check().await, Transition::StillOffline);

        transport.set_reachable(true);
        assert!(matches!(monitor.check().await, Transition::CameOnline(_)));
        assert!(client.is_online());
    }

    #[tokio::test]
    async fn test_reconnect_replays_queue() {
        let (monitor, client, transport) = setup();
        client.set_online(false);

        client
            .send(&ApiRequest::post("/api/notes", json!({ "title": "Offline draft" })))
            .await
            .unwrap();
        assert_eq!(client.store().queue().await[0].action, QueueAction::Create);

        let transition = monitor.check().await;
        assert_eq!(
            transition,
            Transition::CameOnline(ReplayReport {
                dispatched: 1,
                succeeded: 1,
                failed: 0
            })
        );

        let requests = transport.requests();
        assert_eq!(requests[0].path, HEALTH_ROUTE);
        assert_eq!(requests[1].method, Method::Post);
        assert_eq!(requests[1].body.as_ref().unwrap()["title"], "Offline draft");
        assert!(requests[1].body.as_ref().unwrap().get("id").is_none());
        assert!(client.store().queue().await.is_empty());
    }

    #[tokio::test]
    async fn test_unhealthy_status_counts_as_offline() {
        let (monitor, client, transport) = setup();
        transport.respond(
            Method::Get,
            HEALTH_ROUTE,
            ApiResponse::new(503, json!({ "error": "Database unavailable" })),
        );

        assert_eq!(monitor.check().await, Transition::WentOffline);
        assert!(!client.is_online());
    }

    #[tokio::test]
    async fn test_degraded_server_keeps_queue() {
        let (monitor, client, transport) = setup();
        client
            .store()
            .set_online_notes(vec![json!({ "id": "n1" })])
            .await
            .unwrap();
        client.set_online(false);
        client.send(&ApiRequest::delete("/api/notes/n1")).await.unwrap();

        transport.respond(
            Method::Get,
            HEALTH_ROUTE,
            ApiResponse::new(200, json!({ "status": "degraded" })),
        );

        assert_eq!(monitor.check().await, Transition::StillOffline);
        assert_eq!(client.store().queue().await.len(), 1);
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_cancel() {
        let (monitor, _, transport) = setup();
        let monitor = Arc::new(monitor);
        let token = monitor.shutdown_token();

        let runner = monitor.clone();
        let handle = tokio::spawn(async move { runner.run().await });

        tokio::time::sleep(Duration::from_secs(11)).await;
        token.cancel();
        handle.await.unwrap();

        // Immediate first tick plus two more within eleven seconds
        assert_eq!(transport.requests().len(), 3);
    }
}
