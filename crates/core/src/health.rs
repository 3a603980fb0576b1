use crate::traits::{HealthStatus, SearchEngine};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Background task that pings the engine on a fixed interval.
pub struct HealthMonitor {
    healthy: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    handle: JoinHandle<()>,
}

impl HealthMonitor {
    pub fn spawn<E>(engine: E, interval: Duration) -> Self
    where
        E: SearchEngine + Send + Sync + 'static,
    {
        let healthy = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::new(Notify::new());

        let handle = {
            let healthy = Arc::clone(&healthy);
            let shutdown = Arc::clone(&shutdown);
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

                loop {
                    tokio::select! {
                        _ = shutdown.notified() => break,
                        _ = ticker.tick() => {
                            let up = is_engine_up(&engine).await;
                            let was_up = healthy.swap(up, Ordering::Relaxed);
                            if up && !was_up {
                                info!("search engine reachable");
                            } else if !up && was_up {
                                warn!("search engine became unreachable");
                            }
                        }
                    }
                }
                debug!("health monitor stopped");
            })
        };

        Self {
            healthy,
            shutdown,
            handle,
        }
    }

    /// Result of the most recent ping; `false` before the first one completes.
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    pub async fn shutdown(self) {
        self.shutdown.notify_one();
        if let Err(error) = self.handle.await {
            warn!(%error, "health monitor task ended abnormally");
        }
    }
}

async fn is_engine_up<E: SearchEngine + Sync>(engine: &E) -> bool {
    match engine.ping().await {
        Ok(health) => {
            if health.status != HealthStatus::Green {
                warn!(status = ?health.status, cluster = %health.cluster_name, "cluster health degraded");
            }
            health.status != HealthStatus::Red
        }
        Err(error) => {
            warn!(%error, "search engine ping failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregations::{AggregationSpec, Aggregations};
    use crate::models::{EngineSearchResult, RawHit};
    use crate::query::EngineQuery;
    use crate::traits::{ClusterHealth, EngineInfo};
    use crate::SearchError;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct CountingEngine {
        pings: Arc<AtomicUsize>,
        status: Option<HealthStatus>,
    }

    #[async_trait]
    impl SearchEngine for CountingEngine {
        async fn search(&self, _query: &EngineQuery) -> Result<EngineSearchResult, SearchError> {
            Ok(EngineSearchResult::default())
        }

        async fn get(&self, _id: &str) -> Result<Option<RawHit>, SearchError> {
            Ok(None)
        }

        async fn aggregate(
            &self,
            _query: &EngineQuery,
            _spec: &AggregationSpec,
        ) -> Result<Aggregations, SearchError> {
            Ok(Aggregations::default())
        }

        async fn ping(&self) -> Result<ClusterHealth, SearchError> {
            self.pings.fetch_add(1, Ordering::SeqCst);
            match self.status {
                Some(status) => Ok(ClusterHealth {
                    cluster_name: "test".into(),
                    status,
                    number_of_nodes: 1,
                }),
                None => Err(SearchError::ServiceUnavailable("connection refused".into())),
            }
        }

        async fn info(&self) -> Result<EngineInfo, SearchError> {
            Ok(EngineInfo {
                cluster_name: "test".into(),
                version: "8.0.0".into(),
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn pings_on_interval_until_shutdown() {
        let pings = Arc::new(AtomicUsize::new(0));
        let monitor = HealthMonitor::spawn(
            CountingEngine {
                pings: Arc::clone(&pings),
                status: Some(HealthStatus::Yellow),
            },
            Duration::from_secs(10),
        );

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(pings.load(Ordering::SeqCst), 3);
        assert!(monitor.is_healthy());

        monitor.shutdown().await;
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(pings.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_or_red_pings_mark_unhealthy() {
        for status in [None, Some(HealthStatus::Red)] {
            let monitor = HealthMonitor::spawn(
                CountingEngine {
                    pings: Arc::new(AtomicUsize::new(0)),
                    status,
                },
                Duration::from_secs(10),
            );
            tokio::time::sleep(Duration::from_secs(1)).await;
            assert!(!monitor.is_healthy());
            monitor.shutdown().await;
        }
    }
}
