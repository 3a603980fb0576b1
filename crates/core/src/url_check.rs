use crate::error::ConfigError;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

pub const MAX_CONCURRENT_CHECKS: usize = 5;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UrlCheck {
    pub url: String,
    pub reachable: bool,
    pub status: Option<u16>,
}

/// Checks image URLs with HEAD requests, never more than a few at a time.
#[derive(Debug, Clone)]
pub struct ImageUrlChecker {
    client: Client,
    concurrency: usize,
}

impl ImageUrlChecker {
    pub fn new(timeout: Duration) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| ConfigError::Client(error.to_string()))?;
        Ok(Self {
            client,
            concurrency: MAX_CONCURRENT_CHECKS,
        })
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, MAX_CONCURRENT_CHECKS);
        self
    }

    pub async fn check(&self, url: &str) -> UrlCheck {
        match self.client.head(url).send().await {
            Ok(response) => UrlCheck {
                url: url.to_string(),
                reachable: response.status().is_success(),
                status: Some(response.status().as_u16()),
            },
            Err(error) => {
                debug!(url, %error, "image url check failed");
                UrlCheck {
                    url: url.to_string(),
                    reachable: false,
                    status: None,
                }
            }
        }
    }

    /// Results come back in input order.
    pub async fn check_all(&self, urls: &[String]) -> Vec<UrlCheck> {
        run_bounded(urls, self.concurrency, |url| self.check(url)).await
    }
}

async fn run_bounded<'a, F, Fut>(urls: &'a [String], limit: usize, check: F) -> Vec<Fut::Output>
where
    F: Fn(&'a str) -> Fut,
    Fut: Future,
{
    stream::iter(urls.iter().map(|url| check(url.as_str())))
        .buffered(limit.max(1))
        .collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn fan_out_is_bounded_and_ordered() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let urls = (0..12)
            .map(|i| format!("https://img.example.org/{i}"))
            .collect::<Vec<_>>();

        let results = run_bounded(&urls, MAX_CONCURRENT_CHECKS, |url| {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                url.to_string()
            }
        })
        .await;

        assert_eq!(results, urls);
        assert_eq!(peak.load(Ordering::SeqCst), MAX_CONCURRENT_CHECKS);
    }

    #[test]
    fn concurrency_is_clamped() {
        let checker = ImageUrlChecker::new(Duration::from_secs(1)).unwrap();
        assert_eq!(checker.clone().with_concurrency(0).concurrency, 1);
        assert_eq!(checker.with_concurrency(50).concurrency, MAX_CONCURRENT_CHECKS);
    }

    #[tokio::test]
    async fn unreachable_url_is_reported() {
        let checker = ImageUrlChecker::new(Duration::from_secs(2)).unwrap();
        let result = checker.check("http://127.0.0.1:9/bild/st/0000000001/s.jpg").await;
        assert!(!result.reachable);
        assert_eq!(result.status, None);
    }
}
