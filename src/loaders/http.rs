use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::{FetchResult, Loader, Rotation, Strategy};
use crate::config::ScraperConfig;
use crate::error::{ConfigError, FetchError};

/// Fast strategy: a plain GET without running any page scripts
///
/// Certificate validation is relaxed on purpose; the goal is to read
/// content, not to vouch for the server.
pub struct HttpLoader {
    /// One client per egress proxy, or a single direct client
    clients: Vec<Client>,
    rotation: Rotation,
    timeout: Duration,
}

impl HttpLoader {
    /// Build the loader and its HTTP clients from configuration
    pub fn new(config: &ScraperConfig) -> Result<Self, ConfigError> {
        let timeout = Duration::from_secs(config.fetch_timeout_secs);

        let clients = if config.proxy_urls.is_empty() {
            vec![build_client(config, timeout, None)?]
        } else {
            config
                .proxy_urls
                .iter()
                .map(|proxy| build_client(config, timeout, Some(proxy)))
                .collect::<Result<Vec<_>, _>>()?
        };

        ::log::debug!(
            "HTTP loader ready with {} client(s), timeout {:?}",
            clients.len(),
            timeout
        );

        Ok(Self {
            clients,
            rotation: Rotation::default(),
            timeout,
        })
    }

    fn next_client(&self) -> &Client {
        &self.clients[self.rotation.next_index(self.clients.len())]
    }
}

fn build_client(
    config: &ScraperConfig,
    timeout: Duration,
    proxy: Option<&String>,
) -> Result<Client, ConfigError> {
    let mut builder = Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::limited(10))
        .user_agent(&config.user_agent)
        .danger_accept_invalid_certs(true)
        .gzip(true)
        .brotli(true);

    if let Some(proxy_url) = proxy {
        let proxy = reqwest::Proxy::all(proxy_url).map_err(|source| ConfigError::InvalidProxy {
            url: proxy_url.clone(),
            source,
        })?;
        builder = builder.proxy(proxy);
    }

    builder.build().map_err(ConfigError::HttpClient)
}

#[async_trait]
impl Loader for HttpLoader {
    fn strategy(&self) -> Strategy {
        Strategy::Fast
    }

    async fn load(&self, url: &str) -> Result<FetchResult, FetchError> {
        let start = std::time::Instant::now();

        let response = self.next_client().get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.timeout)
            } else {
                FetchError::Http(e)
            }
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.timeout)
            } else {
                FetchError::Http(e)
            }
        })?;

        ::log::debug!(
            "Fast fetch of {} returned {} ({} bytes) in {:.2} seconds",
            url,
            status,
            body.len(),
            start.elapsed().as_secs_f64()
        );

        Ok(FetchResult {
            status_code: Some(status),
            body: Some(body),
            strategy: Strategy::Fast,
            title: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_one_client_per_proxy() {
        let config = ScraperConfig {
            proxy_urls: vec![
                "http://proxy-a.test:8080".to_string(),
                "http://proxy-b.test:8080".to_string(),
            ],
            ..ScraperConfig::default()
        };
        let loader = HttpLoader::new(&config).unwrap();
        assert_eq!(loader.clients.len(), 2);
        assert_eq!(loader.strategy(), Strategy::Fast);
    }

    #[test]
    fn test_direct_client_without_proxies() {
        let loader = HttpLoader::new(&ScraperConfig::default()).unwrap();
        assert_eq!(loader.clients.len(), 1);
        assert_eq!(loader.timeout, Duration::from_secs(30));
    }
}
