use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder};
use serde_json::{Map, Value, json};
use std::time::Duration;
use tokio::time::timeout;

use super::{FetchResult, Loader, Rotation, Strategy};
use crate::config::ScraperConfig;
use crate::error::FetchError;

// Tried in order when the configured endpoint refuses the session
const FALLBACK_WEBDRIVER_URLS: [&str; 3] = [
    "http://localhost:9515", // ChromeDriver default
    "http://127.0.0.1:4444",
    "http://localhost:4723", // Appium default
];

const READY_STATE_POLL: Duration = Duration::from_millis(250);

// Teardown must not outlive a stuck driver
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Rendered strategy: one throwaway WebDriver session per page
///
/// Sessions are never reused, so no navigation state leaks between pages.
/// The session is closed on every exit path of [`Loader::load`].
pub struct BrowserLoader {
    webdriver_url: String,
    navigation_timeout: Duration,
    network_idle_timeout: Duration,
    proxy_urls: Vec<String>,
    rotation: Rotation,
}

impl BrowserLoader {
    pub fn new(config: &ScraperConfig) -> Self {
        Self {
            webdriver_url: config.webdriver_url.clone(),
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
            network_idle_timeout: Duration::from_secs(config.network_idle_timeout_secs),
            proxy_urls: config.proxy_urls.clone(),
            rotation: Rotation::default(),
        }
    }

    fn next_proxy(&self) -> Option<&str> {
        if self.proxy_urls.is_empty() {
            return None;
        }
        let idx = self.rotation.next_index(self.proxy_urls.len());
        Some(self.proxy_urls[idx].as_str())
    }

    /// Headless session capabilities for Chrome and Firefox drivers
    fn capabilities(&self, proxy: Option<&str>) -> Map<String, Value> {
        let mut chrome_args = vec![
            "--headless=new".to_string(),
            "--disable-gpu".to_string(),
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--ignore-certificate-errors".to_string(),
        ];
        if let Some(proxy) = proxy {
            chrome_args.push(format!("--proxy-server={}", proxy));
        }

        let mut caps = Map::new();
        caps.insert("acceptInsecureCerts".to_string(), Value::Bool(true));
        caps.insert("goog:chromeOptions".to_string(), json!({ "args": chrome_args }));
        caps.insert(
            "moz:firefoxOptions".to_string(),
            json!({ "args": ["-headless"] }),
        );
        caps
    }

    /// Opens a new session, trying common local endpoints if the configured one fails
    async fn connect(&self, caps: &Map<String, Value>) -> Result<Client, FetchError> {
        let endpoints = std::iter::once(self.webdriver_url.as_str()).chain(
            FALLBACK_WEBDRIVER_URLS
                .iter()
                .copied()
                .filter(|url| *url != self.webdriver_url),
        );

        // the configured endpoint's failure is the one reported
        let mut first_error = None;
        for (attempt, endpoint) in endpoints.enumerate() {
            let mut builder = ClientBuilder::native();
            builder.capabilities(caps.clone());

            let error = match timeout(self.navigation_timeout, builder.connect(endpoint)).await {
                Ok(Ok(client)) => {
                    ::log::debug!("Opened WebDriver session at {}", endpoint);
                    return Ok(client);
                }
                Ok(Err(e)) => FetchError::Session(e.to_string()),
                Err(_) => FetchError::Timeout(self.navigation_timeout),
            };

            // Only the configured endpoint is worth a warning
            if attempt == 0 {
                ::log::warn!("Failed to connect to WebDriver at {}: {}", endpoint, error);
            }
            first_error.get_or_insert(error);
        }

        ::log::error!(
            "Make sure a WebDriver server is running or set the WEBDRIVER_URL environment variable"
        );
        Err(first_error
            .unwrap_or_else(|| FetchError::Session("no WebDriver endpoint configured".to_string())))
    }

    async fn render(&self, client: &Client, url: &str) -> Result<FetchResult, FetchError> {
        match timeout(self.navigation_timeout, client.goto(url)).await {
            Ok(navigation) => navigation?,
            Err(_) => return Err(FetchError::Timeout(self.navigation_timeout)),
        }

        self.wait_for_settle(client, url).await;

        let title = match timeout(self.navigation_timeout, client.title()).await {
            Ok(Ok(title)) => Some(title.trim().to_string()).filter(|t| !t.is_empty()),
            Ok(Err(e)) => {
                ::log::debug!("Could not read title of {}: {}", url, e);
                None
            }
            Err(_) => {
                ::log::debug!("Reading the title of {} timed out", url);
                None
            }
        };
        let html = match timeout(self.navigation_timeout, client.source()).await {
            Ok(source) => source?,
            Err(_) => return Err(FetchError::Timeout(self.navigation_timeout)),
        };

        Ok(FetchResult {
            status_code: None,
            body: Some(html),
            strategy: Strategy::Rendered,
            title,
        })
    }

    /// Best-effort wait for the document to finish loading; never fails
    async fn wait_for_settle(&self, client: &Client, url: &str) {
        let settle = async {
            loop {
                match client
                    .execute("return document.readyState;", Vec::new())
                    .await
                {
                    Ok(Value::String(state)) if state == "complete" => break,
                    Ok(_) => {}
                    Err(e) => {
                        ::log::debug!("readyState probe failed for {}: {}", url, e);
                        break;
                    }
                }
                tokio::time::sleep(READY_STATE_POLL).await;
            }
        };

        if timeout(self.network_idle_timeout, settle).await.is_err() {
            ::log::debug!(
                "{} did not settle within {:?}, using partial content",
                url,
                self.network_idle_timeout
            );
        }
    }
}

#[async_trait]
impl Loader for BrowserLoader {
    fn strategy(&self) -> Strategy {
        Strategy::Rendered
    }

    async fn load(&self, url: &str) -> Result<FetchResult, FetchError> {
        let start = std::time::Instant::now();
        let caps = self.capabilities(self.next_proxy());
        let client = self.connect(&caps).await?;

        let result = self.render(&client, url).await;

        match timeout(CLOSE_TIMEOUT, client.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => ::log::warn!("Failed to close WebDriver session for {}: {}", url, e),
            Err(_) => ::log::warn!("Closing the WebDriver session for {} timed out", url),
        }

        ::log::debug!(
            "Rendered fetch of {} finished in {:.2} seconds",
            url,
            start.elapsed().as_secs_f64()
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_are_headless_and_insecure() {
        let loader = BrowserLoader::new(&ScraperConfig::default());
        let caps = loader.capabilities(None);

        assert_eq!(caps["acceptInsecureCerts"], Value::Bool(true));
        let args = caps["goog:chromeOptions"]["args"].as_array().unwrap();
        assert!(args.iter().any(|a| a == "--headless=new"));
        assert!(!args.iter().any(|a| a.as_str().unwrap().starts_with("--proxy-server")));
    }

    #[test]
    fn test_capabilities_carry_proxy() {
        let config = ScraperConfig {
            proxy_urls: vec!["http://proxy.test:3128".to_string()],
            ..ScraperConfig::default()
        };
        let loader = BrowserLoader::new(&config);
        let caps = loader.capabilities(loader.next_proxy());

        let args = caps["goog:chromeOptions"]["args"].as_array().unwrap();
        assert!(args.iter().any(|a| a == "--proxy-server=http://proxy.test:3128"));
    }

    #[tokio::test]
    async fn test_silent_driver_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // accept connections and never answer
        tokio::spawn(async move {
            let mut open = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                open.push(socket);
            }
        });

        let config = ScraperConfig {
            webdriver_url: format!("http://{}", addr),
            navigation_timeout_secs: 1,
            network_idle_timeout_secs: 1,
            ..ScraperConfig::default()
        };
        let loader = BrowserLoader::new(&config);

        let result = tokio::time::timeout(
            Duration::from_secs(15),
            loader.load("https://example.test/"),
        )
        .await
        .expect("load must return on its own");

        assert!(matches!(result, Err(FetchError::Timeout(_))));
    }

    #[test]
    fn test_timeouts_from_config() {
        let loader = BrowserLoader::new(&ScraperConfig::default());
        assert_eq!(loader.navigation_timeout, Duration::from_secs(30));
        assert_eq!(loader.network_idle_timeout, Duration::from_secs(15));
        assert_eq!(loader.strategy(), Strategy::Rendered);
    }
}
