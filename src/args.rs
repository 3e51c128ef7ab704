use clap::Parser;
use std::path::PathBuf;
use yield_markdown::RunInput;
use yield_markdown::config::ProxyConfiguration;
use yield_markdown::error::ConfigError;

#[derive(Parser, Debug)]
#[command(name = "yield-markdown")]
#[command(about = "Converts web pages into clean Markdown records")]
#[command(version)]
pub struct Args {
    /// Page URLs to convert
    pub urls: Vec<String>,

    /// JSON run input ({"startUrls": [{"url": ...}], ...}); positional URLs are appended
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// JSON scraper configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of pages processed at once
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Seconds to wait after each successful page (forces one worker)
    #[arg(short, long)]
    pub delay: Option<f64>,

    /// Process at most this many URLs
    #[arg(long)]
    pub max_items: Option<usize>,

    /// Proxy URL, may be repeated
    #[arg(long = "proxy")]
    pub proxies: Vec<String>,

    /// WebDriver endpoint (overrides WEBDRIVER_URL)
    #[arg(long)]
    pub webdriver_url: Option<String>,

    /// Skip the plain HTTP attempt and always render in a browser
    #[arg(long)]
    pub no_fast_path: bool,

    /// Write JSON Lines here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl Args {
    /// Merge the input file, positional URLs and flags into one run input
    pub fn run_input(&self) -> Result<RunInput, ConfigError> {
        let mut input = match &self.input {
            Some(path) => RunInput::from_file(path)?,
            None => RunInput::default(),
        };

        input
            .start_urls
            .extend(RunInput::from_urls(self.urls.iter().cloned()).start_urls);

        if let Some(max_items) = self.max_items {
            input.max_items = Some(max_items);
        }
        if let Some(delay) = self.delay {
            input.delay_between_requests = Some(delay);
        }
        if !self.proxies.is_empty() {
            input.proxy_configuration = Some(ProxyConfiguration {
                proxy_urls: self.proxies.clone(),
            });
        }

        Ok(input)
    }
}
