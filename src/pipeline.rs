use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use url::Url;

use crate::block::{BlockDetector, BlockDetectorConfig};
use crate::config::ScraperConfig;
use crate::error::{ConfigError, ExtractionError, FetchError, PipelineError};
use crate::loaders::{BrowserLoader, FetchResult, HttpLoader, Loader, Strategy};
use crate::parsers::content::document_title;
use crate::parsers::{
    Article, ArticleExtractor, ContentFragment, ContentNormalizer, FragmentSource,
    MainContentSelector, MarkdownRenderer, ReadabilityExtractor,
};
use crate::results::{PageRecord, PageRequest};

/// Per-URL orchestration: load, detect blocks, extract, normalize, render, assemble
///
/// Everything except the loaders is read-only after construction, so one
/// pipeline is shared by all workers.
pub struct Pipeline {
    /// `None` runs the render-only variant
    fast: Option<Arc<dyn Loader>>,
    rendered: Arc<dyn Loader>,
    extractor: Arc<dyn ArticleExtractor>,
    detector: BlockDetector,
    selector: MainContentSelector,
    normalizer: ContentNormalizer,
    renderer: MarkdownRenderer,
    extract_timeout: Duration,
}

impl Pipeline {
    /// Build the production pipeline: reqwest fast path, WebDriver fallback, readability
    pub fn from_config(config: &ScraperConfig) -> Result<Self, ConfigError> {
        let fast: Option<Arc<dyn Loader>> = if config.fast_path {
            Some(Arc::new(HttpLoader::new(config)?))
        } else {
            None
        };
        let rendered: Arc<dyn Loader> = Arc::new(BrowserLoader::new(config));

        Self::new(config, fast, rendered, Arc::new(ReadabilityExtractor))
    }

    /// Build a pipeline around the given loaders and extractor
    pub fn new(
        config: &ScraperConfig,
        fast: Option<Arc<dyn Loader>>,
        rendered: Arc<dyn Loader>,
        extractor: Arc<dyn ArticleExtractor>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            fast,
            rendered,
            extractor,
            detector: BlockDetector::new(BlockDetectorConfig::from(config))?,
            selector: MainContentSelector::from_config(config)?,
            normalizer: ContentNormalizer::new(config.noise_selectors.clone())?,
            renderer: MarkdownRenderer::new(),
            extract_timeout: Duration::from_secs(config.extract_timeout_secs),
        })
    }

    /// Process one page; failures become failure records
    pub async fn process(&self, request: &PageRequest) -> PageRecord {
        match self.run(&request.url).await {
            Ok(record) => record,
            Err(e) => {
                ::log::error!("Failed to process {}: {}", request.url, e);
                PageRecord::failure(&request.url, e.to_string())
            }
        }
    }

    async fn run(&self, url: &str) -> Result<PageRecord, PipelineError> {
        let base = Url::parse(url).map_err(|source| PipelineError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        let fetched = self.fetch(url).await?;
        let strategy = fetched.strategy;
        let html = fetched.body.unwrap_or_default();

        let fragment = self.extract(&html, &base).await;
        let title = match fragment.source {
            FragmentSource::ArticleExtractor => fragment
                .title
                .clone()
                .or(fetched.title)
                .or_else(|| document_title(&html)),
            FragmentSource::MainContentSelector => fragment.title.clone().or(fetched.title),
        };

        let normalized = self.normalizer.normalize(&fragment.html, &base)?;
        let body = self.renderer.render(&normalized.html)?;

        ::log::info!(
            "Converted {} via {} fetch and {:?} ({} chars of Markdown)",
            url,
            strategy,
            fragment.source,
            body.len()
        );
        Ok(PageRecord::success(url, title, &body))
    }

    /// One fast attempt, then one rendered attempt; no retries
    async fn fetch(&self, url: &str) -> Result<FetchResult, FetchError> {
        if let Some(fast) = &self.fast {
            match fast.load(url).await {
                Ok(result) if !self.is_blocked(&result) => return Ok(result),
                Ok(result) => ::log::warn!(
                    "{} fetch of {} looks blocked (status {:?}), escalating to {}",
                    fast.strategy(),
                    url,
                    result.status_code,
                    self.rendered.strategy()
                ),
                Err(e) => ::log::warn!(
                    "{} fetch of {} failed: {}, escalating to {}",
                    fast.strategy(),
                    url,
                    e,
                    self.rendered.strategy()
                ),
            }
        }

        let result = self.rendered.load(url).await?;
        if self.is_blocked(&result) {
            return Err(FetchError::Blocked {
                strategy: Strategy::Rendered,
                status: result.status_code,
            });
        }
        Ok(result)
    }

    fn is_blocked(&self, result: &FetchResult) -> bool {
        self.detector
            .is_blocked(result.status_code, result.body.as_deref())
    }

    /// Article extractor first; main-content selection when it yields nothing
    async fn extract(&self, html: &str, base: &Url) -> ContentFragment {
        match self.run_extractor(html, base).await {
            Ok(Some(article)) if !article.content.trim().is_empty() => {
                return ContentFragment {
                    html: article.content,
                    title: article.title,
                    source: FragmentSource::ArticleExtractor,
                };
            }
            Ok(_) => ::log::debug!("No article found in {}, selecting main content", base),
            Err(e) => ::log::warn!(
                "Article extraction failed for {}: {}, selecting main content",
                base,
                e
            ),
        }

        let (html, title) = self.selector.select(html);
        ContentFragment {
            html,
            title,
            source: FragmentSource::MainContentSelector,
        }
    }

    /// Runs the extractor off the async threads, bounded by a timeout
    async fn run_extractor(&self, html: &str, base: &Url) -> Result<Option<Article>, ExtractionError> {
        let extractor = Arc::clone(&self.extractor);
        let html = html.to_string();
        let url = base.clone();

        let task = tokio::task::spawn_blocking(move || extractor.extract(&html, &url));
        match timeout(self.extract_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(ExtractionError::Aborted(join_error.to_string())),
            Err(_) => Err(ExtractionError::Timeout(self.extract_timeout)),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Respond = Box<dyn Fn() -> Result<FetchResult, FetchError> + Send + Sync>;

    /// Loader returning canned results and counting its calls
    pub struct MockLoader {
        strategy: Strategy,
        respond: Respond,
        calls: AtomicUsize,
    }

    impl MockLoader {
        pub fn new(
            strategy: Strategy,
            respond: impl Fn() -> Result<FetchResult, FetchError> + Send + Sync + 'static,
        ) -> Arc<Self> {
            Arc::new(Self {
                strategy,
                respond: Box::new(respond),
                calls: AtomicUsize::new(0),
            })
        }

        /// Responds with the given status and body
        pub fn page(strategy: Strategy, status: Option<u16>, body: &str) -> Arc<Self> {
            let body = body.to_string();
            Self::new(strategy, move || {
                Ok(FetchResult {
                    status_code: status,
                    body: Some(body.clone()),
                    strategy,
                    title: None,
                })
            })
        }

        /// Always fails with a timeout
        pub fn failing(strategy: Strategy) -> Arc<Self> {
            Self::new(strategy, || Err(FetchError::Timeout(Duration::from_secs(30))))
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Loader for MockLoader {
        fn strategy(&self) -> Strategy {
            self.strategy
        }

        async fn load(&self, _url: &str) -> Result<FetchResult, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.respond)()
        }
    }

    /// Extractor that never finds an article
    pub struct NoArticle;

    impl ArticleExtractor for NoArticle {
        fn extract(&self, _html: &str, _url: &Url) -> Result<Option<Article>, ExtractionError> {
            Ok(None)
        }
    }

    /// Extractor that always returns the same article
    pub struct FixedArticle(pub Article);

    impl ArticleExtractor for FixedArticle {
        fn extract(&self, _html: &str, _url: &Url) -> Result<Option<Article>, ExtractionError> {
            Ok(Some(self.0.clone()))
        }
    }

    /// Extractor that always fails
    pub struct BrokenExtractor;

    impl ArticleExtractor for BrokenExtractor {
        fn extract(&self, _html: &str, _url: &Url) -> Result<Option<Article>, ExtractionError> {
            Err(ExtractionError::Readability("broken".to_string()))
        }
    }

    /// Extractor that panics
    pub struct PanickingExtractor;

    impl ArticleExtractor for PanickingExtractor {
        fn extract(&self, _html: &str, _url: &Url) -> Result<Option<Article>, ExtractionError> {
            panic!("extractor blew up")
        }
    }

    pub fn pipeline(
        fast: Option<Arc<MockLoader>>,
        rendered: Arc<MockLoader>,
        extractor: Arc<dyn ArticleExtractor>,
    ) -> Pipeline {
        let fast = fast.map(|loader| loader as Arc<dyn Loader>);
        Pipeline::new(&ScraperConfig::default(), fast, rendered, extractor).unwrap()
    }
}
