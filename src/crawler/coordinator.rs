//! Crawler coordinator - main crawl orchestration logic
//!
//! Every admitted URL becomes a task that fetches the document, extracts its
//! links and images, spawns one child task per reference and then waits for
//! all of them. The crawl finishes when the seed's task does.

use crate::config::{Config, CrawlerConfig};
use crate::crawler::fetcher::{DocumentFetcher, HttpDocumentFetcher};
use crate::crawler::parser::extract_assets;
use crate::crawler::session::CrawlSession;
use crate::images::{ImagePipeline, ProcessedImageCache};
use crate::proxy::{filter_working_proxies, HttpProxyChecker, ProxyChecker, ProxyInfo};
use crate::robots::{HttpRobotsProvider, RobotsPolicyProvider};
use crate::state::{TaskProgress, TaskState};
use crate::storage::open_store;
use crate::url::{extract_domain, normalize, normalize_url};
use crate::ScraperError;
use futures::future::{BoxFuture, FutureExt};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Main crawler coordinator structure
///
/// Cloning is cheap and every clone shares the same worker pools.
#[derive(Clone)]
pub struct Coordinator {
    fetcher: Arc<dyn DocumentFetcher>,
    robots: Arc<dyn RobotsPolicyProvider>,
    proxy_checker: Arc<dyn ProxyChecker>,
    images: Option<Arc<ImagePipeline>>,
    link_pool: Arc<Semaphore>,
    image_pool: Arc<Semaphore>,
}

impl Coordinator {
    /// Creates a coordinator from its collaborators
    ///
    /// Images are only processed once a pipeline is attached with
    /// [`Coordinator::with_image_pipeline`].
    pub fn new(
        config: &CrawlerConfig,
        fetcher: Arc<dyn DocumentFetcher>,
        robots: Arc<dyn RobotsPolicyProvider>,
        proxy_checker: Arc<dyn ProxyChecker>,
    ) -> Self {
        Self {
            fetcher,
            robots,
            proxy_checker,
            images: None,
            link_pool: Arc::new(Semaphore::new(config.link_pool_size as usize)),
            image_pool: Arc::new(Semaphore::new(config.image_pool_size as usize)),
        }
    }

    pub fn with_image_pipeline(mut self, pipeline: Arc<ImagePipeline>) -> Self {
        self.images = Some(pipeline);
        self
    }

    /// Builds a coordinator with the HTTP, SQLite and filesystem backends
    ///
    /// # Errors
    ///
    /// Fails if an HTTP client cannot be built, the database cannot be
    /// opened or the image output directory cannot be created.
    pub fn from_config(config: &Config) -> Result<Self, ScraperError> {
        let robots = HttpRobotsProvider::new(&config.user_agent)?;
        let store = open_store(Path::new(&config.output.database_path))?;
        let pipeline = ImagePipeline::new(
            &config.images.output_directory,
            Arc::new(store),
            Arc::new(ProcessedImageCache::new()),
        )?;

        Ok(Self::new(
            &config.crawler,
            Arc::new(HttpDocumentFetcher::new()),
            Arc::new(robots),
            Arc::new(HttpProxyChecker::new(config.images.probe_url.clone())),
        )
        .with_image_pipeline(Arc::new(pipeline)))
    }

    /// Crawls the domain of `url` and returns every visited link
    ///
    /// # Arguments
    ///
    /// * `url` - Seed URL; its host becomes the crawl domain
    /// * `max_depth` - Links deeper than this are not followed (seed is depth 0)
    /// * `delay_millis` - Spacing between fetches, unless robots.txt sets one
    /// * `proxies` - Candidate proxies; only those passing a check are used
    ///
    /// # Errors
    ///
    /// Only an unusable seed fails the run. Failures on individual pages and
    /// images are logged and skipped.
    pub async fn start_scraping(
        &self,
        url: &str,
        max_depth: u32,
        delay_millis: Option<u64>,
        proxies: Vec<ProxyInfo>,
    ) -> Result<HashSet<String>, ScraperError> {
        let started = Instant::now();

        let seed = normalize_url(url).map_err(|e| ScraperError::InvalidSeed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let domain = extract_domain(&seed).ok_or_else(|| ScraperError::InvalidSeed {
            url: url.to_string(),
            reason: "no host".to_string(),
        })?;

        tracing::info!("Starting crawl of {} (max depth {})", seed, max_depth);

        let robots = self.robots.get_policy(&domain).await;
        let proxies = filter_working_proxies(self.proxy_checker.as_ref(), proxies).await;

        let session = Arc::new(CrawlSession::new(
            seed,
            max_depth,
            robots,
            delay_millis.map(Duration::from_millis),
            proxies,
        )?);
        tracing::info!(
            "Session for {}: robots.txt {}, {} working proxies",
            session.domain(),
            if session.robots().is_some() { "found" } else { "absent" },
            session.proxies().len()
        );

        self.clone()
            .crawl(session.clone(), session.seed().to_string(), 0)
            .await;

        let visited = session.visited_links();
        tracing::info!(
            "Crawl of {} completed: {} links visited in {:?}",
            domain,
            visited.len(),
            started.elapsed()
        );

        Ok(visited)
    }

    /// Processes one URL and, recursively, everything reachable from it
    fn crawl(self, session: Arc<CrawlSession>, url: String, depth: u32) -> BoxFuture<'static, ()> {
        async move {
            let mut task = TaskProgress::new(url.clone());

            let Some(url) = normalize(&url) else {
                advance(&mut task, TaskState::Rejected);
                return;
            };

            if let Err(reason) = session.admit(&url, depth) {
                tracing::debug!("Skipping {} at depth {}: {}", url, depth, reason);
                advance(&mut task, TaskState::Rejected);
                return;
            }

            let assets = {
                // Held across the delay and the fetch, released before fan-out
                let Ok(_permit) = self.link_pool.acquire().await else {
                    return;
                };
                session.rate_limiter().wait().await;

                advance(&mut task, TaskState::Fetching);
                let proxy = session.next_proxy();
                tracing::debug!("Fetching {} at depth {}", url, depth);

                match self.fetcher.fetch(&url, proxy.as_ref()).await {
                    Some(page) => extract_assets(&page.body, &page.url),
                    None => {
                        advance(&mut task, TaskState::Done);
                        return;
                    }
                }
            };
            advance(&mut task, TaskState::Extracted);

            let mut children = JoinSet::new();

            if depth < session.max_depth() {
                for link in assets.links {
                    children.spawn(self.clone().crawl(session.clone(), link, depth + 1));
                }
            }

            if self.images.is_some() {
                for image in assets.images {
                    if session.mark_image_seen(&image) {
                        children.spawn(self.clone().process_image(session.clone(), image));
                    }
                }
            }

            advance(&mut task, TaskState::FannedOut);

            while let Some(result) = children.join_next().await {
                if let Err(e) = result {
                    tracing::error!("Child task of {} failed: {}", url, e);
                }
            }

            advance(&mut task, TaskState::Done);
        }
        .boxed()
    }

    async fn process_image(self, session: Arc<CrawlSession>, reference: String) {
        let Some(pipeline) = self.images.as_ref() else {
            return;
        };
        let Ok(_permit) = self.image_pool.acquire().await else {
            return;
        };

        match pipeline.process_image(&reference, session.domain()).await {
            Ok(outcome) => tracing::debug!("Image {}: {:?}", reference, outcome),
            Err(e) => tracing::error!("Failed to process image {}: {}", reference, e),
        }
    }
}

fn advance(task: &mut TaskProgress, next: TaskState) {
    if let Err(e) = task.advance(next) {
        tracing::error!("{} ({})", e, task.url());
    }
}
