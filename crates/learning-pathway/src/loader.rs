/// Content loader: fetches the structure document, module documents and topic
/// bodies, and fills the shared `ContentCache`.
///
/// Only the structure document is fatal. A module that cannot be fetched or parsed is
/// replaced by a placeholder, and a topic body that cannot be fetched comes back as an
/// inline HTML error fragment.
///
/// Readers get `Arc` snapshots of the cache and rendered topic bodies live in their
/// own map. Both locks are synchronous and only held for a map operation, never
/// across a fetch.
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use futures::future::join_all;
use pathway_common::fetch::{fetch_with_retry, FetchResponse, Fetcher};
use tracing::{error, info, warn};

use crate::cache::ContentCache;
use crate::config::Config;
use crate::error::AppError;
use crate::loading::{LoadingState, LoadingStatePublisher};
use crate::markdown::{escape_html, BasicMarkdownRenderer, MarkupRenderer};
use crate::model::{Module, Structure, Topic};

pub struct ContentLoader<F> {
    config: Config,
    fetcher: F,
    cache: RwLock<Arc<ContentCache>>,
    topics: Mutex<HashMap<String, String>>,
    renderer: Arc<dyn MarkupRenderer>,
    loading: LoadingStatePublisher,
}

impl<F: Fetcher> ContentLoader<F> {
    pub fn new(config: Config, fetcher: F) -> Self {
        Self {
            config,
            fetcher,
            cache: RwLock::new(Arc::new(ContentCache::new())),
            topics: Mutex::new(HashMap::new()),
            renderer: Arc::new(BasicMarkdownRenderer),
            loading: LoadingStatePublisher::new(),
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn MarkupRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn loading(&self) -> &LoadingStatePublisher {
        &self.loading
    }

    /// Snapshot of the cache for queries and search. Later loads do not show up in a
    /// snapshot already taken.
    pub fn cache(&self) -> Arc<ContentCache> {
        Arc::clone(&self.cache.read().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn module(&self, id: &str) -> Option<Arc<Module>> {
        self.cache().cached_module(id)
    }

    pub fn topic(&self, module_id: &str, topic_id: &str) -> Option<Topic> {
        self.cache().topic(module_id, topic_id).cloned()
    }

    /// Copy-on-write: snapshots handed out earlier keep their contents.
    fn update_cache<R>(&self, update: impl FnOnce(&mut ContentCache) -> R) -> R {
        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        update(Arc::make_mut(&mut cache))
    }

    fn topics(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.topics.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn fetch(&self, url: &str) -> Result<FetchResponse, AppError> {
        let loading = &self.config.content.loading;
        Ok(fetch_with_retry(&self.fetcher, url, loading.timeout, loading.retries).await?)
    }

    pub async fn load_structure(&self) -> Result<Structure, AppError> {
        if let Some(structure) = self.cache().structure() {
            return Ok(structure.clone());
        }

        let url = self.config.structure_url();
        let structure = self
            .fetch_structure(&url)
            .await
            .inspect_err(|e| error!(error = %e, url, "structure load failed"))?;

        Ok(self.update_cache(|cache| match cache.structure() {
            Some(existing) => existing.clone(),
            None => cache.set_structure(structure).clone(),
        }))
    }

    async fn fetch_structure(&self, url: &str) -> Result<Structure, AppError> {
        let resp = self.fetch(url).await?;
        if !resp.is_success() {
            return Err(AppError::Status {
                url: url.to_string(),
                status: resp.status,
            });
        }
        serde_json::from_str(&resp.body).map_err(|source| AppError::InvalidJson {
            location: url.to_string(),
            source,
        })
    }

    /// Never fails: anything short of a parsable module document yields a placeholder,
    /// which is cached like a real module.
    pub async fn load_module(&self, id: &str) -> Arc<Module> {
        if let Some(module) = self.module(id) {
            return module;
        }

        let url = self.config.module_url(id);
        let loaded = match self.fetch(&url).await {
            Ok(resp) if resp.is_success() => match serde_json::from_str::<Module>(&resp.body) {
                Ok(mut module) => {
                    if module.id != id {
                        warn!(id, document_id = %module.id, "module document id differs, using requested id");
                        module.id = id.to_string();
                    }
                    Some(module)
                }
                Err(e) => {
                    error!(id, url, error = %e, "invalid module document, using placeholder");
                    None
                }
            },
            Ok(resp) if resp.is_not_found() => {
                warn!(id, url, "module not found, using placeholder");
                None
            }
            Ok(resp) => {
                error!(id, url, status = resp.status, "module load failed, using placeholder");
                None
            }
            Err(e) => {
                error!(id, url, error = %e, "module load failed, using placeholder");
                None
            }
        };

        self.update_cache(|cache| {
            let module = loaded.unwrap_or_else(|| {
                let phase = cache.find_phase_for_module(id).map(|p| p.id.clone());
                Module::placeholder(id, phase)
            });
            cache.insert_module(module)
        })
    }

    /// Rendered HTML for a topic body, `None` for an empty path.
    ///
    /// Markdown files are rendered, anything else is used verbatim. Failures return an
    /// error fragment that is not cached, so the next call retries.
    pub async fn load_topic_content(&self, content_path: &str) -> Option<String> {
        if content_path.is_empty() {
            return None;
        }
        let cached = self.topics().get(content_path).cloned();
        if cached.is_some() {
            return cached;
        }

        let url = self.config.content_url(content_path);
        let resp = match self.fetch(&url).await {
            Ok(resp) if resp.is_success() => resp,
            Ok(resp) => {
                let e = AppError::Status {
                    url: url.clone(),
                    status: resp.status,
                };
                error!(content_path, error = %e, "topic content load failed");
                return Some(error_fragment(&e));
            }
            Err(e) => {
                error!(content_path, error = %e, "topic content load failed");
                return Some(error_fragment(&e));
            }
        };

        let html = if is_markdown(content_path) {
            self.renderer.render(&resp.body)
        } else {
            resp.body
        };
        self.topics().insert(content_path.to_string(), html.clone());
        Some(html)
    }

    /// Load the structure, then every module it references concurrently, publishing
    /// progress as each one resolves.
    ///
    /// Fails only when the structure cannot be loaded; no module is requested in that
    /// case.
    pub async fn init(&self) -> Result<Structure, AppError> {
        self.loading
            .publish(LoadingState::loading(0, 1, "Loading content structure..."));

        let structure = match self.load_structure().await {
            Ok(structure) => structure,
            Err(e) => {
                self.loading
                    .publish(LoadingState::error("Failed to load content", e.to_string()));
                return Err(e);
            }
        };

        let module_ids = structure.module_ids();
        let total = module_ids.len();
        self.loading
            .publish(LoadingState::loading(0, total, "Loading modules..."));

        let loaded = &AtomicUsize::new(0);
        let loads = module_ids.iter().map(|id| async move {
            self.load_module(id).await;
            let n = loaded.fetch_add(1, Ordering::SeqCst) + 1;
            self.loading.publish(LoadingState::loading(
                n,
                total,
                format!("Loaded {n} of {total} modules..."),
            ));
        });
        join_all(loads).await;

        self.loading
            .publish(LoadingState::complete(total, "Content loaded successfully"));

        let cache = self.cache();
        for (order, ids) in cache.duplicate_orders() {
            warn!(order, modules = ?ids, "modules share an order value, navigation uses the first by id");
        }
        let placeholders = cache.all_modules().iter().filter(|m| m.is_placeholder()).count();
        info!(
            phases = structure.phases.len(),
            specialized_areas = structure.specialized_areas().len(),
            modules = total,
            placeholders,
            "content loaded"
        );

        Ok(structure)
    }

    /// Drop every cached document. Nothing calls this implicitly.
    pub fn clear_cache(&self) {
        *self.cache.write().unwrap_or_else(|e| e.into_inner()) = Arc::default();
        self.topics().clear();
        info!("content cache cleared");
    }
}

fn is_markdown(content_path: &str) -> bool {
    let lower = content_path.to_ascii_lowercase();
    lower.ends_with(".md") || lower.ends_with(".markdown")
}

fn error_fragment(error: &dyn std::fmt::Display) -> String {
    format!(
        "<div class=\"content-error\">\n\
         <h3>Failed to load content</h3>\n\
         <p>Sorry, we couldn't load the content for this topic. Please try again later.</p>\n\
         <pre class=\"error-details\">{}</pre>\n\
         </div>",
        escape_html(&error.to_string())
    )
}
