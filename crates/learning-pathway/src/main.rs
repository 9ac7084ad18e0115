use std::sync::Arc;

use learning_pathway::config::Config;
use learning_pathway::loader::ContentLoader;
use learning_pathway::loading::LoadState;
use learning_pathway::notify::TracingNotifier;
use learning_pathway::progress::overall_progress;
use learning_pathway::store::ProgressStore;
use pathway_common::fetch::ContentSource;
use pathway_common::kv::FileStore;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting learning-pathway");

    let config = Config::from_env()?;
    info!(
        base_path = %config.content.base_path,
        storage_dir = %config.storage.dir.display(),
        timeout_ms = config.content.loading.timeout.as_millis() as u64,
        retries = config.content.loading.retries,
        "configuration loaded"
    );

    let store = ProgressStore::new(
        Box::new(FileStore::new(&config.storage.dir)),
        &config,
        Arc::new(TracingNotifier),
    );
    let user_data = store.init();
    info!(
        completed_modules = user_data.completed_modules.len(),
        completed_subtopics = user_data.completed_topics.len(),
        bookmarks = user_data.bookmarks.len(),
        "user data ready"
    );

    let source = ContentSource::for_base_path(&config.content.base_path)?;
    info!(source = source.kind(), "content source selected");

    let loader = ContentLoader::new(config, source);
    loader.loading().subscribe(|state| match state.state {
        LoadState::Loading => debug!(
            progress = state.progress,
            total = state.total,
            percent = state.percent(),
            status = %state.message,
            "loading"
        ),
        _ => debug!(state = ?state.state, status = %state.message, "load state changed"),
    });

    loader.init().await?;

    let cache = loader.cache();
    let progress = overall_progress(&cache, &user_data);
    info!(
        phases = cache.all_phases().len(),
        specialized_areas = cache.specialized_areas().len(),
        modules = progress.total_modules,
        completed_modules = progress.completed_modules,
        subtopics = progress.total_subtopics,
        completed_subtopics = progress.completed_subtopics,
        percent = progress.percent,
        estimated_hours = progress.estimated_hours,
        "learning pathway ready"
    );
    Ok(())
}
