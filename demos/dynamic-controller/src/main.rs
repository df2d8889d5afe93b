//! Dynamic controller demo.
//!
//! Watches a resource type chosen on the command line. The type is resolved
//! through the informer registry at runtime, so the controller has no
//! compile-time knowledge of what it watches:
//! - built-in types resolve directly (`--resource pods`)
//! - `example.com/v1 widgets` is registered at startup as a custom type
//! - a background task mutates the in-memory source to generate events
//!
//! Run with:
//! ```bash
//! cargo run -p dynamic-controller -- --group apps --resource statefulsets
//! cargo run -p dynamic-controller -- --group example.com --api-version v1 --resource widgets
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use nebucloud_informers::factory::{wait_for_signal, InformerProvider};
use nebucloud_informers::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Command line arguments.
#[derive(Debug, Parser)]
#[command(name = "dynamic-controller", about = "Watch any registered resource type")]
struct Args {
    /// API group, empty for the core group.
    #[arg(long, default_value = "")]
    group: String,

    /// API version.
    #[arg(long = "api-version", default_value = "internal")]
    api_version: String,

    /// Plural resource name.
    #[arg(long, default_value = "pods")]
    resource: String,

    /// Only watch this namespace.
    #[arg(long, env = "WATCH_NAMESPACE")]
    namespace: Option<String>,

    /// Objects to seed before starting.
    #[arg(long, default_value_t = 5)]
    objects: usize,

    /// Resync interval in seconds, 0 to disable.
    #[arg(long, default_value_t = 30)]
    resync_secs: u64,

    /// Stop after this many seconds instead of waiting for a signal.
    #[arg(long)]
    run_for: Option<u64>,

    /// Print every registered resource key and exit.
    #[arg(long)]
    list_resources: bool,
}

fn widgets() -> ResourceKey {
    ResourceKey::new("example.com", "v1", "widgets")
}

fn widget_provider() -> InformerProvider {
    Arc::new(|factory: &SharedInformerFactory| {
        let key = widgets();
        factory.informer_for_key(&key, |ctx| ctx.default_informer(&key))
    })
}

fn sample_object(key: &ResourceKey, namespace: &str, index: usize) -> BoxObject {
    let api_version = GroupVersion::new(key.group(), key.version()).to_string();
    let meta = ObjectMeta::namespaced(namespace, format!("{}-{}", key.resource(), index))
        .with_label("demo", "true")
        .with_label("parity", if index % 2 == 0 { "even" } else { "odd" });
    Arc::new(
        DynamicObject::new(api_version, "Sample", meta)
            .with_data(serde_json::json!({ "spec": { "index": index } })),
    )
}

/// Mutate the source until the task is aborted.
async fn generate_changes(source: Arc<MemorySource>, key: ResourceKey, namespace: String) {
    let mut index = 1000;
    let mut ticker = tokio::time::interval(Duration::from_secs(2));
    ticker.tick().await;
    loop {
        ticker.tick().await;
        index += 1;
        source.insert(&key, sample_object(&key, &namespace, index));
        if index % 3 == 0 {
            source.remove(&key, sample_object(&key, &namespace, index - 1));
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    info!("{}", nebucloud_informers::version::version_string());

    let source = Arc::new(MemorySource::new());
    let mut builder = SharedInformerFactory::builder()
        .source(Arc::clone(&source) as Arc<dyn SourceProvider>)
        .default_resync(Duration::from_secs(args.resync_secs));
    if let Some(namespace) = &args.namespace {
        builder = builder.namespace(namespace.clone());
    }
    let factory = Arc::new(builder.build().context("building informer factory")?);

    let registry = InformerRegistry::builder()
        .factory(Arc::clone(&factory))
        .with_builtin_types()
        .register_provider(widgets(), widget_provider())
        .build()
        .context("building informer registry")?;

    if args.list_resources {
        for key in registry.keys() {
            println!("{key}");
        }
        return Ok(());
    }

    let key = ResourceKey::new(&args.group, &args.api_version, &args.resource);
    let handle = registry
        .lookup(&key)
        .with_context(|| format!("resolving {key}"))?;
    info!(resource = %handle.resource(), "resolved informer");

    let namespace = args.namespace.clone().unwrap_or_else(|| "default".to_string());
    source.seed(
        &key,
        (0..args.objects).map(|i| sample_object(&key, &namespace, i)),
    );

    let mut events = handle.informer().add_event_handler();
    factory.start().context("starting informers")?;

    let synced = factory.wait_for_cache_sync(Duration::from_secs(10)).await;
    if synced.values().any(|s| !s) {
        warn!(?synced, "some caches did not sync");
    }
    let listed = handle.lister().list(&Selector::everything());
    info!(objects = listed.len(), "cache synced");

    let even = handle.lister().list(&Selector::parse("parity=even")?);
    info!(objects = even.len(), "objects with parity=even");

    let changes = tokio::spawn(generate_changes(Arc::clone(&source), key.clone(), namespace));

    let run_for = args.run_for;
    let run_for = async move {
        match run_for {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(run_for);
    let signal = wait_for_signal();
    tokio::pin!(signal);

    info!("watching {key}, press Ctrl+C to stop");
    loop {
        tokio::select! {
            Some(event) = events.recv() => match event {
                ObjectEvent::Added(obj) => info!(name = obj.name(), "added"),
                ObjectEvent::Updated { new, .. } => info!(name = new.name(), "updated"),
                ObjectEvent::Deleted(obj) => info!(name = obj.name(), "deleted"),
            },
            result = &mut signal => {
                result.context("waiting for shutdown signal")?;
                break;
            }
            _ = &mut run_for => break,
        }
    }

    changes.abort();
    if !factory.shutdown().await {
        warn!("informers did not stop within the grace period");
    }
    info!("controller stopped");
    Ok(())
}
