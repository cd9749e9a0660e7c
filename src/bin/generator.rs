use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use dotenvy::dotenv;
use tokio::sync::watch;
use tracing::{info, warn};

use logpipe::config::{GeneratorConfig, StorageKind};
use logpipe::control_api::{self, ControlState};
use logpipe::engine::{Engine, EngineConfig};
use logpipe::http_sink::{HttpSink, HttpSinkConfig};
use logpipe::random_source::RandomSource;
use logpipe::sink::{ConsoleSink, Sink};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv();
    logpipe::init_tracing();

    let cfg = GeneratorConfig::load(parse_config_arg())?;
    info!(
        "loaded config -> workers: {}, default_rate: {}",
        cfg.engine.workers, cfg.engine.default_rate
    );

    let sink: Arc<dyn Sink> = match cfg.storage.kind {
        StorageKind::Console => Arc::new(ConsoleSink::new()),
        StorageKind::Http => {
            // validate() guarantees the http section is present.
            let http = cfg
                .storage
                .http
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("storage.http missing"))?;
            Arc::new(HttpSink::new(HttpSinkConfig {
                url: http.url.clone().into(),
                timeout: http.timeout(),
                disable_keepalive: http.disable_keepalive,
            })?)
        }
    };

    let source = Arc::new(RandomSource::new(cfg.generator.clone())?);
    let engine = Arc::new(Engine::new(
        source.clone(),
        sink,
        EngineConfig {
            workers: cfg.engine.workers,
            default_rate: cfg.engine.default_rate,
            batch_size: cfg.engine.batch_size,
            flush_interval: cfg.engine.flush_interval(),
        },
    ));

    let control = control_api::router(ControlState {
        engine: engine.clone(),
        source: source.clone(),
    });
    let control_addr = cfg.control_addr.clone();
    tokio::spawn(async move {
        info!("control api listening on {control_addr}");
        if let Err(err) = control_api::serve(&control_addr, control).await {
            warn!("control api error: {err:?}");
        }
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        logpipe::shutdown_signal().await;
        info!("received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    info!("log generator started with {} workers", cfg.engine.workers);
    engine.run(shutdown_rx).await
}

fn parse_config_arg() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
        if let Some(path) = arg.strip_prefix("--config=") {
            return Some(PathBuf::from(path));
        }
    }
    None
}
