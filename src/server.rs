//! Concurrency core: a single acceptor task per running listener, a
//! catalog snapshot behind an atomic swap, and scan/start/stop/restart
//! state transitions that are mutually exclusive with each other.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::catalog::Catalog;
use crate::config::Config;
use crate::http::{self, AppState};
use crate::ingest::{self, ScanReport};

pub struct Registry {
    config: Config,
    catalog: Arc<ArcSwap<Catalog>>,
    /// Guards start/stop/restart/scan so they never overlap; a running
    /// scan and a running server never observe each other mid-transition.
    lifecycle: Mutex<Lifecycle>,
    last_scan: ArcSwap<ScanReport>,
}

#[derive(Default)]
struct Lifecycle {
    listeners: Vec<JoinHandle<()>>,
    shutdown: Vec<tokio::sync::oneshot::Sender<()>>,
}

impl Registry {
    pub fn new(config: Config) -> Self {
        Registry {
            config,
            catalog: Arc::new(ArcSwap::from_pointee(Catalog::new())),
            lifecycle: Mutex::new(Lifecycle::default()),
            last_scan: ArcSwap::from_pointee(ScanReport::default()),
        }
    }

    pub fn is_running(&self) -> bool {
        !self.lifecycle.try_lock().map(|l| l.listeners.is_empty()).unwrap_or(true)
    }

    /// Rebuilds the catalog from the packages directory. Scanning and
    /// serving are mutually exclusive: the shell's `scan` command stops any
    /// running listeners before calling this and restarts them afterward.
    /// This function itself does not check `is_running` — the catalog swap
    /// is safe to call at any time, but a scan run concurrently with a live
    /// listener would violate the "serving pauses during a scan" guarantee,
    /// so callers besides the shell must replicate that stop/scan/restart
    /// sequence.
    pub fn scan(&self) -> ScanReport {
        let extensions = self.config.normalized_extensions();
        let (catalog, report) = ingest::scan(&self.config.packages_dir(), &extensions);
        tracing::info!(
            packages = catalog.len(),
            candidate_files = report.candidate_files,
            ingested_versions = report.ingested_versions,
            errors = report.errors.len(),
            "scan complete"
        );
        for err in &report.errors {
            tracing::error!(%err, "ingestion error");
        }
        self.catalog.store(Arc::new(catalog));
        self.last_scan.store(Arc::new(report.clone()));
        report
    }

    pub fn catalog_len(&self) -> usize {
        self.catalog.load().len()
    }

    pub fn last_scan_report(&self) -> ScanReport {
        (**self.last_scan.load()).clone()
    }

    pub async fn start(&self) -> anyhow::Result<usize> {
        let mut lifecycle = self.lifecycle.lock().await;
        if !lifecycle.listeners.is_empty() {
            anyhow::bail!("server is already running");
        }

        let endpoints = self.config.normalized_endpoints();
        let mut started = 0;
        for endpoint in &endpoints {
            let url = url::Url::parse(endpoint)?;
            let host = url.host_str().unwrap_or("localhost");
            let port = url.port_or_known_default().unwrap_or(80);
            let addr = format!("{host}:{port}");

            let listener = TcpListener::bind(&addr).await?;
            tracing::info!(%addr, "listening");

            let state = AppState { catalog: self.catalog.clone(), packages_dir: self.config.packages_dir() };
            let app = http::router(state);

            let (tx, rx) = tokio::sync::oneshot::channel();
            let handle = tokio::spawn(async move {
                let _ = axum::serve(listener, app).with_graceful_shutdown(async {
                    let _ = rx.await;
                }).await;
            });

            lifecycle.listeners.push(handle);
            lifecycle.shutdown.push(tx);
            started += 1;
        }

        Ok(started)
    }

    pub async fn stop(&self) -> anyhow::Result<()> {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.listeners.is_empty() {
            anyhow::bail!("server is not running");
        }
        for tx in lifecycle.shutdown.drain(..) {
            let _ = tx.send(());
        }
        for handle in lifecycle.listeners.drain(..) {
            let _ = handle.await;
        }
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
