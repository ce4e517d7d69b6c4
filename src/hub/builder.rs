//! Assembles a [`Hub`] and starts its background workers.
//!
//! Every collaborator can be overridden; anything left unset falls back to a
//! [`SledStore`] opened at `storage.db_path` (store, stock lookup and
//! directory) and to [`HostMetricsSource`] for load metrics.
//!
//! ## Example
//! ```ignore
//! let (shutdown_tx, shutdown_rx) = watch::channel(());
//! let hub = HubBuilder::new(config, shutdown_rx)
//!     .with_backend(Arc::new(MemStore::new()))
//!     .start_metrics_server(shutdown_tx.subscribe())
//!     .build()?;
//! // ...
//! shutdown_tx.send(())?;
//! hub.shutdown().await;
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::info;
use tracing::warn;

use crate::branch::FAST_CHECK_TASK;
use crate::branch::STATS_REFRESH_TASK;
use crate::branch::SWEEP_TASK;
use crate::metrics;
use crate::notification::JANITOR_TASK;
use crate::utils::async_task::spawn_task;
use crate::BranchRecord;
use crate::BranchRegistry;
use crate::CallbackJanitor;
use crate::CallbackRegistry;
use crate::Directory;
use crate::HealthMonitor;
use crate::HostMetricsSource;
use crate::Hub;
use crate::HubConfig;
use crate::MetricsSource;
use crate::NotificationDispatcher;
use crate::PersistentStore;
use crate::Result;
use crate::Selector;
use crate::SledStore;
use crate::StatsRefresher;
use crate::StockLookup;

pub struct HubBuilder {
    config: HubConfig,
    store: Option<Arc<dyn PersistentStore>>,
    stock: Option<Arc<dyn StockLookup>>,
    directory: Option<Arc<dyn Directory>>,
    metrics_source: Option<Arc<dyn MetricsSource>>,
    shutdown_signal: watch::Receiver<()>,
}

impl HubBuilder {
    /// `config` is expected to be validated already.
    pub fn new(
        config: HubConfig,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        Self {
            config,
            store: None,
            stock: None,
            directory: None,
            metrics_source: None,
            shutdown_signal,
        }
    }

    /// Uses one adaptor as store, stock lookup and directory.
    pub fn with_backend<S>(
        mut self,
        backend: Arc<S>,
    ) -> Self
    where
        S: PersistentStore + StockLookup + Directory,
    {
        self.store = Some(backend.clone());
        self.stock = Some(backend.clone());
        self.directory = Some(backend);
        self
    }

    pub fn with_store(
        mut self,
        store: Arc<dyn PersistentStore>,
    ) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_stock_lookup(
        mut self,
        stock: Arc<dyn StockLookup>,
    ) -> Self {
        self.stock = Some(stock);
        self
    }

    pub fn with_directory(
        mut self,
        directory: Arc<dyn Directory>,
    ) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn with_metrics_source(
        mut self,
        metrics_source: Arc<dyn MetricsSource>,
    ) -> Self {
        self.metrics_source = Some(metrics_source);
        self
    }

    /// Launches the Prometheus endpoint when enabled in the config.
    pub fn start_metrics_server(
        self,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        if !self.config.monitoring.metrics_enabled {
            info!("metrics exporter disabled");
            return self;
        }
        let port = self.config.monitoring.prometheus_port;
        tokio::spawn(async move {
            metrics::start_server(port, shutdown_signal).await;
        });
        self
    }

    /// Wires every component, registers the configured branches and spawns
    /// the four background workers.
    ///
    /// # Errors
    /// Opening the default sled store, or registering a seed branch, failed.
    pub fn build(self) -> Result<Arc<Hub>> {
        let HubBuilder {
            config,
            store,
            stock,
            directory,
            metrics_source,
            shutdown_signal,
        } = self;

        let (store, stock, directory) = match (store, stock, directory) {
            (Some(store), Some(stock), Some(directory)) => (store, stock, directory),
            (store, stock, directory) => {
                let sled = Arc::new(SledStore::open(&config.storage.db_path)?);
                (
                    store.unwrap_or_else(|| sled.clone() as Arc<dyn PersistentStore>),
                    stock.unwrap_or_else(|| sled.clone() as Arc<dyn StockLookup>),
                    directory.unwrap_or_else(|| sled as Arc<dyn Directory>),
                )
            }
        };
        let metrics_source =
            metrics_source.unwrap_or_else(|| Arc::new(HostMetricsSource::new()) as Arc<dyn MetricsSource>);

        let registry = Arc::new(BranchRegistry::new());
        for seed in &config.cluster.branches {
            registry.register(BranchRecord::new(&seed.name, &seed.host, seed.port))?;
        }

        let callbacks = Arc::new(CallbackRegistry::new());
        let health_monitor = HealthMonitor::new(registry.clone(), &config.monitor);
        let stats_refresher =
            StatsRefresher::new(registry.clone(), store.clone(), metrics_source, &config.monitor);
        let selector = Selector::new(registry.clone(), stock, &config.monitor);
        let dispatcher =
            NotificationDispatcher::new(store, directory, callbacks.clone(), &config.notification);
        let janitor = CallbackJanitor::new(callbacks, &config.notification);

        let mut handles = Vec::with_capacity(4);
        {
            let monitor = health_monitor.clone();
            let rx = shutdown_signal.clone();
            spawn_task(
                SWEEP_TASK,
                move || async move {
                    monitor.run_sweep(rx).await;
                    Ok(())
                },
                Some(&mut handles),
            );
        }
        {
            let monitor = health_monitor.clone();
            let rx = shutdown_signal.clone();
            spawn_task(
                FAST_CHECK_TASK,
                move || async move {
                    monitor.run_fast_check(rx).await;
                    Ok(())
                },
                Some(&mut handles),
            );
        }
        {
            let refresher = stats_refresher.clone();
            let rx = shutdown_signal.clone();
            spawn_task(
                STATS_REFRESH_TASK,
                move || async move {
                    refresher.run(rx).await;
                    Ok(())
                },
                Some(&mut handles),
            );
        }
        {
            let janitor = janitor.clone();
            let rx = shutdown_signal;
            spawn_task(
                JANITOR_TASK,
                move || async move {
                    janitor.run(rx).await;
                    Ok(())
                },
                Some(&mut handles),
            );
        }

        if registry.is_empty() {
            warn!("hub started without seed branches");
        }
        info!(
            branches = registry.len(),
            workers = handles.len(),
            "branch hub started"
        );

        Ok(Arc::new(Hub {
            config: Arc::new(config),
            registry,
            selector,
            health_monitor,
            stats_refresher,
            dispatcher,
            janitor,
            workers: Mutex::new(handles),
        }))
    }
}
