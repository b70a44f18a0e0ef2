// Application state module
// Everything a request handler needs, built once from the configuration

use std::path::PathBuf;
use std::sync::Arc;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use super::types::Config;
use crate::assets::{AssetStore, DirAssetStore};
use crate::documents::DocumentStore;
use crate::error::Result;
use crate::logger::LogBuffer;
use crate::picker::{HostQueue, PickerBroker};
use crate::routing::AssetRouter;
use crate::server::ConnectionTracker;

pub type UpstreamClient = Client<HttpConnector, Full<Bytes>>;

/// Application state
pub struct AppState {
    pub config: Config,
    pub router: Arc<AssetRouter>,
    pub log_buffer: LogBuffer,
    pub picker: PickerBroker,
    /// Launcher behind `picker`; the host UI waits on it for new requests
    pub host_queue: Arc<HostQueue>,
    /// `None` when document storage is disabled
    pub documents: Option<DocumentStore>,
    pub upstream: UpstreamClient,
    /// Open connections and tunnels, and the shutdown signal they watch
    pub connections: ConnectionTracker,
}

impl AppState {
    /// Build state serving the bundle from `shell.asset_root`
    pub fn new(config: Config, log_buffer: LogBuffer) -> Result<Self> {
        let store = DirAssetStore::new(&config.shell.asset_root)?;
        Self::with_store(config, Arc::new(store), log_buffer)
    }

    /// Build state around an explicit asset store
    pub fn with_store(
        config: Config,
        store: Arc<dyn AssetStore>,
        log_buffer: LogBuffer,
    ) -> Result<Self> {
        let router = Arc::new(AssetRouter::new(
            config.shell.virtual_domain.clone(),
            config.shell.asset_base.clone(),
            store,
        ));

        let host_queue = Arc::new(HostQueue::new());
        let picker = PickerBroker::new(
            host_queue.clone(),
            config.picker.directory_mode,
            config.picker.state_file.as_ref().map(PathBuf::from),
        );

        let documents = if config.documents.enabled {
            Some(DocumentStore::new(
                &config.documents.root,
                config.documents.title.clone(),
                config.documents.summary.clone(),
            )?)
        } else {
            None
        };

        let mut connector = HttpConnector::new();
        connector.set_nodelay(true);
        let upstream = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self {
            config,
            router,
            log_buffer,
            picker,
            host_queue,
            documents,
            upstream,
            connections: ConnectionTracker::new(),
        })
    }
}
