pub mod cache;
pub mod caller;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod functions;
pub mod lifecycle;
pub mod notify;
pub mod settings;
pub mod sync;
pub mod utils;

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, LevelFilter};

pub use cache::LocalCache;
pub use caller::Caller;
pub use client::{AppState, StateCommand, Storefront, StorefrontOptions};
pub use config::StorefrontConfig;
pub use db::{Booking, BookingStatus, Database, Schema};
pub use error::{Envelope, ErrorKind, ServiceError, ServiceResult};
pub use functions::{Backend, Direction, Functions};
pub use settings::PreferencesStore;
pub use sync::{SyncState, Tracked};

/// Everything a device needs: the remote handlers, the client over them and
/// the device preferences.
pub struct App {
    pub remote: Arc<Functions>,
    pub storefront: Storefront,
    pub preferences: PreferencesStore,
}

impl App {
    pub async fn bootstrap(config: &StorefrontConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir).with_context(|| {
            format!("failed to create data directory {}", config.data_dir.display())
        })?;

        let remote_db = Database::new(config.remote_db_path(), Schema::Remote)?;
        let remote = Arc::new(Functions::new(remote_db));

        let cache = LocalCache::open(config.cache_db_path())?;
        let preferences = PreferencesStore::new(config.preferences_path())?;

        let storefront = Storefront::open(
            config.caller.clone(),
            remote.clone(),
            cache,
            StorefrontOptions::from(config),
        )
        .await?;
        storefront.set_photographer_mode(preferences.photographer_mode());

        Ok(Self {
            remote,
            storefront,
            preferences,
        })
    }
}

pub fn run() -> Result<()> {
    let config = StorefrontConfig::from_env()?;

    env_logger::Builder::from_default_env()
        .filter_level(if config.debug {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .init();

    info!("Photobook starting up with data in {}", config.data_dir.display());

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(async move {
        let app = App::bootstrap(&config).await?;

        let seeded = app.remote.init_data(&config.caller, false).await?;
        info!("{}", seeded.message);

        let works = app
            .storefront
            .load_works(functions::DEFAULT_PHOTOGRAPHER_ID, None)
            .await?;
        let bookings = app.storefront.load_bookings(Direction::Sent).await?;
        let stats = app.storefront.favorite_stats();

        info!(
            "{} works ({:?}), {} bookings ({:?}), {} favorites",
            works.items.len(),
            works.source,
            bookings.items.len(),
            bookings.source,
            stats.total
        );

        app.storefront.settle().await;
        Ok::<(), anyhow::Error>(())
    })
}
