use std::sync::Arc;

use crate::config::Config;
use crate::db::{Store, seed};
use crate::services::{
    AuthService, OccupancyService, RepairService, SeaOrmAuthService, SeaOrmOccupancyService,
    SeaOrmRepairService, UploadStore,
};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub uploads: UploadStore,

    pub auth_service: Arc<dyn AuthService>,

    pub occupancy_service: Arc<dyn OccupancyService>,

    pub repair_service: Arc<dyn RepairService>,
}

impl SharedState {
    /// Connects the store, applies migrations and seeds an empty database.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        seed::seed_if_empty(&store, &config).await?;

        Ok(Self::with_store(config, store))
    }

    #[must_use]
    pub fn with_store(config: Config, store: Store) -> Self {
        let uploads = UploadStore::new(
            config.general.uploads_path.clone(),
            config.repairs.max_image_bytes,
        );

        let auth_service = Arc::new(SeaOrmAuthService::new(store.clone(), config.clone()))
            as Arc<dyn AuthService + Send + Sync + 'static>;

        let occupancy_service = Arc::new(SeaOrmOccupancyService::new(
            store.clone(),
            config.clone(),
            uploads.clone(),
        )) as Arc<dyn OccupancyService + Send + Sync + 'static>;

        let repair_service = Arc::new(SeaOrmRepairService::new(
            store.clone(),
            config.clone(),
            uploads.clone(),
        )) as Arc<dyn RepairService + Send + Sync + 'static>;

        Self {
            config: Arc::new(config),
            store,
            uploads,
            auth_service,
            occupancy_service,
            repair_service,
        }
    }
}
