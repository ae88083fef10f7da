use sqlx::PgPool;

use crate::config;
use crate::db::Stores;
use crate::services::AppointmentService;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub env: config::Config,
    pub stores: Stores,
    pub scheduler: AppointmentService,
}

impl AppState {
    pub fn new(db: PgPool, env: config::Config) -> Self {
        let stores = Stores::postgres(db.clone());
        let scheduler = AppointmentService::new(stores.clone());
        Self {
            db,
            env,
            stores,
            scheduler,
        }
    }
}
