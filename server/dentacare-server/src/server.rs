use crate::config::AppConfig;
use auth_identity::{
    IdentityConfig, IdentityService, InMemoryUserRepository, PostgresUserRepository, RoleDirectory, UserRepository,
};
use auth_rbac::{
    InMemoryPermissionRepository, InMemoryRoleRepository, PermissionRepository, PostgresPermissionRepository,
    PostgresRoleRepository, RbacService, RoleRepository,
};
use database_layer::DatabasePool;
use emr_service::{
    CatalogRepository, CatalogService, EmrRepository, EmrService, InMemoryCatalogRepository, InMemoryEmrRepository,
    PostgresCatalogRepository, PostgresEmrRepository,
};
use patient_service::{
    InMemoryPatientRepository, InMemoryReservationRepository, PatientRegistry, PatientRepository,
    PostgresPatientRepository, PostgresReservationRepository, ReservationRegistry, ReservationRepository,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Application state handed to every handler.
#[derive(Clone)]
pub struct ClinicServer {
    pub config: Arc<AppConfig>,
    /// Absent when the server runs on in-memory stores.
    pub pool: Option<DatabasePool>,
    pub identity: Arc<IdentityService>,
    pub rbac: Arc<RbacService>,
    pub patients: Arc<PatientRegistry>,
    pub reservations: Arc<ReservationRegistry>,
    pub catalogs: Arc<CatalogService>,
    pub emr: Arc<EmrService>,
    pub started_at: Instant,
}

/// Storage for every service.
struct Stores {
    users: Arc<dyn UserRepository>,
    permissions: Arc<dyn PermissionRepository>,
    roles: Arc<dyn RoleRepository>,
    patients: Arc<dyn PatientRepository>,
    reservations: Arc<dyn ReservationRepository>,
    catalogs: Arc<dyn CatalogRepository>,
    records: Arc<dyn EmrRepository>,
}

impl ClinicServer {
    /// Connect to PostgreSQL and build the services on top of it.
    pub async fn connect(config: AppConfig) -> anyhow::Result<Self> {
        let pool = DatabasePool::connect(&config.database()).await?;
        info!(max_connections = config.db_max_connections, "Database pool ready");

        let stores = Stores {
            users: Arc::new(PostgresUserRepository::new(pool.clone())),
            permissions: Arc::new(PostgresPermissionRepository::new(pool.clone())),
            roles: Arc::new(PostgresRoleRepository::new(pool.clone())),
            patients: Arc::new(PostgresPatientRepository::new(pool.clone())),
            reservations: Arc::new(PostgresReservationRepository::new(pool.clone())),
            catalogs: Arc::new(PostgresCatalogRepository::new(pool.clone())),
            records: Arc::new(PostgresEmrRepository::new(pool.clone())),
        };
        Self::assemble(config, Some(pool), stores)
    }

    /// Services over in-memory stores. Nothing is persisted.
    pub fn in_memory(config: AppConfig) -> anyhow::Result<Self> {
        let users = Arc::new(InMemoryUserRepository::new());
        let permissions = Arc::new(InMemoryPermissionRepository::new());
        let roles = InMemoryRoleRepository::new(Arc::clone(&permissions)).with_users(users.clone());

        let stores = Stores {
            users,
            permissions,
            roles: Arc::new(roles),
            patients: Arc::new(InMemoryPatientRepository::new()),
            reservations: Arc::new(InMemoryReservationRepository::new()),
            catalogs: Arc::new(InMemoryCatalogRepository::new()),
            records: Arc::new(InMemoryEmrRepository::new()),
        };
        Self::assemble(config, None, stores)
    }

    fn assemble(config: AppConfig, pool: Option<DatabasePool>, stores: Stores) -> anyhow::Result<Self> {
        let identity_config: IdentityConfig = config.identity();

        let rbac = Arc::new(RbacService::new(stores.permissions, stores.roles));
        let role_directory: Arc<dyn RoleDirectory> = rbac.clone();
        let identity = Arc::new(IdentityService::new(
            Arc::clone(&stores.users),
            role_directory,
            identity_config,
        )?);

        let patients = Arc::new(PatientRegistry::new(Arc::clone(&stores.patients)));
        let reservations = Arc::new(ReservationRegistry::new(
            stores.reservations,
            Arc::clone(&stores.patients),
            Arc::clone(&stores.users),
        ));
        let catalogs = Arc::new(CatalogService::new(Arc::clone(&stores.catalogs)));
        let emr = Arc::new(EmrService::new(
            stores.records,
            stores.catalogs,
            stores.patients,
            stores.users,
        ));

        Ok(Self {
            config: Arc::new(config),
            pool,
            identity,
            rbac,
            patients,
            reservations,
            catalogs,
            emr,
            started_at: Instant::now(),
        })
    }

    /// Database health; in-memory servers are always healthy.
    pub async fn database_healthy(&self) -> bool {
        match &self.pool {
            Some(pool) => pool.is_healthy().await,
            None => true,
        }
    }
}
