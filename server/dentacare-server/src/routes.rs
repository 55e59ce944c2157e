use axum::{
    routing::{get, post},
    Router,
};
use crate::{
    handlers::{access, auth, emr, health, master, patients, reservations, users},
    server::ClinicServer,
};

/// Route paths shared by the router and its tests.
pub mod paths {
    pub const PING: &str = "/ping";
    pub const HEALTH: &str = "/health";
    pub const API_V1: &str = "/api/v1";
}

/// Liveness routes (no authentication required)
pub fn health_routes() -> Router<ClinicServer> {
    Router::new()
        .route(paths::PING, get(health::ping))
        .route(paths::HEALTH, get(health::health_check))
}

/// Login and the caller's own profile
pub fn auth_routes() -> Router<ClinicServer> {
    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/me", get(auth::me))
}

/// Staff accounts, roles and the permission catalog
pub fn admin_routes() -> Router<ClinicServer> {
    Router::new()
        .route("/admin/users", get(users::list_users))
        .route("/admin/users/register", post(users::register_user))
        .route(
            "/admin/users/:id",
            get(users::get_user).put(users::update_user).delete(users::delete_user),
        )
        .route("/admin/access/roles", get(access::list_roles).post(access::create_role))
        .route(
            "/admin/access/roles/:id",
            get(access::get_role).put(access::update_role).delete(access::delete_role),
        )
        .route("/admin/access/permissions", get(access::list_permissions))
}

/// Patient registry; `:key` is an id or a `noRm`
pub fn patient_routes() -> Router<ClinicServer> {
    Router::new()
        .route("/pasien", get(patients::list_patients).post(patients::create_patient))
        .route(
            "/pasien/:key",
            get(patients::get_patient)
                .put(patients::update_patient)
                .delete(patients::delete_patient),
        )
}

/// Medical records; `:key` is an id or a visit id
pub fn emr_routes() -> Router<ClinicServer> {
    Router::new()
        .route("/emr", post(emr::create_emr))
        .route("/emr/pasien/:patient_id", get(emr::list_patient_emr))
        .route("/emr/:key", get(emr::get_emr).put(emr::update_emr))
}

pub fn reservation_routes() -> Router<ClinicServer> {
    Router::new()
        .route(
            "/reservasi",
            get(reservations::list_reservations).post(reservations::create_reservation),
        )
        .route(
            "/reservasi/:id",
            get(reservations::get_reservation).put(reservations::update_reservation),
        )
        .route("/reservasi/:id/confirm", post(reservations::confirm_reservation))
        .route("/reservasi/:id/cancel", post(reservations::cancel_reservation))
}

/// Treatment and medication catalogs
pub fn master_routes() -> Router<ClinicServer> {
    Router::new()
        .route(
            "/master/treatments",
            get(master::list_treatments).post(master::create_treatment),
        )
        .route(
            "/master/treatments/:id",
            get(master::get_treatment)
                .put(master::update_treatment)
                .delete(master::delete_treatment),
        )
        .route(
            "/master/medications",
            get(master::list_medications).post(master::create_medication),
        )
        .route(
            "/master/medications/:id",
            get(master::get_medication)
                .put(master::update_medication)
                .delete(master::delete_medication),
        )
}

/// Every versioned route; all of them except login and liveness require a bearer token
pub fn api_v1_routes() -> Router<ClinicServer> {
    Router::new()
        .merge(health_routes())
        .merge(auth_routes())
        .merge(admin_routes())
        .merge(patient_routes())
        .merge(emr_routes())
        .merge(reservation_routes())
        .merge(master_routes())
}

/// Create the complete router. Liveness is also served unversioned for orchestrators.
pub fn create_routes() -> Router<ClinicServer> {
    Router::new()
        .merge(health_routes())
        .nest(paths::API_V1, api_v1_routes())
}
