//! Electronic medical records for DentaCare Engine
//!
//! A medical record is one clinical visit: a header plus treatment lines,
//! medication lines and an odontogram whose teeth carry a condition history.
//! Lines reference the treatment and medication catalogs by code and are
//! priced server-side.

pub mod catalog_service;
pub mod error;
pub mod models;
pub mod pricing;
pub mod record;
pub mod repository;
pub mod service;

pub use catalog_service::CatalogService;
pub use error::*;
pub use models::*;
pub use record::*;
pub use repository::{
    CatalogRepository, EmrRepository, InMemoryCatalogRepository, InMemoryEmrRepository, PostgresCatalogRepository,
    PostgresEmrRepository,
};
pub use service::{visit_id_at, EmrService};
