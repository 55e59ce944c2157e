//! Role-based access control for DentaCare Engine
//!
//! This crate provides:
//! - The static permission catalog and the built-in roles (`admin`, `dokter`, `resepsionis`)
//! - Role management with all-or-nothing permission set replacement
//! - Idempotent startup seeding of permissions and default roles
//! - [`AccessPolicy`], the per-route role allow-list plus required permission
//!
//! # Core Concepts
//!
//! - **Permission**: a capability code such as `emr:create`, grouped by feature area
//! - **Role**: a named set of permissions; users reference roles by code
//! - **Policy**: the roles and permissions an operation demands
//!
//! # Example
//!
//! ```rust,ignore
//! use auth_rbac::{catalog::codes, AccessPolicy, RbacService};
//!
//! seeder::seed_all(&rbac).await?;
//! let policy = AccessPolicy::new(&["admin", "dokter"], &[codes::EMR_CREATE]);
//! let decision = rbac.authorize("dokter", &policy).await?;
//! assert!(decision.is_allowed());
//! ```

pub mod catalog;
pub mod error;
pub mod models;
pub mod policy;
pub mod repository;
pub mod seeder;
pub mod service;

pub use error::*;
pub use models::*;
pub use policy::{AccessDecision, AccessPolicy};
pub use repository::{
    InMemoryPermissionRepository, InMemoryRoleRepository, PermissionRepository, PostgresPermissionRepository,
    PostgresRoleRepository, RoleRepository,
};
pub use service::RbacService;
