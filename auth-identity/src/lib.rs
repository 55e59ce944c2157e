//! Clinic staff identity for DentaCare Engine
//!
//! This crate provides:
//! - User accounts with case-insensitive unique username and email
//! - bcrypt credential hashing with a configurable cost
//! - HS256 access tokens carrying user id, username and role
//! - The login flow and admin-side user management
//!
//! Roles live in the RBAC crate; this crate only sees them through the
//! [`RoleDirectory`] trait.
//!
//! # Example
//!
//! ```rust,ignore
//! use auth_identity::{IdentityConfig, IdentityService, InMemoryUserRepository, LoginRequest};
//! use std::sync::Arc;
//!
//! let service = IdentityService::new(Arc::new(InMemoryUserRepository::new()), role_directory, IdentityConfig::default())?;
//! let login = service
//!     .authenticate(&LoginRequest { username: "sari".into(), password: "rahasia".into(), role: "dokter".into() })
//!     .await?;
//! let claims = service.verify_token(&login.token)?;
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod password;
pub mod repository;
pub mod roles;
pub mod service;
pub mod tokens;

pub use config::*;
pub use error::*;
pub use models::*;
pub use password::PasswordHasher;
pub use repository::{InMemoryUserRepository, PostgresUserRepository, UserRepository};
pub use roles::RoleDirectory;
pub use service::*;
pub use tokens::{IssuedToken, TokenService};
