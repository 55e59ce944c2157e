pub mod access;
pub mod auth;
pub mod emr;
pub mod health;
pub mod master;
pub mod patients;
pub mod reservations;
pub mod users;
