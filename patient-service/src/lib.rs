//! Patient registry and appointment reservations for DentaCare Engine
//!
//! Patients are addressed either by their numeric id or by the generated
//! medical-record number (`RM-<unix seconds>`). Reservations reference a
//! patient and a staff doctor whose name is snapshotted on the booking.

pub mod error;
pub mod models;
pub mod patients;
pub mod repository;
pub mod reservations;

pub use error::*;
pub use models::*;
pub use patients::PatientRegistry;
pub use repository::{
    InMemoryPatientRepository, InMemoryReservationRepository, PatientRepository, PostgresPatientRepository,
    PostgresReservationRepository, ReservationRepository,
};
pub use reservations::ReservationRegistry;
