//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundary
//! between the application and the record store.

mod storage;

pub use storage::{PatientSession, PatientStore};
