//! Configuration models for the lock manager.

pub mod manager;

pub use manager::ManagerConfig;
