//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept `&PgPool` as the first argument.

pub mod failure_repo;
pub mod ingenio_repo;
pub mod kpi_repo;
pub mod machine_repo;
pub mod reading_repo;
pub mod sensor_repo;

pub use failure_repo::FailureRepo;
pub use ingenio_repo::IngenioRepo;
pub use kpi_repo::KpiRepo;
pub use machine_repo::MachineRepo;
pub use reading_repo::ReadingRepo;
pub use sensor_repo::SensorRepo;
