//! Entity models and views.
//!
//! Each submodule contains a `FromRow` entity struct matching the database
//! row plus any derived views the handlers serialize.

pub mod failure;
pub mod ingenio;
pub mod kpi;
pub mod machine;
pub mod sensor;
