//! # Service Inventory Client
//!
//! Client for a TMForum `serviceInventoryManagement` (v5 style) REST API.
//!
//! Each service records a dependency between two software components: a
//! consumer (`componentName`) and the component it relies on
//! (`dependencyName`), together with the dependency's API URL, a reference
//! to its OpenAPI specification, and a lifecycle state.
//!
//! ## Operations
//!
//! | Operation | Method | Path | Success |
//! |---|---|---|---|
//! | create | POST | `/service` | 201 |
//! | list | GET | `/service` | 200 |
//! | get | GET | `/service/{id}` | 200 |
//! | update | PATCH | `/service/{id}` | 200 |
//! | delete | DELETE | `/service/{id}` | 204 |
//!
//! Responses are flattened from the API's characteristic list into a
//! [`ServiceRecord`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod model;
pub mod payload;
pub mod smoke;

pub use client::{
    ClientError, Operation, ServiceInventoryClient, ServiceInventoryConfig, DEFAULT_ENDPOINT,
};
pub use model::{
    shorten, Characteristic, CharacteristicName, RawService, ServiceQuery, ServiceRecord,
    ServiceSpec, ServiceState,
};
pub use payload::{PayloadBuilder, ServicePayload, TemplatePayload};
pub use smoke::{run_lifecycle, LifecycleError, LifecycleReport};
