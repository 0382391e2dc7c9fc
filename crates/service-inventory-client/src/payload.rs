//! Request bodies for create and update.
//!
//! The client owns one [`PayloadBuilder`] for its whole lifetime. The
//! default [`TemplatePayload`] produces the document layout the inventory
//! server expects; callers with a differently shaped server can inject their
//! own builder via
//! [`ServiceInventoryClient::with_payload_builder`](crate::ServiceInventoryClient::with_payload_builder).

use crate::model::{Characteristic, CharacteristicName, ServiceSpec, ServiceState};
use serde::Serialize;
use std::fmt;

/// Body of a create or update request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServicePayload {
    /// Kind of service being recorded
    #[serde(rename = "serviceType")]
    pub service_type: String,
    /// Polymorphic type tag
    #[serde(rename = "@type")]
    pub kind: String,
    /// Lifecycle state
    pub state: ServiceState,
    /// Extended attributes
    #[serde(rename = "serviceCharacteristic")]
    pub service_characteristic: Vec<Characteristic>,
}

/// Builds request bodies from caller-supplied service fields.
pub trait PayloadBuilder: fmt::Debug + Send + Sync {
    /// Build the body for a create or update request.
    fn build(&self, spec: &ServiceSpec) -> ServicePayload;
}

/// Default payload layout: one string characteristic per known name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplatePayload {
    service_type: String,
}

impl Default for TemplatePayload {
    fn default() -> Self {
        Self {
            service_type: "API".to_string(),
        }
    }
}

impl TemplatePayload {
    /// Override the `serviceType` field.
    #[must_use]
    pub fn with_service_type(mut self, service_type: impl Into<String>) -> Self {
        self.service_type = service_type.into();
        self
    }
}

impl PayloadBuilder for TemplatePayload {
    fn build(&self, spec: &ServiceSpec) -> ServicePayload {
        let service_characteristic = CharacteristicName::ALL
            .into_iter()
            .map(|name| {
                let value = match name {
                    CharacteristicName::ComponentName => &spec.component_name,
                    CharacteristicName::DependencyName => &spec.dependency_name,
                    CharacteristicName::Url => &spec.url,
                    CharacteristicName::OasSpecification => &spec.specification,
                };
                Characteristic::string(name, value.as_str())
            })
            .collect();

        ServicePayload {
            service_type: self.service_type.clone(),
            kind: "Service".to_string(),
            state: spec.state,
            service_characteristic,
        }
    }
}
