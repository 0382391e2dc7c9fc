//! Service records and their wire representation.
//!
//! The inventory API stores the interesting attributes of a service as a
//! list of generic characteristics:
//!
//! ```json
//! {
//!   "id": "5406c1d2-8df8-4e35-bdfc-73548b8bffac",
//!   "state": "active",
//!   "serviceCharacteristic": [
//!     {"name": "componentName", "valueType": "string", "value": "acme-productinventory", "@type": "StringCharacteristic"},
//!     {"name": "dependencyName", "valueType": "string", "value": "downstreamproductcatalog", "@type": "StringCharacteristic"}
//!   ]
//! }
//! ```
//!
//! [`shorten`] maps that shape onto the flat [`ServiceRecord`].

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    /// The dependency is in use
    Active,
    /// The dependency is recorded but not in use
    Inactive,
}

impl ServiceState {
    /// Wire representation of the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceState {
    type Err = ParseStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            other => Err(ParseStateError(other.to_string())),
        }
    }
}

/// Error returned when a string is not a known [`ServiceState`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown service state: {0} (expected \"active\" or \"inactive\")")]
pub struct ParseStateError(pub String);

/// The characteristics a service record understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharacteristicName {
    /// Identifier of the consuming component
    ComponentName,
    /// Identifier of the component being depended upon
    DependencyName,
    /// Base URL at which the dependency's API is exposed
    Url,
    /// Reference to the dependency's OpenAPI specification
    OasSpecification,
}

impl CharacteristicName {
    /// All known names, in payload order.
    pub const ALL: [Self; 4] = [
        Self::ComponentName,
        Self::DependencyName,
        Self::Url,
        Self::OasSpecification,
    ];

    /// Name written to the `serviceCharacteristic` list.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ComponentName => "componentName",
            Self::DependencyName => "dependencyName",
            Self::Url => "url",
            Self::OasSpecification => "OASSpecification",
        }
    }

    /// Resolve a characteristic label read from the server.
    ///
    /// `"OAS Specification"` is accepted as an alias, older records carry it.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "componentName" => Some(Self::ComponentName),
            "dependencyName" => Some(Self::DependencyName),
            "url" => Some(Self::Url),
            "OASSpecification" | "OAS Specification" => Some(Self::OasSpecification),
            _ => None,
        }
    }
}

impl fmt::Display for CharacteristicName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a `serviceCharacteristic` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Characteristic {
    /// Characteristic name
    pub name: String,
    /// Declared value type (e.g. `"string"`)
    #[serde(rename = "valueType", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    /// Characteristic value
    #[serde(default)]
    pub value: Value,
    /// Polymorphic type tag (e.g. `"StringCharacteristic"`)
    #[serde(rename = "@type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Characteristic {
    /// A string-valued characteristic.
    #[must_use]
    pub fn string(name: CharacteristicName, value: impl Into<String>) -> Self {
        Self {
            name: name.as_str().to_string(),
            value_type: Some("string".to_string()),
            value: Value::String(value.into()),
            kind: Some("StringCharacteristic".to_string()),
        }
    }
}

/// A service as returned by the inventory API.
///
/// Fields the client does not use are ignored on deserialization.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawService {
    /// Server-assigned identifier
    #[serde(default)]
    pub id: Option<String>,
    /// Lifecycle state; states outside [`ServiceState`] read as `None`
    #[serde(default, deserialize_with = "lenient_state")]
    pub state: Option<ServiceState>,
    /// Extended attributes
    #[serde(rename = "serviceCharacteristic", default)]
    pub service_characteristic: Option<Vec<Characteristic>>,
}

// Inventories shared with other tools hold records in states such as
// `terminated` or `designed`; those must not fail a whole list response.
fn lenient_state<'de, D>(deserializer: D) -> Result<Option<ServiceState>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(raw)) => match raw.parse() {
            Ok(state) => Some(state),
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring unrecognized service state");
                None
            }
        },
        Some(other) => {
            tracing::debug!(state = %other, "Ignoring non-string service state");
            None
        }
    })
}

/// Flattened, client-facing view of a service.
///
/// Every field is optional: an attribute missing from the server's
/// response is simply absent here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    /// Server-assigned identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Lifecycle state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ServiceState>,
    /// Consuming component
    #[serde(rename = "componentName", default, skip_serializing_if = "Option::is_none")]
    pub component_name: Option<String>,
    /// Component depended upon
    #[serde(rename = "dependencyName", default, skip_serializing_if = "Option::is_none")]
    pub dependency_name: Option<String>,
    /// Base URL of the dependency's API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// OpenAPI specification reference
    #[serde(rename = "OASSpecification", default, skip_serializing_if = "Option::is_none")]
    pub oas_specification: Option<String>,
}

impl ServiceRecord {
    /// Value of a characteristic field.
    #[must_use]
    pub fn characteristic(&self, name: CharacteristicName) -> Option<&str> {
        match name {
            CharacteristicName::ComponentName => self.component_name.as_deref(),
            CharacteristicName::DependencyName => self.dependency_name.as_deref(),
            CharacteristicName::Url => self.url.as_deref(),
            CharacteristicName::OasSpecification => self.oas_specification.as_deref(),
        }
    }

    fn set_characteristic(&mut self, name: CharacteristicName, value: String) {
        let slot = match name {
            CharacteristicName::ComponentName => &mut self.component_name,
            CharacteristicName::DependencyName => &mut self.dependency_name,
            CharacteristicName::Url => &mut self.url,
            CharacteristicName::OasSpecification => &mut self.oas_specification,
        };
        *slot = Some(value);
    }

    /// The fields needed to resend this record in an update.
    ///
    /// Returns `None` if the record lacks a state or any characteristic.
    #[must_use]
    pub fn to_spec(&self) -> Option<ServiceSpec> {
        Some(ServiceSpec {
            component_name: self.component_name.clone()?,
            dependency_name: self.dependency_name.clone()?,
            url: self.url.clone()?,
            specification: self.oas_specification.clone()?,
            state: self.state?,
        })
    }
}

impl From<RawService> for ServiceRecord {
    fn from(raw: RawService) -> Self {
        shorten(raw)
    }
}

/// Flatten a raw service into a [`ServiceRecord`].
///
/// Characteristic order does not matter. Unknown names are skipped, and when
/// a name repeats the last entry wins.
#[must_use]
pub fn shorten(raw: RawService) -> ServiceRecord {
    let mut record = ServiceRecord {
        id: raw.id,
        state: raw.state,
        ..ServiceRecord::default()
    };

    for entry in raw.service_characteristic.into_iter().flatten() {
        let Some(name) = CharacteristicName::from_label(&entry.name) else {
            tracing::debug!(name = %entry.name, "Skipping unknown service characteristic");
            continue;
        };
        if let Some(value) = characteristic_text(entry.value) {
            record.set_characteristic(name, value);
        }
    }

    record
}

fn characteristic_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Caller-supplied fields of a service, sent on create and update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    /// Consuming component
    pub component_name: String,
    /// Component depended upon
    pub dependency_name: String,
    /// Base URL of the dependency's API
    pub url: String,
    /// OpenAPI specification reference
    pub specification: String,
    /// Lifecycle state
    pub state: ServiceState,
}

impl ServiceSpec {
    /// Create a service spec.
    #[must_use]
    pub fn new(
        component_name: impl Into<String>,
        dependency_name: impl Into<String>,
        url: impl Into<String>,
        specification: impl Into<String>,
        state: ServiceState,
    ) -> Self {
        Self {
            component_name: component_name.into(),
            dependency_name: dependency_name.into(),
            url: url.into(),
            specification: specification.into(),
            state,
        }
    }

    /// The same spec with a different state.
    #[must_use]
    pub fn with_state(mut self, state: ServiceState) -> Self {
        self.state = state;
        self
    }
}

/// Filter for listing services.
///
/// The server can only filter on a single characteristic value, so the
/// component and dependency filters are also applied client-side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceQuery {
    /// Only services of this consuming component
    pub component_name: Option<String>,
    /// Only services depending on this component
    pub dependency_name: Option<String>,
    /// Only services in this state; `None` lists all states
    pub state: Option<ServiceState>,
}

impl Default for ServiceQuery {
    fn default() -> Self {
        Self {
            component_name: None,
            dependency_name: None,
            state: Some(ServiceState::Active),
        }
    }
}

impl ServiceQuery {
    /// A query without any state filter.
    #[must_use]
    pub fn all_states() -> Self {
        Self {
            state: None,
            ..Self::default()
        }
    }

    /// Restrict to a consuming component.
    #[must_use]
    pub fn component(mut self, name: impl Into<String>) -> Self {
        self.component_name = Some(name.into());
        self
    }

    /// Restrict to a dependency.
    #[must_use]
    pub fn dependency(mut self, name: impl Into<String>) -> Self {
        self.dependency_name = Some(name.into());
        self
    }

    /// Set or clear the state filter.
    #[must_use]
    pub fn state(mut self, state: Option<ServiceState>) -> Self {
        self.state = state;
        self
    }

    // Empty names count as "no filter".
    fn component_filter(&self) -> Option<&str> {
        self.component_name.as_deref().filter(|s| !s.is_empty())
    }

    fn dependency_filter(&self) -> Option<&str> {
        self.dependency_name.as_deref().filter(|s| !s.is_empty())
    }

    /// Query parameters sent to the server.
    #[must_use]
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(state) = self.state {
            params.push(("state", state.as_str().to_string()));
        }
        if let Some(value) = self.component_filter().or_else(|| self.dependency_filter()) {
            params.push(("serviceCharacteristic.value", value.to_string()));
        }
        params
    }

    /// Whether a record passes the component and dependency filters.
    ///
    /// The state filter is left to the server.
    #[must_use]
    pub fn matches(&self, record: &ServiceRecord) -> bool {
        [
            (CharacteristicName::ComponentName, self.component_filter()),
            (CharacteristicName::DependencyName, self.dependency_filter()),
        ]
        .into_iter()
        .all(|(name, wanted)| wanted.map_or(true, |w| record.characteristic(name) == Some(w)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawService {
        serde_json::from_value(value).unwrap()
    }

    fn record(component: &str, dependency: &str) -> ServiceRecord {
        ServiceRecord {
            component_name: Some(component.to_string()),
            dependency_name: Some(dependency.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn shorten_full_record() {
        let svc = raw(json!({
            "id": "5406c1d2-8df8-4e35-bdfc-73548b8bffac",
            "href": "https://example.org/service/5406c1d2",
            "serviceType": "API",
            "state": "active",
            "serviceCharacteristic": [
                {"name": "componentName", "valueType": "string", "value": "acme-productinventory", "@type": "StringCharacteristic"},
                {"name": "dependencyName", "valueType": "string", "value": "downstreamproductcatalog", "@type": "StringCharacteristic"},
                {"name": "url", "valueType": "string", "value": "http://localhost/acme/tmf-api/productCatalogManagement/v4", "@type": "StringCharacteristic"},
                {"name": "OASSpecification", "valueType": "string", "value": "https://example.org/TMF620.swagger.json", "@type": "StringCharacteristic"}
            ]
        }));

        let record = shorten(svc);
        assert_eq!(record.id.as_deref(), Some("5406c1d2-8df8-4e35-bdfc-73548b8bffac"));
        assert_eq!(record.state, Some(ServiceState::Active));
        assert_eq!(record.component_name.as_deref(), Some("acme-productinventory"));
        assert_eq!(record.dependency_name.as_deref(), Some("downstreamproductcatalog"));
        assert_eq!(
            record.url.as_deref(),
            Some("http://localhost/acme/tmf-api/productCatalogManagement/v4")
        );
        assert_eq!(
            record.oas_specification.as_deref(),
            Some("https://example.org/TMF620.swagger.json")
        );
    }

    #[test]
    fn shorten_ignores_characteristic_order() {
        let forward = raw(json!({
            "id": "a",
            "state": "inactive",
            "serviceCharacteristic": [
                {"name": "componentName", "value": "c"},
                {"name": "dependencyName", "value": "d"},
                {"name": "url", "value": "u"},
                {"name": "OAS Specification", "value": "s"}
            ]
        }));
        let reversed = raw(json!({
            "id": "a",
            "state": "inactive",
            "serviceCharacteristic": [
                {"name": "OAS Specification", "value": "s"},
                {"name": "url", "value": "u"},
                {"name": "dependencyName", "value": "d"},
                {"name": "componentName", "value": "c"}
            ]
        }));

        let record = shorten(forward);
        assert_eq!(record, shorten(reversed));
        assert_eq!(record.oas_specification.as_deref(), Some("s"));
    }

    #[test]
    fn shorten_tolerates_missing_fields() {
        let record = shorten(raw(json!({
            "id": "a",
            "serviceCharacteristic": [
                {"name": "componentName", "value": "c"}
            ]
        })));
        assert_eq!(record.state, None);
        assert_eq!(record.component_name.as_deref(), Some("c"));
        assert_eq!(record.dependency_name, None);
        assert_eq!(record.url, None);

        let empty = shorten(raw(json!({})));
        assert_eq!(empty, ServiceRecord::default());

        let null_list = shorten(raw(json!({"id": "b", "serviceCharacteristic": null})));
        assert_eq!(null_list.id.as_deref(), Some("b"));
    }

    #[test]
    fn shorten_skips_unknown_and_null_values() {
        let record = shorten(raw(json!({
            "serviceCharacteristic": [
                {"name": "owner", "value": "team-a"},
                {"name": "url", "value": null},
                {"name": "dependencyName", "value": 42}
            ]
        })));
        assert_eq!(record.url, None);
        assert_eq!(record.dependency_name.as_deref(), Some("42"));
    }

    #[test]
    fn unknown_state_reads_as_none() {
        let record = ServiceRecord::from(raw(json!({
            "id": "b",
            "state": "terminated",
            "serviceCharacteristic": [{"name": "componentName", "value": "other"}]
        })));
        assert_eq!(record.id.as_deref(), Some("b"));
        assert_eq!(record.state, None);
        assert_eq!(record.component_name.as_deref(), Some("other"));

        assert_eq!(raw(json!({"state": null})).state, None);
        assert_eq!(raw(json!({"state": 3})).state, None);
        assert_eq!(raw(json!({"state": "inactive"})).state, Some(ServiceState::Inactive));
    }

    #[test]
    fn characteristic_lookup_by_name() {
        let mut rec = record("c", "d");
        rec.oas_specification = Some("s".to_string());
        assert_eq!(rec.characteristic(CharacteristicName::ComponentName), Some("c"));
        assert_eq!(rec.characteristic(CharacteristicName::DependencyName), Some("d"));
        assert_eq!(rec.characteristic(CharacteristicName::Url), None);
        assert_eq!(rec.characteristic(CharacteristicName::OasSpecification), Some("s"));
    }

    #[test]
    fn record_serializes_with_wire_names() {
        let record = ServiceRecord {
            id: Some("x".to_string()),
            state: Some(ServiceState::Inactive),
            oas_specification: Some("spec".to_string()),
            ..Default::default()
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({"id": "x", "state": "inactive", "OASSpecification": "spec"})
        );
    }

    #[test]
    fn record_to_spec_requires_all_fields() {
        let mut rec = record("c", "d");
        assert!(rec.to_spec().is_none());

        rec.url = Some("u".to_string());
        rec.oas_specification = Some("s".to_string());
        rec.state = Some(ServiceState::Inactive);
        let spec = rec.to_spec().unwrap();
        assert_eq!(spec, ServiceSpec::new("c", "d", "u", "s", ServiceState::Inactive));
    }

    #[test]
    fn state_parsing() {
        assert_eq!("active".parse::<ServiceState>(), Ok(ServiceState::Active));
        assert_eq!("inactive".parse::<ServiceState>(), Ok(ServiceState::Inactive));
        assert!("terminated".parse::<ServiceState>().is_err());
        assert_eq!(ServiceState::Inactive.to_string(), "inactive");
    }

    #[test]
    fn query_params_default_is_active() {
        let params = ServiceQuery::default().query_params();
        assert_eq!(params, vec![("state", "active".to_string())]);
        assert!(ServiceQuery::all_states().query_params().is_empty());
    }

    #[test]
    fn query_params_prefer_component_over_dependency() {
        let params = ServiceQuery::all_states()
            .component("bcme-productinventory")
            .dependency("downstreamproductcatalog")
            .query_params();
        assert_eq!(
            params,
            vec![(
                "serviceCharacteristic.value",
                "bcme-productinventory".to_string()
            )]
        );

        let params = ServiceQuery::default()
            .dependency("downstreamproductcatalog")
            .query_params();
        assert_eq!(
            params,
            vec![
                ("state", "active".to_string()),
                (
                    "serviceCharacteristic.value",
                    "downstreamproductcatalog".to_string()
                ),
            ]
        );
    }

    #[test]
    fn matches_applies_both_filters() {
        let records = [
            record("acme", "downstream"),
            record("bcme", "downstream"),
            record("bcme", "upstream"),
        ];
        let query = ServiceQuery::default().component("bcme").dependency("downstream");
        let hits: Vec<_> = records.iter().filter(|r| query.matches(r)).collect();
        assert_eq!(hits, vec![&records[1]]);

        let query = ServiceQuery::default().dependency("downstream");
        assert_eq!(records.iter().filter(|r| query.matches(r)).count(), 2);

        let query = ServiceQuery::default().component("");
        assert_eq!(records.iter().filter(|r| query.matches(r)).count(), 3);
        assert!(query.matches(&ServiceRecord::default()));
    }
}
