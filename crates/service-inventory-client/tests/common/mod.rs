//! In-memory inventory server used by the lifecycle tests.

#![allow(dead_code)]

use serde_json::{json, Value};
use service_inventory_client::{ServiceInventoryClient, ServiceInventoryConfig};
use std::sync::{Arc, Mutex};
use uuid::Uuid;
use wiremock::matchers::path_regex;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const API_PATH: &str = "/tmf-api/serviceInventoryManagement/v5";

/// Client pointed at a mock server's inventory API.
pub fn client_for(server: &MockServer) -> ServiceInventoryClient {
    let config = ServiceInventoryConfig::new(format!("{}{API_PATH}", server.uri()));
    ServiceInventoryClient::new(config).unwrap()
}

/// Stateful fake of the service inventory API.
///
/// Filters the way the real server does: `state` exactly, and
/// `serviceCharacteristic.value` against any characteristic value.
#[derive(Clone, Default)]
pub struct FakeInventory {
    services: Arc<Mutex<Vec<Value>>>,
}

impl FakeInventory {
    pub async fn mount(server: &MockServer) -> Self {
        let fake = Self::default();
        Mock::given(path_regex(format!(r"^{API_PATH}/service(/[^/]+)?$")))
            .respond_with(fake.clone())
            .mount(server)
            .await;
        fake
    }

    pub fn len(&self) -> usize {
        self.services.lock().unwrap().len()
    }

    fn list(&self, request: &Request) -> ResponseTemplate {
        let mut state = None;
        let mut value = None;
        for (key, v) in request.url.query_pairs() {
            match key.as_ref() {
                "state" => state = Some(v.into_owned()),
                "serviceCharacteristic.value" => value = Some(v.into_owned()),
                _ => {}
            }
        }

        let services = self.services.lock().unwrap();
        let hits: Vec<Value> = services
            .iter()
            .filter(|svc| state.as_deref().map_or(true, |s| svc["state"] == s))
            .filter(|svc| {
                value.as_deref().map_or(true, |v| {
                    svc["serviceCharacteristic"]
                        .as_array()
                        .is_some_and(|chars| chars.iter().any(|c| c["value"] == v))
                })
            })
            .cloned()
            .collect();
        ResponseTemplate::new(200).set_body_json(hits)
    }

    fn create(&self, request: &Request) -> ResponseTemplate {
        let Ok(mut svc) = serde_json::from_slice::<Value>(&request.body) else {
            return ResponseTemplate::new(400).set_body_string("invalid JSON");
        };
        svc["id"] = json!(Uuid::new_v4().to_string());
        self.services.lock().unwrap().push(svc.clone());
        ResponseTemplate::new(201).set_body_json(svc)
    }

    fn item(&self, request: &Request, id: &str) -> ResponseTemplate {
        let mut services = self.services.lock().unwrap();
        let Some(pos) = services.iter().position(|svc| svc["id"] == id) else {
            return ResponseTemplate::new(404).set_body_json(json!({
                "code": "404",
                "reason": "Not Found",
                "message": format!("service {id} not found")
            }));
        };

        match request.method.as_str() {
            "GET" => ResponseTemplate::new(200).set_body_json(services[pos].clone()),
            "PATCH" => {
                let Ok(mut svc) = serde_json::from_slice::<Value>(&request.body) else {
                    return ResponseTemplate::new(400).set_body_string("invalid JSON");
                };
                svc["id"] = json!(id);
                services[pos] = svc.clone();
                ResponseTemplate::new(200).set_body_json(svc)
            }
            "DELETE" => {
                services.remove(pos);
                ResponseTemplate::new(204)
            }
            _ => ResponseTemplate::new(405),
        }
    }
}

impl Respond for FakeInventory {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let collection = format!("{API_PATH}/service");
        let path = request.url.path();

        if path == collection {
            return match request.method.as_str() {
                "GET" => self.list(request),
                "POST" => self.create(request),
                _ => ResponseTemplate::new(405),
            };
        }

        let id = path
            .strip_prefix(&collection)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or_default();
        self.item(request, id)
    }
}
