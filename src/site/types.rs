//! Response shapes for the content resources.
//!
//! Individual records stay opaque JSON; only the top-level keys are typed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::swr::FromPayload;

/// `GET /blogs`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlogList {
  #[serde(default)]
  pub blogs: Vec<Value>,
  #[serde(default)]
  pub pagination: Option<Value>,
}

/// `GET /projects`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectList {
  #[serde(default)]
  pub projects: Vec<Value>,
  #[serde(default)]
  pub pagination: Option<Value>,
}

/// `GET /services`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceList {
  #[serde(default)]
  pub services: Vec<Value>,
}

/// `GET /settings`, kept as the shared payload itself so every subscriber
/// sees the same value.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings(pub Arc<Value>);

impl Settings {
  pub fn get(&self, field: &str) -> Option<&Value> {
    self.0.get(field)
  }

  pub fn value(&self) -> &Value {
    &self.0
  }

  /// Whether both handles point at the same cached payload.
  pub fn ptr_eq(&self, other: &Settings) -> bool {
    Arc::ptr_eq(&self.0, &other.0)
  }
}

impl Default for Settings {
  fn default() -> Self {
    Settings(Arc::new(Value::Object(Map::new())))
  }
}

impl FromPayload for BlogList {
  fn from_payload(payload: &Arc<Value>) -> Result<Self, serde_json::Error> {
    BlogList::deserialize(payload.as_ref())
  }
}

impl FromPayload for ProjectList {
  fn from_payload(payload: &Arc<Value>) -> Result<Self, serde_json::Error> {
    ProjectList::deserialize(payload.as_ref())
  }
}

impl FromPayload for ServiceList {
  fn from_payload(payload: &Arc<Value>) -> Result<Self, serde_json::Error> {
    ServiceList::deserialize(payload.as_ref())
  }
}

impl FromPayload for Settings {
  fn from_payload(payload: &Arc<Value>) -> Result<Self, serde_json::Error> {
    Ok(Settings(Arc::clone(payload)))
  }
}
