//! Transport side of a resource: topic layout and request routing.
//!
//! Requests arrive as JSON on `<base>/get` and `<base>/set`; every reply goes
//! to `<base>/response`, notifications to `<base>` itself, and the retained
//! registration descriptor to `<base>/link`.

pub mod mqtt;

pub use mqtt::MqttTransport;

use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{DaemonError, ValidationError};
use crate::resource::{ResourceHandle, ResourceKind, Units, UpdateCommand};

/// Topics of one served resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceTopics {
    base: String,
}

/// Which request a topic carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestTopic {
    Get,
    Set,
}

impl ResourceTopics {
    pub fn new(prefix: &str, resource_path: &str) -> Self {
        Self {
            base: format!("{}{}", prefix.trim_end_matches('/'), resource_path),
        }
    }

    pub fn notify(&self) -> &str {
        &self.base
    }

    pub fn get(&self) -> String {
        format!("{}/get", self.base)
    }

    pub fn set(&self) -> String {
        format!("{}/set", self.base)
    }

    pub fn response(&self) -> String {
        format!("{}/response", self.base)
    }

    pub fn link(&self) -> String {
        format!("{}/link", self.base)
    }

    pub fn classify(&self, topic: &str) -> Option<RequestTopic> {
        match topic.strip_prefix(self.base.as_str())? {
            "/get" => Some(RequestTopic::Get),
            "/set" => Some(RequestTopic::Set),
            _ => None,
        }
    }
}

/// Body of a retrieve request; an empty body is a plain retrieve.
#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct GetRequest {
    #[serde(default)]
    pub observe: Option<bool>,
    #[serde(default)]
    pub units: Option<String>,
}

impl GetRequest {
    pub fn parse(payload: &str) -> Result<Self, ValidationError> {
        if payload.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(payload).map_err(|e| ValidationError::InvalidPayload(e.to_string()))
    }

    /// Requested units, checked only for kinds that report a temperature.
    pub fn units_for(&self, kind: ResourceKind) -> Result<Option<Units>, ValidationError> {
        match (&self.units, kind) {
            (Some(units), ResourceKind::Temperature) => units
                .parse()
                .map(Some)
                .map_err(|_| ValidationError::UnknownUnits(units.clone())),
            _ => Ok(None),
        }
    }
}

fn error_reply(error: impl std::fmt::Display) -> Value {
    json!({ "error": error.to_string() })
}

/// Run one inbound request against the resource and build the reply body.
pub async fn answer(
    handle: &ResourceHandle,
    kind: ResourceKind,
    request: RequestTopic,
    payload: &str,
) -> Value {
    let result = match request {
        RequestTopic::Get => retrieve(handle, kind, payload).await,
        RequestTopic::Set => update(handle, kind, payload).await,
    };

    match result.and_then(|properties| Ok(serde_json::to_value(properties)?)) {
        Ok(body) => body,
        Err(e) => error_reply(e),
    }
}

async fn retrieve(
    handle: &ResourceHandle,
    kind: ResourceKind,
    payload: &str,
) -> Result<crate::resource::Properties, DaemonError> {
    let request = GetRequest::parse(payload)?;
    match request.units_for(kind)? {
        Some(units) => handle.retrieve_in(request.observe, units).await,
        None => handle.retrieve(request.observe).await,
    }
}

async fn update(
    handle: &ResourceHandle,
    kind: ResourceKind,
    payload: &str,
) -> Result<crate::resource::Properties, DaemonError> {
    let body: Value = serde_json::from_str(payload)
        .map_err(|e| ValidationError::InvalidPayload(e.to_string()))?;
    let command = UpdateCommand::from_payload(kind, &body)?;
    handle.update(command).await
}
