//! Message envelope passed between the orchestrator and its workers
//!
//! An `Envelope` is immutable once built: replies are new envelopes created
//! with [`Envelope::reply`], which swaps the sender and receiver of the
//! message being answered. Payloads travel as untyped JSON objects and are
//! parsed into concrete structs at the worker boundary with
//! [`Envelope::parse_payload`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{Error, Result, Role};

/// Untyped payload and metadata representation
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Well-known metadata keys
pub mod keys {
    /// RFC 3339 timestamp stamped onto valuation results
    pub const TIMESTAMP: &str = "timestamp";
    /// Model version tag stamped onto valuation results
    pub const MODEL_VERSION: &str = "model_version";
    /// Request identifier assigned by the transport
    pub const REQUEST_ID: &str = "request_id";
}

/// Unit of inter-stage communication
///
/// # Example
///
/// ```
/// use estate_core::{Envelope, Payload, Role};
///
/// let request = Envelope::new(
///     Role::Orchestrator,
///     Role::Valuation,
///     "valuation_request",
///     Payload::new(),
/// );
/// let reply = request.reply("valuation_response", Payload::new());
///
/// assert_eq!(reply.sender(), Role::Valuation);
/// assert_eq!(reply.receiver(), Role::Orchestrator);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    sender: Role,
    receiver: Role,
    kind: String,
    payload: Payload,
    #[serde(default, skip_serializing_if = "Payload::is_empty")]
    metadata: Payload,
}

impl Envelope {
    /// Create an envelope with empty metadata
    pub fn new(sender: Role, receiver: Role, kind: impl Into<String>, payload: Payload) -> Self {
        Self {
            sender,
            receiver,
            kind: kind.into(),
            payload,
            metadata: Payload::new(),
        }
    }

    /// Create an envelope whose payload is the serialized form of `payload`
    pub fn typed<T: Serialize>(
        sender: Role,
        receiver: Role,
        kind: impl Into<String>,
        payload: &T,
    ) -> Result<Self> {
        Ok(Self::new(sender, receiver, kind, to_payload(payload)?))
    }

    /// Attach metadata, consuming the envelope under construction
    pub fn with_metadata(mut self, metadata: Payload) -> Self {
        self.metadata = metadata;
        self
    }

    /// Add a single metadata entry, consuming the envelope under construction
    pub fn with_meta(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Role that produced this envelope
    pub fn sender(&self) -> Role {
        self.sender
    }

    /// Role this envelope is addressed to
    pub fn receiver(&self) -> Role {
        self.receiver
    }

    /// Message type tag
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Untyped payload
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Optional metadata (empty when none was attached)
    pub fn metadata(&self) -> &Payload {
        &self.metadata
    }

    /// String metadata value, if present
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }

    /// Whether this envelope reports a worker fault
    pub fn is_error(&self) -> bool {
        self.kind == crate::protocol::kinds::ERROR
    }

    /// Parse the payload into the concrete struct its kind requires
    pub fn parse_payload<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(serde_json::Value::Object(self.payload.clone())).map_err(|e| {
            Error::MalformedPayload {
                kind: self.kind.clone(),
                detail: e.to_string(),
            }
        })
    }

    /// Build a reply addressed back to this envelope's sender
    ///
    /// The reply's sender is the role this envelope was addressed to.
    pub fn reply(&self, kind: impl Into<String>, payload: Payload) -> Envelope {
        self.reply_to(self.sender, kind, payload)
    }

    /// Build a reply with an explicit receiver
    pub fn reply_to(&self, receiver: Role, kind: impl Into<String>, payload: Payload) -> Envelope {
        Envelope::new(self.receiver, receiver, kind, payload)
    }

    /// Build a reply whose payload is the serialized form of `payload`
    pub fn typed_reply<T: Serialize>(&self, kind: impl Into<String>, payload: &T) -> Result<Envelope> {
        Ok(self.reply(kind, to_payload(payload)?))
    }
}

/// Serialize a value into a JSON object payload
pub fn to_payload<T: Serialize>(value: &T) -> Result<Payload> {
    match serde_json::to_value(value)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(Error::PayloadNotObject(json_type_name(&other).to_string())),
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Probe {
        city: String,
        size_sqft: f64,
    }

    #[test]
    fn test_reply_swaps_addresses() {
        let request = Envelope::new(
            Role::Orchestrator,
            Role::RiskCompliance,
            "risk_assessment_request",
            Payload::new(),
        );
        let reply = request.reply("risk_assessment_response", Payload::new());

        assert_eq!(reply.sender(), Role::RiskCompliance);
        assert_eq!(reply.receiver(), Role::Orchestrator);
        assert_eq!(reply.kind(), "risk_assessment_response");
        assert!(reply.metadata().is_empty());
    }

    #[test]
    fn test_reply_to_overrides_receiver() {
        let request = Envelope::new(Role::Narrative, Role::Valuation, "x", Payload::new());
        let reply = request.reply_to(Role::Orchestrator, "y", Payload::new());
        assert_eq!(reply.sender(), Role::Valuation);
        assert_eq!(reply.receiver(), Role::Orchestrator);
    }

    #[test]
    fn test_typed_payload_round_trip() {
        let probe = Probe {
            city: "Pune".to_string(),
            size_sqft: 950.0,
        };
        let envelope =
            Envelope::typed(Role::Orchestrator, Role::Valuation, "probe", &probe).unwrap();

        assert_eq!(envelope.payload()["city"], json!("Pune"));
        let parsed: Probe = envelope.parse_payload().unwrap();
        assert_eq!(parsed, probe);
    }

    #[test]
    fn test_parse_payload_reports_kind() {
        let mut payload = Payload::new();
        payload.insert("city".to_string(), json!(42));
        let envelope = Envelope::new(Role::Orchestrator, Role::Valuation, "probe", payload);

        let err = envelope.parse_payload::<Probe>().unwrap_err();
        match err {
            Error::MalformedPayload { kind, .. } => assert_eq!(kind, "probe"),
            other => panic!("Expected MalformedPayload, got {other:?}"),
        }
    }

    #[test]
    fn test_non_object_payload_rejected() {
        let result = Envelope::typed(Role::Orchestrator, Role::Valuation, "n", &5_u32);
        assert!(matches!(result, Err(Error::PayloadNotObject(t)) if t == "number"));
    }

    #[test]
    fn test_metadata_accessors() {
        let envelope = Envelope::new(Role::Orchestrator, Role::Valuation, "k", Payload::new())
            .with_meta(keys::MODEL_VERSION, json!("2.1.0"));
        assert_eq!(envelope.meta_str(keys::MODEL_VERSION), Some("2.1.0"));
        assert_eq!(envelope.meta_str(keys::TIMESTAMP), None);
    }

    #[test]
    fn test_error_kind_detection() {
        let envelope = Envelope::new(Role::Valuation, Role::Orchestrator, "error", Payload::new());
        assert!(envelope.is_error());
    }
}
