use serde::{Deserialize, Serialize};

/// Per-call send parameters.
///
/// Optional fields are left out of the wire payload entirely when unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SendOptions {
    /// Coalescing key, always sent (possibly empty)
    #[serde(default)]
    pub collapse_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_while_idle: Option<bool>,
    /// Time-to-live in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_live: Option<u32>,
    /// Combined with the dispatcher-wide flag (either one enables it)
    #[serde(default)]
    pub dry_run: bool,
    /// Opaque payload forwarded verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl SendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collapse_key(mut self, key: impl Into<String>) -> Self {
        self.collapse_key = key.into();
        self
    }

    pub fn delay_while_idle(mut self, delay: bool) -> Self {
        self.delay_while_idle = Some(delay);
        self
    }

    pub fn time_to_live(mut self, seconds: u32) -> Self {
        self.time_to_live = Some(seconds);
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// JSON body posted to the gateway for one batch.
#[derive(Debug, Serialize)]
pub struct WirePayload<'a> {
    pub registration_ids: &'a [String],
    pub collapse_key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_while_idle: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_to_live: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<&'a serde_json::Value>,
}

impl<'a> WirePayload<'a> {
    pub fn new(clients: &'a [String], options: &'a SendOptions) -> Self {
        Self {
            registration_ids: clients,
            collapse_key: &options.collapse_key,
            delay_while_idle: options.delay_while_idle,
            time_to_live: options.time_to_live,
            data: options.data.as_ref(),
        }
    }
}

/// Gateway reply body for an accepted request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MulticastResponse {
    #[serde(default)]
    pub multicast_id: Option<i64>,
    #[serde(default)]
    pub success: u32,
    #[serde(default)]
    pub failure: u32,
    #[serde(default)]
    pub canonical_ids: u32,
    /// Positionally aligned with the request's `registration_ids`
    #[serde(default)]
    pub results: Vec<RecipientResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipientResult {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub registration_id: Option<String>,
}

/// Identifier rotation reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatedId {
    pub old_id: String,
    pub new_id: String,
}

/// Categorized recipients of one batch, or of a whole send once merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// Unregistered on the device side; delete from storage
    pub removed: Vec<String>,
    /// Replace the stored identifier with the canonical one
    pub updated: Vec<UpdatedId>,
    /// Rejected by the gateway; delete from storage
    pub invalid: Vec<String>,
}

impl BatchOutcome {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.updated.is_empty() && self.invalid.is_empty()
    }

    /// Append another outcome, keeping batch order.
    pub fn merge(&mut self, other: BatchOutcome) {
        self.removed.extend(other.removed);
        self.updated.extend(other.updated);
        self.invalid.extend(other.invalid);
    }
}
