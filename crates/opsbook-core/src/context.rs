//! Execution context threaded through every engine call.

use serde::{Deserialize, Serialize};

/// Tenant-scoped context for a single engine invocation.
///
/// Carries the tenant coordinates, the acting user (if any), a
/// correlation identifier for downstream telemetry, and the trigger
/// payload supplied by the caller. Every collaborator call receives
/// this explicitly; there are no ambient tenant lookups.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// Owning organization (tenant).
    pub organization_id: String,

    /// Property within the organization.
    pub property_id: String,

    /// Acting user, when the trigger originated from a user action.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Correlation identifier for telemetry.
    pub correlation_id: String,

    /// Payload supplied by the trigger (reservation event, manual
    /// call, scheduled tick).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_data: Option<serde_json::Value>,
}

impl ExecutionContext {
    /// Create a new context with a fresh correlation identifier.
    pub fn new(organization_id: impl Into<String>, property_id: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            property_id: property_id.into(),
            user_id: None,
            correlation_id: uuid::Uuid::new_v4().to_string(),
            trigger_data: None,
        }
    }

    /// Set the acting user.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Override the correlation identifier.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }

    /// Attach the trigger payload.
    pub fn with_trigger_data(mut self, trigger_data: serde_json::Value) -> Self {
        self.trigger_data = Some(trigger_data);
        self
    }

    /// Identity recorded on writes. Falls back to `"system"` when no
    /// acting user is present.
    pub fn acting_user(&self) -> &str {
        self.user_id.as_deref().unwrap_or("system")
    }

    /// Look up a key in the trigger payload.
    pub fn trigger_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.trigger_data.as_ref().and_then(|data| data.get(key))
    }

    /// Look up a string key in the trigger payload.
    pub fn trigger_str(&self, key: &str) -> Option<String> {
        self.trigger_value(key)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_new() {
        let ctx = ExecutionContext::new("org-1", "prop-1");
        assert_eq!(ctx.organization_id, "org-1");
        assert_eq!(ctx.property_id, "prop-1");
        assert!(!ctx.correlation_id.is_empty());
        assert!(ctx.user_id.is_none());
    }

    #[test]
    fn test_context_builder() {
        let ctx = ExecutionContext::new("org-1", "prop-1")
            .with_user_id("user-7")
            .with_correlation_id("corr-42");

        assert_eq!(ctx.user_id, Some("user-7".to_string()));
        assert_eq!(ctx.correlation_id, "corr-42");
    }

    #[test]
    fn test_acting_user_fallback() {
        let ctx = ExecutionContext::new("org-1", "prop-1");
        assert_eq!(ctx.acting_user(), "system");

        let ctx = ctx.with_user_id("user-7");
        assert_eq!(ctx.acting_user(), "user-7");
    }

    #[test]
    fn test_trigger_lookup() {
        let ctx = ExecutionContext::new("org-1", "prop-1").with_trigger_data(serde_json::json!({
            "guest_id": "guest-3",
            "count": 2,
        }));

        assert_eq!(ctx.trigger_str("guest_id"), Some("guest-3".to_string()));
        assert_eq!(ctx.trigger_value("count"), Some(&serde_json::json!(2)));
        assert_eq!(ctx.trigger_str("missing"), None);
    }

    #[test]
    fn test_context_serialization() {
        let ctx = ExecutionContext::new("org-1", "prop-1");
        let json = serde_json::to_string(&ctx).unwrap();
        assert!(json.contains("\"organization_id\":\"org-1\""));
        // Unset optionals are omitted
        assert!(!json.contains("user_id"));
        assert!(!json.contains("trigger_data"));
    }
}
