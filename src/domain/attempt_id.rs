//! Type-safe connect-attempt identifier.
//!
//! Every `/connect` call starts a new attempt. The upstream task spawned for
//! it tags each session transition with its [`AttemptId`], so a task whose
//! attempt has been superseded can no longer touch the session.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Unique identifier for one connect attempt.
///
/// Wraps a UUID v4. Generated when the attempt starts and immutable
/// thereafter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct AttemptId(uuid::Uuid);

impl AttemptId {
    /// Creates a new random `AttemptId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for AttemptId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn new_generates_unique_ids() {
        assert_ne!(AttemptId::new(), AttemptId::new());
    }

    #[test]
    fn serializes_as_bare_uuid() {
        let id = AttemptId::new();
        let Ok(json) = serde_json::to_string(&id) else {
            panic!("serialization failed");
        };
        assert_eq!(json, format!("\"{id}\""));
        let Ok(back) = serde_json::from_str::<AttemptId>(&json) else {
            panic!("deserialization failed");
        };
        assert_eq!(back, id);
    }
}
