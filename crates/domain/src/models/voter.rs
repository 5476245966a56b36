//! Anonymous voter identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A session-scoped anonymous voter. Carries no personal data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterIdentity {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    /// Refreshed whenever the token is presented again.
    pub last_seen_at: DateTime<Utc>,
}

/// Result of a get-or-create identity call.
#[derive(Debug, Clone)]
pub struct IssuedIdentity {
    pub identity: VoterIdentity,
    /// Token the client presents to be recognized again.
    pub session_token: String,
    /// True when a new identity was created by this call.
    pub created: bool,
}

/// Response body for the identity endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct IdentityResponse {
    pub voter_id: Uuid,
    pub session_token: String,
    pub created: bool,
}

impl From<&IssuedIdentity> for IdentityResponse {
    fn from(issued: &IssuedIdentity) -> Self {
        Self {
            voter_id: issued.identity.id,
            session_token: issued.session_token.clone(),
            created: issued.created,
        }
    }
}
