use crate::error::{Result, WsError};
use crate::id::WorkspaceId;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Subject used for tokens issued to the control plane itself.
pub const SYSTEM_SUBJECT: &str = "__system__";

/// Claims carried by a workspace access token. The audience is the
/// workspace identifier, so a token for one workspace is useless against
/// any other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceClaims {
    pub sub: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signs short-lived tokens scoped to one workspace.
#[derive(Clone)]
pub struct TokenIssuer {
    key: EncodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            key: EncodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn issue(&self, id: &WorkspaceId, subject: &str) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = WorkspaceClaims {
            sub: subject.to_string(),
            aud: id.to_string(),
            iat: now,
            exp: now + self.ttl.as_secs() as i64,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.key)
            .map_err(|e| WsError::Auth(format!("could not sign token: {e}")))
    }

    pub fn issue_system(&self, id: &WorkspaceId) -> Result<String> {
        self.issue(id, SYSTEM_SUBJECT)
    }
}

/// Verifies signature, expiry and workspace-id audience of access tokens.
#[derive(Clone)]
pub struct TokenValidator {
    key: DecodingKey,
    workspace_id: WorkspaceId,
}

impl TokenValidator {
    pub fn new(secret: &str, workspace_id: WorkspaceId) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            workspace_id,
        }
    }

    pub fn validate(&self, token: &str) -> Result<WorkspaceClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[self.workspace_id.as_str()]);
        decode::<WorkspaceClaims>(token, &self.key, &validation)
            .map(|data| data.claims)
            .map_err(|e| WsError::Auth(format!("invalid token: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer(secret: &str) -> TokenIssuer {
        TokenIssuer::new(secret, Duration::from_secs(60))
    }

    #[test]
    fn issued_token_validates_for_its_workspace() {
        let id = WorkspaceId::parse("abc123").unwrap();
        let token = issuer("s3cret").issue(&id, "alice").unwrap();

        let claims = TokenValidator::new("s3cret", id.clone())
            .validate(&token)
            .unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.aud, id.to_string());
    }

    #[test]
    fn token_is_rejected_for_other_workspace() {
        let id = WorkspaceId::parse("abc123").unwrap();
        let other = WorkspaceId::parse("other9").unwrap();
        let token = issuer("s3cret").issue_system(&id).unwrap();

        assert!(TokenValidator::new("s3cret", other).validate(&token).is_err());
    }

    #[test]
    fn token_is_rejected_with_wrong_secret() {
        let id = WorkspaceId::parse("abc123").unwrap();
        let token = issuer("s3cret").issue_system(&id).unwrap();

        assert!(TokenValidator::new("different", id).validate(&token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let id = WorkspaceId::parse("abc123").unwrap();
        let now = Utc::now().timestamp();
        let claims = WorkspaceClaims {
            sub: "alice".to_string(),
            aud: id.to_string(),
            iat: now - 600,
            exp: now - 300,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"s3cret"),
        )
        .unwrap();

        assert!(TokenValidator::new("s3cret", id).validate(&token).is_err());
    }
}
