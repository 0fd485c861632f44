use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use chrono::Utc;
use pc_common::error::{AppError, AppResult};
use pc_common::types::Role;
use uuid::Uuid;

use super::tokens::{self, TokenKind};
use crate::state::AppState;
use crate::stores::account::AccountStore;
use crate::stores::session::{SessionRecord, SessionStore};

/// The authenticated caller. Admin sessions carry no account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub role: Role,
    pub account_id: Option<Uuid>,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    /// Admins may read any account; everyone else only their own.
    pub fn require_account_access(&self, account_id: Uuid) -> AppResult<()> {
        if self.is_admin() || self.account_id == Some(account_id) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    pub fn require_account(&self) -> AppResult<Uuid> {
        self.account_id.ok_or(AppError::Forbidden)
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    value.strip_prefix("Bearer ")
}

/// Resolves the bearer token to an [`Identity`]. The token prefix selects
/// whether it is checked against account API keys or admin sessions.
pub async fn authenticate(headers: &HeaderMap, state: &AppState) -> AppResult<Identity> {
    let token = bearer_token(headers).ok_or(AppError::Unauthorized)?;
    let kind = TokenKind::of(token).ok_or(AppError::Unauthorized)?;
    let prefix = tokens::visible_prefix(token).ok_or(AppError::Unauthorized)?;

    match kind {
        TokenKind::ApiKey => {
            let auth = AccountStore::new(state.db_pool.clone())
                .lookup_auth_by_prefix(&prefix)
                .await?
                .ok_or(AppError::Unauthorized)?;
            verify(kind, &auth.api_key_hash, token)?;
            Ok(Identity {
                role: auth.role,
                account_id: Some(auth.account_id),
            })
        }
        TokenKind::AdminSession => {
            admin_session(state, token).await?;
            Ok(Identity {
                role: Role::Admin,
                account_id: None,
            })
        }
    }
}

/// Finds the live session `token` was issued for. Sessions may share a
/// visible prefix, so each candidate's hash is checked.
pub async fn admin_session(state: &AppState, token: &str) -> AppResult<SessionRecord> {
    let prefix = tokens::visible_prefix(token).ok_or(AppError::Unauthorized)?;
    let now = Utc::now();

    SessionStore::new(state.db_pool.clone())
        .list_by_prefix(&prefix)
        .await?
        .into_iter()
        .filter(|session| !session.is_expired(now))
        .find(|session| verify(TokenKind::AdminSession, &session.token_hash, token).is_ok())
        .ok_or(AppError::Unauthorized)
}

fn verify(kind: TokenKind, stored_hash: &str, token: &str) -> AppResult<()> {
    match tokens::verify(kind, stored_hash, token) {
        Ok(true) => Ok(()),
        _ => Err(AppError::Unauthorized),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, HeaderValue};
    use pc_common::error::AppError;
    use pc_common::types::Role;
    use uuid::Uuid;

    use super::{bearer_token, Identity};

    #[test]
    fn extracts_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
        headers.insert("authorization", HeaderValue::from_static("Bearer pcs_abc"));
        assert_eq!(bearer_token(&headers), Some("pcs_abc"));
        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn partners_only_access_their_own_account() {
        let own = Uuid::new_v4();
        let partner = Identity {
            role: Role::Partner,
            account_id: Some(own),
        };
        assert!(partner.require_account_access(own).is_ok());
        assert!(matches!(
            partner.require_account_access(Uuid::new_v4()),
            Err(AppError::Forbidden)
        ));
        assert!(matches!(partner.require_admin(), Err(AppError::Forbidden)));

        let admin = Identity {
            role: Role::Admin,
            account_id: None,
        };
        assert!(admin.require_account_access(own).is_ok());
        assert!(matches!(admin.require_account(), Err(AppError::Forbidden)));
    }
}
