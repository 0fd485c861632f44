use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use pc_common::error::{AppError, AppResult};
use uuid::Uuid;

/// Secret characters kept in clear after the kind prefix for lookup.
const VISIBLE_SECRET_LEN: usize = 12;
const MIN_SECRET_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Long-lived key issued to an advertiser or partner account.
    ApiKey,
    /// Short-lived token issued by admin password login.
    AdminSession,
}

impl TokenKind {
    pub fn prefix(self) -> &'static str {
        match self {
            TokenKind::ApiKey => "pc_live_",
            TokenKind::AdminSession => "pcs_",
        }
    }

    pub fn of(raw: &str) -> Option<Self> {
        [TokenKind::ApiKey, TokenKind::AdminSession]
            .into_iter()
            .find(|kind| raw.starts_with(kind.prefix()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub raw: String,
    pub visible_prefix: String,
    pub hash: String,
}

pub fn issue(kind: TokenKind) -> AppResult<IssuedToken> {
    let raw = format!("{}{}", kind.prefix(), Uuid::new_v4().simple());
    let visible_prefix = visible_prefix(&raw).ok_or(AppError::Internal)?;
    let hash = hash(kind, &raw)?;

    Ok(IssuedToken {
        raw,
        visible_prefix,
        hash,
    })
}

/// The lookup key stored beside the hash. It is not unique, so callers
/// verify every row that shares it.
pub fn visible_prefix(raw: &str) -> Option<String> {
    let len = TokenKind::of(raw)?.prefix().len() + VISIBLE_SECRET_LEN;
    raw.get(..len).map(ToString::to_string)
}

pub fn hash(kind: TokenKind, raw: &str) -> AppResult<String> {
    validate_format(kind, raw)?;

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(raw.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AppError::Internal)
}

pub fn verify(kind: TokenKind, stored_hash: &str, candidate: &str) -> AppResult<bool> {
    validate_format(kind, candidate)?;

    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| AppError::InvalidInput(format!("invalid stored token hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(candidate.as_bytes(), &parsed)
        .is_ok())
}

fn validate_format(kind: TokenKind, raw: &str) -> AppResult<()> {
    let prefix = kind.prefix();
    if !raw.starts_with(prefix) {
        return Err(AppError::InvalidInput(format!(
            "token must start with {prefix}"
        )));
    }
    if raw.len() < prefix.len() + MIN_SECRET_LEN {
        return Err(AppError::InvalidInput("token is too short".to_string()));
    }
    Ok(())
}
