//! 用户授权同意

use chrono::{DateTime, Duration, Utc};
use idp_common::{ClientId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::flow::{Expiring, expiry_from};
use super::scope::Scopes;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConsentError {
    #[error("consent expired")]
    Expired,

    #[error("requested scope exceeds consented scope")]
    ScopeExceeded,
}

/// 持久的同意记录，按 (用户, 客户端) 唯一
#[derive(Debug, Clone)]
pub struct OAuth2Consent {
    pub user_id: UserId,
    pub client_id: ClientId,
    pub scope: Scopes,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl OAuth2Consent {
    pub fn new(user_id: UserId, client_id: ClientId, scope: Scopes, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            client_id,
            scope,
            updated_at: now,
            expires_at: expiry_from(now, ttl),
        }
    }

    pub fn validate(&self, requested: &Scopes) -> Result<(), ConsentError> {
        self.validate_at(requested, Utc::now())
    }

    pub fn validate_at(&self, requested: &Scopes, now: DateTime<Utc>) -> Result<(), ConsentError> {
        if now >= self.expires_at {
            return Err(ConsentError::Expired);
        }

        if !requested.less_than_or_equal(&self.scope) {
            return Err(ConsentError::ScopeExceeded);
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentDecision {
    Accepted,
    Denied,
}

/// 用户刚做出的同意 / 拒绝决定，短 TTL 缓存
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth2ConsentResult {
    pub user_id: UserId,
    pub client_id: ClientId,
    pub decision: ConsentDecision,
    pub expires_at: DateTime<Utc>,
}

impl OAuth2ConsentResult {
    pub fn accepted(user_id: UserId, client_id: ClientId, ttl: Duration) -> Self {
        Self::with_decision(user_id, client_id, ConsentDecision::Accepted, ttl)
    }

    pub fn denied(user_id: UserId, client_id: ClientId, ttl: Duration) -> Self {
        Self::with_decision(user_id, client_id, ConsentDecision::Denied, ttl)
    }

    fn with_decision(user_id: UserId, client_id: ClientId, decision: ConsentDecision, ttl: Duration) -> Self {
        Self {
            user_id,
            client_id,
            decision,
            expires_at: expiry_from(Utc::now(), ttl),
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.decision == ConsentDecision::Accepted
    }
}

impl Expiring for OAuth2ConsentResult {
    fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::scope::ScopeVocabulary;

    #[test]
    fn test_consent_covers_subset() {
        let vocab = ScopeVocabulary::standard().unwrap();
        let consent = OAuth2Consent::new(
            UserId::from_i64(1),
            ClientId::from_i64(2),
            vocab.parse_scopes("read:user write:consent"),
            Duration::days(30),
        );

        assert!(consent.validate(&vocab.parse_scopes("read:user.email")).is_ok());
        assert!(consent.validate(&vocab.parse_scopes("")).is_ok());
        assert_eq!(
            consent.validate(&vocab.parse_scopes("read:client")),
            Err(ConsentError::ScopeExceeded)
        );
    }

    #[test]
    fn test_expired_consent() {
        let vocab = ScopeVocabulary::standard().unwrap();
        let consent = OAuth2Consent::new(
            UserId::from_i64(1),
            ClientId::from_i64(2),
            vocab.full_scope(),
            Duration::seconds(60),
        );

        let later = consent.expires_at + Duration::seconds(1);
        assert_eq!(
            consent.validate_at(&vocab.parse_scopes("read:user"), later),
            Err(ConsentError::Expired)
        );
    }

    #[test]
    fn test_consent_results() {
        let accepted = OAuth2ConsentResult::accepted(UserId::from_i64(1), ClientId::from_i64(2), Duration::seconds(60));
        let denied = OAuth2ConsentResult::denied(UserId::from_i64(1), ClientId::from_i64(2), Duration::seconds(60));
        assert!(accepted.is_accepted());
        assert!(!denied.is_accepted());
        assert!(accepted.expires_at > Utc::now());
    }

    #[test]
    fn test_unbounded_ttl_does_not_overflow() {
        let vocab = ScopeVocabulary::standard().unwrap();
        let consent = OAuth2Consent::new(UserId::from_i64(1), ClientId::from_i64(2), vocab.full_scope(), Duration::MAX);
        assert_eq!(consent.expires_at, DateTime::<Utc>::MAX_UTC);
        assert!(consent.validate(&vocab.parse_scopes("read:user")).is_ok());

        let denied = OAuth2ConsentResult::denied(UserId::from_i64(1), ClientId::from_i64(2), Duration::MAX);
        assert_eq!(denied.expires_at, DateTime::<Utc>::MAX_UTC);
    }
}
