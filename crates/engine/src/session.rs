//! Signed-in member context.
//!
//! The session is created when a member logs in and cleared on logout. It is
//! handed explicitly to every engine operation.
use chrono::{DateTime, Utc};

use crate::{EngineError, MemberId, ResultEngine};

/// Credentials of the signed-in member, as issued by the authentication
/// provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    token: String,
    member_id: MemberId,
    email: String,
    expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(
        token: impl Into<String>,
        member_id: MemberId,
        email: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            token: token.into(),
            member_id,
            email: email.into(),
            expires_at,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn member_id(&self) -> &MemberId {
        &self.member_id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.token.is_empty() && now < self.expires_at
    }
}

/// Holder of the current session: `login` initializes it, `logout` clears it.
#[derive(Clone, Debug, Default)]
pub struct SessionContext {
    current: Option<Session>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context already holding `session`.
    pub fn signed_in(session: Session) -> Self {
        Self {
            current: Some(session),
        }
    }

    pub fn login(&mut self, session: Session) {
        tracing::info!("member {} signed in", session.member_id);
        self.current = Some(session);
    }

    /// Clears the session, returning the one that was active.
    pub fn logout(&mut self) -> Option<Session> {
        let previous = self.current.take();
        if let Some(session) = &previous {
            tracing::info!("member {} signed out", session.member_id);
        }
        previous
    }

    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    pub fn is_authenticated(&self, now: DateTime<Utc>) -> bool {
        self.current.as_ref().is_some_and(|s| s.is_valid_at(now))
    }

    /// Returns the session if present and not expired.
    pub fn require(&self, now: DateTime<Utc>) -> ResultEngine<&Session> {
        match &self.current {
            Some(session) if session.is_valid_at(now) => Ok(session),
            Some(session) => {
                tracing::warn!("session of member {} expired", session.member_id);
                Err(EngineError::Unauthenticated)
            }
            None => Err(EngineError::Unauthenticated),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn session(expires_at: DateTime<Utc>) -> Session {
        Session::new("token", MemberId::new("alice"), "alice@example.com", expires_at)
    }

    #[test]
    fn login_then_logout() {
        let now = Utc::now();
        let mut ctx = SessionContext::new();
        assert_eq!(ctx.require(now).unwrap_err(), EngineError::Unauthenticated);

        ctx.login(session(now + Duration::hours(1)));
        assert!(ctx.is_authenticated(now));
        assert_eq!(ctx.require(now).unwrap().member_id().as_str(), "alice");

        assert!(ctx.logout().is_some());
        assert!(ctx.current().is_none());
        assert!(ctx.require(now).is_err());
    }

    #[test]
    fn expired_session_is_rejected() {
        let now = Utc::now();
        let ctx = SessionContext::signed_in(session(now - Duration::seconds(1)));
        assert_eq!(ctx.require(now).unwrap_err(), EngineError::Unauthenticated);
    }

    #[test]
    fn empty_token_is_not_valid() {
        let now = Utc::now();
        let ctx = SessionContext::signed_in(Session::new(
            "",
            MemberId::new("alice"),
            "alice@example.com",
            now + Duration::hours(1),
        ));
        assert!(!ctx.is_authenticated(now));
    }
}
