use chrono::Utc;

use crate::{
    EngineError, MemberId, ResultEngine, Session,
    util::{normalize_required_text, require_email},
};

use super::Engine;

impl Engine {
    /// Registers a member id with its email, as done on signup.
    ///
    /// The email is normalized before being indexed, so later lookups are
    /// case insensitive.
    pub async fn register_member(&self, member_id: &MemberId, email: &str) -> ResultEngine<()> {
        normalize_required_text(member_id.as_str(), "member id")?;
        let email = require_email(email)?;

        if let Some(owner) = self.directory.member_by_email(&email).await?
            && &owner != member_id
        {
            return Err(EngineError::Validation(format!(
                "{email} is already registered"
            )));
        }

        self.directory.register_member(member_id, &email).await?;
        tracing::info!("registered member {member_id}");
        Ok(())
    }

    /// Opens a session for a member the authentication provider vouched for.
    ///
    /// The session lasts `session_ttl` from now.
    pub async fn open_session(&self, token: &str, member_id: &MemberId) -> ResultEngine<Session> {
        if token.trim().is_empty() {
            return Err(EngineError::Unauthenticated);
        }
        let email = self
            .directory
            .member_email(member_id)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("member {member_id}")))?;

        Ok(Session::new(
            token,
            member_id.clone(),
            email,
            Utc::now() + self.config.session_ttl,
        ))
    }
}
