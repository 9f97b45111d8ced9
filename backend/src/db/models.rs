use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Application account linked to a Cognito subject. Its `id` is the
/// `user_id` foreign key of every profile and result row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    // Cognito fields
    pub cognito_sub: String,
    pub cognito_access_token: Option<String>,
    pub cognito_refresh_token: Option<String>,
    // User fields
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    /// Application tokens issued before this instant are rejected.
    pub sessions_revoked_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl User {
    pub fn new(cognito_sub: String, email: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            cognito_sub,
            cognito_access_token: None,
            cognito_refresh_token: None,
            email,
            created_at: now,
            updated_at: now,
            last_login: None,
            sessions_revoked_at: None,
            is_active: true,
        }
    }

    pub fn update_last_login(&mut self) {
        self.last_login = Some(Utc::now());
        self.updated_at = Utc::now();
    }

    /// Drops the stored Cognito tokens and invalidates every application
    /// token issued so far.
    pub fn clear_tokens(&mut self) {
        let now = Utc::now();
        self.cognito_access_token = None;
        self.cognito_refresh_token = None;
        self.sessions_revoked_at = Some(now);
        self.updated_at = now;
    }

    /// Whether an application token issued at `issued_at` (seconds since
    /// the epoch) still belongs to a live session.
    pub fn accepts_token_issued_at(&self, issued_at: usize) -> bool {
        if !self.is_active {
            return false;
        }
        match self.sessions_revoked_at {
            Some(revoked_at) => issued_at as i64 > revoked_at.timestamp(),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signing_out_rejects_earlier_tokens() {
        let mut user = User::new("sub".into(), "a@example.com".into());
        let issued_at = Utc::now().timestamp() as usize;
        assert!(user.accepts_token_issued_at(issued_at));

        user.clear_tokens();
        assert!(!user.accepts_token_issued_at(issued_at));
        assert!(user.accepts_token_issued_at(issued_at + 2));
    }

    #[test]
    fn inactive_users_accept_no_tokens() {
        let mut user = User::new("sub".into(), "a@example.com".into());
        user.is_active = false;
        assert!(!user.accepts_token_issued_at(Utc::now().timestamp() as usize));
    }
}
