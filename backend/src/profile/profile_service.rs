use shared::{ProfileUpdate, UserProfile};
use uuid::Uuid;

use std::sync::Arc;

use crate::auth::cognito_service::CognitoService;
use crate::db::dynamodb_repository::RepositoryError;
use crate::db::models::User;
use crate::db::store::AccountStore;

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("Failed to fetch profile")]
    Fetch,
    #[error("Failed to create profile")]
    Create,
    #[error("Failed to update profile")]
    Update,
    #[error("Failed to update email")]
    UpdateEmail,
    #[error("Failed to update password")]
    UpdatePassword,
}

#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn AccountStore>,
    cognito: CognitoService,
}

impl ProfileService {
    pub fn new(store: Arc<dyn AccountStore>, cognito: CognitoService) -> Self {
        Self { store, cognito }
    }

    /// Fetches the profile, creating an empty one on first access.
    pub async fn get_profile(&self, user_id: Uuid) -> Result<UserProfile, ProfileError> {
        let existing = self.store.get_profile(user_id).await.map_err(|e| {
            log::error!("Error fetching profile for {}: {:?}", user_id, e);
            ProfileError::Fetch
        })?;

        if let Some(profile) = existing {
            return Ok(profile);
        }

        let profile = UserProfile::empty(user_id);
        match self.store.create_profile(&profile).await {
            Ok(()) => {
                log::info!("Created empty profile for {}", user_id);
                Ok(profile)
            }
            Err(RepositoryError::AlreadyExists) => {
                log::info!("Profile for {} was created concurrently, re-reading", user_id);
                self.store
                    .get_profile(user_id)
                    .await
                    .map_err(|e| {
                        log::error!("Error fetching profile for {}: {:?}", user_id, e);
                        ProfileError::Fetch
                    })?
                    .ok_or(ProfileError::Fetch)
            }
            Err(e) => {
                log::error!("Error creating profile for {}: {:?}", user_id, e);
                Err(ProfileError::Create)
            }
        }
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, ProfileError> {
        // The conditional update needs an existing row.
        self.get_profile(user_id).await?;

        self.store
            .update_profile(user_id, update)
            .await
            .map_err(|e| {
                log::error!("Error updating profile for {}: {:?}", user_id, e);
                ProfileError::Update
            })
    }

    async fn account(&self, user_id: Uuid) -> Option<(User, String)> {
        match self.store.get_user_by_id(user_id).await {
            Ok(Some(user)) => match user.cognito_access_token.clone() {
                Some(token) => Some((user, token)),
                None => {
                    log::warn!("User {} has no active Cognito session", user_id);
                    None
                }
            },
            Ok(None) => {
                log::warn!("User {} not found", user_id);
                None
            }
            Err(e) => {
                log::error!("Error loading user {}: {:?}", user_id, e);
                None
            }
        }
    }

    pub async fn update_email(&self, user_id: Uuid, email: &str) -> Result<User, ProfileError> {
        let (mut user, access_token) =
            self.account(user_id).await.ok_or(ProfileError::UpdateEmail)?;

        self.cognito
            .update_email(&access_token, email)
            .await
            .map_err(|e| {
                log::error!("Error updating email for {}: {}", user_id, e);
                ProfileError::UpdateEmail
            })?;

        user.email = email.to_string();
        user.updated_at = chrono::Utc::now();
        self.store.update_user(&user).await.map_err(|e| {
            log::error!("Error storing new email for {}: {:?}", user_id, e);
            ProfileError::UpdateEmail
        })?;

        log::info!("Updated email for {}", user_id);
        Ok(user)
    }

    pub async fn update_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), ProfileError> {
        let (_, access_token) = self
            .account(user_id)
            .await
            .ok_or(ProfileError::UpdatePassword)?;

        self.cognito
            .change_password(&access_token, current_password, new_password)
            .await
            .map_err(|e| {
                log::error!("Error updating password for {}: {}", user_id, e);
                ProfileError::UpdatePassword
            })?;

        log::info!("Updated password for {}", user_id);
        Ok(())
    }
}
