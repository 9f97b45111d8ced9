use async_trait::async_trait;
use shared::{ProfileUpdate, UserProfile};
use uuid::Uuid;

use super::dynamodb_repository::{DynamoDbRepository, RepositoryError};
use super::models::User;

/// Account rows read on every authenticated request and by the profile
/// service.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn get_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, RepositoryError>;
    async fn update_user(&self, user: &User) -> Result<(), RepositoryError>;
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, RepositoryError>;
    async fn create_profile(&self, profile: &UserProfile) -> Result<(), RepositoryError>;
    async fn update_profile(
        &self,
        user_id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, RepositoryError>;
}

#[async_trait]
impl AccountStore for DynamoDbRepository {
    async fn get_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, RepositoryError> {
        DynamoDbRepository::get_user_by_id(self, user_id).await
    }

    async fn update_user(&self, user: &User) -> Result<(), RepositoryError> {
        DynamoDbRepository::update_user(self, user).await
    }

    async fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, RepositoryError> {
        DynamoDbRepository::get_profile(self, user_id).await
    }

    async fn create_profile(&self, profile: &UserProfile) -> Result<(), RepositoryError> {
        DynamoDbRepository::create_profile(self, profile).await
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, RepositoryError> {
        DynamoDbRepository::update_profile(self, user_id, update).await
    }
}
