use aws_sdk_cognitoidentityprovider::Client as CognitoClient;
use aws_sdk_cognitoidentityprovider::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_cognitoidentityprovider::types::{AttributeType, AuthFlowType};
use base64::{Engine, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Error, Debug)]
pub enum CognitoError {
    #[error("{0}")]
    AwsError(String),
    #[error("Invalid secret configuration")]
    InvalidSecret,
    #[error("Authentication challenge not supported: {0}")]
    UnsupportedChallenge(String),
    #[error("Missing {0} in Cognito response")]
    MissingField(&'static str),
}

/// Surfaces the service's own message (e.g. "Incorrect username or
/// password.") and falls back to the SDK error text.
fn sdk_error<E, R>(err: SdkError<E, R>) -> CognitoError
where
    E: ProvideErrorMetadata,
{
    let message = err
        .as_service_error()
        .and_then(|e| e.message())
        .map(str::to_string)
        .unwrap_or_else(|| err.to_string());
    CognitoError::AwsError(message)
}

/// `SECRET_HASH` for app clients that have a secret:
/// base64(HMAC-SHA256(secret, username + client_id)).
pub fn compute_secret_hash(
    client_secret: &str,
    username: &str,
    client_id: &str,
) -> Result<String, CognitoError> {
    let mut mac = HmacSha256::new_from_slice(client_secret.as_bytes())
        .map_err(|_| CognitoError::InvalidSecret)?;
    mac.update(username.as_bytes());
    mac.update(client_id.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

#[derive(Debug, Clone)]
pub struct CognitoSession {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: i32,
}

#[derive(Clone)]
pub struct CognitoService {
    client: CognitoClient,
    client_id: String,
    client_secret: Option<String>,
}

impl CognitoService {
    pub fn new(client: CognitoClient, client_id: String, client_secret: Option<String>) -> Self {
        Self {
            client,
            client_id,
            client_secret,
        }
    }

    fn secret_hash(&self, username: &str) -> Result<Option<String>, CognitoError> {
        self.client_secret
            .as_deref()
            .map(|secret| compute_secret_hash(secret, username, &self.client_id))
            .transpose()
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<bool, CognitoError> {
        let email_attribute = AttributeType::builder()
            .name("email")
            .value(email)
            .build()
            .map_err(|e| CognitoError::AwsError(e.to_string()))?;

        let output = self
            .client
            .sign_up()
            .client_id(&self.client_id)
            .username(email)
            .password(password)
            .set_secret_hash(self.secret_hash(email)?)
            .user_attributes(email_attribute)
            .send()
            .await
            .map_err(sdk_error)?;

        log::info!(
            "Cognito sign up for {} (confirmed: {})",
            email,
            output.user_confirmed()
        );
        Ok(output.user_confirmed())
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<CognitoSession, CognitoError> {
        let mut request = self
            .client
            .initiate_auth()
            .auth_flow(AuthFlowType::UserPasswordAuth)
            .client_id(&self.client_id)
            .auth_parameters("USERNAME", email)
            .auth_parameters("PASSWORD", password);

        if let Some(secret_hash) = self.secret_hash(email)? {
            request = request.auth_parameters("SECRET_HASH", secret_hash);
        }

        let output = request.send().await.map_err(sdk_error)?;

        if let Some(challenge) = output.challenge_name() {
            return Err(CognitoError::UnsupportedChallenge(
                challenge.as_str().to_string(),
            ));
        }

        let result = output
            .authentication_result()
            .ok_or(CognitoError::MissingField("authentication result"))?;

        Ok(CognitoSession {
            access_token: result
                .access_token()
                .ok_or(CognitoError::MissingField("access token"))?
                .to_string(),
            refresh_token: result.refresh_token().map(str::to_string),
            expires_in: result.expires_in(),
        })
    }

    /// The stable Cognito subject (`sub`) of the token's user.
    pub async fn get_subject(&self, access_token: &str) -> Result<String, CognitoError> {
        let output = self
            .client
            .get_user()
            .access_token(access_token)
            .send()
            .await
            .map_err(sdk_error)?;

        output
            .user_attributes()
            .iter()
            .find(|attribute| attribute.name() == "sub")
            .and_then(|attribute| attribute.value())
            .map(str::to_string)
            .ok_or(CognitoError::MissingField("sub attribute"))
    }

    pub async fn global_sign_out(&self, access_token: &str) -> Result<(), CognitoError> {
        self.client
            .global_sign_out()
            .access_token(access_token)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    pub async fn update_email(&self, access_token: &str, email: &str) -> Result<(), CognitoError> {
        let email_attribute = AttributeType::builder()
            .name("email")
            .value(email)
            .build()
            .map_err(|e| CognitoError::AwsError(e.to_string()))?;

        self.client
            .update_user_attributes()
            .access_token(access_token)
            .user_attributes(email_attribute)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    pub async fn change_password(
        &self,
        access_token: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), CognitoError> {
        self.client
            .change_password()
            .access_token(access_token)
            .previous_password(current_password)
            .proposed_password(new_password)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_hash_matches_reference_value() {
        let hash = compute_secret_hash("client-secret", "user@example.com", "client-id").unwrap();
        assert_eq!(hash, "NpqglvUHBpz0nyO+qeiUjlRR297+e+uA7UhuwY3pkSE=");
    }
}
