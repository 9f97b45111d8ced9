use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use base64::{Engine, engine::general_purpose::STANDARD};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Largest image accepted for storage.
pub const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

#[derive(Clone)]
pub struct S3Service {
    client: Client,
    bucket_name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum S3ServiceError {
    #[error("S3 error: {0}")]
    S3(String),
    #[error("Invalid base64 image data: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),
    #[error("File too large")]
    FileTooLarge,
}

impl S3Service {
    pub fn new(client: Client, bucket_name: String) -> Self {
        Self {
            client,
            bucket_name,
        }
    }

    pub fn calculate_image_hash(image_data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(image_data);
        hex::encode(hasher.finalize())
    }

    pub fn generate_s3_key(user_id: Uuid, image_hash: &str, file_extension: &str) -> String {
        format!("scans/{}/{}.{}", user_id, image_hash, file_extension)
    }

    /// Unknown or missing types are stored as JPEG, the camera default.
    pub fn extract_file_extension(mime_type: Option<&str>) -> &'static str {
        match mime_type {
            Some("image/png") => "png",
            Some("image/webp") => "webp",
            Some("image/gif") => "gif",
            Some("image/heic") => "heic",
            _ => "jpg",
        }
    }

    pub fn validate_image_size(image_data: &[u8]) -> Result<(), S3ServiceError> {
        if image_data.len() > MAX_IMAGE_BYTES {
            return Err(S3ServiceError::FileTooLarge);
        }
        Ok(())
    }

    /// Strips an optional `data:<mime>;base64,` prefix and decodes the rest.
    pub fn decode_base64_image(image_base64: &str) -> Result<Vec<u8>, S3ServiceError> {
        let (_, payload) = shared::split_data_url(image_base64);
        Ok(STANDARD.decode(payload)?)
    }

    pub async fn upload_image(
        &self,
        image_data: &[u8],
        s3_key: &str,
        mime_type: &str,
    ) -> Result<(), S3ServiceError> {
        S3Service::validate_image_size(image_data)?;

        let body = ByteStream::from(image_data.to_vec());

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(s3_key)
            .body(body)
            .content_type(mime_type)
            .send()
            .await
            .map_err(|e| S3ServiceError::S3(e.to_string()))?;

        Ok(())
    }

    /// Stores a scanned image under its content hash and returns the key.
    pub async fn store_scan_image(
        &self,
        user_id: Uuid,
        image_base64: &str,
        mime_type: Option<&str>,
    ) -> Result<String, S3ServiceError> {
        let image_data = S3Service::decode_base64_image(image_base64)?;
        let image_hash = S3Service::calculate_image_hash(&image_data);
        let extension = S3Service::extract_file_extension(mime_type);
        let s3_key = S3Service::generate_s3_key(user_id, &image_hash, extension);

        self.upload_image(&image_data, &s3_key, mime_type.unwrap_or("image/jpeg"))
            .await?;
        log::info!("Stored scan image {} in bucket {}", s3_key, self.bucket_name);
        Ok(s3_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_hex_sha256() {
        assert_eq!(
            S3Service::calculate_image_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn keys_are_scoped_by_user() {
        let user_id = Uuid::nil();
        assert_eq!(
            S3Service::generate_s3_key(user_id, "abc", "png"),
            "scans/00000000-0000-0000-0000-000000000000/abc.png"
        );
    }

    #[test]
    fn unknown_mime_types_default_to_jpg() {
        assert_eq!(S3Service::extract_file_extension(Some("image/png")), "png");
        assert_eq!(S3Service::extract_file_extension(Some("application/pdf")), "jpg");
        assert_eq!(S3Service::extract_file_extension(None), "jpg");
    }

    #[test]
    fn decodes_plain_and_data_url_base64() {
        assert_eq!(S3Service::decode_base64_image("aGVsbG8=").unwrap(), b"hello");
        assert_eq!(
            S3Service::decode_base64_image("data:image/jpeg;base64,aGVsbG8=").unwrap(),
            b"hello"
        );
        assert!(matches!(
            S3Service::decode_base64_image("***"),
            Err(S3ServiceError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn oversized_images_are_rejected() {
        let image = vec![0u8; MAX_IMAGE_BYTES + 1];
        assert!(matches!(
            S3Service::validate_image_size(&image),
            Err(S3ServiceError::FileTooLarge)
        ));
    }
}
