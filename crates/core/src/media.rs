use async_trait::async_trait;

use crate::error::ApiResult;

/// Trait for storing face enrollment photos. Implement this to integrate
/// with blob storage (S3, GCS, local disk, etc.).
///
/// Photo storage is best-effort: when an upload fails the enrollment still
/// completes with the descriptor vectors alone and the failure is logged.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Store an image and return a reference (URL or key) to it.
    async fn store_image(&self, user_id: &str, filename: &str, bytes: &[u8])
        -> ApiResult<String>;

    /// Delete a previously stored image.
    async fn delete_image(&self, reference: &str) -> ApiResult<()>;
}

/// Store that discards image bytes and hands back a synthetic reference.
///
/// Useful when only the descriptor vectors matter (tests, descriptor-only
/// deployments).
pub struct NoopMediaStore;

#[async_trait]
impl MediaStore for NoopMediaStore {
    async fn store_image(
        &self,
        user_id: &str,
        filename: &str,
        _bytes: &[u8],
    ) -> ApiResult<String> {
        Ok(format!("noop://{}/{}", user_id, filename))
    }

    async fn delete_image(&self, _reference: &str) -> ApiResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_store_returns_a_reference() {
        let store = NoopMediaStore;
        let reference = store
            .store_image("user-1", "face-0.jpg", b"bytes")
            .await
            .unwrap();
        assert_eq!(reference, "noop://user-1/face-0.jpg");
        assert!(store.delete_image(&reference).await.is_ok());
    }
}
