use async_trait::async_trait;
use imgserver_core::{AllowedSizes, AppError, TransformationRequest};

use crate::processor::TransformationService;

/// Rejects transformation requests for sizes outside the allow-list before they reach
/// the wrapped service.
pub struct SizeAuthorization<S> {
    inner: S,
    allowed: AllowedSizes,
}

impl<S> SizeAuthorization<S> {
    pub fn new(inner: S, allowed: AllowedSizes) -> Self {
        Self { inner, allowed }
    }

    pub fn allowed_sizes(&self) -> &AllowedSizes {
        &self.allowed
    }
}

#[async_trait]
impl<S: TransformationService> TransformationService for SizeAuthorization<S> {
    async fn prepare_transformation(
        &self,
        request: &TransformationRequest,
    ) -> Result<String, AppError> {
        if !self.allowed.contains(&request.size()) {
            tracing::warn!(
                image_id = %request.image_id(),
                size = %request.size(),
                "Rejected transformation for size outside allow-list"
            );
            return Err(AppError::SizeNotAuthorized(request.size()));
        }
        self.inner.prepare_transformation(request).await
    }
}
