use serde::Serialize;
use utoipa::ToSchema;

use crate::models::ProductImage;

/// One part of a multipart upload batch, already pulled off the wire by the
/// route handler.
#[derive(Debug)]
pub struct ImageUpload {
    pub original_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImageList {
    pub items: Vec<ProductImage>,
}
