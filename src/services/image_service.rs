use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::images::{ImageList, ImageUpload},
    entity::{
        product_images::{ActiveModel, Column, Entity as ProductImages, Model as ImageModel},
        products::Entity as Products,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::ProductImage,
    response::{ApiResponse, Meta},
    state::AppState,
    storage::UploadStore,
};

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

fn is_acceptable(content_type: &str, size: usize) -> bool {
    content_type.starts_with("image/") && size <= MAX_IMAGE_BYTES
}

#[derive(Debug, PartialEq)]
struct UploadSlot {
    index: usize,
    is_main: bool,
    sort_order: i32,
}

/// Decide, once for the whole batch, which files are accepted and what flags
/// they get. `had_images` is the pre-upload image count (captured before any
/// insert, never re-queried mid-batch): only when it is false does the first
/// accepted file become the main image. Sort orders continue from
/// `next_sort`.
fn plan_batch(files: &[ImageUpload], had_images: bool, next_sort: i32) -> Vec<UploadSlot> {
    let mut slots = Vec::new();
    for (index, file) in files.iter().enumerate() {
        if !is_acceptable(&file.content_type, file.bytes.len()) {
            continue;
        }
        let accepted = slots.len();
        slots.push(UploadSlot {
            index,
            is_main: !had_images && accepted == 0,
            sort_order: next_sort + accepted as i32,
        });
    }
    slots
}

pub async fn upload_images(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    files: Vec<ImageUpload>,
) -> AppResult<ApiResponse<ImageList>> {
    ensure_admin(user)?;

    if files.is_empty() {
        return Err(AppError::BadRequest("Images are required".into()));
    }

    Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let existing = ProductImages::find()
        .filter(Column::ProductId.eq(product_id))
        .all(&state.orm)
        .await?;
    let had_images = !existing.is_empty();
    let next_sort = existing
        .iter()
        .map(|img| img.sort_order)
        .max()
        .map(|max| max + 1)
        .unwrap_or(0);

    let slots = plan_batch(&files, had_images, next_sort);
    if slots.is_empty() {
        return Err(AppError::BadRequest("No valid images were uploaded".into()));
    }

    let store = UploadStore::new(&state.config.upload_dir);
    let mut uploaded = Vec::with_capacity(slots.len());

    for slot in slots {
        let file = &files[slot.index];
        let filename = UploadStore::unique_filename(product_id, &file.original_name);
        let path = store.store(&filename, &file.bytes).await?;

        let image = ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            filename: Set(filename),
            original_name: Set(file.original_name.clone()),
            path: Set(path),
            size: Set(file.bytes.len() as i64),
            mime_type: Set(file.content_type.clone()),
            is_main: Set(slot.is_main),
            sort_order: Set(slot.sort_order),
            created_at: NotSet,
        }
        .insert(&state.orm)
        .await?;

        uploaded.push(image_from_entity(image));
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "image_upload",
        Some("product_images"),
        Some(serde_json::json!({ "product_id": product_id, "count": uploaded.len() })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let message = format!("{} images uploaded successfully", uploaded.len());
    Ok(ApiResponse::success(
        message,
        ImageList { items: uploaded },
        Some(Meta::empty()),
    ))
}

/// Demote every sibling, then promote the target, in one transaction. A
/// concurrent reader never observes zero or two main images.
pub async fn set_main_image(
    state: &AppState,
    user: &AuthUser,
    image_id: Uuid,
) -> AppResult<ApiResponse<ProductImage>> {
    ensure_admin(user)?;

    let image = ProductImages::find_by_id(image_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let txn = state.orm.begin().await?;

    ProductImages::update_many()
        .col_expr(Column::IsMain, Expr::value(false))
        .filter(Column::ProductId.eq(image.product_id))
        .exec(&txn)
        .await?;

    let mut active: ActiveModel = image.into();
    active.is_main = Set(true);
    let image = active.update(&txn).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "image_set_main",
        Some("product_images"),
        Some(serde_json::json!({ "image_id": image.id, "product_id": image.product_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Main image updated successfully",
        image_from_entity(image),
        Some(Meta::empty()),
    ))
}

/// Remove the image row and its file. Deleting the main image promotes the
/// sibling with the lowest sort order, so a non-empty set always keeps
/// exactly one main image.
pub async fn delete_image(
    state: &AppState,
    user: &AuthUser,
    image_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let image = ProductImages::find_by_id(image_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let txn = state.orm.begin().await?;

    ProductImages::delete_by_id(image_id).exec(&txn).await?;

    if image.is_main {
        let successor = ProductImages::find()
            .filter(Column::ProductId.eq(image.product_id))
            .order_by_asc(Column::SortOrder)
            .one(&txn)
            .await?;
        if let Some(successor) = successor {
            let mut active: ActiveModel = successor.into();
            active.is_main = Set(true);
            active.update(&txn).await?;
        }
    }

    txn.commit().await?;

    // The row is gone; a dangling file is recoverable, a dangling DB
    // reference is not.
    let store = UploadStore::new(&state.config.upload_dir);
    store.remove(&image.path).await;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "image_delete",
        Some("product_images"),
        Some(serde_json::json!({ "image_id": image_id, "product_id": image.product_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Image deleted successfully",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub(crate) fn image_from_entity(model: ImageModel) -> ProductImage {
    ProductImage {
        id: model.id,
        product_id: model.product_id,
        filename: model.filename,
        original_name: model.original_name,
        path: model.path,
        size: model.size,
        mime_type: model.mime_type,
        is_main: model.is_main,
        sort_order: model.sort_order,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, content_type: &str, size: usize) -> ImageUpload {
        ImageUpload {
            original_name: name.into(),
            content_type: content_type.into(),
            bytes: vec![0u8; size],
        }
    }

    #[test]
    fn acceptance_filters_mime_and_size() {
        assert!(is_acceptable("image/png", 1024));
        assert!(is_acceptable("image/jpeg", MAX_IMAGE_BYTES));
        assert!(!is_acceptable("application/pdf", 1024));
        assert!(!is_acceptable("image/png", MAX_IMAGE_BYTES + 1));
    }

    #[test]
    fn first_accepted_image_is_main_on_empty_product() {
        let files = vec![
            upload("doc.pdf", "application/pdf", 10),
            upload("a.png", "image/png", 10),
            upload("b.png", "image/png", 10),
        ];
        let slots = plan_batch(&files, false, 0);
        assert_eq!(slots.len(), 2);
        // The skipped pdf does not steal the main flag.
        assert_eq!(slots[0], UploadSlot { index: 1, is_main: true, sort_order: 0 });
        assert_eq!(slots[1], UploadSlot { index: 2, is_main: false, sort_order: 1 });
    }

    #[test]
    fn no_main_assigned_when_product_already_has_images() {
        let files = vec![upload("a.png", "image/png", 10)];
        let slots = plan_batch(&files, true, 7);
        assert_eq!(slots, vec![UploadSlot { index: 0, is_main: false, sort_order: 7 }]);
    }

    #[test]
    fn sort_orders_continue_from_existing_maximum() {
        let files = vec![
            upload("a.png", "image/png", 10),
            upload("b.png", "image/png", 10),
            upload("c.png", "image/png", 10),
        ];
        let slots = plan_batch(&files, true, 3);
        let orders: Vec<i32> = slots.iter().map(|s| s.sort_order).collect();
        assert_eq!(orders, vec![3, 4, 5]);
    }

    #[test]
    fn all_rejected_batch_yields_empty_plan() {
        let files = vec![upload("huge.png", "image/png", MAX_IMAGE_BYTES + 1)];
        assert!(plan_batch(&files, false, 0).is_empty());
    }
}
