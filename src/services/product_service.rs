use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::products::{CreateProductRequest, ProductDetail, ProductList, UpdateProductRequest},
    entity::{
        categories::{Column as CategoryCol, Entity as Categories},
        product_images::{Column as ImageCol, Entity as ProductImages},
        products::{ActiveModel, Column, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{CategorySummary, Product, ProductImage},
    response::{ApiResponse, Meta},
    routes::params::ProductQuery,
    slug::{self, SlugScope},
    state::AppState,
    storage::UploadStore,
};

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all();

    if let Some(category_id) = query.category_id {
        condition = condition.add(Column::CategoryId.eq(category_id));
    }

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }

    if let Some(is_active) = query.is_active {
        condition = condition.add(Column::IsActive.eq(is_active));
    }

    let finder = Products::find()
        .filter(condition)
        .order_by_asc(Column::SortOrder)
        .order_by_desc(Column::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let products = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let items = assemble_details(state, products).await?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(meta),
    ))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<ProductDetail>> {
    let product = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut details = assemble_details(state, vec![product]).await?;
    let detail = details.pop().ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Product", detail, None))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<ProductDetail>> {
    ensure_admin(user)?;

    if payload.name.trim().is_empty() || payload.description.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Name, description, price, and category are required".into(),
        ));
    }
    if payload.price < 0 {
        return Err(AppError::BadRequest("Price must not be negative".into()));
    }
    validate_specifications(payload.specifications.as_deref())?;

    // Early existence check so the caller gets a clear error instead of an
    // opaque foreign-key violation from the store.
    if Categories::find_by_id(payload.category_id)
        .one(&state.orm)
        .await?
        .is_none()
    {
        return Err(AppError::BadRequest("Category not found".into()));
    }

    let slug = slug::unique_slug(&state.orm, SlugScope::Product, &payload.name, None).await?;

    let id = Uuid::new_v4();
    let product = ActiveModel {
        id: Set(id),
        name: Set(payload.name),
        slug: Set(slug),
        description: Set(payload.description),
        price: Set(payload.price),
        specifications: Set(payload.specifications),
        meta_title: Set(payload.meta_title),
        meta_description: Set(payload.meta_description),
        meta_keywords: Set(payload.meta_keywords),
        category_id: Set(payload.category_id),
        sort_order: Set(payload.sort_order),
        is_active: Set(payload.is_active),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_create",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let mut details = assemble_details(state, vec![product]).await?;
    let detail = details.pop().ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success(
        "Product created",
        detail,
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<ProductDetail>> {
    ensure_admin(user)?;

    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if let Some(price) = payload.price {
        if price < 0 {
            return Err(AppError::BadRequest("Price must not be negative".into()));
        }
    }
    validate_specifications(payload.specifications.as_ref().and_then(|s| s.as_deref()))?;

    // Category reassignment revalidates the reference.
    if let Some(category_id) = payload.category_id {
        if category_id != existing.category_id
            && Categories::find_by_id(category_id)
                .one(&state.orm)
                .await?
                .is_none()
        {
            return Err(AppError::BadRequest("Category not found".into()));
        }
    }

    let previous_name = existing.name.clone();
    let mut active: ActiveModel = existing.into();

    if let Some(name) = payload.name {
        if name.trim().is_empty() {
            return Err(AppError::BadRequest("Name is required".into()));
        }
        if name != previous_name {
            let slug =
                slug::unique_slug(&state.orm, SlugScope::Product, &name, Some(id)).await?;
            active.slug = Set(slug);
        }
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        if description.trim().is_empty() {
            return Err(AppError::BadRequest("Description is required".into()));
        }
        active.description = Set(description);
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(specifications) = payload.specifications {
        active.specifications = Set(specifications);
    }
    if let Some(meta_title) = payload.meta_title {
        active.meta_title = Set(meta_title);
    }
    if let Some(meta_description) = payload.meta_description {
        active.meta_description = Set(meta_description);
    }
    if let Some(meta_keywords) = payload.meta_keywords {
        active.meta_keywords = Set(meta_keywords);
    }
    if let Some(category_id) = payload.category_id {
        active.category_id = Set(category_id);
    }
    if let Some(sort_order) = payload.sort_order {
        active.sort_order = Set(sort_order);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(Utc::now().into());

    let product = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_update",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let mut details = assemble_details(state, vec![product]).await?;
    let detail = details.pop().ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Updated", detail, Some(Meta::empty())))
}

/// Deleting a product cascades to its image rows at the store level; the
/// physical files are cleaned up best-effort afterwards.
pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let image_paths: Vec<String> = ProductImages::find()
        .filter(ImageCol::ProductId.eq(id))
        .select_only()
        .column(ImageCol::Path)
        .into_tuple()
        .all(&state.orm)
        .await?;

    let result = Products::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    let store = UploadStore::new(&state.config.upload_dir);
    for path in image_paths {
        store.remove(&path).await;
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_delete",
        Some("products"),
        Some(serde_json::json!({ "product_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Structured specifications are stored as text but must be valid JSON.
fn validate_specifications(specifications: Option<&str>) -> AppResult<()> {
    if let Some(specs) = specifications.filter(|s| !s.trim().is_empty()) {
        serde_json::from_str::<serde_json::Value>(specs)
            .map_err(|_| AppError::BadRequest("Invalid specifications JSON format".into()))?;
    }
    Ok(())
}

/// Attach category summaries and ordered image sets to a page of products.
async fn assemble_details(
    state: &AppState,
    products: Vec<ProductModel>,
) -> AppResult<Vec<ProductDetail>> {
    if products.is_empty() {
        return Ok(Vec::new());
    }

    let category_ids: Vec<Uuid> = products.iter().map(|p| p.category_id).collect();
    let categories: HashMap<Uuid, CategorySummary> = Categories::find()
        .filter(CategoryCol::Id.is_in(category_ids))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|c| {
            (
                c.id,
                CategorySummary {
                    id: c.id,
                    name: c.name,
                    slug: c.slug,
                },
            )
        })
        .collect();

    let product_ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
    let mut images_by_product: HashMap<Uuid, Vec<ProductImage>> = HashMap::new();
    let images = ProductImages::find()
        .filter(ImageCol::ProductId.is_in(product_ids))
        .order_by_desc(ImageCol::IsMain)
        .order_by_asc(ImageCol::SortOrder)
        .all(&state.orm)
        .await?;
    for image in images {
        images_by_product
            .entry(image.product_id)
            .or_default()
            .push(crate::services::image_service::image_from_entity(image));
    }

    let mut details = Vec::with_capacity(products.len());
    for model in products {
        let category = categories
            .get(&model.category_id)
            .cloned()
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("product has no category row")))?;
        let images = images_by_product.remove(&model.id).unwrap_or_default();
        details.push(ProductDetail {
            product: product_from_entity(model),
            category,
            images,
        });
    }
    Ok(details)
}

pub(crate) fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        name: model.name,
        slug: model.slug,
        description: model.description,
        price: model.price,
        specifications: model.specifications,
        meta_title: model.meta_title,
        meta_description: model.meta_description,
        meta_keywords: model.meta_keywords,
        category_id: model.category_id,
        sort_order: model.sort_order,
        is_active: model.is_active,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_specifications_pass() {
        assert!(validate_specifications(Some(r#"{"cpu":"M3","ram":"16GB"}"#)).is_ok());
        assert!(validate_specifications(None).is_ok());
        assert!(validate_specifications(Some("")).is_ok());
    }

    #[test]
    fn malformed_specifications_are_rejected() {
        let err = validate_specifications(Some("{not json")).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
