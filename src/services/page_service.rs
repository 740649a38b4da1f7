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
    dto::pages::{CreatePageRequest, PageList, UpdatePageRequest},
    entity::pages::{ActiveModel, Column, Entity as Pages, Model as PageModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Page,
    response::{ApiResponse, Meta},
    routes::params::ListQuery,
    slug::{self, SlugScope},
    state::AppState,
};

const MAX_TITLE_LEN: usize = 200;

pub async fn list_pages(state: &AppState, query: ListQuery) -> AppResult<ApiResponse<PageList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Title).ilike(pattern.clone()))
                .add(Expr::col(Column::Content).ilike(pattern)),
        );
    }

    if let Some(is_active) = query.is_active {
        condition = condition.add(Column::IsActive.eq(is_active));
    }

    let finder = Pages::find()
        .filter(condition)
        .order_by_desc(Column::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(page_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Pages", PageList { items }, Some(meta)))
}

pub async fn get_page(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Page>> {
    let page = Pages::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Page", page_from_entity(page), None))
}

/// Storefront lookup: only active pages resolve.
pub async fn get_page_by_slug(state: &AppState, slug: &str) -> AppResult<ApiResponse<Page>> {
    let page = Pages::find()
        .filter(Column::Slug.eq(slug))
        .filter(Column::IsActive.eq(true))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Page", page_from_entity(page), None))
}

pub async fn create_page(
    state: &AppState,
    user: &AuthUser,
    payload: CreatePageRequest,
) -> AppResult<ApiResponse<Page>> {
    ensure_admin(user)?;

    if payload.title.trim().is_empty() || payload.content.trim().is_empty() {
        return Err(AppError::BadRequest("Title and content are required".into()));
    }
    validate_title(&payload.title)?;

    let slug = slug::unique_slug(&state.orm, SlugScope::Page, &payload.title, None).await?;

    let id = Uuid::new_v4();
    let page = ActiveModel {
        id: Set(id),
        title: Set(payload.title),
        slug: Set(slug),
        content: Set(payload.content),
        meta_title: Set(payload.meta_title),
        meta_description: Set(payload.meta_description),
        is_active: Set(payload.is_active),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "page_create",
        Some("pages"),
        Some(serde_json::json!({ "page_id": page.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Page created",
        page_from_entity(page),
        Some(Meta::empty()),
    ))
}

pub async fn update_page(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdatePageRequest,
) -> AppResult<ApiResponse<Page>> {
    ensure_admin(user)?;

    let existing = Pages::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let previous_title = existing.title.clone();
    let mut active: ActiveModel = existing.into();

    if let Some(title) = payload.title {
        if title.trim().is_empty() {
            return Err(AppError::BadRequest("Title is required".into()));
        }
        validate_title(&title)?;
        if title != previous_title {
            let slug = slug::unique_slug(&state.orm, SlugScope::Page, &title, Some(id)).await?;
            active.slug = Set(slug);
        }
        active.title = Set(title);
    }
    if let Some(content) = payload.content {
        if content.trim().is_empty() {
            return Err(AppError::BadRequest("Content is required".into()));
        }
        active.content = Set(content);
    }
    if let Some(meta_title) = payload.meta_title {
        active.meta_title = Set(meta_title);
    }
    if let Some(meta_description) = payload.meta_description {
        active.meta_description = Set(meta_description);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(Utc::now().into());

    let page = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "page_update",
        Some("pages"),
        Some(serde_json::json!({ "page_id": page.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Updated",
        page_from_entity(page),
        Some(Meta::empty()),
    ))
}

pub async fn delete_page(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let result = Pages::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "page_delete",
        Some("pages"),
        Some(serde_json::json!({ "page_id": id })),
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

fn page_from_entity(model: PageModel) -> Page {
    Page {
        id: model.id,
        title: model.title,
        slug: model.slug,
        content: model.content,
        meta_title: model.meta_title,
        meta_description: model.meta_description,
        is_active: model.is_active,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

fn validate_title(title: &str) -> AppResult<()> {
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::BadRequest(
            "Title must be 200 characters or less".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_at_cap_is_accepted() {
        let title = "a".repeat(200);
        assert!(validate_title(&title).is_ok());
    }

    #[test]
    fn title_over_cap_is_rejected() {
        let title = "a".repeat(201);
        assert!(matches!(
            validate_title(&title),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn title_cap_counts_characters_not_bytes() {
        // 200 multibyte chars stay within the cap even at 600 bytes.
        let title = "é".repeat(200);
        assert!(validate_title(&title).is_ok());
    }
}
