use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::categories::{
        CategoryList, CategoryWithCounts, CreateCategoryRequest, UpdateCategoryRequest,
    },
    entity::{
        categories::{ActiveModel, Column, Entity as Categories, Model as CategoryModel},
        products::{Column as ProductCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Category,
    response::{ApiResponse, Meta},
    slug::{self, SlugScope},
    state::AppState,
};

/// Outcome of walking the proposed parent's ancestor chain.
#[derive(Debug, PartialEq)]
enum AncestryCheck {
    Ok,
    Cycle,
    DepthExceeded,
}

/// Walk `proposed_parent`'s ancestors over a snapshot of `(id, parent_id)`
/// pairs. The walk is capped at the category count: a longer chain means the
/// stored tree already violates the forest invariant, and we refuse to loop.
fn check_ancestry(
    parents: &HashMap<Uuid, Option<Uuid>>,
    category_id: Uuid,
    proposed_parent: Uuid,
) -> AncestryCheck {
    let mut current = Some(proposed_parent);
    for _ in 0..=parents.len() {
        let node = match current {
            Some(id) => id,
            None => return AncestryCheck::Ok,
        };
        if node == category_id {
            return AncestryCheck::Cycle;
        }
        current = match parents.get(&node) {
            Some(parent) => *parent,
            // Unknown id: chain ends here, caller already verified existence.
            None => None,
        };
    }
    AncestryCheck::DepthExceeded
}

/// Reject a `parent_id` assignment that would break the forest invariant:
/// self-parenting, a missing parent, or a cycle through the ancestor chain.
async fn validate_parent(
    state: &AppState,
    category_id: Uuid,
    parent_id: Uuid,
) -> AppResult<()> {
    if parent_id == category_id {
        return Err(AppError::Conflict(
            "Category cannot be its own parent".into(),
        ));
    }

    if Categories::find_by_id(parent_id).one(&state.orm).await?.is_none() {
        return Err(AppError::BadRequest("Parent category not found".into()));
    }

    let pairs: Vec<(Uuid, Option<Uuid>)> = Categories::find()
        .select_only()
        .column(Column::Id)
        .column(Column::ParentId)
        .into_tuple()
        .all(&state.orm)
        .await?;
    let parents: HashMap<Uuid, Option<Uuid>> = pairs.into_iter().collect();

    match check_ancestry(&parents, category_id, parent_id) {
        AncestryCheck::Ok => Ok(()),
        AncestryCheck::Cycle => Err(AppError::Conflict(
            "Cannot create circular reference in category hierarchy".into(),
        )),
        AncestryCheck::DepthExceeded => {
            tracing::error!(%category_id, %parent_id, "category ancestor chain exceeded category count");
            Err(AppError::Conflict("Category hierarchy is corrupted".into()))
        }
    }
}

pub async fn list_categories(state: &AppState) -> AppResult<ApiResponse<CategoryList>> {
    let categories = Categories::find()
        .order_by_asc(Column::SortOrder)
        .order_by_asc(Column::Name)
        .all(&state.orm)
        .await?;

    let mut children_counts: HashMap<Uuid, i64> = HashMap::new();
    for category in &categories {
        if let Some(parent_id) = category.parent_id {
            *children_counts.entry(parent_id).or_insert(0) += 1;
        }
    }

    let product_categories: Vec<Uuid> = Products::find()
        .select_only()
        .column(ProductCol::CategoryId)
        .into_tuple()
        .all(&state.orm)
        .await?;
    let mut product_counts: HashMap<Uuid, i64> = HashMap::new();
    for category_id in product_categories {
        *product_counts.entry(category_id).or_insert(0) += 1;
    }

    let items = categories
        .into_iter()
        .map(|model| {
            let id = model.id;
            CategoryWithCounts {
                category: category_from_entity(model),
                children_count: children_counts.get(&id).copied().unwrap_or(0),
                products_count: product_counts.get(&id).copied().unwrap_or(0),
            }
        })
        .collect();

    Ok(ApiResponse::success(
        "Categories",
        CategoryList { items },
        None,
    ))
}

pub async fn get_category(
    state: &AppState,
    id: Uuid,
) -> AppResult<ApiResponse<CategoryWithCounts>> {
    let category = Categories::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let children_count = Categories::find()
        .filter(Column::ParentId.eq(id))
        .count(&state.orm)
        .await? as i64;
    let products_count = Products::find()
        .filter(ProductCol::CategoryId.eq(id))
        .count(&state.orm)
        .await? as i64;

    Ok(ApiResponse::success(
        "Category",
        CategoryWithCounts {
            category: category_from_entity(category),
            children_count,
            products_count,
        },
        None,
    ))
}

pub async fn create_category(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_admin(user)?;

    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("Name is required".into()));
    }

    if let Some(parent_id) = payload.parent_id {
        if Categories::find_by_id(parent_id).one(&state.orm).await?.is_none() {
            return Err(AppError::BadRequest("Parent category not found".into()));
        }
    }

    let slug = slug::unique_slug(&state.orm, SlugScope::Category, &payload.name, None).await?;

    let id = Uuid::new_v4();
    let category = ActiveModel {
        id: Set(id),
        name: Set(payload.name),
        slug: Set(slug),
        description: Set(payload.description),
        parent_id: Set(payload.parent_id),
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
        "category_create",
        Some("categories"),
        Some(serde_json::json!({ "category_id": category.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Category created",
        category_from_entity(category),
        Some(Meta::empty()),
    ))
}

pub async fn update_category(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_admin(user)?;

    let existing = Categories::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let previous_name = existing.name.clone();
    let mut active: ActiveModel = existing.into();

    if let Some(name) = payload.name {
        if name.trim().is_empty() {
            return Err(AppError::BadRequest("Name is required".into()));
        }
        if name != previous_name {
            let slug =
                slug::unique_slug(&state.orm, SlugScope::Category, &name, Some(id)).await?;
            active.slug = Set(slug);
        }
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    match payload.parent_id {
        None => {}
        Some(None) => active.parent_id = Set(None),
        Some(Some(parent_id)) => {
            validate_parent(state, id, parent_id).await?;
            active.parent_id = Set(Some(parent_id));
        }
    }
    if let Some(sort_order) = payload.sort_order {
        active.sort_order = Set(sort_order);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(Utc::now().into());

    let category = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "category_update",
        Some("categories"),
        Some(serde_json::json!({ "category_id": category.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Updated",
        category_from_entity(category),
        Some(Meta::empty()),
    ))
}

/// Leaf-only deletion: a category with subcategories or attached products is
/// never removed, and nothing cascades silently.
pub async fn delete_category(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    Categories::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let children = Categories::find()
        .filter(Column::ParentId.eq(id))
        .count(&state.orm)
        .await?;
    if children > 0 {
        return Err(AppError::Conflict(
            "Cannot delete category with subcategories. Delete or move subcategories first."
                .into(),
        ));
    }

    let products = Products::find()
        .filter(ProductCol::CategoryId.eq(id))
        .count(&state.orm)
        .await?;
    if products > 0 {
        return Err(AppError::Conflict(
            "Cannot delete category with products. Move or delete products first.".into(),
        ));
    }

    Categories::delete_by_id(id).exec(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "category_delete",
        Some("categories"),
        Some(serde_json::json!({ "category_id": id })),
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

pub(crate) fn category_from_entity(model: CategoryModel) -> Category {
    Category {
        id: model.id,
        name: model.name,
        slug: model.slug,
        description: model.description,
        parent_id: model.parent_id,
        sort_order: model.sort_order,
        is_active: model.is_active,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forest(edges: &[(Uuid, Option<Uuid>)]) -> HashMap<Uuid, Option<Uuid>> {
        edges.iter().copied().collect()
    }

    #[test]
    fn reparenting_under_unrelated_node_is_allowed() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let parents = forest(&[(a, None), (b, Some(a)), (c, None)]);
        assert_eq!(check_ancestry(&parents, b, c), AncestryCheck::Ok);
    }

    #[test]
    fn direct_child_as_parent_is_a_cycle() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let parents = forest(&[(a, None), (b, Some(a))]);
        assert_eq!(check_ancestry(&parents, a, b), AncestryCheck::Cycle);
    }

    #[test]
    fn deep_descendant_as_parent_is_a_cycle() {
        let (a, b, c, d) = (
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
        );
        let parents = forest(&[(a, None), (b, Some(a)), (c, Some(b)), (d, Some(c))]);
        assert_eq!(check_ancestry(&parents, a, d), AncestryCheck::Cycle);
    }

    #[test]
    fn walk_terminates_on_corrupted_tree() {
        // a <-> b already form a cycle in stored data; the walk must cap out
        // instead of spinning.
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let parents = forest(&[(a, Some(b)), (b, Some(a)), (c, None)]);
        assert_eq!(
            check_ancestry(&parents, c, a),
            AncestryCheck::DepthExceeded
        );
    }

    #[test]
    fn chain_to_root_within_cap_is_ok() {
        let ids: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
        let mut edges = vec![(ids[0], None)];
        for pair in ids.windows(2) {
            edges.push((pair[1], Some(pair[0])));
        }
        let parents = forest(&edges);
        let newcomer = Uuid::new_v4();
        assert_eq!(
            check_ancestry(&parents, newcomer, ids[4]),
            AncestryCheck::Ok
        );
    }
}
