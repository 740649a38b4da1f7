use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::double_option;
use crate::models::Category;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// `parent_id` and `description` use the double Option so an explicit null
/// (promote to top-level, clear the text) is told apart from an absent field.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub parent_id: Option<Option<Uuid>>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryWithCounts {
    #[serde(flatten)]
    pub category: Category,
    pub children_count: i64,
    pub products_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryList {
    pub items: Vec<CategoryWithCounts>,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_parent_id_means_unchanged() {
        let req: UpdateCategoryRequest = serde_json::from_str(r#"{"name":"x"}"#).unwrap();
        assert!(req.parent_id.is_none());
    }

    #[test]
    fn null_parent_id_means_promote_to_top_level() {
        let req: UpdateCategoryRequest =
            serde_json::from_str(r#"{"parent_id":null}"#).unwrap();
        assert_eq!(req.parent_id, Some(None));
    }

    #[test]
    fn null_description_clears_while_absent_leaves_unchanged() {
        let cleared: UpdateCategoryRequest =
            serde_json::from_str(r#"{"description":null}"#).unwrap();
        assert_eq!(cleared.description, Some(None));

        let untouched: UpdateCategoryRequest = serde_json::from_str(r#"{"name":"x"}"#).unwrap();
        assert!(untouched.description.is_none());
    }

    #[test]
    fn explicit_parent_id_is_preserved() {
        let id = Uuid::new_v4();
        let req: UpdateCategoryRequest =
            serde_json::from_str(&format!(r#"{{"parent_id":"{id}"}}"#)).unwrap();
        assert_eq!(req.parent_id, Some(Some(id)));
    }
}
