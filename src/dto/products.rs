use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::double_option;
use crate::models::{CategorySummary, Product, ProductImage};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: String,
    pub price: i64,
    pub specifications: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub category_id: Uuid,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// The nullable text columns take the double Option so an explicit JSON null
/// clears them, while an absent field leaves them untouched.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub specifications: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub meta_title: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub meta_description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub meta_keywords: Option<Option<String>>,
    pub category_id: Option<Uuid>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

/// Product with its category summary and images, main image first.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub category: CategorySummary,
    pub images: Vec<ProductImage>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductList {
    pub items: Vec<ProductDetail>,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_meta_fields_clear_while_absent_leave_unchanged() {
        let cleared: UpdateProductRequest =
            serde_json::from_str(r#"{"meta_title":null,"specifications":null}"#).unwrap();
        assert_eq!(cleared.meta_title, Some(None));
        assert_eq!(cleared.specifications, Some(None));
        assert!(cleared.meta_description.is_none());

        let set: UpdateProductRequest =
            serde_json::from_str(r#"{"meta_title":"Widgets"}"#).unwrap();
        assert_eq!(set.meta_title, Some(Some("Widgets".to_string())));
    }
}
