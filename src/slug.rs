use chrono::Utc;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::{
    entity::{categories, pages, products},
    error::AppResult,
};

/// Slugs are unique per entity type, not globally.
#[derive(Debug, Clone, Copy)]
pub enum SlugScope {
    Category,
    Product,
    Page,
}

/// Lowercase the name, drop everything outside word chars / whitespace /
/// hyphens, then collapse whitespace runs into single hyphens.
pub fn slugify(name: &str) -> String {
    let cleaned: String = name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || *c == '-' || *c == '_')
        .collect();
    cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .trim_matches('-')
        .to_string()
}

pub fn with_timestamp_suffix(slug: &str, millis: i64) -> String {
    format!("{slug}-{millis}")
}

/// Derive a slug for `name` and disambiguate against existing rows in the
/// scope's namespace. A collision gets the millisecond epoch appended, which
/// guarantees uniqueness without a retry loop at the cost of idempotence.
/// `exclude` skips the record being updated so renaming back and forth works.
pub async fn unique_slug<C: ConnectionTrait>(
    conn: &C,
    scope: SlugScope,
    name: &str,
    exclude: Option<Uuid>,
) -> AppResult<String> {
    let candidate = slugify(name);
    if slug_taken(conn, scope, &candidate, exclude).await? {
        Ok(with_timestamp_suffix(
            &candidate,
            Utc::now().timestamp_millis(),
        ))
    } else {
        Ok(candidate)
    }
}

async fn slug_taken<C: ConnectionTrait>(
    conn: &C,
    scope: SlugScope,
    slug: &str,
    exclude: Option<Uuid>,
) -> AppResult<bool> {
    let taken = match scope {
        SlugScope::Category => {
            let mut finder =
                categories::Entity::find().filter(categories::Column::Slug.eq(slug));
            if let Some(id) = exclude {
                finder = finder.filter(categories::Column::Id.ne(id));
            }
            finder.one(conn).await?.is_some()
        }
        SlugScope::Product => {
            let mut finder = products::Entity::find().filter(products::Column::Slug.eq(slug));
            if let Some(id) = exclude {
                finder = finder.filter(products::Column::Id.ne(id));
            }
            finder.one(conn).await?.is_some()
        }
        SlugScope::Page => {
            let mut finder = pages::Entity::find().filter(pages::Column::Slug.eq(slug));
            if let Some(id) = exclude {
                finder = finder.filter(pages::Column::Id.ne(id));
            }
            finder.one(conn).await?.is_some()
        }
    };
    Ok(taken)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_basic_name() {
        assert_eq!(slugify("iPhone 15 Pro"), "iphone-15-pro");
    }

    #[test]
    fn slugify_strips_punctuation() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("50% off (today)"), "50-off-today");
    }

    #[test]
    fn slugify_collapses_whitespace() {
        assert_eq!(slugify("  spaced   out \t name "), "spaced-out-name");
    }

    #[test]
    fn slugify_keeps_existing_hyphens_and_underscores() {
        assert_eq!(slugify("pre-owned_item"), "pre-owned_item");
    }

    #[test]
    fn slugify_trims_leading_and_trailing_hyphens() {
        assert_eq!(slugify("--edge case--"), "edge-case");
    }

    #[test]
    fn slugify_non_ascii_only_name_is_empty() {
        assert_eq!(slugify("电子产品"), "");
    }

    #[test]
    fn timestamp_suffix_format() {
        assert_eq!(
            with_timestamp_suffix("iphone-15-pro", 1700000000000),
            "iphone-15-pro-1700000000000"
        );
    }
}
