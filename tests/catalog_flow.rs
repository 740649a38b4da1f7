use catalog_admin_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool},
    dto::{
        categories::{CreateCategoryRequest, UpdateCategoryRequest},
        images::ImageUpload,
        pages::{CreatePageRequest, UpdatePageRequest},
        products::CreateProductRequest,
        users::CreateUserRequest,
    },
    entity::product_images::{Column as ImageCol, Entity as ProductImages},
    error::AppError,
    middleware::auth::{AuthUser, ROLE_SUPER_ADMIN},
    services::{category_service, image_service, page_service, product_service, user_service},
    state::AppState,
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

// Integration flow over the invariant core: category tree validation,
// leaf-only deletion, the single-main-image lifecycle, and the
// last-super-admin guard. Requires a Postgres database.
#[tokio::test]
async fn category_tree_and_image_invariants_flow() -> anyhow::Result<()> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let state = setup_state(&database_url).await?;
    let admin = AuthUser {
        user_id: Uuid::new_v4(),
        email: "flow-admin@example.com".into(),
        role: ROLE_SUPER_ADMIN.into(),
    };

    let run = Uuid::new_v4().simple().to_string();

    // Build a three-level chain: root -> mid -> leaf.
    let root = create_category(&state, &admin, &format!("Root {run}"), None).await?;
    let mid = create_category(&state, &admin, &format!("Mid {run}"), Some(root)).await?;
    let leaf = create_category(&state, &admin, &format!("Leaf {run}"), Some(mid)).await?;

    // Self-parent and descendant-parent are both rejected with Conflict.
    let err = set_parent(&state, &admin, root, Some(Some(root))).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "self-parent: {err}");

    let err = set_parent(&state, &admin, root, Some(Some(leaf))).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "cycle: {err}");

    // Deleting a category with children fails.
    let err = category_service::delete_category(&state, &admin, root)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "has children: {err}");

    // A product attached to the leaf blocks its deletion.
    let product = product_service::create_product(
        &state,
        &admin,
        CreateProductRequest {
            name: format!("Widget {run}"),
            description: "A widget for testing".into(),
            price: 1999,
            specifications: Some(r#"{"color":"red"}"#.into()),
            meta_title: None,
            meta_description: None,
            meta_keywords: None,
            category_id: leaf,
            sort_order: 0,
            is_active: true,
        },
    )
    .await?
    .data
    .expect("product data");
    let product_id = product.product.id;

    let err = category_service::delete_category(&state, &admin, leaf)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "has products: {err}");

    // Referential integrity: an unknown category is rejected before any write.
    let err = product_service::create_product(
        &state,
        &admin,
        CreateProductRequest {
            name: format!("Orphan {run}"),
            description: "no category".into(),
            price: 1,
            specifications: None,
            meta_title: None,
            meta_description: None,
            meta_keywords: None,
            category_id: Uuid::new_v4(),
            sort_order: 0,
            is_active: true,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)), "bad category: {err}");

    // Slug collision on an identical name gets a timestamp suffix.
    let twin = product_service::create_product(
        &state,
        &admin,
        CreateProductRequest {
            name: format!("Widget {run}"),
            description: "Same name, different slug".into(),
            price: 999,
            specifications: None,
            meta_title: None,
            meta_description: None,
            meta_keywords: None,
            category_id: leaf,
            sort_order: 0,
            is_active: true,
        },
    )
    .await?
    .data
    .expect("twin data");
    assert_ne!(product.product.slug, twin.product.slug);
    assert!(twin.product.slug.starts_with(&product.product.slug));

    // Image lifecycle. First accepted upload becomes main; a skipped
    // non-image does not count.
    let first_batch = image_service::upload_images(
        &state,
        &admin,
        product_id,
        vec![
            upload("notes.txt", "text/plain", 16),
            upload("front.png", "image/png", 128),
            upload("back.png", "image/png", 128),
        ],
    )
    .await?
    .data
    .expect("first batch");
    assert_eq!(first_batch.items.len(), 2);
    assert!(first_batch.items[0].is_main);
    assert!(!first_batch.items[1].is_main);

    // Later batches never claim the main flag.
    let second_batch = image_service::upload_images(
        &state,
        &admin,
        product_id,
        vec![upload("side.png", "image/png", 64)],
    )
    .await?
    .data
    .expect("second batch");
    assert!(!second_batch.items[0].is_main);
    assert_eq!(main_count(&state, product_id).await?, 1);

    // SetMain moves the flag without ever leaving zero or two mains.
    let target = second_batch.items[0].id;
    image_service::set_main_image(&state, &admin, target).await?;
    assert_eq!(main_count(&state, product_id).await?, 1);
    assert_eq!(current_main(&state, product_id).await?, Some(target));

    // Deleting the main image promotes the lowest-sort-order sibling.
    image_service::delete_image(&state, &admin, target).await?;
    assert_eq!(main_count(&state, product_id).await?, 1);
    assert_eq!(
        current_main(&state, product_id).await?,
        Some(first_batch.items[0].id)
    );

    // Unknown image ids are NotFound.
    let err = image_service::set_main_image(&state, &admin, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound), "missing image: {err}");

    // Tear the catalog down bottom-up; leaf deletion succeeds once empty.
    product_service::delete_product(&state, &admin, product_id).await?;
    product_service::delete_product(&state, &admin, twin.product.id).await?;
    category_service::delete_category(&state, &admin, leaf).await?;
    category_service::delete_category(&state, &admin, mid).await?;
    category_service::delete_category(&state, &admin, root).await?;

    Ok(())
}

#[tokio::test]
async fn super_admin_deletion_guard() -> anyhow::Result<()> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let state = setup_state(&database_url).await?;
    let admin = AuthUser {
        user_id: Uuid::new_v4(),
        email: "guard-admin@example.com".into(),
        role: ROLE_SUPER_ADMIN.into(),
    };

    let run = Uuid::new_v4().simple().to_string();

    let first = user_service::create_user(
        &state,
        &admin,
        CreateUserRequest {
            email: format!("super-{run}@example.com"),
            password: "secret123".into(),
            name: "First Super".into(),
            role: "super_admin".into(),
            is_active: true,
        },
    )
    .await?
    .data
    .expect("first super admin");

    // Duplicate email is a Conflict.
    let err = user_service::create_user(
        &state,
        &admin,
        CreateUserRequest {
            email: format!("super-{run}@example.com"),
            password: "secret123".into(),
            name: "Duplicate".into(),
            role: "admin".into(),
            is_active: true,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "dup email: {err}");

    let second = user_service::create_user(
        &state,
        &admin,
        CreateUserRequest {
            email: format!("super2-{run}@example.com"),
            password: "secret123".into(),
            name: "Second Super".into(),
            role: "super_admin".into(),
            is_active: true,
        },
    )
    .await?
    .data
    .expect("second super admin");

    // With more than one super admin present, deletion is allowed.
    user_service::delete_user(&state, &admin, second.id).await?;

    // Deleting the last super admin must be refused.
    let remaining = super_admin_count(&state).await?;
    if remaining == 1 {
        let err = user_service::delete_user(&state, &admin, first.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)), "last super: {err}");
    } else {
        // Shared database with other super admins; the guard cannot trip.
        user_service::delete_user(&state, &admin, first.id).await?;
    }

    Ok(())
}

#[tokio::test]
async fn inactive_page_slug_is_hidden() -> anyhow::Result<()> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let state = setup_state(&database_url).await?;
    let admin = AuthUser {
        user_id: Uuid::new_v4(),
        email: "page-admin@example.com".into(),
        role: ROLE_SUPER_ADMIN.into(),
    };

    let run = Uuid::new_v4().simple().to_string();
    let page = page_service::create_page(
        &state,
        &admin,
        CreatePageRequest {
            title: format!("Draft Terms {run}"),
            content: "Not published yet".into(),
            meta_title: None,
            meta_description: None,
            is_active: false,
        },
    )
    .await?
    .data
    .expect("page payload");

    // The storefront slug lookup never resolves an inactive page.
    let err = page_service::get_page_by_slug(&state, &page.slug)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound), "inactive slug: {err}");

    // The admin lookup by id still works.
    page_service::get_page(&state, page.id).await?;

    // Activating the page makes the slug resolve.
    page_service::update_page(
        &state,
        &admin,
        page.id,
        UpdatePageRequest {
            title: None,
            content: None,
            meta_title: None,
            meta_description: None,
            is_active: Some(true),
        },
    )
    .await?;

    let found = page_service::get_page_by_slug(&state, &page.slug)
        .await?
        .data
        .expect("page payload");
    assert_eq!(found.id, page.id);

    page_service::delete_page(&state, &admin, page.id).await?;
    Ok(())
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    let orm = create_orm_conn(database_url).await?;
    let upload_dir = std::env::temp_dir()
        .join("catalog-admin-test-uploads")
        .to_string_lossy()
        .into_owned();
    Ok(AppState {
        pool,
        orm,
        config: AppConfig {
            database_url: database_url.to_string(),
            host: "127.0.0.1".into(),
            port: 0,
            jwt_secret: "test-secret".into(),
            upload_dir,
        },
    })
}

async fn create_category(
    state: &AppState,
    admin: &AuthUser,
    name: &str,
    parent_id: Option<Uuid>,
) -> anyhow::Result<Uuid> {
    let resp = category_service::create_category(
        state,
        admin,
        CreateCategoryRequest {
            name: name.to_string(),
            description: None,
            parent_id,
            sort_order: 0,
            is_active: true,
        },
    )
    .await?;
    Ok(resp.data.expect("category data").id)
}

async fn set_parent(
    state: &AppState,
    admin: &AuthUser,
    id: Uuid,
    parent_id: Option<Option<Uuid>>,
) -> Result<(), AppError> {
    category_service::update_category(
        state,
        admin,
        id,
        UpdateCategoryRequest {
            name: None,
            description: None,
            parent_id,
            sort_order: None,
            is_active: None,
        },
    )
    .await
    .map(|_| ())
}

fn upload(name: &str, content_type: &str, size: usize) -> ImageUpload {
    ImageUpload {
        original_name: name.into(),
        content_type: content_type.into(),
        bytes: vec![0u8; size],
    }
}

async fn main_count(state: &AppState, product_id: Uuid) -> anyhow::Result<u64> {
    Ok(ProductImages::find()
        .filter(ImageCol::ProductId.eq(product_id))
        .filter(ImageCol::IsMain.eq(true))
        .count(&state.orm)
        .await?)
}

async fn current_main(state: &AppState, product_id: Uuid) -> anyhow::Result<Option<Uuid>> {
    Ok(ProductImages::find()
        .filter(ImageCol::ProductId.eq(product_id))
        .filter(ImageCol::IsMain.eq(true))
        .order_by_asc(ImageCol::SortOrder)
        .one(&state.orm)
        .await?
        .map(|img| img.id))
}

async fn super_admin_count(state: &AppState) -> anyhow::Result<u64> {
    use catalog_admin_api::entity::users::{Column, Entity as Users};
    Ok(Users::find()
        .filter(Column::Role.eq(ROLE_SUPER_ADMIN))
        .count(&state.orm)
        .await?)
}
