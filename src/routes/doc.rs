use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse},
        categories::{CategoryList, CategoryWithCounts, CreateCategoryRequest, UpdateCategoryRequest},
        images::ImageList,
        pages::{CreatePageRequest, PageList, UpdatePageRequest},
        products::{CreateProductRequest, ProductDetail, ProductList, UpdateProductRequest},
        users::{CreateUserRequest, UpdateUserRequest, UserList},
    },
    models::{Category, CategorySummary, Page, Product, ProductImage, User},
    response::{ApiResponse, Meta},
    routes::{auth, categories, health, pages, params, products, users},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::me,
        categories::list_categories,
        categories::get_category,
        categories::create_category,
        categories::update_category,
        categories::delete_category,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        products::upload_images,
        products::set_main_image,
        products::delete_image,
        pages::list_pages,
        pages::get_page_by_slug,
        pages::get_page,
        pages::create_page,
        pages::update_page,
        pages::delete_page,
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        users::delete_user,
    ),
    components(
        schemas(
            User,
            Category,
            CategorySummary,
            Product,
            ProductImage,
            Page,
            LoginRequest,
            LoginResponse,
            CreateCategoryRequest,
            UpdateCategoryRequest,
            CategoryWithCounts,
            CategoryList,
            CreateProductRequest,
            UpdateProductRequest,
            ProductDetail,
            ProductList,
            ImageList,
            CreatePageRequest,
            UpdatePageRequest,
            PageList,
            CreateUserRequest,
            UpdateUserRequest,
            UserList,
            params::Pagination,
            params::ProductQuery,
            params::ListQuery,
            Meta,
            ApiResponse<ProductDetail>,
            ApiResponse<ProductList>,
            ApiResponse<CategoryList>,
            ApiResponse<PageList>,
            ApiResponse<UserList>,
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Categories", description = "Category hierarchy endpoints"),
        (name = "Products", description = "Product and image endpoints"),
        (name = "Pages", description = "Static page endpoints"),
        (name = "Users", description = "Admin user endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
