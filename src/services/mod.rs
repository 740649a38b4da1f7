pub mod auth_service;
pub mod category_service;
pub mod image_service;
pub mod page_service;
pub mod product_service;
pub mod user_service;
