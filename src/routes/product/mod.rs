mod handler;
mod model;

pub use handler::{
    create_product, delete_product, get_product, list_products, products_by_cursor,
    products_filtered, product_stats, update_product,
};
pub use model::{CreateProductRequest, ProductListParams, UpdateProductRequest};
