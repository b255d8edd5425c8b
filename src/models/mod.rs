mod product;
pub mod query;
mod user;

pub use product::{LOW_STOCK_THRESHOLD, NewProduct, Product, ProductPatch, ProductStats};
pub use query::{
    CursorPagination, Pagination, ProductCursorPage, ProductCursorQuery, ProductFilter,
    ProductPage, ProductQuery, SortDirection, SortField, SortSpec,
};
pub use user::User;
