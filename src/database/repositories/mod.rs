mod product;
mod user;

pub use product::PgProductRepository;
pub use user::PgUserRepository;
