mod handler;
mod model;

pub use handler::{login, logout, logout_all, refresh_token, register, sessions};
pub use model::{LoginRequest, RefreshTokenRequest, RegisterRequest};
