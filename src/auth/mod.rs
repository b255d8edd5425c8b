//! Sessions, tokens, revocation and the per-request gatekeeper.

pub mod blacklist;
pub mod gatekeeper;
pub mod service;
pub mod session;
pub mod token;

pub use blacklist::{BLACKLIST_TTL, Blacklist, token_digest};
pub use gatekeeper::{AuthContext, AuthFailure, GateError, Gatekeeper};
pub use service::{AuthError, AuthService, ClientInfo};
pub use session::{Session, SessionError, SessionManager};
pub use token::{ACCESS_TOKEN_TTL, Claims, REFRESH_TOKEN_TTL, TokenError, TokenService, TokenType};
