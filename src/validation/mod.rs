//! Field rules applied to request bodies before they reach the services.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;
pub const MIN_NAME_LENGTH: usize = 2;
pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MIN_PRODUCT_NAME_LENGTH: usize = 2;
pub const MAX_PRODUCT_NAME_LENGTH: usize = 200;
pub const MAX_DESCRIPTION_LENGTH: usize = 1000;
pub const MIN_PRICE: f64 = 0.01;
pub const MAX_PRICE: f64 = 999_999.99;
pub const MIN_STOCK: i32 = 0;
pub const MAX_STOCK: i32 = 999_999;

const PASSWORD_SPECIALS: &str = "@$!%*?&";

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());
static PASSWORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9@$!%*?&]+$").unwrap());
static NAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z\s\-'.]+$").unwrap());
static PRODUCT_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9\s\-_.,!?()&]+$").unwrap());
static DESCRIPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^[a-zA-Z0-9\s\-_.,!?()&@#$%*+=:;'"<>\[\]{}|\\/~]+$"#).unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub type ValidationResult<T = ()> = Result<T, ValidationError>;

/// Strips control characters and surrounding whitespace.
pub fn sanitize(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_ascii_control())
        .collect::<String>()
        .trim()
        .to_string()
}

pub fn validate_email(email: &str) -> ValidationResult {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::new("email", "email is required"));
    }
    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::new("email", "email is too long"));
    }
    if !EMAIL_RE.is_match(email) {
        return Err(ValidationError::new("email", "invalid email format"));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> ValidationResult {
    let err = |message: &str| Err(ValidationError::new("password", message));

    if password.is_empty() {
        return err("password is required");
    }
    if password.len() < MIN_PASSWORD_LENGTH {
        return err("password must be at least 8 characters long");
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return err("password is too long");
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return err("password must contain at least one lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return err("password must contain at least one uppercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return err("password must contain at least one number");
    }
    if !password.chars().any(|c| PASSWORD_SPECIALS.contains(c)) {
        return err("password must contain at least one special character (@$!%*?&)");
    }
    if !PASSWORD_RE.is_match(password) {
        return err("password may only contain letters, numbers and @$!%*?&");
    }
    Ok(())
}

pub fn validate_name(name: &str) -> ValidationResult {
    let name = name.trim();
    let len = name.chars().count();
    if len < MIN_NAME_LENGTH {
        return Err(ValidationError::new("name", "name must be at least 2 characters long"));
    }
    if len > MAX_NAME_LENGTH {
        return Err(ValidationError::new("name", "name is too long"));
    }
    if !NAME_RE.is_match(name) {
        return Err(ValidationError::new("name", "name contains invalid characters"));
    }
    Ok(())
}

pub fn validate_product_name(name: &str) -> ValidationResult {
    let name = name.trim();
    let len = name.chars().count();
    if len < MIN_PRODUCT_NAME_LENGTH {
        return Err(ValidationError::new(
            "name",
            "product name must be at least 2 characters long",
        ));
    }
    if len > MAX_PRODUCT_NAME_LENGTH {
        return Err(ValidationError::new("name", "product name is too long"));
    }
    if !PRODUCT_NAME_RE.is_match(name) {
        return Err(ValidationError::new("name", "product name contains invalid characters"));
    }
    Ok(())
}

/// Descriptions are optional; an empty one is fine.
pub fn validate_description(description: &str) -> ValidationResult {
    let description = description.trim();
    if description.is_empty() {
        return Ok(());
    }
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(ValidationError::new("description", "description is too long"));
    }
    if !DESCRIPTION_RE.is_match(description) {
        return Err(ValidationError::new(
            "description",
            "description contains invalid characters",
        ));
    }
    Ok(())
}

pub fn validate_price(price: f64) -> ValidationResult {
    if !price.is_finite() || price < MIN_PRICE {
        return Err(ValidationError::new("price", "price must be at least 0.01"));
    }
    if price > MAX_PRICE {
        return Err(ValidationError::new("price", "price is too high"));
    }
    Ok(())
}

pub fn validate_stock(stock: i32) -> ValidationResult {
    if stock < MIN_STOCK {
        return Err(ValidationError::new("stock", "stock cannot be negative"));
    }
    if stock > MAX_STOCK {
        return Err(ValidationError::new("stock", "stock value is too high"));
    }
    Ok(())
}
