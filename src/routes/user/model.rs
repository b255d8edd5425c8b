use serde::{Deserialize, Serialize};

use crate::validation::{
    ValidationResult, sanitize, validate_email, validate_name, validate_password,
};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl RegisterRequest {
    /// Cleans the free-text fields and checks every rule. The password is
    /// taken as typed.
    pub fn sanitize_and_validate(mut self) -> ValidationResult<Self> {
        self.email = sanitize(&self.email).to_lowercase();
        self.name = sanitize(&self.name);

        validate_email(&self.email)?;
        validate_password(&self.password)?;
        validate_name(&self.name)?;
        Ok(self)
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn sanitize_and_validate(mut self) -> ValidationResult<Self> {
        self.email = sanitize(&self.email).to_lowercase();
        validate_email(&self.email)?;
        Ok(self)
    }
}

#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_is_normalised() {
        let req = RegisterRequest {
            email: "  A@X.com\n".into(),
            password: "Aa1!aaaa".into(),
            name: " Alice ".into(),
        }
        .sanitize_and_validate()
        .unwrap();

        assert_eq!(req.email, "a@x.com");
        assert_eq!(req.name, "Alice");
    }

    #[test]
    fn test_weak_password_is_rejected() {
        let err = RegisterRequest {
            email: "a@x.com".into(),
            password: "password".into(),
            name: "Alice".into(),
        }
        .sanitize_and_validate()
        .unwrap_err();

        assert_eq!(err.field, "password");
    }
}
