use axum::Json;
use bcrypt::{hash, verify};
use serde::{Deserialize, Serialize};

pub fn hash_password(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    hash(password.as_bytes(), cost)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password.as_bytes(), hash)
}

/// Envelope wrapped around every successful response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// `0` on success.
    pub code: i32,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resp_data: Option<T>,
}

pub fn success_to_api_response<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code: 0,
        msg: "success".into(),
        resp_data: Some(data),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_round_trip() {
        let hashed = hash_password("Aa1!aaaa", 4).unwrap();
        assert_ne!(hashed, "Aa1!aaaa");
        assert!(verify_password("Aa1!aaaa", &hashed).unwrap());
        assert!(!verify_password("Aa1!aaab", &hashed).unwrap());
    }

    #[test]
    fn test_success_envelope_shape() {
        let Json(body) = success_to_api_response(vec![1, 2]);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["code"], 0);
        assert_eq!(json["msg"], "success");
        assert_eq!(json["resp_data"], serde_json::json!([1, 2]));
    }
}
