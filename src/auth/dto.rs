use serde::{Deserialize, Serialize};

/// Request body for user registration. `descriptors` defaults to empty so
/// a missing field surfaces as a validation error, not a deserialization
/// failure.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub descriptors: Vec<Vec<f32>>,
}

/// Request body for email/password login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for biometric login: a single probe descriptor.
#[derive(Debug, Deserialize)]
pub struct FaceLoginRequest {
    #[serde(default)]
    pub descriptor: Vec<f32>,
}

/// Request body for issuing a recovery code.
#[derive(Debug, Deserialize)]
pub struct SendOtpRequest {
    pub email: String,
}

/// Request body for the idempotent code check.
#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
}

/// Request body for the consuming password reset.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub otp: String,
    #[serde(rename = "newPassword")]
    pub new_password: String,
}

/// Response for successful password or face login.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub email: String,
}

/// Generic success envelope.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_request_uses_camel_case_password_field() {
        let body = r#"{"email":"a@b.c","otp":"123456","newPassword":"hunter22"}"#;
        let req: ResetPasswordRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.new_password, "hunter22");
    }

    #[test]
    fn register_request_tolerates_missing_descriptors() {
        let body = r#"{"name":"Ada","email":"a@b.c","password":"longenough"}"#;
        let req: RegisterRequest = serde_json::from_str(body).unwrap();
        assert!(req.descriptors.is_empty());
    }

    #[test]
    fn token_response_serializes_token_and_email() {
        let response = TokenResponse {
            token: "jwt".into(),
            email: "a@b.c".into(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"token\":\"jwt\""));
        assert!(json.contains("\"email\":\"a@b.c\""));
    }
}
