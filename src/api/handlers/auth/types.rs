//! Request/response types for the credential broker endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub otp: String,
    #[serde(rename = "newPassword")]
    pub new_password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

/// Returned by the token-acquisition route when no redirect was requested.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct AccessTokenResponse {
    #[serde(rename = "expiresIn")]
    pub expires_in: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    #[test]
    fn reset_password_request_uses_camel_case_field() -> Result<()> {
        let json = r#"{"email":"a@b.com","otp":"123456","newPassword":"hunter2!"}"#;
        let request: ResetPasswordRequest = serde_json::from_str(json)?;
        assert_eq!(request.email, "a@b.com");
        assert_eq!(request.otp, "123456");
        assert_eq!(request.new_password, "hunter2!");
        Ok(())
    }

    #[test]
    fn access_token_response_round_trips() -> Result<()> {
        let response = AccessTokenResponse { expires_in: 3600 };
        let value = serde_json::to_value(&response)?;
        let expires = value
            .get("expiresIn")
            .and_then(serde_json::Value::as_i64)
            .context("missing expiresIn")?;
        assert_eq!(expires, 3600);
        Ok(())
    }
}
