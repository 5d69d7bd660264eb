use serde::{Deserialize, Serialize};

use super::HttpMethod;

/// Login path used when none was discovered
pub const DEFAULT_LOGIN_PATH: &str = "/api/auth/login";
/// Field carrying the identity in the login body
pub const DEFAULT_CREDENTIAL_FIELD: &str = "email";
/// Field carrying the issued token in the login response
pub const DEFAULT_TOKEN_FIELD: &str = "token";
/// Header used to transport the token
pub const DEFAULT_TOKEN_HEADER: &str = "Authorization";

/// Inferred shape of the target's login/token contract
///
/// Absent fields mean "use the documented default"; the accessors below never
/// hand out an empty value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthProfile {
    /// Whether the target appears to use authentication at all
    pub present: bool,
    pub login_path: Option<String>,
    pub login_method: Option<HttpMethod>,
    pub credential_field: Option<String>,
    pub token_field: Option<String>,
    pub token_header_name: Option<String>,
    /// "env:JWT_SECRET" or "literal:abcd…" - never the full secret
    pub secret_hint: Option<String>,
    /// File the login route was found in
    pub source: Option<String>,
}

impl AuthProfile {
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn login_path(&self) -> &str {
        self.login_path.as_deref().unwrap_or(DEFAULT_LOGIN_PATH)
    }

    pub fn login_method(&self) -> HttpMethod {
        self.login_method.unwrap_or(HttpMethod::Post)
    }

    pub fn credential_field(&self) -> &str {
        self.credential_field
            .as_deref()
            .unwrap_or(DEFAULT_CREDENTIAL_FIELD)
    }

    pub fn token_field(&self) -> &str {
        self.token_field.as_deref().unwrap_or(DEFAULT_TOKEN_FIELD)
    }

    pub fn token_header_name(&self) -> &str {
        self.token_header_name
            .as_deref()
            .unwrap_or(DEFAULT_TOKEN_HEADER)
    }

    /// Header (name, value) pair for a token
    ///
    /// The `Authorization` header gets a `Bearer` scheme; custom headers carry
    /// the raw token.
    pub fn credential_header(&self, token: &str) -> (String, String) {
        let name = self.token_header_name();
        if name.eq_ignore_ascii_case("authorization") {
            (name.to_string(), format!("Bearer {}", token))
        } else {
            (name.to_string(), token.to_string())
        }
    }
}
