use serde_json::Value;

use super::{join_url, ExecutionContext, HttpRequest};
use crate::config::AuthSettings;
use crate::AuthProfile;

/// Perform one login call and extract the issued token
///
/// Returns `None` (after a warning) when the profile is absent, the request
/// fails, or no token can be found in the response.
pub async fn login(
    context: &ExecutionContext,
    base_url: &str,
    profile: &AuthProfile,
    credentials: &AuthSettings,
) -> Option<String> {
    if !profile.present {
        return None;
    }

    let mut body = serde_json::Map::new();
    body.insert(
        profile.credential_field().to_string(),
        Value::String(credentials.test_identity.clone()),
    );
    body.insert(
        "password".to_string(),
        Value::String(credentials.test_password.clone()),
    );
    let body = Value::Object(body);
    let request =
        HttpRequest::new(profile.login_method(), join_url(base_url, profile.login_path())).json(&body);

    let reply = match context.send(request).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!("Login request failed: {}", e);
            return None;
        }
    };

    if reply.status >= 400 {
        tracing::warn!("Login to {} returned {}", profile.login_path(), reply.status);
        return None;
    }

    let token = serde_json::from_str::<Value>(&reply.body)
        .ok()
        .and_then(|json| find_token(&json, profile.token_field()));

    if token.is_none() {
        tracing::warn!("Login response carried no {} field", profile.token_field());
    }
    token
}

fn find_token(json: &Value, field: &str) -> Option<String> {
    let candidates = [field, "token", "accessToken", "access_token"];
    for scope in [Some(json), json.get("data")].into_iter().flatten() {
        for key in candidates {
            if let Some(token) = scope.get(key).and_then(Value::as_str) {
                if !token.is_empty() {
                    return Some(token.to_string());
                }
            }
        }
    }
    None
}
