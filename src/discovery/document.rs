//! OpenAPI-style interface document loading
//!
//! Only JSON documents are accepted. A document must carry a top-level `paths`
//! object mapping path strings to per-method operation objects.

use serde_json::Value;
use std::path::Path;
use std::time::Duration;

use crate::{AuthProfile, HttpMethod, RouteModel};

/// The interface document is unusable
#[derive(Debug, thiserror::Error)]
pub enum SpecFormatError {
    #[error("Interface document has no top-level \"paths\" object")]
    MissingPaths,

    #[error("Interface document is YAML; only JSON documents are supported")]
    YamlUnsupported,

    #[error("Interface document is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Failed to fetch interface document {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Failed to read interface document: {0}")]
    Read(#[from] std::io::Error),
}

/// A parsed interface document
#[derive(Debug, Clone)]
pub struct InterfaceDocument {
    root: Value,
}

impl InterfaceDocument {
    /// Parse document text, rejecting YAML and documents without `paths`
    pub fn parse(text: &str) -> Result<Self, SpecFormatError> {
        let root: Value = match serde_json::from_str(text) {
            Ok(root) => root,
            Err(json_err) => {
                if looks_like_yaml(text) {
                    return Err(SpecFormatError::YamlUnsupported);
                }
                return Err(SpecFormatError::InvalidJson(json_err));
            }
        };

        if !root.get("paths").is_some_and(Value::is_object) {
            return Err(SpecFormatError::MissingPaths);
        }

        Ok(Self { root })
    }

    /// Load a document from a local file
    pub fn from_file(path: &Path) -> Result<Self, SpecFormatError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Fetch a document over HTTP GET
    ///
    /// Blocking; call from a blocking context.
    pub fn fetch(url: &str, timeout: Duration) -> Result<Self, SpecFormatError> {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(10))
            .timeout(timeout)
            .build();

        let response = agent.get(url).call().map_err(|e| SpecFormatError::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        let text = response.into_string().map_err(|e| SpecFormatError::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        Self::parse(&text)
    }

    /// One route per (path, standard verb) pair present in the document
    ///
    /// `authRequired` is true when the operation declares a non-empty
    /// `security` array.
    pub fn routes(&self) -> Vec<RouteModel> {
        let Some(paths) = self.root.get("paths").and_then(Value::as_object) else {
            return Vec::new();
        };

        let mut routes = Vec::new();
        for (path, item) in paths {
            let Some(item) = item.as_object() else {
                continue;
            };
            for method in HttpMethod::ALL {
                let Some(operation) = item.get(method.as_lower()) else {
                    continue;
                };
                let secured = operation
                    .get("security")
                    .and_then(Value::as_array)
                    .is_some_and(|reqs| !reqs.is_empty());
                let route = RouteModel::new(method, path.clone(), format!("openapi:{}", path))
                    .with_auth(secured);
                routes.push(route);
            }
        }
        routes
    }

    /// Derive an auth profile from security schemes and login-like paths
    pub fn auth_profile(&self) -> AuthProfile {
        let mut profile = AuthProfile::absent();

        let schemes = self
            .root
            .pointer("/components/securitySchemes")
            .or_else(|| self.root.get("securityDefinitions"))
            .and_then(Value::as_object);

        if let Some(schemes) = schemes {
            for scheme in schemes.values() {
                let kind = scheme.get("type").and_then(Value::as_str).unwrap_or("");
                match kind {
                    "http" | "oauth2" | "openIdConnect" => {
                        profile.present = true;
                        profile.token_header_name.get_or_insert_with(|| "Authorization".to_string());
                    }
                    "apiKey" => {
                        profile.present = true;
                        let in_header = scheme.get("in").and_then(Value::as_str) == Some("header");
                        if in_header {
                            if let Some(name) = scheme.get("name").and_then(Value::as_str) {
                                profile.token_header_name.get_or_insert_with(|| name.to_string());
                            }
                        }
                    }
                    _ => {}
                }
            }
        }

        if let Some(paths) = self.root.get("paths").and_then(Value::as_object) {
            let login = paths.iter().find(|(path, item)| {
                is_login_path(path) && item.get("post").is_some()
            });
            if let Some((path, _)) = login {
                profile.present = true;
                profile.login_path = Some(path.clone());
                profile.login_method = Some(HttpMethod::Post);
                profile.source = Some("openapi".to_string());
            }
        }

        if self.routes().iter().any(|r| r.auth_required) {
            profile.present = true;
        }

        profile
    }
}

/// Path strings that look like a login endpoint
pub fn is_login_path(path: &str) -> bool {
    let lower = path.to_lowercase();
    lower.contains("login") || lower.contains("signin") || lower.contains("auth")
}

fn looks_like_yaml(text: &str) -> bool {
    let trimmed = text.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return false;
    }
    matches!(
        serde_yaml::from_str::<serde_yaml::Value>(text),
        Ok(serde_yaml::Value::Mapping(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_route_document() {
        let doc = InterfaceDocument::parse(
            r#"{"paths": {"/a": {"get": {}}, "/b": {"post": {"security": [{}]}}}}"#,
        )
        .unwrap();
        let routes = doc.routes();

        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].method, HttpMethod::Get);
        assert_eq!(routes[0].path, "/a");
        assert!(!routes[0].auth_required);
        assert_eq!(routes[1].method, HttpMethod::Post);
        assert_eq!(routes[1].path, "/b");
        assert!(routes[1].auth_required);
    }

    #[test]
    fn test_non_verb_keys_and_empty_security() {
        let doc = InterfaceDocument::parse(
            r#"{"paths": {"/a": {"parameters": [], "get": {"security": []}, "trace": {}}}}"#,
        )
        .unwrap();
        let routes = doc.routes();
        assert_eq!(routes.len(), 1);
        assert!(!routes[0].auth_required);
    }

    #[test]
    fn test_missing_paths_is_format_error() {
        let err = InterfaceDocument::parse(r#"{"openapi": "3.0.0"}"#).unwrap_err();
        assert!(matches!(err, SpecFormatError::MissingPaths));

        let err = InterfaceDocument::parse(r#"{"paths": []}"#).unwrap_err();
        assert!(matches!(err, SpecFormatError::MissingPaths));
    }

    #[test]
    fn test_yaml_is_rejected() {
        let err = InterfaceDocument::parse("openapi: 3.0.0\npaths:\n  /a:\n    get: {}\n").unwrap_err();
        assert!(matches!(err, SpecFormatError::YamlUnsupported));
    }

    #[test]
    fn test_auth_profile_from_schemes() {
        let doc = InterfaceDocument::parse(
            r#"{
                "components": {"securitySchemes": {"key": {"type": "apiKey", "in": "header", "name": "X-API-Key"}}},
                "paths": {"/auth/signin": {"post": {}}, "/items": {"get": {}}}
            }"#,
        )
        .unwrap();
        let profile = doc.auth_profile();
        assert!(profile.present);
        assert_eq!(profile.token_header_name(), "X-API-Key");
        assert_eq!(profile.login_path(), "/auth/signin");
    }
}
