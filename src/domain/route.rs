use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// HTTP methods recognised in route declarations and interface documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    /// The seven standard verbs, in the order documents are walked
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
        HttpMethod::Head,
        HttpMethod::Options,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// Lowercase form, as used by `app.get(...)` and document keys
    pub fn as_lower(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Patch => "patch",
            HttpMethod::Delete => "delete",
            HttpMethod::Head => "head",
            HttpMethod::Options => "options",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "get" => Some(HttpMethod::Get),
            "post" => Some(HttpMethod::Post),
            "put" => Some(HttpMethod::Put),
            "patch" => Some(HttpMethod::Patch),
            "delete" | "del" => Some(HttpMethod::Delete),
            "head" => Some(HttpMethod::Head),
            "options" => Some(HttpMethod::Options),
            _ => None,
        }
    }

    /// Whether requests with this method carry a JSON body
    pub fn has_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A discovered endpoint
///
/// Identity is the (method, path) pair. Duplicates are kept as found: the same
/// pair declared twice in the sources yields two routes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteModel {
    pub method: HttpMethod,

    /// Path as written in the declaration (e.g. "/api/users/:id")
    pub path: String,

    /// Where the route was declared ("src/routes/users.js:12" or "openapi:/users")
    pub source_location: String,

    /// Whether an auth guard was detected near the declaration
    pub auth_required: bool,

    /// Auth-related call names found around the declaration
    #[serde(default)]
    pub middleware: BTreeSet<String>,
}

impl RouteModel {
    pub fn new(method: HttpMethod, path: impl Into<String>, source_location: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            source_location: source_location.into(),
            auth_required: false,
            middleware: BTreeSet::new(),
        }
    }

    pub fn with_auth(mut self, auth_required: bool) -> Self {
        self.auth_required = auth_required;
        self
    }

    pub fn with_middleware(mut self, name: impl Into<String>) -> Self {
        self.middleware.insert(name.into());
        self
    }

    /// The (method, path) identity of this route
    pub fn key(&self) -> (HttpMethod, &str) {
        (self.method, self.path.as_str())
    }

    /// Path with parameter segments (`:id`, `{id}`) replaced by a concrete value
    pub fn concrete_path(&self) -> String {
        self.path
            .split('/')
            .map(|segment| {
                if segment.starts_with(':') || (segment.starts_with('{') && segment.ends_with('}')) {
                    "1"
                } else {
                    segment
                }
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// `<method>_<sanitized-path>` stem used for probe ids and file names
    pub fn file_stem(&self) -> String {
        let sanitized: String = self
            .path
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let sanitized = sanitized.trim_matches('_');
        let sanitized = if sanitized.is_empty() { "root" } else { sanitized };
        format!("{}_{}", self.method.as_lower(), sanitized)
    }
}

impl std::fmt::Display for RouteModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concrete_path_replaces_params() {
        let route = RouteModel::new(HttpMethod::Get, "/api/users/:id/posts/{postId}", "x.js:1");
        assert_eq!(route.concrete_path(), "/api/users/1/posts/1");
    }

    #[test]
    fn test_file_stem() {
        let route = RouteModel::new(HttpMethod::Post, "/api/users/:id", "x.js:1");
        assert_eq!(route.file_stem(), "post_api_users__id");

        let root = RouteModel::new(HttpMethod::Get, "/", "x.js:1");
        assert_eq!(root.file_stem(), "get_root");
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!(HttpMethod::from_str("PATCH"), Some(HttpMethod::Patch));
        assert_eq!(HttpMethod::from_str("trace"), None);
        assert!(HttpMethod::Put.has_body());
        assert!(!HttpMethod::Delete.has_body());
    }
}
