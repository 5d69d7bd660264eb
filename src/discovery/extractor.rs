//! Route extraction from source files

use super::lexer::{call_sites, identifier_chains};
use crate::scanner::SourceFile;
use crate::RouteModel;

/// Lines inspected on each side of a declaration for auth guards
pub const AUTH_WINDOW: usize = 5;

/// Lowercased substrings that mark a route as guarded
pub const AUTH_KEYWORDS: &[&str] = &[
    "passport.authenticate",
    "authenticate",
    "requireauth",
    "jwt",
    "verifytoken",
    "isauthenticated",
    "authmiddleware",
    "ensureauth",
];

/// Extracts routes from source text using the call-site grammar
#[derive(Debug, Clone, Default)]
pub struct EndpointExtractor;

impl EndpointExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract every route declared in a file
    pub fn extract_file(&self, file: &SourceFile) -> Vec<RouteModel> {
        self.extract(&file.relative, &file.content)
    }

    /// Extract every route declaration in `content`
    ///
    /// Each syntactic occurrence yields one route, duplicates included. Text
    /// that contains no recognisable declaration yields an empty list.
    pub fn extract(&self, location: &str, content: &str) -> Vec<RouteModel> {
        let lines: Vec<&str> = content.lines().collect();
        let mut routes = Vec::new();

        for (idx, line) in lines.iter().enumerate() {
            for site in call_sites(line) {
                let (guarded, middleware) = Self::inspect_auth_window(&lines, idx);
                let mut route =
                    RouteModel::new(site.method, site.path, format!("{}:{}", location, idx + 1))
                        .with_auth(guarded);
                if let Some(name) = middleware {
                    route = route.with_middleware(name);
                }

                routes.push(route);
            }
        }

        routes
    }

    /// Look for auth keywords within ±AUTH_WINDOW lines of `idx`
    ///
    /// Returns whether any keyword was seen and the first identifier chain in
    /// the window that carries one.
    fn inspect_auth_window(lines: &[&str], idx: usize) -> (bool, Option<String>) {
        let start = idx.saturating_sub(AUTH_WINDOW);
        let end = (idx + AUTH_WINDOW + 1).min(lines.len());
        let window = &lines[start..end];

        let text = window.join("\n").to_lowercase();
        if !AUTH_KEYWORDS.iter().any(|k| text.contains(k)) {
            return (false, None);
        }

        let middleware = window
            .iter()
            .flat_map(|line| identifier_chains(line))
            .find(|chain| {
                let lower = chain.to_lowercase();
                AUTH_KEYWORDS.iter().any(|k| lower.contains(k))
            });

        (true, middleware)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HttpMethod;

    #[test]
    fn test_counts_every_declaration_including_duplicates() {
        let content = r#"
const router = express.Router();
router.get('/users', list);
router.get('/users', list);
app.post('/users', create); app.put('/users/:id', update);
"#;
        let routes = EndpointExtractor::new().extract("routes.js", content);
        assert_eq!(routes.len(), 4);
        assert_eq!(routes[0].key(), routes[1].key());
        assert_eq!(routes[0].source_location, "routes.js:3");
        assert_eq!(routes[3].method, HttpMethod::Put);
        assert_eq!(routes[3].source_location, "routes.js:5");
    }

    #[test]
    fn test_auth_window_marks_guarded_routes() {
        let mut content = String::from("router.get('/me', passport.authenticate('jwt'), me);\n");
        for _ in 0..10 {
            content.push_str("// filler\n");
        }
        content.push_str("router.get('/public', open);\n");

        let routes = EndpointExtractor::new().extract("auth.js", &content);
        assert_eq!(routes.len(), 2);
        assert!(routes[0].auth_required);
        assert!(routes[0].middleware.contains("passport.authenticate"));
        assert!(!routes[1].auth_required);
        assert!(routes[1].middleware.is_empty());
    }

    #[test]
    fn test_window_reaches_neighbouring_lines() {
        let content = "const requireAuth = require('./guard');\n\nrouter.delete('/items/:id', requireAuth, rm);";
        let routes = EndpointExtractor::new().extract("items.js", content);
        assert!(routes[0].auth_required);
        assert!(routes[0].middleware.contains("requireAuth"));
    }

    /// A keyword line `distance` lines above or below a single declaration
    fn keyword_at(distance: usize, above: bool) -> String {
        let keyword = "const guard = verifyToken;\n";
        let route = "router.get('/account', show);\n";
        let filler = "// filler\n".repeat(distance - 1);
        if above {
            format!("{}{}{}", keyword, filler, route)
        } else {
            format!("{}{}{}", route, filler, keyword)
        }
    }

    #[test]
    fn test_window_edges_are_inclusive() {
        for above in [true, false] {
            let inside = EndpointExtractor::new().extract("edge.js", &keyword_at(AUTH_WINDOW, above));
            assert_eq!(inside.len(), 1);
            assert!(inside[0].auth_required, "keyword {} lines away, above={}", AUTH_WINDOW, above);
            assert!(inside[0].middleware.contains("verifyToken"));

            let outside = EndpointExtractor::new().extract("edge.js", &keyword_at(AUTH_WINDOW + 1, above));
            assert_eq!(outside.len(), 1);
            assert!(!outside[0].auth_required, "keyword {} lines away, above={}", AUTH_WINDOW + 1, above);
            assert!(outside[0].middleware.is_empty());
        }
    }

    #[test]
    fn test_garbage_yields_nothing() {
        let routes = EndpointExtractor::new().extract("x.bin", "\u{0}\u{1}((('unterminated");
        assert!(routes.is_empty());
    }
}
