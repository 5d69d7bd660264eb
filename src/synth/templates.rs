//! Deterministic probe bodies, one per category
//!
//! Every template stays inside the sandbox grammar and addresses the target
//! through the `BASE_URL` placeholder.

use crate::sandbox::BASE_URL_PLACEHOLDER;
use crate::{AuthProfile, ProbeCategory, RouteModel};

/// Token sent by the expired-token probe
pub const EXPIRED_TOKEN: &str = "expired.invalid.token";
/// Requests in the concurrency probe's burst
pub const CONCURRENCY_BURST: usize = 10;

const SQLI_PAYLOAD: &str = "' OR '1'='1";
const SQLI_QUERY: &str = "%27%20OR%20%271%27%3D%271";
const XSS_PAYLOAD: &str = "<script>alert(1)</script>";
const XSS_QUERY: &str = "%3Cscript%3Ealert(1)%3C%2Fscript%3E";

/// Single-quoted literal in probe syntax
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Builds template bodies for one route
pub struct TemplateBuilder<'a> {
    route: &'a RouteModel,
    auth: &'a AuthProfile,
    oversized_len: usize,
}

impl<'a> TemplateBuilder<'a> {
    pub fn new(route: &'a RouteModel, auth: &'a AuthProfile, oversized_len: usize) -> Self {
        Self {
            route,
            auth,
            oversized_len,
        }
    }

    fn url(&self, query: Option<&str>) -> String {
        let mut url = format!("{}{}", BASE_URL_PLACEHOLDER, self.route.concrete_path());
        if let Some(query) = query {
            url.push('?');
            url.push_str(query);
        }
        quote(&url)
    }

    /// Header object entries, or `None` when the route needs no credential
    fn credential(&self, token_expr: &str) -> Option<String> {
        if !self.route.auth_required {
            return None;
        }
        let (name, value) = self.auth.credential_header("");
        Some(format!("{}: `{}${{{}}}`", quote(&name), value, token_expr))
    }

    fn options(&self, headers: Option<String>, data: Option<String>) -> String {
        let mut fields = Vec::new();
        if let Some(headers) = headers {
            fields.push(format!("headers: {{ {} }}", headers));
        }
        if let Some(data) = data {
            fields.push(format!("data: {}", data));
        }
        if fields.is_empty() {
            String::new()
        } else {
            format!(", {{ {} }}", fields.join(", "))
        }
    }

    fn call(&self, query: Option<&str>, headers: Option<String>, data: Option<String>) -> String {
        format!(
            "request.{}({}{})",
            self.route.method.as_lower(),
            self.url(query),
            self.options(headers, data)
        )
    }

    fn wrap(&self, category: ProbeCategory, body: &str) -> String {
        let name = format!("{} {} - {}", self.route.method, self.route.path, category.describe());
        format!(
            "import {{ test, expect }} from '@playwright/test';\n\ntest({}, async ({{ request }}) => {{\n{}}});\n",
            quote(&name),
            body
        )
    }

    /// Body for a category; bodies for routes without a request body put
    /// payloads in the query string and only expect a handled response
    pub fn build(&self, category: ProbeCategory) -> String {
        let has_body = self.route.method.has_body();
        let auth = self.credential("authToken");
        let rejects_input = if has_body {
            "  expect(response.status()).toBeGreaterThanOrEqual(400);\n"
        } else {
            "  expect(response.status()).toBeLessThan(500);\n"
        };

        let body = match category {
            ProbeCategory::Happy => {
                let data = has_body.then(|| "{ name: 'Test User', email: 'test@example.com' }".to_string());
                format!(
                    "  const response = await {};\n  expect(response.status()).toBeLessThan(500);\n",
                    self.call(None, auth, data)
                )
            }
            ProbeCategory::Malformed => {
                let (query, data) = if has_body {
                    (None, Some(quote("{\"invalid json")))
                } else {
                    (Some("filter=%7B%22invalid"), None)
                };
                format!("  const response = await {};\n{}", self.call(query, auth, data), rejects_input)
            }
            ProbeCategory::MissingFields => {
                let data = has_body.then(|| "{}".to_string());
                format!("  const response = await {};\n{}", self.call(None, auth, data), rejects_input)
            }
            ProbeCategory::WrongTypes => {
                let (query, data) = if has_body {
                    (None, Some("{ name: 12345, email: true, id: 'not-a-number' }".to_string()))
                } else {
                    (Some("id=not-a-number&limit=-1"), None)
                };
                format!("  const response = await {};\n{}", self.call(query, auth, data), rejects_input)
            }
            ProbeCategory::ExpiredToken => {
                let (name, value) = self.auth.credential_header(EXPIRED_TOKEN);
                let headers = format!("{}: {}", quote(&name), quote(&value));
                let data = has_body.then(|| "{ name: 'Test User' }".to_string());
                format!(
                    "  const response = await {};\n  expect(response.status()).toBe(401);\n",
                    self.call(None, Some(headers), data)
                )
            }
            ProbeCategory::Sqli => {
                let (query, data) = if has_body {
                    (None, Some(format!("{{ query: {}, id: {} }}", quote(SQLI_PAYLOAD), quote(SQLI_PAYLOAD))))
                } else {
                    (Some(format!("id={}", SQLI_QUERY)), None)
                };
                format!(
                    "  const response = await {};\n  const text = await response.text();\n  expect(text).not.toContain('SQL syntax');\n  expect(response.status()).toBeLessThan(500);\n",
                    self.call(query.as_deref(), auth, data)
                )
            }
            ProbeCategory::Xss => {
                let (query, data) = if has_body {
                    (None, Some(format!("{{ input: {}, name: {} }}", quote(XSS_PAYLOAD), quote(XSS_PAYLOAD))))
                } else {
                    (Some(format!("q={}", XSS_QUERY)), None)
                };
                format!(
                    "  const response = await {};\n  const text = await response.text();\n  expect(text).not.toContain({});\n",
                    self.call(query.as_deref(), auth, data),
                    quote(XSS_PAYLOAD)
                )
            }
            ProbeCategory::LargePayload => {
                let payload = format!("'A'.repeat({})", self.oversized_len);
                let call = if has_body {
                    self.call(None, auth, Some(format!("{{ data: {} }}", payload)))
                } else {
                    let url = format!(
                        "`{}{}?q=${{{}}}`",
                        BASE_URL_PLACEHOLDER,
                        self.route.concrete_path().replace('`', "%60"),
                        payload
                    );
                    format!(
                        "request.{}({}{})",
                        self.route.method.as_lower(),
                        url,
                        self.options(auth, None)
                    )
                };
                format!(
                    "  const response = await {};\n  expect(response.status()).toBeLessThan(500);\n",
                    call
                )
            }
            ProbeCategory::Concurrency => {
                let data = has_body.then(|| "{ name: 'Test User', email: 'test@example.com' }".to_string());
                format!(
                    "  const responses = await Promise.all(\n    Array.from({{ length: {} }}, () => {})\n  );\n  expect(responses.length).toBe({});\n  for (const response of responses) {{\n    expect(response.status()).toBeLessThan(500);\n  }}\n",
                    CONCURRENCY_BURST,
                    self.call(None, auth, data),
                    CONCURRENCY_BURST
                )
            }
        };

        self.wrap(category, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::{parse, substitute_base_url};
    use crate::synth::gate;
    use crate::HttpMethod;

    fn routes() -> Vec<RouteModel> {
        vec![
            RouteModel::new(HttpMethod::Get, "/api/users/:id", "a.js:1"),
            RouteModel::new(HttpMethod::Post, "/api/users", "a.js:2").with_auth(true),
            RouteModel::new(HttpMethod::Delete, "/it's", "a.js:3").with_auth(true),
        ]
    }

    #[test]
    fn test_every_template_parses_and_passes_gate() {
        let auth = AuthProfile::default();
        for route in routes() {
            let builder = TemplateBuilder::new(&route, &auth, 100_000);
            for category in ProbeCategory::for_route(&route) {
                let code = builder.build(category);
                assert!(gate::accepts(&code), "{}", code);
                let code = substitute_base_url(&code, "http://x.test");
                if let Err(e) = parse(&code) {
                    panic!("{} {} does not parse: {}\n{}", route, category, e, code);
                }
            }
        }
    }

    #[test]
    fn test_auth_header_only_when_required() {
        let auth = AuthProfile::default();
        let routes = routes();
        let open = TemplateBuilder::new(&routes[0], &auth, 10).build(ProbeCategory::Happy);
        assert!(!open.contains("authToken"));

        let guarded = TemplateBuilder::new(&routes[1], &auth, 10).build(ProbeCategory::Happy);
        assert!(guarded.contains("'Authorization': `Bearer ${authToken}`"), "{}", guarded);
    }

    #[test]
    fn test_custom_token_header() {
        let auth = AuthProfile {
            present: true,
            token_header_name: Some("x-access-token".to_string()),
            ..Default::default()
        };
        let route = RouteModel::new(HttpMethod::Post, "/api/orders", "a.js:1").with_auth(true);
        let code = TemplateBuilder::new(&route, &auth, 10).build(ProbeCategory::ExpiredToken);
        assert!(code.contains("'x-access-token': 'expired.invalid.token'"), "{}", code);
        assert!(code.contains("toBe(401)"));
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("it's"), "'it\\'s'");
    }
}
