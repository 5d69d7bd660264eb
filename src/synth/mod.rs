//! Probe synthesis
//!
//! Every route gets the fixed category catalogue. Each category starts from
//! a deterministic template; when generation is enabled the backend is asked
//! for a rewrite of every category at once, and a rewrite replaces its
//! template only if it passes the structural gate.

pub mod gate;
pub mod store;
pub mod templates;

pub use store::ProbeStore;
pub use templates::TemplateBuilder;

use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ProbeSettings;
use crate::llm::{extract_code, CompletionBackend, GenerationError};
use crate::sandbox::BASE_URL_PLACEHOLDER;
use crate::{AuthProfile, ProbeCategory, ProbeOrigin, ProbeSpec, RouteModel};

/// System instruction shared by synthesis and remediation
pub const SYSTEM_PROMPT: &str = "You write API tests with Playwright's request fixture. \
Reply with a single TypeScript file and nothing else. \
The file must import { test, expect } from '@playwright/test' and declare tests as \
test('name', async ({ request }) => { ... }). \
Use only request.get/post/put/patch/delete(url, { headers, data }), Promise.all, \
const/let bindings, for...of loops and expect(...) with toBe, toBeLessThan, \
toBeGreaterThanOrEqual, toBeDefined, toContain or not.toContain. \
Responses support status(), ok(), text(), json() and headers(). \
Prefix every URL with the literal BASE_URL, and read the bearer token from the authToken variable.";

const GENERATE_TEMPLATE: &str = "Write a {category} test for the endpoint {method} {path}.
Authentication required: {auth}.
Cover the happy path, invalid input, missing fields, wrong types, SQL injection and XSS where they apply to this scenario.
Build URLs as '{base}{path}'.{auth_hint}
Return only the test code.

Starting point:
{template}";

/// Prompt asking the backend to rewrite one category's template
pub fn generation_prompt(route: &RouteModel, category: ProbeCategory, template: &str, auth: &AuthProfile) -> String {
    let auth_hint = if route.auth_required {
        let (name, value) = auth.credential_header("${authToken}");
        format!("\nSend the header {}: `{}`.", name, value)
    } else {
        String::new()
    };
    GENERATE_TEMPLATE
        .replace("{category}", category.describe())
        .replace("{method}", route.method.as_str())
        .replace("{path}", &route.path)
        .replace("{auth}", if route.auth_required { "yes" } else { "no" })
        .replace("{base}", BASE_URL_PLACEHOLDER)
        .replace("{auth_hint}", &auth_hint)
        .replace("{template}", template)
}

pub struct ProbeSynthesizer {
    backend: Arc<dyn CompletionBackend>,
    store: ProbeStore,
    generate: bool,
    oversized_len: usize,
    /// Routes synthesized so far, per file stem
    seen: HashMap<String, usize>,
}

impl ProbeSynthesizer {
    pub fn new(backend: Arc<dyn CompletionBackend>, store: ProbeStore, settings: &ProbeSettings) -> Self {
        Self {
            backend,
            store,
            generate: settings.generate,
            oversized_len: settings.oversized_payload_len,
            seen: HashMap::new(),
        }
    }

    /// Build, optionally rewrite, and persist the probes of one route
    ///
    /// A duplicated route gets its own ids and files, so its bodies never
    /// replace those of an earlier declaration.
    pub async fn synthesize(&mut self, route: &RouteModel, auth: &AuthProfile) -> Vec<ProbeSpec> {
        let occurrence = {
            let count = self.seen.entry(route.file_stem()).or_insert(0);
            *count += 1;
            *count
        };
        let builder = TemplateBuilder::new(route, auth, self.oversized_len);
        let mut probes: Vec<ProbeSpec> = ProbeCategory::for_route(route)
            .into_iter()
            .map(|category| {
                ProbeSpec::new(route.clone(), category, builder.build(category)).with_occurrence(occurrence)
            })
            .collect();

        if self.generate {
            let rewrites = join_all(probes.iter().map(|probe| self.rewrite(probe, auth))).await;
            for (probe, rewrite) in probes.iter_mut().zip(rewrites) {
                match rewrite {
                    Ok(Some(code)) => {
                        probe.code = code;
                        probe.origin = ProbeOrigin::Generated;
                    }
                    Ok(None) => {
                        tracing::debug!("Rewrite of {} failed the structural gate, keeping template", probe.id);
                    }
                    Err(GenerationError::Disabled) => {}
                    Err(e) => {
                        tracing::warn!("Generation for {} failed, keeping template: {}", probe.id, e);
                    }
                }
            }
        }

        for probe in &mut probes {
            match self.store.write(probe) {
                Ok(path) => probe.file = Some(path),
                Err(e) => {
                    tracing::warn!("Failed to persist probe {}: {}", probe.id, e);
                }
            }
        }
        probes
    }

    /// `Ok(None)` when the backend answered with something that is not a probe
    async fn rewrite(&self, probe: &ProbeSpec, auth: &AuthProfile) -> Result<Option<String>, GenerationError> {
        let prompt = generation_prompt(&probe.route, probe.category, &probe.code, auth);
        let reply = self.backend.complete(&prompt, Some(SYSTEM_PROMPT)).await?;
        let code = extract_code(&reply);
        Ok(gate::accepts(&code).then_some(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::DisabledBackend;
    use crate::HttpMethod;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    const GENERATED: &str = "```ts\nimport { test, expect } from '@playwright/test';\ntest('gen', async ({ request }) => {\n  const r = await request.get('BASE_URL/x');\n  expect(r.status()).toBe(200);\n});\n```";

    struct Fixed {
        reply: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CompletionBackend for Fixed {
        async fn complete(&self, _prompt: &str, _system: Option<&str>) -> Result<String, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.to_string())
        }

        fn id(&self) -> &str {
            "fixed"
        }
    }

    fn synthesizer(backend: Arc<dyn CompletionBackend>, dir: &TempDir) -> ProbeSynthesizer {
        ProbeSynthesizer::new(backend, ProbeStore::new(dir.path()), &ProbeSettings::default())
    }

    #[tokio::test]
    async fn test_templates_when_backend_disabled() {
        let temp = TempDir::new().unwrap();
        let route = RouteModel::new(HttpMethod::Get, "/api/items", "a.js:1");
        let probes = synthesizer(Arc::new(DisabledBackend), &temp)
            .synthesize(&route, &AuthProfile::default())
            .await;

        // No expired_token probe for a public route
        assert_eq!(probes.len(), 8);
        assert!(probes.iter().all(|p| p.origin == ProbeOrigin::Template));
        for probe in &probes {
            let path = probe.file.as_ref().unwrap();
            assert_eq!(std::fs::read_to_string(path).unwrap(), probe.code);
        }
    }

    #[tokio::test]
    async fn test_accepted_rewrite_replaces_template() {
        let temp = TempDir::new().unwrap();
        let backend = Arc::new(Fixed {
            reply: GENERATED,
            calls: AtomicUsize::new(0),
        });
        let route = RouteModel::new(HttpMethod::Post, "/api/items", "a.js:1").with_auth(true);
        let probes = synthesizer(backend.clone(), &temp)
            .synthesize(&route, &AuthProfile::default())
            .await;

        assert_eq!(probes.len(), 9);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 9);
        assert!(probes.iter().all(|p| p.origin == ProbeOrigin::Generated));
        assert!(probes[0].code.starts_with("import { test, expect }"));
        assert!(!probes[0].code.contains("```"));
    }

    #[tokio::test]
    async fn test_rejected_rewrite_keeps_template() {
        let temp = TempDir::new().unwrap();
        let backend = Arc::new(Fixed {
            reply: "I can't write tests for this endpoint.",
            calls: AtomicUsize::new(0),
        });
        let route = RouteModel::new(HttpMethod::Get, "/api/items", "a.js:1");
        let probes = synthesizer(backend, &temp)
            .synthesize(&route, &AuthProfile::default())
            .await;
        assert!(probes.iter().all(|p| p.origin == ProbeOrigin::Template));
        assert!(probes.iter().all(|p| gate::accepts(&p.code)));
    }

    #[tokio::test]
    async fn test_duplicate_routes_keep_their_own_files() {
        let temp = TempDir::new().unwrap();
        let mut synth = synthesizer(Arc::new(DisabledBackend), &temp);
        let guarded = RouteModel::new(HttpMethod::Get, "/api/profile", "src/a.js:1").with_auth(true);
        let public = RouteModel::new(HttpMethod::Get, "/api/profile", "src/b.js:1");
        let auth = AuthProfile::default();

        let first = synth.synthesize(&guarded, &auth).await;
        let second = synth.synthesize(&public, &auth).await;

        assert_eq!(first[0].id, "get_api_profile_happy");
        assert_eq!(second[0].id, "get_api_profile-2_happy");
        let happy = std::fs::read_to_string(first[0].file.as_ref().unwrap()).unwrap();
        assert_eq!(happy, first[0].code);
        assert!(happy.contains("Authorization"));
        assert!(!second[0].code.contains("Authorization"));

        let numbered = RouteModel::new(HttpMethod::Get, "/api/profile/2", "src/c.js:1");
        let third = synth.synthesize(&numbered, &auth).await;
        assert_eq!(third[0].id, "get_api_profile_2_happy");
        assert_eq!(
            std::fs::read_dir(temp.path()).unwrap().count(),
            first.len() + second.len() + third.len()
        );
    }

    #[test]
    fn test_generation_prompt_mentions_route() {
        let route = RouteModel::new(HttpMethod::Put, "/api/users/:id", "a.js:1").with_auth(true);
        let prompt = generation_prompt(&route, ProbeCategory::Sqli, "TEMPLATE", &AuthProfile::default());
        assert!(prompt.contains("PUT /api/users/:id"));
        assert!(prompt.contains("Authentication required: yes"));
        assert!(prompt.contains("Bearer ${authToken}"));
        assert!(prompt.ends_with("TEMPLATE"));
    }
}
