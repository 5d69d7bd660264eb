//! Login contract inference from sources and dependency manifests

use once_cell::sync::Lazy;
use regex::Regex;

use super::document::is_login_path;
use super::lexer::call_sites;
use crate::scanner::SourceFile;
use crate::AuthProfile;

/// Dependencies that indicate an auth-aware target
const AUTH_LIBRARIES: &[&str] = &[
    "jsonwebtoken",
    "passport",
    "passport-jwt",
    "passport-local",
    "express-jwt",
    "express-session",
    "koa-jwt",
    "@fastify/jwt",
    "fastify-jwt",
    "@nestjs/jwt",
    "@nestjs/passport",
    "next-auth",
    "jose",
    "pyjwt",
    "flask-jwt-extended",
    "flask-login",
    "djangorestframework-simplejwt",
    "python-jose",
    "authlib",
];

static TOKEN_ISSUANCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:jwt\.sign|signToken|generateToken|createToken|generateAccessToken|create_access_token)\s*\(")
        .expect("valid regex")
});

static TOKEN_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:json|send)\s*\(\s*\{[^}]*?\b(accessToken|access_token|authToken|idToken|token)\b")
        .expect("valid regex")
});

static HEADER_MEMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"headers\s*(?:\.\s*(authorization)\b|\[\s*['"]([A-Za-z0-9-]+)['"]\s*\])"#)
        .expect("valid regex")
});

static HEADER_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\.(?:header|get)\s*\(\s*['"]([A-Za-z0-9-]+)['"]"#).expect("valid regex")
});

static CREDENTIAL_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:req\.body\.(email|username|login|user)\b|\{\s*(email|username|login)\s*,[^}]*\}\s*=\s*req\.body)")
        .expect("valid regex")
});

static SECRET_ENV: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"process\.env\.([A-Z0-9_]*(?:SECRET|KEY)[A-Z0-9_]*)").expect("valid regex")
});

static SECRET_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:secret|secretOrKey|SECRET)\s*[:=]\s*['"]([^'"]{4,})['"]"#).expect("valid regex")
});

/// Derives an [`AuthProfile`] from a file set
#[derive(Debug, Clone, Default)]
pub struct AuthProfiler;

impl AuthProfiler {
    pub fn new() -> Self {
        Self
    }

    /// Profile the sources, then confirm against manifests
    ///
    /// Each category keeps its first match. Source scanning stops after the
    /// file in which a login route was found; manifest inspection always runs
    /// and a known auth library alone marks the profile present.
    pub fn profile(&self, sources: &[SourceFile], manifests: &[(&str, String)]) -> AuthProfile {
        let mut profile = AuthProfile::absent();

        for file in sources {
            self.inspect_file(file, &mut profile);
            if profile.login_path.is_some() {
                tracing::debug!("Login route found in {}, stopping auth scan", file.relative);
                break;
            }
        }

        if profile.login_path.is_some()
            || profile.token_field.is_some()
            || profile.token_header_name.is_some()
        {
            profile.present = true;
        }

        for (name, content) in manifests {
            if let Some(library) = Self::auth_library(name, content) {
                tracing::debug!("Auth library {} declared in {}", library, name);
                profile.present = true;
                break;
            }
        }

        profile
    }

    fn inspect_file(&self, file: &SourceFile, profile: &mut AuthProfile) {
        for line in file.content.lines() {
            if profile.login_path.is_none() {
                if let Some(site) = call_sites(line).into_iter().find(|s| is_login_path(&s.path)) {
                    profile.login_path = Some(site.path);
                    profile.login_method = Some(site.method);
                    profile.source = Some(file.relative.clone());
                }
            }

            if profile.token_header_name.is_none() {
                profile.token_header_name = header_name(line);
            }

            if profile.credential_field.is_none() {
                if let Some(caps) = CREDENTIAL_FIELD.captures(line) {
                    profile.credential_field = caps
                        .get(1)
                        .or_else(|| caps.get(2))
                        .map(|m| m.as_str().to_string());
                }
            }

            if profile.secret_hint.is_none() {
                profile.secret_hint = secret_hint(line);
            }
        }

        if TOKEN_ISSUANCE.is_match(&file.content) && profile.token_field.is_none() {
            profile.token_field = Some(
                TOKEN_FIELD
                    .captures(&file.content)
                    .and_then(|caps| caps.get(1))
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_else(|| crate::DEFAULT_TOKEN_FIELD.to_string()),
            );
        }
    }

    /// Known auth library declared in a manifest, if any
    pub fn auth_library(name: &str, content: &str) -> Option<&'static str> {
        if name.ends_with("package.json") {
            let json: serde_json::Value = serde_json::from_str(content).ok()?;
            for section in ["dependencies", "devDependencies"] {
                if let Some(deps) = json.get(section).and_then(|d| d.as_object()) {
                    if let Some(lib) = AUTH_LIBRARIES.iter().find(|lib| deps.contains_key(**lib)) {
                        return Some(*lib);
                    }
                }
            }
            None
        } else {
            content.lines().find_map(|line| {
                let package = line
                    .split(|c: char| matches!(c, '=' | '<' | '>' | '~' | '[' | ';' | ' '))
                    .next()?
                    .trim()
                    .to_lowercase();
                AUTH_LIBRARIES.iter().find(|lib| **lib == package).copied()
            })
        }
    }
}

fn header_name(line: &str) -> Option<String> {
    if let Some(caps) = HEADER_MEMBER.captures(line) {
        let raw = caps.get(1).or_else(|| caps.get(2))?.as_str();
        return Some(normalize_header(raw));
    }
    let caps = HEADER_CALL.captures(line)?;
    let raw = caps.get(1)?.as_str();
    let lower = raw.to_lowercase();
    (lower.contains("auth") || lower.contains("token")).then(|| normalize_header(raw))
}

fn normalize_header(raw: &str) -> String {
    if raw.eq_ignore_ascii_case("authorization") {
        "Authorization".to_string()
    } else {
        raw.to_string()
    }
}

fn secret_hint(line: &str) -> Option<String> {
    if let Some(caps) = SECRET_ENV.captures(line) {
        return Some(format!("env:{}", &caps[1]));
    }
    let caps = SECRET_LITERAL.captures(line)?;
    let literal: String = caps[1].chars().take(4).collect();
    Some(format!("literal:{}…", literal))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(relative: &str, content: &str) -> SourceFile {
        SourceFile {
            path: relative.into(),
            relative: relative.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_full_express_profile() {
        let auth = source(
            "src/routes/auth.js",
            r#"
const jwt = require('jsonwebtoken');
router.post('/api/users/signin', async (req, res) => {
  const { username, password } = req.body;
  const token = jwt.sign({ id: user.id }, process.env.JWT_SECRET);
  res.json({ accessToken: token });
});
"#,
        );
        let guard = source(
            "src/middleware/guard.js",
            "const header = req.headers['x-access-token'];",
        );

        let profile = AuthProfiler::new().profile(&[auth, guard], &[]);
        assert!(profile.present);
        assert_eq!(profile.login_path(), "/api/users/signin");
        assert_eq!(profile.credential_field(), "username");
        assert_eq!(profile.token_field(), "accessToken");
        assert_eq!(profile.secret_hint.as_deref(), Some("env:JWT_SECRET"));
        assert_eq!(profile.source.as_deref(), Some("src/routes/auth.js"));
        // scanning stopped before the guard file
        assert_eq!(profile.token_header_name(), "Authorization");
        assert!(profile.token_header_name.is_none());
    }

    #[test]
    fn test_header_read_is_detected() {
        let guard = source(
            "guard.js",
            "const token = req.headers.authorization.split(' ')[1];",
        );
        let profile = AuthProfiler::new().profile(&[guard], &[]);
        assert!(profile.present);
        assert_eq!(profile.token_header_name.as_deref(), Some("Authorization"));
    }

    #[test]
    fn test_library_alone_marks_present_with_defaults() {
        let app = source("app.js", "app.get('/health', ok);");
        let manifest = r#"{"dependencies": {"express": "^4", "passport": "^0.7"}}"#.to_string();

        let profile = AuthProfiler::new().profile(&[app], &[("package.json", manifest)]);
        assert!(profile.present);
        assert!(profile.login_path.is_none());
        assert_eq!(profile.login_path(), "/api/auth/login");
        assert_eq!(profile.token_field(), "token");
    }

    #[test]
    fn test_requirements_manifest() {
        assert_eq!(
            AuthProfiler::auth_library("requirements.txt", "flask==3.0\nFlask-JWT-Extended>=4\n"),
            Some("flask-jwt-extended")
        );
        assert_eq!(AuthProfiler::auth_library("requirements.txt", "requests\n"), None);
    }

    #[test]
    fn test_no_auth_anywhere() {
        let app = source("app.js", "app.get('/items', list);");
        let profile = AuthProfiler::new().profile(&[app], &[("package.json", "{}".to_string())]);
        assert!(!profile.present);
    }
}
