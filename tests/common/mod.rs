//! Shared test utilities for pipeline integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

use routeprobe::http::{HttpReply, HttpRequest, HttpTransport, NetworkProbeError};
use routeprobe::llm::{CompletionBackend, GenerationError};

/// Write a file below `dir`, creating parent directories
pub fn write_file(dir: &Path, relative: &str, content: &str) {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create fixture directory");
    }
    fs::write(path, content).expect("Failed to write fixture file");
}

/// Routes declared by [`create_fixture_project`]
pub const FIXTURE_ROUTES: usize = 5;
/// Probes synthesized for the fixture: two guarded routes (9 each), three public (8 each)
pub const FIXTURE_PROBES: usize = 2 * 9 + 3 * 8;

/// Creates a small Express project with a JWT login and a duplicated route
pub fn create_fixture_project() -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = temp_dir.path();

    write_file(
        root,
        "package.json",
        r#"{"name": "shop", "dependencies": {"express": "^4.18.0", "jsonwebtoken": "^9.0.0"}}"#,
    );

    write_file(
        root,
        "src/routes/auth.js",
        r#"const router = require('express').Router();
const jwt = require('jsonwebtoken');

router.post('/api/auth/login', (req, res) => {
  const email = req.body.email;
  const token = jwt.sign({ email }, process.env.JWT_SECRET);
  res.json({ token });
});

module.exports = router;
"#,
    );

    write_file(
        root,
        "src/routes/orders.js",
        r#"const router = require('express').Router();
const verifyToken = require('../middleware/verifyToken');

router.post('/api/orders', verifyToken, createOrder);

module.exports = router;
"#,
    );

    write_file(
        root,
        "src/routes/public.js",
        r#"const router = require('express').Router();

router.get('/api/health', health);
router.get('/api/products', listProducts);
router.get('/api/products', listProducts);

module.exports = router;
"#,
    );

    // Never scanned
    write_file(root, "node_modules/express/index.js", "app.get('/internal', h);");
    write_file(root, "src/routes/public.test.js", "app.get('/from-test', h);");

    temp_dir
}

type Responder = Box<dyn Fn(&HttpRequest) -> Result<HttpReply, String> + Send + Sync>;

/// Transport answering from a closure and recording everything it sees
pub struct FakeTransport {
    responder: Responder,
    pub requests: Mutex<Vec<HttpRequest>>,
    pub opened: AtomicUsize,
    pub released: AtomicUsize,
}

impl FakeTransport {
    pub fn new(responder: impl Fn(&HttpRequest) -> Result<HttpReply, String> + Send + Sync + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
            opened: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
        }
    }

    /// A healthy service: login issues a token, everything else answers 200
    pub fn healthy() -> Self {
        Self::new(|request| {
            if request.url.ends_with("/api/auth/login") {
                Ok(HttpReply::new(200, r#"{"token":"fixture-token"}"#))
            } else {
                Ok(HttpReply::new(200, "[]"))
            }
        })
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn count_matching(&self, suffix: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url.ends_with(suffix))
            .count()
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpReply, NetworkProbeError> {
        self.requests.lock().unwrap().push(request.clone());
        (self.responder)(&request).map_err(|message| NetworkProbeError::Transport {
            method: request.method,
            url: request.url,
            message,
        })
    }

    fn context_opened(&self, _stage: &str) {
        self.opened.fetch_add(1, Ordering::SeqCst);
    }

    fn context_released(&self, _stage: &str) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Backend replaying a script, then repeating its fallback
pub struct ScriptedBackend {
    script: Mutex<Vec<Result<String, GenerationError>>>,
    fallback: String,
    pub calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new(script: Vec<Result<String, GenerationError>>, fallback: impl Into<String>) -> Self {
        Self {
            script: Mutex::new(script),
            fallback: fallback.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Always answers with something that is not a probe
    pub fn unhelpful() -> Self {
        Self::new(Vec::new(), "Sorry, I cannot help with that.")
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn complete(&self, _prompt: &str, _system: Option<&str>) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        if script.is_empty() {
            Ok(self.fallback.clone())
        } else {
            script.remove(0)
        }
    }

    fn id(&self) -> &str {
        "scripted"
    }
}
