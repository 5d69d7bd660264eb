//! Route and auth discovery
//!
//! Routes come either from project sources (call-site grammar, see
//! [`lexer`]) or from an OpenAPI-style JSON document.

pub mod lexer;
mod auth_profiler;
mod document;
mod extractor;

pub use auth_profiler::AuthProfiler;
pub use document::{is_login_path, InterfaceDocument, SpecFormatError};
pub use extractor::{EndpointExtractor, AUTH_KEYWORDS, AUTH_WINDOW};

use crate::scanner::{ScanError, SourceFile, SourceScanner, ENTRY_POINTS};
use crate::{AuthProfile, RouteModel};

/// Manifests inspected for known auth libraries
const MANIFESTS: &[&str] = &["package.json", "requirements.txt", "pyproject.toml"];

/// Routes and auth profile found in one source
#[derive(Debug, Clone)]
pub struct Discovery {
    pub routes: Vec<RouteModel>,
    pub auth: AuthProfile,
}

/// Discover routes and auth profile from a project tree
pub fn discover_project(scanner: &SourceScanner) -> Result<Discovery, ScanError> {
    let sources = scanner.load()?;

    let extractor = EndpointExtractor::new();
    let routes: Vec<RouteModel> = sources
        .iter()
        .flat_map(|file| extractor.extract_file(file))
        .collect();

    // Entry points outside the candidate set are still profiled
    let mut profiled: Vec<SourceFile> = sources.clone();
    for name in ENTRY_POINTS {
        if profiled.iter().any(|f| f.relative == *name) {
            continue;
        }
        if let Some(content) = scanner.read_root_file(name) {
            profiled.push(SourceFile {
                path: scanner.root().join(name),
                relative: name.to_string(),
                content,
            });
        }
    }

    let manifests: Vec<(&str, String)> = MANIFESTS
        .iter()
        .filter_map(|name| scanner.read_root_file(name).map(|c| (*name, c)))
        .collect();

    let auth = AuthProfiler::new().profile(&profiled, &manifests);

    tracing::info!(
        "Discovered {} routes in {} files (auth: {})",
        routes.len(),
        sources.len(),
        auth.present
    );

    Ok(Discovery { routes, auth })
}

/// Discover routes and auth profile from an interface document
pub fn discover_document(document: &InterfaceDocument) -> Discovery {
    let routes = document.routes();
    let auth = document.auth_profile();
    tracing::info!("Discovered {} routes in interface document", routes.len());
    Discovery { routes, auth }
}
