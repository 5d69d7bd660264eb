//! Scan command implementation

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use routeprobe::http::UreqTransport;
use routeprobe::llm::DisabledBackend;
use routeprobe::pipeline::{DocumentSource, PipelineOrchestrator, RunRequest};

/// Discover routes and the auth profile, then print them
pub async fn scan_command(path: Option<PathBuf>, config_path: Option<PathBuf>, spec: Option<String>) -> Result<()> {
    let work_dir = path.unwrap_or_else(|| PathBuf::from("."));
    let config = super::load_config(&work_dir, config_path.as_ref()).unwrap_or_else(|e| {
        tracing::warn!("{:#}, using defaults", e);
        routeprobe::config::Config::with_defaults()
    });

    // Discovery never touches the base URL
    let request = match spec {
        Some(spec) => RunRequest::new("").document(DocumentSource::parse(&spec)),
        None => RunRequest::new("").project(&work_dir),
    };
    let orchestrator = PipelineOrchestrator::new(config, Arc::new(UreqTransport::new()), Arc::new(DisabledBackend));
    let found = orchestrator.discover(&request).await?;

    if found.routes.is_empty() {
        println!("No routes found.");
    } else {
        println!("Found {} route(s):\n", found.routes.len());
        for route in &found.routes {
            let auth = if route.auth_required { " [auth]" } else { "" };
            println!("  {:<7} {}{}", route.method.as_str(), route.path, auth);
            println!("    {}", route.source_location);
        }
    }

    let auth = &found.auth;
    println!();
    if !auth.present {
        println!("Authentication: not detected");
        return Ok(());
    }
    println!("Authentication: detected");
    println!("  login:   {} {}", auth.login_method(), auth.login_path());
    println!("  fields:  {} -> {}", auth.credential_field(), auth.token_field());
    println!("  header:  {}", auth.token_header_name());
    if let Some(hint) = &auth.secret_hint {
        println!("  secret:  {}", hint);
    }
    if let Some(source) = &auth.source {
        println!("  source:  {}", source);
    }

    Ok(())
}
