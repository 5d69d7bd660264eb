//! Route and auth discovery over project trees and interface documents

mod common;

use common::{create_fixture_project, write_file, FIXTURE_ROUTES};
use routeprobe::discovery::{discover_document, discover_project, InterfaceDocument, SpecFormatError};
use routeprobe::scanner::{ScanError, SourceScanner};
use routeprobe::HttpMethod;
use tempfile::TempDir;

#[test]
fn test_fixture_project_routes_and_auth() {
    let project = create_fixture_project();
    let found = discover_project(&SourceScanner::new(project.path())).unwrap();

    assert_eq!(found.routes.len(), FIXTURE_ROUTES);

    let products: Vec<_> = found
        .routes
        .iter()
        .filter(|r| r.method == HttpMethod::Get && r.path == "/api/products")
        .collect();
    assert_eq!(products.len(), 2, "duplicate declarations are kept");
    assert!(products.iter().all(|r| !r.auth_required));

    let orders = found.routes.iter().find(|r| r.path == "/api/orders").unwrap();
    assert!(orders.auth_required);
    assert_eq!(orders.source_location, "src/routes/orders.js:4");

    assert!(!found.routes.iter().any(|r| r.path == "/internal" || r.path == "/from-test"));

    let auth = &found.auth;
    assert!(auth.present);
    assert_eq!(auth.login_path(), "/api/auth/login");
    assert_eq!(auth.login_method(), HttpMethod::Post);
    assert_eq!(auth.token_field(), "token");
    assert_eq!(auth.source.as_deref(), Some("src/routes/auth.js"));
}

#[test]
fn test_every_declaration_yields_one_route() {
    let dir = TempDir::new().unwrap();
    let styles = ["router", "app"];
    let verbs = ["get", "post", "put", "patch", "delete"];

    let mut content = String::from("const express = require('express');\n");
    let mut expected = 0;
    for (i, verb) in verbs.iter().enumerate() {
        for style in styles {
            content.push_str(&format!("{}.{}('/api/r{}', handler);\n", style, verb, i));
            expected += 1;
        }
    }
    // Same (method, path) twice
    content.push_str("router.get('/api/r0', handler);\n");
    expected += 1;
    write_file(dir.path(), "server.js", &content);

    let found = discover_project(&SourceScanner::new(dir.path())).unwrap();
    assert_eq!(found.routes.len(), expected);
    let r0 = found
        .routes
        .iter()
        .filter(|r| r.method == HttpMethod::Get && r.path == "/api/r0")
        .count();
    assert_eq!(r0, 3);
}

#[test]
fn test_no_declarations_is_empty_not_error() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "lib/util.js", "module.exports = (a, b) => a + b;\n");
    let found = discover_project(&SourceScanner::new(dir.path())).unwrap();
    assert!(found.routes.is_empty());
    assert!(!found.auth.present);
}

#[test]
fn test_missing_root_is_scan_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope");
    let err = discover_project(&SourceScanner::new(&missing)).unwrap_err();
    assert!(matches!(err, ScanError::RootMissing(_)));
}

#[test]
fn test_document_yields_two_routes() {
    let document = InterfaceDocument::parse(
        r#"{"paths": {"/a": {"get": {}}, "/b": {"post": {"security": [{}]}}}}"#,
    )
    .unwrap();
    let found = discover_document(&document);

    assert_eq!(found.routes.len(), 2);
    assert_eq!(found.routes[0].method, HttpMethod::Get);
    assert_eq!(found.routes[0].path, "/a");
    assert!(!found.routes[0].auth_required);
    assert_eq!(found.routes[1].method, HttpMethod::Post);
    assert_eq!(found.routes[1].path, "/b");
    assert!(found.routes[1].auth_required);
}

#[test]
fn test_document_format_errors() {
    assert!(matches!(
        InterfaceDocument::parse("openapi: 3.0.0\npaths:\n  /a:\n    get: {}\n"),
        Err(SpecFormatError::YamlUnsupported)
    ));
    assert!(matches!(
        InterfaceDocument::parse(r#"{"openapi": "3.0.0"}"#),
        Err(SpecFormatError::MissingPaths)
    ));
    assert!(matches!(
        InterfaceDocument::parse("{not json"),
        Err(SpecFormatError::InvalidJson(_))
    ));
}
