//! routeprobe - probe an HTTP API from its source or its interface document
//!
//! A run discovers the routes of a target service, synthesizes a fixed set of
//! probes per route, executes them in a closed sandbox against a live base
//! URL, and asks a generative backend to repair the probes that failed.
//!
//! ## Stages
//!
//! 1. **Discovery**: route declarations are pulled from a project tree
//!    (`router.get(...)` / `app.post(...)` call sites) or from an OpenAPI-style
//!    JSON document, together with an inferred login contract.
//!
//! 2. **Probing**: template probes (optionally rewritten by the backend) run
//!    in the sandbox; failures are remediated or reported as issues.
//!
//! 3. **Security and load**: adversarial payloads and concurrent bursts run
//!    directly against every route.

pub mod config;
pub mod discovery;
pub mod domain;
pub mod http;
pub mod llm;
pub mod performance;
pub mod pipeline;
pub mod remediation;
pub mod sandbox;
pub mod scanner;
pub mod security;
pub mod synth;

pub use domain::*;
