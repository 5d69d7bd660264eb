//! Core domain types for routeprobe

mod auth;
mod finding;
mod issue;
mod log_event;
mod metric;
mod probe;
mod report;
mod route;

pub use auth::{
    AuthProfile, DEFAULT_CREDENTIAL_FIELD, DEFAULT_LOGIN_PATH, DEFAULT_TOKEN_FIELD,
    DEFAULT_TOKEN_HEADER,
};
pub use finding::{SecurityFinding, Severity, VulnerabilityKind};
pub use issue::{Issue, IssueCategory, Recommendation};
pub use log_event::{LogEvent, LogSeverity};
pub use metric::{PerformanceMetric, SpeedClass};
pub use probe::{ProbeCategory, ProbeErrorKind, ProbeOrigin, ProbeResult, ProbeSpec};
pub use report::RunReport;
pub use route::{HttpMethod, RouteModel};
