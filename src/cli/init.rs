//! Init command implementation

use anyhow::{bail, Result};
use std::path::Path;

use routeprobe::config::{write_config, Config};

/// Default configuration content for routeprobe init
pub const DEFAULT_CONFIG: &str = r#"# routeprobe configuration
# ========================
#
# Every section is optional; missing keys fall back to the values shown here.

# ============================================================================
# SETTINGS - Discovery and probe storage
# ============================================================================
#
#   generated_dir      - Where probe files are written, relative to the project
#   scan_exclude       - Glob patterns skipped by the source scan
#   source_extensions  - Files that may declare routes

[settings]
generated_dir = "generated-tests"
scan_exclude = [
    "node_modules/**",
    "dist/**",
    "build/**",
    "coverage/**",
    "generated-tests/**",
    "**/*.min.js",
]
source_extensions = ["js", "mjs", "cjs", "ts", "jsx", "tsx"]

# ============================================================================
# LLM - Backend that rewrites templates and repairs failed probes
# ============================================================================
#
#   provider      - "anthropic", "ollama" or "disabled" (templates only)
#   endpoint      - Override the provider's default URL
#   api_key_env   - Environment variable holding the API key (anthropic)
#   timeout_secs  - Per-call limit; calls are never retried at this layer

[llm]
provider = "anthropic"
model = "claude-sonnet-4-20250514"
api_key_env = "ANTHROPIC_API_KEY"
timeout_secs = 120
max_tokens = 4096
# endpoint = "http://localhost:11434"

# ============================================================================
# PROBE - Synthesis, remediation and load
# ============================================================================
#
#   remediation_attempts   - Backend rewrites per failed probe
#   concurrency            - Requests per route in the load burst
#   latency_target_ms      - Requests slower than this count as over target
#   oversized_payload_len  - Characters in the oversized security body
#   generate               - false = never ask the backend for rewrites

[probe]
remediation_attempts = 3
concurrency = 20
latency_target_ms = 500
oversized_payload_len = 100000
generate = true

# ============================================================================
# AUTH - Test account used for the single login per run
# ============================================================================

[auth]
test_identity = "test@example.com"
test_password = "password123"
"#;

/// Write `.routeprobe/config.toml` in the project
pub async fn init_command(work_dir: &Path, force: bool) -> Result<()> {
    let config_path = Config::project_config_path(work_dir);

    if config_path.exists() && !force {
        bail!(
            "Configuration already exists: {}\nUse --force to overwrite.",
            config_path.display()
        );
    }

    write_config(&config_path, DEFAULT_CONFIG)?;
    println!("Created: {}", config_path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_matches_builtin_defaults() {
        let parsed: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        let defaults = Config::with_defaults();
        assert_eq!(parsed.settings.scan_exclude, defaults.settings.scan_exclude);
        assert_eq!(parsed.llm.provider, defaults.llm.provider);
        assert_eq!(parsed.probe.concurrency, defaults.probe.concurrency);
        assert_eq!(parsed.auth.test_password, defaults.auth.test_password);
    }

    #[tokio::test]
    async fn test_init_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        init_command(dir.path(), false).await.unwrap();
        assert!(init_command(dir.path(), false).await.is_err());
        init_command(dir.path(), true).await.unwrap();
        assert!(Config::from_dir(dir.path()).is_ok());
    }
}
