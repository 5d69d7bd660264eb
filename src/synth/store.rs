use std::io;
use std::path::{Path, PathBuf};

use crate::ProbeSpec;

/// Extension of persisted probe bodies
pub const PROBE_EXTENSION: &str = "spec.ts";

/// Directory of persisted probe bodies, one file per probe id
#[derive(Debug, Clone)]
pub struct ProbeStore {
    dir: PathBuf,
}

impl ProbeStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, probe: &ProbeSpec) -> PathBuf {
        self.dir.join(format!("{}.{}", probe.id, PROBE_EXTENSION))
    }

    /// Write the probe's current code, overwriting any previous body
    pub fn write(&self, probe: &ProbeSpec) -> io::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(probe);
        std::fs::write(&path, &probe.code)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HttpMethod, ProbeCategory, RouteModel};
    use tempfile::TempDir;

    #[test]
    fn test_write_and_overwrite() {
        let temp = TempDir::new().unwrap();
        let store = ProbeStore::new(temp.path().join("generated-tests"));
        let route = RouteModel::new(HttpMethod::Post, "/api/users/:id", "app.js:3");
        let mut probe = ProbeSpec::new(route, ProbeCategory::Sqli, "first");

        let path = store.write(&probe).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "post_api_users__id_sqli.spec.ts"
        );

        probe.code = "second".to_string();
        store.write(&probe).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
    }
}
