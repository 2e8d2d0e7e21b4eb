use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::infra::{
    config::{load, AppConfig},
    contracts::ConfigAdapter,
};

#[derive(Debug, Clone, Default)]
pub struct FileConfigAdapter {
    path: Option<PathBuf>,
}

impl FileConfigAdapter {
    pub fn new(path: Option<&Path>) -> Self {
        Self {
            path: path.map(Path::to_path_buf),
        }
    }
}

impl ConfigAdapter for FileConfigAdapter {
    fn load(&self) -> Result<AppConfig> {
        Ok(load(self.path.as_deref())?)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn loads_through_the_adapter_contract() {
        let temp_dir = tempfile::tempdir().expect("must create temp dir");
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[sync]\nfetch_timeout_ms = 250\n").expect("must write test config");

        let config = FileConfigAdapter::new(Some(&path))
            .load()
            .expect("config must load");

        assert_eq!(config.sync.fetch_timeout_ms, 250);
    }
}
