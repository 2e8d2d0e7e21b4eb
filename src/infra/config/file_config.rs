use std::path::PathBuf;

use serde::Deserialize;

use crate::infra::config::{AppConfig, LogConfig, SyncConfig, ViewportConfig};

#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    pub logging: Option<FileLogConfig>,
    pub sync: Option<FileSyncConfig>,
    pub viewport: Option<FileViewportConfig>,
}

impl FileConfig {
    pub fn merge_into(self, config: &mut AppConfig) {
        if let Some(logging) = self.logging {
            logging.merge_into(&mut config.logging);
        }

        if let Some(sync) = self.sync {
            sync.merge_into(&mut config.sync);
        }

        if let Some(viewport) = self.viewport {
            viewport.merge_into(&mut config.viewport);
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileLogConfig {
    pub level: Option<String>,
    pub file: Option<PathBuf>,
}

impl FileLogConfig {
    fn merge_into(self, config: &mut LogConfig) {
        if let Some(level) = self.level {
            config.level = level;
        }

        if let Some(file) = self.file {
            config.file = Some(file);
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileSyncConfig {
    pub page_size: Option<usize>,
    pub fetch_timeout_ms: Option<u64>,
}

impl FileSyncConfig {
    fn merge_into(self, config: &mut SyncConfig) {
        if let Some(page_size) = self.page_size {
            config.page_size = page_size;
        }

        if let Some(timeout_ms) = self.fetch_timeout_ms {
            config.fetch_timeout_ms = timeout_ms;
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileViewportConfig {
    pub bottom_threshold: Option<f64>,
    pub top_threshold: Option<f64>,
}

impl FileViewportConfig {
    fn merge_into(self, config: &mut ViewportConfig) {
        if let Some(bottom) = self.bottom_threshold {
            config.bottom_threshold = bottom;
        }

        if let Some(top) = self.top_threshold {
            config.top_threshold = top;
        }
    }
}
