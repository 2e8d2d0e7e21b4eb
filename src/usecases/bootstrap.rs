use std::path::Path;

use crate::{
    infra::{self, config::FileConfigAdapter, contracts::ConfigAdapter, error::AppError},
    usecases::context::AppContext,
};

pub fn bootstrap(config_path: Option<&Path>) -> Result<AppContext, AppError> {
    let mut context = build_context(config_path)?;
    context.log_guard = infra::logging::init(&context.config.logging)?;

    tracing::debug!(
        page_size = context.config.sync.page_size,
        fetch_timeout_ms = context.config.sync.fetch_timeout_ms,
        "configuration loaded"
    );
    Ok(context)
}

fn build_context(config_path: Option<&Path>) -> Result<AppContext, AppError> {
    let config_adapter = FileConfigAdapter::new(config_path);
    let config = config_adapter.load()?;

    Ok(AppContext::new(config))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn builds_context_with_default_config_when_file_is_missing() {
        let context = build_context(Some(Path::new("./missing-config.toml")))
            .expect("context should build from defaults");

        assert_eq!(context.config, crate::infra::config::AppConfig::default());
        assert!(context.log_guard.is_none());
    }

    #[test]
    fn surfaces_config_errors() {
        let temp_dir = tempfile::tempdir().expect("must create temp dir");
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[viewport\n").expect("must write test config");

        let err = build_context(Some(&path)).expect_err("context must fail");

        assert!(matches!(err, AppError::Other(_)));
        assert!(err.to_string().contains("failed to parse config file"));
    }
}
