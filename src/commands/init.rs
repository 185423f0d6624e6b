use crate::args::ConfigArgs;
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the home directory and writes `config.json` from `args`.
///
/// # Arguments
/// - `home` - The directory that will hold `config.json`, e.g. `$HOME/.expense-bot`
/// - `args` - Values given on the command line or in the environment. At least the web app URL is
///   required, e.g. `https://script.google.com/macros/s/AKfycbz.../exec`
///
/// # Errors
/// - Returns an error if the web app URL is missing or any URL is invalid.
/// - Returns an error if any file operations fail.
pub async fn init(home: &Path, args: &ConfigArgs) -> Result<Out<()>> {
    let config = Config::create(home, args)
        .await
        .context("Unable to create the home directory and config")
        .pub_result(ErrorType::Config)?;
    Ok(format!(
        "Successfully created {} for the web app at {}",
        config.config_path().display(),
        config.webapp_url()
    )
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("bot");
        let args = ConfigArgs::new(
            Some("https://script.google.com/macros/s/abc/exec".to_string()),
            None,
            None,
            None,
        );
        let out = init(&home, &args).await.unwrap();
        assert!(out.message().contains("config.json"));
        assert!(home.join("config.json").is_file());
    }

    #[tokio::test]
    async fn test_init_without_url() {
        let dir = TempDir::new().unwrap();
        let err = init(dir.path(), &ConfigArgs::default()).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Config);
    }
}
