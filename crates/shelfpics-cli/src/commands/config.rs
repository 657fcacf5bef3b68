use crate::OutputFormat;
use anyhow::{Context, Result};
use console::style;
use shelfpics_core::Settings;
use std::path::Path;

/// Load the configuration the way `run` does and show what was read
pub fn check(config: &Path, format: OutputFormat) -> Result<()> {
    tracing::debug!(
        "Checking {} (output: {})",
        config.display(),
        format.as_str()
    );

    let settings = Settings::from_file(config)
        .with_context(|| format!("invalid configuration in {}", config.display()))?;
    let view = settings.redacted();

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        OutputFormat::Pretty => {
            println!("{}", style(format!("Configuration: {}", config.display())).bold().cyan());
            println!();
            println!("  {:<16} {}", style("Login").bold(), view.login);
            println!("  {:<16} {}", style("Password").bold(), view.password);
            println!("  {:<16} {}", style("Working dir").bold(), view.base_dir);
            println!("  {:<16} {}s", style("Download pause").bold(), view.download_pause_secs);
            println!("  {:<16} {}", style("Login page").bold(), view.auth_url);
            println!("  {:<16} {}", style("Download URL").bold(), view.download_url);
            println!("  {:<16} {}", style("Download match").bold(), view.download_match);
            println!();
            println!("{}", style("✅ Configuration is valid").green());
        }
    }

    Ok(())
}
