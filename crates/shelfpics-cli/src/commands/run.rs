use super::extract::print_extracted;
use super::profile::DEFAULT_PROFILE;
use anyhow::{Context, Result, bail};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use shelfpics_browser::{ChromeFinder, ChromeSession, LaunchOptions, ProfileManager};
use shelfpics_core::Settings;
use shelfpics_core::archive::post_process;
use shelfpics_core::catalog::load_catalog;
use shelfpics_core::portal::{Authenticator, ItemResolver, PortalOptions, ResolvedItem};
use shelfpics_core::workdir::prepare_working_dir;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Everything `run` and `gui` take from the command line besides the spreadsheet
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub config: PathBuf,
    pub chrome_path: Option<PathBuf>,
    pub profile: Option<String>,
    pub temp: bool,
    pub headless: bool,
}

pub fn execute(spreadsheet: &Path, options: &RunOptions) -> Result<()> {
    let settings = Settings::from_file(&options.config)
        .with_context(|| format!("invalid configuration in {}", options.config.display()))?;
    tracing::debug!("Loaded {:?}", settings);

    if !spreadsheet.is_file() {
        bail!("Spreadsheet not found: {}", spreadsheet.display());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let resolved = runtime.block_on(fetch_pictures(&settings, spreadsheet, options))?;

    println!();
    println!("📦 Unpacking archives...");
    let extracted = post_process(&settings.base_dir)?;

    print_summary(&resolved);
    print_extracted(&extracted);

    Ok(())
}

/// Browser half of the run: prepare the working directory, sign in and
/// download one archive per catalog record. Chrome is closed whatever the
/// outcome.
async fn fetch_pictures(
    settings: &Settings,
    spreadsheet: &Path,
    options: &RunOptions,
) -> Result<Vec<ResolvedItem>> {
    println!("🧹 Preparing {}", settings.base_dir.display());
    prepare_working_dir(&settings.base_dir)?;
    let download_dir = std::path::absolute(&settings.base_dir)?;

    println!("🔍 Locating Chrome...");
    let chrome_path = ChromeFinder::new(options.chrome_path.clone()).find()?;
    match &chrome_path {
        Some(path) => println!("✅ Found Chrome at: {}", path.display()),
        None => println!("✅ Using the system Chrome"),
    }

    let profile = select_profile(options)?;
    if profile.is_temporary() {
        println!("📁 Using temporary profile");
    } else {
        println!("📁 Using profile: {}", profile.path().display());
    }

    println!("🚀 Launching Chrome...");
    let mut session = ChromeSession::launch(&LaunchOptions {
        chrome_path,
        profile_dir: profile.path().to_path_buf(),
        download_dir,
        headless: options.headless,
    })
    .await?;

    let outcome = drive_portal(&mut session, settings, spreadsheet).await;

    if let Err(e) = session.close().await {
        tracing::warn!("Closing Chrome failed: {}", e);
    }
    drop(profile);

    outcome
}

async fn drive_portal(
    session: &mut ChromeSession,
    settings: &Settings,
    spreadsheet: &Path,
) -> Result<Vec<ResolvedItem>> {
    println!("🔑 Signing in as {}", settings.login);
    let mut authenticator = Authenticator::new(settings);
    authenticator.login(session).await?;
    println!("✅ Signed in");

    let records = load_catalog(spreadsheet)?;
    println!("📋 {} item(s) in {}", records.len(), spreadsheet.display());

    let resolver = ItemResolver::new(settings, PortalOptions::read(session).await?);

    let progress = progress_bar(records.len() as u64)?;
    let mut resolved = Vec::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        progress.set_message(record.item_code.clone());
        match resolver.resolve(session, record).await {
            Ok(item) => {
                resolved.push(item);
                progress.inc(1);
            }
            Err(e) => {
                progress.abandon();
                // Row 1 of the sheet is the header
                return Err(e).with_context(|| {
                    format!("failed on row {} (item '{}')", index + 2, record.item_code)
                });
            }
        }
    }

    progress.finish_with_message("all items requested");
    Ok(resolved)
}

fn select_profile(options: &RunOptions) -> Result<ProfileManager> {
    let profile = if options.temp {
        ProfileManager::temporary()?
    } else {
        ProfileManager::named(options.profile.as_deref().unwrap_or(DEFAULT_PROFILE))?
    };
    Ok(profile)
}

fn progress_bar(len: u64) -> Result<ProgressBar> {
    let progress = ProgressBar::new(len);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} | {msg}")?
            .progress_chars("=>-"),
    );
    progress.enable_steady_tick(Duration::from_millis(100));
    Ok(progress)
}

fn print_summary(resolved: &[ResolvedItem]) {
    let downloaded = resolved.iter().filter(|item| item.archive.is_some()).count();

    println!();
    println!("{}", style("Download summary").bold().cyan());
    println!("{}", style("================").cyan());
    println!("  Items requested:  {}", resolved.len());
    println!("  Archives saved:   {}", style(downloaded).green());

    let unmatched: Vec<&ResolvedItem> =
        resolved.iter().filter(|item| item.archive.is_none()).collect();
    if !unmatched.is_empty() {
        println!(
            "  {} {}",
            style("Not identified:").yellow(),
            unmatched.len()
        );
        for item in unmatched {
            println!("    - {} (model {})", item.record.item_code, item.model);
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(temp: bool) -> RunOptions {
        RunOptions {
            config: PathBuf::from("config.ini"),
            chrome_path: None,
            profile: None,
            temp,
            headless: true,
        }
    }

    #[test]
    fn test_temp_flag_selects_throwaway_profile() {
        let profile = select_profile(&options(true)).unwrap();
        assert!(profile.is_temporary());
        assert!(profile.path().is_dir());
    }

    #[test]
    fn test_invalid_profile_name_is_rejected() {
        let mut options = options(false);
        options.profile = Some("../outside".to_string());
        assert!(select_profile(&options).is_err());
    }

    #[test]
    fn test_missing_config_fails_before_browser() {
        let temp = tempfile::tempdir().unwrap();
        let mut options = options(true);
        options.config = temp.path().join("missing.ini");

        let err = execute(&temp.path().join("catalog.xlsx"), &options).unwrap_err();
        assert!(format!("{:#}", err).contains("configuration file not found"));
    }

    #[test]
    fn test_missing_spreadsheet_fails_before_browser() {
        let temp = tempfile::tempdir().unwrap();
        let config = temp.path().join("config.ini");
        let base_dir = temp.path().join("work");
        std::fs::write(
            &config,
            format!(
                "[Settings]\nLOGIN = a@b.c\nPASSWORD = x\nBASE_DIR = {}\n",
                base_dir.display()
            ),
        )
        .unwrap();
        let mut options = options(true);
        options.config = config;

        let err = execute(&temp.path().join("catalog.xlsx"), &options).unwrap_err();
        assert!(err.to_string().contains("Spreadsheet not found"));
        assert!(!base_dir.exists());
    }
}
