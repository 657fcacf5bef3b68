//! Persistent Chrome profiles used by `run` and `gui`.
//!
//! A named profile keeps the portal's session cookies, so the next run can
//! skip the login form. Profiles live under `~/.shelfpics/profiles`.

use anyhow::{Result, anyhow};
use shelfpics_browser::ProfileManager;
use std::fs;
use std::io::{self, Write};
use std::time::SystemTime;

/// Profile used when neither `--profile` nor `--temp` is given
pub const DEFAULT_PROFILE: &str = "default";

/// List all available profiles
pub fn list() -> Result<()> {
    let profiles_dir = ProfileManager::profiles_dir()?;

    if !profiles_dir.exists() {
        println!(
            "No profiles found. Profiles will be created in: {}",
            profiles_dir.display()
        );
        return Ok(());
    }

    let mut profiles = Vec::new();
    for entry in fs::read_dir(&profiles_dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("Invalid profile name"))?
            .to_string();
        let size = ProfileManager::persistent(path.clone())?.size().unwrap_or(0);
        let modified = entry.metadata()?.modified().ok().and_then(format_date);

        profiles.push((name, size, modified));
    }

    if profiles.is_empty() {
        println!("No profiles found.");
        return Ok(());
    }

    profiles.sort_by(|a, b| a.0.cmp(&b.0));

    println!("Available profiles:");
    println!();
    for (name, size, modified) in profiles {
        let marker = if name == DEFAULT_PROFILE { "* " } else { "  " };
        println!(
            "{}{:<20} {:>8.1} MB    last used {}",
            marker,
            name,
            size as f64 / 1_048_576.0,
            modified.as_deref().unwrap_or("unknown")
        );
    }

    Ok(())
}

/// Delete a profile
pub fn delete(name: &str, force: bool) -> Result<()> {
    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(anyhow!("Invalid profile name '{}'", name));
    }
    let profile_path = ProfileManager::profiles_dir()?.join(name);

    if !profile_path.is_dir() {
        return Err(anyhow!("Profile '{}' not found", name));
    }

    if !force {
        print!(
            "⚠️  This will delete profile '{}' and the portal session stored in it.\nType '{}' to confirm: ",
            name, name
        );
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if input.trim() != name {
            println!("Deletion cancelled.");
            return Ok(());
        }
    }

    fs::remove_dir_all(&profile_path)?;
    println!("✅ Profile '{}' deleted", name);

    Ok(())
}

fn format_date(time: SystemTime) -> Option<String> {
    let secs = time.duration_since(SystemTime::UNIX_EPOCH).ok()?.as_secs();
    Some(
        chrono::DateTime::from_timestamp(secs as i64, 0)?
            .format("%Y-%m-%d")
            .to_string(),
    )
}
