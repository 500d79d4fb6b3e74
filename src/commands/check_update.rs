use crate::core::config::InstallerConfig;
use crate::core::download::{Downloader, UpdateCheck};
use crate::error::Result;

pub async fn check_for_update(url: Option<String>, json: bool) -> Result<()> {
    let config = InstallerConfig::load()?;
    let url = url.unwrap_or_else(|| config.source_url.clone());
    let downloader = Downloader::new(&config)?;

    if !json {
        println!("🔄 Checking for updates...");
    }

    let check = downloader.check_for_update(&url).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&check)?);
    } else {
        print_check(&url, &check);
    }
    Ok(())
}

fn print_check(url: &str, check: &UpdateCheck) {
    if check.available {
        println!("✅ The latest platform tools are available");
        println!("   {url}");
        if let Some(length) = check.content_length {
            println!("   Size: {:.1} MB", length as f64 / (1024.0 * 1024.0));
        }
        if let Some(modified) = &check.last_modified {
            println!("   Last modified: {modified}");
        }
        println!();
        println!("Run 'ptinstall install' to download them.");
    } else {
        println!("⚠️  No update could be confirmed (HTTP {})", check.status);
        println!("   {url}");
    }
}
