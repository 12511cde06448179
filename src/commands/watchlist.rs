//! Watchlist and site commands: init, add, list, site, interval, sites, normalize, open

use colored::Colorize;

use reelwatch::actions;
use reelwatch::cli::ConfigFile;
use reelwatch::config::{ConfigStore, Paths, WATCHLIST_FILE};
use reelwatch::error::{Result, WatchError};
use reelwatch::matcher::{candidates, normalize};
use reelwatch::site::SiteRegistry;

use crate::utils::format_minutes;

fn load_registry(store: &ConfigStore) -> Result<SiteRegistry> {
    let settings = store.load_settings()?;
    SiteRegistry::with_extra(&settings.sites)
}

/// Create missing files, optionally choosing a site and interval
pub fn cmd_init(paths: &Paths, site: Option<String>, interval: Option<u64>, yes: bool) -> Result<()> {
    use inquire::{Select, Text};

    let store = ConfigStore::new(paths.clone());
    let registry = load_registry(&store)?;

    println!("\n{}", "Setting up reelwatch".bold());
    println!("  Data: {}\n", paths.root.display());

    let created = store.ensure_files()?;
    for name in &created {
        println!("  {} Created {}", "✓".green(), name);
    }
    if created.contains(&WATCHLIST_FILE) {
        println!("    New watchlist was created. Add movies to begin.");
    }

    let current_site = store.read_site()?;
    let site = match site {
        Some(id) => Some(id),
        None if !yes && current_site.is_empty() => {
            let choice = Select::new("Which site should be watched?", registry.ids())
                .prompt()
                .map_err(|e| WatchError::ConfigError(format!("Prompt cancelled: {}", e)))?;
            Some(choice.to_string())
        }
        None => None,
    };
    if let Some(id) = site {
        let def = registry.resolve(&id)?;
        store.write_site(&def.id)?;
        println!("  {} Site: {}", "✓".green(), def.id);
    }

    let settings = store.load_settings()?;
    let interval = match interval {
        Some(minutes) => Some(minutes),
        None if !yes => {
            let current = store.read_interval(settings.default_interval_minutes)?;
            let answer = Text::new("Check every how many minutes?")
                .with_default(&current.to_string())
                .prompt()
                .map_err(|e| WatchError::ConfigError(format!("Prompt cancelled: {}", e)))?;
            let minutes = answer.trim().parse::<u64>().map_err(|_| {
                WatchError::InvalidInterval(format!("'{}' is not a whole number of minutes", answer.trim()))
            })?;
            Some(minutes)
        }
        None => None,
    };
    if let Some(minutes) = interval {
        store.write_interval(minutes)?;
        println!("  {} Interval: {}", "✓".green(), format_minutes(minutes));
    }

    println!("\nNext: reelwatch add \"<title>\", then reelwatch run");
    Ok(())
}

/// Append a title to the watchlist
pub fn cmd_add(paths: &Paths, title: &str) -> Result<()> {
    let store = ConfigStore::new(paths.clone());
    store.append_watchlist(title)?;
    println!("Added \"{}\" (matches links ending in {})", title.trim(), normalize(title.trim()).cyan());
    Ok(())
}

/// Show the watchlist
pub fn cmd_list(paths: &Paths, json: bool) -> Result<()> {
    let store = ConfigStore::new(paths.clone());
    let titles = store.read_watchlist()?;

    if json {
        let entries: Vec<_> = titles
            .iter()
            .map(|t| serde_json::json!({ "title": t, "slug": normalize(t) }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if titles.is_empty() {
        println!("Watchlist is empty. Add some movies with `reelwatch add \"<title>\"`.");
        return Ok(());
    }

    println!("\nWatchlist ({} titles):\n", titles.len());
    for (i, title) in titles.iter().enumerate() {
        println!("  {:>3}. {}  {}", i + 1, title, normalize(title).dimmed());
    }
    Ok(())
}

/// Show or change the selected site
pub fn cmd_site(paths: &Paths, id: Option<String>) -> Result<()> {
    let store = ConfigStore::new(paths.clone());
    let registry = load_registry(&store)?;

    match id {
        Some(id) => {
            let def = registry.resolve(&id)?;
            store.write_site(&def.id)?;
            println!("Site set to {} ({})", def.id.bold(), def.feed_url);
        }
        None => {
            let current = store.read_site()?;
            if current.is_empty() {
                println!("No site selected. Known sites: {}", registry.ids().join(", "));
            } else {
                match registry.get(&current) {
                    Some(def) => println!("{} ({})", def.id.bold(), def.feed_url),
                    None => println!("{} {}", current, "(unknown site)".red()),
                }
            }
        }
    }
    Ok(())
}

/// Show or change the update interval
pub fn cmd_interval(paths: &Paths, minutes: Option<u64>) -> Result<()> {
    let store = ConfigStore::new(paths.clone());

    match minutes {
        Some(minutes) => {
            store.write_interval(minutes)?;
            println!("Interval set to {}", format_minutes(minutes));
            println!("A running reelwatch picks this up after `r` (restart).");
        }
        None => {
            let settings = store.load_settings()?;
            let minutes = store.read_interval(settings.default_interval_minutes)?;
            println!("Checking every {}", format_minutes(minutes));
        }
    }
    Ok(())
}

/// List known sites
pub fn cmd_sites(paths: &Paths) -> Result<()> {
    let store = ConfigStore::new(paths.clone());
    let registry = load_registry(&store)?;
    let selected = store.read_site().unwrap_or_default();

    println!("\nKnown sites:\n");
    for site in registry.iter() {
        let marker = if site.id.eq_ignore_ascii_case(&selected) {
            "*".green().bold().to_string()
        } else {
            " ".to_string()
        };
        println!("  {} {}  {}", marker, site.id.bold(), site.feed_url);
        for template in &site.templates {
            println!("        {:<8} {}", template.kind.to_string().dimmed(), template.page_url("<slug>"));
        }
    }
    Ok(())
}

/// Show what a title normalizes to and which links would match it
pub fn cmd_normalize(paths: &Paths, title: &str, site: Option<String>) -> Result<()> {
    let store = ConfigStore::new(paths.clone());
    let registry = load_registry(&store)?;

    println!("  Slug: {}", normalize(title).cyan());

    let site_id = match site {
        Some(id) => id,
        None => store.read_site().unwrap_or_default(),
    };
    if site_id.is_empty() {
        return Ok(());
    }
    let def = registry.resolve(&site_id)?;

    println!("  Links matched on {}:", def.id);
    for (candidate, kind) in candidates(title, def) {
        println!("    {:<8} <{}", kind.to_string().dimmed(), candidate);
    }
    Ok(())
}

/// Open a config file for editing
pub fn cmd_open(paths: &Paths, file: ConfigFile) -> Result<()> {
    let store = ConfigStore::new(paths.clone());
    store.ensure_files()?;

    let path = match file {
        ConfigFile::Watchlist => paths.watchlist(),
        ConfigFile::Site => paths.site(),
        ConfigFile::Interval => paths.interval(),
        ConfigFile::Settings => {
            if !paths.settings().exists() {
                store.save_settings(&store.load_settings()?)?;
            }
            paths.settings()
        }
    };

    actions::open_file(&path, true)
}
