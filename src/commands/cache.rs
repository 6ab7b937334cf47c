use crate::core::{
    cache::CacheKey, command_init::SessionContext, error::Result, print_info,
    print_section_header, print_success, repo_ref::RepoRef,
};
use colored::*;

pub fn execute_cache_stats(debug: bool) -> Result<()> {
    let ctx = SessionContext::initialize(debug)?;
    let cache = ctx.open_cache()?;
    let stats = cache.stats();

    print_section_header("Repository cache");
    println!("  {} {}", "Directory:".bright_black(), stats.cache_directory.display());
    println!("  {} {}", "Repositories:".bright_black(), stats.count);
    println!("  {} {} MB", "Size:".bright_black(), stats.total_size_mb());

    let mut entries: Vec<_> = cache.entries().collect();
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    if !entries.is_empty() {
        println!();
        for entry in entries {
            println!(
                "  {} {} {}",
                entry.key().to_string().blue(),
                entry.created_at.format("%Y-%m-%d %H:%M UTC").to_string().bright_black(),
                format!("{} bytes", entry.size_bytes).bright_black()
            );
        }
    }
    println!();
    Ok(())
}

pub fn execute_cache_clear(debug: bool) -> Result<()> {
    let ctx = SessionContext::initialize(debug)?;
    let mut cache = ctx.open_cache()?;
    cache.clear_all()?;
    print_success("Cache cleared");
    Ok(())
}

pub fn execute_cache_evict(reference: &str, branch: &str, debug: bool) -> Result<()> {
    let repo = RepoRef::parse(reference)?;
    let ctx = SessionContext::initialize(debug)?;
    let mut cache = ctx.open_cache()?;

    let key = CacheKey::new(&repo.owner, &repo.name, branch);
    if cache.evict(&key) {
        print_success(&format!("Removed {key} from the cache"));
    } else {
        print_info(&format!("{key} was not cached"));
    }
    Ok(())
}
