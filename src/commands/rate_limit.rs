use crate::core::{
    command_init::SessionContext, error::Result, output::print_key_values, print_section_header,
    print_warning,
};
use chrono::{DateTime, Utc};

pub fn execute_rate_limit(debug: bool) -> Result<()> {
    let ctx = SessionContext::initialize(debug)?;
    let Some(status) = ctx.retriever()?.rate_limit_status() else {
        print_warning("Could not read the GitHub API rate limit");
        return Ok(());
    };

    let reset = DateTime::<Utc>::from_timestamp(status.reset_epoch, 0)
        .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| status.reset_epoch.to_string());

    print_section_header("GitHub API rate limit");
    print_key_values(&[
        ("Remaining", format!("{} of {}", status.remaining, status.limit)),
        ("Used", status.used.to_string()),
        ("Resets at", reset),
    ]);
    println!();
    Ok(())
}
