use crate::core::{command_init::SessionContext, error::Result, print_info, print_section_header};
use colored::*;

pub fn execute_configs(debug: bool) -> Result<()> {
    let ctx = SessionContext::initialize(debug)?;
    ctx.require_tree_root()?;

    let state = ctx.machine.state();
    if state.discovered_configs().is_empty() {
        print_info("No configurations were discovered in the downloaded repository.");
        return Ok(());
    }

    print_section_header("Configurations");
    let selected = state.selected_config();
    for (index, config) in state.discovered_configs().iter().enumerate() {
        let marker = if selected == Some(config) {
            "*".to_string()
        } else {
            (index + 1).to_string()
        };
        let readme = if config.readme_content.is_some() {
            " (readme)".bright_black().to_string()
        } else {
            String::new()
        };
        println!(
            "{}{}{} {} {}{}",
            "[".bright_black(),
            marker.white(),
            "]".bright_black(),
            config.environment_name.blue(),
            config.config_file_path.display().to_string().bright_black(),
            readme
        );
    }
    println!();
    Ok(())
}
