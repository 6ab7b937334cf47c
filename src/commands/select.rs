use crate::core::{
    command_init::SessionContext, error::Result, print_section_header, print_success,
    print_warning,
};

pub fn execute_select(environment: &str, debug: bool) -> Result<()> {
    let mut ctx = SessionContext::initialize(debug)?;
    ctx.require_tree_root()?;

    let config = ctx.machine.select_config(environment)?.clone();
    print_success(&format!(
        "Selected {} ({})",
        config.environment_name,
        config.config_file_path.display()
    ));

    if let Some(readme) = &config.readme_content {
        print_section_header("Readme");
        println!("{}", readme.trim_end());
    }

    let transition = ctx.machine.advance(3);
    if let Some(warning) = transition.warning() {
        print_warning(&warning);
    }
    ctx.save()
}
