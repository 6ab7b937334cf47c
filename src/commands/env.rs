use crate::core::{
    command_init::SessionContext,
    env_file::{load_env_file, missing_required, preview},
    error::Result,
    output::print_key_values,
    print_section_header, print_success, print_warning,
};
use std::path::Path;

pub fn execute_env(path: &Path, debug: bool) -> Result<()> {
    let variables = load_env_file(path)?;
    let mut ctx = SessionContext::initialize(debug)?;

    let missing = missing_required(&variables);
    if missing.is_empty() {
        print_success(&format!(
            "Loaded {} environment variables from {}",
            variables.len(),
            path.display()
        ));
    } else {
        print_warning(&format!(
            "Missing required environment variables: {}",
            missing.join(", ")
        ));
    }

    print_section_header("Environment Variables Preview");
    print_key_values(&preview(&variables));
    println!();

    ctx.machine.set_environment_variables(variables);
    ctx.save()
}
