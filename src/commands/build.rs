use crate::core::{
    build::BuildSimulator,
    command_init::SessionContext,
    error::Result,
    output::print_plain_lines,
    print_success, print_warning,
    workflow::Step,
};

pub fn execute_build(debug: bool) -> Result<()> {
    let mut ctx = SessionContext::initialize(debug)?;
    ctx.machine.advance(Step::Build.number()).into_result()?;

    let tree_root = ctx.require_tree_root()?;
    let config = ctx.require_selected_config()?;
    let simulator =
        BuildSimulator::new(ctx.clock()).with_toolkit_version(ctx.config.toolkit_version.clone());

    let artifact = simulator.build(&tree_root, &config, ctx.machine.state().environment_variables())?;
    println!();
    print_plain_lines(&artifact.log);

    if !artifact.missing_modules.is_empty() {
        print_warning(&format!(
            "{} selected module(s) were not found and skipped",
            artifact.missing_modules.len()
        ));
    }
    print_success(&format!(
        "Build completed: {} module(s) in {}",
        artifact.copied_modules.len(),
        artifact.build_dir.display()
    ));

    ctx.machine.record_build(&artifact);
    ctx.machine.advance(Step::Deploy.number());
    ctx.save()
}
