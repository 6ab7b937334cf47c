use crate::core::{command_init::SessionContext, error::Result, print_success};

pub fn execute_reset(debug: bool) -> Result<()> {
    let mut ctx = SessionContext::initialize(debug)?;
    ctx.machine.reset();
    ctx.machine.set_debug_mode(debug);
    ctx.save()?;

    print_success("Workflow reset to step 1");
    Ok(())
}
