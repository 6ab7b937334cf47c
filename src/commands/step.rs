use crate::core::{command_init::SessionContext, error::Result, print_success, print_warning};

pub fn execute_step(target: u8, debug: bool) -> Result<()> {
    let mut ctx = SessionContext::initialize(debug)?;

    let transition = ctx.machine.advance(target);
    match transition.warning() {
        Some(warning) => print_warning(&warning),
        None => print_success(&format!("Now on step {}", ctx.machine.current_step())),
    }
    ctx.save()
}
