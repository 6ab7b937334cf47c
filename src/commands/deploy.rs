use crate::core::{
    build::BuildMetadata,
    command_init::SessionContext,
    deploy::{credential_preview, DeployMode, DeploySimulator},
    error::{DeployerError, Result},
    fs_util::list_files,
    output::{print_key_values, print_plain_lines},
    print_section_header, print_success,
    workflow::Step,
};
use colored::*;
use std::path::PathBuf;

fn current_build_dir(ctx: &SessionContext) -> Result<PathBuf> {
    ctx.machine
        .state()
        .last_build()
        .map(|build| build.build_dir.clone())
        .ok_or(DeployerError::BuildDirectoryNotFound)
}

pub fn execute_dry_run(debug: bool) -> Result<()> {
    let mut ctx = SessionContext::initialize(debug)?;
    ctx.machine.advance(Step::Deploy.number()).into_result()?;
    let build_dir = current_build_dir(&ctx)?;

    let report = DeploySimulator::new().dry_run(&build_dir)?;
    println!();
    print_plain_lines(&report.log);
    print_success(&format!("Dry run complete: {} resource kind(s)", report.rows.len()));

    ctx.machine.record_deploy(&report);
    ctx.save()
}

pub fn execute_deploy(debug: bool) -> Result<()> {
    let mut ctx = SessionContext::initialize(debug)?;
    ctx.machine.advance(Step::Deploy.number()).into_result()?;
    let build_dir = current_build_dir(&ctx)?;
    let env_vars = ctx.machine.state().environment_variables().clone();

    if let Some(metadata) = BuildMetadata::read(&build_dir)? {
        print_section_header("Build");
        print_key_values(&[
            ("Modules to deploy", metadata.modules.join(", ")),
            ("Toolkit version", metadata.toolkit_version),
            ("Config file", metadata.config_file_name),
        ]);
    }
    print_section_header("Connection");
    print_key_values(&credential_preview(&env_vars));
    println!();

    let report = DeploySimulator::new().deploy(&build_dir, &env_vars)?;
    print_plain_lines(&report.log);
    print_success("Deployment completed successfully!");

    ctx.machine.record_deploy(&report);
    ctx.machine.advance(Step::Verify.number());
    ctx.save()
}

pub fn execute_verify(debug: bool) -> Result<()> {
    let mut ctx = SessionContext::initialize(debug)?;
    ctx.machine.advance(Step::Verify.number()).into_result()?;
    let build_dir = current_build_dir(&ctx)?;

    print_section_header("Deployed build");
    for file in list_files(&build_dir)? {
        println!("  {}", file.bright_black());
    }

    if let Some(deploy) = ctx.machine.state().last_deploy() {
        let mode = match deploy.mode {
            DeployMode::DryRun => "dry run",
            DeployMode::Deploy => "deploy",
        };
        println!(
            "\n{} {} resource kind(s) ({mode})",
            "Last deploy:".bright_black(),
            deploy.resource_kinds
        );
    }

    if ctx.machine.is_complete() {
        print_success("Workflow complete");
    }
    ctx.save()
}
