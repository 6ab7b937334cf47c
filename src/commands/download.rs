use crate::core::{
    command_init::SessionContext,
    discovery::discover_with_default,
    error::Result,
    print_info, print_section_header, print_success, print_warning,
    repo_ref::RepoRef,
    workflow::RepositorySource,
};
use colored::*;

pub fn execute_download(reference: &str, branch: &str, fresh: bool, debug: bool) -> Result<()> {
    let repo = RepoRef::parse(reference)?;
    let mut ctx = SessionContext::initialize(debug)?;
    let mut retriever = ctx.retriever()?;

    print_info(&format!("Downloading {repo}@{branch}..."));
    let retrieval = if fresh {
        retriever.retrieve_fresh(&repo.owner, &repo.name, branch)?
    } else {
        retriever.retrieve(&repo.owner, &repo.name, branch)?
    };

    if retrieval.summary.from_cache {
        print_success(&format!("Using cached copy of {}", retrieval.key));
    } else {
        print_success(&format!(
            "Downloaded {} files from {}",
            retrieval.summary.written_count(),
            retrieval.key
        ));
        for (path, reason) in retrieval.summary.skipped() {
            print_warning(&format!("Skipped {path}: {reason}"));
        }
    }

    let configs = discover_with_default(&retrieval.path, &ctx.config.default_environment);
    ctx.machine.set_repository(
        RepositorySource {
            owner: repo.owner.clone(),
            repo: repo.name.clone(),
            branch: branch.to_string(),
        },
        retrieval.path.clone(),
        configs,
    );

    let configs = ctx.machine.state().discovered_configs();
    if configs.is_empty() {
        print_warning("No config.<environment>.yaml files found in this repository");
    } else {
        print_section_header("Configurations found");
        for config in configs {
            println!(
                "  {} {}",
                config.environment_name.blue(),
                config.config_file_path.display().to_string().bright_black()
            );
        }
    }

    let transition = ctx.machine.advance(2);
    if let Some(warning) = transition.warning() {
        print_warning(&warning);
    }
    ctx.save()?;

    println!("\n{} {}\n", "Repository tree:".bright_black(), retrieval.path.display());
    Ok(())
}
