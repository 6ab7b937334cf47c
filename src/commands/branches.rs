use crate::core::{
    command_init::SessionContext, error::Result, print_section_header, repo_ref::RepoRef,
};
use colored::*;

pub fn execute_branches(reference: &str, debug: bool) -> Result<()> {
    let repo = RepoRef::parse(reference)?;
    let ctx = SessionContext::initialize(debug)?;
    let branches = ctx.retriever()?.list_branches(&repo.owner, &repo.name);

    print_section_header(&format!("Branches of {repo}"));
    for (index, branch) in branches.iter().enumerate() {
        println!(
            "{}{}{} {}",
            "[".bright_black(),
            (index + 1).to_string().white(),
            "]".bright_black(),
            branch.blue()
        );
    }
    println!();
    Ok(())
}
