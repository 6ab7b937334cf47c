use crate::core::{
    command_init::SessionContext,
    error::Result,
    print_section_header,
    workflow::{Step, StepStatus},
};
use colored::*;

pub fn execute_status(json: bool, debug: bool) -> Result<()> {
    let ctx = SessionContext::initialize(debug)?;
    let summary = ctx.machine.summary();

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    print_section_header("Workflow");
    for step in &summary.steps {
        let label = format!("{}. {}", step.number, step.name);
        let line = match step.status {
            StepStatus::Completed => format!("{} {}", "✓".green(), label.white()),
            StepStatus::Current => format!("{} {}", "▶".blue(), label.blue().bold()),
            StepStatus::Future => format!("{} {}", "·".bright_black(), label.bright_black()),
        };
        println!("  {line}");
    }

    println!();
    let none = || "-".to_string();
    let details = [
        ("Repository", summary.repository.clone().unwrap_or_else(none)),
        (
            "Tree",
            summary
                .repository_tree_root
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(none),
        ),
        ("Configurations", summary.config_files.len().to_string()),
        ("Selected", summary.selected_config.clone().unwrap_or_else(none)),
        ("Environment variables", summary.environment_variable_count.to_string()),
    ];
    for (name, value) in details {
        println!("  {} {}", format!("{name}:").bright_black(), value.white());
    }

    if let Some(next) = summary.next_step.and_then(Step::from_number) {
        println!(
            "\n  {} {}",
            format!("Next: {}. {} requires", next.number(), next.name()).bright_black(),
            next.requirements().join(", ").white()
        );
    }
    if summary.is_complete {
        println!("\n  {}", "Workflow complete".green());
    }
    println!();
    Ok(())
}
