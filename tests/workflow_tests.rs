//! End-to-end workflow through the library: retrieve, discover, select, build, dry run

mod common;

use anyhow::Result;
use common::fixtures::*;
use repo_deployer::core::workflow::RepositorySource;
use repo_deployer::core::{
    discover, BuildMetadata, BuildSimulator, CacheKey, DeployMode, DeploySimulator, Step,
    VirtualClock, WorkflowStateMachine,
};
use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn demo_source() -> RepositorySource {
    RepositorySource {
        owner: "acme".to_string(),
        repo: "demo".to_string(),
        branch: "main".to_string(),
    }
}

fn deploy_env() -> BTreeMap<String, String> {
    [
        ("CDF_PROJECT", "weather-dev"),
        ("CDF_CLUSTER", "westeurope-1"),
        ("IDP_CLIENT_ID", "0123456789abcdef"),
        ("IDP_CLIENT_SECRET", "s3cret"),
        ("IDP_TOKEN_URL", "https://login.test/token"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

#[cfg(test)]
mod workflow_tests {
    use super::*;

    #[test]
    fn test_download_build_dry_run_reports_one_transformation() -> Result<()> {
        let workspace = TempDir::new()?;
        let key = CacheKey::new("acme", "demo", "main");
        let transport = scripted_github(&key, &demo_files());
        let mut retriever = scripted_retriever(workspace.path(), transport.clone())?;

        let retrieval = retriever.retrieve("acme", "demo", "main")?;
        assert!(!retrieval.summary.from_cache);
        assert_eq!(retrieval.summary.written_count(), 3);

        let configs = discover(&retrieval.path);
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].environment_name, "weather");
        assert_eq!(configs[0].readme_content.as_deref(), Some("# Weather pipeline\n"));

        let mut machine = WorkflowStateMachine::new();
        machine.set_repository(demo_source(), retrieval.path.clone(), configs);
        assert!(machine.advance(2).is_moved());
        let config = machine.select_config("weather")?.clone();
        assert!(machine.advance(3).is_moved());

        let clock = Arc::new(VirtualClock::at_epoch(1_700_000_000));
        let artifact = BuildSimulator::new(clock).build(&retrieval.path, &config, &BTreeMap::new())?;
        assert_eq!(artifact.copied_modules, vec!["weather-pipeline"]);
        assert!(artifact.missing_modules.is_empty());
        assert!(artifact
            .build_dir
            .join("modules/weather-pipeline/transformations/weather.Transformation.yaml")
            .is_file());
        assert!(machine.record_build(&artifact));
        assert!(machine.advance(4).is_moved());

        let report = DeploySimulator::new().dry_run(&artifact.build_dir)?;
        assert_eq!(report.mode, DeployMode::DryRun);
        assert_eq!(report.rows.len(), 1);
        let row = report.row("transformations").expect("transformations row");
        assert_eq!((row.created, row.deleted, row.changed, row.unchanged), (0, 0, 0, 1));
        assert_eq!(row.total(), 1);
        assert!(report.table.contains("Summary of Resources Deploy operation:"));

        // A dry run alone does not unlock verification
        assert!(machine.record_deploy(&report));
        assert!(!machine.advance(5).is_moved());
        Ok(())
    }

    #[test]
    fn test_second_retrieve_is_served_from_cache() -> Result<()> {
        let workspace = TempDir::new()?;
        let key = CacheKey::new("acme", "demo", "main");
        let transport = scripted_github(&key, &demo_files());
        let mut retriever = scripted_retriever(workspace.path(), transport.clone())?;

        let first = retriever.retrieve("acme", "demo", "main")?;
        let calls_after_download = transport.calls().len();
        let second = retriever.retrieve("acme", "demo", "main")?;

        assert!(second.summary.from_cache);
        assert_eq!(transport.calls().len(), calls_after_download);
        assert_ne!(first.path, second.path);
        assert_eq!(
            fs::read_to_string(second.path.join("config.weather.yaml"))?,
            WEATHER_CONFIG
        );

        // Scratch copies are independent of the cached snapshot
        fs::remove_dir_all(&second.path)?;
        let third = retriever.retrieve("acme", "demo", "main")?;
        assert!(third.path.join("config.weather.yaml").is_file());
        Ok(())
    }

    #[test]
    fn test_rebuild_gives_identical_tree() -> Result<()> {
        let tree = demo_tree()?;
        let configs = discover(tree.path());
        let clock = Arc::new(VirtualClock::at_epoch(1_700_000_000));
        let simulator = BuildSimulator::new(clock);

        let first = simulator.build(tree.path(), &configs[0], &BTreeMap::new())?;
        let second = simulator.build(tree.path(), &configs[0], &BTreeMap::new())?;

        assert_eq!(first.files()?, second.files()?);
        assert!(second
            .log
            .iter()
            .any(|line| line == "INFO: Cleaned existing build directory build."));
        assert!(!first.log.iter().any(|line| line.contains("Cleaned existing")));

        let metadata = BuildMetadata::read(&second.build_dir)?.expect("build_info.yaml");
        assert_eq!(metadata.environment_name, "weather");
        assert_eq!(metadata.config_file_name, "config.weather.yaml");
        assert_eq!(metadata.timestamp_epoch, 1_700_000_000);
        Ok(())
    }

    #[test]
    fn test_missing_module_is_skipped_not_fatal() -> Result<()> {
        let tree = TempDir::new()?;
        let mut files = demo_files();
        files[0].1 = "environment:\n  selected:\n    - modules/weather-pipeline\n    - modules/ghost\n";
        write_tree(tree.path(), &files)?;

        let configs = discover(tree.path());
        let clock = Arc::new(VirtualClock::at_epoch(1_700_000_000));
        let artifact = BuildSimulator::new(clock).build(tree.path(), &configs[0], &BTreeMap::new())?;

        assert_eq!(artifact.copied_modules, vec!["weather-pipeline"]);
        assert_eq!(artifact.missing_modules, vec!["ghost"]);
        assert!(artifact
            .log
            .iter()
            .any(|line| line == "WARNING: Module not found: ghost"));
        assert_eq!(artifact.metadata.modules, vec!["weather-pipeline", "ghost"]);
        Ok(())
    }

    #[test]
    fn test_full_deploy_reaches_verify() -> Result<()> {
        let tree = demo_tree()?;
        let configs = discover(tree.path());

        let mut machine = WorkflowStateMachine::new();
        machine.set_environment_variables(deploy_env());
        machine.set_repository(demo_source(), tree.path().to_path_buf(), configs);
        machine.advance(2).into_result()?;
        let config = machine.select_config("weather")?.clone();
        machine.advance(3).into_result()?;

        let clock = Arc::new(VirtualClock::at_epoch(1_700_000_000));
        let artifact = BuildSimulator::new(clock).build(
            tree.path(),
            &config,
            machine.state().environment_variables(),
        )?;
        machine.record_build(&artifact);
        machine.advance(4).into_result()?;

        let report = DeploySimulator::new().deploy(&artifact.build_dir, machine.state().environment_variables())?;
        assert_eq!(report.mode, DeployMode::Deploy);
        assert!(machine.record_deploy(&report));
        assert_eq!(machine.advance(5).into_result()?, Step::Verify);
        assert!(machine.is_complete());
        Ok(())
    }

    #[test]
    fn test_deploy_without_credentials_fails_before_output() -> Result<()> {
        let tree = demo_tree()?;
        let configs = discover(tree.path());
        let clock = Arc::new(VirtualClock::at_epoch(1_700_000_000));
        let artifact = BuildSimulator::new(clock).build(tree.path(), &configs[0], &BTreeMap::new())?;

        let mut env = deploy_env();
        env.remove("IDP_CLIENT_SECRET");
        let err = DeploySimulator::new()
            .deploy(&artifact.build_dir, &env)
            .expect_err("deploy should need credentials");
        assert!(err.to_string().contains("IDP_CLIENT_SECRET"));
        Ok(())
    }

    #[test]
    fn test_new_download_discards_previous_progress() -> Result<()> {
        let tree = demo_tree()?;
        let mut machine = WorkflowStateMachine::new();
        machine.set_repository(demo_source(), tree.path().to_path_buf(), discover(tree.path()));
        machine.advance(2).into_result()?;
        machine.select_config("weather")?;
        machine.advance(3).into_result()?;

        let other = demo_tree()?;
        machine.set_repository(demo_source(), other.path().to_path_buf(), discover(other.path()));
        assert_eq!(machine.current_step(), Step::SelectConfig);
        assert!(machine.state().selected_config().is_none());
        assert!(!machine.can_advance(3));
        Ok(())
    }
}
