//! Command-line behaviour, each test with its own config, cache and scratch directories

mod common;

use anyhow::Result;
use common::{assertions::*, fixtures::*};
use predicates::prelude::*;
use repo_deployer::core::CacheKey;

const CREDENTIALS: &str = "\
# deployment credentials
CDF_PROJECT=weather-dev
CDF_CLUSTER=westeurope-1
IDP_CLIENT_ID=0123456789abcdef
IDP_CLIENT_SECRET=s3cret-value
IDP_TOKEN_URL=https://login.test/token
";

fn seeded_env() -> Result<CliEnv> {
    let env = CliEnv::new()?;
    env.seed_cache(&CacheKey::new("acme", "demo", "main"), &demo_files())?;
    Ok(env)
}

#[cfg(test)]
mod cli_tests {
    use super::*;

    #[test]
    fn test_fresh_session_starts_at_step_one() -> Result<()> {
        let env = CliEnv::new()?;
        env.command()?
            .arg("status")
            .assert()
            .success()
            .stdout(current_step(1, "Download & Environment"))
            .stdout(predicate::str::contains("Repository: -"));
        Ok(())
    }

    #[test]
    fn test_status_json_reports_step_number() -> Result<()> {
        let env = CliEnv::new()?;
        let output = env.command()?.args(["status", "--json"]).output()?;
        assert!(output.status.success());

        let summary: serde_json::Value = serde_json::from_slice(&output.stdout)?;
        assert_eq!(summary["current_step"], 1);
        assert_eq!(summary["is_complete"], false);
        Ok(())
    }

    #[test]
    fn test_step_without_prerequisites_warns() -> Result<()> {
        let env = CliEnv::new()?;
        env.command()?
            .args(["step", "3"])
            .assert()
            .success()
            .stdout(step_refused(3))
            .stdout(predicate::str::contains("Prerequisites not met"));

        env.command()?
            .arg("status")
            .assert()
            .stdout(current_step(1, "Download & Environment"));
        Ok(())
    }

    #[test]
    fn test_build_without_download_fails() -> Result<()> {
        let env = CliEnv::new()?;
        env.command()?.arg("build").assert().failure().stdout(step_refused(3));
        env.command()?
            .args(["select", "weather"])
            .assert()
            .failure()
            .stdout(no_repository_downloaded());
        Ok(())
    }

    #[test]
    fn test_invalid_repository_reference_fails() -> Result<()> {
        let env = CliEnv::new()?;
        env.command()?
            .args(["download", "not-a-repo"])
            .assert()
            .failure()
            .stdout(invalid_reference());
        Ok(())
    }

    #[test]
    fn test_env_file_values_are_previewed_with_secrets_hidden() -> Result<()> {
        let env = CliEnv::new()?;
        let path = env.write_env_file(CREDENTIALS)?;

        env.command()?
            .arg("env")
            .arg(&path)
            .assert()
            .success()
            .stdout(predicate::str::contains("Loaded 5 environment variables"))
            .stdout(predicate::str::contains("CDF_PROJECT: weather-dev"))
            .stdout(predicate::str::contains("***hidden***"))
            .stdout(predicate::str::contains("s3cret-value").not());

        env.command()?
            .arg("status")
            .assert()
            .stdout(predicate::str::contains("Environment variables: 5"));
        Ok(())
    }

    #[test]
    fn test_env_file_without_required_variables_warns() -> Result<()> {
        let env = CliEnv::new()?;
        let path = env.write_env_file("IDP_CLIENT_ID=abc\n")?;
        env.command()?
            .arg("env")
            .arg(&path)
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "Missing required environment variables: CDF_PROJECT, CDF_CLUSTER",
            ));
        Ok(())
    }

    #[test]
    fn test_missing_env_file_fails() -> Result<()> {
        let env = CliEnv::new()?;
        env.command()?
            .args(["env", "/definitely/not/here/.env"])
            .assert()
            .failure()
            .stdout(predicate::str::contains("Failed to read environment file"));
        Ok(())
    }

    #[test]
    fn test_cache_stats_and_evict() -> Result<()> {
        let env = seeded_env()?;
        env.command()?
            .args(["cache", "stats"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Repositories: 1"))
            .stdout(predicate::str::contains("acme/demo@main"));

        env.command()?
            .args(["cache", "evict", "acme/demo"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Removed acme/demo@main from the cache"));

        env.command()?
            .args(["cache", "stats"])
            .assert()
            .stdout(predicate::str::contains("Repositories: 0"));
        Ok(())
    }

    #[test]
    fn test_cached_download_through_dry_run() -> Result<()> {
        let env = seeded_env()?;

        env.command()?
            .args(["download", "https://github.com/acme/demo"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Using cached copy of acme/demo@main"))
            .stdout(predicate::str::contains("config.weather.yaml"));

        env.command()?
            .args(["select", "weather"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Selected weather"))
            .stdout(predicate::str::contains("# Weather pipeline"));

        env.command()?
            .arg("build")
            .assert()
            .success()
            .stdout(predicate::str::contains("Copied module: weather-pipeline"))
            .stdout(predicate::str::contains("INFO: Build complete. Files are located in build/"));

        env.command()?
            .arg("dry-run")
            .assert()
            .success()
            .stdout(has_report_header())
            .stdout(predicate::str::contains("transformations"));

        env.command()?
            .arg("status")
            .assert()
            .stdout(current_step(4, "Deploy"));

        env.command()?.arg("verify").assert().failure().stdout(step_refused(5));
        Ok(())
    }

    #[test]
    fn test_deploy_completes_workflow() -> Result<()> {
        let env = seeded_env()?;
        let path = env.write_env_file(CREDENTIALS)?;

        env.command()?.arg("env").arg(&path).assert().success();
        env.command()?.args(["download", "acme/demo"]).assert().success();
        env.command()?.args(["select", "weather"]).assert().success();
        env.command()?.arg("build").assert().success();

        env.command()?
            .arg("deploy")
            .assert()
            .success()
            .stdout(predicate::str::contains("IDP_CLIENT_ID: 01234567..."))
            .stdout(predicate::str::contains("Created"))
            .stdout(predicate::str::contains("Deployment completed successfully!"));

        env.command()?
            .arg("verify")
            .assert()
            .success()
            .stdout(predicate::str::contains("build_info.yaml"))
            .stdout(predicate::str::contains("Workflow complete"));
        Ok(())
    }

    #[test]
    fn test_deploy_without_credentials_keeps_step() -> Result<()> {
        let env = seeded_env()?;
        env.command()?.args(["download", "acme/demo"]).assert().success();
        env.command()?.args(["select", "weather"]).assert().success();
        env.command()?.arg("build").assert().success();

        env.command()?
            .arg("deploy")
            .assert()
            .failure()
            .stdout(predicate::str::contains("Missing required credentials for deployment"));

        env.command()?
            .arg("status")
            .assert()
            .stdout(current_step(4, "Deploy"));
        Ok(())
    }

    #[test]
    fn test_select_unknown_environment_fails() -> Result<()> {
        let env = seeded_env()?;
        env.command()?.args(["download", "acme/demo"]).assert().success();
        env.command()?
            .args(["select", "production"])
            .assert()
            .failure()
            .stdout(predicate::str::contains("No configuration named 'production'"));
        Ok(())
    }

    #[test]
    fn test_reset_returns_to_step_one() -> Result<()> {
        let env = seeded_env()?;
        env.command()?.args(["download", "acme/demo"]).assert().success();
        env.command()?
            .arg("status")
            .assert()
            .stdout(current_step(2, "Select Configuration"));

        env.command()?
            .arg("reset")
            .assert()
            .success()
            .stdout(predicate::str::contains("Workflow reset to step 1"));
        env.command()?
            .arg("status")
            .assert()
            .stdout(current_step(1, "Download & Environment"))
            .stdout(predicate::str::contains("Repository: -"));
        Ok(())
    }
}
