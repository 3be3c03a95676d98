use assert_cmd::cargo::cargo_bin_cmd;
use kvdiag_testing::TestWorld;
use kvdiag_testing::world::UNREACHABLE_ENDPOINT;
use predicates::prelude::*;

#[test]
fn test_unreachable_cluster_still_writes_report() -> anyhow::Result<()> {
    let world = TestWorld::new();

    let mut cmd = cargo_bin_cmd!("kvdiag");
    world
        .configure_command(&mut cmd)
        .arg("--endpoints")
        .arg(UNREACHABLE_ENDPOINT)
        .arg("--dial-timeout")
        .arg("200")
        .arg("--command-timeout")
        .arg("500");

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Running membershipChecker (1/5)..."))
        .stderr(predicate::str::contains("Running metricsChecker (5/5)..."));

    let report = world.read_report()?;
    assert_eq!(report["input"]["endpoints"][0], UNREACHABLE_ENDPOINT);
    assert_eq!(report["input"]["command_timeout_ms"], 500);

    let results = report["results"].as_array().expect("results array");
    let names: Vec<&str> = results.iter().filter_map(|r| r["name"].as_str()).collect();
    assert_eq!(
        names,
        vec![
            "membershipChecker",
            "epStatusChecker",
            "serializableReadChecker",
            "linearizableReadChecker",
            "metricsChecker"
        ]
    );
    for result in results {
        let summary = result["summary"].as_array().expect("summary array");
        assert!(!summary.is_empty(), "expected a failure in {}", result);
    }
    Ok(())
}

#[test]
fn test_report_never_contains_password() -> anyhow::Result<()> {
    let world = TestWorld::new();
    let config = world.write_config(&format!(
        "endpoints = [\"{}\"]\ndial_timeout_ms = 200\ncommand_timeout_ms = 500\n",
        UNREACHABLE_ENDPOINT
    ))?;

    let mut cmd = cargo_bin_cmd!("kvdiag");
    world
        .configure_command(&mut cmd)
        .arg("--config")
        .arg(&config)
        .arg("--user")
        .arg("root")
        .arg("--password")
        .arg("s3cret");
    cmd.assert().success();

    let text = std::fs::read_to_string(world.report_path())?;
    assert!(!text.contains("s3cret"));
    assert!(text.contains("\t\"input\""));
    Ok(())
}
