use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const CONFIG: &str = r#"
organization:
  accounts:
    - name: management
      id: "111111111111"
      email: mgmt@example.com
      organizational_unit: Root
    - name: workload-a
      id: "222222222222"
      email: a@example.com
      organizational_unit: Root/Infra
    - name: workload-b
      id: "333333333333"
      email: b@example.com
      organizational_unit: Root/Infra
management_account: management
regions:
  - us-east-1
pipeline:
  stages:
    - name: bootstrap
      run_order: 1
      modules:
        - name: iam-baseline
          kind: describe
          target:
            organizational_units:
              - Root
    - name: deploy
      run_order: 2
      modules:
        - name: vpc
          kind: describe
          target:
            organizational_units:
              - Infra
            excluded_accounts:
              - workload-b
"#;

fn write_config(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("strata.yaml");
    std::fs::write(&path, contents).unwrap();
    path
}

fn strata(dir: &TempDir, contents: &str) -> Command {
    let path = write_config(dir, contents);
    let mut cmd = Command::cargo_bin("strata").unwrap();
    cmd.current_dir(dir.path()).arg("--config").arg(path);
    cmd
}

// ---------------------------------------------------------------------------
// strata validate
// ---------------------------------------------------------------------------

#[test]
fn validate_accepts_good_config() {
    let dir = TempDir::new().unwrap();
    strata(&dir, CONFIG)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("configuration valid"));
}

#[test]
fn validate_rejects_unknown_target_account() {
    let dir = TempDir::new().unwrap();
    let broken = CONFIG.replace("- workload-b\n", "- no-such-account\n");
    strata(&dir, &broken)
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no-such-account"));
}

#[test]
fn validate_rejects_unknown_module_kind() {
    let dir = TempDir::new().unwrap();
    let broken = CONFIG.replace("kind: describe", "kind: cloudformation");
    strata(&dir, &broken)
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown module kind"));
}

#[test]
fn validate_rejects_duplicate_stage_run_order() {
    let dir = TempDir::new().unwrap();
    let broken = CONFIG.replace("run_order: 2", "run_order: 1");
    strata(&dir, &broken)
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("share run order"));
}

// ---------------------------------------------------------------------------
// strata accounts / resolve
// ---------------------------------------------------------------------------

#[test]
fn accounts_lists_every_account() {
    let dir = TempDir::new().unwrap();
    strata(&dir, CONFIG)
        .arg("accounts")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("management")
                .and(predicate::str::contains("workload-a"))
                .and(predicate::str::contains("333333333333")),
        );
}

#[test]
fn resolve_configured_module_applies_exclusions() {
    let dir = TempDir::new().unwrap();
    strata(&dir, CONFIG)
        .args(["resolve", "--module", "vpc"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("222222222222")
                .and(predicate::str::contains("333333333333").not()),
        );
}

#[test]
fn resolve_ad_hoc_root_ou() {
    let dir = TempDir::new().unwrap();
    strata(&dir, CONFIG)
        .args(["resolve", "--ou", "Root"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 account(s)"));
}

#[test]
fn resolve_unknown_module_fails() {
    let dir = TempDir::new().unwrap();
    strata(&dir, CONFIG)
        .args(["resolve", "--module", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no module named"));
}

// ---------------------------------------------------------------------------
// strata run
// ---------------------------------------------------------------------------

#[test]
fn dry_run_completes_and_reports_every_stage() {
    let dir = TempDir::new().unwrap();
    strata(&dir, CONFIG)
        .args(["run", "--dry-run"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("completed")
                .and(predicate::str::contains("bootstrap"))
                .and(predicate::str::contains("deploy")),
        );
}

#[test]
fn dry_run_json_report_is_structured() {
    let dir = TempDir::new().unwrap();
    let output = strata(&dir, CONFIG)
        .args(["--json", "run", "--dry-run"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["state"], "completed");
    assert_eq!(report["dry_run"], true);
    assert_eq!(report["stages"].as_array().unwrap().len(), 2);
}

#[test]
fn run_rejects_zero_max_concurrent_flag() {
    let dir = TempDir::new().unwrap();
    strata(&dir, CONFIG)
        .args(["run", "--dry-run", "--max-concurrent", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--max-concurrent"));
}

#[test]
fn run_rejects_zero_max_concurrent_in_config() {
    let dir = TempDir::new().unwrap();
    let zero = format!("{CONFIG}\nmax_concurrent: 0\n");
    strata(&dir, &zero)
        .args(["run", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 1"));
}

#[test]
fn run_fails_when_no_regions_configured() {
    let dir = TempDir::new().unwrap();
    let no_regions = CONFIG.replace("regions:\n  - us-east-1\n", "regions: []\n");
    strata(&dir, &no_regions)
        .args(["run", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no regions"));
}
