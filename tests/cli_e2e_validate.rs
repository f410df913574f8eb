//! End-to-end tests for the `validate` and `accumulate` commands.

mod common;

use common::prelude::*;

#[test]
fn test_validate_prints_summary() {
    let fixture = TestFixture::new()
        .with_kustomization(
            "",
            "resources:
- cm.yaml
configMapGenerator:
- name: settings
  literals:
  - A=1
patches:
- path: patch.yaml
",
        )
        .with_file("cm.yaml", manifests::CONFIG_MAP);

    fixture
        .command()
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("[OK] kustomization.yaml parsed successfully"))
        .stdout(predicate::str::contains("Kind: Kustomization"))
        .stdout(predicate::str::contains("Resources: 1"))
        .stdout(predicate::str::contains("Generators: 1"))
        .stdout(predicate::str::contains("Transformers: 1"));
}

#[test]
fn test_validate_component() {
    let fixture = TestFixture::new().with_kustomization(
        "feature",
        "apiVersion: kustomize.config.k8s.io/v1alpha1\nkind: Component\n",
    );

    fixture
        .command()
        .args(["validate", "feature"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Kind: Component"));
}

#[test]
fn test_validate_rejects_malformed_field() {
    let fixture = TestFixture::new().with_kustomization("", "resources: cm.yaml\n");

    fixture
        .command()
        .arg("validate")
        .assert()
        .failure()
        .stdout(predicate::str::contains("[ERR] Loading failed"))
        .stderr(predicate::str::contains("Configuration parsing error"));
}

#[test]
fn test_validate_empty_file() {
    let fixture = TestFixture::new().with_kustomization("", "");

    fixture
        .command()
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("kustomization.yaml is empty"));
}

#[test]
fn test_accumulate_keeps_build_annotations() {
    let fixture = TestFixture::new()
        .with_kustomization(
            "",
            "namePrefix: app-
configMapGenerator:
- name: settings
  literals:
  - A=1
",
        );

    fixture
        .command()
        .arg("accumulate")
        .assert()
        .success()
        .stdout(predicate::str::contains("name: settings\n"))
        .stdout(predicate::str::contains("app-settings").not())
        .stdout(predicate::str::contains("internal.config.kubernetes.io/needsHashSuffix"));
}

#[test]
fn test_help_lists_commands() {
    let fixture = TestFixture::new();

    fixture
        .command()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("accumulate"));
}
