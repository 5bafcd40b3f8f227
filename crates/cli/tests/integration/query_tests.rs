use predicates::prelude::*;

use super::common::{TestEnv, cache_entries, kiln_outside_workspace};

const SIMPLE_BUILD: &str = r#"mktarget({ name = "lib", type = "noop", args = { label = "v1" } })"#;

#[test]
fn show_prints_the_evaluated_target_as_json() {
  let env = TestEnv::new(&[("pkg/BUILD", SIMPLE_BUILD)]);

  env
    .kiln()
    .args(["show", "//pkg:lib"])
    .assert()
    .success()
    .stdout(predicate::str::contains(r#""package": "pkg""#))
    .stdout(predicate::str::contains(r#""name": "lib""#))
    .stdout(predicate::str::contains(r#""type": "noop""#))
    .stdout(predicate::str::contains(r#""label": "v1""#));
}

#[test]
fn eval_is_an_alias_for_show() {
  let env = TestEnv::new(&[("pkg/BUILD", SIMPLE_BUILD)]);

  env
    .kiln()
    .args(["eval", "//pkg:lib"])
    .assert()
    .success()
    .stdout(predicate::str::contains(r#""name": "lib""#));
}

#[test]
fn checksum_is_stable_across_invocations() {
  let env = TestEnv::new(&[("pkg/BUILD", SIMPLE_BUILD)]);

  let first = env.kiln().args(["checksum", "//pkg:lib"]).assert().success();
  let second = env.kiln().args(["checksum", "//pkg:lib"]).assert().success();
  assert_eq!(first.get_output().stdout, second.get_output().stdout);

  let printed = String::from_utf8_lossy(&first.get_output().stdout).trim().to_string();
  printed.parse::<u32>().expect("checksum must be a 32-bit integer");
}

#[test]
fn checksum_depends_on_the_declaration() {
  let env = TestEnv::new(&[(
    "pkg/BUILD",
    r#"
      mktarget({ name = "a", type = "noop", args = { label = "one" } })
      mktarget({ name = "b", type = "noop", args = { label = "two" } })
    "#,
  )]);

  let a = env.kiln().args(["checksum", "//pkg:a"]).assert().success();
  let b = env.kiln().args(["checksum", "//pkg:b"]).assert().success();
  assert_ne!(a.get_output().stdout, b.get_output().stdout);
}

#[test]
fn cache_path_points_into_the_cache_without_building() {
  let env = TestEnv::new(&[("pkg/BUILD", SIMPLE_BUILD)]);

  let assert = env.kiln().args(["cache-path", "//pkg:lib"]).assert().success();
  let printed = String::from_utf8_lossy(&assert.get_output().stdout).trim().to_string();
  assert!(
    printed.starts_with(env.cache_path().to_str().unwrap()),
    "path {} must live under the cache",
    printed
  );
  assert!(printed.contains("packages/pkg/targets/lib/"), "{}", printed);

  // Querying must not materialize the artifact.
  assert!(!std::path::Path::new(&printed).exists());
}

#[test]
fn path_is_an_alias_for_cache_path() {
  let env = TestEnv::new(&[("pkg/BUILD", SIMPLE_BUILD)]);
  env.kiln().args(["path", "//pkg:lib"]).assert().success();
}

#[test]
fn graph_prints_the_dag_with_dependencies() {
  let env = TestEnv::new(&[
    ("b/BUILD", r#"mktarget({ name = "lib", type = "noop", args = {} })"#),
    (
      "a/BUILD",
      r#"mktarget({ name = "bin", type = "noop", args = { dep = reftarget("//b:lib") } })"#,
    ),
  ]);

  env
    .kiln()
    .args(["graph", "//a:bin"])
    .assert()
    .success()
    .stdout(predicate::str::contains(r#""id": "//a:bin@"#))
    .stdout(predicate::str::contains(r#""id": "//b:lib@"#))
    .stdout(predicate::str::contains(r#""dependencies""#));
}

#[test]
fn freezing_publishes_file_groups_but_not_targets() {
  let env = TestEnv::new(&[
    ("pkg/data.txt", "payload"),
    (
      "pkg/BUILD",
      r#"mktarget({ name = "lib", type = "noop", args = { srcs = glob("*.txt") } })"#,
    ),
  ]);

  env.kiln().args(["checksum", "//pkg:lib"]).assert().success();

  let entries = cache_entries(env.cache_path());
  assert!(
    entries.iter().any(|p| p.to_string_lossy().contains("filegroups")),
    "file group must be staged during freezing: {:?}",
    entries
  );
  assert!(
    !entries.iter().any(|p| p.to_string_lossy().contains("targets")),
    "no target artifact may exist before build: {:?}",
    entries
  );
}

#[test]
fn missing_target_fails() {
  let env = TestEnv::new(&[("pkg/BUILD", SIMPLE_BUILD)]);

  env
    .kiln()
    .args(["show", "//pkg:ghost"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("target not found"));
}

#[test]
fn invalid_reference_fails() {
  let env = TestEnv::new(&[("BUILD", SIMPLE_BUILD)]);

  env
    .kiln()
    .args(["build", "no-colon"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("invalid target ref"));

  env
    .kiln()
    .args(["build", "//./pkg:lib"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("invalid target ref"));
}

#[test]
fn escaping_the_workspace_fails() {
  let env = TestEnv::new(&[("BUILD", SIMPLE_BUILD)]);

  env
    .kiln()
    .args(["build", "../../elsewhere:lib"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("outside workspace"));
}

#[test]
fn running_outside_a_workspace_fails() {
  let (_dir, mut cmd) = kiln_outside_workspace();

  cmd
    .args(["build", "//:t"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("WORKSPACE"));
}
