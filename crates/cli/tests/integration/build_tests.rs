use predicates::prelude::*;

use super::common::TestEnv;

const NOOP_BUILD: &str = r#"mktarget({ name = "noop", type = "noop", args = {} })"#;

#[test]
fn first_build_materializes_then_second_finds() {
  let env = TestEnv::new(&[("BUILD", NOOP_BUILD)]);

  env
    .kiln()
    .args(["build", "//:noop"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Building //:noop@"));

  env
    .kiln()
    .args(["build", "//:noop"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Found artifact //:noop@"));
}

#[test]
fn changing_a_source_file_triggers_a_rebuild() {
  let env = TestEnv::new(&[
    ("a/hello.txt", "hi"),
    (
      "a/BUILD",
      r#"mktarget({ name = "lib", type = "noop", args = { srcs = glob("*.txt") } })"#,
    ),
  ]);

  env.kiln().args(["build", "//a:lib"]).assert().success();
  env
    .kiln()
    .args(["build", "//a:lib"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Found artifact"));

  env.write("a/hello.txt", "hello");
  env
    .kiln()
    .args(["build", "//a:lib"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Building //a:lib@"));
}

#[test]
fn relative_references_resolve_from_the_invocation_directory() {
  let env = TestEnv::new(&[("pkg/BUILD", r#"mktarget({ name = "lib", type = "noop", args = {} })"#)]);

  env
    .kiln_in("pkg")
    .args(["build", ":lib"])
    .assert()
    .success()
    .stdout(predicate::str::contains("//pkg:lib@"));
}

#[test]
fn bash_targets_build_through_the_command_plugin() {
  let env = TestEnv::new(&[(
    "BUILD",
    r#"
      local cmd = load("command")
      cmd.bash({ name = "greeting", script = 'printf hello > "$OUTPUT"' })
    "#,
  )]);

  env.kiln().args(["build", "//:greeting"]).assert().success();
}

#[test]
fn failing_build_script_flushes_its_stderr() {
  let env = TestEnv::new(&[(
    "BUILD",
    r#"
      local cmd = load("command")
      cmd.bash({ name = "doomed", script = "echo boom >&2; exit 1" })
    "#,
  )]);

  env
    .kiln()
    .args(["build", "//:doomed"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("boom"))
    .stderr(predicate::str::contains("building target //:doomed@"));
}

#[test]
fn unknown_builder_type_fails() {
  let env = TestEnv::new(&[("BUILD", r#"mktarget({ name = "t", type = "alien", args = {} })"#)]);

  env
    .kiln()
    .args(["build", "//:t"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("no plugin for builder type 'alien'"));
}

#[test]
fn dependency_chains_build_bottom_up() {
  let env = TestEnv::new(&[
    ("b/BUILD", r#"mktarget({ name = "lib", type = "noop", args = {} })"#),
    (
      "a/BUILD",
      r#"mktarget({ name = "bin", type = "noop", args = { dep = reftarget("//b:lib") } })"#,
    ),
  ]);

  let assert = env.kiln().args(["build", "//a:bin"]).assert().success();
  let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
  let lib_pos = stdout.find("//b:lib@").expect("lib must be built");
  let bin_pos = stdout.find("//a:bin@").expect("bin must be built");
  assert!(lib_pos < bin_pos, "dependency must be reported before dependent:\n{}", stdout);
}
