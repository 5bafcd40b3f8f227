use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn run_builds_then_executes_the_artifact() {
  let env = TestEnv::new(&[(
    "BUILD",
    r#"
      local cmd = load("command")
      cmd.bash({
        name = "tool",
        script = 'printf \'#!/bin/sh\necho artifact-ran "$@"\n\' > "$OUTPUT"; chmod +x "$OUTPUT"',
      })
    "#,
  )]);

  env
    .kiln()
    .args(["run", "//:tool", "extra-arg"])
    .assert()
    .success()
    .stdout(predicate::str::contains("artifact-ran extra-arg"));
}

#[test]
fn run_propagates_the_artifact_exit_code() {
  let env = TestEnv::new(&[(
    "BUILD",
    r#"
      local cmd = load("command")
      cmd.bash({
        name = "failing",
        script = 'printf \'#!/bin/sh\nexit 7\n\' > "$OUTPUT"; chmod +x "$OUTPUT"',
      })
    "#,
  )]);

  env.kiln().args(["run", "//:failing"]).assert().code(7);
}

#[test]
fn run_uses_the_cached_artifact_on_repeat() {
  let env = TestEnv::new(&[(
    "BUILD",
    r#"
      local cmd = load("command")
      cmd.bash({
        name = "tool",
        script = 'printf \'#!/bin/sh\necho ok\n\' > "$OUTPUT"; chmod +x "$OUTPUT"',
      })
    "#,
  )]);

  env.kiln().args(["run", "//:tool"]).assert().success();
  env
    .kiln()
    .args(["run", "//:tool"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Found artifact"))
    .stdout(predicate::str::contains("ok"));
}
