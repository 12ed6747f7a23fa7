use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_all_subcommands() {
    Command::cargo_bin("quizscribe")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("serve")
                .and(predicate::str::contains("analyze"))
                .and(predicate::str::contains("config"))
                .and(predicate::str::contains("producers")),
        );
}

#[test]
fn analyze_requires_a_url_argument() {
    Command::cargo_bin("quizscribe")
        .unwrap()
        .arg("analyze")
        .assert()
        .failure()
        .stderr(predicate::str::contains("URL"));
}

#[test]
fn version_flag_works() {
    Command::cargo_bin("quizscribe")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("quizscribe"));
}
