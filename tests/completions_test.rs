mod common;

use common::DeskTest;

#[test]
fn test_bash_completions() {
    let desk = DeskTest::new();
    let stdout = desk.run_success(&["completions", "bash"]);
    assert!(stdout.contains("_ticketdesk"));
    assert!(stdout.contains("comment"));
}

#[test]
fn test_zsh_completions() {
    let desk = DeskTest::new();
    let stdout = desk.run_success(&["completions", "zsh"]);
    assert!(stdout.contains("#compdef ticketdesk"));
}

#[test]
fn test_fish_completions() {
    let desk = DeskTest::new();
    let stdout = desk.run_success(&["completions", "fish"]);
    assert!(stdout.contains("complete -c ticketdesk"));
}

#[test]
fn test_unknown_shell_fails() {
    let desk = DeskTest::new();
    desk.run_failure(&["completions", "tcsh"]);
}
