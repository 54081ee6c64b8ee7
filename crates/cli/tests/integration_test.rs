use std::process::{Command, Output};

fn algo_trade(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_algo-trade"))
        .args(args)
        .env_remove("HEDGE_YES_TOKEN_ID")
        .env_remove("HEDGE_NO_TOKEN_ID")
        .env_remove("HEDGE_MARKET_ID")
        .output()
        .expect("Failed to run algo-trade")
}

#[test]
fn test_hedge_refuses_live_mode() {
    let output = algo_trade(&[
        "hedge",
        "--config",
        "tests/missing.toml",
        "--yes-token-id",
        "111",
        "--no-token-id",
        "222",
        "--live",
    ]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Live trading"), "stderr: {stderr}");
}

#[test]
fn test_hedge_requires_token_ids() {
    let output = algo_trade(&["hedge", "--config", "tests/missing.toml"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("yes_token_id"), "stderr: {stderr}");
}

#[test]
fn test_help_lists_hedge_command() {
    let output = algo_trade(&["--help"]);

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("hedge"));
}
