use std::{env, env::VarError};

/// There's no real CLI for the server. Any argument prints the help and the current configuration.
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // IPG_CUSTODY_API_KEY is deliberately absent
    const DISPLAY_ENVS: [&str; 18] = [
        "RUST_LOG",
        "IPG_HOST",
        "IPG_PORT",
        "IPG_DATABASE_URL",
        "IPG_EXPIRE_INTERVAL",
        "IPG_EXPIRY_TICK_MS",
        "IPG_SETTLEMENT_TICK_MS",
        "IPG_OUTBOX_TICK_MS",
        "IPG_SETTLEMENT_MAX_ATTEMPTS",
        "IPG_GAS_LIMIT_BASE",
        "IPG_GAS_LIMIT_STEP",
        "IPG_SETTLEMENT_BACKOFF_MS",
        "IPG_COLLABORATOR_TIMEOUT_MS",
        "IPG_CUSTODY_URL",
        "IPG_PRICE_URL",
        "IPG_ALERT_URL",
        "IPG_BUS_URL",
        "IPG_TOKEN_DECIMALS",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    });
    let flag = env::var("IPG_CANCEL_ACCEPTING_ON_MATCH").unwrap_or_else(|_| "Not set".into());
    println!("  {:<35} {flag:<15}", "IPG_CANCEL_ACCEPTING_ON_MATCH");
}
