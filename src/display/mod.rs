// src/display/mod.rs
//! Display modules

pub mod terminal;

/// Check if stdout looks like an interactive terminal worth redrawing
pub fn should_use_terminal() -> bool {
    use std::io::IsTerminal;
    std::io::stdout().is_terminal() && std::env::var("TERM").map_or(true, |t| t != "dumb")
}
