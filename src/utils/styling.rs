//! Terminal styling utilities for the analysis run output

use console::{style, Emoji};
use std::path::Path;
use std::time::Duration;

// Emoji icons with fallbacks for terminals that don't support them
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "[*] ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", ">> ");
pub static CHART: Emoji<'_, '_> = Emoji("📊 ", "");
pub static FOLDER: Emoji<'_, '_> = Emoji("📂 ", "");
pub static SAVE: Emoji<'_, '_> = Emoji("💾 ", "");
pub static DICE: Emoji<'_, '_> = Emoji("🎲 ", "");

/// Print the application banner
pub fn print_banner(version: &str) {
    let banner = r#"
    ██╗  ██╗ ██████╗ ███████╗████████╗██████╗ ██████╗ ███████╗███╗   ███╗
    ██║  ██║██╔═══██╗██╔════╝╚══██╔══╝██╔══██╗██╔══██╗██╔════╝████╗ ████║
    ███████║██║   ██║███████╗   ██║   ██████╔╝██████╔╝█████╗  ██╔████╔██║
    ██╔══██║██║   ██║╚════██║   ██║   ██╔═══╝ ██╔══██╗██╔══╝  ██║╚██╔╝██║
    ██║  ██║╚██████╔╝███████║   ██║   ██║     ██║  ██║███████╗██║ ╚═╝ ██║
    ╚═╝  ╚═╝ ╚═════╝ ╚══════╝   ╚═╝   ╚═╝     ╚═╝  ╚═╝╚══════╝╚═╝     ╚═╝
    "#;

    println!();
    println!("{}", style(banner).cyan().bold());
    println!(
        "    {}",
        style("Superhost price premiums by room category").dim()
    );
    println!("    {}", style(format!("v{}", version)).dim());
    println!("    {}", style("━".repeat(50)).dim());
    println!();
}

/// Print configuration card
pub fn print_config(input: &Path, out_dir: &Path, mode: &str, seed: u64, bootstrap: usize) {
    let box_width = 56;
    let line = "─".repeat(box_width - 2);

    println!("    ┌{}┐", line);
    println!(
        "    │ {}{}│",
        style("⚙️  Configuration").cyan().bold(),
        " ".repeat(box_width - 20)
    );
    println!("    ├{}┤", line);
    println!("    │  {} Input:  {:<39}│", FOLDER, truncate_path(input, 38));
    println!("    │  {} Output: {:<39}│", SAVE, truncate_path(out_dir, 38));
    println!("    ├{}┤", line);
    println!(
        "    │  {} Cleaning mode:       {:<26}│",
        CHART,
        style(mode).yellow()
    );
    println!(
        "    │  {} Seed:                {:<26}│",
        DICE,
        style(seed).yellow()
    );
    println!(
        "    │  {} Bootstrap iterations:{:<26}│",
        CHART,
        style(bootstrap).yellow()
    );
    println!("    └{}┘", line);
    println!();
}

/// Print a step header with styling
pub fn print_step_header(step_num: u8, title: &str) {
    println!();
    println!(
        "    {} {} {}",
        style(format!("STEP {}", step_num)).cyan().bold(),
        style("│").dim(),
        style(title).white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("    {} {}", style("✓").green().bold(), style(message).green());
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("    {} {}", INFO, message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("    {} {}", style("!").yellow().bold(), style(message).yellow());
}

/// Print the elapsed time of a pipeline step
pub fn print_step_time(elapsed: Duration) {
    println!(
        "      {}",
        style(format!("completed in {:.2}s", elapsed.as_secs_f64())).dim()
    );
}

/// Print the final completion message
pub fn print_completion() {
    println!();
    println!(
        "    {} {}",
        ROCKET,
        style("Premium analysis complete!").green().bold()
    );
    println!();
}

// Helper functions

fn truncate_path(path: &Path, max_len: usize) -> String {
    let path_str = path.display().to_string();
    truncate_string(&path_str, max_len)
}

fn truncate_string(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("...{}", &s[s.len() - max_len + 3..])
    }
}
