//! Console formatting helpers shared by every command.
//!
//! Status messages are colored; toolkit output (banners, report tables) goes through
//! [`print_plain_lines`] untouched so it stays byte-identical to what the toolkit prints.
//!
//! # Colors
//! - **Red**: errors
//! - **Yellow**: warnings, including refused workflow transitions
//! - **Green**: completed actions
//! - **Blue**: section headers

use colored::*;

/// Prints `✕ Error: <message>` in red, surrounded by blank lines
pub fn print_error(message: &str) {
    println!("\n{} {}\n", "✕ Error:".red(), message.white());
}

/// Prints `⚠ <message>` in yellow
pub fn print_warning(message: &str) {
    println!("\n{} {}", "⚠".yellow(), message.yellow());
}

/// Prints `✓ <message>` with a green checkmark
pub fn print_success(message: &str) {
    println!("\n{} {}", "✓".green(), message.white());
}

pub fn print_info(message: &str) {
    println!("\n{}\n", message.white());
}

/// Prints `<header>:` followed by a blank line
pub fn print_section_header(header: &str) {
    println!("\n{}:\n", header.blue());
}

/// `  key: value` pairs, keys dimmed
pub fn print_key_values<K: AsRef<str>, V: AsRef<str>>(pairs: &[(K, V)]) {
    for (key, value) in pairs {
        println!("  {} {}", format!("{}:", key.as_ref()).bright_black(), value.as_ref().white());
    }
}

/// Lines printed exactly as given
pub fn print_plain_lines<S: AsRef<str>>(lines: &[S]) {
    for line in lines {
        println!("{}", line.as_ref());
    }
}
