use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// ── Terminal helpers ──────────────────────────────────────────────────────────

fn term_width() -> usize {
    Term::stdout().size().1.max(60) as usize
}

fn rule() -> String {
    "─".repeat(term_width().min(56))
}

// ── Banner ────────────────────────────────────────────────────────────────────

pub fn print_banner() {
    let _ = Term::stdout().clear_screen();

    let logo = [
        r"      ▄▀█ █▀█ █▀▀ █░█",
        r"      █▀█ █▀▄ █▄▄ █▀█",
        r"   auto · install",
    ];

    println!();
    for line in &logo {
        println!("{}", style(line).cyan().bold());
    }
    println!();
    println!(
        "{}",
        style("   GPT · UEFI · ext4 + swap  ·  v0.1.0").dim().italic()
    );
    println!();
    println!("{}", style(rule()).dim());
    println!();
}

// ── Step header ───────────────────────────────────────────────────────────────

/// Prints a visually distinct numbered step header.
pub fn print_step(step: usize, total: usize, title: &str) {
    println!();
    let tag = style(format!(" {}/{} ", step, total)).black().on_cyan().bold();
    let heading = style(format!("  {}", title)).white().bold();
    println!("{}{}", tag, heading);
    println!("{}", style(rule()).dim());
}

// ── Feedback messages ─────────────────────────────────────────────────────────

/// Green ✓
pub fn print_success(msg: &str) {
    println!("  {}  {}", style("✓").green().bold(), style(msg).green());
}

/// Blue →
pub fn print_info(msg: &str) {
    println!("  {}  {}", style("→").blue().bold(), msg);
}

/// Cyan +, printed before an action runs.
pub fn print_action(msg: &str) {
    println!("  {}  {}…", style("+").cyan().bold(), msg);
}

/// Yellow ⚠
pub fn print_warning(msg: &str) {
    println!("  {}  {}", style("⚠").yellow().bold(), style(msg).yellow());
}

/// Red ✗ (stderr)
pub fn print_error(msg: &str) {
    eprintln!("  {}  {}", style("✗").red().bold(), style(msg).red());
}

// ── Info box ──────────────────────────────────────────────────────────────────

/// Renders a bordered key→value box.
///
/// ```text
/// ┌─ Summary ─────────────────────────────┐
/// │  Timezone     America/Sao_Paulo
/// │  Locale       en_US.UTF-8
/// └───────────────────────────────────────┘
/// ```
pub fn print_kv_box(title: &str, rows: &[(&str, &str)]) {
    const BOX_INNER: usize = 40;

    let dashes = "─".repeat(BOX_INNER.saturating_sub(title.chars().count() + 2));
    println!(
        "  ┌─ {} {}┐",
        style(title).white().bold(),
        style(&dashes).dim()
    );

    for (key, val) in rows {
        println!(
            "  │  {:<13}{}",
            style(*key).dim(),
            style(*val).white().bold()
        );
    }

    println!("  └{}┘", style("─".repeat(BOX_INNER + 2)).dim());
}

// ── Spinner ───────────────────────────────────────────────────────────────────

/// Returns a running braille spinner. Call `finish_and_clear()` when done.
pub fn spinner(msg: impl Into<String>) -> ProgressBar {
    let spinner_style = ProgressStyle::with_template("  {spinner:.cyan.bold}  {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);

    let pb = ProgressBar::new_spinner();
    pb.set_style(spinner_style);
    pb.set_message(msg.into());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}
