use std::{fmt, fs, path::Path};

use console::style;
use dialoguer::{Confirm, Input, Password, Select};
use log::{info, warn};

use crate::{
    config::{InstallChoices, Secret},
    error::InstallerError,
    ui,
};

pub const ZONEINFO_DIR: &str = "/usr/share/zoneinfo";
pub const LOCALE_GEN: &str = "/etc/locale.gen";

// ── Validated values ──────────────────────────────────────────────────────────

/// A zone such as `America/Sao_Paulo`. Only obtainable by picking it from
/// the zoneinfo database of the running system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timezone(String);

impl Timezone {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Timezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An entry of `/etc/locale.gen`, e.g. `en_US.UTF-8 UTF-8`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale {
    name: String,
    charset: String,
}

impl Locale {
    /// `en_US.UTF-8`; the value of `LANG`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The full line as it appears (uncommented) in locale.gen.
    pub fn entry(&self) -> String {
        if self.charset.is_empty() {
            self.name.clone()
        } else {
            format!("{} {}", self.name, self.charset)
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.entry())
    }
}

// ── Choosers ──────────────────────────────────────────────────────────────────

/// Picks one entry of a list and returns its index.
pub trait Chooser {
    fn choose(&mut self, title: &str, options: &[String]) -> Result<usize, InstallerError>;
}

/// Arrow-key menu.
pub struct MenuChooser;

/// Prints a numbered list and reads an index.
pub struct NumericChooser;

impl Chooser for MenuChooser {
    fn choose(&mut self, title: &str, options: &[String]) -> Result<usize, InstallerError> {
        println!();
        ui::print_info("Use ↑ ↓ to move, Enter to select, Esc to abort.");

        match Select::new()
            .with_prompt(title)
            .items(options)
            .default(0)
            .max_length(15)
            .interact_opt()
        {
            Ok(Some(idx)) => Ok(idx),
            Ok(None) => Err(InstallerError::Cancelled),
            Err(why) => {
                warn!("menu failed ({}), falling back to numeric input", why);
                NumericChooser.choose(title, options)
            }
        }
    }
}

impl Chooser for NumericChooser {
    fn choose(&mut self, title: &str, options: &[String]) -> Result<usize, InstallerError> {
        println!();
        println!("  {}", style(title).white().bold());
        for (i, opt) in options.iter().enumerate() {
            println!("  {:>4}: {}", style(i).dim(), opt);
        }

        let len = options.len();
        let idx = Input::<usize>::new()
            .with_prompt("nº")
            .validate_with(|n: &usize| -> Result<(), String> {
                if *n < len {
                    Ok(())
                } else {
                    Err(format!("pick a number between 0 and {}", len - 1))
                }
            })
            .interact_text()?;

        Ok(idx)
    }
}

/// Arrow-key menu on an attended terminal, numbered list otherwise.
pub fn detect_chooser() -> Box<dyn Chooser> {
    if console::user_attended_stderr() {
        Box::new(MenuChooser)
    } else {
        info!("stderr is not a terminal, using numeric selection");
        Box::new(NumericChooser)
    }
}

/// Asks `chooser` for an index into `options`. Anything outside the list
/// is rejected.
fn pick(
    chooser: &mut dyn Chooser,
    title: &str,
    options: &[String],
    what: &'static str,
) -> Result<usize, InstallerError> {
    if options.is_empty() {
        return Err(InstallerError::NoChoices(what));
    }
    match chooser.choose(title, options)? {
        idx if idx < options.len() => Ok(idx),
        idx => Err(InstallerError::InvalidSelection(idx)),
    }
}

// ── Timezones ─────────────────────────────────────────────────────────────────

/// Entry names of `dir`, sorted. Symlinks are followed, so a region
/// linked to another directory still counts as a directory.
fn sorted_entries(dir: &Path, dirs_only: bool) -> Result<Vec<String>, InstallerError> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if dirs_only && !entry.path().is_dir() {
            continue;
        }
        if let Ok(name) = entry.file_name().into_string() {
            names.push(name);
        }
    }
    names.sort_unstable();
    Ok(names)
}

/// Region first (`America`), then down the tree until a zone file is
/// picked (`Sao_Paulo`, or `Argentina` → `Buenos_Aires`).
pub fn choose_timezone(
    chooser: &mut dyn Chooser,
    zoneinfo: &Path,
) -> Result<Timezone, InstallerError> {
    let regions = sorted_entries(zoneinfo, true)?;
    let region = regions[pick(chooser, "Region", &regions, "timezone regions")?].clone();

    let mut dir = zoneinfo.join(&region);
    let mut parts = vec![region];
    while dir.is_dir() {
        let entries = sorted_entries(&dir, false)?;
        let name = entries[pick(chooser, "City / sub-region", &entries, "timezones")?].clone();
        dir.push(&name);
        parts.push(name);
    }

    Ok(Timezone(parts.join("/")))
}

// ── Locales ───────────────────────────────────────────────────────────────────

/// Commented-out entries of locale.gen: `#en_US.UTF-8 UTF-8`.
/// Prose comments (`# ...`) are skipped.
fn parse_locale_gen(text: &str) -> Vec<Locale> {
    text.lines()
        .filter_map(|line| {
            let rest = line.strip_prefix('#')?;
            let first = rest.chars().next()?;
            if !(first.is_alphanumeric() || first == '_') {
                return None;
            }
            let mut fields = rest.split_whitespace();
            let name = fields.next()?.to_string();
            let charset = fields.next().unwrap_or("").to_string();
            Some(Locale { name, charset })
        })
        .collect()
}

pub fn choose_locale(chooser: &mut dyn Chooser, locale_gen: &Path) -> Result<Locale, InstallerError> {
    let locales = parse_locale_gen(&fs::read_to_string(locale_gen)?);
    let labels: Vec<String> = locales.iter().map(Locale::entry).collect();

    let idx = pick(chooser, "Locale", &labels, "locales")?;
    Ok(locales[idx].clone())
}

// ── Whole questionnaire ───────────────────────────────────────────────────────

fn ask_text(prompt: &str) -> Result<String, InstallerError> {
    let value: String = Input::new().with_prompt(prompt).interact_text()?;
    Ok(value.trim().to_string())
}

fn ask_password(prompt: &str) -> Result<Secret, InstallerError> {
    let value = Password::new()
        .with_prompt(prompt)
        .with_confirmation("Repeat password", "Passwords do not match")
        .interact()?;
    Ok(Secret::new(value))
}

/// Asks every question, shows a summary, and returns the answers only
/// after an explicit yes.
pub fn collect(chooser: &mut dyn Chooser) -> Result<InstallChoices, InstallerError> {
    let timezone = choose_timezone(chooser, Path::new(ZONEINFO_DIR))?;
    ui::print_success(&format!("Timezone: {}", timezone));

    let locale = choose_locale(chooser, Path::new(LOCALE_GEN))?;
    ui::print_success(&format!("Locale: {}", locale.name()));

    println!();
    let hostname = ask_text("Hostname")?;
    let username = ask_text("New user")?;
    let user_password = ask_password(&format!("Password for {}", username))?;
    let root_password = ask_password("Password for root")?;

    println!();
    ui::print_kv_box(
        "Summary",
        &[
            ("Timezone", timezone.as_str()),
            ("Locale", locale.name()),
            ("Hostname", hostname.as_str()),
            ("Username", username.as_str()),
        ],
    );
    println!();

    if !Confirm::new()
        .with_prompt("Use these settings?")
        .default(false)
        .interact()?
    {
        return Err(InstallerError::Cancelled);
    }

    Ok(InstallChoices {
        timezone,
        locale,
        hostname,
        username,
        user_password,
        root_password,
    })
}
