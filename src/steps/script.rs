use crate::{
    config::{InstallChoices, InstallConfig, Secret},
    error::InstallerError,
};

/// Location of the configuration script inside the target system.
pub const SCRIPT_PATH: &str = "/post_install.sh";

/// Group granted sudo rights.
pub const ADMIN_GROUP: &str = "wheel";

/// Quotes `value` for bash. `what` names the value in the error.
fn quote(what: &'static str, value: &str) -> Result<String, InstallerError> {
    shlex::try_quote(value)
        .map(|quoted| quoted.into_owned())
        .map_err(|_| InstallerError::Unquotable(what))
}

/// Escapes basic-regex metacharacters for a sed pattern.
fn sed_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if "\\/.*[]^$".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Renders the script run inside the new system with `arch-chroot`.
///
/// The script carries no passwords; those go through [`password_feed`].
/// Same input, same bytes. Fails when a value cannot be quoted (NUL).
pub fn render(choices: &InstallChoices, config: &InstallConfig) -> Result<String, InstallerError> {
    let uncomment_locale = format!(
        r"s/^#\({}\)/\1/",
        sed_escape(&choices.locale.entry())
    );
    let zone_file = format!("/usr/share/zoneinfo/{}", choices.timezone);
    let efi_dir = format!("/{}", config.efi_dir.display());

    let lines = [
        "#!/bin/bash".to_string(),
        "set -e".to_string(),
        String::new(),
        format!("ln -sf {} /etc/localtime", quote("timezone", &zone_file)?),
        "hwclock --systohc".to_string(),
        format!("sed -i {} /etc/locale.gen", quote("locale", &uncomment_locale)?),
        "locale-gen".to_string(),
        format!(
            "echo {} > /etc/locale.conf",
            quote("locale", &format!("LANG={}", choices.locale.name()))?
        ),
        format!("echo {} > /etc/hostname", quote("hostname", &choices.hostname)?),
        String::new(),
        format!(
            "useradd -m -G {} -s /bin/bash {}",
            ADMIN_GROUP,
            quote("username", &choices.username)?
        ),
        format!(
            "sed -i 's/^# *%{g} ALL=(ALL:ALL) ALL/%{g} ALL=(ALL:ALL) ALL/' /etc/sudoers",
            g = ADMIN_GROUP
        ),
        String::new(),
        "systemctl enable NetworkManager".to_string(),
        String::new(),
        format!(
            "grub-install --efi-directory={} {}",
            quote("EFI directory", &efi_dir)?,
            quote("disk", &config.disk)?
        ),
        "grub-mkconfig -o /boot/grub/grub.cfg".to_string(),
    ];

    let mut script = lines.join("\n");
    script.push('\n');
    Ok(script)
}

/// `chpasswd` input setting both passwords. Meant for a stdin pipe only.
pub fn password_feed(choices: &InstallChoices) -> Secret {
    Secret::new(format!(
        "root:{}\n{}:{}\n",
        choices.root_password.expose(),
        choices.username,
        choices.user_password.expose()
    ))
}
