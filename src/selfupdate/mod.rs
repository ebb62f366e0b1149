//! Replacing the running launcher executable.
//!
//! A running program cannot overwrite its own executable on every platform,
//! so the swap is handed to a detached helper script that outlives us:
//!
//! 1. sleep briefly so the parent's file handles are released
//! 2. delete the old executable
//! 3. move the downloaded executable into its place
//! 4. remove the temporary download directory
//! 5. start the new executable, detached
//!
//! [`SelfReplacer::prepare`] only writes the helper next to the download and
//! never touches the current executable. [`SelfUpdatePlan::execute`] consumes
//! the plan: it spawns the helper and exits the process. If spawning fails the
//! process keeps running on the old executable and the error is returned.

use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use tracing::{debug, info};

use crate::constants::HELPER_START_DELAY;
use crate::core::{LauncherError, Result};

/// Script dialect used for the helper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelperPlatform {
    /// `cmd.exe` batch file
    Windows,
    /// POSIX `sh` script
    Unix,
}

impl HelperPlatform {
    /// Dialect of the running OS.
    #[must_use]
    pub const fn current() -> Self {
        if cfg!(windows) { Self::Windows } else { Self::Unix }
    }

    /// Helper file name.
    #[must_use]
    pub const fn script_name(self) -> &'static str {
        match self {
            Self::Windows => "update_helper.bat",
            Self::Unix => "update_helper.sh",
        }
    }
}

/// Everything needed to hand the swap over to the helper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelfUpdatePlan {
    /// Path of the running executable
    pub current_executable: PathBuf,
    /// Freshly downloaded executable
    pub new_executable: PathBuf,
    /// Generated helper script
    pub helper_script: PathBuf,
    /// Directory holding the download and the helper; removed by the helper
    pub temp_dir: PathBuf,
    platform: HelperPlatform,
}

/// Builds [`SelfUpdatePlan`]s.
#[derive(Debug, Clone)]
pub struct SelfReplacer {
    delay: Duration,
    platform: HelperPlatform,
    current_executable: Option<PathBuf>,
}

impl Default for SelfReplacer {
    fn default() -> Self {
        Self::new()
    }
}

impl SelfReplacer {
    /// Replacer for the running executable on this platform.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            delay: HELPER_START_DELAY,
            platform: HelperPlatform::current(),
            current_executable: None,
        }
    }

    /// Override how long the helper waits before swapping.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Target a different executable instead of the running one.
    #[must_use]
    pub fn with_current_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.current_executable = Some(path.into());
        self
    }

    /// Write the helper script next to `new_executable`.
    ///
    /// The directory containing `new_executable` is deleted by the helper, so
    /// it must not contain the current executable.
    pub fn prepare(&self, new_executable: &Path) -> Result<SelfUpdatePlan> {
        let current_executable = match &self.current_executable {
            Some(path) => resolve(path)?,
            None => std::env::current_exe().map_err(|e| LauncherError::SelfUpdate {
                reason: format!("cannot locate the running executable: {e}"),
            })?,
        };

        if !new_executable.is_file() {
            return Err(LauncherError::SelfUpdate {
                reason: format!("downloaded executable {} does not exist", new_executable.display()),
            });
        }
        if new_executable.parent().is_none_or(|dir| dir.as_os_str().is_empty()) {
            return Err(LauncherError::SelfUpdate {
                reason: format!("{} has no parent directory", new_executable.display()),
            });
        }

        // Compare resolved paths so relative and symlinked forms cannot
        // slip past the containment check.
        let new_executable = resolve(new_executable)?;
        let current_executable = resolve(&current_executable)?;
        let temp_dir = new_executable
            .parent()
            .ok_or_else(|| LauncherError::SelfUpdate {
                reason: format!("{} has no parent directory", new_executable.display()),
            })?
            .to_path_buf();

        if current_executable.starts_with(&temp_dir) {
            return Err(LauncherError::SelfUpdate {
                reason: format!(
                    "update directory {} contains the running executable",
                    temp_dir.display()
                ),
            });
        }

        let helper_script = temp_dir.join(self.platform.script_name());
        let plan = SelfUpdatePlan {
            current_executable,
            new_executable,
            helper_script,
            temp_dir,
            platform: self.platform,
        };

        let script = render_helper_script(&plan, self.delay);
        std::fs::write(&plan.helper_script, script)
            .map_err(|e| LauncherError::io(&plan.helper_script, e))?;
        crate::utils::fs::make_executable(&plan.helper_script)?;

        debug!("Helper script written to {}", plan.helper_script.display());
        Ok(plan)
    }
}

impl SelfUpdatePlan {
    /// Start the helper as a process that survives our exit.
    pub fn spawn_helper(&self) -> Result<()> {
        let mut command = match self.platform {
            HelperPlatform::Windows => {
                let mut c = Command::new("cmd");
                c.arg("/C").arg(&self.helper_script);
                c
            }
            HelperPlatform::Unix => {
                let mut c = Command::new("sh");
                c.arg(&self.helper_script);
                c
            }
        };
        command.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());
        detach(&mut command);

        command.spawn().map_err(|e| LauncherError::SelfUpdate {
            reason: format!("cannot start update helper {}: {e}", self.helper_script.display()),
        })?;
        Ok(())
    }

    /// Spawn the helper and terminate this process.
    ///
    /// Only returns on failure, in which case nothing was replaced.
    pub fn execute(self) -> Result<Infallible> {
        self.spawn_helper()?;
        info!(
            "Update helper started; exiting so {} can be replaced",
            self.current_executable.display()
        );
        std::process::exit(0)
    }
}

#[cfg(windows)]
fn detach(command: &mut Command) {
    use std::os::windows::process::CommandExt;
    const DETACHED_PROCESS: u32 = 0x0000_0008;
    const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
    command.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
}

#[cfg(unix)]
fn detach(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(any(windows, unix)))]
fn detach(_command: &mut Command) {}

/// Helper script text for `plan`.
#[must_use]
pub fn render_helper_script(plan: &SelfUpdatePlan, delay: Duration) -> String {
    let secs = delay.as_secs().max(1);
    match plan.platform {
        HelperPlatform::Windows => {
            let current = plan.current_executable.display();
            let new = plan.new_executable.display();
            let temp = plan.temp_dir.display();
            format!(
                "@echo off\r\n\
                 timeout /t {secs} /nobreak >nul\r\n\
                 del \"{current}\" /f /q\r\n\
                 move \"{new}\" \"{current}\" >nul\r\n\
                 rmdir /s /q \"{temp}\" >nul\r\n\
                 start \"\" \"{current}\"\r\n\
                 exit\r\n"
            )
        }
        HelperPlatform::Unix => {
            let current = sh_quote(&plan.current_executable);
            let new = sh_quote(&plan.new_executable);
            let temp = sh_quote(&plan.temp_dir);
            format!(
                "#!/bin/sh\n\
                 sleep {secs}\n\
                 rm -f {current}\n\
                 mv {new} {current}\n\
                 rm -rf {temp}\n\
                 chmod +x {current}\n\
                 nohup {current} >/dev/null 2>&1 &\n\
                 exit 0\n"
            )
        }
    }
}

/// Canonical form of `path`, or its absolute form when it does not exist.
fn resolve(path: &Path) -> Result<PathBuf> {
    std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .map_err(|e| LauncherError::io(path, e))
}

fn sh_quote(path: &Path) -> String {
    format!("'{}'", path.display().to_string().replace('\'', r"'\''"))
}
