//! Invocation of the GNU gettext programs.

use crate::core::{MissingToolError, ToolFailedError};
use std::env;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tolk_toml::ToolsConfig;

/// The gettext programs tolk drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tool {
    /// `msginit`: create a catalog from a template.
    Init,
    /// `msgmerge`: update a catalog from a template.
    Merge,
    /// `msgcat`: concatenate templates.
    Concat,
    /// `msgen`: fill a template with its own source strings.
    En,
}

impl Tool {
    pub fn program_name(self) -> &'static str {
        match self {
            Tool::Init => "msginit",
            Tool::Merge => "msgmerge",
            Tool::Concat => "msgcat",
            Tool::En => "msgen",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program_name())
    }
}

/// A single planned run of a gettext program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub tool: Tool,
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(tool: Tool, program: impl Into<PathBuf>) -> Self {
        Self {
            tool,
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// `--name=<path>`.
    pub fn path_option(self, name: &str, path: &Path) -> Self {
        self.arg(format!("--{name}={}", path.display()))
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.display().to_string())
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{arg}'")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Locates and runs external programs.
pub trait ToolRunner {
    /// Resolve a program name or path to an executable, if it exists.
    fn locate(&self, program: &Path) -> Option<PathBuf>;

    /// Run an invocation to completion, capturing its output.
    fn run(&self, invocation: &Invocation) -> io::Result<Output>;
}

/// Runs programs found on `PATH` with [`std::process::Command`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn locate(&self, program: &Path) -> Option<PathBuf> {
        if program.components().count() > 1 {
            return program.is_file().then(|| program.to_path_buf());
        }

        let path = env::var_os("PATH")?;
        env::split_paths(&path).find_map(|dir| {
            let candidate = dir.join(program);
            if candidate.is_file() {
                return Some(candidate);
            }
            let with_exe = candidate.with_extension(env::consts::EXE_EXTENSION);
            (!env::consts::EXE_EXTENSION.is_empty() && with_exe.is_file()).then_some(with_exe)
        })
    }

    fn run(&self, invocation: &Invocation) -> io::Result<Output> {
        tracing::debug!("Running {invocation}");
        Command::new(&invocation.program)
            .args(&invocation.args)
            .output()
    }
}

/// The programs configured for each [`Tool`].
#[derive(Clone, Debug)]
pub struct Toolchain {
    tools: ToolsConfig,
}

impl Toolchain {
    pub fn new(tools: &ToolsConfig) -> Self {
        Self {
            tools: tools.clone(),
        }
    }

    /// The configured program for `tool`, or its default name.
    pub fn program(&self, tool: Tool) -> PathBuf {
        let configured = match tool {
            Tool::Init => &self.tools.msginit,
            Tool::Merge => &self.tools.msgmerge,
            Tool::Concat => &self.tools.msgcat,
            Tool::En => &self.tools.msgen,
        };
        configured
            .clone()
            .unwrap_or_else(|| PathBuf::from(tool.program_name()))
    }

    pub fn invocation(&self, tool: Tool) -> Invocation {
        Invocation::new(tool, self.program(tool))
    }

    /// Check that every tool in `tools` can be found.
    pub fn require(&self, runner: &dyn ToolRunner, tools: &[Tool]) -> Result<(), MissingToolError> {
        for &tool in tools {
            let program = self.program(tool);
            if runner.locate(&program).is_none() {
                return Err(MissingToolError {
                    tool: tool.program_name().to_string(),
                    program,
                });
            }
        }
        Ok(())
    }
}

/// Run an invocation, turning spawn errors and unsuccessful exits into a
/// [`ToolFailedError`] for `domain` and `locale`.
pub fn run_checked(
    runner: &dyn ToolRunner,
    invocation: &Invocation,
    domain: &str,
    locale: &str,
) -> Result<Output, ToolFailedError> {
    let failed = |reason: String, stderr: Option<String>| ToolFailedError {
        domain: domain.to_string(),
        locale: locale.to_string(),
        command: invocation.to_string(),
        reason,
        stderr,
    };

    let output = runner
        .run(invocation)
        .map_err(|err| failed(format!("failed to start: {err}"), None))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(failed(
            format!("exited with {}", output.status),
            (!stderr.is_empty()).then_some(stderr),
        ));
    }

    Ok(output)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashSet;

    /// A [`ToolRunner`] that records invocations instead of running them.
    #[derive(Default)]
    pub struct RecordingRunner {
        missing: HashSet<PathBuf>,
        failing: HashSet<Tool>,
        concatenating: bool,
        calls: RefCell<Vec<Invocation>>,
    }

    impl RecordingRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn without(mut self, program: &str) -> Self {
            self.missing.insert(PathBuf::from(program));
            self
        }

        pub fn failing(mut self, tool: Tool) -> Self {
            self.failing.insert(tool);
            self
        }

        /// Make `msgcat` calls write their inputs, in order, to the output file.
        pub fn concatenating(mut self) -> Self {
            self.concatenating = true;
            self
        }

        pub fn calls(&self) -> Vec<Invocation> {
            self.calls.borrow().clone()
        }

        /// Recorded calls rendered as command lines.
        pub fn command_lines(&self) -> Vec<String> {
            self.calls.borrow().iter().map(ToString::to_string).collect()
        }
    }

    #[cfg(unix)]
    fn exit_status(code: i32) -> std::process::ExitStatus {
        use std::os::unix::process::ExitStatusExt as _;
        std::process::ExitStatus::from_raw(code << 8)
    }

    #[cfg(windows)]
    fn exit_status(code: i32) -> std::process::ExitStatus {
        use std::os::windows::process::ExitStatusExt as _;
        std::process::ExitStatus::from_raw(code as u32)
    }

    fn concatenate(invocation: &Invocation) -> io::Result<()> {
        let mut output = None;
        let mut contents = String::new();
        for arg in &invocation.args {
            if let Some(path) = arg.strip_prefix("--output-file=") {
                output = Some(PathBuf::from(path));
            } else if !arg.starts_with("--") {
                contents.push_str(&std::fs::read_to_string(arg)?);
            }
        }
        match output {
            Some(path) => std::fs::write(path, contents),
            None => Ok(()),
        }
    }

    impl ToolRunner for RecordingRunner {
        fn locate(&self, program: &Path) -> Option<PathBuf> {
            (!self.missing.contains(program)).then(|| program.to_path_buf())
        }

        fn run(&self, invocation: &Invocation) -> io::Result<Output> {
            self.calls.borrow_mut().push(invocation.clone());
            if self.concatenating && invocation.tool == Tool::Concat {
                concatenate(invocation)?;
            }
            let code = if self.failing.contains(&invocation.tool) {
                1
            } else {
                0
            };
            Ok(Output {
                status: exit_status(code),
                stdout: Vec::new(),
                stderr: if code == 0 {
                    Vec::new()
                } else {
                    b"simulated failure\n".to_vec()
                },
            })
        }
    }
}
