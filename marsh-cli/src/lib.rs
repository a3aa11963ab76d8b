// This file is part of marsh, a modular POSIX shell.
// Copyright (C) 2025 The marsh developers
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Startup of the marsh shell.
//!
//! This crate is the thin front-end over the execution engine: it parses
//! the command line into a [`Config`], prepares an
//! [`Env`](marsh_env::Env) from it and the process environment, feeds the
//! input source to the
//! [read-eval loop](marsh_semantics::runner::read_eval_loop), and turns
//! the final state into the process exit status.

use marsh_env::option::{self, State};
use marsh_env::semantics::{Divert, ExitStatus};
use marsh_env::system::real::RealSystem;
use marsh_env::system::{OfdAccess, SystemEx};
use marsh_env::variable::{Scope, PPID, PWD};
use marsh_env::Env;
use marsh_semantics::trap::run_exit_trap;
use marsh_syntax::syntax::Fd;
use std::ffi::CString;
use std::ops::ControlFlow::{Break, Continue};
use thiserror::Error;

/// Source of the shell program.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Source {
    /// Command string given with `-c`
    CommandString(String),
    /// Script file named by the first operand
    File(String),
    /// The standard input
    Stdin,
}

/// Startup configuration of the shell.
///
/// This record is produced from the command line by [`Config::from_args`].
/// Unset optional fields fall back to the platform's standard discovery
/// when the shell starts.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// Name the shell reports as `$0`
    pub arg0: String,
    /// Where the program text comes from
    pub source: Source,
    /// Initial positional parameters
    pub positional_params: Vec<String>,
    /// Option settings from the command line
    pub options: Vec<(option::Option, State)>,
    /// Whether the shell is interactive; `None` selects automatically
    pub is_interactive: Option<bool>,
    /// Whether the shell is a login shell
    pub is_login_shell: bool,
    /// Initial working directory; `None` keeps the inherited one
    pub working_directory: Option<String>,
    /// Initial file mode creation mask; `None` keeps the inherited one
    pub umask: Option<u32>,
}

/// Error in command line parsing.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("{0}")]
pub struct UsageError(pub String);

impl Config {
    /// Parses the command line.
    pub fn from_args(args: &[String]) -> Result<Config, UsageError> {
        let arg0 = args.first().cloned().unwrap_or_else(|| "marsh".to_string());
        let is_login_shell = arg0.starts_with('-');

        let mut config = Config {
            arg0,
            source: Source::Stdin,
            positional_params: Vec::new(),
            options: Vec::new(),
            is_interactive: None,
            is_login_shell,
            working_directory: None,
            umask: None,
        };

        let mut command_string = false;
        let mut index = 1;
        while index < args.len() {
            let argument = &args[index][..];
            let (enable, flags) = match (argument.strip_prefix('-'), argument.strip_prefix('+')) {
                _ if argument == "--" => {
                    index += 1;
                    break;
                }
                _ if argument == "-" => {
                    index += 1;
                    break;
                }
                (Some(flags), _) if !flags.is_empty() => (true, flags),
                (_, Some(flags)) if !flags.is_empty() => (false, flags),
                _ => break,
            };

            if flags == "o" {
                index += 1;
                let Some(name) = args.get(index) else {
                    return Err(UsageError("option name missing after -o".to_string()));
                };
                match option::parse_long(name) {
                    Some((option, state)) => {
                        let state = if enable { state } else { !state };
                        config.options.push((option, state));
                    }
                    None => return Err(UsageError(format!("no such option: {name}"))),
                }
            } else {
                for c in flags.chars() {
                    match c {
                        'c' if enable => command_string = true,
                        's' if enable => config.source = Source::Stdin,
                        'i' => config.is_interactive = Some(enable),
                        'l' => config.is_login_shell = enable,
                        _ => match option::parse_short(c) {
                            Some((option, state)) => {
                                let state = if enable { state } else { !state };
                                config.options.push((option, state));
                            }
                            None => {
                                return Err(UsageError(format!("no such option: -{c}")))
                            }
                        },
                    }
                }
            }
            index += 1;
        }

        let mut operands = args[index..].iter().cloned();
        if command_string {
            let Some(command) = operands.next() else {
                return Err(UsageError("command string missing after -c".to_string()));
            };
            config.source = Source::CommandString(command);
            if let Some(name) = operands.next() {
                config.arg0 = name;
            }
        } else if config.source == Source::Stdin {
            if let Some(file) = operands.next() {
                config.source = Source::File(file);
            }
        }
        config.positional_params = operands.collect();
        Ok(config)
    }
}

/// Prepares the environment and runs the shell to completion.
pub fn run(config: Config) -> ExitStatus {
    let mut env = Env::with_system(Box::new(RealSystem::new()));
    env.arg0 = config.arg0.clone();

    if let Some(directory) = &config.working_directory {
        if let Ok(c_directory) = CString::new(directory.clone()) {
            let _ = env.system.chdir(&c_directory);
        }
    }
    if let Some(umask) = config.umask {
        env.system.umask(umask);
    }

    // Import the process environment and predefine shell variables
    env.variables.extend_env(std::env::vars());
    env.variables.init();
    let ppid = env.system.getppid();
    let _ = env
        .variables
        .get_or_new(PPID, Scope::Global)
        .assign(ppid.to_string());
    if let Ok(cwd) = env.system.getcwd() {
        let _ = env.variables.get_or_new(PWD, Scope::Global).assign(cwd);
    }
    env.variables.positional_params_mut().values = config.positional_params.clone();

    marsh_builtin::register_builtins(&mut env);

    for &(option, state) in &config.options {
        env.options.set(option, state);
    }
    let interactive = config.is_interactive.unwrap_or_else(|| {
        matches!(config.source, Source::Stdin) && env.system.isatty(Fd::STDIN)
    });
    if interactive {
        env.options.set(option::Interactive, State::On);
    }
    if config.is_login_shell {
        env.options.set(option::Login, State::On);
    }

    // Obtain the program text
    let source = match &config.source {
        Source::CommandString(command) => command.clone(),
        Source::File(path) => {
            let Ok(c_path) = CString::new(path.clone()) else {
                report_startup_error(&mut env, path, "invalid file name");
                return ExitStatus::NOT_FOUND;
            };
            let content = env
                .system
                .open(&c_path, OfdAccess::ReadOnly, Default::default(), Default::default())
                .and_then(|fd| {
                    let content = env.system.read_all(fd);
                    let _ = env.system.close(fd);
                    content
                });
            match content {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(errno) => {
                    report_startup_error(&mut env, path, &errno.to_string());
                    return ExitStatus::NOT_FOUND;
                }
            }
        }
        Source::Stdin => match env.system.read_all(Fd::STDIN) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(errno) => {
                report_startup_error(&mut env, "standard input", &errno.to_string());
                return ExitStatus::FAILURE;
            }
        },
    };

    let result = marsh_semantics::runner::read_eval_loop(&mut env, &source);
    let exit_status = match result {
        Continue(()) => env.exit_status,
        Break(divert) => divert.exit_status().unwrap_or(env.exit_status),
    };
    env.exit_status = exit_status;

    // An explicit exit skips job cleanup but still runs the EXIT trap
    if !matches!(result, Break(Divert::Exit(_))) {
        env.reap_jobs();
    }
    run_exit_trap(&mut env);
    env.exit_status
}

fn report_startup_error(env: &mut Env, subject: &str, message: &str) {
    marsh_env::io::print_error(env, &format!("cannot read `{subject}`: {message}"));
}
