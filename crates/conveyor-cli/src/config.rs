//! Configuration loading for the CLI.
//!
//! Configuration flags precede the subcommand. They are split off and handed
//! to `ortho_config`; everything from the first other token onwards is parsed
//! as the command line proper.

use std::ffi::{OsStr, OsString};

use conveyor_config::Config;
use ortho_config::OrthoConfig;

use crate::errors::AppError;

/// Flags consumed by the configuration loader.
///
/// Each entry corresponds to a field of [`Config`].
const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--backend-host",
    "--backend-port",
    "--log-filter",
    "--log-format",
    "--idle-wakeup-ms",
    "--connect-timeout-ms",
    "--response-dump-path",
];

/// Source of the resolved configuration.
pub(crate) trait ConfigLoader {
    /// Loads configuration from the configuration-flag portion of the
    /// arguments, including the program name.
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

/// Loader backed by `ortho_config` layering.
pub(crate) struct OrthoConfigLoader;

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        Config::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}

/// Loader returning a fixed configuration.
#[cfg(test)]
pub(crate) struct StaticConfigLoader(pub(crate) Config);

#[cfg(test)]
impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.0.clone())
    }
}

/// Arguments partitioned into configuration flags and the command line.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ConfigArgumentSplit {
    pub(crate) config_arguments: Vec<OsString>,
    pub(crate) command_arguments: Vec<OsString>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagAction {
    Include { needs_value: bool },
    Stop,
}

fn classify(argument: &OsStr) -> FlagAction {
    let text = argument.to_string_lossy();
    let (flag, has_inline_value) = text
        .split_once('=')
        .map_or((text.as_ref(), false), |(flag, _)| (flag, true));
    if CONFIG_CLI_FLAGS.contains(&flag) {
        FlagAction::Include {
            needs_value: !has_inline_value,
        }
    } else {
        FlagAction::Stop
    }
}

/// Splits leading configuration flags from the command line. Both halves keep
/// the program name so each can be parsed on its own.
pub(crate) fn split_config_arguments(args: &[OsString]) -> ConfigArgumentSplit {
    let mut remaining = args.iter();
    let program: Vec<OsString> = remaining.next().cloned().into_iter().collect();
    let mut config_arguments = program.clone();

    let mut rest = remaining.as_slice();
    while let Some((argument, tail)) = rest.split_first() {
        match classify(argument) {
            FlagAction::Include { needs_value } => {
                config_arguments.push(argument.clone());
                rest = tail;
                if needs_value && let Some((value, after)) = rest.split_first() {
                    config_arguments.push(value.clone());
                    rest = after;
                }
            }
            FlagAction::Stop => break,
        }
    }

    let mut command_arguments = program;
    command_arguments.extend(rest.iter().cloned());
    ConfigArgumentSplit {
        config_arguments,
        command_arguments,
    }
}
