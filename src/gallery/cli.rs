use super::CONFIG_PATH;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct CliOptions {
    pub(super) config_path: PathBuf,
    pub(super) initial_route: Option<String>,
    pub(super) write_default_config: bool,
}

impl Default for CliOptions {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(CONFIG_PATH),
            initial_route: None,
            write_default_config: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum CliCommand {
    Run(CliOptions),
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub(super) enum CliError {
    #[error("{0} expects a value")]
    MissingValue(String),
    #[error("unknown option: {0}")]
    UnknownOption(String),
}

pub(super) fn parse_args<I>(args: I) -> Result<CliCommand, CliError>
where
    I: IntoIterator<Item = String>,
{
    let mut options = CliOptions::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let Some(value) = args.next() else {
                    return Err(CliError::MissingValue(arg));
                };
                options.config_path = PathBuf::from(value);
            }
            "--route" | "-r" => {
                let Some(value) = args.next() else {
                    return Err(CliError::MissingValue(arg));
                };
                options.initial_route = Some(value);
            }
            "--write-default-config" => {
                options.write_default_config = true;
            }
            "--help" | "-h" => return Ok(CliCommand::Help),
            _ => return Err(CliError::UnknownOption(arg)),
        }
    }

    Ok(CliCommand::Run(options))
}

pub(super) fn parse_cli_options() -> CliOptions {
    match parse_args(env::args().skip(1)) {
        Ok(CliCommand::Run(options)) => options,
        Ok(CliCommand::Help) => print_cli_help_and_exit(0),
        Err(err) => {
            eprintln!("{err}");
            print_cli_help_and_exit(2);
        }
    }
}

pub(super) fn print_cli_help_and_exit(code: i32) -> ! {
    println!(
        "Usage:\n  portal-gallery [options]\n\nOptions:\n  -c, --config <path>        Gallery config (default {CONFIG_PATH})\n  -r, --route <path>         Start at a route, e.g. /item/02\n      --write-default-config Write the built-in config to --config and exit\n  -h, --help                 Show this help"
    );
    std::process::exit(code);
}
