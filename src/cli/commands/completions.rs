//! Completions command - print a shell completion script

use crate::cli::args::Cli;
use crate::error::ShellcacheResult;
use clap::CommandFactory;
use clap_complete::{generate, Shell};

/// Execute the completions command
pub fn execute(shell: Shell) -> ShellcacheResult<()> {
    let mut command = Cli::command();
    let name = command.get_name().to_string();
    generate(shell, &mut command, name, &mut std::io::stdout());
    Ok(())
}
