//! Command dispatch.

mod check;
mod decode;

use clap::CommandFactory;
use clap_complete::generate;

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;

pub fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Check(args) => check::handle(&args, global),
        Command::Decode(args) => decode::handle(&args),
        Command::Completions(args) => {
            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "nctel", &mut std::io::stdout());
            Ok(())
        }
    }
}
