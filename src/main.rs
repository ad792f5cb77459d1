use clap::Parser;
use ion_import::cli::{Cli, Commands};
use ion_import::core::logging;
use miette::Result;

fn main() -> Result<()> {
    // Reset SIGPIPE so piping output to `head` terminates quietly
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;
    logging::init(global.verbose, global.quiet);

    match cli.command {
        Commands::Verify(args) => ion_import::cli::commands::verify::run(args, &global),
        Commands::Bom(args) => ion_import::cli::commands::import::bom::run(args, &global),
        Commands::Inventory(args) => ion_import::cli::commands::import::inventory::run(args, &global),
        Commands::Excel(args) => ion_import::cli::commands::import::excel::run(args, &global),
        Commands::Runs(args) => ion_import::cli::commands::import::run::run(args, &global),
        Commands::Fishbowl(args) => ion_import::cli::commands::fishbowl::run(args, &global),
        Commands::Config(cmd) => ion_import::cli::commands::config::run(cmd, &global),
        Commands::Completions(args) => ion_import::cli::commands::completions::run(args),
    }
}
