use clap::{Parser, Subcommand};
use miette::Result as MietteResult;
use tolk_cli::commands::{ExtractArgs, MergeArgs, run_extract, run_merge};
use tolk_cli::utils::ui;

#[derive(Parser)]
#[command(name = "tolk")]
#[command(about = "Extract gettext templates and merge them into locale catalogs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log each file and command as it is processed.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Deterministic output for end-to-end tests.
    #[arg(long, global = true, hide = true)]
    e2e: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract translatable strings into .pot templates
    Extract(ExtractArgs),

    /// Merge .pot templates into every locale's .po catalogs
    Merge(MergeArgs),
}

fn main() -> MietteResult<()> {
    let cli = Cli::parse();

    ui::set_e2e_mode(cli.e2e);
    let color = !cli.e2e;

    miette::set_hook(Box::new(move |_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(color)
                .unicode(color)
                .context_lines(2)
                .tab_width(4)
                .color(color)
                .build(),
        )
    }))
    .ok();

    ui::init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Extract(args) => run_extract(args),
        Commands::Merge(args) => run_merge(args),
    };

    result.map_err(miette::Report::new)
}
