use clap::Parser;

pub const RCACHE_BEFORE_HELP: &str = concat!(
    "rcache ",
    env!("CARGO_PKG_VERSION"),
    " – transparent compiler cache\n\n",
    "Run as a prefix (`rcache gcc -c foo.c -o foo.o`) or symlink a\n",
    "compiler name to the rcache binary and compile as usual. Maintenance\n",
    "options below apply when rcache is invoked under its own name.",
);

/// Maintenance options, parsed only when the binary is invoked under its
/// own name with a leading `-` argument. Everything else is a compilation.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    before_help = RCACHE_BEFORE_HELP,
    disable_help_subcommand = true
)]
pub struct MaintenanceCli {
    /// Print statistics counters
    #[arg(short = 's', long)]
    pub show_stats: bool,

    /// Zero the statistics counters
    #[arg(short = 'z', long)]
    pub zero_stats: bool,

    /// Clear the whole cache
    #[arg(short = 'C', long)]
    pub clear: bool,

    /// Emit machine-readable JSON instead of human output
    #[arg(long)]
    pub json: bool,
}
