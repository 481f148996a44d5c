use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "prerender")]
#[command(
    version,
    about = "Prerender - Serve JavaScript-rendered HTML from a remote Chrome session",
    long_about = "Prerender\n\nRenders GET /?url=<target> in a Chrome instance started with --remote-debugging-port, one page at a time, and caches the rendered HTML for a fixed TTL.\n\nCLI flags override values from --config."
)]
pub struct Cli {
    #[arg(
        long,
        value_name = "HOST:PORT",
        help = "Chrome DevTools endpoint [default: localhost:9222]"
    )]
    pub chrome: Option<String>,

    #[arg(
        long,
        value_name = "HOST:PORT",
        help = "Listen interface [default: localhost:9444]"
    )]
    pub listen: Option<String>,

    #[arg(
        long,
        value_name = "PATH",
        help = "Optional config file (TOML) for addresses, cache TTL and render timeouts"
    )]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Enable verbose (debug) logging")]
    pub verbose: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}
