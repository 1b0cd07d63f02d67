use cascade_ssg::config::{self, BuildConfig, Overrides};
use cascade_ssg::paths::SitePaths;
use cascade_ssg::{build, output, serve};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cascade")]
#[command(about = "Static site builder with directory-scoped metadata")]
#[command(long_about = "\
Static site builder with directory-scoped metadata

JSON files declare metadata for their directory and everything below it.
Pages (.html, .md) are Tera templates rendered against that metadata, their
own front matter, and an index of every other page.

Source structure:

  src/
  ├── site.json                    # Metadata for the whole site
  ├── default.template             # Page template for Markdown below here
  ├── index.html                   # Rendered → tgt/index.html
  ├── partials/nav.source          # Only reachable via importhtml(path=...)
  ├── css/site.css                 # Copied verbatim
  └── blog/
      ├── blog.json                # Metadata for blog/ only
      └── 2024-03-01-hello.md      # → tgt/blog/2024/03/hello.html (+ redirects)

Front matter is a JSON object followed by a line containing only ---

Referencing a key a page does not define is an error. Guard optional keys
with {{ title | default(value=\"\") }} and print Markdown in page templates
with {{ content | safe }}.

Run 'cascade gen-config' to generate a documented cascade.toml.")]
#[command(version)]
struct Cli {
    /// Config file (missing file = defaults)
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Source directory [default: src]
    #[arg(long, global = true)]
    source: Option<PathBuf>,

    /// Target directory [default: tgt]
    #[arg(long, global = true)]
    target: Option<PathBuf>,

    /// Template variable holding the Site Index [default: files]
    #[arg(long, global = true)]
    index_key: Option<String>,

    /// Preview server port [default: 8080]
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Log every file as it is gathered and transformed
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all passes and write the target tree
    Build,
    /// Build, then serve the target tree
    Serve,
    /// Gather metadata and list pages without writing anything
    Check,
    /// Print a stock cascade.toml with all options documented
    GenConfig,
}

fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load(cli: &Cli) -> Result<BuildConfig, config::ConfigError> {
    config::load_config(&cli.config)?.with_overrides(Overrides {
        source: cli.source.clone(),
        target: cli.target.clone(),
        index_key: cli.index_key.clone(),
        port: cli.port,
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match cli.command {
        Command::Build => {
            let config = load(&cli)?;
            let report = build::build(&config)?;
            let paths = SitePaths::new(&config.source, &config.target)?;
            output::print_build_report(&report, &paths);
        }
        Command::Serve => {
            let config = load(&cli)?;
            let report = build::build(&config)?;
            let paths = SitePaths::new(&config.source, &config.target)?;
            output::print_build_report(&report, &paths);
            serve::serve(&paths.target, &config.serve)?;
        }
        Command::Check => {
            let config = load(&cli)?;
            println!("==> Checking {}", config.source.display());
            let site = build::check(&config)?;
            output::print_site_index(&site);
            println!("==> Metadata is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
