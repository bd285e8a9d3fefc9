use clap::{Parser, Subcommand};
use cybind_driver::Driver;
use miette::Result;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cybind")]
#[command(author, version, about = "Generate Cython/ctypes bindings from C/C++ headers")]
struct Cli {
    /// Log per-entity decisions
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse the configured headers and write the .pxd/.pyx/.pyi files
    Generate {
        /// Configuration file
        #[arg(short, long, default_value = "cybind.toml")]
        config: PathBuf,

        /// Output directory (overrides output.dir)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Parse headers and report what would be bound
    Check {
        /// Headers to check
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Include directories
        #[arg(short = 'I', long = "include")]
        includes: Vec<PathBuf>,
    },

    /// Print the AST snapshot or declaration model of a header
    Dump {
        /// Header to dump
        file: PathBuf,

        /// What to dump
        #[arg(long, default_value = "model")]
        format: DumpFormat,

        /// Include directories
        #[arg(short = 'I', long = "include")]
        includes: Vec<PathBuf>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum DumpFormat {
    /// Cursor tree as parsed by libclang
    Ast,
    /// Collected structs, functions and enums
    Model,
}

fn include_args(includes: &[PathBuf]) -> Vec<String> {
    includes
        .iter()
        .map(|dir| format!("-I{}", dir.display()))
        .collect()
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))?;

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("cybind=debug")
    } else {
        EnvFilter::new("cybind=info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        Commands::Generate { config, out } => {
            let driver = Driver::new();
            let mut config = driver.load_config(&config)?;
            if let Some(out) = out {
                let cwd = std::env::current_dir()
                    .map_err(|e| miette::miette!("Failed to read current directory: {}", e))?;
                config.output.dir = cwd.join(out);
            }

            for path in driver.generate(&config)? {
                println!("Wrote {}", path.display());
            }
        }

        Commands::Check { files, includes } => {
            let driver = Driver::new().with_args(include_args(&includes));

            for summary in driver.check(&files)? {
                println!(
                    "{}: {} structs, {} forward declarations, {} functions, {} enums",
                    summary.path.display(),
                    summary.structs,
                    summary.forward_declarations,
                    summary.functions,
                    summary.enums
                );
            }
        }

        Commands::Dump {
            file,
            format,
            includes,
        } => {
            let driver = Driver::new().with_args(include_args(&includes));

            match format {
                DumpFormat::Ast => print!("{}", driver.dump_ast(&file)?),
                DumpFormat::Model => print!("{}", driver.dump_model(&file)?),
            }
        }
    }

    Ok(())
}
