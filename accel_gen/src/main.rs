use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod cmds;

#[derive(Parser)]
#[command(name = "accel-gen")]
#[command(about = "Fast accessor compiler for mapped record types", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /* Compile accessor programs and write them as artifacts */
    Compile {
        /* Schema YAML files with class declarations and record mappings */
        #[arg(short = 'f', long = "files", value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /* Record classes to compile (default: every mapped record) */
        #[arg(short = 'r', long = "record", value_name = "CLASS")]
        records: Vec<String>,

        /* Output directory for artifacts */
        #[arg(
            short = 'o',
            long = "output",
            value_name = "DIR",
            default_value = "generated"
        )]
        output_dir: PathBuf,

        /* Also write a pseudo-code listing next to each artifact */
        #[arg(long = "listing")]
        listing: bool,

        /* Enable verbose output */
        #[arg(short = 'v', long = "verbose")]
        verbose: bool,
    },

    /* Resolve and plan record mappings without writing anything */
    Analyze {
        /* Schema YAML files with class declarations and record mappings */
        #[arg(short = 'f', long = "files", value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /* Record classes to analyze (default: every mapped record) */
        #[arg(short = 'r', long = "record", value_name = "CLASS")]
        records: Vec<String>,

        /* Print the resolved field chains */
        #[arg(long = "print-chains")]
        print_chains: bool,

        /* Print the compiled program listing */
        #[arg(long = "print-program")]
        print_program: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compile {
            files,
            records,
            output_dir,
            listing,
            verbose,
        } => {
            cmds::compile::run(files, records, output_dir, listing, verbose)?;
        }

        Commands::Analyze {
            files,
            records,
            print_chains,
            print_program,
        } => {
            cmds::analyze::run(files, records, print_chains, print_program)?;
        }
    }

    Ok(())
}
