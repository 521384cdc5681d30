use clap::Parser;
use db_backuper::backup::connection_config::load_connection_configs;
use db_backuper::backup::dump::{DumpPipeline, DEFAULT_COMPRESS_PROGRAM, DEFAULT_DUMP_PROGRAM};
use db_backuper::backup::orchestrator::{collect_errors, run_backups};
use db_backuper::backup::result_error::error::Error;
use db_backuper::backup::result_error::WithMsg;
use std::path::PathBuf;
use std::process::exit;
use tracing::{error, info, warn};

/// Dump every configured database, gzip it and delete old backups
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Location of config file
    #[arg(short, long, default_value = "access.json")]
    config: PathBuf,
    /// Program writing the SQL dump to stdout
    #[arg(long, default_value = DEFAULT_DUMP_PROGRAM)]
    dump_program: String,
    /// Extra argument for the dump program, may be repeated
    #[arg(long = "dump-arg", allow_hyphen_values = true)]
    dump_args: Vec<String>,
    /// Program compressing stdin to stdout
    #[arg(long, default_value = DEFAULT_COMPRESS_PROGRAM)]
    compress_program: String,
}

fn main() {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    info!("Starting database backup process...");

    let res = load_connection_configs(&args.config).and_then(|configs| {
        std::env::current_dir()
            .map_err(Error::from)
            .with_msg("Cannot resolve working directory")
            .map(|out_dir| (configs, out_dir))
    });

    let (configs, out_dir) = match res {
        Ok(v) => v,
        Err(e) => {
            error!("{e}");
            exit(1);
        }
    };

    let pipeline = DumpPipeline::builder()
        .dump_program(args.dump_program)
        .dump_args(args.dump_args)
        .compress_program(args.compress_program)
        .build();

    let outcomes = run_backups(&configs, &pipeline, &out_dir);
    let total = outcomes.len();
    match collect_errors(outcomes) {
        None => info!("Backed up {total} database(s)"),
        Some(e) => warn!(
            "{} of {total} database backup(s) failed",
            e.into_iter().count()
        ),
    }
}
