//! `dump | compress > {db_name}_{date}.sql.gz`
//!
//! The dump utility and the compression utility run as two child processes
//! connected by a pipe. The archive is written to a hidden temporary file in
//! the output directory and only renamed over the final name once both
//! processes exited zero.

use crate::backup::backup_file::backup_file_name;
use crate::backup::connection_config::ConnectionConfig;
use crate::backup::function_path;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::{convert_error_vec, Result};
use crate::backup::result_error::{WithDebugObjectAndFnName, WithMsg};

use bon::Builder;
use chrono::NaiveDate;
use function_name::named;
use getset::Getters;
use itertools::Itertools;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

pub static DEFAULT_DUMP_PROGRAM: &str = "mysqldump";
pub static DEFAULT_COMPRESS_PROGRAM: &str = "gzip";

/// External programs used to produce one backup file.
#[derive(Clone, Debug, Builder, Getters, PartialEq, Eq)]
#[getset(get = "pub")]
pub struct DumpPipeline {
    #[builder(default = DEFAULT_DUMP_PROGRAM.to_string(), into)]
    dump_program: String,
    /// Passed to the dump program before the connection arguments
    #[builder(default, into)]
    dump_args: Vec<String>,
    #[builder(default = DEFAULT_COMPRESS_PROGRAM.to_string(), into)]
    compress_program: String,
}

impl Default for DumpPipeline {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl DumpPipeline {
    pub fn dump_command(&self, config: &ConnectionConfig) -> Command {
        let mut command = Command::new(&self.dump_program);
        command
            .args(&self.dump_args)
            .arg("-P")
            .arg(config.port().to_string())
            .arg("-h")
            .arg(config.host())
            .arg("-u")
            .arg(config.user())
            .arg(format!("--password={}", config.password().inner()))
            .arg(config.db_name());
        command
    }

    /// Command line for logs, password redacted.
    fn describe_dump_command(&self, config: &ConnectionConfig) -> String {
        std::iter::once(self.dump_program.clone())
            .chain(self.dump_args.iter().cloned())
            .chain([
                format!("-P {}", config.port()),
                format!("-h {}", config.host()),
                format!("-u {}", config.user()),
                format!("--password={:?}", config.password()),
                config.db_name().clone(),
            ])
            .join(" ")
    }

    /// Writes `{db_name}_{date}.sql.gz` into `out_dir` and returns its path.
    ///
    /// A same-day file is replaced only when the new dump succeeded.
    #[named]
    pub fn backup_database<P: AsRef<Path>>(
        &self,
        config: &ConnectionConfig,
        out_dir: P,
        date: NaiveDate,
    ) -> Result<PathBuf> {
        let out_dir = out_dir.as_ref();
        let file_name = backup_file_name(config.db_name(), date);
        let file_path = out_dir.join(&file_name);

        self.write_backup(config, out_dir, &file_name, &file_path)
            .with_msg(format!("Backup of {:?} failed", config.db_name()))
            .with_debug_object_and_fn_name(file_path.clone(), function_path!())?;

        tracing::info!(
            "Backup for database: {} completed: {:?}",
            config.db_name(),
            &file_path
        );
        Ok(file_path)
    }

    fn write_backup(
        &self,
        config: &ConnectionConfig,
        out_dir: &Path,
        file_name: &str,
        file_path: &Path,
    ) -> Result<()> {
        // Dropped (and deleted) on every early return below.
        let tmp = tempfile::Builder::new()
            .prefix(&format!(".{file_name}."))
            .suffix(".tmp")
            .tempfile_in(out_dir)
            .map_err(Error::from)
            .with_msg(format!("Create temporary file in {out_dir:?} failed"))?;

        self.run_pipeline(config, tmp.as_file().try_clone()?)?;
        tmp.as_file().sync_all()?;
        tmp.persist(file_path).map_err(|e| Error::from(e.error))?;
        Ok(())
    }

    fn run_pipeline(&self, config: &ConnectionConfig, out: File) -> Result<()> {
        tracing::debug!("Running {}", self.describe_dump_command(config));

        let mut dump = self
            .dump_command(config)
            .stdout(Stdio::piped())
            .spawn()
            .map_err(Error::from)
            .with_msg(format!("Failed to start dump program {:?}", self.dump_program))?;

        let Some(dump_stdout) = dump.stdout.take() else {
            let err = Error::MissingPipe(self.dump_program.clone());
            return Err(kill_and_reap(&mut dump, err));
        };

        // The read end of the pipe moves into the compressor and the temporary
        // Command drops it from this process, so the dump gets SIGPIPE if the
        // compressor exits early.
        let compress = Command::new(&self.compress_program)
            .stdin(Stdio::from(dump_stdout))
            .stdout(Stdio::from(out))
            .spawn();

        let mut compress = match compress {
            Ok(compress) => compress,
            Err(e) => {
                let err = Error::from(e).with_msg(format!(
                    "Failed to start compress program {:?}",
                    self.compress_program
                ));
                return Err(kill_and_reap(&mut dump, err));
            }
        };

        let compress_status = match compress.wait() {
            Ok(status) => status,
            Err(e) => {
                let err = Error::from(e).with_msg(format!(
                    "Failed to wait for compress program {:?}",
                    self.compress_program
                ));
                return Err(kill_and_reap(&mut dump, err));
            }
        };
        let dump_status = dump.wait()?;

        let errors = [
            (&self.dump_program, dump_status),
            (&self.compress_program, compress_status),
        ]
        .into_iter()
        .filter(|(_, status)| !status.success())
        .map(|(program, status)| Error::process_failed(program.as_str(), status))
        .collect_vec();

        convert_error_vec(errors)
    }
}

/// Kills and waits for `child`, so no zombie is left behind on error paths.
fn kill_and_reap(child: &mut Child, err: Error) -> Error {
    if let Err(e) = child.kill() {
        tracing::warn!("Failed to kill child process {}: {}", child.id(), e);
    }
    match child.wait() {
        Ok(_) => err,
        Err(e) => err.chain(e.into()),
    }
}
