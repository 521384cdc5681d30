use crate::backup::connection_config::ConnectionConfig;
use crate::backup::dump::DumpPipeline;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithMsg;
use crate::backup::retention::prune_backup_files_with;

use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct BackupSummary {
    pub backup_file: PathBuf,
    pub removed: Vec<PathBuf>,
}

/// What happened to one configured database.
#[derive(Debug)]
pub struct BackupOutcome {
    pub db_name: String,
    pub result: Result<BackupSummary>,
}

impl BackupOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Backs up then prunes every record, one after the other, in configuration
/// order. A failing record is logged and does not stop the following ones.
///
/// The date in the file name is read from the local clock for each record.
pub fn run_backups<P: AsRef<Path>>(
    configs: &[ConnectionConfig],
    pipeline: &DumpPipeline,
    out_dir: P,
) -> Vec<BackupOutcome> {
    run_backups_with(
        configs,
        pipeline,
        out_dir,
        || Local::now().date_naive(),
        |p| std::fs::remove_file(p),
    )
}

/// [`run_backups`] with the clock and the file removal supplied by the caller.
pub fn run_backups_with<P, T, R>(
    configs: &[ConnectionConfig],
    pipeline: &DumpPipeline,
    out_dir: P,
    mut today: T,
    mut remove_file: R,
) -> Vec<BackupOutcome>
where
    P: AsRef<Path>,
    T: FnMut() -> NaiveDate,
    R: FnMut(&Path) -> std::io::Result<()>,
{
    let out_dir = out_dir.as_ref();
    configs
        .iter()
        .map(|config| {
            let result = backup_and_prune(config, pipeline, out_dir, today(), &mut remove_file)
                .with_msg(format!("Error backing up {}", config.db_name()));
            if let Err(e) = &result {
                tracing::error!("{e}");
            }
            BackupOutcome {
                db_name: config.db_name().clone(),
                result,
            }
        })
        .collect()
}

fn backup_and_prune<R: FnMut(&Path) -> std::io::Result<()>>(
    config: &ConnectionConfig,
    pipeline: &DumpPipeline,
    out_dir: &Path,
    date: NaiveDate,
    remove_file: R,
) -> Result<BackupSummary> {
    let backup_file = pipeline.backup_database(config, out_dir, date)?;
    let removed = prune_backup_files_with(
        out_dir,
        config.db_name(),
        *config.retention_count(),
        remove_file,
    )?;
    Ok(BackupSummary {
        backup_file,
        removed,
    })
}

/// Errors of every failed outcome, `None` when all succeeded.
pub fn collect_errors(outcomes: Vec<BackupOutcome>) -> Option<Error> {
    let errors: Vec<Error> = outcomes
        .into_iter()
        .filter_map(|outcome| outcome.result.err())
        .collect();
    if errors.is_empty() {
        None
    } else {
        Some(errors.into())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use itertools::Itertools;
    use tempfile::TempDir;

    fn config(db_name: &str, retention: i64) -> ConnectionConfig {
        ConnectionConfig::builder()
            .port(3306)
            .host("localhost")
            .user("root")
            .password("secret")
            .db_name(db_name)
            .retention_count(retention)
            .build()
    }

    /// Fails for databases whose name contains "broken", echoes otherwise.
    fn pipeline() -> DumpPipeline {
        DumpPipeline::builder()
            .dump_program("sh")
            .dump_args(vec![
                "-c".to_string(),
                r#"case "$*" in *broken*) exit 3;; esac; printf '%s\n' "$*""#.to_string(),
                "mysqldump".to_string(),
            ])
            .compress_program("gzip")
            .build()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
    }

    fn run_on_date(configs: &[ConnectionConfig], dir: &Path) -> Vec<BackupOutcome> {
        run_backups_with(configs, &pipeline(), dir, date, |p| std::fs::remove_file(p))
    }

    fn remaining(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .sorted()
            .collect()
    }

    #[test]
    fn test_empty_configuration_does_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let outcomes = run_on_date(&[], temp_dir.path());

        assert!(outcomes.is_empty());
        assert!(collect_errors(outcomes).is_none());
        assert!(remaining(temp_dir.path()).is_empty());
    }

    #[test]
    fn test_backup_then_prune() {
        let temp_dir = TempDir::new().unwrap();
        for day in ["2024-01-01", "2024-01-02", "2024-01-03", "2024-01-04"] {
            std::fs::write(temp_dir.path().join(format!("shop_{day}.sql.gz")), day).unwrap();
        }

        let outcomes = run_on_date(&[config("shop", 3)], temp_dir.path());

        assert_eq!(outcomes.len(), 1);
        let summary = outcomes[0].result.as_ref().unwrap();
        assert_eq!(summary.backup_file, temp_dir.path().join("shop_2024-01-05.sql.gz"));
        assert_eq!(summary.removed.len(), 2);
        assert_eq!(
            remaining(temp_dir.path()),
            vec![
                "shop_2024-01-03.sql.gz",
                "shop_2024-01-04.sql.gz",
                "shop_2024-01-05.sql.gz"
            ]
        );
    }

    #[test]
    fn test_failure_does_not_stop_following_records() {
        let temp_dir = TempDir::new().unwrap();
        let configs = [config("broken", 3), config("shop", 3), config("blog", 3)];

        let outcomes = run_on_date(&configs, temp_dir.path());

        assert_eq!(
            outcomes.iter().map(|o| o.db_name.as_str()).collect_vec(),
            vec!["broken", "shop", "blog"]
        );
        assert_eq!(
            outcomes.iter().map(BackupOutcome::is_success).collect_vec(),
            vec![false, true, true]
        );
        let msg = outcomes[0].result.as_ref().unwrap_err().to_string();
        assert!(msg.starts_with("Error backing up broken:"));
        assert!(msg.contains("sh exited with"));
        assert_eq!(
            remaining(temp_dir.path()),
            vec!["blog_2024-01-05.sql.gz", "shop_2024-01-05.sql.gz"]
        );
    }

    #[test]
    fn test_failed_backup_skips_pruning() {
        let temp_dir = TempDir::new().unwrap();
        for day in ["2024-01-01", "2024-01-02"] {
            std::fs::write(temp_dir.path().join(format!("broken_{day}.sql.gz")), day).unwrap();
        }

        let outcomes = run_on_date(&[config("broken", 0)], temp_dir.path());

        assert!(!outcomes[0].is_success());
        assert_eq!(remaining(temp_dir.path()).len(), 2);
    }

    #[test]
    fn test_failed_prune_does_not_stop_following_records() {
        let temp_dir = TempDir::new().unwrap();
        for db in ["shop", "blog"] {
            for day in ["2024-01-01", "2024-01-02", "2024-01-03"] {
                std::fs::write(temp_dir.path().join(format!("{db}_{day}.sql.gz")), day).unwrap();
            }
        }
        let configs = [config("shop", 1), config("blog", 1)];

        let outcomes = run_backups_with(&configs, &pipeline(), temp_dir.path(), date, |p| {
            if p.ends_with("shop_2024-01-02.sql.gz") {
                Err(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "permission denied",
                ))
            } else {
                std::fs::remove_file(p)
            }
        });

        assert_eq!(
            outcomes.iter().map(BackupOutcome::is_success).collect_vec(),
            vec![false, true]
        );
        let msg = outcomes[0].result.as_ref().unwrap_err().to_string();
        assert!(msg.starts_with("Error backing up shop:"));
        assert!(msg.contains("shop_2024-01-02.sql.gz"));
        assert_eq!(
            remaining(temp_dir.path()),
            vec![
                "blog_2024-01-05.sql.gz",
                "shop_2024-01-02.sql.gz",
                "shop_2024-01-03.sql.gz",
                "shop_2024-01-05.sql.gz"
            ]
        );
    }

    #[test]
    fn test_date_is_read_for_each_record() {
        let temp_dir = TempDir::new().unwrap();
        let mut day = date();
        let clock = || {
            let today = day;
            day = day.succ_opt().unwrap();
            today
        };

        let outcomes = run_backups_with(
            &[config("shop", 3), config("blog", 3)],
            &pipeline(),
            temp_dir.path(),
            clock,
            |p| std::fs::remove_file(p),
        );

        assert!(outcomes.iter().all(BackupOutcome::is_success));
        assert_eq!(
            remaining(temp_dir.path()),
            vec!["blog_2024-01-06.sql.gz", "shop_2024-01-05.sql.gz"]
        );
    }

    #[test]
    fn test_collect_errors_keeps_only_failures() {
        let temp_dir = TempDir::new().unwrap();
        let configs = [config("broken", 3), config("shop", 3), config("broken_too", 3)];

        let outcomes = run_on_date(&configs, temp_dir.path());

        match collect_errors(outcomes) {
            Some(Error::LotsOfError(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("Expected LotsOfError, got {other:?}"),
        }
    }
}
