use crate::backup::backup_file::backup_file_glob;
use crate::backup::connection_config::RetentionCount;
use crate::backup::function_path;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::{WithDebugObjectAndFnName, WithMsg};

use function_name::named;
use globset::GlobMatcher;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Backup files of `db_name` directly inside `dir`, sorted by file name,
/// which is oldest first.
#[named]
pub fn list_backup_files<P: AsRef<Path>>(dir: P, db_name: &str) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let matcher = backup_file_glob(db_name)?.compile_matcher();

    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|res| match res {
            Ok(de) => process_dir_entry(de, &matcher).map(Ok),
            Err(e) => Some(Err(Error::from(e))),
        })
        .collect::<Result<Vec<_>>>()
        .with_debug_object_and_fn_name(dir.to_path_buf(), function_path!())
}

fn process_dir_entry(de: DirEntry, matcher: &GlobMatcher) -> Option<PathBuf> {
    if !matcher.is_match(de.file_name()) {
        return None;
    }

    let p = de.into_path();
    if p.is_file() {
        Some(p)
    } else {
        tracing::trace!("Skipping {:?} not a file", p);
        None
    }
}

/// Deletes the oldest backup files of `db_name` until at most
/// `retention_count` are left. Returns the removed paths, oldest first.
///
/// Stops at the first failed delete; files removed before it stay removed.
pub fn prune_backup_files<P: AsRef<Path>>(
    dir: P,
    db_name: &str,
    retention_count: RetentionCount,
) -> Result<Vec<PathBuf>> {
    prune_backup_files_with(dir, db_name, retention_count, |p| std::fs::remove_file(p))
}

/// [`prune_backup_files`] with the file removal supplied by the caller.
#[named]
pub fn prune_backup_files_with<P, F>(
    dir: P,
    db_name: &str,
    retention_count: RetentionCount,
    mut remove_file: F,
) -> Result<Vec<PathBuf>>
where
    P: AsRef<Path>,
    F: FnMut(&Path) -> std::io::Result<()>,
{
    let files = list_backup_files(dir, db_name)?;
    let excess = files.len().saturating_sub(retention_count.keep());
    tracing::debug!(
        "Found {} backup file(s) of {}, keeping {}",
        files.len(),
        db_name,
        retention_count
    );

    let mut removed = Vec::with_capacity(excess);
    for file in files.into_iter().take(excess) {
        tracing::info!("Removing old backup file: {:?}", &file);
        remove_file(file.as_path())
            .map_err(Error::from)
            .with_msg(format!("Remove old backup file {file:?} failed"))
            .with_debug_object_and_fn_name(db_name.to_string(), function_path!())?;
        removed.push(file);
    }

    Ok(removed)
}
