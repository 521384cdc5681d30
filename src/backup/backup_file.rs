//! Naming convention of backup files: `{db_name}_{YYYY-MM-DD}.sql.gz`.
//!
//! The date part is fixed width and zero padded, so for one `db_name` the
//! lexical order of file names is the calendar order.

use chrono::NaiveDate;
use globset::{Glob, GlobBuilder};

use crate::backup::result_error::result::Result;

pub static BACKUP_FILE_EXT: &str = "sql.gz";
static DATE_FORMAT: &str = "%Y-%m-%d";

pub fn backup_file_name(db_name: &str, date: NaiveDate) -> String {
    format!("{}_{}.{}", db_name, date.format(DATE_FORMAT), BACKUP_FILE_EXT)
}

/// Glob matching every backup file of `db_name`, relative to the backup directory.
pub fn backup_file_glob(db_name: &str) -> Result<Glob> {
    let pattern = format!("{}_*.{}", globset::escape(db_name), BACKUP_FILE_EXT);
    Ok(GlobBuilder::new(&pattern).literal_separator(true).build()?)
}
