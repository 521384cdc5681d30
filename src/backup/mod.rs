pub mod backup_file;
pub mod connection_config;
pub mod dump;
pub mod orchestrator;
pub mod redacted;
pub mod result_error;
pub mod retention;
pub mod validate;

macro_rules! function_path {
    () => {
        concat!(module_path!(), "::", function_name!(), " ", file!(), ":", line!())
    };
}

pub(crate) use function_path;
