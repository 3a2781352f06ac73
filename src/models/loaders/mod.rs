pub mod toml_loader;

pub use toml_loader::{load_all_attempt_files, load_attempt_file, AttemptFile};
