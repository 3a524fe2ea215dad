pub mod toml_loader;

pub use toml_loader::{load_case_library, load_case_script};
