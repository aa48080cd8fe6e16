//! Project files for Factor10.
//!
//! A project bundles the factory script with editor metadata, view settings
//! and the asset list. Only the script and the optional seed reach the
//! engine; everything else is carried through load and save untouched.

pub mod loader;
pub mod schema;

pub use loader::{DataLoadError, Format, load_project, parse_project, save_project};
pub use schema::ProjectFile;
