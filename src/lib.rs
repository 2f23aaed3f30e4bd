// Library exports for the binary and integration tests
pub mod card;
pub mod cli;
pub mod config_file;
pub mod contacts;
pub mod interactive;
pub mod json_output;
pub mod report;
pub mod utils;

// Re-export commonly used types
pub use card::{CardEngine, CardOutcome, CardResult, RenderConfig, SkipReason};
pub use contacts::{output_filename, read_contacts, ContactRecord, ContactRow};
pub use json_output::JsonMessage;
