pub mod archive;
pub mod config;
pub mod download;
pub mod installer;
pub mod launcher;
pub mod progress;
pub mod request;
pub mod search_path;
pub mod state;
