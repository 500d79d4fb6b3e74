use crate::error::Result;
use std::path::{Path, PathBuf};

/// One install action. Built from user input, consumed by a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    pub source_url: String,
    pub destination: PathBuf,
    pub add_to_search_path: bool,
    pub create_shortcut: bool,
}

impl InstallRequest {
    pub fn new(source_url: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source_url: source_url.into(),
            destination: destination.into(),
            add_to_search_path: false,
            create_shortcut: false,
        }
    }

    pub fn add_to_search_path(mut self, enabled: bool) -> Self {
        self.add_to_search_path = enabled;
        self
    }

    pub fn create_shortcut(mut self, enabled: bool) -> Self {
        self.create_shortcut = enabled;
        self
    }

    /// Resolves a relative destination against the current directory, since
    /// the search path and launcher need an absolute location.
    pub fn with_absolute_destination(mut self) -> Result<Self> {
        self.destination = absolute(&self.destination)?;
        Ok(self)
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults_off() {
        let request = InstallRequest::new("https://example.com/a.zip", "/opt/tools");
        assert!(!request.add_to_search_path);
        assert!(!request.create_shortcut);

        let request = request.add_to_search_path(true).create_shortcut(true);
        assert!(request.add_to_search_path && request.create_shortcut);
    }

    #[test]
    fn test_relative_destination_made_absolute() {
        let request = InstallRequest::new("https://example.com/a.zip", "tools")
            .with_absolute_destination()
            .unwrap();
        assert!(request.destination.is_absolute());
        assert!(request.destination.ends_with("tools"));
    }
}
