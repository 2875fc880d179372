//! Host editor detection, used to label log output.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Editor family hosting the index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostEnvironment {
    #[default]
    VsCode,
    Cursor,
    Windsurf,
}

impl HostEnvironment {
    /// Classify a host application name such as "Visual Studio Code".
    pub fn detect(app_name: &str) -> Self {
        let app_name = app_name.to_lowercase();
        if app_name.contains("windsurf") {
            Self::Windsurf
        } else if app_name.contains("cursor") {
            Self::Cursor
        } else {
            Self::VsCode
        }
    }
}

impl fmt::Display for HostEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::VsCode => "vscode",
            Self::Cursor => "cursor",
            Self::Windsurf => "windsurf",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect() {
        assert_eq!(HostEnvironment::detect("Windsurf Next"), HostEnvironment::Windsurf);
        assert_eq!(HostEnvironment::detect("Cursor"), HostEnvironment::Cursor);
        assert_eq!(HostEnvironment::detect("Visual Studio Code"), HostEnvironment::VsCode);
        assert_eq!(HostEnvironment::detect(""), HostEnvironment::VsCode);
    }
}
