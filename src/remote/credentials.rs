use std::fs;
use std::path::PathBuf;

use tracing::debug;

use super::types::ClaudeCredentialsFile;

#[cfg(target_os = "macos")]
use std::process::Command;

/// Supplies the bearer token for the usage endpoint.
///
/// Called off the async runtime; implementations may block on I/O.
pub trait CredentialProvider: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// Reads the OAuth token Claude Code stores for itself.
///
/// On macOS the Keychain is tried first; everywhere else (and as a fallback)
/// `~/.claude/.credentials.json` is read.
#[derive(Debug, Clone, Default)]
pub struct ClaudeCredentials {
    credentials_path: Option<PathBuf>,
}

impl ClaudeCredentials {
    pub fn new() -> Self {
        match dirs::home_dir() {
            Some(home) => Self::with_file(home.join(".claude").join(".credentials.json")),
            None => Self::default(),
        }
    }

    pub fn with_file(path: PathBuf) -> Self {
        Self {
            credentials_path: Some(path),
        }
    }

    fn file_token(&self) -> Option<String> {
        let path = self.credentials_path.as_ref()?;
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                debug!("no credentials file at {}: {err}", path.display());
                return None;
            }
        };
        parse_credentials_json(&content)
    }

    #[cfg(target_os = "macos")]
    fn keychain_token(&self) -> Option<String> {
        let output = Command::new("security")
            .args(["find-generic-password", "-s", "Claude Code-credentials", "-w"])
            .output()
            .ok()?;
        if !output.status.success() {
            debug!("keychain item not found");
            return None;
        }
        let json = String::from_utf8(output.stdout).ok()?;
        parse_credentials_json(&json)
    }
}

impl CredentialProvider for ClaudeCredentials {
    fn bearer_token(&self) -> Option<String> {
        #[cfg(target_os = "macos")]
        {
            if let Some(token) = self.keychain_token() {
                return Some(token);
            }
        }
        self.file_token()
    }
}

/// Extract `claudeAiOauth.accessToken` from the credentials JSON
fn parse_credentials_json(json: &str) -> Option<String> {
    let creds: ClaudeCredentialsFile = match serde_json::from_str(json.trim()) {
        Ok(creds) => creds,
        Err(err) => {
            debug!("failed to parse credentials JSON: {err}");
            return None;
        }
    };
    creds
        .claude_ai_oauth
        .map(|oauth| oauth.access_token)
        .filter(|token| !token.is_empty())
}
