//! Credential storage.
//!
//! Reads/writes ~/.config/leadsync/auth.json (0600 on Unix). `leadsync
//! login` saves credentials here; every later command picks them up
//! automatically.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// API credentials stored locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// Platform REST base URL (e.g., "https://123-ABC-456.mktorest.example")
    pub api_base: String,
    /// OAuth client id for the client-credentials grant
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
}

impl Credentials {
    pub fn new(api_base: String, client_id: String, client_secret: String) -> Self {
        Self {
            api_base,
            client_id,
            client_secret,
        }
    }
}

/// Returns the path to the credentials file.
pub fn auth_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|c| c.join("leadsync/auth.json"))
}

/// Load saved credentials from disk.
/// Returns None if no credentials are saved or if the file is invalid.
pub fn load_auth() -> Option<Credentials> {
    let path = auth_file_path()?;
    let contents = std::fs::read_to_string(&path).ok()?;
    serde_json::from_str(&contents).ok()
}

/// Save credentials to disk.
/// Creates the parent directory if it doesn't exist.
/// Sets 0600 permissions on Unix.
pub fn save_auth(creds: &Credentials) -> Result<(), String> {
    let path = auth_file_path().ok_or("Could not determine config directory")?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }

    let contents = serde_json::to_string_pretty(creds)
        .map_err(|e| format!("Failed to serialize credentials: {}", e))?;

    std::fs::write(&path, &contents).map_err(|e| format!("Failed to write auth file: {}", e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, permissions)
            .map_err(|e| format!("Failed to set file permissions: {}", e))?;
    }

    Ok(())
}

/// Delete saved credentials.
pub fn delete_auth() -> Result<(), String> {
    let Some(path) = auth_file_path() else {
        return Ok(());
    };
    if path.exists() {
        std::fs::remove_file(&path).map_err(|e| format!("Failed to delete auth file: {}", e))?;
    }
    Ok(())
}
