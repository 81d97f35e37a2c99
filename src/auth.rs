//! Admin login gate.
//!
//! The password is compared in plaintext and the session is a single flag on
//! disk.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum AuthError {
  #[error("Incorrect password")]
  WrongPassword,

  #[error("failed to write session file {path}: {source}")]
  Session {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Session {
  is_authenticated: bool,
}

#[derive(Debug, Clone)]
pub struct AuthGate {
  password: Option<String>,
  session_path: PathBuf,
}

impl AuthGate {
  pub fn new(password: Option<String>, session_path: PathBuf) -> Self {
    Self {
      password,
      session_path,
    }
  }

  /// Gate using the user data directory for the session file.
  pub fn from_env(password: Option<String>) -> Self {
    let session_path = dirs::data_dir()
      .unwrap_or_else(|| PathBuf::from("."))
      .join("i9s")
      .join("session.json");
    Self::new(password, session_path)
  }

  /// True when a password is configured and so login is required.
  pub fn is_enabled(&self) -> bool {
    self.password.is_some()
  }

  pub fn is_authenticated(&self) -> bool {
    if !self.is_enabled() {
      return true;
    }
    read_session(&self.session_path)
      .map(|s| s.is_authenticated)
      .unwrap_or(false)
  }

  pub fn login(&self, attempt: &str) -> Result<(), AuthError> {
    match &self.password {
      None => Ok(()),
      Some(password) if password == attempt => {
        write_session(&self.session_path, true)?;
        info!("admin logged in");
        Ok(())
      }
      Some(_) => {
        warn!("rejected login attempt");
        Err(AuthError::WrongPassword)
      }
    }
  }

  pub fn logout(&self) -> Result<(), AuthError> {
    write_session(&self.session_path, false)?;
    info!("admin logged out");
    Ok(())
  }
}

fn read_session(path: &Path) -> Option<Session> {
  let contents = std::fs::read_to_string(path).ok()?;
  serde_json::from_str(&contents).ok()
}

fn write_session(path: &Path, is_authenticated: bool) -> Result<(), AuthError> {
  let to_err = |source: std::io::Error| AuthError::Session {
    path: path.to_path_buf(),
    source,
  };

  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).map_err(to_err)?;
  }
  let body = serde_json::to_string(&Session { is_authenticated })
    .map_err(|e| to_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
  std::fs::write(path, body).map_err(to_err)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn gate(dir: &tempfile::TempDir, password: Option<&str>) -> AuthGate {
    AuthGate::new(
      password.map(String::from),
      dir.path().join("i9s").join("session.json"),
    )
  }

  #[test]
  fn test_open_gate_without_password() {
    let dir = tempfile::tempdir().unwrap();
    let gate = gate(&dir, None);
    assert!(!gate.is_enabled());
    assert!(gate.is_authenticated());
    assert!(gate.login("anything").is_ok());
  }

  #[test]
  fn test_login_persists_flag() {
    let dir = tempfile::tempdir().unwrap();
    let gate_a = gate(&dir, Some("s3cret"));
    assert!(!gate_a.is_authenticated());

    assert!(matches!(gate_a.login("nope"), Err(AuthError::WrongPassword)));
    assert!(!gate_a.is_authenticated());

    gate_a.login("s3cret").unwrap();
    // A fresh gate sees the stored session
    let gate_b = gate(&dir, Some("s3cret"));
    assert!(gate_b.is_authenticated());

    let stored = std::fs::read_to_string(dir.path().join("i9s").join("session.json")).unwrap();
    assert_eq!(stored, r#"{"isAuthenticated":true}"#);
  }

  #[test]
  fn test_logout_clears_flag() {
    let dir = tempfile::tempdir().unwrap();
    let gate = gate(&dir, Some("s3cret"));
    gate.login("s3cret").unwrap();
    gate.logout().unwrap();
    assert!(!gate.is_authenticated());
  }

  #[test]
  fn test_corrupt_session_is_logged_out() {
    let dir = tempfile::tempdir().unwrap();
    let gate = gate(&dir, Some("s3cret"));
    std::fs::create_dir_all(dir.path().join("i9s")).unwrap();
    std::fs::write(dir.path().join("i9s").join("session.json"), "{not json").unwrap();
    assert!(!gate.is_authenticated());
  }
}
