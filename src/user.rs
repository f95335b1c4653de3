//! User identity derivation. No authentication — the user id is a
//! deterministic function of the local OS username.

/// Fallback when the OS username cannot be determined.
const DEFAULT_USERNAME: &str = "user";

/// The local system's username, from the environment.
pub fn system_username() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_USERNAME.to_string())
}

/// Build the stable user id for a username.
pub fn generate_user_id(username: &str) -> String {
    let name = username.trim();
    if name.is_empty() {
        format!("user_{DEFAULT_USERNAME}")
    } else {
        format!("user_{name}")
    }
}
