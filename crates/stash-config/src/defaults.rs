use crate::socket::SocketPath;

#[cfg(unix)]
use camino::Utf8PathBuf;
#[cfg(unix)]
use dirs::runtime_dir;
#[cfg(unix)]
use libc::geteuid;
#[cfg(unix)]
use std::env;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// File name of the daemon socket.
pub const SOCKET_FILE_NAME: &str = "stashd.sock";

/// Computes the default socket path for the daemon.
///
/// Prefers the per-user runtime directory; falls back to a uid-namespaced
/// directory under the system temp dir so concurrent users never share a
/// socket.
#[cfg(unix)]
pub fn default_socket_path() -> SocketPath {
    let (mut base, apply_namespace) = match runtime_base_directory() {
        Some(dir) => (dir, false),
        None => (fallback_base_directory(), true),
    };

    base.push("stash");
    if apply_namespace {
        base.push(user_namespace());
    }

    SocketPath::new(base.join(SOCKET_FILE_NAME))
}

#[cfg(unix)]
fn runtime_base_directory() -> Option<Utf8PathBuf> {
    runtime_dir().and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
}

#[cfg(unix)]
fn fallback_base_directory() -> Utf8PathBuf {
    let candidate = env::temp_dir();
    Utf8PathBuf::from_path_buf(candidate).unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
}

#[cfg(unix)]
fn user_namespace() -> String {
    let uid = unsafe { geteuid() };
    format!("uid-{uid}")
}

#[cfg(not(unix))]
pub fn default_socket_path() -> SocketPath {
    let mut base = camino::Utf8PathBuf::from_path_buf(std::env::temp_dir())
        .unwrap_or_else(|_| camino::Utf8PathBuf::from("."));
    base.push("stash");
    SocketPath::new(base.join(SOCKET_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_socket_lives_in_stash_directory() {
        let socket = default_socket_path();
        assert!(socket.as_str().contains("stash"));
        assert!(socket.as_str().ends_with(SOCKET_FILE_NAME));
    }
}
