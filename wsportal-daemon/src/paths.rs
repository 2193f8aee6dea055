use std::path::{Path, PathBuf};

pub const DAEMON_SOCKET: &str = "wsportal.sock";

pub fn portal_root(home: &Path) -> PathBuf {
    home.join(".wsportal")
}

pub fn run_dir(home: &Path) -> PathBuf {
    portal_root(home).join("run")
}

pub fn socket_path(home: &Path) -> PathBuf {
    run_dir(home).join(DAEMON_SOCKET)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_lives_under_the_run_dir() {
        let home = Path::new("/home/portal");
        assert_eq!(
            socket_path(home),
            PathBuf::from("/home/portal/.wsportal/run/wsportal.sock")
        );
    }
}
