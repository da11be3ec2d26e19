use std::path::PathBuf;

use crate::constants::{DATABASE_ENV_VAR, DEFAULT_DATABASE_FILE};

/// Get database path from the CLI override, the environment, or the default
pub fn get_database_path(cli_override: Option<PathBuf>) -> PathBuf {
    cli_override.unwrap_or_else(|| {
        std::env::var(DATABASE_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATABASE_FILE))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override_wins() {
        let path = get_database_path(Some(PathBuf::from("/tmp/custom.db")));
        assert_eq!(path, PathBuf::from("/tmp/custom.db"));
    }
}
