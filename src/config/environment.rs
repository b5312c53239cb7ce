//! Runtime environment selection.
//!
//! The first command-line argument picks which dotenv file is loaded:
//! `prod` loads `.env.prod`, anything else (or nothing) loads `.env.local`.

use std::fmt;
use tracing::{info, warn};

/// Deployment environment the bot runs in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Environment {
    /// Local development
    #[default]
    Dev,
    /// Production deployment
    Prod,
}

impl Environment {
    /// Picks the environment from the process arguments (program name first).
    #[must_use]
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        match args.into_iter().nth(1) {
            Some(arg) if arg.as_ref() == "prod" => Self::Prod,
            _ => Self::Dev,
        }
    }

    /// Dotenv file holding this environment's variables.
    #[must_use]
    pub const fn env_file(self) -> &'static str {
        match self {
            Self::Dev => ".env.local",
            Self::Prod => ".env.prod",
        }
    }

    /// Loads the environment's dotenv file into the process environment.
    ///
    /// A missing file is not fatal, the variables can be set externally.
    pub fn load_env_file(self) {
        match dotenvy::from_filename(self.env_file()) {
            Ok(path) => info!("Loaded {} environment from {}", self, path.display()),
            Err(e) => warn!("Could not load {}: {}", self.env_file(), e),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dev => f.write_str("dev"),
            Self::Prod => f.write_str("prod"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prod_argument_selects_prod() {
        assert_eq!(Environment::from_args(["cogbot", "prod"]), Environment::Prod);
        assert_eq!(Environment::Prod.env_file(), ".env.prod");
    }

    #[test]
    fn test_anything_else_selects_dev() {
        assert_eq!(Environment::from_args(["cogbot"]), Environment::Dev);
        assert_eq!(Environment::from_args(["cogbot", "staging"]), Environment::Dev);
        assert_eq!(Environment::from_args(Vec::<String>::new()), Environment::Dev);
        assert_eq!(Environment::Dev.env_file(), ".env.local");
    }
}
