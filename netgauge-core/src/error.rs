use crate::config::ConfigError;
use crate::exec::ExecError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error("address extraction failed for pod {pod}: {reason}")]
    AddressExtraction { pod: String, reason: String },

    #[error("no service address registered for driver {driver}")]
    MissingService { driver: String },

    #[error("no pods provisioned for role {role}")]
    EmptyPodSet { role: &'static str },

    #[error("profile {profile} is not runnable with the {driver} driver")]
    UnsupportedProfile {
        driver: &'static str,
        profile: String,
    },

    #[error("failed to parse {driver} output: {reason}")]
    Parse {
        driver: &'static str,
        reason: String,
    },

    #[error("{driver} produced no valid sample after {attempts} attempts: {last}")]
    RetriesExhausted {
        driver: String,
        attempts: u32,
        last: String,
    },

    #[error("regression check failed: {0}")]
    Regression(String),
}

impl Error {
    pub(crate) fn parse(driver: &'static str, reason: impl Into<String>) -> Self {
        Self::Parse {
            driver,
            reason: reason.into(),
        }
    }

    /// Configuration-class errors are detected before any remote
    /// execution and map to the invalid-input exit path.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
