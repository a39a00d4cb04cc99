#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,

    /// A host-network vs pod-network regression was flagged, or the
    /// regression computation itself failed.
    RegressionDetected = 10,

    /// Invalid CLI flags, scenario config, or topology manifest.
    InvalidInput = 30,

    /// Internal/runtime error (remote execution failures, retry budget
    /// exhaustion, IO errors).
    RuntimeError = 40,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    #[must_use]
    pub fn from_regression(flagged: bool) -> Self {
        if flagged {
            Self::RegressionDetected
        } else {
            Self::Success
        }
    }
}
