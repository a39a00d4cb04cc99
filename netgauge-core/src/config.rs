use std::str::FromStr;

/// Transport protocol a benchmark profile runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
    Sctp,
}

/// Named benchmark pattern: transport protocol x traffic shape.
///
/// `TCP_CRR` is the connect-per-request variant (new connection per
/// transaction, closed immediately after the response).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Profile {
    TcpStream,
    UdpStream,
    SctpStream,
    TcpRr,
    UdpRr,
    SctpRr,
    TcpCrr,
}

impl Profile {
    /// Parse a wire-format profile name (`TCP_STREAM`, `UDP_RR`, ...).
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        Self::from_str(name).map_err(|_| ConfigError::UnknownProfile(name.to_string()))
    }

    pub fn is_stream(self) -> bool {
        matches!(self, Self::TcpStream | Self::UdpStream | Self::SctpStream)
    }

    pub fn protocol(self) -> Protocol {
        match self {
            Self::TcpStream | Self::TcpRr | Self::TcpCrr => Protocol::Tcp,
            Self::UdpStream | Self::UdpRr => Protocol::Udp,
            Self::SctpStream | Self::SctpRr => Protocol::Sctp,
        }
    }

    /// Unit the profile's throughput is reported in.
    pub fn metric_unit(self) -> &'static str {
        if self.is_stream() { "Mb/s" } else { "OP/s" }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error(
        "unknown profile `{0}` (expected one of TCP_STREAM, UDP_STREAM, SCTP_STREAM, TCP_RR, UDP_RR, SCTP_RR, TCP_CRR)"
    )]
    UnknownProfile(String),

    #[error("duration must be > 0 seconds (got {0})")]
    InvalidDuration(u64),

    #[error("samples must be > 0 (got {0})")]
    InvalidSamples(u32),

    #[error("message size must be > 0 bytes (got {0})")]
    InvalidMessageSize(u32),

    #[error("parallelism must be > 0 (got {0})")]
    InvalidParallelism(u32),

    #[error("invalid rdma device `{0}` (expected device:gid-index, e.g. mlx5_0:3)")]
    InvalidRdmaDevice(String),

    #[error("rdma device (device:gid-index) is required for the ib_write_bw driver")]
    MissingRdmaDevice,

    #[error("at most one of udn, cudn, bridge and external-server may be set")]
    ConflictingNetworkModes,

    #[error("bridge mode with VM workloads requires a static bridge address")]
    MissingBridgeAddress,
}

/// Immutable description of one test case. Created by configuration
/// loading, read-only during execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioConfig {
    pub profile: Profile,
    pub duration_secs: u64,
    pub samples: u32,
    pub message_size: u32,
    pub parallelism: u32,
    /// Back-to-back transactions per burst for request-response profiles;
    /// 0 disables bursting.
    pub burst: u32,
    /// Target the server's cluster-internal service address instead of the
    /// pod address.
    pub service: bool,
}

impl ScenarioConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.duration_secs == 0 {
            return Err(ConfigError::InvalidDuration(self.duration_secs));
        }
        if self.samples == 0 {
            return Err(ConfigError::InvalidSamples(self.samples));
        }
        if self.message_size == 0 {
            return Err(ConfigError::InvalidMessageSize(self.message_size));
        }
        if self.parallelism == 0 {
            return Err(ConfigError::InvalidParallelism(self.parallelism));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> ScenarioConfig {
        ScenarioConfig {
            profile: Profile::TcpStream,
            duration_secs: 10,
            samples: 3,
            message_size: 1024,
            parallelism: 1,
            burst: 0,
            service: false,
        }
    }

    #[test]
    fn profile_parses_wire_names() {
        assert_eq!(Profile::parse("TCP_STREAM"), Ok(Profile::TcpStream));
        assert_eq!(Profile::parse("UDP_RR"), Ok(Profile::UdpRr));
        assert_eq!(Profile::parse("TCP_CRR"), Ok(Profile::TcpCrr));
        assert_eq!(Profile::TcpRr.to_string(), "TCP_RR");
        assert_eq!(Profile::SctpStream.to_string(), "SCTP_STREAM");

        match Profile::parse("TCP_TURBO") {
            Err(ConfigError::UnknownProfile(name)) => assert_eq!(name, "TCP_TURBO"),
            other => panic!("expected unknown-profile error, got {other:?}"),
        }
    }

    #[test]
    fn profile_classification() {
        assert!(Profile::UdpStream.is_stream());
        assert!(!Profile::UdpRr.is_stream());
        assert_eq!(Profile::SctpRr.protocol(), Protocol::Sctp);
        assert_eq!(Profile::TcpCrr.protocol(), Protocol::Tcp);
        assert_eq!(Profile::TcpStream.metric_unit(), "Mb/s");
        assert_eq!(Profile::TcpRr.metric_unit(), "OP/s");
    }

    #[test]
    fn validate_rejects_non_positive_fields() {
        assert_eq!(base().validate(), Ok(()));

        let mut c = base();
        c.duration_secs = 0;
        assert_eq!(c.validate(), Err(ConfigError::InvalidDuration(0)));

        let mut c = base();
        c.samples = 0;
        assert_eq!(c.validate(), Err(ConfigError::InvalidSamples(0)));

        let mut c = base();
        c.message_size = 0;
        assert_eq!(c.validate(), Err(ConfigError::InvalidMessageSize(0)));

        let mut c = base();
        c.parallelism = 0;
        assert_eq!(c.validate(), Err(ConfigError::InvalidParallelism(0)));
    }
}
