use anyhow::bail;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum SecurityProtocol {
    #[default]
    Plaintext,
    Ssl,
}

impl Display for SecurityProtocol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SecurityProtocol::Plaintext => write!(f, "plaintext"),
            SecurityProtocol::Ssl => write!(f, "ssl"),
        }
    }
}

impl FromStr for SecurityProtocol {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "plaintext" => Ok(SecurityProtocol::Plaintext),
            "ssl" => Ok(SecurityProtocol::Ssl),
            other => bail!("Unsupported security protocol '{}'", other),
        }
    }
}
