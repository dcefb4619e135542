use crate::{
    ConfigError, DEFAULT_MAX_PAYLOAD_LEN, IDENTITY_SIZE, MAX_PASSWORD_LEN, MAX_PAYLOAD_LIMIT,
};
use serde::Deserialize;
use std::{fmt, str::FromStr};
use zeroize::Zeroizing;

/// Fixed-width name of a party. Shorter names are zero-padded on the right.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct Identity([u8; IDENTITY_SIZE]);

impl Identity {
    pub fn new(name: &[u8]) -> Result<Self, ConfigError> {
        if name.len() > IDENTITY_SIZE {
            Err(ConfigError::IdentityTooLong(name.len()))?
        }
        let mut bytes = [0u8; IDENTITY_SIZE];
        bytes[..name.len()].copy_from_slice(name);
        Ok(Self(bytes))
    }

    pub fn from_bytes(bytes: [u8; IDENTITY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; IDENTITY_SIZE] {
        &self.0
    }

    /// The identity without its zero padding.
    pub fn trimmed(&self) -> &[u8] {
        let end = self.0.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
        &self.0[..end]
    }
}

impl FromStr for Identity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.as_bytes())
    }
}

impl TryFrom<String> for Identity {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(self.trimmed()) {
            Ok(name) if name.chars().all(|c| !c.is_control()) => f.write_str(name),
            _ => f.write_str(&hex::encode(self.0)),
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self)
    }
}

/// The shared secret both parties know out of band. Wiped on drop.
#[derive(Clone, Deserialize)]
#[serde(try_from = "String")]
pub struct Password(Zeroizing<Vec<u8>>);

impl Password {
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self, ConfigError> {
        let secret = Zeroizing::new(secret.into());
        match secret.len() {
            0 => Err(ConfigError::EmptyPassword),
            n if n > MAX_PASSWORD_LEN => Err(ConfigError::PasswordTooLong(n)),
            _ => Ok(Self(secret)),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<String> for Password {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value.into_bytes())
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(..)")
    }
}

fn default_max_payload_len() -> usize {
    DEFAULT_MAX_PAYLOAD_LEN
}

/// What one endpoint brings to a session: who it is, the shared password, and the
/// largest plaintext it puts in, or accepts from, a single packet.
#[derive(Clone, Debug, Deserialize)]
pub struct SessionConfig {
    pub identity: Identity,
    pub password: Password,
    #[serde(default = "default_max_payload_len")]
    pub max_payload_len: usize,
}

impl SessionConfig {
    pub fn new(identity: &[u8], password: &[u8]) -> Result<Self, ConfigError> {
        Ok(Self {
            identity: Identity::new(identity)?,
            password: Password::new(password)?,
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
        })
    }

    pub fn with_max_payload_len(mut self, max_payload_len: usize) -> Result<Self, ConfigError> {
        self.max_payload_len = max_payload_len;
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_payload_len == 0 || self.max_payload_len > MAX_PAYLOAD_LIMIT {
            Err(ConfigError::PayloadLimit(self.max_payload_len))?
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_padding() {
        let identity = Identity::new(b"server").unwrap();
        assert_eq!(&identity.as_bytes()[..6], b"server");
        assert!(identity.as_bytes()[6..].iter().all(|b| *b == 0));
        assert_eq!(identity.trimmed(), b"server");
        assert_eq!(identity.to_string(), "server");
        assert_eq!(format!("{:?}", identity), "Identity(server)");
        assert_eq!("server".parse::<Identity>().unwrap(), identity);
    }

    #[test]
    fn identity_limits() {
        assert!(Identity::new(&[b'a'; IDENTITY_SIZE]).is_ok());
        assert_eq!(
            Identity::new(&[b'a'; IDENTITY_SIZE + 1]),
            Err(ConfigError::IdentityTooLong(IDENTITY_SIZE + 1))
        );
        assert_eq!(Identity::new(b"").unwrap().to_string(), "");
        let binary = Identity::from_bytes([0x01; IDENTITY_SIZE]);
        assert_eq!(binary.to_string(), "01".repeat(IDENTITY_SIZE));
    }

    #[test]
    fn password_limits() {
        assert!(matches!(Password::new(""), Err(ConfigError::EmptyPassword)));
        assert!(matches!(
            Password::new(vec![0u8; MAX_PASSWORD_LEN + 1]),
            Err(ConfigError::PasswordTooLong(_))
        ));
        let password = Password::new("password").unwrap();
        assert_eq!(password.as_bytes(), b"password");
        assert_eq!(format!("{:?}", password), "Password(..)");
    }

    #[test]
    fn payload_limit() {
        let config = SessionConfig::new(b"client", b"password").unwrap();
        assert_eq!(config.max_payload_len, DEFAULT_MAX_PAYLOAD_LEN);
        assert!(config.clone().with_max_payload_len(16).is_ok());
        assert_eq!(
            config.clone().with_max_payload_len(0).unwrap_err(),
            ConfigError::PayloadLimit(0)
        );
        assert!(config.with_max_payload_len(MAX_PAYLOAD_LIMIT + 1).is_err());
    }

    #[test]
    fn deserialize() {
        let config: SessionConfig =
            serde_json::from_str(r#"{ "identity": "server", "password": "password" }"#).unwrap();
        assert_eq!(config.identity.to_string(), "server");
        assert_eq!(config.password.as_bytes(), b"password");
        assert_eq!(config.max_payload_len, DEFAULT_MAX_PAYLOAD_LEN);
        assert!(config.validate().is_ok());

        let result: Result<SessionConfig, _> = serde_json::from_str(
            r#"{ "identity": "a-name-that-is-far-too-long", "password": "password" }"#,
        );
        assert!(result.is_err());
    }
}
