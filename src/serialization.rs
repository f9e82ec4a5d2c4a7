//! Serialization of fitted pipeline state.
//!
//! Every fitted component is plain data (`Vec`, `ndarray` arrays, maps), so a
//! single blanket implementation over serde types gives each of them a
//! compact bincode representation.

use serde::{Deserialize, Serialize};
use std::error::Error;

/// A trait for parameter representations that can be serialized to and from bytes.
pub trait SerializableParams: Sized {
    /// The error type returned during (de)serialization.
    type Error: Error + Send + Sync + 'static;

    /// Serialize the parameters into a byte buffer.
    fn to_bytes(&self) -> Result<Vec<u8>, Self::Error>;

    /// Deserialize the parameters from a byte buffer.
    fn from_bytes(bytes: &[u8]) -> Result<Self, Self::Error>;
}

impl<T> SerializableParams for T
where
    T: Serialize + for<'de> Deserialize<'de>,
{
    type Error = bincode::Error;

    fn to_bytes(&self) -> Result<Vec<u8>, Self::Error> {
        bincode::serialize(self)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, Self::Error> {
        bincode::deserialize(bytes)
    }
}

/// Magic prefix written at the start of every model artifact.
pub const ARTIFACT_MAGIC: [u8; 4] = *b"RSPR";

/// Version of the artifact layout. Bump whenever a fitted type changes shape.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Header stored in front of the fitted state inside an artifact.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactHeader {
    pub magic: [u8; 4],
    pub format_version: u32,
    /// Version of the crate that wrote the artifact (informational).
    pub crate_version: String,
}

impl ArtifactHeader {
    /// Header for artifacts written by this build.
    pub fn current() -> Self {
        Self {
            magic: ARTIFACT_MAGIC,
            format_version: ARTIFACT_FORMAT_VERSION,
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Check that an artifact written elsewhere can be read by this build.
    pub fn check_compatible(&self) -> crate::Result<()> {
        if self.magic != ARTIFACT_MAGIC {
            return Err(crate::PipelineError::Serialization(
                "not a resale-pricer model artifact".to_string(),
            ));
        }
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(crate::PipelineError::Serialization(format!(
                "artifact format version {} is not supported (expected {}, written by {})",
                self.format_version, ARTIFACT_FORMAT_VERSION, self.crate_version
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Params {
        weights: Vec<f64>,
        bias: f64,
    }

    #[test]
    fn test_blanket_impl_bytes() {
        let params = Params {
            weights: vec![0.5, -1.25],
            bias: 3.0,
        };
        let bytes = params.to_bytes().unwrap();
        assert_eq!(Params::from_bytes(&bytes).unwrap(), params);
    }

    #[test]
    fn test_header_current_is_compatible() {
        assert!(ArtifactHeader::current().check_compatible().is_ok());
    }

    #[test]
    fn test_header_rejects_other_version() {
        let mut header = ArtifactHeader::current();
        header.format_version += 1;
        assert!(matches!(
            header.check_compatible(),
            Err(crate::PipelineError::Serialization(_))
        ));
    }

    #[test]
    fn test_header_rejects_bad_magic() {
        let mut header = ArtifactHeader::current();
        header.magic = *b"NOPE";
        assert!(header.check_compatible().is_err());
    }
}
