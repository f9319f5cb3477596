use std::fmt::Display;
use std::path::PathBuf;
use std::str;

use anyhow::{Context, Result, bail};
use base64ct::{Base64, Base64Unpadded, Base64Url, Base64UrlUnpadded, Encoding};

/// Where the triples of a source come from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Location {
    Local(PathBuf),
    Remote(String),
}

impl Location {
    /// Decode the base64 path parameter of an API request. Both the standard
    /// and the URL-safe alphabet are accepted, with or without padding.
    pub(crate) fn decode(raw: &str) -> Result<Location> {
        let raw = raw.trim();
        let bytes = Base64::decode_vec(raw)
            .or_else(|_| Base64Unpadded::decode_vec(raw))
            .or_else(|_| Base64Url::decode_vec(raw))
            .or_else(|_| Base64UrlUnpadded::decode_vec(raw))
            .map_err(|error| anyhow::anyhow!("{error}"))
            .with_context(|| format!("`{raw}` is not base64 encoded"))?;
        let text = str::from_utf8(&bytes).context("decoded location is not UTF-8")?;
        Location::parse(text)
    }

    /// Classify a plain location string.
    pub(crate) fn parse(text: &str) -> Result<Location> {
        let text = text.trim();
        if text.is_empty() {
            bail!("empty location");
        }
        if text.starts_with("http://") || text.starts_with("https://") {
            return Ok(Location::Remote(text.to_string()));
        }
        if let Some(path) = text.strip_prefix("file://") {
            return Ok(Location::Local(PathBuf::from(path)));
        }
        if text.contains("://") {
            bail!("unsupported location scheme in `{text}`");
        }
        Ok(Location::Local(PathBuf::from(text)))
    }

    pub(crate) fn is_remote(&self) -> bool {
        matches!(self, Location::Remote(_))
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Local(path) => path.display().fmt(f),
            Location::Remote(url) => url.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use anyhow::Result;
    use base64ct::{Base64, Base64UrlUnpadded, Encoding};

    use super::Location;

    #[test]
    fn decodes_remote_locations() -> Result<()> {
        let url = "https://example.org/ldes/root?page=1";
        let standard = Base64::encode_string(url.as_bytes());
        let url_safe = Base64UrlUnpadded::encode_string(url.as_bytes());
        assert_eq!(Location::decode(&standard)?, Location::Remote(url.to_string()));
        assert_eq!(Location::decode(&url_safe)?, Location::Remote(url.to_string()));
        Ok(())
    }

    #[test]
    fn decodes_local_paths() -> Result<()> {
        let encoded = Base64::encode_string(b" data/sensors.ttl\n");
        assert_eq!(
            Location::decode(&encoded)?,
            Location::Local(PathBuf::from("data/sensors.ttl"))
        );
        assert_eq!(
            Location::parse("file:///tmp/a.ttl")?,
            Location::Local(PathBuf::from("/tmp/a.ttl"))
        );
        Ok(())
    }

    #[test]
    fn rejects_garbage() {
        assert!(Location::decode("not base64 at all!").is_err());
        assert!(Location::decode("").is_err());
        assert!(Location::parse("ftp://example.org/data").is_err());
        let invalid_utf8 = Base64::encode_string(&[0xff, 0xfe]);
        assert!(Location::decode(&invalid_utf8).is_err());
    }
}
