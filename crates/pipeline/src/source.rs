use crate::resolve::error::ErrorKind;
use derive_more::Display;
use url::Url;

const STORE_SCHEME: &str = "key-value://";

/// Where the bytes of one input image live.
#[derive(Clone, Debug, PartialEq, Eq, Display)]
pub enum ImageSource {
    #[display("{_0}")]
    RemoteUrl(Url),
    #[display("key-value://{store_id}/{key}")]
    StoreRef { store_id: String, key: String },
}
impl ImageSource {
    /// Classify a descriptor string.
    ///
    /// `http://` and `https://` are URLs. `key-value://{storeId}/{key}` is a
    /// store reference, split on the first `/` after the scheme, so keys may
    /// themselves contain slashes. Anything else is unsupported.
    pub fn parse(raw: &str) -> Result<Self, ErrorKind> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ErrorKind::UnsupportedSource("empty source".to_string()));
        }
        if let Some(rest) = trimmed.strip_prefix(STORE_SCHEME) {
            return match rest.split_once('/') {
                Some((store_id, key)) if !store_id.is_empty() && !key.is_empty() => {
                    Ok(Self::StoreRef { store_id: store_id.to_string(), key: key.to_string() })
                },
                _ => Err(ErrorKind::MalformedReference(trimmed.to_string())),
            };
        }
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            return Url::parse(trimmed)
                .map(Self::RemoteUrl)
                .map_err(|e| ErrorKind::MalformedReference(format!("{trimmed} ({e})")));
        }
        Err(ErrorKind::UnsupportedSource(trimmed.to_string()))
    }
}

/// An input entry exactly as supplied, plus its classification.
///
/// Parse failures are kept rather than raised so that every input index still
/// gets exactly one outcome.
#[derive(Clone, Debug)]
pub struct SourceDescriptor {
    pub raw: String,
    pub parsed: Result<ImageSource, ErrorKind>,
}
impl SourceDescriptor {
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let parsed = ImageSource::parse(&raw);
        Self { raw, parsed }
    }

    /// An entry that was not a string; `raw` is its JSON text.
    pub fn not_a_string(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let parsed = Err(ErrorKind::NotAString(raw.clone()));
        Self { raw, parsed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("https://example.com/a.png")]
    #[case("http://example.com/path/to/b.jpg?size=large")]
    #[case("  https://example.com/padded.png  ")]
    fn test_remote_urls(#[case] raw: &str) {
        assert!(matches!(ImageSource::parse(raw), Ok(ImageSource::RemoteUrl(_))));
    }

    #[rstest]
    #[case("key-value://inputs/cat.png", "inputs", "cat.png")]
    #[case("key-value://inputs/nested/dir/cat.png", "inputs", "nested/dir/cat.png")]
    fn test_store_refs(#[case] raw: &str, #[case] store: &str, #[case] expected_key: &str) {
        let source = ImageSource::parse(raw).unwrap();
        assert_eq!(source, ImageSource::StoreRef { store_id: store.to_string(), key: expected_key.to_string() });
        assert_eq!(source.to_string(), raw);
    }

    #[rstest]
    #[case("key-value://")]
    #[case("key-value://inputs")]
    #[case("key-value://inputs/")]
    #[case("key-value:///cat.png")]
    fn test_malformed_store_refs(#[case] raw: &str) {
        assert!(matches!(ImageSource::parse(raw), Err(ErrorKind::MalformedReference(_))));
    }

    #[rstest]
    #[case("ftp://bad")]
    #[case("file:///etc/passwd")]
    #[case("cat.png")]
    #[case("")]
    #[case("   ")]
    fn test_unsupported_sources(#[case] raw: &str) {
        let err = ImageSource::parse(raw).unwrap_err();
        assert!(matches!(err, ErrorKind::UnsupportedSource(_)));
        assert!(err.to_string().starts_with("unsupported image source"));
    }

    #[test]
    fn test_descriptor_keeps_raw_text() {
        let descriptor = SourceDescriptor::parse("ftp://bad");
        assert_eq!(descriptor.raw, "ftp://bad");
        assert!(descriptor.parsed.is_err());
    }

    #[test]
    fn test_not_a_string() {
        let descriptor = SourceDescriptor::not_a_string("42");
        assert_eq!(descriptor.raw, "42");
        let err = descriptor.parsed.unwrap_err();
        assert_eq!(err.to_string(), "invalid image source 42: must be a non-empty string");
    }
}
