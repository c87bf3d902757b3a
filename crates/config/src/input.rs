use crate::error::{ErrorKind, Result};
use figment::Figment;
use figment::providers::{Format, Json, Serialized, Yaml};
use imgbatch_transform::{Background, Fit, OutputFormat, Position, Quality, TransformSpec};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

pub const DEFAULT_CONCURRENCY: i64 = 5;

/// One batch request, as supplied by the user.
///
/// Field names follow the JSON input document (`stripMetadata`,
/// `outputStoreId`, ...). Every field except `images` has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Input {
    /// Source descriptors: `http(s)://` URLs or `key-value://{storeId}/{key}`.
    /// Entries that are not strings fail on their own, not the whole batch.
    pub images: Vec<Value>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fit: String,
    pub position: String,
    pub format: String,
    pub quality: u32,
    pub background: String,
    pub strip_metadata: bool,
    /// Clamped to `1..=20` by the scheduler; out-of-range values are not an error.
    pub concurrency: i64,
    /// Store for processed images. `None` means the default store.
    pub output_store_id: Option<String>,
    pub create_dataset: bool,
}
impl Default for Input {
    fn default() -> Self {
        let spec = TransformSpec::new();
        Self {
            images: Vec::new(),
            width: None,
            height: None,
            fit: spec.fit.to_string(),
            position: spec.position.to_string(),
            format: spec.format.to_string(),
            quality: u32::from(spec.quality.get()),
            background: "#ffffff".to_string(),
            strip_metadata: spec.strip_metadata,
            concurrency: DEFAULT_CONCURRENCY,
            output_store_id: None,
            create_dataset: true,
        }
    }
}

/// One entry of `images`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEntry {
    Descriptor(String),
    /// Anything but a string, kept as its JSON text.
    NotAString(String),
}
impl From<Value> for SourceEntry {
    fn from(value: Value) -> Self {
        match value {
            Value::String(raw) => Self::Descriptor(raw),
            other => Self::NotAString(other.to_string()),
        }
    }
}

/// A validated [`Input`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub sources: Vec<SourceEntry>,
    pub spec: TransformSpec,
    pub concurrency: usize,
    pub output_store_id: Option<String>,
    pub create_dataset: bool,
}

fn invalid(field: &'static str) -> impl FnOnce(imgbatch_transform::error::Error) -> ErrorKind {
    move |e| ErrorKind::Invalid(format!("{field}: {}", *e))
}

impl Input {
    /// Defaults, with nothing else merged in.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Input::default()))
    }

    /// Defaults overlaid with a JSON or YAML file, picked by extension
    /// (anything but `.yaml`/`.yml` is read as JSON).
    pub fn figment_from_file(path: impl AsRef<Path>) -> Result<Figment> {
        let path = path.as_ref();
        if !path.is_file() {
            exn::bail!(ErrorKind::MissingFile(path.display().to_string()));
        }
        let figment = match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => Self::figment().merge(Yaml::file_exact(path)),
            _ => Self::figment().merge(Json::file_exact(path)),
        };
        Ok(figment)
    }

    pub fn from_figment(figment: &Figment) -> Result<Self> {
        figment.extract().map_err(|e| ErrorKind::Invalid(e.to_string()).into())
    }

    /// Parse a JSON document on top of the defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_figment(&Self::figment().merge(Json::string(json)))
    }

    /// Check everything that can be checked before any work starts.
    pub fn validate(self) -> Result<Batch> {
        if self.images.is_empty() {
            exn::bail!(ErrorKind::EmptyImages);
        }
        let spec = TransformSpec {
            fit: self.fit.parse::<Fit>().map_err(invalid("fit"))?,
            position: self.position.parse::<Position>().map_err(invalid("position"))?,
            format: self.format.parse::<OutputFormat>().map_err(invalid("format"))?,
            quality: Quality::new(self.quality).map_err(invalid("quality"))?,
            background: self.background.parse::<Background>().map_err(invalid("background"))?,
            strip_metadata: self.strip_metadata,
            ..TransformSpec::new()
        }
        .with_size(self.width, self.height);
        // Negative values clamp up to one downstream.
        let concurrency = usize::try_from(self.concurrency.max(0)).unwrap_or(usize::MAX);
        let output_store_id = self.output_store_id.filter(|id| !id.is_empty());
        let sources = self.images.into_iter().map(SourceEntry::from).collect();
        Ok(Batch { sources, spec, concurrency, output_store_id, create_dataset: self.create_dataset })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::ops::Deref;

    #[test]
    fn test_defaults_match_documented_values() {
        let input = Input::from_json(r#"{"images": ["https://example.com/a.png"]}"#).unwrap();
        assert_eq!(input.fit, "cover");
        assert_eq!(input.position, "center");
        assert_eq!(input.format, "webp");
        assert_eq!(input.quality, 80);
        assert_eq!(input.background, "#ffffff");
        assert!(input.strip_metadata);
        assert_eq!(input.concurrency, 5);
        assert!(input.create_dataset);
        assert_eq!(input.output_store_id, None);

        let batch = input.validate().unwrap();
        assert_eq!(batch.spec, TransformSpec::new());
        assert_eq!(batch.concurrency, 5);
    }

    #[test]
    fn test_full_input() {
        let input = Input::from_json(
            r##"{
                "images": ["https://example.com/a.png", "key-value://inputs/b.jpg"],
                "width": 300,
                "height": 0,
                "fit": "contain",
                "position": "right top",
                "format": "jpeg",
                "quality": 60,
                "background": "#000000",
                "stripMetadata": false,
                "concurrency": 50,
                "outputStoreId": "resized",
                "createDataset": false
            }"##,
        )
        .unwrap();
        let batch = input.validate().unwrap();
        assert_eq!(batch.sources.len(), 2);
        assert_eq!(batch.spec.width, Some(300));
        assert_eq!(batch.spec.height, None);
        assert_eq!(batch.spec.fit, Fit::Contain);
        assert_eq!(batch.spec.position, Position::NorthEast);
        assert_eq!(batch.spec.format, OutputFormat::Jpeg);
        assert_eq!(batch.spec.quality.get(), 60);
        assert_eq!(batch.spec.background, Background([0, 0, 0, 255]));
        assert!(!batch.spec.strip_metadata);
        assert_eq!(batch.concurrency, 50);
        assert_eq!(batch.output_store_id.as_deref(), Some("resized"));
        assert!(!batch.create_dataset);
    }

    #[rstest]
    #[case(r#"{}"#)]
    #[case(r#"{"images": []}"#)]
    fn test_empty_images(#[case] json: &str) {
        let err = Input::from_json(json).unwrap().validate().unwrap_err();
        assert_eq!(*err, ErrorKind::EmptyImages);
    }

    #[rstest]
    #[case(r#"{"images": "https://example.com/a.png"}"#)]
    #[case(r#"{"images": ["a"], "width": -5}"#)]
    fn test_malformed_input(#[case] json: &str) {
        let err = Input::from_json(json).unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::Invalid(_)));
    }

    #[rstest]
    #[case(r#"{"images": ["a"], "fit": "stretch"}"#, "fit")]
    #[case(r#"{"images": ["a"], "position": "middle"}"#, "position")]
    #[case(r#"{"images": ["a"], "format": "bmp"}"#, "format")]
    #[case(r#"{"images": ["a"], "quality": 0}"#, "quality")]
    #[case(r#"{"images": ["a"], "quality": 101}"#, "quality")]
    #[case(r##"{"images": ["a"], "background": "#12"}"##, "background")]
    fn test_invalid_options(#[case] json: &str, #[case] field: &str) {
        let err = Input::from_json(json).unwrap().validate().unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::Invalid(msg) if msg.starts_with(field)), "{:?}", err.deref());
    }

    #[rstest]
    #[case(-3, 0)]
    #[case(0, 0)]
    #[case(7, 7)]
    fn test_concurrency_is_passed_through(#[case] requested: i64, #[case] expected: usize) {
        let input = Input { images: vec!["a".into()], concurrency: requested, ..Input::default() };
        assert_eq!(input.validate().unwrap().concurrency, expected);
    }

    #[test]
    fn test_non_string_images_are_kept_per_entry() {
        let input = Input::from_json(r#"{"images": ["https://example.com/ok.png", 42, true]}"#).unwrap();
        let batch = input.validate().unwrap();
        assert_eq!(
            batch.sources,
            vec![
                SourceEntry::Descriptor("https://example.com/ok.png".to_string()),
                SourceEntry::NotAString("42".to_string()),
                SourceEntry::NotAString("true".to_string()),
            ]
        );
    }

    #[test]
    fn test_null_output_store_is_default() {
        let input = Input::from_json(r#"{"images": ["a"], "outputStoreId": null}"#).unwrap();
        assert_eq!(input.validate().unwrap().output_store_id, None);
    }

    #[test]
    fn test_yaml_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("input.yaml");
        std::fs::write(&path, "images:\n  - https://example.com/a.png\nformat: png\n").unwrap();
        let input = Input::from_figment(&Input::figment_from_file(&path).unwrap()).unwrap();
        assert_eq!(input.images, vec!["https://example.com/a.png"]);
        assert_eq!(input.format, "png");
    }

    #[test]
    fn test_missing_file() {
        let err = Input::figment_from_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::MissingFile(_)));
    }
}
