//! Output key templating.
//!
//! Keys are rendered from an [upon] template, so deployments can choose
//! their own naming scheme. Two variables are available:
//!
//! | Variable    | Type  | Description                                  |
//! |-------------|-------|----------------------------------------------|
//! | `index`     | `u64` | Zero-based position of the item in the batch |
//! | `timestamp` | `u64` | Nanoseconds since the Unix epoch             |
//!
//! ```
//! use imgbatch_pipeline::KeyGenerator;
//!
//! let generator: KeyGenerator = "resized/{{ index }}".parse().unwrap();
//! assert_eq!(generator.render(3, 0).unwrap(), "resized/3");
//! ```

use crate::error::{Error, ErrorKind, Result};
use exn::ResultExt;
use imgbatch_storage::validate_key;
use std::str::FromStr;
use time::OffsetDateTime;
use upon::{Engine, Template};

/// Renders storage keys from a compiled template.
///
/// The template is compiled by [`FromStr`], so syntax errors surface before
/// any item is processed.
pub struct KeyGenerator {
    engine: Engine<'static>,
    template: Template<'static>,
}
impl FromStr for KeyGenerator {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let engine = Engine::new();
        let template = engine.compile(s.to_string()).or_raise(|| ErrorKind::Template)?;
        Ok(Self { engine, template })
    }
}
impl KeyGenerator {
    /// Key for item `index`, stamped with the current time.
    pub fn generate(&self, index: usize) -> Result<String> {
        let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
        self.render(index, u64::try_from(nanos).unwrap_or_default())
    }

    /// Key for item `index` at a fixed `timestamp`.
    pub fn render(&self, index: usize, timestamp: u64) -> Result<String> {
        let index = u64::try_from(index).unwrap_or(u64::MAX);
        let key = self
            .template
            .render(&self.engine, upon::value! { index: index, timestamp: timestamp })
            .to_string()
            .or_raise(|| ErrorKind::Template)?;
        let key = key.trim().split('/').map(str::trim).collect::<Vec<_>>().join("/");
        validate_key(&key).or_raise(|| ErrorKind::Template)
    }
}
