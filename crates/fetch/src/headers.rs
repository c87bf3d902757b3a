//! Browser-like request headers.
//!
//! Some image hosts refuse requests that don't look like they come from a
//! browser. [`HeaderGenerator`] picks a plausible browser profile within a set
//! of [`HeaderConstraints`] and produces a consistent set of headers for it:
//! the `User-Agent`, `Accept*` headers, and client hints for Chromium-family
//! browsers all agree with each other.

use crate::error::{ErrorKind, Result};
use rand::Rng;
use rand::seq::IndexedRandom;
use reqwest::header::{ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Browser {
    Chrome,
    Firefox,
    Edge,
    Safari,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperatingSystem {
    Windows,
    MacOs,
    Linux,
    Android,
    Ios,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Device {
    Desktop,
    Mobile,
}

impl OperatingSystem {
    fn device(self) -> Device {
        match self {
            Self::Windows | Self::MacOs | Self::Linux => Device::Desktop,
            Self::Android | Self::Ios => Device::Mobile,
        }
    }

    /// `Sec-CH-UA-Platform` value.
    fn platform(self) -> &'static str {
        match self {
            Self::Windows => "\"Windows\"",
            Self::MacOs => "\"macOS\"",
            Self::Linux => "\"Linux\"",
            Self::Android => "\"Android\"",
            Self::Ios => "\"iOS\"",
        }
    }
}

impl Browser {
    fn runs_on(self, os: OperatingSystem) -> bool {
        match self {
            Self::Safari => matches!(os, OperatingSystem::MacOs | OperatingSystem::Ios),
            Self::Chrome | Self::Firefox | Self::Edge => os != OperatingSystem::Ios,
        }
    }

    fn is_chromium(self) -> bool {
        matches!(self, Self::Chrome | Self::Edge)
    }

    /// Major versions to pick from; recent enough not to look stale.
    fn versions(self) -> std::ops::RangeInclusive<u32> {
        match self {
            Self::Chrome | Self::Edge => 126..=131,
            Self::Firefox => 127..=133,
            Self::Safari => 16..=18,
        }
    }

    fn accept(self) -> &'static str {
        match self {
            Self::Chrome | Self::Edge => {
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7"
            },
            Self::Firefox => "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
            Self::Safari => "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        }
    }
}

/// Limits on the profiles [`HeaderGenerator`] may produce.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderConstraints {
    pub browsers: Vec<Browser>,
    pub operating_systems: Vec<OperatingSystem>,
    pub devices: Vec<Device>,
    /// BCP 47 language tags, e.g. `en-US`.
    pub locales: Vec<String>,
}
impl Default for HeaderConstraints {
    /// Desktop Chrome, Firefox or Edge on Windows, macOS or Linux, in `en-US`.
    fn default() -> Self {
        Self {
            browsers: vec![Browser::Chrome, Browser::Firefox, Browser::Edge],
            operating_systems: vec![OperatingSystem::Windows, OperatingSystem::MacOs, OperatingSystem::Linux],
            devices: vec![Device::Desktop],
            locales: vec!["en-US".to_string()],
        }
    }
}

/// A concrete browser identity chosen by [`HeaderGenerator`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Profile {
    pub browser: Browser,
    pub os: OperatingSystem,
    pub version: u32,
    pub locale: String,
}

/// Generates fresh browser-like headers per request.
///
/// Holds no state; randomness comes from the thread-local RNG unless a
/// caller supplies its own through [`generate_with`](Self::generate_with).
#[derive(Clone, Copy, Debug, Default)]
pub struct HeaderGenerator;

impl HeaderGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn generate(&self, constraints: &HeaderConstraints) -> Result<HeaderMap> {
        self.generate_with(constraints, &mut rand::rng())
    }

    pub fn generate_with<R: Rng>(&self, constraints: &HeaderConstraints, rng: &mut R) -> Result<HeaderMap> {
        let profile = self.pick(constraints, rng)?;
        headers_for(&profile)
    }

    /// Choose a browser, OS and locale satisfying every constraint.
    pub fn pick<R: Rng>(&self, constraints: &HeaderConstraints, rng: &mut R) -> Result<Profile> {
        let combinations: Vec<(Browser, OperatingSystem)> = constraints
            .browsers
            .iter()
            .flat_map(|browser| constraints.operating_systems.iter().map(move |os| (*browser, *os)))
            .filter(|(browser, os)| browser.runs_on(*os) && constraints.devices.contains(&os.device()))
            .collect();
        let Some(&(browser, os)) = combinations.choose(rng) else {
            exn::bail!(ErrorKind::Headers("no browser profile satisfies the constraints".to_string()));
        };
        let Some(locale) = constraints.locales.choose(rng) else {
            exn::bail!(ErrorKind::Headers("no locale given".to_string()));
        };
        let version = rng.random_range(browser.versions());
        Ok(Profile { browser, os, version, locale: locale.clone() })
    }
}

fn user_agent(profile: &Profile) -> String {
    let v = profile.version;
    let chromium = |suffix: &str| {
        let platform = match profile.os {
            OperatingSystem::Windows => "Windows NT 10.0; Win64; x64",
            OperatingSystem::MacOs => "Macintosh; Intel Mac OS X 10_15_7",
            OperatingSystem::Linux => "X11; Linux x86_64",
            OperatingSystem::Android | OperatingSystem::Ios => "Linux; Android 10; K",
        };
        let mobile = if profile.os.device() == Device::Mobile { "Mobile " } else { "" };
        format!(
            "Mozilla/5.0 ({platform}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{v}.0.0.0 {mobile}Safari/537.36{suffix}"
        )
    };
    match profile.browser {
        Browser::Chrome => chromium(""),
        Browser::Edge if profile.os == OperatingSystem::Android => chromium(&format!(" EdgA/{v}.0.0.0")),
        Browser::Edge => chromium(&format!(" Edg/{v}.0.0.0")),
        Browser::Firefox => match profile.os {
            OperatingSystem::Windows => format!("Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:{v}.0) Gecko/20100101 Firefox/{v}.0"),
            OperatingSystem::MacOs => format!("Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:{v}.0) Gecko/20100101 Firefox/{v}.0"),
            OperatingSystem::Linux => format!("Mozilla/5.0 (X11; Linux x86_64; rv:{v}.0) Gecko/20100101 Firefox/{v}.0"),
            OperatingSystem::Android | OperatingSystem::Ios => {
                format!("Mozilla/5.0 (Android 14; Mobile; rv:{v}.0) Gecko/{v}.0 Firefox/{v}.0")
            },
        },
        Browser::Safari => match profile.os {
            OperatingSystem::Ios => format!(
                "Mozilla/5.0 (iPhone; CPU iPhone OS 17_5 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/{v}.0 Mobile/15E148 Safari/604.1"
            ),
            _ => format!(
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/{v}.0 Safari/605.1.15"
            ),
        },
    }
}

/// `en-US` becomes `en-US,en;q=0.9`; a bare language is sent as-is.
fn accept_language(locale: &str) -> String {
    match locale.split_once('-') {
        Some((language, _)) if !language.is_empty() => format!("{locale},{language};q=0.9"),
        _ => locale.to_string(),
    }
}

fn headers_for(profile: &Profile) -> Result<HeaderMap> {
    let value = |text: String| {
        HeaderValue::from_str(&text).map_err(|_| ErrorKind::Headers(format!("invalid header value {text:?}")))
    };
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, value(user_agent(profile))?);
    headers.insert(ACCEPT, HeaderValue::from_static(profile.browser.accept()));
    headers.insert(ACCEPT_LANGUAGE, value(accept_language(&profile.locale))?);
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate, br"));
    headers.insert(HeaderName::from_static("upgrade-insecure-requests"), HeaderValue::from_static("1"));
    if profile.browser.is_chromium() {
        let brand = match profile.browser {
            Browser::Edge => "Microsoft Edge",
            _ => "Google Chrome",
        };
        let v = profile.version;
        headers.insert(
            HeaderName::from_static("sec-ch-ua"),
            value(format!("\"Chromium\";v=\"{v}\", \"{brand}\";v=\"{v}\", \"Not?A_Brand\";v=\"99\""))?,
        );
        let mobile = if profile.os.device() == Device::Mobile { "?1" } else { "?0" };
        headers.insert(HeaderName::from_static("sec-ch-ua-mobile"), HeaderValue::from_static(mobile));
        headers.insert(HeaderName::from_static("sec-ch-ua-platform"), HeaderValue::from_static(profile.os.platform()));
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rstest::rstest;

    fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
        headers.get(name).and_then(|v| v.to_str().ok())
    }

    #[test]
    fn test_default_constraints_are_respected() {
        let generator = HeaderGenerator::new();
        let constraints = HeaderConstraints::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let profile = generator.pick(&constraints, &mut rng).unwrap();
            assert!(constraints.browsers.contains(&profile.browser));
            assert!(constraints.operating_systems.contains(&profile.os));
            assert_eq!(profile.os.device(), Device::Desktop);
            assert_eq!(profile.locale, "en-US");
        }
    }

    #[test]
    fn test_headers_are_consistent() {
        let generator = HeaderGenerator::new();
        let constraints = HeaderConstraints::default();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let headers = generator.generate_with(&constraints, &mut rng).unwrap();
            let ua = header(&headers, "user-agent").unwrap();
            assert_eq!(header(&headers, "accept-language"), Some("en-US,en;q=0.9"));
            assert!(header(&headers, "accept").is_some());
            if ua.contains("Firefox/") {
                assert!(headers.get("sec-ch-ua").is_none(), "{ua}");
            } else {
                let brands = header(&headers, "sec-ch-ua").unwrap();
                let brand = if ua.contains(" Edg/") { "Microsoft Edge" } else { "Google Chrome" };
                assert!(brands.contains(brand), "{ua} / {brands}");
                assert_eq!(header(&headers, "sec-ch-ua-mobile"), Some("?0"));
            }
        }
    }

    #[rstest]
    #[case(Browser::Chrome, OperatingSystem::Windows, "Windows NT 10.0", "Chrome/130.0.0.0")]
    #[case(Browser::Edge, OperatingSystem::MacOs, "Macintosh", "Edg/130.0.0.0")]
    #[case(Browser::Firefox, OperatingSystem::Linux, "X11; Linux x86_64", "Firefox/130.0")]
    #[case(Browser::Safari, OperatingSystem::Ios, "iPhone", "Version/130.0")]
    #[case(Browser::Chrome, OperatingSystem::Android, "Android", "Mobile Safari")]
    fn test_user_agent(
        #[case] browser: Browser,
        #[case] os: OperatingSystem,
        #[case] platform: &str,
        #[case] product: &str,
    ) {
        let ua = user_agent(&Profile { browser, os, version: 130, locale: "en".to_string() });
        assert!(ua.starts_with("Mozilla/5.0 ("), "{ua}");
        assert!(ua.contains(platform), "{ua}");
        assert!(ua.contains(product), "{ua}");
    }

    #[rstest]
    #[case("en-US", "en-US,en;q=0.9")]
    #[case("de-DE", "de-DE,de;q=0.9")]
    #[case("fr", "fr")]
    fn test_accept_language(#[case] locale: &str, #[case] expected: &str) {
        assert_eq!(accept_language(locale), expected);
    }

    #[test]
    fn test_unsatisfiable_constraints() {
        let constraints = HeaderConstraints {
            browsers: vec![Browser::Safari],
            operating_systems: vec![OperatingSystem::Windows],
            ..HeaderConstraints::default()
        };
        let err = HeaderGenerator::new().generate(&constraints).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Headers(_)));

        let constraints = HeaderConstraints { locales: vec![], ..HeaderConstraints::default() };
        assert!(HeaderGenerator::new().generate(&constraints).is_err());
    }

    #[test]
    fn test_mobile_client_hints() {
        let constraints = HeaderConstraints {
            browsers: vec![Browser::Chrome],
            operating_systems: vec![OperatingSystem::Android],
            devices: vec![Device::Mobile],
            locales: vec!["en-GB".to_string()],
        };
        let headers = HeaderGenerator::new().generate(&constraints).unwrap();
        assert_eq!(header(&headers, "sec-ch-ua-mobile"), Some("?1"));
        assert_eq!(header(&headers, "sec-ch-ua-platform"), Some("\"Android\""));
        assert_eq!(header(&headers, "accept-language"), Some("en-GB,en;q=0.9"));
    }
}
