//! Marketplace locale to signing region mapping.

/// Locale used when the configured one is not in the table.
pub const DEFAULT_LOCALE: &str = "com";
const DEFAULT_SIGNING_REGION: &str = "us-east-1";

const MARKETPLACES: &[(&str, &str)] = &[
    ("com", "us-east-1"),
    ("com.au", "us-west-2"),
    ("com.be", "eu-west-1"),
    ("com.br", "us-east-1"),
    ("ca", "us-east-1"),
    ("eg", "eu-west-1"),
    ("fr", "eu-west-1"),
    ("de", "eu-west-1"),
    ("in", "eu-west-1"),
    ("it", "eu-west-1"),
    ("co.jp", "us-west-2"),
    ("com.mx", "us-east-1"),
    ("nl", "eu-west-1"),
    ("pl", "eu-west-1"),
    ("sg", "us-west-2"),
    ("sa", "eu-west-1"),
    ("es", "eu-west-1"),
    ("se", "eu-west-1"),
    ("com.tr", "eu-west-1"),
    ("ae", "eu-west-1"),
    ("co.uk", "eu-west-1"),
];

/// A marketplace locale (`co.uk`, `de`, ...) together with its signing region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marketplace {
    locale: &'static str,
    signing_region: &'static str,
}

impl Marketplace {
    /// Exact-match lookup; `None` for locales outside the table.
    pub fn try_lookup(locale: &str) -> Option<Self> {
        let locale = locale.trim();
        MARKETPLACES
            .iter()
            .find(|(candidate, _)| *candidate == locale)
            .map(|&(locale, signing_region)| Self {
                locale,
                signing_region,
            })
    }

    /// Lookup falling back to `com` / `us-east-1`.
    pub fn lookup(locale: &str) -> Self {
        Self::try_lookup(locale).unwrap_or_default()
    }

    pub fn all() -> impl Iterator<Item = Marketplace> {
        MARKETPLACES
            .iter()
            .map(|&(locale, signing_region)| Marketplace {
                locale,
                signing_region,
            })
    }

    pub fn locale(&self) -> &'static str {
        self.locale
    }

    pub fn signing_region(&self) -> &'static str {
        self.signing_region
    }

    /// API host, e.g. `webservices.amazon.co.uk`.
    pub fn host(&self) -> String {
        format!("webservices.amazon.{}", self.locale)
    }

    /// Marketplace domain sent in the payload, e.g. `www.amazon.co.uk`.
    pub fn marketplace_domain(&self) -> String {
        format!("www.amazon.{}", self.locale)
    }
}

impl Default for Marketplace {
    fn default() -> Self {
        Self {
            locale: DEFAULT_LOCALE,
            signing_region: DEFAULT_SIGNING_REGION,
        }
    }
}
