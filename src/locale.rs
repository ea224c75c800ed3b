//! Language and character set of a request.

use std::{borrow::Cow, fmt, str::FromStr};

use thiserror::Error;

#[derive(Error, Debug)]
#[error("Invalid language tag `{0}`")]
pub struct ParseLocaleError(String);

/// A language tag reduced to its language and optional region, `en-US`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Locale {
    language: String,
    region: Option<String>,
}

impl Locale {
    pub fn new(language: &str, region: Option<&str>) -> Self {
        Locale {
            language: language.to_ascii_lowercase(),
            region: region.map(|r| r.to_ascii_uppercase()),
        }
    }

    #[inline]
    pub fn language(&self) -> &str {
        &self.language
    }

    #[inline]
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// Parse the value of an `Accept-Language` header, most preferred first.
    /// The `*` range and invalid tags are skipped, entries with `q=0` as well.
    pub fn parse_accept_language(value: &str) -> Vec<Locale> {
        let mut weighted = value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|range| {
                let mut parts = range.split(';');
                let tag = parts.next()?.trim();
                let q = parts
                    .find_map(|p| p.trim().strip_prefix("q="))
                    .map(|q| q.trim().parse::<f32>().unwrap_or(1.0))
                    .unwrap_or(1.0);

                if tag == "*" || q <= 0.0 {
                    return None;
                }

                match tag.parse::<Locale>() {
                    Ok(locale) => Some((locale, q)),
                    Err(e) => {
                        debug!("{}", e);
                        None
                    }
                }
            })
            .collect::<Vec<_>>();

        // stable, so equal weights keep the header order
        weighted.sort_by(|(_, a), (_, b)| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        weighted.into_iter().map(|(locale, _)| locale).collect()
    }
}

impl Default for Locale {
    fn default() -> Self {
        Locale::new("en", Some("US"))
    }
}

impl FromStr for Locale {
    type Err = ParseLocaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split(|c| c == '-' || c == '_');
        let language = parts.next().unwrap_or_default();
        if language.is_empty() || language.len() > 8 || !language.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ParseLocaleError(s.to_owned()));
        }

        let region = match parts.next() {
            Some(r) if !r.is_empty() && r.chars().all(|c| c.is_ascii_alphanumeric()) => Some(r),
            Some(_) => return Err(ParseLocaleError(s.to_owned())),
            None => None,
        };

        Ok(Locale::new(language, region))
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.region {
            Some(region) => write!(f, "{}-{}", self.language, region),
            None => f.write_str(&self.language),
        }
    }
}

/// Name of a character set. Comparison ignores case.
#[derive(Clone, Debug)]
pub struct Charset(Cow<'static, str>);

impl Charset {
    pub const UTF_8: Charset = Charset(Cow::Borrowed("UTF-8"));
    pub const US_ASCII: Charset = Charset(Cow::Borrowed("US-ASCII"));
    pub const ISO_8859_1: Charset = Charset(Cow::Borrowed("ISO-8859-1"));

    pub fn new(name: impl Into<String>) -> Self {
        Charset(Cow::Owned(name.into()))
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn is_utf8(&self) -> bool {
        self.0.eq_ignore_ascii_case("utf-8") || self.0.eq_ignore_ascii_case("utf8")
    }
}

impl Default for Charset {
    fn default() -> Self {
        Charset::UTF_8
    }
}

impl PartialEq for Charset {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for Charset {}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
