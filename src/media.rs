//! Media types and content negotiation.
//!
//! A [`MediaType`] is a thin layer over [`mime::Mime`] which adds what a
//! server needs to negotiate content: the `q` quality parameter, wildcard
//! matching (`*/*`, `text/*`, `application/*+json`) and a specificity rank.

use std::{fmt, str::FromStr};

use mime::Mime;

/// Quality weight of an Accept entry in thousandths, as written in the
/// `q` parameter (`q=0.5` => `500`)
const MAX_WEIGHT: u16 = 1000;

/// A MIME type with quality and wildcard matching semantics
#[derive(Clone, PartialEq, Eq)]
pub struct MediaType {
    mime: Mime,
}

impl MediaType {
    #[inline]
    pub fn new(mime: Mime) -> Self {
        MediaType { mime }
    }

    /// `*/*`, match anything
    #[inline]
    pub fn any() -> Self {
        MediaType::new(mime::STAR_STAR)
    }

    #[inline]
    pub fn json() -> Self {
        MediaType::new(mime::APPLICATION_JSON)
    }

    #[inline]
    pub fn html() -> Self {
        MediaType::new(mime::TEXT_HTML)
    }

    #[inline]
    pub fn plain() -> Self {
        MediaType::new(mime::TEXT_PLAIN)
    }

    #[inline]
    pub fn form() -> Self {
        MediaType::new(mime::APPLICATION_WWW_FORM_URLENCODED)
    }

    #[inline]
    pub fn multipart() -> Self {
        MediaType::new(mime::MULTIPART_FORM_DATA)
    }

    #[inline]
    pub fn octet_stream() -> Self {
        MediaType::new(mime::APPLICATION_OCTET_STREAM)
    }

    /// The underlying mime
    #[inline]
    pub fn mime(&self) -> &Mime {
        &self.mime
    }

    #[inline]
    pub fn type_(&self) -> &str {
        self.mime.type_().as_str()
    }

    /// Subtype without its structured syntax suffix, `vnd.api` for
    /// `application/vnd.api+json`
    #[inline]
    pub fn subtype(&self) -> &str {
        self.mime.subtype().as_str()
    }

    /// Structured syntax suffix, `json` for `application/vnd.api+json`
    #[inline]
    pub fn suffix(&self) -> Option<&str> {
        self.mime.suffix().map(|s| s.as_str())
    }

    /// `type/subtype` without parameters
    #[inline]
    pub fn essence(&self) -> &str {
        self.mime.essence_str()
    }

    #[inline]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.mime.get_param(name).map(|v| v.as_str())
    }

    #[inline]
    pub fn charset(&self) -> Option<&str> {
        self.param("charset")
    }

    /// True for `*/*`
    #[inline]
    pub fn is_any(&self) -> bool {
        self.type_() == "*"
    }

    /// True when either the type or the subtype is a wildcard
    #[inline]
    pub fn is_wildcard(&self) -> bool {
        self.is_any() || self.subtype() == "*"
    }

    pub fn is_json(&self) -> bool {
        self.subtype() == "json" || self.suffix() == Some("json")
    }

    pub fn is_form(&self) -> bool {
        self.essence() == mime::APPLICATION_WWW_FORM_URLENCODED.essence_str()
    }

    pub fn is_multipart(&self) -> bool {
        self.essence() == mime::MULTIPART_FORM_DATA.essence_str()
    }

    /// Value of the `q` parameter, `1.0` when absent or invalid
    pub fn quality(&self) -> f32 {
        f32::from(self.weight()) / f32::from(MAX_WEIGHT)
    }

    pub(crate) fn weight(&self) -> u16 {
        match self.param("q").map(|q| q.trim().parse::<f32>()) {
            Some(Ok(q)) if q.is_finite() => (q.clamp(0.0, 1.0) * f32::from(MAX_WEIGHT)).round() as u16,
            Some(_) => {
                debug!("Ignoring invalid quality value in media type {}", self.mime);
                MAX_WEIGHT
            }
            None => MAX_WEIGHT,
        }
    }

    /// How precise this type is when used as a pattern. `*/*` is the least
    /// specific, a concrete type with parameters (other than `q`) the most.
    pub fn specificity(&self) -> u8 {
        if self.is_any() {
            0
        } else if self.subtype() == "*" {
            if self.suffix().is_some() {
                2
            } else {
                1
            }
        } else if self.mime.params().any(|(name, _)| name.as_str() != "q") {
            4
        } else {
            3
        }
    }

    /// Whether `that` is covered by this type used as a pattern. Wildcards
    /// on either side match, so `text/*` matches `text/html` and `text/html`
    /// matches `text/*`. `application/*+json` matches any json suffixed
    /// subtype as well as `application/json`.
    pub fn matches(&self, that: &MediaType) -> bool {
        if self.is_any() || that.is_any() {
            return true;
        }

        if self.type_() != that.type_() {
            return false;
        }

        match (self.wildcard_suffix(), that.wildcard_suffix()) {
            (Some(suffix), _) => return that.suffix() == Some(suffix) || that.subtype() == suffix,
            (_, Some(suffix)) => return self.suffix() == Some(suffix) || self.subtype() == suffix,
            _ => {}
        }

        if self.subtype() == "*" || that.subtype() == "*" {
            return true;
        }

        self.subtype() == that.subtype() && self.suffix() == that.suffix()
    }

    fn wildcard_suffix(&self) -> Option<&str> {
        if self.subtype() == "*" {
            self.suffix()
        } else {
            None
        }
    }

    /// Parse a comma separated list of media types, such as the value of an
    /// `Accept` header. Unparsable entries are skipped. The result is ordered
    /// by quality, then specificity; entries ranking equal keep their order.
    pub fn parse_list(value: &str) -> Vec<MediaType> {
        let mut types = value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| match s.parse::<MediaType>() {
                Ok(t) => Some(t),
                Err(e) => {
                    debug!("Skipping invalid media type `{}`: {}", s, e);
                    None
                }
            })
            .collect::<Vec<_>>();
        sort(&mut types);
        types
    }
}

/// Sort media types by preference: quality first, then specificity. The sort
/// is stable.
pub fn sort(types: &mut [MediaType]) {
    types.sort_by(|a, b| (b.weight(), b.specificity()).cmp(&(a.weight(), a.specificity())));
}

/// Pick the best candidate that is acceptable according to `accept`.
///
/// Every candidate is scored with the best `accept` entry compatible with
/// it, entries ranking by quality then specificity; entries with `q=0` are
/// never acceptable. The best scoring candidate is returned, and when scores
/// are equal the candidate supplied first wins.
///
/// ```rust
/// # use grenat::media::{negotiate, MediaType};
/// let accept = MediaType::parse_list("text/*;q=0.5, application/json");
/// let best = negotiate(&accept, &[MediaType::html(), MediaType::json()]);
/// assert_eq!(best, Some(MediaType::json()));
/// ```
pub fn negotiate(accept: &[MediaType], candidates: &[MediaType]) -> Option<MediaType> {
    let mut best: Option<(&MediaType, (u16, u8))> = None;

    for candidate in candidates {
        let score = accept
            .iter()
            .filter(|a| a.weight() > 0 && a.matches(candidate))
            .map(|a| (a.weight(), a.specificity()))
            .max();

        if let Some(score) = score {
            match best {
                Some((_, current)) if current >= score => {}
                _ => best = Some((candidate, score)),
            }
        }
    }

    best.map(|(candidate, _)| candidate.clone())
}

impl FromStr for MediaType {
    type Err = mime::FromStrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        // Some clients send a bare `*` for `*/*`
        if s == "*" {
            return Ok(MediaType::any());
        }
        s.parse::<Mime>().map(MediaType::new)
    }
}

impl From<Mime> for MediaType {
    fn from(mime: Mime) -> Self {
        MediaType::new(mime)
    }
}

impl From<MediaType> for Mime {
    fn from(t: MediaType) -> Self {
        t.mime
    }
}

impl AsRef<Mime> for MediaType {
    fn as_ref(&self) -> &Mime {
        &self.mime
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.mime, f)
    }
}

impl fmt::Debug for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MediaType({})", self.mime)
    }
}
