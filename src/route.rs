//! The route matched by a request.
//!
//! Routing itself belongs to the hosting server; this module only describes
//! the outcome ([`Route`]) and knows how to match a single pattern against a
//! path and capture its variables ([`RoutePattern`]).

use std::collections::VecDeque;

use http::Method;
use percent_encoding::percent_decode_str;
use regex::Regex;

use crate::error::GrenatError;

/// Descriptor of the route matched by the current request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    verb: Method,
    pattern: String,
    path: String,
    vars: Vec<(String, String)>,
    name: Option<String>,
}

impl Route {
    pub fn new(verb: Method, pattern: impl Into<String>, path: impl Into<String>) -> Self {
        Route {
            verb,
            pattern: pattern.into(),
            path: path.into(),
            vars: Vec::new(),
            name: None,
        }
    }

    /// Attach the path variables captured while matching
    pub fn with_vars(mut self, vars: Vec<(String, String)>) -> Self {
        self.vars = vars;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[inline]
    pub fn verb(&self) -> &Method {
        &self.verb
    }

    /// The pattern which matched, `/user/:id`
    #[inline]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The concrete request path, `/user/12`
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Captured path variables, in pattern order
    #[inline]
    pub fn vars(&self) -> &[(String, String)] {
        &self.vars
    }

    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// A path pattern such as `/user/:id`, `/user/{id}`, `/file/{id:[0-9]+}`,
/// `/static/*.css` or `/assets/**path`.
///
/// ```rust
/// # use grenat::route::RoutePattern;
/// # use grenat::http::Method;
/// let pattern = RoutePattern::new("/user/:id/profile").unwrap();
/// let route = pattern.route(Method::GET, "/user/42/profile").unwrap();
/// assert_eq!(route.var("id"), Some("42"));
/// ```
#[derive(Debug)]
pub struct RoutePattern {
    source: String,
    matcher: PathMatcher,
}

#[derive(Debug)]
enum PathMatcher {
    Simple {
        inner: Vec<SegmentMatcher>,
    },
    Wildcard {
        start: Vec<SegmentMatcher>,
        end: VecDeque<SegmentMatcher>,
        capture: Option<String>,
    },
}

impl RoutePattern {
    pub fn new(pattern: &str) -> Result<RoutePattern, GrenatError> {
        let invalid = |reason: String| GrenatError::InvalidPattern {
            pattern: pattern.to_string(),
            reason,
        };

        let matcher = if pattern.contains("**") {
            let segments = pattern.split('/').collect::<Vec<_>>();
            let split_at = segments
                .iter()
                .position(|seg| seg.starts_with("**"))
                .ok_or_else(|| invalid("a tail wildcard must be a whole segment".to_string()))?;

            let capture = Some(segments[split_at].trim_start_matches("**")).filter(|s| !s.is_empty()).map(str::to_string);
            let (start, end) = segments.split_at(split_at);

            PathMatcher::Wildcard {
                start: parse_segments(start.iter()).map_err(invalid)?,
                end: parse_segments(end[1..].iter()).map_err(invalid)?,
                capture,
            }
        } else {
            PathMatcher::Simple {
                inner: parse_segments(pattern.split('/')).map_err(invalid)?,
            }
        };

        Ok(RoutePattern {
            source: pattern.to_string(),
            matcher,
        })
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, path: &str) -> bool {
        self.capture(path).is_some()
    }

    /// Match the whole `path`, returning the captured variables in pattern
    /// order. Captured values are percent-decoded.
    pub fn capture(&self, path: &str) -> Option<Vec<(String, String)>> {
        let mut split = path.split('/').collect::<VecDeque<_>>();
        split.pop_front();
        if split.back().map(|s| s.is_empty()).unwrap_or(false) {
            split.pop_back();
        }

        let mut captures = Vec::new();

        match &self.matcher {
            PathMatcher::Simple { inner } => {
                if inner.len() != split.len() {
                    return None;
                }

                for (seg, current) in inner.iter().zip(split) {
                    if !seg.matches(current) {
                        return None;
                    }
                    if let Some(name) = seg.name() {
                        captures.push((name.to_string(), decode(current)));
                    }
                }
            }
            PathMatcher::Wildcard { start, end, capture } => {
                if start.len() + end.len() > split.len() {
                    return None;
                }

                for seg in start {
                    let current = split.pop_front()?;
                    if !seg.matches(current) {
                        return None;
                    }
                    if let Some(name) = seg.name() {
                        captures.push((name.to_string(), decode(current)));
                    }
                }

                let mut tail_captures = Vec::new();
                for seg in end.iter().rev() {
                    let current = split.pop_back()?;
                    if !seg.matches(current) {
                        return None;
                    }
                    if let Some(name) = seg.name() {
                        tail_captures.push((name.to_string(), decode(current)));
                    }
                }

                if let Some(name) = capture {
                    let rest = split.iter().map(|s| format!("/{}", decode(s))).collect::<String>();
                    captures.push((name.clone(), rest));
                }

                captures.extend(tail_captures.into_iter().rev());
            }
        }

        Some(captures)
    }

    /// Build the [`Route`] for `path` if it matches this pattern
    pub fn route(&self, verb: Method, path: &str) -> Option<Route> {
        self.capture(path)
            .map(|vars| Route::new(verb, self.source.clone(), path).with_vars(vars))
    }
}

fn decode(segment: &str) -> String {
    percent_decode_str(segment).decode_utf8_lossy().into_owned()
}

fn parse_segments<C, I, A>(segments: I) -> Result<C, String>
where
    I: Iterator<Item = A>,
    A: AsRef<str>,
    C: FromIterator<SegmentMatcher>,
{
    segments
        .filter(|s| !s.as_ref().is_empty())
        .map(|s| SegmentMatcher::new(s.as_ref()))
        .collect()
}

#[derive(Debug)]
enum SegmentMatcher {
    Static { segment: String },
    Variable { name: String },
    Custom { name: String, segment: Regex },
    Wildcard { prefix: Option<String>, suffix: Option<String> },
}

impl SegmentMatcher {
    fn new(segment: &str) -> Result<SegmentMatcher, String> {
        if let Some(name) = segment.strip_prefix(':') {
            if name.is_empty() {
                return Err("No name was provided for a variable segment".to_string());
            }
            Ok(SegmentMatcher::Variable { name: name.to_string() })
        } else if segment.starts_with('{') && segment.ends_with('}') {
            let inner = &segment[1..segment.len() - 1];
            let mut split = inner.splitn(2, ':');
            let name = split.next().unwrap_or_default().trim();
            if name.is_empty() {
                return Err("No name was provided for a variable segment".to_string());
            }

            match split.next() {
                Some(re) => Regex::new(&format!("^(?:{})$", re))
                    .map_err(|e| e.to_string())
                    .map(|segment| SegmentMatcher::Custom {
                        name: name.to_string(),
                        segment,
                    }),
                None => Ok(SegmentMatcher::Variable { name: name.to_string() }),
            }
        } else if segment.contains('*') {
            let mut split = segment.splitn(2, '*');
            Ok(SegmentMatcher::Wildcard {
                prefix: split.next().filter(|s| !s.is_empty()).map(str::to_string),
                suffix: split.next().filter(|s| !s.is_empty()).map(str::to_string),
            })
        } else {
            Ok(SegmentMatcher::Static { segment: segment.to_string() })
        }
    }

    #[inline]
    fn matches(&self, other: &str) -> bool {
        match self {
            SegmentMatcher::Static { segment } => segment == other,
            SegmentMatcher::Variable { .. } => !other.is_empty(),
            SegmentMatcher::Custom { segment, .. } => segment.is_match(&decode(other)),
            SegmentMatcher::Wildcard { prefix, suffix } => {
                prefix.as_deref().map_or(true, |p| other.starts_with(p)) && suffix.as_deref().map_or(true, |s| other.ends_with(s))
            }
        }
    }

    #[inline]
    fn name(&self) -> Option<&str> {
        match self {
            SegmentMatcher::Variable { name } | SegmentMatcher::Custom { name, .. } => Some(name),
            SegmentMatcher::Static { .. } | SegmentMatcher::Wildcard { .. } => None,
        }
    }
}
