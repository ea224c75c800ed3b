//! Settings shared by every request of a server.

use crate::locale::{Charset, Locale};

/// Default maximum size of a loaded request body is 2 MiB
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;
/// Default name of the cookie carrying the session id
pub const DEFAULT_SESSION_COOKIE: &str = "grenat.sid";

#[derive(Clone, Debug)]
pub struct RequestConfig {
    default_charset: Charset,
    default_locale: Locale,
    body_limit: Option<usize>,
    session_cookie: String,
}

impl RequestConfig {
    #[inline]
    pub fn builder() -> RequestConfigBuilder {
        RequestConfigBuilder::new()
    }

    /// Charset used when a request doesn't declare one
    #[inline]
    pub fn default_charset(&self) -> &Charset {
        &self.default_charset
    }

    /// Locale used when a request has no usable `Accept-Language`
    #[inline]
    pub fn default_locale(&self) -> &Locale {
        &self.default_locale
    }

    /// Maximum number of body bytes read, `None` when unlimited
    #[inline]
    pub fn body_limit(&self) -> Option<usize> {
        self.body_limit
    }

    #[inline]
    pub fn session_cookie(&self) -> &str {
        &self.session_cookie
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        RequestConfigBuilder::new().build()
    }
}

#[derive(Default)]
pub struct RequestConfigBuilder {
    default_charset: Option<Charset>,
    default_locale: Option<Locale>,
    body_limit: Option<Option<usize>>,
    session_cookie: Option<String>,
}

impl RequestConfigBuilder {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn default_charset(mut self, charset: Charset) -> Self {
        self.default_charset = Some(charset);
        self
    }

    #[inline]
    pub fn default_locale(mut self, locale: Locale) -> Self {
        self.default_locale = Some(locale);
        self
    }

    /// Set the maximum number of body bytes read, `None` to lift the limit
    #[inline]
    pub fn body_limit(mut self, limit: Option<usize>) -> Self {
        self.body_limit = Some(limit);
        self
    }

    #[inline]
    pub fn session_cookie(mut self, name: &str) -> Self {
        self.session_cookie = Some(name.to_string());
        self
    }

    pub fn build(self) -> RequestConfig {
        let RequestConfigBuilder {
            default_charset,
            default_locale,
            body_limit,
            session_cookie,
        } = self;

        RequestConfig {
            default_charset: default_charset.unwrap_or_default(),
            default_locale: default_locale.unwrap_or_default(),
            body_limit: body_limit.unwrap_or(Some(DEFAULT_BODY_LIMIT)),
            session_cookie: session_cookie.unwrap_or_else(|| DEFAULT_SESSION_COOKIE.to_string()),
        }
    }
}
