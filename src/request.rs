//! The request contract and its implementation over [`http::Request`].

use std::{
    fmt,
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use cookie::{Cookie, CookieJar};
use http::{header, uri::Scheme, HeaderMap, Method, Version};
use http_body::Body as HttpBody;
use hyper::body::Bytes;
use once_cell::sync::OnceCell;

use crate::{
    body::{self, FromBody},
    config::RequestConfig,
    error::{BodyError, BoxError, ParamError},
    form,
    locale::{Charset, Locale},
    media::{self, MediaType},
    mutant::{self, Mutant, Params},
    route::Route,
    scope::{Key, RequestModule, RequestScope},
    session::{MemoryStore, Session, SessionStore},
};

/// An in-flight HTTP request, as seen by the code handling it.
///
/// Every operation is a query, except [`session`](Request::session) which
/// creates a session when the request has none. The trait is object safe:
/// requests travel as `&dyn Request` or `Box<dyn Request>`, generic helpers
/// live on [`RequestExt`].
pub trait Request: Send + Sync + fmt::Debug {
    /// The request path, as matched by the route
    fn path(&self) -> &str {
        self.route().path()
    }

    fn verb(&self) -> &Method {
        self.route().verb()
    }

    /// The declared `Content-Type`, `*/*` when absent
    fn content_type(&self) -> MediaType;

    /// Media types the client accepts, most preferred first. `*/*` when the
    /// client sent no `Accept` header.
    fn accept(&self) -> Vec<MediaType>;

    /// Pick, among `candidates`, the media type the client prefers. `None`
    /// when none of them is acceptable.
    ///
    /// With `Accept: text/*;q=0.5, application/json`, asking for
    /// `[text/html, application/json]` gives `application/json`. When the
    /// client likes several candidates equally, the first one wins.
    fn accepts(&self, candidates: &[MediaType]) -> Option<MediaType> {
        media::negotiate(&self.accept(), candidates)
    }

    /// Every parameter of the request. Path variables come first, then the
    /// query string, then the form body.
    fn params(&self) -> Result<Params, ParamError>;

    /// A single parameter, with the same ordering as
    /// [`params`](Request::params). Empty when the request doesn't have it.
    fn param(&self, name: &str) -> Result<Mutant, ParamError>;

    /// Header values, name is case insensitive
    fn header(&self, name: &str) -> Mutant;

    /// Every header, keyed by lowercase name
    fn headers(&self) -> Params;

    fn cookie(&self, name: &str) -> Option<Cookie<'static>>;

    fn cookies(&self) -> Vec<Cookie<'static>>;

    /// The body as received. Use [`RequestExt::body`] to decode it.
    fn raw_body(&self) -> &Bytes;

    /// Values scoped to this request
    fn scope(&self) -> &RequestScope;

    /// Charset declared by the `Content-Type`, the configured default
    /// otherwise
    fn charset(&self) -> Charset;

    fn locale(&self) -> Locale {
        self.locales().into_iter().next().unwrap_or_default()
    }

    /// Languages of `Accept-Language` by preference, the configured default
    /// when there is none
    fn locales(&self) -> Vec<Locale>;

    /// Value of `Content-Length`, `-1` when unknown
    fn length(&self) -> i64;

    /// Address of the client, when the server knows it
    fn ip(&self) -> Option<IpAddr>;

    /// Host the client addressed, without port
    fn hostname(&self) -> String;

    /// `HTTP/1.1`, `HTTP/2.0`...
    fn protocol(&self) -> &'static str;

    fn secure(&self) -> bool;

    fn route(&self) -> &Route;

    /// The session of the request, created (and saved) when there is none
    fn session(&self) -> Session;

    /// The session of the request, if it already has one
    fn if_session(&self) -> Option<Session>;

    /// True when `X-Requested-With` is `XMLHttpRequest`
    fn xhr(&self) -> bool {
        self.header("X-Requested-With")
            .first()
            .map_or(false, |v| v.eq_ignore_ascii_case("XMLHttpRequest"))
    }

    /// The request this one forwards to, if any
    fn delegate(&self) -> Option<&dyn Request> {
        None
    }
}

/// Generic helpers over any [`Request`], trait objects included
pub trait RequestExt: Request {
    /// Decode the body
    ///
    /// ```rust
    /// # use grenat::prelude::*;
    /// # use grenat::http;
    /// # use std::collections::HashMap;
    /// let raw = http::Request::post("/login")
    ///     .header("Content-Type", "application/x-www-form-urlencoded")
    ///     .body(Bytes::from_static(b"user=bob"))
    ///     .unwrap();
    /// let req = HttpRequest::builder().build(raw);
    /// let Form(login) = req.body::<Form<HashMap<String, String>>>().unwrap();
    /// assert_eq!(login["user"], "bob");
    /// ```
    fn body<T: FromBody>(&self) -> Result<T, BodyError> {
        T::from_body(self.raw_body(), &self.content_type(), &self.charset())
    }

    fn instance<T>(&self) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.scope().get(&Key::<T>::get())
    }

    fn named_instance<T>(&self, name: &'static str) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.scope().get(&Key::<T>::named(name))
    }

    fn instance_of<T>(&self, key: &Key<T>) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.scope().get(key)
    }

    /// Same as [`Request::accepts`], candidates being written as strings.
    /// Candidates which aren't media types are ignored.
    fn accepts_str(&self, candidates: &[&str]) -> Option<MediaType> {
        let candidates = candidates
            .iter()
            .filter_map(|c| match c.parse::<MediaType>() {
                Ok(t) => Some(t),
                Err(e) => {
                    warn!("Ignoring invalid media type candidate `{}`: {}", c, e);
                    None
                }
            })
            .collect::<Vec<_>>();
        self.accepts(&candidates)
    }

    fn accepts_one<T: Into<MediaType>>(&self, candidate: T) -> Option<MediaType> {
        self.accepts(&[candidate.into()])
    }
}

impl<R: Request + ?Sized> RequestExt for R {}

/// A [`Request`] over an [`http::Request`] whose body is in memory
pub struct HttpRequest {
    inner: http::Request<Bytes>,
    route: Route,
    config: Arc<RequestConfig>,
    peer_addr: Option<SocketAddr>,
    secure: bool,
    sessions: Arc<dyn SessionStore>,
    scope: RequestScope,
    content_type: OnceCell<MediaType>,
    query: OnceCell<Vec<(String, String)>>,
    form: OnceCell<Vec<(String, String)>>,
    cookies: OnceCell<CookieJar>,
    session: OnceCell<Session>,
}

impl HttpRequest {
    pub fn builder() -> HttpRequestBuilder {
        HttpRequestBuilder::default()
    }

    /// Access the underlying request
    #[inline]
    pub fn raw(&self) -> &http::Request<Bytes> {
        &self.inner
    }

    #[inline]
    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Return the Peer SocketAddr if one was available when receiving the
    /// request
    #[inline]
    pub fn peer_addr(&self) -> Option<&SocketAddr> {
        self.peer_addr.as_ref()
    }

    fn query(&self) -> Result<&[(String, String)], ParamError> {
        self.query
            .get_or_try_init(|| match self.inner.uri().query() {
                Some(query) => {
                    trace!("Parsing query string of {}", self);
                    serde_urlencoded::from_str::<Vec<(String, String)>>(query)
                        .map_err(|e| ParamError::MalformedQuery(e.to_string()))
                }
                None => Ok(Vec::new()),
            })
            .map(Vec::as_slice)
    }

    fn form(&self) -> Result<&[(String, String)], ParamError> {
        self.form
            .get_or_try_init(|| {
                trace!("Reading form parameters of {}", self);
                form::parse(&self.content_type(), self.inner.body())
            })
            .map(Vec::as_slice)
    }

    fn param_pairs(&self) -> Result<impl Iterator<Item = (&str, &str)>, ParamError> {
        let path = self.route.vars().iter();
        let query = self.query()?.iter();
        let form = self.form()?.iter();
        Ok(path.chain(query).chain(form).map(|(n, v)| (n.as_str(), v.as_str())))
    }

    fn cookie_jar(&self) -> &CookieJar {
        self.cookies.get_or_init(|| {
            let mut jar = CookieJar::new();
            self.inner
                .headers()
                .get_all(header::COOKIE)
                .iter()
                .filter_map(|cookies| cookies.to_str().ok())
                .flat_map(|cookies| cookies.split(';'))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .filter_map(|cookie_s| match Cookie::parse(cookie_s.to_string()) {
                    Ok(c) => Some(c),
                    Err(e) => {
                        debug!("Ignoring invalid cookie `{}`: {}", cookie_s, e);
                        None
                    }
                })
                .for_each(|c| jar.add_original(c));
            jar
        })
    }

    fn stored_session(&self) -> Option<Session> {
        let cookie = self.cookie(self.config.session_cookie())?;
        let session = self.sessions.get(cookie.value())?;
        session.touch();
        Some(session)
    }
}

fn header_values<'a>(headers: &'a HeaderMap, name: header::HeaderName) -> impl Iterator<Item = &'a str> {
    headers.get_all(name).into_iter().filter_map(|v| v.to_str().ok())
}

impl Request for HttpRequest {
    fn content_type(&self) -> MediaType {
        self.content_type
            .get_or_init(|| {
                let declared = match self.inner.headers().get(header::CONTENT_TYPE) {
                    Some(value) => value,
                    None => return MediaType::any(),
                };

                match declared.to_str().ok().map(str::parse::<MediaType>) {
                    Some(Ok(t)) => t,
                    _ => {
                        debug!("Invalid content type {:?}, using */*", declared);
                        MediaType::any()
                    }
                }
            })
            .clone()
    }

    fn accept(&self) -> Vec<MediaType> {
        let header = header_values(self.inner.headers(), header::ACCEPT).collect::<Vec<_>>().join(",");
        let accept = MediaType::parse_list(&header);
        if accept.is_empty() {
            vec![MediaType::any()]
        } else {
            accept
        }
    }

    fn params(&self) -> Result<Params, ParamError> {
        Ok(mutant::collect(self.param_pairs()?))
    }

    fn param(&self, name: &str) -> Result<Mutant, ParamError> {
        let values = self
            .param_pairs()?
            .filter(|(n, _)| *n == name)
            .map(|(_, v)| v.to_owned())
            .collect();
        Ok(Mutant::new(name, values))
    }

    fn header(&self, name: &str) -> Mutant {
        let values = self
            .inner
            .headers()
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_owned)
            .collect();
        Mutant::new(name, values)
    }

    fn headers(&self) -> Params {
        mutant::collect(self.inner.headers().iter().filter_map(|(name, value)| match value.to_str() {
            Ok(value) => Some((name.as_str(), value)),
            Err(_) => {
                debug!("Skipping non visible ascii value of header {}", name);
                None
            }
        }))
    }

    fn cookie(&self, name: &str) -> Option<Cookie<'static>> {
        self.cookie_jar().get(name).cloned()
    }

    fn cookies(&self) -> Vec<Cookie<'static>> {
        self.cookie_jar().iter().cloned().collect()
    }

    #[inline]
    fn raw_body(&self) -> &Bytes {
        self.inner.body()
    }

    #[inline]
    fn scope(&self) -> &RequestScope {
        &self.scope
    }

    fn charset(&self) -> Charset {
        match self.content_type().charset() {
            Some(charset) => Charset::new(charset),
            None => self.config.default_charset().clone(),
        }
    }

    fn locales(&self) -> Vec<Locale> {
        let header = header_values(self.inner.headers(), header::ACCEPT_LANGUAGE).collect::<Vec<_>>().join(",");
        let locales = Locale::parse_accept_language(&header);
        if locales.is_empty() {
            vec![self.config.default_locale().clone()]
        } else {
            locales
        }
    }

    fn length(&self) -> i64 {
        self.inner
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(-1)
    }

    fn ip(&self) -> Option<IpAddr> {
        self.peer_addr.map(|addr| addr.ip())
    }

    fn hostname(&self) -> String {
        let host = self.inner.headers().get(header::HOST).and_then(|v| v.to_str().ok()).map(|host| {
            if host.starts_with('[') {
                // [::1]:8080
                host.split_inclusive(']').next().unwrap_or(host)
            } else {
                host.split(':').next().unwrap_or(host)
            }
        });

        match host.filter(|h| !h.is_empty()).or_else(|| self.inner.uri().host()) {
            Some(host) => host.to_string(),
            None => self.ip().map_or_else(|| "localhost".to_string(), |ip| ip.to_string()),
        }
    }

    fn protocol(&self) -> &'static str {
        match self.inner.version() {
            Version::HTTP_09 => "HTTP/0.9",
            Version::HTTP_10 => "HTTP/1.0",
            Version::HTTP_2 => "HTTP/2.0",
            Version::HTTP_3 => "HTTP/3.0",
            _ => "HTTP/1.1",
        }
    }

    fn secure(&self) -> bool {
        self.secure || self.inner.uri().scheme() == Some(&Scheme::HTTPS)
    }

    #[inline]
    fn route(&self) -> &Route {
        &self.route
    }

    fn session(&self) -> Session {
        self.session
            .get_or_init(|| match self.stored_session() {
                Some(session) => session,
                None => {
                    let session = Session::new(self.sessions.generate_id());
                    self.sessions.save(&session);
                    debug!("Created session {} for {}", session.id(), self);
                    session
                }
            })
            .clone()
    }

    fn if_session(&self) -> Option<Session> {
        if let Some(session) = self.session.get() {
            return Some(session.clone());
        }

        let session = self.stored_session()?;
        Some(self.session.get_or_init(|| session).clone())
    }
}

impl fmt::Display for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.inner.method(), self.inner.uri().path())
    }
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRequest")
            .field("verb", self.inner.method())
            .field("uri", self.inner.uri())
            .field("version", &self.inner.version())
            .field("route", &self.route.pattern())
            .field("peer_addr", &self.peer_addr)
            .field("body", &self.inner.body().len())
            .finish()
    }
}

/// Assemble an [`HttpRequest`] from what the server knows about it
#[derive(Default)]
pub struct HttpRequestBuilder {
    config: Option<Arc<RequestConfig>>,
    route: Option<Route>,
    peer_addr: Option<SocketAddr>,
    secure: bool,
    sessions: Option<Arc<dyn SessionStore>>,
    modules: Vec<Arc<dyn RequestModule>>,
    scope: Option<RequestScope>,
}

impl HttpRequestBuilder {
    pub fn config<C: Into<Arc<RequestConfig>>>(mut self, config: C) -> Self {
        self.config = Some(config.into());
        self
    }

    /// The route which matched the request. Without one, the route is the
    /// request path itself.
    pub fn route(mut self, route: Route) -> Self {
        self.route = Some(route);
        self
    }

    pub fn peer_addr(mut self, addr: SocketAddr) -> Self {
        self.peer_addr = Some(addr);
        self
    }

    /// Whether the request came over a secure transport
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Session storage, in memory when not set
    pub fn sessions(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.sessions = Some(store);
        self
    }

    /// Add a module which populates the scope of the request
    pub fn module(mut self, module: Arc<dyn RequestModule>) -> Self {
        self.modules.push(module);
        self
    }

    /// Start from an existing scope rather than an empty one
    pub fn scope(mut self, scope: RequestScope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn build(self, raw: http::Request<Bytes>) -> HttpRequest {
        let HttpRequestBuilder {
            config,
            route,
            peer_addr,
            secure,
            sessions,
            modules,
            scope,
        } = self;

        let mut scope = scope.unwrap_or_default();
        for module in &modules {
            module.configure(&mut scope);
        }

        let route = route.unwrap_or_else(|| Route::new(raw.method().clone(), raw.uri().path(), raw.uri().path()));

        HttpRequest {
            inner: raw,
            route,
            config: config.unwrap_or_default(),
            peer_addr,
            secure,
            sessions: sessions.unwrap_or_else(|| Arc::new(MemoryStore::new())),
            scope,
            content_type: OnceCell::new(),
            query: OnceCell::new(),
            form: OnceCell::new(),
            cookies: OnceCell::new(),
            session: OnceCell::new(),
        }
    }

    /// Read the body of `raw`, up to the configured limit, then build the
    /// request
    pub async fn load<B>(mut self, raw: http::Request<B>) -> Result<HttpRequest, BodyError>
    where
        B: HttpBody + Unpin,
        B::Error: Into<BoxError>,
    {
        let config = self.config.take().unwrap_or_default();
        let (parts, raw_body) = raw.into_parts();
        let bytes = body::load(raw_body, config.body_limit()).await?;
        Ok(self.config(config).build(http::Request::from_parts(parts, bytes)))
    }
}
