//! Request decoration.

use std::{fmt, net::IpAddr};

use cookie::Cookie;
use http::Method;
use hyper::body::Bytes;

use crate::{
    error::{GrenatError, ParamError},
    locale::{Charset, Locale},
    media::MediaType,
    mutant::{Mutant, Params},
    request::Request,
    route::Route,
    scope::RequestScope,
    session::Session,
};

/// A [`Request`] handing every operation to another request.
///
/// On its own it changes nothing; it is meant to be wrapped by decorators
/// which override part of the behavior of a request and forward the rest.
///
/// ```rust
/// # use grenat::prelude::*;
/// # use grenat::http;
/// let raw = http::Request::get("/hello").body(Bytes::new()).unwrap();
/// let req = Forwarding::new(Forwarding::new(HttpRequest::builder().build(raw)));
/// assert_eq!(req.path(), "/hello");
/// assert!(Forwarding::unwrap(&req).delegate().is_none());
/// ```
pub struct Forwarding {
    target: Box<dyn Request>,
}

impl Forwarding {
    pub fn new<R: Request + 'static>(target: R) -> Self {
        Forwarding { target: Box::new(target) }
    }

    pub fn from_boxed(target: Box<dyn Request>) -> Self {
        Forwarding { target }
    }

    /// The request operations are forwarded to
    #[inline]
    pub fn target(&self) -> &dyn Request {
        self.target.as_ref()
    }

    pub fn into_inner(self) -> Box<dyn Request> {
        self.target
    }

    /// Follow the chain of delegates down to the request which forwards to
    /// nothing
    pub fn unwrap(req: &dyn Request) -> &dyn Request {
        let mut current = req;
        while let Some(next) = current.delegate() {
            current = next;
        }
        current
    }
}

impl TryFrom<Option<Box<dyn Request>>> for Forwarding {
    type Error = GrenatError;

    fn try_from(target: Option<Box<dyn Request>>) -> Result<Self, Self::Error> {
        target.map(Forwarding::from_boxed).ok_or(GrenatError::MissingRequest)
    }
}

impl fmt::Debug for Forwarding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.target, f)
    }
}

impl Request for Forwarding {
    fn path(&self) -> &str {
        self.target.path()
    }

    fn verb(&self) -> &Method {
        self.target.verb()
    }

    fn content_type(&self) -> MediaType {
        self.target.content_type()
    }

    fn accept(&self) -> Vec<MediaType> {
        self.target.accept()
    }

    fn accepts(&self, candidates: &[MediaType]) -> Option<MediaType> {
        self.target.accepts(candidates)
    }

    fn params(&self) -> Result<Params, ParamError> {
        self.target.params()
    }

    fn param(&self, name: &str) -> Result<Mutant, ParamError> {
        self.target.param(name)
    }

    fn header(&self, name: &str) -> Mutant {
        self.target.header(name)
    }

    fn headers(&self) -> Params {
        self.target.headers()
    }

    fn cookie(&self, name: &str) -> Option<Cookie<'static>> {
        self.target.cookie(name)
    }

    fn cookies(&self) -> Vec<Cookie<'static>> {
        self.target.cookies()
    }

    fn raw_body(&self) -> &Bytes {
        self.target.raw_body()
    }

    fn scope(&self) -> &RequestScope {
        self.target.scope()
    }

    fn charset(&self) -> Charset {
        self.target.charset()
    }

    fn locale(&self) -> Locale {
        self.target.locale()
    }

    fn locales(&self) -> Vec<Locale> {
        self.target.locales()
    }

    fn length(&self) -> i64 {
        self.target.length()
    }

    fn ip(&self) -> Option<IpAddr> {
        self.target.ip()
    }

    fn hostname(&self) -> String {
        self.target.hostname()
    }

    fn protocol(&self) -> &'static str {
        self.target.protocol()
    }

    fn secure(&self) -> bool {
        self.target.secure()
    }

    fn route(&self) -> &Route {
        self.target.route()
    }

    fn session(&self) -> Session {
        self.target.session()
    }

    fn if_session(&self) -> Option<Session> {
        self.target.if_session()
    }

    fn xhr(&self) -> bool {
        self.target.xhr()
    }

    fn delegate(&self) -> Option<&dyn Request> {
        Some(self.target.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::HttpRequest;

    fn boxed(uri: &str) -> Box<dyn Request> {
        Box::new(HttpRequest::builder().build(http::Request::get(uri).body(Bytes::new()).unwrap()))
    }

    #[test]
    fn missing_target() {
        assert!(matches!(Forwarding::try_from(None::<Box<dyn Request>>), Err(GrenatError::MissingRequest)));
        assert_eq!(Forwarding::try_from(Some(boxed("/a"))).unwrap().path(), "/a");
    }

    fn addr(req: &dyn Request) -> *const () {
        req as *const _ as *const ()
    }

    #[test]
    fn unwrap_walks_the_chain() {
        let inner = boxed("/a");
        let inner_addr = addr(&*inner);

        let req = Forwarding::new(Forwarding::from_boxed(inner));
        assert!(req.delegate().is_some());
        assert_eq!(addr(Forwarding::unwrap(&req)), inner_addr);
        assert!(Forwarding::unwrap(&req).delegate().is_none());

        let plain = boxed("/b");
        assert_eq!(addr(Forwarding::unwrap(&*plain)), addr(&*plain));
    }

    #[test]
    fn debug_is_the_target() {
        let req = Forwarding::from_boxed(boxed("/a?b=c"));
        assert_eq!(format!("{:?}", req), format!("{:?}", req.target()));
        assert!(format!("{:?}", req).starts_with("HttpRequest"));
    }
}
