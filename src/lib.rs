//! # Grenat
//!
//! The request side of an async HTTP framework, built over `hyper` and
//! `http`.
//!
//! The [`Request`](request::Request) trait is what handlers see of an
//! in-flight request: path and verb, headers, parameters, cookies, body,
//! session, locale and charset, plus content negotiation through
//! [`accepts`](request::Request::accepts). The hosting server builds an
//! [`HttpRequest`](request::HttpRequest) per exchange and hands it out as a
//! `dyn Request`; decorators wrap it in a
//! [`Forwarding`](forwarding::Forwarding) and override what they need.
//!
//! Values living for the duration of a request are bound in its
//! [`RequestScope`](scope::RequestScope), populated by
//! [`RequestModule`](scope::RequestModule)s.
//!
//! ```rust
//! use grenat::prelude::*;
//! use grenat::{http, route::RoutePattern};
//!
//! let raw = http::Request::get("/path/jooby?name=rocks")
//!     .header("Accept", "text/*;q=0.5, application/json")
//!     .body(Bytes::new())
//!     .unwrap();
//! let route = RoutePattern::new("/path/:name").unwrap().route(Method::GET, "/path/jooby").unwrap();
//! let req = HttpRequest::builder().route(route).build(raw);
//!
//! let name = req.param("name").unwrap();
//! assert_eq!(name.first(), Some("jooby"));
//! assert_eq!(name.values(), &["jooby".to_string(), "rocks".to_string()]);
//! assert_eq!(req.accepts(&[MediaType::html(), MediaType::json()]), Some(MediaType::json()));
//! ```
//!
//! ## Features
//!
//! * `json` (default): json body decoding with `Json<T>` and `Payload<T>`
//! * `multipart`: text fields of `multipart/form-data` bodies as parameters

#![cfg_attr(docsrs, feature(doc_cfg))]

#[macro_use]
extern crate log;

pub mod body;
pub mod config;
pub mod error;
mod form;
pub mod forwarding;
pub mod locale;
pub mod media;
pub mod mutant;
pub mod request;
pub mod route;
pub mod scope;
pub mod session;

pub use cookie;
pub use http;
pub use hyper;

/// Contains everything you need to handle requests
pub mod prelude {
    ///
    pub use crate::body::Bytes;
    ///
    pub use crate::body::Form;
    ///
    #[cfg(feature = "json")]
    pub use crate::body::Json;
    ///
    pub use crate::body::Payload;
    ///
    pub use crate::config::RequestConfig;
    ///
    pub use crate::error::GrenatError;
    ///
    pub use crate::forwarding::Forwarding;
    ///
    pub use crate::locale::{Charset, Locale};
    ///
    pub use crate::media::MediaType;
    ///
    pub use crate::mutant::{Mutant, Params};
    ///
    pub use crate::request::{HttpRequest, Request, RequestExt};
    ///
    pub use crate::route::Route;
    ///
    pub use crate::scope::{Key, RequestModule, RequestScope};
    ///
    pub use crate::session::{MemoryStore, Session, SessionStore};
    ///
    pub use cookie::Cookie;
    ///
    pub use http::header;
    ///
    pub use http::Method;
    ///
    pub use http::StatusCode;
}
