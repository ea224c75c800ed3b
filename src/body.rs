//! Request body loading and decoding.

use std::ops::{Deref, DerefMut};

use http_body::Body as HttpBody;
use hyper::body::Buf;
pub use hyper::body::Bytes;
use serde::de::DeserializeOwned;

use crate::{
    error::{BodyError, BoxError},
    locale::Charset,
    media::MediaType,
};

const MAX_PREALLOCATION: usize = 2 * 1024 * 1024;

/// Read a whole body in memory, failing once more than `limit` bytes came in
pub async fn load<B>(mut body: B, limit: Option<usize>) -> Result<Bytes, BodyError>
where
    B: HttpBody + Unpin,
    B::Error: Into<BoxError>,
{
    let first = if let Some(buf) = body.data().await.transpose().map_err(BodyError::read)? {
        to_bytes(buf)
    } else {
        return Ok(Bytes::new());
    };
    check_limit(first.len(), limit)?;

    let second = if let Some(buf) = body.data().await.transpose().map_err(BodyError::read)? {
        to_bytes(buf)
    } else {
        return Ok(first);
    };

    // the size hint comes from the client, never allocate more than the limit
    let hint = usize::try_from(body.size_hint().lower()).unwrap_or(usize::MAX);
    let cap = first
        .len()
        .saturating_add(second.len())
        .saturating_add(hint)
        .min(limit.unwrap_or(usize::MAX))
        .min(MAX_PREALLOCATION);
    let mut vec = Vec::with_capacity(cap);
    vec.extend_from_slice(first.as_ref());
    vec.extend_from_slice(second.as_ref());
    check_limit(vec.len(), limit)?;

    while let Some(mut buf) = body.data().await.transpose().map_err(BodyError::read)? {
        while buf.has_remaining() {
            let chunk = buf.chunk();
            let len = chunk.len();
            vec.extend_from_slice(chunk);
            buf.advance(len);
        }
        check_limit(vec.len(), limit)?;
    }

    Ok(vec.into())
}

fn to_bytes<T: Buf>(mut buf: T) -> Bytes {
    let len = buf.remaining();
    buf.copy_to_bytes(len)
}

#[inline]
fn check_limit(len: usize, limit: Option<usize>) -> Result<(), BodyError> {
    match limit {
        Some(limit) if len > limit => Err(BodyError::TooLarge { limit }),
        _ => Ok(()),
    }
}

/// Decode a loaded body into a value
///
/// The declared content type and charset are handed to the decoder, the
/// ones of the request when decoding through
/// [`RequestExt::body`](crate::request::RequestExt::body).
pub trait FromBody: Sized {
    fn from_body(body: &Bytes, content_type: &MediaType, charset: &Charset) -> Result<Self, BodyError>;
}

impl FromBody for Bytes {
    #[inline]
    fn from_body(body: &Bytes, _: &MediaType, _: &Charset) -> Result<Self, BodyError> {
        Ok(body.clone())
    }
}

impl FromBody for Vec<u8> {
    #[inline]
    fn from_body(body: &Bytes, _: &MediaType, _: &Charset) -> Result<Self, BodyError> {
        Ok(body.to_vec())
    }
}

impl FromBody for String {
    fn from_body(body: &Bytes, _: &MediaType, charset: &Charset) -> Result<Self, BodyError> {
        if charset.is_utf8() || charset == &Charset::US_ASCII {
            Ok(String::from_utf8(body.to_vec())?)
        } else if charset == &Charset::ISO_8859_1 {
            // latin-1 bytes are the first 256 code points
            Ok(body.iter().map(|&b| char::from(b)).collect())
        } else {
            Err(BodyError::UnsupportedCharset(charset.to_string()))
        }
    }
}

macro_rules! body_wrapper {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(Debug)]
        pub struct $name<T>(pub T);

        impl<T> $name<T> {
            pub fn into_inner(self) -> T {
                self.0
            }
        }

        impl<T> Deref for $name<T> {
            type Target = T;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl<T> DerefMut for $name<T> {
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.0
            }
        }

        impl<T> AsRef<T> for $name<T> {
            fn as_ref(&self) -> &T {
                &self.0
            }
        }
    };
}

#[cfg(feature = "json")]
body_wrapper! {
    /// A json body, whatever the declared content type
    #[cfg_attr(docsrs, doc(cfg(feature = "json")))]
    Json
}

body_wrapper! {
    /// A `application/x-www-form-urlencoded` body, whatever the declared
    /// content type
    Form
}

body_wrapper! {
    /// A body decoded by the reader matching its declared content type, json
    /// or urlencoded form
    Payload
}

#[cfg(feature = "json")]
impl<T: DeserializeOwned> FromBody for Json<T> {
    fn from_body(body: &Bytes, _: &MediaType, _: &Charset) -> Result<Self, BodyError> {
        Ok(Json(serde_json::from_slice(body.as_ref())?))
    }
}

impl<T: DeserializeOwned> FromBody for Form<T> {
    fn from_body(body: &Bytes, _: &MediaType, _: &Charset) -> Result<Self, BodyError> {
        Ok(Form(serde_urlencoded::from_bytes(body.as_ref())?))
    }
}

impl<T: DeserializeOwned> FromBody for Payload<T> {
    fn from_body(body: &Bytes, content_type: &MediaType, _: &Charset) -> Result<Self, BodyError> {
        #[cfg(feature = "json")]
        {
            if content_type.is_json() {
                return Ok(Payload(serde_json::from_slice(body.as_ref())?));
            }
        }

        if content_type.is_form() {
            return Ok(Payload(serde_urlencoded::from_bytes(body.as_ref())?));
        }

        Err(BodyError::NoReader {
            content_type: content_type.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_derive::Deserialize;

    #[derive(Deserialize, Debug, PartialEq)]
    struct User {
        name: String,
        age: u8,
    }

    fn decode<T: FromBody>(body: &'static [u8], content_type: &str) -> Result<T, BodyError> {
        T::from_body(&Bytes::from_static(body), &content_type.parse::<MediaType>().unwrap(), &Charset::UTF_8)
    }

    mod loading {
        use super::*;
        use futures::stream;
        use http::HeaderMap;
        use http_body::SizeHint;
        use std::{
            collections::VecDeque,
            convert::Infallible,
            pin::Pin,
            task::{Context, Poll},
        };

        fn chunked(chunks: Vec<&'static str>) -> hyper::Body {
            hyper::Body::wrap_stream(stream::iter(chunks.into_iter().map(Ok::<_, std::io::Error>)))
        }

        #[tokio::test]
        async fn reads_every_chunk() {
            let bytes = load(chunked(vec!["ab", "cd", "ef"]), None).await.unwrap();
            assert_eq!(bytes, Bytes::from_static(b"abcdef"));
            assert!(load(hyper::Body::empty(), Some(0)).await.unwrap().is_empty());
            assert_eq!(load(hyper::Body::from("single"), Some(6)).await.unwrap(), Bytes::from_static(b"single"));
        }

        struct Declared {
            chunks: VecDeque<Bytes>,
            declared: u64,
        }

        impl HttpBody for Declared {
            type Data = Bytes;
            type Error = Infallible;

            fn poll_data(mut self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Option<Result<Bytes, Infallible>>> {
                Poll::Ready(self.chunks.pop_front().map(Ok))
            }

            fn poll_trailers(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<Option<HeaderMap>, Infallible>> {
                Poll::Ready(Ok(None))
            }

            fn size_hint(&self) -> SizeHint {
                SizeHint::with_exact(self.declared)
            }
        }

        fn declared(declared: u64) -> Declared {
            Declared {
                chunks: VecDeque::from(vec![Bytes::from_static(b"ab"), Bytes::from_static(b"cd")]),
                declared,
            }
        }

        #[tokio::test]
        async fn huge_size_hint() {
            assert_eq!(load(declared(u64::MAX - 3), Some(1024)).await.unwrap(), Bytes::from_static(b"abcd"));
            assert_eq!(load(declared(u64::MAX), None).await.unwrap(), Bytes::from_static(b"abcd"));
        }

        #[tokio::test]
        async fn enforces_limit() {
            assert!(matches!(
                load(chunked(vec!["ab", "cd", "ef"]), Some(5)).await,
                Err(BodyError::TooLarge { limit: 5 })
            ));
            assert!(matches!(
                load(hyper::Body::from("too long"), Some(3)).await,
                Err(BodyError::TooLarge { limit: 3 })
            ));
            assert_eq!(load(chunked(vec!["ab", "cd"]), Some(4)).await.unwrap().len(), 4);
        }
    }

    #[test]
    fn text() {
        assert_eq!(decode::<String>(b"hello", "text/plain").unwrap(), "hello");
        assert!(matches!(decode::<String>(b"\xff", "text/plain"), Err(BodyError::Utf8(_))));

        let body = Bytes::from_static(b"caf\xe9");
        let latin = String::from_body(&body, &MediaType::plain(), &Charset::ISO_8859_1).unwrap();
        assert_eq!(latin, "café");
        assert!(matches!(
            String::from_body(&body, &MediaType::plain(), &Charset::new("EBCDIC")),
            Err(BodyError::UnsupportedCharset(_))
        ));
    }

    #[test]
    fn wrappers_are_debug() {
        let form = decode::<Form<User>>(b"name=bob&age=42", "*/*").unwrap();
        assert_eq!(format!("{:?}", form), r#"Form(User { name: "bob", age: 42 })"#);
    }

    #[test]
    fn raw() {
        assert_eq!(decode::<Vec<u8>>(b"\x00\x01", "image/png").unwrap(), vec![0, 1]);
        assert_eq!(decode::<Bytes>(b"abc", "*/*").unwrap(), Bytes::from_static(b"abc"));
    }

    #[test]
    fn form() {
        let Form(user) = decode::<Form<User>>(b"name=bob&age=42", "text/plain").unwrap();
        assert_eq!(user, User { name: "bob".into(), age: 42 });
        assert!(matches!(decode::<Form<User>>(b"name=bob", "*/*"), Err(BodyError::Form(_))));
    }

    #[cfg(feature = "json")]
    #[test]
    fn json() {
        let user = decode::<Json<User>>(br#"{"name":"bob","age":42}"#, "*/*").unwrap();
        assert_eq!(user.name, "bob");
        assert_eq!(user.into_inner().age, 42);
        assert!(matches!(decode::<Json<User>>(b"{", "application/json"), Err(BodyError::Json(_))));
    }

    #[test]
    fn payload_picks_reader() {
        let expected = User { name: "bob".into(), age: 42 };

        let form = decode::<Payload<User>>(b"name=bob&age=42", "application/x-www-form-urlencoded").unwrap();
        assert_eq!(*form, expected);

        #[cfg(feature = "json")]
        {
            let json = decode::<Payload<User>>(br#"{"name":"bob","age":42}"#, "application/vnd.api+json").unwrap();
            assert_eq!(json.into_inner(), expected);
        }

        assert!(matches!(
            decode::<Payload<User>>(b"name=bob&age=42", "text/plain"),
            Err(BodyError::NoReader { ref content_type }) if content_type == "text/plain"
        ));
    }
}
