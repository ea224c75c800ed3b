#[macro_use]
extern crate serde_derive;

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use grenat::{
    error::{BodyError, ParamError},
    http,
    prelude::*,
    route::RoutePattern,
};

fn raw(builder: http::request::Builder, body: &'static str) -> http::Request<Bytes> {
    builder.body(Bytes::from_static(body.as_bytes())).unwrap()
}

fn get(uri: &str) -> HttpRequest {
    HttpRequest::builder().build(raw(http::Request::get(uri), ""))
}

fn routed(pattern: &str, builder: http::request::Builder, body: &'static str) -> HttpRequest {
    let raw = raw(builder, body);
    let route = RoutePattern::new(pattern)
        .unwrap()
        .route(raw.method().clone(), raw.uri().path())
        .unwrap();
    HttpRequest::builder().route(route).build(raw)
}

#[derive(Deserialize, Debug, PartialEq)]
struct Login {
    user: String,
    remember: bool,
}

mod params {
    use super::*;

    #[test]
    fn path_then_query() {
        let req = routed("/path/:name", http::Request::get("/path/jooby?name=rocks"), "");
        assert_eq!(req.path(), "/path/jooby");
        assert_eq!(req.route().pattern(), "/path/:name");

        let name = req.param("name").unwrap();
        assert_eq!(name.first(), Some("jooby"));
        assert_eq!(name.values(), &["jooby".to_string(), "rocks".to_string()]);
    }

    #[test]
    fn path_then_query_then_body() {
        let req = routed(
            "/users/:id",
            http::Request::post("/users/1?id=2&page=3").header("Content-Type", "application/x-www-form-urlencoded"),
            "id=4&nick=bob",
        );

        let params = req.params().unwrap();
        assert_eq!(params.len(), 3);
        assert_eq!(params["id"].to_list::<u32>().unwrap(), vec![1, 2, 4]);
        assert_eq!(params["page"].to::<u32>().unwrap(), 3);
        assert_eq!(params["nick"].first(), Some("bob"));
    }

    #[test]
    fn absent_param_is_empty() {
        let req = get("/");
        let missing = req.param("nope").unwrap();
        assert!(!missing.is_set());
        assert_eq!(missing.name(), "nope");
        assert!(req.params().unwrap().is_empty());
    }

    #[test]
    fn non_form_bodies_carry_no_param() {
        let req = routed(
            "/",
            http::Request::post("/?a=1").header("Content-Type", "application/json"),
            r#"{"a":2}"#,
        );
        assert_eq!(req.param("a").unwrap().values(), &["1".to_string()]);
    }

    #[test]
    fn malformed_form_body() {
        let raw = http::Request::post("/")
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(Bytes::from_static(b"a=\xff\xfe"))
            .unwrap();
        let req = HttpRequest::builder().build(raw);

        assert!(matches!(req.params(), Err(ParamError::MalformedBody(_))));
        let err = GrenatError::from(req.param("a").unwrap_err());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}

mod negotiation {
    use super::*;

    fn accepting(accept: &str) -> HttpRequest {
        HttpRequest::builder().build(raw(http::Request::get("/").header("Accept", accept), ""))
    }

    #[test]
    fn prefers_quality() {
        let req = accepting("text/*;q=0.5, application/json");
        assert_eq!(req.accepts(&[MediaType::html(), MediaType::json()]), Some(MediaType::json()));
        assert_eq!(req.accepts_str(&["text/html", "application/json"]), Some(MediaType::json()));
    }

    #[test]
    fn exact_match() {
        let req = accepting("text/html");
        assert_eq!(req.accepts(&[MediaType::html()]), Some(MediaType::html()));
        assert_eq!(req.accepts_str(&["image/png"]), None);
        assert_eq!(req.accepts_one(mime::IMAGE_PNG), None);
    }

    #[test]
    fn no_accept_header() {
        let req = get("/");
        assert_eq!(req.accept(), vec![MediaType::any()]);
        assert_eq!(req.accepts_str(&["image/png", "text/html"]), Some(mime::IMAGE_PNG.into()));
    }

    #[test]
    fn invalid_candidates_are_skipped() {
        let _ = env_logger::builder().is_test(true).try_init();
        let req = accepting("application/json");
        assert_eq!(req.accepts_str(&["not a type", "application/json"]), Some(MediaType::json()));
    }

    #[test]
    fn content_type() {
        let req = routed("/", http::Request::post("/").header("Content-Type", "application/json"), "{}");
        assert!(req.content_type().is_json());
        assert!(get("/").content_type().is_any());
    }
}

mod headers {
    use super::*;

    #[test]
    fn xhr() {
        let xhr = |value: Option<&str>| {
            let mut builder = http::Request::get("/");
            if let Some(value) = value {
                builder = builder.header("X-Requested-With", value);
            }
            HttpRequest::builder().build(raw(builder, "")).xhr()
        };

        assert!(xhr(Some("XMLHttpRequest")));
        assert!(xhr(Some("xmlhttprequest")));
        assert!(!xhr(Some("fetch")));
        assert!(!xhr(None));
    }

    #[test]
    fn charset_and_locale() {
        let req = get("/");
        assert_eq!(req.charset(), Charset::UTF_8);
        assert_eq!(req.locale(), Locale::new("en", Some("US")));
        assert_eq!(req.locales(), vec![Locale::new("en", Some("US"))]);

        let config = RequestConfig::builder()
            .default_charset(Charset::ISO_8859_1)
            .default_locale(Locale::new("fr", Some("CA")))
            .build();
        let req = HttpRequest::builder().config(config).build(raw(http::Request::get("/"), ""));
        assert_eq!(req.charset(), Charset::ISO_8859_1);
        assert_eq!(req.locale().to_string(), "fr-CA");

        let req = HttpRequest::builder().build(raw(
            http::Request::get("/").header("Accept-Language", "de;q=0.7, es-MX, en;q=0.9"),
            "",
        ));
        assert_eq!(req.locale(), Locale::new("es", Some("MX")));
        let tags = req.locales().iter().map(ToString::to_string).collect::<Vec<_>>();
        assert_eq!(tags, vec!["es-MX", "en", "de"]);
    }

    #[test]
    fn connection_details() {
        let raw = http::Request::get("/")
            .header("Host", "grenat.io:8443")
            .header("Content-Length", "0")
            .version(http::Version::HTTP_10)
            .body(Bytes::new())
            .unwrap();
        let req = HttpRequest::builder()
            .peer_addr("192.168.0.7:34000".parse().unwrap())
            .secure(true)
            .build(raw);

        assert_eq!(req.hostname(), "grenat.io");
        assert_eq!(req.ip(), Some("192.168.0.7".parse().unwrap()));
        assert_eq!(req.protocol(), "HTTP/1.0");
        assert_eq!(req.length(), 0);
        assert!(req.secure());

        let req = get("/");
        assert_eq!(req.ip(), None);
        assert_eq!(req.length(), -1);
        assert!(!req.secure());
    }

    #[test]
    fn cookies() {
        let req = HttpRequest::builder().build(raw(http::Request::get("/").header("Cookie", "theme=dark; lang=fr"), ""));
        assert_eq!(req.cookie("theme").map(|c| c.value().to_string()), Some("dark".to_string()));
        assert!(req.cookie("other").is_none());

        let mut names = req.cookies().iter().map(|c| c.name().to_string()).collect::<Vec<_>>();
        names.sort();
        assert_eq!(names, vec!["lang", "theme"]);
    }
}

mod body {
    use super::*;

    fn posted(content_type: &str, body: &'static str) -> HttpRequest {
        HttpRequest::builder().build(raw(http::Request::post("/").header("Content-Type", content_type), body))
    }

    #[cfg(feature = "json")]
    #[test]
    fn payload_follows_content_type() {
        let expected = Login {
            user: "bob".to_string(),
            remember: true,
        };

        let form = posted("application/x-www-form-urlencoded", "user=bob&remember=true");
        assert_eq!(form.body::<Payload<Login>>().unwrap().into_inner(), expected);

        let json = posted("application/json; charset=utf-8", r#"{"user":"bob","remember":true}"#);
        assert_eq!(json.body::<Payload<Login>>().unwrap().into_inner(), expected);
        assert_eq!(json.body::<Json<Login>>().unwrap().into_inner(), expected);
    }

    #[test]
    fn no_reader() {
        let req = posted("text/csv", "user,remember");
        let err = req.body::<Payload<Login>>().unwrap_err();
        assert!(matches!(err, BodyError::NoReader { ref content_type } if content_type == "text/csv"));
        assert_eq!(err.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        assert_eq!(req.body::<String>().unwrap(), "user,remember");
        assert_eq!(req.raw_body(), &Bytes::from_static(b"user,remember"));
    }

    #[tokio::test]
    async fn load_with_limit() {
        let raw = http::Request::post("/upload").body(hyper::Body::from("0123456789")).unwrap();
        let req = HttpRequest::builder().load(raw).await.unwrap();
        assert_eq!(req.body::<Vec<u8>>().unwrap().len(), 10);

        let config = RequestConfig::builder().body_limit(Some(4)).build();
        let raw = http::Request::post("/upload").body(hyper::Body::from("0123456789")).unwrap();
        let err = HttpRequest::builder().config(config).load(raw).await.unwrap_err();
        assert!(matches!(err, BodyError::TooLarge { limit: 4 }));
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}

mod session {
    use super::*;

    #[test]
    fn lifecycle() {
        let store = Arc::new(MemoryStore::new());

        let first = HttpRequest::builder().sessions(store.clone()).build(raw(http::Request::get("/"), ""));
        assert!(first.if_session().is_none());
        let session = first.session();
        session.set("user", "bob");
        assert!(first.session().ptr_eq(&session));
        assert!(first.if_session().unwrap().ptr_eq(&session));
        assert_eq!(store.len(), 1);

        let cookie = format!("{}={}", grenat::config::DEFAULT_SESSION_COOKIE, session.id());
        let second = HttpRequest::builder()
            .sessions(store.clone())
            .build(raw(http::Request::get("/").header("Cookie", cookie.as_str()), ""));
        let found = second.if_session().unwrap();
        assert!(found.ptr_eq(&session));
        assert_eq!(found.get("user").value().unwrap(), "bob");
        assert!(second.session().ptr_eq(&session));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn unknown_session_id() {
        let store = Arc::new(MemoryStore::new());
        let req = HttpRequest::builder()
            .sessions(store.clone())
            .build(raw(http::Request::get("/").header("Cookie", "grenat.sid=gone"), ""));

        assert!(req.if_session().is_none());
        assert_ne!(req.session().id(), "gone");
        assert_eq!(store.len(), 1);
    }
}

mod scope {
    use super::*;

    struct Database(&'static str);

    #[test]
    fn modules_populate_every_request() {
        let opened = Arc::new(AtomicUsize::new(0));
        let counter = opened.clone();
        let module: Arc<dyn RequestModule> = Arc::new(move |scope: &mut RequestScope| {
            let counter = counter.clone();
            scope
                .bind_lazy(Key::get(), move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Database("main")
                })
                .bind(Key::named("replica"), Database("replica"));
        });

        let build = || {
            HttpRequest::builder()
                .module(module.clone())
                .build(raw(http::Request::get("/"), ""))
        };

        let req = build();
        assert_eq!(req.instance::<Database>().unwrap().0, "main");
        assert_eq!(req.instance::<Database>().unwrap().0, "main");
        assert_eq!(req.named_instance::<Database>("replica").unwrap().0, "replica");
        assert_eq!(req.instance_of(&Key::<Database>::named("replica")).unwrap().0, "replica");
        assert!(req.instance::<String>().is_none());
        assert_eq!(opened.load(Ordering::SeqCst), 1);

        let other = build();
        assert!(other.instance::<Database>().is_some());
        assert_eq!(opened.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn through_trait_object() {
        let mut scope = RequestScope::new();
        scope.bind(Key::get(), 7u64);
        let req: Box<dyn Request> = Box::new(HttpRequest::builder().scope(scope).build(raw(http::Request::get("/"), "")));
        assert_eq!(*req.instance::<u64>().unwrap(), 7);
    }
}
