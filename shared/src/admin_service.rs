use crate::http::{full_body, make_boxed_error_response};
use http_body_util::combinators::BoxBody;
use hyper::body::{Bytes, Incoming};
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

pub type ReadinessCheck = Arc<dyn Fn() -> bool + Send + Sync>;

/// Serves `/health` (liveness) and `/ready` (readiness) on the admin listener.
pub struct AdminService<E> {
    is_ready: ReadinessCheck,
    _error: PhantomData<fn() -> E>,
}

impl<E> AdminService<E> {
    pub fn new(is_ready: ReadinessCheck) -> Self {
        Self {
            is_ready,
            _error: PhantomData,
        }
    }

    fn respond<B>(&self, req: &Request<B>) -> Response<BoxBody<Bytes, Infallible>> {
        if req.method() != Method::GET && req.method() != Method::HEAD {
            return make_boxed_error_response(StatusCode::METHOD_NOT_ALLOWED);
        }

        match req.uri().path() {
            "/health" => Response::new(full_body("ok\n")),
            "/ready" => match (self.is_ready)() {
                true => Response::new(full_body("ok\n")),
                false => make_boxed_error_response(StatusCode::SERVICE_UNAVAILABLE),
            },
            _ => make_boxed_error_response(StatusCode::NOT_FOUND),
        }
    }
}

impl<E> Service<Request<Incoming>> for AdminService<E>
where
    E: Send + 'static,
{
    type Response = Response<BoxBody<Bytes, Infallible>>;
    type Error = E;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let res = self.respond(&req);
        Box::pin(async move { Ok(res) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn request(method: Method, path: &str) -> Request<()> {
        Request::builder().method(method).uri(path).body(()).unwrap()
    }

    #[test]
    fn test_health_and_readiness() {
        let ready = Arc::new(AtomicBool::new(false));
        let flag = ready.clone();
        let admin: AdminService<std::io::Error> =
            AdminService::new(Arc::new(move || flag.load(Ordering::Relaxed)));

        let res = admin.respond(&request(Method::GET, "/health"));
        assert_eq!(res.status(), StatusCode::OK);

        let res = admin.respond(&request(Method::GET, "/ready"));
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

        ready.store(true, Ordering::Relaxed);
        let res = admin.respond(&request(Method::GET, "/ready"));
        assert_eq!(res.status(), StatusCode::OK);

        let res = admin.respond(&request(Method::GET, "/metrics"));
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = admin.respond(&request(Method::POST, "/health"));
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
