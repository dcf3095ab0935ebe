use counter_echo::{App, Body, CounterSync, Method, Request, Response, Server, StatusCode};

const INDEX: &str = r#"<!doctype html>
<form method="post" action="/counter/sync">
  <input name="count" value="0">
  <button>Sync</button>
</form>
"#;

// Serves a tiny page and mounts the counter endpoint next to it.
// Try it with `curl -d count=41 localhost:4444/counter/sync`
#[derive(Clone, Default)]
struct Site {
    counter: CounterSync,
}

impl App for Site {
    type Error = http::Error;

    fn handle(&self, req: Request<Body>) -> Result<Response<Body>, Self::Error> {
        match (req.method(), req.uri().path()) {
            (&Method::GET, "/") => Response::builder()
                .status(StatusCode::OK)
                .header("content-type", "text/html; charset=utf-8")
                .body(Body::from(INDEX)),

            _ => self.counter.handle(req),
        }
    }

    fn should_continue(&self, req: &Request<()>) -> StatusCode {
        self.counter.should_continue(req)
    }
}

fn main() -> std::io::Result<()> {
    Server::builder()
        .max_threads(16)
        .bind("0.0.0.0:4444")?
        .serve(Site::default())
}
