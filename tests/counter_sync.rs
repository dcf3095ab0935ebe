use std::{
    io::{Read, Write},
    net::{SocketAddr, TcpListener, TcpStream},
    thread,
};

use counter_echo::{CounterSync, Server};
use indoc::indoc;

fn spawn_server(app: CounterSync) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    thread::spawn(move || {
        Server::builder()
            .max_threads(4)
            .max_body_size(1024)
            .from_listener(listener)
            .serve(app)
            .ok()
    });

    addr
}

fn send(addr: SocketAddr, raw: &str) -> String {
    let mut conn = TcpStream::connect(addr).unwrap();
    conn.write_all(raw.as_bytes()).unwrap();

    // The server may reset the connection after an early response
    let mut res = Vec::new();
    conn.read_to_end(&mut res).ok();
    String::from_utf8(res).unwrap()
}

fn sync(addr: SocketAddr, body: &str) -> String {
    send(
        addr,
        &format!(
            "POST /counter/sync HTTP/1.1\r\n\
             Host: localhost\r\n\
             Content-Type: application/x-www-form-urlencoded\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\
             \r\n\
             {body}",
            body.len()
        ),
    )
}

fn body(res: &str) -> &str {
    res.split_once("\r\n\r\n").map(|(_, body)| body).unwrap()
}

#[test]
fn echoes_submitted_counts() {
    let addr = spawn_server(CounterSync::default());

    for (form, expected) in [
        ("count=5", "5"),
        ("count=-7", "-7"),
        ("count=42abc", "42"),
        ("count=99999999999999999999999", "99999999999999999999999"),
        ("count=abc", "0"),
        ("other=1", "0"),
        ("", "0"),
    ] {
        let res = sync(addr, form);

        assert!(res.starts_with("HTTP/1.1 200 OK\r\n"), "{form}: {res}");
        assert!(res.contains("content-type: text/plain; charset=utf-8\r\n"));
        assert!(res.contains("access-control-allow-origin: *\r\n"));
        assert_eq!(body(&res), expected, "{form}");
    }
}

#[test]
fn repeated_requests_get_identical_responses() {
    let addr = spawn_server(CounterSync::default());

    let first = sync(addr, "count=9");
    let second = sync(addr, "count=9");

    assert_eq!(first, second);
}

#[test]
fn rejects_bodies_that_are_not_forms() {
    let addr = spawn_server(CounterSync::default());

    let res = send(
        addr,
        indoc! {"
            POST /counter/sync HTTP/1.1\r
            Content-Type: application/json\r
            Content-Length: 11\r
            Connection: close\r
            \r
            {\"count\":1}"},
    );

    assert!(res.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert!(res.contains("content-type: text/plain; charset=utf-8\r\n"));
    assert_eq!(body(&res), "bad request");
}

#[test]
fn answers_preflight() {
    let addr = spawn_server(CounterSync::default());

    let res = send(
        addr,
        indoc! {"
            OPTIONS /counter/sync HTTP/1.1\r
            Origin: https://example.com\r
            Access-Control-Request-Method: POST\r
            Connection: close\r
            \r
        "},
    );

    assert!(res.starts_with("HTTP/1.1 204 No Content\r\n"));
    assert!(res.contains("access-control-allow-origin: *\r\n"));
    assert!(res.contains("access-control-allow-methods: POST, OPTIONS\r\n"));
    assert!(res.contains("access-control-allow-headers: Content-Type\r\n"));
    assert!(!res.contains("content-length"));
    assert_eq!(body(&res), "");
}

#[test]
fn accepts_chunked_forms() {
    let addr = spawn_server(CounterSync::default());

    let res = send(
        addr,
        indoc! {"
            POST /counter/sync HTTP/1.1\r
            Content-Type: application/x-www-form-urlencoded\r
            Transfer-Encoding: chunked\r
            Connection: close\r
            \r
            6\r
            count=\r
            2\r
            13\r
            0\r
            \r
        "},
    );

    assert_eq!(body(&res), "13");
}

#[cfg(feature = "multipart")]
#[test]
fn accepts_multipart_forms() {
    let addr = spawn_server(CounterSync::default());

    let form = "--boundary42\r\n\
                Content-Disposition: form-data; name=\"count\"\r\n\r\n\
                77\r\n\
                --boundary42--\r\n";

    let res = send(
        addr,
        &format!(
            "POST /counter/sync HTTP/1.1\r\n\
             Content-Type: multipart/form-data; boundary=boundary42\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\
             \r\n\
             {form}",
            form.len()
        ),
    );

    assert!(res.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(body(&res), "77");
}

#[test]
fn keeps_connections_alive() {
    let addr = spawn_server(CounterSync::default());

    let res = send(
        addr,
        indoc! {"
            POST /counter/sync HTTP/1.1\r
            Content-Type: application/x-www-form-urlencoded\r
            Content-Length: 7\r
            \r
            count=1OPTIONS /counter/sync HTTP/1.1\r
            \r
            GET /healthz HTTP/1.1\r
            Connection: close\r
            \r
        "},
    );

    let statuses: Vec<&str> = res
        .split("HTTP/1.1 ")
        .skip(1)
        .filter_map(|res| res.lines().next())
        .collect();

    assert_eq!(statuses, ["200 OK", "204 No Content", "200 OK"]);
    assert!(res.ends_with("\r\n\r\nok"));
}

#[test]
fn refuses_oversized_bodies() {
    let addr = spawn_server(CounterSync::default());

    let res = sync(addr, &format!("count={}", "1".repeat(2048)));

    assert!(res.starts_with("HTTP/1.1 413 Payload Too Large\r\n"));
}

#[test]
fn leaves_other_paths_to_the_asset_host() {
    let addr = spawn_server(CounterSync::default());

    let res = send(addr, "GET /index.html HTTP/1.1\r\nConnection: close\r\n\r\n");

    assert!(res.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert_eq!(body(&res), "not found");
}

#[test]
fn serves_custom_mount_point_with_powered_by() {
    let app = CounterSync::at("/api/count").powered_by("counter-echo".parse().unwrap());
    let addr = spawn_server(app);

    let res = send(
        addr,
        indoc! {"
            POST /api/count HTTP/1.1\r
            Content-Type: application/x-www-form-urlencoded\r
            Content-Length: 8\r
            Connection: close\r
            \r
            count=64"},
    );

    assert!(res.contains("x-powered-by: counter-echo\r\n"));
    assert_eq!(body(&res), "64");
}
