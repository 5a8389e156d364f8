// Integration tests for `GatewaySocket` against a local plain-ws server.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use secrecy::SecretString;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use url::Url;

use junghome_api::GatewaySocket;

/// Accept one connection, report the `token` header and query, then send
/// `frames` and close.
async fn serve_once(frames: Vec<String>) -> (Url, oneshot::Receiver<(Option<String>, Option<String>)>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (seen_tx, seen_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut seen = None;
        let callback = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            let token = req
                .headers()
                .get("token")
                .and_then(|v| v.to_str().ok())
                .map(String::from);
            let query = req.uri().query().map(String::from);
            seen = Some((token, query));
            Ok(resp)
        };
        let mut ws = tokio_tungstenite::accept_hdr_async(tcp, callback).await.unwrap();
        let _ = seen_tx.send(seen.unwrap_or_default());

        for frame in frames {
            ws.send(Message::text(frame)).await.unwrap();
        }
        ws.close(None).await.unwrap();
        // drain until the client acknowledges the close
        while ws.next().await.is_some() {}
    });

    let url = Url::parse(&format!("ws://{addr}/ws?t=1700000000000")).unwrap();
    (url, seen_rx)
}

#[tokio::test]
async fn socket_sends_token_and_yields_frames_in_order() {
    let (url, seen) = serve_once(vec![
        r#"{"type":"version","data":"1.2.3"}"#.into(),
        "garbage".into(),
        r#"{"type":"datapoint","data":{"id":"dp1","values":[{"key":"switch","value":"1"}]}}"#
            .into(),
    ])
    .await;

    let token = SecretString::from("secret-token");
    let mut socket = GatewaySocket::connect(&url, &token, None, Duration::from_secs(30))
        .await
        .unwrap();

    let (token_seen, query_seen) = seen.await.unwrap();
    assert_eq!(token_seen.as_deref(), Some("secret-token"));
    assert_eq!(query_seen.as_deref(), Some("t=1700000000000"));

    let first = socket.next_frame().await.unwrap().unwrap();
    assert_eq!(first.kind, "version");

    let second = socket.next_frame().await.unwrap().unwrap_err();
    assert!(second.is_decode(), "bad frame should not kill the socket");

    let third = socket.next_frame().await.unwrap().unwrap();
    assert_eq!(third.kind, "datapoint");
    assert_eq!(third.data["id"], "dp1");

    assert!(socket.next_frame().await.is_none(), "close ends the stream");
}

#[tokio::test]
async fn connect_to_closed_port_fails() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let url = Url::parse(&format!("ws://{addr}/ws?t=1")).unwrap();
    let result = GatewaySocket::connect(
        &url,
        &SecretString::from("t"),
        None,
        Duration::from_secs(30),
    )
    .await;

    match result {
        Err(e) => assert!(e.is_transient(), "expected transient error, got {e:?}"),
        Ok(_) => panic!("connect should fail"),
    }
}
