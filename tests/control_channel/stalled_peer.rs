use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use unitd::Error;
use unitd::NetworkError;
use unitd::RawCommand;
use unitd::Response;
use unitd::SystemError;

const MAX: usize = 1024;

/// Answers every request with `reply`, after `delay`.
async fn fake_peer(
    reply: Response,
    delay: Duration,
) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        while let Ok(Some(_)) = unitd::read_frame::<_, RawCommand>(&mut stream, MAX).await {
            tokio::time::sleep(delay).await;
            if unitd::write_frame(&mut stream, &reply, MAX).await.is_err() {
                break;
            }
        }
    });
    addr
}

fn is_connection_closed(result: &unitd::Result<impl std::fmt::Debug>) -> bool {
    matches!(
        result,
        Err(Error::System(SystemError::Network(NetworkError::ConnectionClosed)))
    )
}

#[tokio::test]
async fn late_reply_is_never_taken_as_the_next_answer() {
    let addr = fake_peer(Response::Attached(0), Duration::from_millis(300)).await;
    let mut client = unitd::ControlClient::connect(addr, Duration::from_millis(100))
        .await
        .unwrap();

    let timed_out = client.attach().await;
    assert!(matches!(
        timed_out,
        Err(Error::System(SystemError::Network(NetworkError::Timeout { .. })))
    ));
    assert!(client.is_broken());

    // Give the stale reply time to land in the socket buffer
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(is_connection_closed(&client.query(5).await));
    assert!(is_connection_closed(&client.list().await));
}

#[tokio::test]
async fn query_requires_a_done_reply() {
    let addr = fake_peer(Response::Attached(0), Duration::ZERO).await;
    let mut client = unitd::ControlClient::connect(addr, Duration::from_secs(3))
        .await
        .unwrap();

    match client.query(5).await {
        Err(Error::Fatal(message)) => assert!(message.contains("QUERY")),
        other => panic!("expected unexpected-response error, got {other:?}"),
    }
    assert!(client.is_broken());
    assert!(is_connection_closed(&client.detach(5).await));
}

#[tokio::test]
async fn detach_and_shutdown_reject_payload_replies() {
    let addr = fake_peer(Response::Units(vec![1]), Duration::ZERO).await;
    let mut client = unitd::ControlClient::connect(addr, Duration::from_secs(3))
        .await
        .unwrap();
    assert!(matches!(client.detach(1).await, Err(Error::Fatal(_))));

    let addr = fake_peer(Response::Attached(3), Duration::ZERO).await;
    let mut client = unitd::ControlClient::connect(addr, Duration::from_secs(3))
        .await
        .unwrap();
    assert!(matches!(client.shutdown().await, Err(Error::Fatal(_))));
}
