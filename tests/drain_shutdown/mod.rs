use std::time::Duration;

use unitd::Error;
use unitd::ErrorCode;

use crate::common::TestService;

#[tokio::test]
async fn signal_is_refused_while_units_remain() {
    let service = TestService::start().await;
    let mut client = service.client().await;
    let unit = client.attach().await.unwrap();

    service.shutdown_tx.send(()).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(!service.handle.is_finished());
    assert!(service.node.server_is_ready());
    client.query(unit).await.unwrap();
    assert_eq!(client.list().await.unwrap(), vec![unit]);

    client.detach(unit).await.unwrap();
    service.shutdown_tx.send(()).unwrap();
    service.stopped().await.unwrap();
}

#[tokio::test]
async fn signal_on_empty_registry_stops_immediately() {
    let service = TestService::start().await;

    service.shutdown_tx.send(()).unwrap();
    let node = service.node.clone();
    service.stopped().await.unwrap();

    assert!(!node.server_is_ready());
    assert!(node.dispatcher().drain().is_drained());
}

#[tokio::test]
async fn repeated_refusals_leave_registry_intact() {
    let service = TestService::start().await;
    let mut client = service.client().await;
    let a = client.attach().await.unwrap();
    let b = client.attach().await.unwrap();

    for _ in 0..3 {
        match client.shutdown().await {
            Err(Error::Rejected { code, message }) => {
                assert_eq!(code, ErrorCode::Busy);
                assert!(message.contains("2 unit(s)"));
            }
            other => panic!("expected Busy, got {other:?}"),
        }
    }
    assert_eq!(client.list().await.unwrap(), vec![b, a]);

    client.detach(a).await.unwrap();
    client.detach(b).await.unwrap();
    client.shutdown().await.unwrap();
    service.stopped().await.unwrap();
}

#[tokio::test]
async fn new_connections_are_not_accepted_after_drain() {
    let service = TestService::start().await;
    let addr = service.addr;
    let mut client = service.client().await;
    client.shutdown().await.unwrap();
    service.stopped().await.unwrap();

    // The listener is dropped with run(); the open connection sees Unavailable
    match client.attach().await {
        Err(Error::Rejected { code, .. }) => assert_eq!(code, ErrorCode::Unavailable),
        other => panic!("expected Unavailable, got {other:?}"),
    }
    assert!(tokio::net::TcpStream::connect(addr).await.is_err());
}
