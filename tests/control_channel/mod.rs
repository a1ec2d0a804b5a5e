mod stalled_peer;

use std::collections::HashSet;

use futures::future::join_all;
use unitd::Error;
use unitd::ErrorCode;
use unitd::RawCommand;
use unitd::Response;
use unitd::UnitId;

use crate::common::TestService;

fn rejected_with(
    result: unitd::Result<()>,
    expected: ErrorCode,
) {
    match result {
        Err(Error::Rejected { code, .. }) => assert_eq!(code, expected),
        other => panic!("expected {expected} rejection, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn end_to_end_scenario() {
    let service = TestService::start().await;
    let mut client = service.client().await;

    assert_eq!(client.attach().await.unwrap(), 0);
    assert_eq!(client.attach().await.unwrap(), 1);
    client.detach(0).await.unwrap();
    rejected_with(client.detach(0).await, ErrorCode::NotFound);
    client.query(1).await.unwrap();
    assert_eq!(client.list().await.unwrap(), vec![1]);
    rejected_with(client.shutdown().await, ErrorCode::Busy);
    client.detach(1).await.unwrap();
    client.shutdown().await.unwrap();

    service.stopped().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_clients_receive_distinct_dense_ids() {
    const CLIENTS: usize = 8;
    const PER_CLIENT: usize = 25;
    let service = TestService::start().await;

    let tasks = (0..CLIENTS).map(|_| {
        let addr = service.addr;
        tokio::spawn(async move {
            let mut client = unitd::ControlClient::connect(addr, crate::common::REQUEST_TIMEOUT)
                .await
                .unwrap();
            let mut ids = Vec::with_capacity(PER_CLIENT);
            for _ in 0..PER_CLIENT {
                ids.push(client.attach().await.unwrap());
            }
            ids
        })
    });

    let mut ids: Vec<UnitId> = join_all(tasks)
        .await
        .into_iter()
        .flat_map(|joined| joined.unwrap())
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, (0..(CLIENTS * PER_CLIENT) as UnitId).collect::<Vec<_>>());

    let mut client = service.client().await;
    let listed = client.list().await.unwrap();
    assert_eq!(listed.len(), CLIENTS * PER_CLIENT);
    assert_eq!(listed.iter().collect::<HashSet<_>>().len(), listed.len());
}

#[tokio::test]
async fn list_is_most_recent_first() {
    let service = TestService::start().await;
    let mut client = service.client().await;

    let a = client.attach().await.unwrap();
    let b = client.attach().await.unwrap();
    assert_eq!(client.list().await.unwrap(), vec![b, a]);

    client.detach(b).await.unwrap();
    assert_eq!(client.attach().await.unwrap(), b);
    client.detach(a).await.unwrap();
    assert_eq!(client.list().await.unwrap(), vec![b]);
}

#[tokio::test]
async fn raw_commands_are_validated() {
    let service = TestService::start().await;
    let mut client = service.client().await;

    match client.send(RawCommand { code: 77, unit: None }).await.unwrap() {
        Response::Failed { code, .. } => assert_eq!(code, ErrorCode::UnsupportedCommand),
        other => panic!("unexpected {other:?}"),
    }
    match client.send(RawCommand { code: 2, unit: None }).await.unwrap() {
        Response::Failed { code, .. } => assert_eq!(code, ErrorCode::InvalidArgument),
        other => panic!("unexpected {other:?}"),
    }

    // The connection stays usable after rejected commands
    assert_eq!(
        client.send(RawCommand { code: 1, unit: None }).await.unwrap(),
        Response::Attached(0)
    );
}

#[tokio::test]
async fn capacity_limit_is_reported_as_exhaustion() {
    let service = TestService::start_with(|config| config.registry.max_units = 2).await;
    let mut client = service.client().await;

    client.attach().await.unwrap();
    client.attach().await.unwrap();
    match client.attach().await {
        Err(Error::Rejected { code, .. }) => assert_eq!(code, ErrorCode::ResourceExhausted),
        other => panic!("expected ResourceExhausted, got {other:?}"),
    }
    assert_eq!(client.list().await.unwrap(), vec![1, 0]);
}

#[tokio::test]
async fn undecodable_request_closes_the_connection() {
    use tokio::io::AsyncReadExt;
    use tokio::io::AsyncWriteExt;

    let service = TestService::start().await;
    let mut stream = tokio::net::TcpStream::connect(service.addr).await.unwrap();
    stream.write_u32(1).await.unwrap();
    stream.write_all(&[0xff]).await.unwrap();

    let response: Response = unitd::read_frame(&mut stream, 1024).await.unwrap().unwrap();
    assert!(matches!(
        response,
        Response::Failed {
            code: ErrorCode::InvalidArgument,
            ..
        }
    ));

    let mut rest = Vec::new();
    assert_eq!(stream.read_to_end(&mut rest).await.unwrap(), 0);
}
