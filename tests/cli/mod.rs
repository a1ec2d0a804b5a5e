use std::net::SocketAddr;
use std::process::Command;
use std::process::Output;

use crate::common::TestService;

async fn unitctl(
    addr: SocketAddr,
    args: &[&str],
) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_unitctl"));
    command.arg("--endpoint").arg(addr.to_string()).args(args);
    tokio::task::spawn_blocking(move || command.output().expect("unitctl runs"))
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_detach_exits_non_zero_naming_the_operation() {
    let service = TestService::start().await;

    let output = unitctl(service.addr, &["-d", "0"]).await;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("detach unit 0"), "stderr: {stderr}");
    assert!(stderr.contains("NotFound"), "stderr: {stderr}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn attach_and_list_print_units() {
    let service = TestService::start().await;

    let attached = unitctl(service.addr, &["-a"]).await;
    assert!(attached.status.success());
    assert_eq!(String::from_utf8_lossy(&attached.stdout), "unit: 0\n");

    let listed = unitctl(service.addr, &["-l"]).await;
    assert!(listed.status.success());
    assert_eq!(String::from_utf8_lossy(&listed.stdout), " UNIT\n 0\n");

    let refused = unitctl(service.addr, &["-s"]).await;
    assert!(!refused.status.success());
    assert!(String::from_utf8_lossy(&refused.stderr).contains("shutdown"));
}

#[tokio::test]
async fn unreachable_service_is_a_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let output = unitctl(addr, &["-l"]).await;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains(&format!("connect to {addr}")));
}
