//! Discovery against devices simulated on localhost

mod common;

use broadlink_lib::discover;
use common::*;
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;

fn config_for(port: u16) -> ProtocolConfig {
    local_config().broadcast(Ipv4Addr::LOCALHOST, port)
}

#[tokio::test]
async fn test_single_responder() {
    let mut sim = SimulatedDevice::spawn(|request| {
        (request.len() == 0x30).then(|| discovery_response(0x2737, SIM_MAC))
    })
    .await;

    let devices = discover(&config_for(sim.addr.port()), Duration::from_millis(300), false)
        .await
        .expect("discovery failed");

    assert_eq!(devices.len(), 1);
    let record = devices[0].record();
    assert_eq!(record.addr(), sim.addr);
    assert_eq!(record.device_type(), 0x2737);
    assert_eq!(record.mac(), SIM_MAC);
    assert_eq!(record.kind(), DeviceKind::RemoteControl);
    assert!(!record.is_authorized());
    assert_eq!(record.packet_count(), 1);

    let probe = sim.next_request().await;
    assert_eq!(probe.len(), 0x30);
    assert_eq!(probe[0x26], 6);
    assert_eq!(&probe[0x18..0x1c], &[127, 0, 0, 1]);
    let mut zeroed = probe.clone();
    zeroed[0x20] = 0;
    zeroed[0x21] = 0;
    assert_eq!(&probe[0x20..0x22], &checksum(&zeroed).to_le_bytes());
}

#[tokio::test]
async fn test_stop_after_first_returns_early() {
    let sim = SimulatedDevice::spawn(|_| Some(discovery_response(0x2712, SIM_MAC))).await;

    let started = Instant::now();
    let devices = discover(&config_for(sim.addr.port()), Duration::from_secs(5), true)
        .await
        .unwrap();

    assert_eq!(devices.len(), 1);
    assert!(started.elapsed() < Duration::from_secs(4), "should not wait for the whole window");
}

#[tokio::test]
async fn test_no_devices_is_not_an_error() {
    let sim = SimulatedDevice::spawn(|_| None).await;

    let devices = discover(&config_for(sim.addr.port()), Duration::from_millis(200), false)
        .await
        .unwrap();
    assert!(devices.is_empty());
}

#[tokio::test]
async fn test_malformed_and_duplicate_responses_skipped() {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = socket.local_addr().unwrap().port();

    let responder = tokio::spawn(async move {
        let mut buf = [0u8; 256];
        let (_, from) = socket.recv_from(&mut buf).await.unwrap();
        // too short to carry a type and MAC
        socket.send_to(&[0u8; 0x20], from).await.unwrap();
        socket.send_to(&discovery_response(0x278f, SIM_MAC), from).await.unwrap();
        socket.send_to(&discovery_response(0x278f, SIM_MAC), from).await.unwrap();
    });

    let devices = discover(&config_for(port), Duration::from_millis(400), false)
        .await
        .unwrap();
    responder.await.unwrap();

    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].record().device_type(), 0x278f);
}
