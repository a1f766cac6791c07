use std::time::Duration;

use pumprelay::mesh::{AddressTable, MeshAddress, MockNetwork};
use pumprelay::relay::{Bridge, RelayEngine, RelaySettings};
use pumprelay::serial::MemorySerial;

fn fast_settings() -> RelaySettings {
    RelaySettings {
        network_throttle_ms: 20,
        serial_throttle_ms: 5,
        echo_commands: false,
        ..RelaySettings::default()
    }
}

#[tokio::test]
async fn bridge_moves_commands_and_telemetry_until_shutdown() {
    let engine = RelayEngine::new(AddressTable::default(), fast_settings(), 0);
    let mut serial = MemorySerial::new();
    serial.push_line("S;G;t=3;s=1.5;p=10");
    serial.push_line("S;H;t=4");
    let mut net = MockNetwork::new();
    net.inject(MeshAddress(0o5), b'P', 77);

    let mut bridge = Bridge::new(engine, net, serial, Duration::from_millis(1));
    let stats = bridge
        .run_until(tokio::time::sleep(Duration::from_millis(300)))
        .await
        .expect("bridge run");

    assert_eq!(stats.commands_sent, 2);
    assert_eq!(stats.records_relayed, 1);
    assert_eq!(bridge.network().sent().len(), 2);
    assert_eq!(bridge.engine().outbound_len(), 0);

    let written = bridge.serial().written();
    assert!(written.contains(&"Success! Sent G header to 3".to_string()));
    assert!(written.contains(&"Success! Sent H header to 4".to_string()));
    assert!(written.iter().any(|l| l.starts_with("05\t") && l.ends_with("\tP\t77")));
}

#[tokio::test]
async fn bridge_stops_promptly_with_work_pending() {
    let settings = RelaySettings {
        network_throttle_ms: 60_000,
        ..fast_settings()
    };
    let engine = RelayEngine::new(AddressTable::default(), settings, 0);
    let mut serial = MemorySerial::new();
    serial.push_line("S;G;t=1");

    let mut bridge = Bridge::new(engine, MockNetwork::new(), serial, Duration::from_millis(1));
    let stats = bridge
        .run_until(tokio::time::sleep(Duration::from_millis(50)))
        .await
        .expect("bridge run");

    assert_eq!(stats.commands_queued, 1);
    assert_eq!(stats.commands_sent, 0);
    assert_eq!(bridge.engine().outbound_len(), 1);
}

#[tokio::test]
async fn transports_can_be_fed_between_runs() {
    let engine = RelayEngine::new(AddressTable::default(), fast_settings(), 0);
    let mut bridge = Bridge::new(
        engine,
        MockNetwork::new(),
        MemorySerial::new(),
        Duration::from_millis(1),
    );
    bridge
        .run_until(tokio::time::sleep(Duration::from_millis(20)))
        .await
        .expect("first run");
    assert!(bridge.serial().written().is_empty());

    bridge.network_mut().inject(MeshAddress(0o2), b'E', 0);
    bridge
        .run_until(tokio::time::sleep(Duration::from_millis(20)))
        .await
        .expect("second run");
    assert_eq!(bridge.serial_mut().take_written(), ["Error: network queue is full!"]);
}
