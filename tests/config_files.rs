use pumprelay::config::Config;
use pumprelay::mesh::MeshAddress;

#[tokio::test]
async fn default_file_round_trips() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    let path = path.to_str().unwrap();

    Config::create_default(path).await.expect("write default");
    let config = Config::load(path).await.expect("load default");
    assert_eq!(config.relay.network_throttle_ms, 1000);
    assert_eq!(config.relay.serial_throttle_ms, 50);
    assert!(config.radio.port.is_empty());
    assert_eq!(config.this_node().unwrap(), MeshAddress::MASTER);
}

#[tokio::test]
async fn invalid_file_is_rejected_with_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("bad.toml");
    std::fs::write(
        &path,
        r#"
[relay]
node_id = 0
network_throttle_ms = 0
serial_throttle_ms = 50
network_queue_capacity = 16
data_queue_capacity = 32

[radio]
port = ""
baud_rate = 115200
channel = 90

[logging]
level = "info"
"#,
    )
    .unwrap();

    let err = Config::load(path.to_str().unwrap()).await.unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("Invalid config file"), "{}", msg);
    assert!(msg.contains("throttle"), "{}", msg);
}

#[tokio::test]
async fn address_override_changes_this_node() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("relay.toml");
    let table: Vec<String> = (0u16..16).map(|i| (i + 100).to_string()).collect();
    std::fs::write(
        &path,
        format!(
            r#"
address_table = [{}]

[relay]
node_id = 2
network_throttle_ms = 1000
serial_throttle_ms = 50
network_queue_capacity = 16
data_queue_capacity = 32

[radio]
port = "/dev/ttyACM0"
baud_rate = 115200
channel = 90

[serial]
port = "/dev/ttyUSB0"
baud_rate = 9600

[logging]
level = "warn"
"#,
            table.join(", ")
        ),
    )
    .unwrap();

    let config = Config::load(path.to_str().unwrap()).await.expect("load");
    assert_eq!(config.this_node().unwrap(), MeshAddress(102));
    assert_eq!(config.serial.port.as_deref(), Some("/dev/ttyUSB0"));
    assert_eq!(config.logging.level_filter(), log::LevelFilter::Warn);
}

#[tokio::test]
async fn missing_file_reports_path() {
    let err = Config::load("/nonexistent/pumprelay.toml").await.unwrap_err();
    assert!(err.to_string().contains("/nonexistent/pumprelay.toml"));
}

#[tokio::test]
async fn load_or_default_only_defaults_when_missing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("absent.toml");
    let config = Config::load_or_default(missing.to_str().unwrap())
        .await
        .expect("defaults");
    assert!(config.address_table.is_none());

    // a present file with a broken address table must not fall back
    let path = dir.path().join("broken.toml");
    Config::create_default(path.to_str().unwrap()).await.unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    std::fs::write(&path, format!("address_table = [1, 1]\n{}", text)).unwrap();
    let err = Config::load_or_default(path.to_str().unwrap())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("address table"), "{}", err);
}
