mod common;

use std::time::Duration as StdDuration;

use common::*;
use embassy_time::Duration;
use telematics_udp::{
    CellularOptions, Client, ConnectionOptions, Error, LinkConfig, Model, Sim5360Client,
    Sim800Client, UdpClient, WifiClient,
};

type Board = Client<LoopbackStack, TestDevice>;

fn sim800(uart: &ScriptedUart) -> Board {
    Client::Sim800(Sim800Client::with_config(TestDevice::new(uart), fast_config()))
}

fn sim5360(uart: &ScriptedUart, model: Model) -> Board {
    Client::Sim5360(Sim5360Client::with_config(
        TestDevice::new(uart),
        model,
        fast_config(),
    ))
}

fn wifi() -> (Board, std::sync::mpsc::Receiver<Vec<u8>>) {
    let (peer, inbox) = spawn_peer(|datagram| vec![datagram.to_ascii_uppercase()]);
    let (stack, _radio) = LoopbackStack::new(peer);
    (Client::Wifi(WifiClient::new(stack)), inbox)
}

#[test]
fn mismatched_credentials_are_unsupported() {
    init_logger();
    let uart = ScriptedUart::default();
    let mut client = sim800(&uart);

    let station = LinkConfig::Wifi(ConnectionOptions::new("TESTAP"));
    let cellular = LinkConfig::Cellular(CellularOptions::new("internet"));
    assert_eq!(
        client.setup(&station, Duration::from_secs(1)),
        Err(Error::Unsupported)
    );
    assert_eq!(
        client.setup(&cellular, Duration::from_secs(1)),
        Err(Error::Unsupported)
    );
    assert!(uart.written().is_empty());

    let (mut client, _inbox) = wifi();
    assert_eq!(
        client.setup(&LinkConfig::Gprs { apn: "internet" }, Duration::from_secs(1)),
        Err(Error::Unsupported)
    );
}

#[test]
fn default_setup_timeouts() {
    let uart = ScriptedUart::default();
    assert_eq!(sim800(&uart).default_setup_timeout(), Duration::from_secs(60));
    assert_eq!(
        sim5360(&uart, Model::Sim5360).default_setup_timeout(),
        Duration::from_secs(60)
    );
    assert_eq!(wifi().0.default_setup_timeout(), Duration::from_secs(15));
}

#[test]
fn wifi_through_facade() {
    init_logger();
    let (mut client, inbox) = wifi();

    client.begin().unwrap();
    let config = LinkConfig::Wifi(ConnectionOptions::new("TESTAP").wpa2_passphrase("secret"));
    client.setup(&config, Duration::from_secs(2)).unwrap();
    client.open(HUB_NAME, 8081).unwrap();

    client.send(b"ping").unwrap();
    assert_eq!(inbox.recv_timeout(StdDuration::from_secs(2)).unwrap(), b"ping");
    let datagram = client.receive(Duration::from_secs(2)).unwrap().unwrap();
    assert_eq!(datagram.data(), b"PING");

    assert_eq!(client.location().map(|_| ()), Err(Error::Unsupported));
    assert_eq!(client.operator_name().map(|_| ()), Err(Error::Unsupported));
    assert_eq!(client.device_name(), "WIFI");

    client.end();
    assert_eq!(client.send(b"ping"), Err(Error::Unattached));
}

#[test]
fn sim800_through_facade() {
    init_logger();
    let uart = ScriptedUart::new([cmd("AT", OK)]);
    uart.push_steps(sim800_setup_script("internet"));
    uart.push_steps([cmd("AT+CSQ", "\r\n+CSQ: 31,0\r\n\r\nOK\r\n")]);
    let mut client = sim800(&uart);

    client.begin().unwrap();
    client
        .setup(&LinkConfig::Gprs { apn: "internet" }, Duration::from_secs(5))
        .unwrap();
    assert_eq!(client.signal(), Ok(-51));
    assert_eq!(client.device_name(), "SIM800");
    assert_eq!(uart.remaining_steps(), 0);
}

#[test]
fn sim7600_through_facade() {
    init_logger();
    let uart = ScriptedUart::new([cmd("AT", OK)]);
    uart.push_steps(sim5360_setup_script("internet"));
    let mut client = sim5360(&uart, Model::Sim7600);

    client.begin().unwrap();
    let config = LinkConfig::Cellular(CellularOptions::new("internet").only_3g(true).roaming(true));
    client.setup(&config, Duration::from_secs(5)).unwrap();
    assert_eq!(client.device_name(), "SIM7600");
    assert_eq!(client.query_ip("198.51.100.4"), Ok(core::net::Ipv4Addr::new(198, 51, 100, 4)));
    assert_eq!(uart.remaining_steps(), 0);
}
