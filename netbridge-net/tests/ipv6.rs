#![expect(missing_docs, reason = "tests")]

use std::thread;

use netbridge_net::{
    AddressFamily, BoundedBuffer, ClientBootstrap, IoError, NetConfig, ReceiveMode, Received,
    ReceivedDatagram, ServerBootstrap, TransportMode,
};
use pretty_assertions::assert_eq;

/// Hosts without an IPv6 loopback (some containers) skip these tests.
fn ipv6_available() -> bool {
    let available = std::net::UdpSocket::bind("[::1]:0").is_ok();
    if !available {
        eprintln!("skipping: no IPv6 loopback");
    }
    available
}

fn config() -> NetConfig {
    NetConfig::with_family(AddressFamily::Ipv6)
}

#[test]
fn stream_over_ipv6() {
    if !ipv6_available() {
        return;
    }

    let server = ServerBootstrap::new(&config()).bind_listening("0").unwrap();
    let address = server.local_addr().unwrap();
    assert!(address.is_ipv6());
    assert!(address.ip().is_unspecified());
    let port = address.port().to_string();

    let worker = thread::spawn(move || {
        let (mut connection, peer) = server.accept().unwrap();
        let mut buffer = BoundedBuffer::new(100);
        assert_eq!(
            connection.receive(&mut buffer, ReceiveMode::Blocking).unwrap(),
            Received::Data(2)
        );
        (peer.format().unwrap(), buffer.to_string_lossy().into_owned())
    });

    let mut client = ClientBootstrap::new(&config())
        .connect("::1", &port, TransportMode::Stream)
        .unwrap();
    client.send_all(b"hi").unwrap();

    let (peer, message) = worker.join().unwrap();
    assert_eq!(peer, "::1");
    assert_eq!(message, "hi");
}

#[test]
fn datagram_over_ipv6() {
    if !ipv6_available() {
        return;
    }

    let mut server = ServerBootstrap::new(&config())
        .bind("0", TransportMode::Datagram)
        .unwrap();
    let port = server.local_addr().unwrap().port().to_string();

    let mut client = ClientBootstrap::new(&config())
        .connect("[::1]", &port, TransportMode::Datagram)
        .unwrap();
    client.send_to_destination(b"hola").unwrap();

    let mut buffer = BoundedBuffer::new(100);
    let ReceivedDatagram::Data { len, peer, .. } = server
        .receive_from(&mut buffer, ReceiveMode::Blocking)
        .unwrap()
    else {
        panic!("expected a datagram");
    };
    assert_eq!(len, 4);
    assert_eq!(peer.format().unwrap(), "::1");
    assert_eq!(buffer.to_string_lossy(), "hola");
}

#[test]
fn ipv6_payload_limit() {
    if !ipv6_available() {
        return;
    }

    let server = ServerBootstrap::new(&config())
        .bind("0", TransportMode::Datagram)
        .unwrap();
    let port = server.local_addr().unwrap().port().to_string();
    let mut client = ClientBootstrap::new(&config())
        .connect("::1", &port, TransportMode::Datagram)
        .unwrap();

    assert!(matches!(
        client.send_to_destination(&vec![0u8; 65_528]),
        Err(IoError::PayloadTooLarge { max: 65_527, .. })
    ));
}
