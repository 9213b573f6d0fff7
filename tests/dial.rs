//! End-to-end dial tests against loopback peers.
//!
//! Every address in 127.0.0.0/8 is local on Linux, so a listener bound to
//! 127.0.0.1 makes 127.0.0.2 on the same port a fast "connection refused"
//! candidate.

use std::io::{Read, Write};
use std::net::{IpAddr, SocketAddr, TcpListener, UdpSocket};
use std::os::fd::{AsRawFd, RawFd};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use protectdial::{
	Address, DialContext, DialError, DialerConfig, Destination, Network, NoopProtector,
	ProtectedDialer, Protector, Resolver, SocketOptions,
};

fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter("protectdial=trace")
		.with_test_writer()
		.try_init();
}

fn ip(s: &str) -> IpAddr {
	s.parse().unwrap()
}

/// Records every descriptor it is asked to protect.
#[derive(Clone, Default)]
struct RecordingProtector {
	fds: Arc<Mutex<Vec<RawFd>>>,
}

impl RecordingProtector {
	fn calls(&self) -> usize {
		self.fds.lock().unwrap().len()
	}
}

impl Protector for RecordingProtector {
	fn protect(&self, fd: RawFd) -> bool {
		self.fds.lock().unwrap().push(fd);
		true
	}
}

/// Returns a fixed answer and counts invocations.
#[derive(Clone)]
struct StaticResolver {
	answer: Arc<dyn Fn() -> std::io::Result<Vec<IpAddr>> + Send + Sync>,
	calls: Arc<AtomicUsize>,
}

impl StaticResolver {
	fn new(ips: Vec<IpAddr>) -> Self {
		Self::from_fn(move || Ok(ips.clone()))
	}

	fn from_fn(f: impl Fn() -> std::io::Result<Vec<IpAddr>> + Send + Sync + 'static) -> Self {
		Self { answer: Arc::new(f), calls: Arc::new(AtomicUsize::new(0)) }
	}

	fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}

impl Resolver for StaticResolver {
	fn resolve(&self, _ctx: &DialContext, _domain: &str) -> std::io::Result<Vec<IpAddr>> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		(self.answer)()
	}
}

fn listener() -> (TcpListener, SocketAddr) {
	let listener = TcpListener::bind("127.0.0.1:0").unwrap();
	let addr = listener.local_addr().unwrap();
	(listener, addr)
}

#[test]
fn literal_ip_dials_once_without_resolver() {
	init_tracing();
	let (_listener, addr) = listener();
	let protector = RecordingProtector::default();
	let resolver = StaticResolver::new(vec![ip("127.0.0.2")]);
	let dialer = ProtectedDialer::new(protector.clone(), resolver.clone());

	let conn = dialer
		.dial(&DialContext::background(), None, &Destination::tcp(addr.ip(), addr.port()), None)
		.unwrap();

	assert_eq!(resolver.calls(), 0);
	assert_eq!(protector.calls(), 1);
	assert_eq!(conn.peer_addr().unwrap(), addr);
}

#[test]
fn unreachable_first_candidate_falls_through() {
	init_tracing();
	let (listener, addr) = listener();
	let protector = RecordingProtector::default();
	let resolver = StaticResolver::new(vec![ip("127.0.0.2"), ip("127.0.0.1")]);
	let dialer = ProtectedDialer::new(protector.clone(), resolver.clone());

	let mut conn = dialer
		.dial(&DialContext::background(), None, &Destination::tcp("example.test", addr.port()), None)
		.unwrap();

	assert_eq!(resolver.calls(), 1);
	assert_eq!(protector.calls(), 2);
	assert!(conn.is_stream());
	assert_eq!(conn.peer_addr().unwrap(), addr);

	let (mut server, _) = listener.accept().unwrap();
	conn.write_all(b"hello").unwrap();
	let mut buf = [0u8; 5];
	server.read_exact(&mut buf).unwrap();
	assert_eq!(&buf, b"hello");
}

#[test]
fn attempts_follow_resolver_order_until_success() {
	init_tracing();
	let (_listener, addr) = listener();
	let protector = RecordingProtector::default();
	let resolver = StaticResolver::new(vec![
		ip("127.0.0.2"),
		ip("127.0.0.3"),
		ip("127.0.0.1"),
		ip("127.0.0.4"),
	]);
	let dialer = ProtectedDialer::new(protector.clone(), resolver);

	let conn = dialer
		.dial(&DialContext::background(), None, &Destination::tcp("example.test", addr.port()), None)
		.unwrap();

	assert_eq!(protector.calls(), 3);
	assert_eq!(conn.peer_addr().unwrap(), addr);
}

#[test]
fn first_success_stops_iteration() {
	let (_listener, addr) = listener();
	let protector = RecordingProtector::default();
	let resolver = StaticResolver::new(vec![ip("127.0.0.1"), ip("127.0.0.2")]);
	let dialer = ProtectedDialer::new(protector.clone(), resolver);

	dialer
		.dial(&DialContext::background(), None, &Destination::tcp("example.test", addr.port()), None)
		.unwrap();

	assert_eq!(protector.calls(), 1);
}

#[test]
fn empty_resolution_makes_no_attempts() {
	let protector = RecordingProtector::default();
	let resolver = StaticResolver::new(Vec::new());
	let dialer = ProtectedDialer::new(protector.clone(), resolver.clone());

	let err = dialer
		.dial(&DialContext::background(), None, &Destination::tcp("example.test", 443), None)
		.unwrap_err();

	assert!(matches!(err, DialError::EmptyResponse));
	assert_eq!(resolver.calls(), 1);
	assert_eq!(protector.calls(), 0);
}

#[test]
fn resolver_error_aborts_dial() {
	let protector = RecordingProtector::default();
	let resolver = StaticResolver::from_fn(|| {
		Err(std::io::Error::new(std::io::ErrorKind::NotFound, "no such host"))
	});
	let dialer = ProtectedDialer::new(protector.clone(), resolver);

	let err = dialer
		.dial(&DialContext::background(), None, &Destination::tcp("example.test", 443), None)
		.unwrap_err();

	match err {
		DialError::Resolve { domain, source } => {
			assert_eq!(domain, "example.test");
			assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
		}
		other => panic!("unexpected error: {other}"),
	}
	assert_eq!(protector.calls(), 0);
}

#[test]
fn cancelled_context_skips_resolution() {
	let protector = RecordingProtector::default();
	let resolver = StaticResolver::new(vec![ip("127.0.0.1")]);
	let dialer = ProtectedDialer::new(protector.clone(), resolver.clone());

	let ctx = DialContext::background();
	ctx.cancel();
	let err = dialer
		.dial(&ctx, None, &Destination::tcp("example.test", 443), None)
		.unwrap_err();

	assert!(matches!(err, DialError::Cancelled));
	assert_eq!(resolver.calls(), 0);
	assert_eq!(protector.calls(), 0);
}

#[test]
fn last_attempt_error_is_returned() {
	init_tracing();
	let (_listener, addr) = listener();
	let candidates = vec![ip("127.0.0.2"), ip("127.0.0.3")];

	// First candidate refused by the protector, second refused by the peer.
	let calls = Arc::new(AtomicUsize::new(0));
	let counter = calls.clone();
	let reject_first = move |_fd: RawFd| counter.fetch_add(1, Ordering::SeqCst) != 0;
	let dialer = ProtectedDialer::new(reject_first, StaticResolver::new(candidates.clone()));
	let err = dialer
		.dial(&DialContext::background(), None, &Destination::tcp("example.test", addr.port()), None)
		.unwrap_err();
	match err {
		DialError::Socket(source) => assert_eq!(source.kind(), std::io::ErrorKind::ConnectionRefused),
		other => panic!("unexpected error: {other}"),
	}

	// Reversed: the last candidate fails protection.
	let calls = Arc::new(AtomicUsize::new(0));
	let counter = calls.clone();
	let reject_second = move |_fd: RawFd| counter.fetch_add(1, Ordering::SeqCst) == 0;
	let dialer = ProtectedDialer::new(reject_second, StaticResolver::new(candidates));
	let err = dialer
		.dial(&DialContext::background(), None, &Destination::tcp("example.test", addr.port()), None)
		.unwrap_err();
	assert!(matches!(err, DialError::ProtectFailed));
	assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn unknown_network_panics_before_any_socket() {
	let protector = RecordingProtector::default();
	let dialer = ProtectedDialer::new(protector.clone(), StaticResolver::new(vec![ip("127.0.0.1")]));
	let dest = Destination::new(Network::Unknown, ip("127.0.0.1"), 80);

	let result = catch_unwind(AssertUnwindSafe(|| {
		dialer.dial(&DialContext::background(), None, &dest, None)
	}));

	assert!(result.is_err());
	assert_eq!(protector.calls(), 0);
}

#[test]
#[should_panic(expected = "connect to invalid destination")]
fn missing_address_panics() {
	let dialer = ProtectedDialer::new(NoopProtector, StaticResolver::new(Vec::new()));
	let dest = Destination { network: Network::Tcp, address: None, port: 80 };
	let _ = dialer.dial(&DialContext::background(), None, &dest, None);
}

#[test]
fn udp_dial_returns_packet_conn_with_peer() {
	let server = UdpSocket::bind("127.0.0.1:0").unwrap();
	let addr = server.local_addr().unwrap();
	let dialer = ProtectedDialer::new(NoopProtector, StaticResolver::new(vec![addr.ip()]));

	let mut conn = dialer
		.dial(&DialContext::background(), None, &Destination::udp("dns.test", addr.port()), None)
		.unwrap();
	let packet = conn.as_packet().unwrap();
	assert_eq!(packet.dest(), addr);

	conn.write_all(b"query").unwrap();
	let mut buf = [0u8; 64];
	let (n, from) = server.recv_from(&mut buf).unwrap();
	assert_eq!(&buf[..n], b"query");

	server.send_to(b"answer", from).unwrap();
	let n = conn.read(&mut buf).unwrap();
	assert_eq!(&buf[..n], b"answer");
}

#[test]
fn ipv6_datagram_dial() {
	// Containers without IPv6 loopback cannot run this.
	let Ok(server) = UdpSocket::bind("[::1]:0") else {
		return;
	};
	let addr = server.local_addr().unwrap();
	let dialer = ProtectedDialer::new(NoopProtector, StaticResolver::new(Vec::new()));

	let conn = dialer
		.dial(&DialContext::background(), None, &Destination::udp(addr.ip(), addr.port()), None)
		.unwrap();

	let packet = conn.into_packet().unwrap();
	assert_eq!(packet.dest(), addr);
	assert!(packet.local_addr().unwrap().is_ipv6());

	packet.send(b"v6").unwrap();
	let mut buf = [0u8; 8];
	let (n, _) = server.recv_from(&mut buf).unwrap();
	assert_eq!(&buf[..n], b"v6");
}

#[test]
fn elapsed_attempt_deadline_fails_each_candidate() {
	let (_listener, addr) = listener();
	let protector = RecordingProtector::default();
	let resolver = StaticResolver::new(vec![ip("127.0.0.1"), ip("127.0.0.1")]);
	let config = DialerConfig::new().attempt_timeout(Duration::ZERO);
	let dialer = ProtectedDialer::with_config(protector.clone(), resolver, config);

	let err = dialer
		.dial(&DialContext::background(), None, &Destination::tcp("example.test", addr.port()), None)
		.unwrap_err();

	assert!(matches!(err, DialError::TimedOut { addr: a } if a == addr));
	assert_eq!(protector.calls(), 2);
}

#[test]
fn socket_options_are_applied_before_connect() {
	let (_listener, addr) = listener();
	let dialer = ProtectedDialer::new(NoopProtector, StaticResolver::new(Vec::new()));
	let opts = SocketOptions::new().ttl(33).tcp_nodelay(true).bind_source(true);

	let conn = dialer
		.dial(
			&DialContext::background(),
			Some(ip("127.0.0.1")),
			&Destination::tcp(addr.ip(), addr.port()),
			Some(&opts),
		)
		.unwrap();

	let mut ttl: libc::c_int = 0;
	let mut len = std::mem::size_of::<libc::c_int>() as libc::socklen_t;
	let ret = unsafe {
		libc::getsockopt(
			conn.as_raw_fd(),
			libc::IPPROTO_IP,
			libc::IP_TTL,
			&mut ttl as *mut _ as *mut libc::c_void,
			&mut len,
		)
	};
	assert_eq!(ret, 0);
	assert_eq!(ttl, 33);
	assert_eq!(conn.local_addr().unwrap().ip(), ip("127.0.0.1"));
}

#[test]
fn unix_kind_dials_a_stream() {
	let (_listener, addr) = listener();
	let dialer = ProtectedDialer::new(NoopProtector, StaticResolver::new(Vec::new()));
	let dest = Destination::new(Network::Unix, Address::Ip(addr.ip()), addr.port());

	let conn = dialer.dial(&DialContext::background(), None, &dest, None).unwrap();

	assert!(conn.is_stream());
	assert_eq!(conn.peer_addr().unwrap(), addr);
}

#[test]
fn concurrent_dials_share_one_dialer() {
	let (_listener, addr) = listener();
	let protector = RecordingProtector::default();
	let dialer = ProtectedDialer::new(protector.clone(), StaticResolver::new(vec![ip("127.0.0.1")]));

	let handles: Vec<_> = (0..8)
		.map(|_| {
			let dialer = dialer.clone();
			std::thread::spawn(move || {
				dialer
					.dial(&DialContext::background(), None, &Destination::tcp("example.test", addr.port()), None)
					.map(|conn| conn.peer_addr().unwrap())
			})
		})
		.collect();

	for handle in handles {
		assert_eq!(handle.join().unwrap().unwrap(), addr);
	}
	assert_eq!(protector.calls(), 8);
}

#[test]
fn shared_protector_and_resolver_via_from_shared() {
	let (_listener, addr) = listener();
	let recorder = RecordingProtector::default();
	let resolver = StaticResolver::new(vec![ip("127.0.0.2"), ip("127.0.0.1")]);

	let protector: Arc<dyn Protector> = Arc::new(recorder.clone());
	let shared: Arc<dyn Resolver> = Arc::new(resolver.clone());
	let first = ProtectedDialer::from_shared(protector.clone(), shared.clone(), DialerConfig::default());
	let second = ProtectedDialer::from_shared(protector, shared, DialerConfig::default());

	for dialer in [&first, &second] {
		let conn = dialer
			.dial(&DialContext::background(), None, &Destination::tcp("example.test", addr.port()), None)
			.unwrap();
		assert_eq!(conn.peer_addr().unwrap(), addr);
	}

	assert_eq!(resolver.calls(), 2);
	assert_eq!(recorder.calls(), 4);
}
