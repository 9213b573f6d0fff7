//! The protected dial.
//!
//! For each candidate address, in resolver order: create a raw socket,
//! protect it, apply socket options, connect with a per-attempt deadline,
//! and wrap the descriptor. The first success wins; otherwise the error of
//! the last candidate is returned.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::os::fd::OwnedFd;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace, warn};
use crate::addr::Family;
use crate::config::DialerConfig;
use crate::connection::Connection;
use crate::destination::{Address, Destination, Network};
use crate::error::DialError;
use crate::protect::Protector;
use crate::resolve::{DialContext, Resolver};
use crate::socket::{self, PacketConn, RawSocket, SocketOptions, StreamConn};

/// Dials outbound connections that bypass the tunnel.
///
/// Cheap to clone; clones share the protector and resolver. Safe to use from
/// many threads, each `dial` is self-contained.
#[derive(Clone)]
pub struct ProtectedDialer {
	protector: Arc<dyn Protector>,
	resolver: Arc<dyn Resolver>,
	config: DialerConfig,
}

impl ProtectedDialer {
	pub fn new<P, R>(protector: P, resolver: R) -> Self
	where
		P: Protector + 'static,
		R: Resolver + 'static,
	{
		Self::with_config(protector, resolver, DialerConfig::default())
	}

	pub fn with_config<P, R>(protector: P, resolver: R, config: DialerConfig) -> Self
	where
		P: Protector + 'static,
		R: Resolver + 'static,
	{
		Self {
			protector: Arc::new(protector),
			resolver: Arc::new(resolver),
			config,
		}
	}

	/// Builds a dialer around already shared collaborators.
	pub fn from_shared(
		protector: Arc<dyn Protector>,
		resolver: Arc<dyn Resolver>,
		config: DialerConfig,
	) -> Self {
		Self { protector, resolver, config }
	}

	pub fn config(&self) -> &DialerConfig {
		&self.config
	}

	/// Dials `destination`.
	///
	/// `ctx` bounds resolution only. `source` and `sockopt` are handed to
	/// [`SocketOptions::apply`] for every attempt.
	///
	/// # Panics
	///
	/// If the destination's network is [`Network::Unknown`] or it has no address.
	pub fn dial(
		&self,
		ctx: &DialContext,
		source: Option<IpAddr>,
		destination: &Destination,
		sockopt: Option<&SocketOptions>,
	) -> Result<Connection, DialError> {
		let address = match &destination.address {
			Some(address) if destination.is_valid() => address,
			_ => panic!("connect to invalid destination"),
		};

		let ips = match address {
			Address::Domain(domain) => self.resolve(ctx, domain)?,
			Address::Ip(ip) => vec![*ip],
		};

		let mut last_err = None;
		for (i, ip) in ips.iter().enumerate() {
			if i > 0 {
				if let Some(err) = &last_err {
					warn!("dial system failed: {err}");
				}
				debug!("trying next address: {ip}");
			}

			match self.dial_one(*ip, source, destination, sockopt) {
				Ok(conn) => return Ok(conn),
				Err(err @ DialError::Wrap(_)) => return Err(err),
				Err(err) => last_err = Some(err),
			}
		}

		Err(last_err.unwrap_or(DialError::EmptyResponse))
	}

	fn resolve(&self, ctx: &DialContext, domain: &str) -> Result<Vec<IpAddr>, DialError> {
		ctx.check()?;
		let ips = self.resolver
			.resolve(ctx, domain)
			.map_err(|source| DialError::Resolve { domain: domain.to_string(), source })?;
		ctx.check()?;

		let mode = self.config.ipv6_mode;
		let ips: Vec<IpAddr> = ips.into_iter().filter(|ip| mode.allows(ip)).collect();
		if ips.is_empty() {
			return Err(DialError::EmptyResponse);
		}
		trace!(domain, candidates = ips.len(), "resolved");
		Ok(ips)
	}

	/// One protect→configure→connect sequence against a single candidate.
	fn dial_one(
		&self,
		ip: IpAddr,
		source: Option<IpAddr>,
		destination: &Destination,
		sockopt: Option<&SocketOptions>,
	) -> Result<Connection, DialError> {
		let deadline = Instant::now() + self.config.attempt_timeout;
		let destination = destination.with_ip(ip);
		let peer = SocketAddr::new(ip, destination.port);

		let (ty, protocol) = socket::socket_kind(destination.network)?;
		let socket = RawSocket::new(Family::of(&ip), ty, protocol)?;

		if !self.protector.protect(socket.as_raw_fd()) {
			return Err(DialError::ProtectFailed);
		}

		if let Some(opts) = sockopt {
			opts.apply(&socket, destination.network, source)?;
		}
		if Instant::now() >= deadline {
			return Err(DialError::TimedOut { addr: peer });
		}

		let fd = socket.connect(&peer, deadline).map_err(|err| connect_error(peer, err))?;
		trace!(%peer, network = %destination.network, "connected");

		wrap(fd, &destination)
	}
}
/*
Every early return above drops `socket`, which closes the descriptor.
After connect() the fd is owned by `fd`, and wrap() either moves it into
a connection or drops it on error. No path leaves a descriptor open.
 */

fn connect_error(peer: SocketAddr, err: std::io::Error) -> DialError {
	match err.kind() {
		std::io::ErrorKind::TimedOut => DialError::TimedOut { addr: peer },
		_ => DialError::Socket(err),
	}
}

fn wrap(fd: OwnedFd, destination: &Destination) -> Result<Connection, DialError> {
	match destination.network {
		Network::Udp => {
			let dest: SocketAddr = destination.net_addr().parse().map_err(|err| {
				DialError::Wrap(std::io::Error::new(std::io::ErrorKind::InvalidInput, err))
			})?;
			Ok(Connection::Packet(PacketConn::from_fd(fd, dest)))
		}
		_ => Ok(Connection::Stream(StreamConn::from_fd(fd))),
	}
}

impl fmt::Debug for ProtectedDialer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ProtectedDialer")
			.field("config", &self.config)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::protect::NoopProtector;
	use std::sync::Mutex;
	use std::os::fd::RawFd;

	fn no_resolver(_: &DialContext, domain: &str) -> std::io::Result<Vec<IpAddr>> {
		panic!("resolver called for {domain}");
	}

	#[test]
	fn literal_ip_skips_resolver() {
		let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
		let addr = listener.local_addr().unwrap();
		let dialer = ProtectedDialer::new(NoopProtector, no_resolver);

		let conn = dialer
			.dial(&DialContext::background(), None, &Destination::tcp(addr.ip(), addr.port()), None)
			.unwrap();
		assert!(conn.is_stream());
		assert_eq!(conn.peer_addr().unwrap(), addr);
	}

	#[test]
	fn filtered_out_candidates_are_empty_response() {
		let resolver = |_: &DialContext, _: &str| -> std::io::Result<Vec<IpAddr>> {
			Ok(vec!["2001:db8::1".parse().unwrap()])
		};
		let protected = Arc::new(Mutex::new(Vec::<RawFd>::new()));
		let seen = protected.clone();
		let protector = move |fd: RawFd| {
			seen.lock().unwrap().push(fd);
			true
		};
		let config = DialerConfig::new().ipv6_mode(crate::config::Ipv6Mode::Disable);
		let dialer = ProtectedDialer::with_config(protector, resolver, config);

		let err = dialer
			.dial(&DialContext::background(), None, &Destination::tcp("example.test", 443), None)
			.unwrap_err();
		assert!(matches!(err, DialError::EmptyResponse));
		assert!(protected.lock().unwrap().is_empty());
	}

	#[test]
	fn connect_timeout_maps_to_timed_out() {
		let peer: SocketAddr = "192.0.2.1:443".parse().unwrap();
		let expired: std::io::Error = crate::error::SocketError::Connect { errno: libc::ETIMEDOUT, addr: peer }.into();
		assert!(matches!(connect_error(peer, expired), DialError::TimedOut { addr } if addr == peer));

		let refused: std::io::Error = crate::error::SocketError::Connect { errno: libc::ECONNREFUSED, addr: peer }.into();
		match connect_error(peer, refused) {
			DialError::Socket(err) => assert_eq!(err.kind(), std::io::ErrorKind::ConnectionRefused),
			other => panic!("unexpected {other:?}"),
		}
	}

	#[test]
	fn malformed_udp_destination_is_wrap_error() {
		let server = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
		let addr = server.local_addr().unwrap();
		let socket = RawSocket::new(Family::Ipv4, socket::SockType::Datagram, libc::IPPROTO_UDP).unwrap();
		let fd = socket.connect(&addr, Instant::now() + std::time::Duration::from_secs(1)).unwrap();

		let bad = Destination { network: Network::Udp, address: Some(Address::Domain("not an ip".into())), port: 53 };
		assert!(matches!(wrap(fd, &bad), Err(DialError::Wrap(_))));
	}
}
