mod raw;
mod pending;
mod stream;
mod datagram;
mod options;
mod config;

pub use self::raw::RawSocket;
pub use self::pending::PendingConnect;
pub use self::stream::{StreamConn, Shutdown};
pub use self::datagram::PacketConn;
pub use self::config::{SocketOptions, BufferConfig, KeepaliveConfig};
pub use self::options::{set_tcp_nodelay, set_recv_buffer_size, set_send_buffer_size,
						set_keepalive, set_keepalive_idle, set_keepalive_interval, set_keepalive_count,
						set_ttl, set_unicast_hops, set_nonblocking,
						set_read_timeout, set_write_timeout, take_error, local_addr, peer_addr};
#[cfg(any(target_os = "linux", target_os = "android"))]
pub use self::options::{set_mark, bind_to_device};

use crate::destination::Network;
use crate::error::DialError;

/// Socket type passed to the `socket()` syscall.
///
/// - `Stream`: reliable, ordered byte stream (TCP-like)
/// - `Datagram`: unreliable, unordered packets (UDP-like)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SockType {
	Stream,
	Datagram,
}

impl SockType {
	/// Returns the libc constant for this socket type.
	#[inline]
	pub fn raw(self) -> libc::c_int {
		match self {
			SockType::Stream => libc::SOCK_STREAM,
			SockType::Datagram => libc::SOCK_DGRAM,
		}
	}
}

/// Socket type and protocol number for a network kind.
///
/// ```text
///   Tcp  -> SOCK_STREAM, IPPROTO_TCP
///   Udp  -> SOCK_DGRAM,  IPPROTO_UDP
///   Unix -> SOCK_STREAM, 0
/// ```
pub fn socket_kind(network: Network) -> Result<(SockType, libc::c_int), DialError> {
	match network {
		Network::Tcp => Ok((SockType::Stream, libc::IPPROTO_TCP)),
		Network::Udp => Ok((SockType::Datagram, libc::IPPROTO_UDP)),
		Network::Unix => Ok((SockType::Stream, 0)),
		Network::Unknown => Err(DialError::UnknownNetwork),
	}
}
