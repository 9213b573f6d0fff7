use std::net::{IpAddr, SocketAddr};
use tracing::{debug, trace};
use crate::addr::Family;
use crate::destination::Network;
use super::{
	RawSocket,
	set_tcp_nodelay, set_recv_buffer_size, set_send_buffer_size,
	set_keepalive, set_keepalive_idle, set_keepalive_interval, set_keepalive_count,
	set_ttl, set_unicast_hops,
};

// ============================================================================
// Shared Configuration Structs
// ============================================================================

/// Buffer size configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferConfig {
	pub recv: Option<usize>,
	pub send: Option<usize>,
}

impl BufferConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn recv(mut self, size: usize) -> Self {
		self.recv = Some(size);
		self
	}

	pub fn send(mut self, size: usize) -> Self {
		self.send = Some(size);
		self
	}

	pub fn both(mut self, size: usize) -> Self {
		self.recv = Some(size);
		self.send = Some(size);
		self
	}

	fn apply<S: std::os::fd::AsRawFd>(&self, socket: &S) -> std::io::Result<()> {
		if let Some(size) = self.recv {
			set_recv_buffer_size(socket, size)?;
		}
		if let Some(size) = self.send {
			set_send_buffer_size(socket, size)?;
		}
		Ok(())
	}
}

/// Keep-alive timing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepaliveConfig {
	pub idle_secs: u32,
	pub interval_secs: u32,
	pub count: u32,
}

impl Default for KeepaliveConfig {
	fn default() -> Self {
		Self {
			idle_secs: 60,
			interval_secs: 10,
			count: 5,
		}
	}
}

impl KeepaliveConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn idle(mut self, secs: u32) -> Self {
		self.idle_secs = secs;
		self
	}

	pub fn interval(mut self, secs: u32) -> Self {
		self.interval_secs = secs;
		self
	}

	pub fn count(mut self, count: u32) -> Self {
		self.count = count;
		self
	}

	fn apply<S: std::os::fd::AsRawFd>(&self, socket: &S) -> std::io::Result<()> {
		set_keepalive(socket, true)?;
		set_keepalive_idle(socket, self.idle_secs)?;
		set_keepalive_interval(socket, self.interval_secs)?;
		set_keepalive_count(socket, self.count)
	}
}

// ============================================================================
// Socket Options
// ============================================================================

/// Per-socket options applied between creation and connect.
///
/// The dialer never looks inside; it only calls [`apply`](Self::apply) on a
/// freshly protected socket. TCP-only settings are skipped for other networks.
///
/// # Example
/// ```ignore
/// use protectdial::{SocketOptions, KeepaliveConfig};
///
/// let opts = SocketOptions::new()
///     .mark(0xff)
///     .interface("wlan0")
///     .tcp_nodelay(true)
///     .keepalive(KeepaliveConfig::new().idle(30));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SocketOptions {
	/// Routing mark (SO_MARK).
	pub mark: Option<u32>,
	/// Interface to bind to (SO_BINDTODEVICE).
	pub interface: Option<String>,
	/// IPv4 TTL or IPv6 hop limit, by socket family.
	pub ttl: Option<u32>,
	pub tcp_nodelay: Option<bool>,
	pub keepalive: Option<KeepaliveConfig>,
	pub buffers: BufferConfig,
	/// Bind to the dial's source address (port 0) before connecting.
	pub bind_source: bool,
}

impl SocketOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn mark(mut self, mark: u32) -> Self {
		self.mark = Some(mark);
		self
	}

	pub fn interface(mut self, name: impl Into<String>) -> Self {
		self.interface = Some(name.into());
		self
	}

	pub fn ttl(mut self, ttl: u32) -> Self {
		self.ttl = Some(ttl);
		self
	}

	pub fn tcp_nodelay(mut self, enable: bool) -> Self {
		self.tcp_nodelay = Some(enable);
		self
	}

	pub fn keepalive(mut self, config: KeepaliveConfig) -> Self {
		self.keepalive = Some(config);
		self
	}

	pub fn buffers(mut self, config: BufferConfig) -> Self {
		self.buffers = config;
		self
	}

	pub fn bind_source(mut self, enable: bool) -> Self {
		self.bind_source = enable;
		self
	}

	/// Applies every configured option to `socket`.
	///
	/// `source` is only used when `bind_source` is set and its family matches
	/// the socket's.
	pub fn apply(&self, socket: &RawSocket, network: Network, source: Option<IpAddr>) -> std::io::Result<()> {
		if let Some(mark) = self.mark {
			apply_mark(socket, mark)?;
		}
		if let Some(interface) = &self.interface {
			apply_interface(socket, interface)?;
		}
		if let Some(ttl) = self.ttl {
			match socket.family() {
				Family::Ipv4 => set_ttl(socket, ttl)?,
				Family::Ipv6 => set_unicast_hops(socket, ttl)?,
			}
		}
		if network == Network::Tcp {
			if let Some(enable) = self.tcp_nodelay {
				set_tcp_nodelay(socket, enable)?;
			}
			if let Some(config) = self.keepalive {
				config.apply(socket)?;
			}
		}
		self.buffers.apply(socket)?;

		if self.bind_source {
			match source {
				Some(ip) if Family::of(&ip) == socket.family() => {
					socket.bind(&SocketAddr::new(ip, 0))?;
				}
				Some(ip) => debug!(%ip, "source family differs from socket, not binding"),
				None => trace!("no source address to bind"),
			}
		}
		Ok(())
	}
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn apply_mark(socket: &RawSocket, mark: u32) -> std::io::Result<()> {
	super::set_mark(socket, mark)
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn apply_mark(_socket: &RawSocket, _mark: u32) -> std::io::Result<()> {
	Err(std::io::Error::new(std::io::ErrorKind::Unsupported, "SO_MARK is not available on this platform"))
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn apply_interface(socket: &RawSocket, interface: &str) -> std::io::Result<()> {
	super::bind_to_device(socket, interface)
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn apply_interface(_socket: &RawSocket, _interface: &str) -> std::io::Result<()> {
	Err(std::io::Error::new(std::io::ErrorKind::Unsupported, "SO_BINDTODEVICE is not available on this platform"))
}
