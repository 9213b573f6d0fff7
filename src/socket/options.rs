use std::net::SocketAddr;
use std::os::fd::AsRawFd;
use std::time::Duration;
use crate::addr;
use crate::error::{SocketError, errno};

fn set_int_option<S: AsRawFd>(
	socket: &S,
	level: libc::c_int,
	name: libc::c_int,
	val: libc::c_int,
	option: &'static str,
) -> std::io::Result<()> {
	let result = unsafe {
		libc::setsockopt(
			socket.as_raw_fd(),
			level,
			name,
			&val as *const _ as *const libc::c_void,
			std::mem::size_of::<libc::c_int>() as libc::socklen_t,
		)
	};
	if result == -1 {
		Err(SocketError::SetOption { errno: errno(), option }.into())
	} else {
		Ok(())
	}
}

/// Sets TCP_NODELAY on a socket.
///
/// Disables Nagle's algorithm so data is sent immediately.
pub fn set_tcp_nodelay<S: AsRawFd>(socket: &S, enable: bool) -> std::io::Result<()> {
	set_int_option(socket, libc::IPPROTO_TCP, libc::TCP_NODELAY, enable as libc::c_int, "TCP_NODELAY")
}

/// Sets receive buffer size (SO_RCVBUF).
///
/// Kernel typically doubles this value internally.
pub fn set_recv_buffer_size<S: AsRawFd>(socket: &S, size: usize) -> std::io::Result<()> {
	set_int_option(socket, libc::SOL_SOCKET, libc::SO_RCVBUF, size as libc::c_int, "SO_RCVBUF")
}

/// Sets send buffer size (SO_SNDBUF).
pub fn set_send_buffer_size<S: AsRawFd>(socket: &S, size: usize) -> std::io::Result<()> {
	set_int_option(socket, libc::SOL_SOCKET, libc::SO_SNDBUF, size as libc::c_int, "SO_SNDBUF")
}

/// Enables TCP keep-alive (SO_KEEPALIVE).
///
/// Use with TCP_KEEPIDLE, TCP_KEEPINTVL, TCP_KEEPCNT to tune timing.
pub fn set_keepalive<S: AsRawFd>(socket: &S, enable: bool) -> std::io::Result<()> {
	set_int_option(socket, libc::SOL_SOCKET, libc::SO_KEEPALIVE, enable as libc::c_int, "SO_KEEPALIVE")
}

/// Seconds of idle time before the first keep-alive probe (TCP_KEEPIDLE).
pub fn set_keepalive_idle<S: AsRawFd>(socket: &S, seconds: u32) -> std::io::Result<()> {
	set_int_option(socket, libc::IPPROTO_TCP, libc::TCP_KEEPIDLE, seconds as libc::c_int, "TCP_KEEPIDLE")
}

/// Seconds between unanswered keep-alive probes (TCP_KEEPINTVL).
pub fn set_keepalive_interval<S: AsRawFd>(socket: &S, seconds: u32) -> std::io::Result<()> {
	set_int_option(socket, libc::IPPROTO_TCP, libc::TCP_KEEPINTVL, seconds as libc::c_int, "TCP_KEEPINTVL")
}

/// Unacknowledged probes before the peer is declared dead (TCP_KEEPCNT).
pub fn set_keepalive_count<S: AsRawFd>(socket: &S, count: u32) -> std::io::Result<()> {
	set_int_option(socket, libc::IPPROTO_TCP, libc::TCP_KEEPCNT, count as libc::c_int, "TCP_KEEPCNT")
}

/// Sets the routing mark (SO_MARK).
///
/// Policy routing rules can match on the mark to send the socket's traffic
/// around the tunnel. Needs CAP_NET_ADMIN.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn set_mark<S: AsRawFd>(socket: &S, mark: u32) -> std::io::Result<()> {
	set_int_option(socket, libc::SOL_SOCKET, libc::SO_MARK, mark as libc::c_int, "SO_MARK")
}

/// Binds the socket to a network interface (SO_BINDTODEVICE).
#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn bind_to_device<S: AsRawFd>(socket: &S, interface: &str) -> std::io::Result<()> {
	if interface.len() >= libc::IFNAMSIZ {
		return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, "interface name too long"));
	}
	let result = unsafe {
		libc::setsockopt(
			socket.as_raw_fd(),
			libc::SOL_SOCKET,
			libc::SO_BINDTODEVICE,
			interface.as_ptr() as *const libc::c_void,
			interface.len() as libc::socklen_t,
		)
	};
	if result == -1 {
		Err(SocketError::SetOption { errno: errno(), option: "SO_BINDTODEVICE" }.into())
	} else {
		Ok(())
	}
}

/// Sets the IPv4 time-to-live (IP_TTL).
pub fn set_ttl<S: AsRawFd>(socket: &S, ttl: u32) -> std::io::Result<()> {
	set_int_option(socket, libc::IPPROTO_IP, libc::IP_TTL, ttl as libc::c_int, "IP_TTL")
}

/// Sets the IPv6 hop limit (IPV6_UNICAST_HOPS).
pub fn set_unicast_hops<S: AsRawFd>(socket: &S, hops: u32) -> std::io::Result<()> {
	set_int_option(socket, libc::IPPROTO_IPV6, libc::IPV6_UNICAST_HOPS, hops as libc::c_int, "IPV6_UNICAST_HOPS")
}

/// Toggles O_NONBLOCK.
pub fn set_nonblocking<S: AsRawFd>(socket: &S, nonblocking: bool) -> std::io::Result<()> {
	let flags = unsafe { libc::fcntl(socket.as_raw_fd(), libc::F_GETFL) };
	if flags == -1 {
		return Err(SocketError::GetOption { errno: errno(), option: "F_GETFL" }.into());
	}
	let new_flags = if nonblocking {
		flags | libc::O_NONBLOCK
	} else {
		flags & !libc::O_NONBLOCK
	};
	let result = unsafe { libc::fcntl(socket.as_raw_fd(), libc::F_SETFL, new_flags) };
	if result == -1 {
		return Err(SocketError::SetOption { errno: errno(), option: "O_NONBLOCK" }.into());
	}
	Ok(())
}

fn set_timeout<S: AsRawFd>(
	socket: &S,
	name: libc::c_int,
	timeout: Option<Duration>,
	option: &'static str,
) -> std::io::Result<()> {
	// A zero timeval means "block forever" to the kernel.
	let tv = match timeout {
		Some(dur) if dur.is_zero() => {
			return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, "zero timeout"));
		}
		Some(dur) => libc::timeval {
			tv_sec: dur.as_secs().min(libc::time_t::MAX as u64) as libc::time_t,
			tv_usec: dur.subsec_micros() as libc::suseconds_t,
		},
		None => libc::timeval { tv_sec: 0, tv_usec: 0 },
	};
	let result = unsafe {
		libc::setsockopt(
			socket.as_raw_fd(),
			libc::SOL_SOCKET,
			name,
			&tv as *const _ as *const libc::c_void,
			std::mem::size_of::<libc::timeval>() as libc::socklen_t,
		)
	};
	if result == -1 {
		Err(SocketError::SetOption { errno: errno(), option }.into())
	} else {
		Ok(())
	}
}

/// Sets SO_RCVTIMEO. `None` blocks indefinitely.
pub fn set_read_timeout<S: AsRawFd>(socket: &S, timeout: Option<Duration>) -> std::io::Result<()> {
	set_timeout(socket, libc::SO_RCVTIMEO, timeout, "SO_RCVTIMEO")
}

/// Sets SO_SNDTIMEO. `None` blocks indefinitely.
pub fn set_write_timeout<S: AsRawFd>(socket: &S, timeout: Option<Duration>) -> std::io::Result<()> {
	set_timeout(socket, libc::SO_SNDTIMEO, timeout, "SO_SNDTIMEO")
}

/// Reads and clears the pending socket error (SO_ERROR).
///
/// Returns `None` if no error is pending.
pub fn take_error<S: AsRawFd>(socket: &S) -> std::io::Result<Option<std::io::Error>> {
	let mut error: libc::c_int = 0;
	let mut len = std::mem::size_of::<libc::c_int>() as libc::socklen_t;

	let result = unsafe {
		libc::getsockopt(
			socket.as_raw_fd(),
			libc::SOL_SOCKET,
			libc::SO_ERROR,
			&mut error as *mut _ as *mut libc::c_void,
			&mut len,
		)
	};

	if result == -1 {
		return Err(SocketError::GetOption { errno: errno(), option: "SO_ERROR" }.into());
	}

	if error == 0 {
		Ok(None)
	} else {
		Ok(Some(std::io::Error::from_raw_os_error(error)))
	}
}

/// Returns the local address of a socket (getsockname).
pub fn local_addr<S: AsRawFd>(socket: &S) -> std::io::Result<SocketAddr> {
	sock_name(socket, libc::getsockname, "SO_SOCKNAME")
}

/// Returns the remote address of a connected socket (getpeername).
pub fn peer_addr<S: AsRawFd>(socket: &S) -> std::io::Result<SocketAddr> {
	sock_name(socket, libc::getpeername, "SO_PEERNAME")
}

fn sock_name<S: AsRawFd>(
	socket: &S,
	call: unsafe extern "C" fn(libc::c_int, *mut libc::sockaddr, *mut libc::socklen_t) -> libc::c_int,
	option: &'static str,
) -> std::io::Result<SocketAddr> {
	let mut storage: libc::sockaddr_storage = unsafe { std::mem::zeroed() };
	let mut len = std::mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;

	let result = unsafe {
		call(
			socket.as_raw_fd(),
			&mut storage as *mut _ as *mut libc::sockaddr,
			&mut len,
		)
	};

	if result == -1 {
		return Err(SocketError::GetOption { errno: errno(), option }.into());
	}

	addr::from_storage(&storage, len)
		.ok_or_else(|| SocketError::InvalidAddress { reason: "invalid address" }.into())
}
