use std::net::SocketAddr;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::time::Instant;
use crate::addr::{Family, ToSockAddr};
use crate::error::{SocketError, errno};
use super::pending::PendingConnect;
use super::{SockType, options};

/// A raw socket that has been created but not yet connected.
///
/// Owned by exactly one dial attempt. Dropping it closes the descriptor,
/// which is how every failed step releases it.
#[derive(Debug)]
pub struct RawSocket {
	fd: OwnedFd,
	family: Family,
}

impl RawSocket {
	/// Creates a new raw socket.
	///
	/// Calls the `socket()` syscall with the given family, type and protocol.
	/// The socket is created with `SOCK_CLOEXEC` (close on exec).
	pub fn new(family: Family, ty: SockType, protocol: libc::c_int) -> std::io::Result<Self> {
		let fd = unsafe {
			libc::socket(family.raw(), ty.raw() | libc::SOCK_CLOEXEC, protocol)
		};
		if fd == -1 {
			return Err(SocketError::Create { errno: errno() }.into());
		}
		let fd = unsafe { OwnedFd::from_raw_fd(fd) };

		Ok(Self { fd, family })
	}

	/// Returns the raw file descriptor.
	///
	/// Does not transfer ownership.
	#[inline]
	pub fn as_raw_fd(&self) -> libc::c_int {
		self.fd.as_raw_fd()
	}

	pub fn family(&self) -> Family {
		self.family
	}

	/// Binds the socket to a local address.
	pub fn bind(&self, addr: &SocketAddr) -> std::io::Result<()> {
		let result = addr.with_raw(|ptr, len| unsafe {
			libc::bind(self.as_raw_fd(), ptr, len)
		});

		if result == -1 {
			Err(SocketError::Bind { errno: errno(), addr: *addr }.into())
		} else {
			Ok(())
		}
	}

	/// Starts a non-blocking connection.
	///
	/// Sets the socket to non-blocking, initiates connect, returns immediately.
	/// Wait on the returned [`PendingConnect`] for the outcome.
	pub fn connect_nonblocking(self, addr: &SocketAddr) -> std::io::Result<PendingConnect> {
		options::set_nonblocking(&self, true)?;

		let result = addr.with_raw(|ptr, len| unsafe {
			libc::connect(self.as_raw_fd(), ptr, len)
		});

		match result {
			// Immediate success: always for datagrams, sometimes on loopback
			0 => Ok(PendingConnect::connected(self.fd, *addr)),
			-1 => {
				let e = errno();
				if e == libc::EINPROGRESS || e == libc::EINTR {
					Ok(PendingConnect::in_progress(self.fd, *addr))
				} else {
					Err(SocketError::Connect { errno: e, addr: *addr }.into())
				}
			}
			_ => Err(SocketError::Connect { errno: libc::EINVAL, addr: *addr }.into()),
		}
	}

	/// Connects to `addr`, giving up at `deadline`.
	///
	/// On success the descriptor is back in blocking mode and ownership moves
	/// to the caller. On any failure the descriptor is closed.
	pub fn connect(self, addr: &SocketAddr, deadline: Instant) -> std::io::Result<OwnedFd> {
		let pending = self.connect_nonblocking(addr)?;
		let fd = pending.wait(deadline)?;
		options::set_nonblocking(&fd, false)?;
		Ok(fd)
	}

	pub(crate) fn into_fd(self) -> OwnedFd {
		self.fd
	}
}
/*
What connect() does:
1. Family::raw() / SockType::raw() already chose AF_INET or AF_INET6 and SOCK_STREAM or SOCK_DGRAM
2. connect() is issued non-blocking so the attempt deadline can be enforced with poll()
3. SO_ERROR tells whether the handshake actually succeeded
4. The fd goes back to blocking mode before it is handed to a connection wrapper
 */

impl std::os::fd::AsRawFd for RawSocket {
	fn as_raw_fd(&self) -> std::os::fd::RawFd {
		self.fd.as_raw_fd()
	}
}

impl std::os::fd::AsFd for RawSocket {
	fn as_fd(&self) -> std::os::fd::BorrowedFd<'_> {
		self.fd.as_fd()
	}
}

impl From<RawSocket> for OwnedFd {
	fn from(socket: RawSocket) -> Self {
		socket.into_fd()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;

	#[test]
	fn connect_to_loopback_listener() {
		let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
		let addr = listener.local_addr().unwrap();

		let socket = RawSocket::new(Family::Ipv4, SockType::Stream, libc::IPPROTO_TCP).unwrap();
		let fd = socket.connect(&addr, Instant::now() + Duration::from_secs(5)).unwrap();
		assert_eq!(options::peer_addr(&fd).unwrap(), addr);

		let flags = unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_GETFL) };
		assert_eq!(flags & libc::O_NONBLOCK, 0);
	}

	#[test]
	fn refused_connect_reports_address() {
		let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
		let addr = listener.local_addr().unwrap();
		drop(listener);

		let socket = RawSocket::new(Family::Ipv4, SockType::Stream, libc::IPPROTO_TCP).unwrap();
		let err = socket.connect(&addr, Instant::now() + Duration::from_secs(5)).unwrap_err();
		assert_eq!(err.kind(), std::io::ErrorKind::ConnectionRefused);
	}
}
