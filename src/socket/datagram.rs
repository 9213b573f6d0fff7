use std::net::SocketAddr;
use std::os::fd::{AsFd, AsRawFd, IntoRawFd, OwnedFd, RawFd};
use std::time::Duration;
use crate::addr::{self, ToSockAddr};
use crate::error::{SocketError, IoError, errno};
use super::options;

/// A connected datagram socket with its peer baked in.
///
/// The descriptor is already `connect()`-ed, so [`send`](Self::send) and
/// [`recv`](Self::recv) implicitly target [`dest`](Self::dest). `send_to`
/// accepts an explicit address for engines that always pass one. On Linux an
/// explicit address overrides the connected peer for that datagram.
#[derive(Debug)]
pub struct PacketConn {
	fd: OwnedFd,
	dest: SocketAddr,
}

impl PacketConn {
	/// Takes ownership of a connected datagram descriptor.
	pub fn from_fd(fd: OwnedFd, dest: SocketAddr) -> Self {
		Self { fd, dest }
	}

	#[inline]
	pub fn as_raw_fd(&self) -> libc::c_int {
		self.fd.as_raw_fd()
	}

	/// The implicit peer for unaddressed sends.
	pub fn dest(&self) -> SocketAddr {
		self.dest
	}

	/// Sends a datagram to the connected peer.
	pub fn send(&self, buf: &[u8]) -> std::io::Result<usize> {
		let n = unsafe {
			libc::send(
				self.as_raw_fd(),
				buf.as_ptr() as *const libc::c_void,
				buf.len(),
				0,
			)
		};

		if n == -1 {
			Err(IoError::Write { errno: errno() }.into())
		} else {
			Ok(n as usize)
		}
	}

	/// Receives a datagram from the connected peer.
	pub fn recv(&self, buf: &mut [u8]) -> std::io::Result<usize> {
		let n = unsafe {
			libc::recv(
				self.as_raw_fd(),
				buf.as_mut_ptr() as *mut libc::c_void,
				buf.len(),
				0,
			)
		};

		if n == -1 {
			Err(IoError::Read { errno: errno() }.into())
		} else {
			Ok(n as usize)
		}
	}

	/// Sends data to a specific address.
	pub fn send_to(&self, buf: &[u8], addr: &SocketAddr) -> std::io::Result<usize> {
		if *addr == self.dest {
			return self.send(buf);
		}

		let n = addr.with_raw(|ptr, len| unsafe {
			libc::sendto(
				self.as_raw_fd(),
				buf.as_ptr() as *const libc::c_void,
				buf.len(),
				0,
				ptr,
				len,
			)
		});

		if n == -1 {
			Err(IoError::Write { errno: errno() }.into())
		} else {
			Ok(n as usize)
		}
	}

	/// Receives a datagram along with its source address.
	pub fn recv_from(&self, buf: &mut [u8]) -> std::io::Result<(usize, SocketAddr)> {
		let mut storage: libc::sockaddr_storage = unsafe { std::mem::zeroed() };
		let mut len = std::mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;

		let n = unsafe {
			libc::recvfrom(
				self.as_raw_fd(),
				buf.as_mut_ptr() as *mut libc::c_void,
				buf.len(),
				0,
				&mut storage as *mut _ as *mut libc::sockaddr,
				&mut len,
			)
		};

		if n == -1 {
			return Err(IoError::Read { errno: errno() }.into());
		}

		// Connected sockets may leave the address unset; fall back to the peer.
		let from = if len == 0 {
			self.dest
		} else {
			addr::from_storage(&storage, len)
				.ok_or(SocketError::InvalidAddress { reason: "invalid sender address" })?
		};

		Ok((n as usize, from))
	}

	pub fn set_nonblocking(&self, nonblocking: bool) -> std::io::Result<()> {
		options::set_nonblocking(self, nonblocking)
	}

	pub fn set_read_timeout(&self, timeout: Option<Duration>) -> std::io::Result<()> {
		options::set_read_timeout(self, timeout)
	}

	pub fn set_write_timeout(&self, timeout: Option<Duration>) -> std::io::Result<()> {
		options::set_write_timeout(self, timeout)
	}

	/// Returns the kernel's view of the connected peer.
	pub fn peer_addr(&self) -> std::io::Result<SocketAddr> {
		options::peer_addr(self)
	}

	pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
		options::local_addr(self)
	}
}

impl std::io::Read for PacketConn {
	fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
		self.recv(buf)
	}
}

impl std::io::Write for PacketConn {
	fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
		self.send(buf)
	}

	fn flush(&mut self) -> std::io::Result<()> {
		Ok(())
	}
}

impl AsRawFd for PacketConn {
	fn as_raw_fd(&self) -> RawFd {
		self.fd.as_raw_fd()
	}
}

impl AsFd for PacketConn {
	fn as_fd(&self) -> std::os::fd::BorrowedFd<'_> {
		self.fd.as_fd()
	}
}

impl IntoRawFd for PacketConn {
	fn into_raw_fd(self) -> RawFd {
		self.fd.into_raw_fd()
	}
}

impl From<PacketConn> for OwnedFd {
	fn from(conn: PacketConn) -> Self {
		conn.fd
	}
}

/// Hands the descriptor to std; the socket stays connected to `dest`.
impl From<PacketConn> for std::net::UdpSocket {
	fn from(conn: PacketConn) -> Self {
		std::net::UdpSocket::from(conn.fd)
	}
}
