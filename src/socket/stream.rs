use std::io::{IoSlice, IoSliceMut};
use std::net::SocketAddr;
use std::os::fd::{AsFd, AsRawFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};
use std::time::Duration;
use crate::error::{SocketError, IoError, errno};
use super::options;

/// A connected stream socket.
///
/// Represents an established connection, ready for read/write.
/// Created by the dialer once a protected connect succeeds; the descriptor
/// is closed when this value is dropped.
#[derive(Debug)]
pub struct StreamConn {
	fd: OwnedFd,
}

impl StreamConn {
	/// Takes ownership of a connected descriptor.
	pub fn from_fd(fd: OwnedFd) -> Self {
		Self { fd }
	}

	/// Returns the raw file descriptor.
	#[inline]
	pub fn as_raw_fd(&self) -> libc::c_int {
		self.fd.as_raw_fd()
	}

	pub fn read(&self, buf: &mut [u8]) -> std::io::Result<usize> {
		let n = unsafe {
			libc::read(
				self.as_raw_fd(),
				buf.as_mut_ptr() as *mut libc::c_void,
				buf.len(),
			)
		};

		if n == -1 {
			Err(IoError::Read { errno: errno() }.into())
		} else {
			Ok(n as usize)
		}
	}

	pub fn write(&self, buf: &[u8]) -> std::io::Result<usize> {
		let n = unsafe {
			libc::send(
				self.as_raw_fd(),
				buf.as_ptr() as *const libc::c_void,
				buf.len(),
				libc::MSG_NOSIGNAL,
			)
		};

		if n == -1 {
			Err(IoError::Write { errno: errno() }.into())
		} else {
			Ok(n as usize)
		}
	}

	pub fn readv(&self, bufs: &mut [IoSliceMut<'_>]) -> std::io::Result<usize> {
		let n = unsafe {
			libc::readv(
				self.as_raw_fd(),
				bufs.as_ptr() as *const libc::iovec,
				bufs.len() as libc::c_int,
			)
		};

		if n == -1 {
			Err(IoError::Read { errno: errno() }.into())
		} else {
			Ok(n as usize)
		}
	}

	pub fn writev(&self, bufs: &[IoSlice<'_>]) -> std::io::Result<usize> {
		let n = unsafe {
			libc::writev(
				self.as_raw_fd(),
				bufs.as_ptr() as *const libc::iovec,
				bufs.len() as libc::c_int,
			)
		};

		if n == -1 {
			Err(IoError::Write { errno: errno() }.into())
		} else {
			Ok(n as usize)
		}
	}

	pub fn shutdown(&self, how: Shutdown) -> std::io::Result<()> {
		let how = match how {
			Shutdown::Read => libc::SHUT_RD,
			Shutdown::Write => libc::SHUT_WR,
			Shutdown::ReadWrite => libc::SHUT_RDWR,
		};

		let result = unsafe { libc::shutdown(self.as_raw_fd(), how) };

		if result == -1 {
			Err(SocketError::SetOption { errno: errno(), option: "shutdown" }.into())
		} else {
			Ok(())
		}
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

	/// Returns the remote address of this connection.
	pub fn peer_addr(&self) -> std::io::Result<SocketAddr> {
		options::peer_addr(self)
	}

	/// Returns the local address of this connection.
	pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
		options::local_addr(self)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
	Read,   // SHUT_RD
	Write,  // SHUT_WR
	ReadWrite,   // SHUT_RDWR
}

impl std::io::Read for StreamConn {
	fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
		StreamConn::read(self, buf)
	}

	fn read_vectored(&mut self, bufs: &mut [IoSliceMut<'_>]) -> std::io::Result<usize> {
		StreamConn::readv(self, bufs)
	}
}

impl std::io::Write for StreamConn {
	fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
		StreamConn::write(self, buf)
	}

	fn write_vectored(&mut self, bufs: &[IoSlice<'_>]) -> std::io::Result<usize> {
		StreamConn::writev(self, bufs)
	}

	fn flush(&mut self) -> std::io::Result<()> {
		Ok(())  // nothing buffered at this level
	}
}

impl std::io::Read for &StreamConn {
	fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
		StreamConn::read(self, buf)
	}
}

impl std::io::Write for &StreamConn {
	fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
		StreamConn::write(self, buf)
	}

	fn flush(&mut self) -> std::io::Result<()> {
		Ok(())
	}
}

impl AsRawFd for StreamConn {
	fn as_raw_fd(&self) -> RawFd {
		self.fd.as_raw_fd()
	}
}

impl AsFd for StreamConn {
	fn as_fd(&self) -> std::os::fd::BorrowedFd<'_> {
		self.fd.as_fd()
	}
}

impl FromRawFd for StreamConn {
	unsafe fn from_raw_fd(fd: RawFd) -> Self {
		unsafe { Self::from_fd(OwnedFd::from_raw_fd(fd)) }
	}
}

impl IntoRawFd for StreamConn {
	fn into_raw_fd(self) -> RawFd {
		self.fd.into_raw_fd()
	}
}

impl From<StreamConn> for OwnedFd {
	fn from(conn: StreamConn) -> Self {
		conn.fd
	}
}

/// Hands the descriptor to std so callers can use the regular TCP API.
impl From<StreamConn> for std::net::TcpStream {
	fn from(conn: StreamConn) -> Self {
		std::net::TcpStream::from(conn.fd)
	}
}
