use std::net::SocketAddr;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};
use std::time::Duration;
use crate::socket::{PacketConn, StreamConn};

/// A dialed connection: a byte stream or a connected packet endpoint.
///
/// Both variants read and write through `std::io`, so an engine can treat
/// them like any other connection; match on the variant for datagram-specific
/// calls.
#[derive(Debug)]
pub enum Connection {
	Stream(StreamConn),
	Packet(PacketConn),
}

impl Connection {
	pub fn is_stream(&self) -> bool {
		matches!(self, Connection::Stream(_))
	}

	pub fn as_stream(&self) -> Option<&StreamConn> {
		match self {
			Connection::Stream(conn) => Some(conn),
			Connection::Packet(_) => None,
		}
	}

	pub fn as_packet(&self) -> Option<&PacketConn> {
		match self {
			Connection::Packet(conn) => Some(conn),
			Connection::Stream(_) => None,
		}
	}

	pub fn into_stream(self) -> Option<StreamConn> {
		match self {
			Connection::Stream(conn) => Some(conn),
			Connection::Packet(_) => None,
		}
	}

	pub fn into_packet(self) -> Option<PacketConn> {
		match self {
			Connection::Packet(conn) => Some(conn),
			Connection::Stream(_) => None,
		}
	}

	pub fn peer_addr(&self) -> std::io::Result<SocketAddr> {
		match self {
			Connection::Stream(conn) => conn.peer_addr(),
			Connection::Packet(conn) => conn.peer_addr(),
		}
	}

	pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
		match self {
			Connection::Stream(conn) => conn.local_addr(),
			Connection::Packet(conn) => conn.local_addr(),
		}
	}

	pub fn set_read_timeout(&self, timeout: Option<Duration>) -> std::io::Result<()> {
		match self {
			Connection::Stream(conn) => conn.set_read_timeout(timeout),
			Connection::Packet(conn) => conn.set_read_timeout(timeout),
		}
	}

	pub fn set_write_timeout(&self, timeout: Option<Duration>) -> std::io::Result<()> {
		match self {
			Connection::Stream(conn) => conn.set_write_timeout(timeout),
			Connection::Packet(conn) => conn.set_write_timeout(timeout),
		}
	}
}

impl std::io::Read for Connection {
	fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
		match self {
			Connection::Stream(conn) => conn.read(buf),
			Connection::Packet(conn) => conn.recv(buf),
		}
	}
}

impl std::io::Write for Connection {
	fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
		match self {
			Connection::Stream(conn) => conn.write(buf),
			Connection::Packet(conn) => conn.send(buf),
		}
	}

	fn flush(&mut self) -> std::io::Result<()> {
		Ok(())
	}
}

impl AsRawFd for Connection {
	fn as_raw_fd(&self) -> RawFd {
		match self {
			Connection::Stream(conn) => conn.as_raw_fd(),
			Connection::Packet(conn) => conn.as_raw_fd(),
		}
	}
}

impl AsFd for Connection {
	fn as_fd(&self) -> BorrowedFd<'_> {
		match self {
			Connection::Stream(conn) => conn.as_fd(),
			Connection::Packet(conn) => conn.as_fd(),
		}
	}
}

impl From<Connection> for OwnedFd {
	fn from(conn: Connection) -> Self {
		match conn {
			Connection::Stream(conn) => conn.into(),
			Connection::Packet(conn) => conn.into(),
		}
	}
}
