use std::net::SocketAddr;

/// Socket creation/configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum SocketError {
	#[error("socket() failed: {}", errno_to_str(*.errno))]
	Create { errno: i32 },

	#[error("bind({addr}) failed: {}", errno_to_str(*.errno))]
	Bind { errno: i32, addr: SocketAddr },

	#[error("connect({addr}) failed: {}", errno_to_str(*.errno))]
	Connect { errno: i32, addr: SocketAddr },

	#[error("poll() failed: {}", errno_to_str(*.errno))]
	Poll { errno: i32 },

	#[error("setsockopt({option}) failed: {}", errno_to_str(*.errno))]
	SetOption { errno: i32, option: &'static str },

	#[error("getsockopt({option}) failed: {}", errno_to_str(*.errno))]
	GetOption { errno: i32, option: &'static str },

	#[error("invalid address: {reason}")]
	InvalidAddress { reason: &'static str },
}

/// I/O operation errors.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
	#[error("read() failed: {}", errno_to_str(*.errno))]
	Read { errno: i32 },

	#[error("write() failed: {}", errno_to_str(*.errno))]
	Write { errno: i32 },
}

/// Errors returned by [`ProtectedDialer::dial`](crate::ProtectedDialer::dial).
///
/// Only the error of the last attempted candidate reaches the caller;
/// earlier per-candidate failures are logged and dropped.
#[derive(Debug, thiserror::Error)]
pub enum DialError {
	/// The injected resolver failed. Aborts the dial before any socket exists.
	#[error("resolve {domain}: {source}")]
	Resolve {
		domain: String,
		#[source]
		source: std::io::Error,
	},

	/// Resolution succeeded but produced no usable address.
	#[error("empty response")]
	EmptyResponse,

	/// The caller's context was cancelled or its deadline passed before resolution finished.
	#[error("dial cancelled")]
	Cancelled,

	/// From [`socket_kind`](crate::socket::socket_kind). `dial` treats an
	/// unknown network as a caller bug and panics before reaching it.
	#[error("unknown network")]
	UnknownNetwork,

	/// The protector refused the descriptor.
	#[error("protect failed")]
	ProtectFailed,

	/// The per-attempt deadline elapsed.
	#[error("dial {addr} timed out")]
	TimedOut { addr: SocketAddr },

	/// Socket creation, option application or connect failed.
	#[error(transparent)]
	Socket(#[from] std::io::Error),

	/// The connected descriptor could not be turned into a connection.
	/// Fatal to the whole dial.
	#[error("wrap connection: {0}")]
	Wrap(#[source] std::io::Error),
}

/// Returns current errno value.
#[inline]
pub fn errno() -> i32 {
	std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

/// Converts errno to human-readable string.
fn errno_to_str(errno: i32) -> String {
	match errno {
		libc::EACCES => "permission denied".into(),
		libc::EPERM => "operation not permitted".into(),
		libc::EADDRINUSE => "address already in use".into(),
		libc::EADDRNOTAVAIL => "address not available".into(),
		libc::EAFNOSUPPORT => "address family not supported".into(),
		libc::EAGAIN => "resource temporarily unavailable".into(),
		libc::EBADF => "bad file descriptor".into(),
		libc::ECONNREFUSED => "connection refused".into(),
		libc::ECONNRESET => "connection reset by peer".into(),
		libc::EHOSTUNREACH => "host unreachable".into(),
		libc::EINPROGRESS => "operation in progress".into(),
		libc::EINTR => "interrupted by signal".into(),
		libc::EINVAL => "invalid argument".into(),
		libc::EMFILE => "too many open files".into(),
		libc::ENETUNREACH => "network unreachable".into(),
		libc::ENOBUFS => "no buffer space available".into(),
		libc::ENOPROTOOPT => "protocol not available".into(),
		libc::ENOTCONN => "not connected".into(),
		libc::EPIPE => "broken pipe".into(),
		libc::ETIMEDOUT => "connection timed out".into(),
		_ => format!("errno {}", errno),
	}
}

/// Maps errno to std::io::ErrorKind.
fn errno_to_kind(errno: i32) -> std::io::ErrorKind {
	match errno {
		libc::EACCES | libc::EPERM => std::io::ErrorKind::PermissionDenied,
		libc::EADDRINUSE => std::io::ErrorKind::AddrInUse,
		libc::EADDRNOTAVAIL => std::io::ErrorKind::AddrNotAvailable,
		libc::EAGAIN => std::io::ErrorKind::WouldBlock,
		libc::ECONNREFUSED => std::io::ErrorKind::ConnectionRefused,
		libc::ECONNRESET => std::io::ErrorKind::ConnectionReset,
		libc::EHOSTUNREACH => std::io::ErrorKind::HostUnreachable,
		libc::ENETUNREACH => std::io::ErrorKind::NetworkUnreachable,
		libc::EINTR => std::io::ErrorKind::Interrupted,
		libc::EINVAL => std::io::ErrorKind::InvalidInput,
		libc::ENOTCONN => std::io::ErrorKind::NotConnected,
		libc::EPIPE => std::io::ErrorKind::BrokenPipe,
		libc::ETIMEDOUT => std::io::ErrorKind::TimedOut,
		_ => std::io::ErrorKind::Other,
	}
}

impl From<SocketError> for std::io::Error {
	fn from(err: SocketError) -> Self {
		let errno = match &err {
			SocketError::Create { errno } => *errno,
			SocketError::Bind { errno, .. } => *errno,
			SocketError::Connect { errno, .. } => *errno,
			SocketError::Poll { errno } => *errno,
			SocketError::SetOption { errno, .. } => *errno,
			SocketError::GetOption { errno, .. } => *errno,
			SocketError::InvalidAddress { .. } => libc::EINVAL,
		};
		std::io::Error::new(errno_to_kind(errno), err)
	}
}

impl From<IoError> for std::io::Error {
	fn from(err: IoError) -> Self {
		let kind = match &err {
			IoError::Read { errno } => errno_to_kind(*errno),
			IoError::Write { errno } => errno_to_kind(*errno),
		};
		std::io::Error::new(kind, err)
	}
}

impl From<DialError> for std::io::Error {
	fn from(err: DialError) -> Self {
		let kind = match &err {
			DialError::Resolve { source, .. } => source.kind(),
			DialError::EmptyResponse => std::io::ErrorKind::NotFound,
			DialError::Cancelled => std::io::ErrorKind::Interrupted,
			DialError::UnknownNetwork => std::io::ErrorKind::InvalidInput,
			DialError::ProtectFailed => std::io::ErrorKind::PermissionDenied,
			DialError::TimedOut { .. } => std::io::ErrorKind::TimedOut,
			DialError::Socket(source) => source.kind(),
			DialError::Wrap(source) => source.kind(),
		};
		std::io::Error::new(kind, err)
	}
}
