//! Protected outbound dialing for tunnel clients.
//!
//! [`ProtectedDialer`] opens raw sockets, hands each descriptor to a
//! [`Protector`] so it escapes the tunnel, applies [`SocketOptions`], and
//! connects, falling back across resolved addresses in order.

pub mod socket;
mod addr;
mod config;
mod connection;
mod destination;
mod dialer;
mod error;
mod protect;
mod resolve;

pub use self::error::{DialError, IoError, SocketError, errno};
pub use self::addr::{Family, ToSockAddr};
pub use self::config::{DialerConfig, Ipv6Mode};
pub use self::connection::Connection;
pub use self::destination::{Address, Destination, Network};
pub use self::dialer::ProtectedDialer;
pub use self::protect::{NoopProtector, Protector};
pub use self::resolve::{DialContext, Resolver, SystemResolver};
pub use self::socket::{SockType, RawSocket, PendingConnect, StreamConn, PacketConn, Shutdown,
					   SocketOptions, BufferConfig, KeepaliveConfig};
