//! Dial targets.

use std::fmt;
use std::net::IpAddr;

/// Network kind of a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Network {
	#[default]
	Unknown,
	Tcp,
	Udp,
	Unix,
}

impl fmt::Display for Network {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Network::Unknown => "unknown",
			Network::Tcp => "tcp",
			Network::Udp => "udp",
			Network::Unix => "unix",
		})
	}
}

/// Either a literal IP or a domain name still to be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
	Ip(IpAddr),
	Domain(String),
}

impl Address {
	/// Parses literal IPs; everything else is treated as a domain.
	pub fn parse(s: &str) -> Self {
		let trimmed = s.strip_prefix('[').and_then(|s| s.strip_suffix(']')).unwrap_or(s);
		match trimmed.parse::<IpAddr>() {
			Ok(ip) => Address::Ip(ip),
			Err(_) => Address::Domain(s.to_string()),
		}
	}

	pub fn is_domain(&self) -> bool {
		matches!(self, Address::Domain(_))
	}
}

impl From<IpAddr> for Address {
	fn from(ip: IpAddr) -> Self {
		Address::Ip(ip)
	}
}

impl fmt::Display for Address {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Address::Ip(ip) => write!(f, "{ip}"),
			Address::Domain(domain) => f.write_str(domain),
		}
	}
}

/// Where a dial goes.
///
/// A destination with [`Network::Unknown`] or without an address is a caller
/// bug; the dialer panics on it rather than returning an error.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Destination {
	pub network: Network,
	pub address: Option<Address>,
	pub port: u16,
}

impl Destination {
	pub fn new(network: Network, address: impl Into<Address>, port: u16) -> Self {
		Self { network, address: Some(address.into()), port }
	}

	pub fn tcp(address: impl Into<Address>, port: u16) -> Self {
		Self::new(Network::Tcp, address, port)
	}

	pub fn udp(address: impl Into<Address>, port: u16) -> Self {
		Self::new(Network::Udp, address, port)
	}

	pub fn is_valid(&self) -> bool {
		self.network != Network::Unknown && self.address.is_some()
	}

	/// Same destination, pointed at a resolved candidate.
	pub fn with_ip(&self, ip: IpAddr) -> Self {
		Self { network: self.network, address: Some(Address::Ip(ip)), port: self.port }
	}

	/// `host:port`, with IPv6 literals bracketed.
	pub fn net_addr(&self) -> String {
		match &self.address {
			Some(Address::Ip(IpAddr::V6(ip))) => format!("[{ip}]:{}", self.port),
			Some(address) => format!("{address}:{}", self.port),
			None => format!(":{}", self.port),
		}
	}
}

impl From<&str> for Address {
	fn from(s: &str) -> Self {
		Address::parse(s)
	}
}

impl From<String> for Address {
	fn from(s: String) -> Self {
		Address::parse(&s)
	}
}

impl fmt::Display for Destination {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.network, self.net_addr())
	}
}
