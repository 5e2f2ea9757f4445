pub mod arp;
pub mod dhcp;
pub mod dhcpv6;
pub mod error;
pub mod ethernet;
pub mod frame;
pub mod fuzz;
pub mod icmp;
pub mod ip;
pub mod udp;
pub mod wire;

pub use error::PacketError;
pub use frame::{CaptureFilter, Captured, CapturedPacket, EthernetHeader, Frame, FramePayload};

pub const ETH_HDR_LEN: usize = 14;
pub const ARP_LEN: usize = 28;
pub const IP_V4_HDR_LEN: usize = 20;
pub const IP_V6_HDR_LEN: usize = 40;
pub const UDP_HDR_LEN: usize = 8;
