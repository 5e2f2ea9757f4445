//! DHCPv4 messages (RFC 2131 / RFC 2132).
//!
//! Only the options the attack crafts or reads are modelled; anything else is
//! carried through as [`DhcpOption::Unknown`].

use std::fmt;
use std::net::Ipv4Addr;

use pnet::util::MacAddr;
use starve_common::network::mac;

use crate::error::PacketError;

pub const SERVER_PORT: u16 = 67;
pub const CLIENT_PORT: u16 = 68;
pub const MAGIC_COOKIE: u32 = 0x6382_5363;
pub const BROADCAST_FLAG: u16 = 0x8000;
pub const BOOTREQUEST: u8 = 1;
pub const BOOTREPLY: u8 = 2;
const HTYPE_ETHERNET: u8 = 1;
const HLEN_ETHERNET: u8 = 6;
/// Fixed BOOTP header, up to and excluding the magic cookie.
const HEADER_LEN: usize = 236;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Discover = 1,
    Offer = 2,
    Request = 3,
    Decline = 4,
    Ack = 5,
    Nak = 6,
    Release = 7,
    Inform = 8,
}

impl MessageType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(MessageType::Discover),
            2 => Some(MessageType::Offer),
            3 => Some(MessageType::Request),
            4 => Some(MessageType::Decline),
            5 => Some(MessageType::Ack),
            6 => Some(MessageType::Nak),
            7 => Some(MessageType::Release),
            8 => Some(MessageType::Inform),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Discover => "DISCOVER",
            MessageType::Offer => "OFFER",
            MessageType::Request => "REQUEST",
            MessageType::Decline => "DECLINE",
            MessageType::Ack => "ACK",
            MessageType::Nak => "NAK",
            MessageType::Release => "RELEASE",
            MessageType::Inform => "INFORM",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DhcpOption {
    SubnetMask(Ipv4Addr),
    Hostname(String),
    RequestedAddress(Ipv4Addr),
    LeaseTime(u32),
    MessageType(MessageType),
    ServerId(Ipv4Addr),
    ParameterRequestList(Vec<u8>),
    MaxMessageSize(u16),
    /// Client identifier, first byte is the hardware type.
    ClientId(Vec<u8>),
    End,
    Unknown(u8, Vec<u8>),
}

impl DhcpOption {
    pub fn code(&self) -> u8 {
        match self {
            DhcpOption::SubnetMask(_) => 1,
            DhcpOption::Hostname(_) => 12,
            DhcpOption::RequestedAddress(_) => 50,
            DhcpOption::LeaseTime(_) => 51,
            DhcpOption::MessageType(_) => 53,
            DhcpOption::ServerId(_) => 54,
            DhcpOption::ParameterRequestList(_) => 55,
            DhcpOption::MaxMessageSize(_) => 57,
            DhcpOption::ClientId(_) => 61,
            DhcpOption::End => 255,
            DhcpOption::Unknown(code, _) => *code,
        }
    }

    /// Client identifier built from a hardware address (type 1, Ethernet).
    pub fn client_id_for(client: MacAddr) -> Self {
        let mut id = vec![HTYPE_ETHERNET];
        id.extend_from_slice(&mac::octets(client));
        DhcpOption::ClientId(id)
    }

    fn parse(code: u8, data: &[u8]) -> Result<Self, PacketError> {
        let bad_len = || PacketError::OptionLength {
            code: u16::from(code),
            len: data.len(),
        };
        let option = match code {
            1 => DhcpOption::SubnetMask(ipv4(data).ok_or_else(bad_len)?),
            12 => DhcpOption::Hostname(String::from_utf8_lossy(data).into_owned()),
            50 => DhcpOption::RequestedAddress(ipv4(data).ok_or_else(bad_len)?),
            51 => DhcpOption::LeaseTime(u32::from_be_bytes(
                data.try_into().map_err(|_| bad_len())?,
            )),
            53 => {
                let [value] = data else {
                    return Err(bad_len());
                };
                let msg_type = MessageType::from_u8(*value).ok_or(PacketError::MessageType {
                    what: "DHCP",
                    value: *value,
                })?;
                DhcpOption::MessageType(msg_type)
            }
            54 => DhcpOption::ServerId(ipv4(data).ok_or_else(bad_len)?),
            55 => DhcpOption::ParameterRequestList(data.to_vec()),
            57 => DhcpOption::MaxMessageSize(u16::from_be_bytes(
                data.try_into().map_err(|_| bad_len())?,
            )),
            61 => DhcpOption::ClientId(data.to_vec()),
            _ => DhcpOption::Unknown(code, data.to_vec()),
        };
        Ok(option)
    }

    fn write(&self, out: &mut Vec<u8>) {
        let body: Vec<u8> = match self {
            DhcpOption::End => {
                out.push(255);
                return;
            }
            DhcpOption::SubnetMask(addr)
            | DhcpOption::RequestedAddress(addr)
            | DhcpOption::ServerId(addr) => addr.octets().to_vec(),
            DhcpOption::Hostname(name) => name.as_bytes().to_vec(),
            DhcpOption::LeaseTime(secs) => secs.to_be_bytes().to_vec(),
            DhcpOption::MessageType(msg_type) => vec![*msg_type as u8],
            DhcpOption::ParameterRequestList(params) => params.clone(),
            DhcpOption::MaxMessageSize(size) => size.to_be_bytes().to_vec(),
            DhcpOption::ClientId(id) => id.clone(),
            DhcpOption::Unknown(_, data) => data.clone(),
        };
        out.push(self.code());
        out.push(body.len().min(usize::from(u8::MAX)) as u8);
        out.extend(body.into_iter().take(usize::from(u8::MAX)));
    }
}

fn ipv4(data: &[u8]) -> Option<Ipv4Addr> {
    let octets: [u8; 4] = data.try_into().ok()?;
    Some(Ipv4Addr::from(octets))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DhcpMessage {
    pub op: u8,
    pub xid: u32,
    pub secs: u16,
    pub flags: u16,
    pub ciaddr: Ipv4Addr,
    pub yiaddr: Ipv4Addr,
    pub siaddr: Ipv4Addr,
    pub giaddr: Ipv4Addr,
    pub chaddr: MacAddr,
    pub options: Vec<DhcpOption>,
}

impl DhcpMessage {
    /// Client to server message with an empty header.
    pub fn request_header(xid: u32, chaddr: MacAddr) -> Self {
        Self {
            op: BOOTREQUEST,
            xid,
            secs: 0,
            flags: 0,
            ciaddr: Ipv4Addr::UNSPECIFIED,
            yiaddr: Ipv4Addr::UNSPECIFIED,
            siaddr: Ipv4Addr::UNSPECIFIED,
            giaddr: Ipv4Addr::UNSPECIFIED,
            chaddr,
            options: Vec::new(),
        }
    }

    pub fn with_flags(mut self, flags: u16) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_ciaddr(mut self, ciaddr: Ipv4Addr) -> Self {
        self.ciaddr = ciaddr;
        self
    }

    pub fn with_options(mut self, options: Vec<DhcpOption>) -> Self {
        self.options = options;
        self
    }

    pub fn message_type(&self) -> Option<MessageType> {
        self.options.iter().find_map(|opt| match opt {
            DhcpOption::MessageType(msg_type) => Some(*msg_type),
            _ => None,
        })
    }

    pub fn server_id(&self) -> Option<Ipv4Addr> {
        self.options.iter().find_map(|opt| match opt {
            DhcpOption::ServerId(addr) => Some(*addr),
            _ => None,
        })
    }

    pub fn subnet_mask(&self) -> Option<Ipv4Addr> {
        self.options.iter().find_map(|opt| match opt {
            DhcpOption::SubnetMask(mask) => Some(*mask),
            _ => None,
        })
    }

    pub fn requested_address(&self) -> Option<Ipv4Addr> {
        self.options.iter().find_map(|opt| match opt {
            DhcpOption::RequestedAddress(addr) => Some(*addr),
            _ => None,
        })
    }

    pub fn parse(data: &[u8]) -> Result<Self, PacketError> {
        if data.len() < HEADER_LEN + 4 {
            return Err(PacketError::Truncated {
                what: "DHCP message",
                len: data.len(),
                need: HEADER_LEN + 4,
            });
        }
        let cookie = u32::from_be_bytes([data[236], data[237], data[238], data[239]]);
        if cookie != MAGIC_COOKIE {
            return Err(PacketError::MagicCookie(cookie));
        }
        let addr_at = |at: usize| Ipv4Addr::new(data[at], data[at + 1], data[at + 2], data[at + 3]);

        let mut options = Vec::new();
        let mut offset = HEADER_LEN + 4;
        while offset < data.len() {
            let code = data[offset];
            offset += 1;
            match code {
                0 => continue,
                255 => break,
                _ => {}
            }
            let Some(&len) = data.get(offset) else {
                break;
            };
            offset += 1;
            let end = offset + usize::from(len);
            let Some(body) = data.get(offset..end) else {
                return Err(PacketError::OptionLength {
                    code: u16::from(code),
                    len: usize::from(len),
                });
            };
            offset = end;
            match DhcpOption::parse(code, body) {
                Ok(option) => options.push(option),
                Err(e) => tracing::trace!("skipping DHCP option {code}: {e}"),
            }
        }

        Ok(Self {
            op: data[0],
            xid: u32::from_be_bytes([data[4], data[5], data[6], data[7]]),
            secs: u16::from_be_bytes([data[8], data[9]]),
            flags: u16::from_be_bytes([data[10], data[11]]),
            ciaddr: addr_at(12),
            yiaddr: addr_at(16),
            siaddr: addr_at(20),
            giaddr: addr_at(24),
            chaddr: MacAddr::new(data[28], data[29], data[30], data[31], data[32], data[33]),
            options,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(300);
        bytes.extend_from_slice(&[self.op, HTYPE_ETHERNET, HLEN_ETHERNET, 0]);
        bytes.extend_from_slice(&self.xid.to_be_bytes());
        bytes.extend_from_slice(&self.secs.to_be_bytes());
        bytes.extend_from_slice(&self.flags.to_be_bytes());
        for addr in [self.ciaddr, self.yiaddr, self.siaddr, self.giaddr] {
            bytes.extend_from_slice(&addr.octets());
        }
        let mut chaddr = [0u8; 16];
        chaddr[..6].copy_from_slice(&mac::octets(self.chaddr));
        bytes.extend_from_slice(&chaddr);
        // sname + file
        bytes.resize(HEADER_LEN, 0);
        bytes.extend_from_slice(&MAGIC_COOKIE.to_be_bytes());

        for option in &self.options {
            option.write(&mut bytes);
        }
        if !self.options.contains(&DhcpOption::End) {
            bytes.push(255);
        }
        bytes
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
