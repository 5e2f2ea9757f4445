//! DHCPv6 messages (RFC 8415), client/server format only.

use std::fmt;
use std::net::Ipv6Addr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use pnet::util::MacAddr;
use starve_common::network::mac;

use crate::error::PacketError;

pub const CLIENT_PORT: u16 = 546;
pub const SERVER_PORT: u16 = 547;
/// All_DHCP_Relay_Agents_and_Servers.
pub const ALL_SERVERS: Ipv6Addr = Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0x1, 0x2);
pub const ALL_SERVERS_MAC: MacAddr = MacAddr(0x33, 0x33, 0x00, 0x01, 0x00, 0x02);

const DUID_LLT: u16 = 1;
const HW_TYPE_ETHERNET: u16 = 1;
/// 2000-01-01T00:00:00Z, the DUID time base.
const DUID_EPOCH: Duration = Duration::from_secs(946_684_800);
const TRANSACTION_ID_MASK: u32 = 0x00FF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Solicit = 1,
    Advertise = 2,
    Request = 3,
    Confirm = 4,
    Renew = 5,
    Rebind = 6,
    Reply = 7,
    Release = 8,
    Decline = 9,
    Reconfigure = 10,
    InformationRequest = 11,
}

impl MessageType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(MessageType::Solicit),
            2 => Some(MessageType::Advertise),
            3 => Some(MessageType::Request),
            4 => Some(MessageType::Confirm),
            5 => Some(MessageType::Renew),
            6 => Some(MessageType::Rebind),
            7 => Some(MessageType::Reply),
            8 => Some(MessageType::Release),
            9 => Some(MessageType::Decline),
            10 => Some(MessageType::Reconfigure),
            11 => Some(MessageType::InformationRequest),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Solicit => "SOLICIT",
            MessageType::Advertise => "ADVERTISE",
            MessageType::Request => "REQUEST",
            MessageType::Confirm => "CONFIRM",
            MessageType::Renew => "RENEW",
            MessageType::Rebind => "REBIND",
            MessageType::Reply => "REPLY",
            MessageType::Release => "RELEASE",
            MessageType::Decline => "DECLINE",
            MessageType::Reconfigure => "RECONFIGURE",
            MessageType::InformationRequest => "INFORMATION-REQUEST",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dhcpv6Option {
    ClientId(Vec<u8>),
    ServerId(Vec<u8>),
    IaNa {
        iaid: u32,
        t1: u32,
        t2: u32,
        options: Vec<Dhcpv6Option>,
    },
    IaAddress {
        addr: Ipv6Addr,
        preferred: u32,
        valid: u32,
        options: Vec<Dhcpv6Option>,
    },
    OptionRequest(Vec<u16>),
    ElapsedTime(u16),
    RapidCommit,
    Unknown(u16, Vec<u8>),
}

impl Dhcpv6Option {
    pub fn code(&self) -> u16 {
        match self {
            Dhcpv6Option::ClientId(_) => 1,
            Dhcpv6Option::ServerId(_) => 2,
            Dhcpv6Option::IaNa { .. } => 3,
            Dhcpv6Option::IaAddress { .. } => 5,
            Dhcpv6Option::OptionRequest(_) => 6,
            Dhcpv6Option::ElapsedTime(_) => 8,
            Dhcpv6Option::RapidCommit => 14,
            Dhcpv6Option::Unknown(code, _) => *code,
        }
    }

    /// First address carried by an IA_NA, if any.
    pub fn assigned_address(&self) -> Option<Ipv6Addr> {
        match self {
            Dhcpv6Option::IaNa { options, .. } => options.iter().find_map(|opt| match opt {
                Dhcpv6Option::IaAddress { addr, .. } => Some(*addr),
                _ => None,
            }),
            _ => None,
        }
    }

    fn parse(code: u16, data: &[u8]) -> Result<Self, PacketError> {
        let bad_len = || PacketError::OptionLength {
            code,
            len: data.len(),
        };
        let be32 = |at: usize| u32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]]);
        let option = match code {
            1 => Dhcpv6Option::ClientId(data.to_vec()),
            2 => Dhcpv6Option::ServerId(data.to_vec()),
            3 => {
                if data.len() < 12 {
                    return Err(bad_len());
                }
                Dhcpv6Option::IaNa {
                    iaid: be32(0),
                    t1: be32(4),
                    t2: be32(8),
                    options: parse_options(&data[12..])?,
                }
            }
            5 => {
                if data.len() < 24 {
                    return Err(bad_len());
                }
                let octets: [u8; 16] = data[..16].try_into().map_err(|_| bad_len())?;
                Dhcpv6Option::IaAddress {
                    addr: Ipv6Addr::from(octets),
                    preferred: be32(16),
                    valid: be32(20),
                    options: parse_options(&data[24..])?,
                }
            }
            6 => {
                if data.len() % 2 != 0 {
                    return Err(bad_len());
                }
                Dhcpv6Option::OptionRequest(
                    data.chunks_exact(2)
                        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                        .collect(),
                )
            }
            8 => Dhcpv6Option::ElapsedTime(u16::from_be_bytes(
                data.try_into().map_err(|_| bad_len())?,
            )),
            14 => {
                if !data.is_empty() {
                    return Err(bad_len());
                }
                Dhcpv6Option::RapidCommit
            }
            _ => Dhcpv6Option::Unknown(code, data.to_vec()),
        };
        Ok(option)
    }

    fn write(&self, out: &mut Vec<u8>) {
        let mut body = Vec::new();
        match self {
            Dhcpv6Option::ClientId(duid) | Dhcpv6Option::ServerId(duid) => {
                body.extend_from_slice(duid)
            }
            Dhcpv6Option::IaNa {
                iaid,
                t1,
                t2,
                options,
            } => {
                body.extend_from_slice(&iaid.to_be_bytes());
                body.extend_from_slice(&t1.to_be_bytes());
                body.extend_from_slice(&t2.to_be_bytes());
                options.iter().for_each(|opt| opt.write(&mut body));
            }
            Dhcpv6Option::IaAddress {
                addr,
                preferred,
                valid,
                options,
            } => {
                body.extend_from_slice(&addr.octets());
                body.extend_from_slice(&preferred.to_be_bytes());
                body.extend_from_slice(&valid.to_be_bytes());
                options.iter().for_each(|opt| opt.write(&mut body));
            }
            Dhcpv6Option::OptionRequest(codes) => {
                codes.iter().for_each(|c| body.extend_from_slice(&c.to_be_bytes()))
            }
            Dhcpv6Option::ElapsedTime(hundredths) => body.extend_from_slice(&hundredths.to_be_bytes()),
            Dhcpv6Option::RapidCommit => {}
            Dhcpv6Option::Unknown(_, data) => body.extend_from_slice(data),
        }
        let len = u16::try_from(body.len()).unwrap_or(u16::MAX);
        out.extend_from_slice(&self.code().to_be_bytes());
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(&body[..usize::from(len)]);
    }
}

fn parse_options(mut data: &[u8]) -> Result<Vec<Dhcpv6Option>, PacketError> {
    let mut options = Vec::new();
    while !data.is_empty() {
        if data.len() < 4 {
            return Err(PacketError::Truncated {
                what: "DHCPv6 option",
                len: data.len(),
                need: 4,
            });
        }
        let code = u16::from_be_bytes([data[0], data[1]]);
        let len = usize::from(u16::from_be_bytes([data[2], data[3]]));
        let Some(body) = data.get(4..4 + len) else {
            return Err(PacketError::OptionLength { code, len });
        };
        options.push(Dhcpv6Option::parse(code, body)?);
        data = &data[4 + len..];
    }
    Ok(options)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dhcpv6Message {
    pub msg_type: MessageType,
    /// 24-bit transaction id.
    pub transaction_id: u32,
    pub options: Vec<Dhcpv6Option>,
}

impl Dhcpv6Message {
    pub fn new(msg_type: MessageType, transaction_id: u32, options: Vec<Dhcpv6Option>) -> Self {
        Self {
            msg_type,
            transaction_id: transaction_id & TRANSACTION_ID_MASK,
            options,
        }
    }

    pub fn client_id(&self) -> Option<&[u8]> {
        self.options.iter().find_map(|opt| match opt {
            Dhcpv6Option::ClientId(duid) => Some(duid.as_slice()),
            _ => None,
        })
    }

    pub fn server_id(&self) -> Option<&[u8]> {
        self.options.iter().find_map(|opt| match opt {
            Dhcpv6Option::ServerId(duid) => Some(duid.as_slice()),
            _ => None,
        })
    }

    pub fn ia_na(&self) -> Option<&Dhcpv6Option> {
        self.options
            .iter()
            .find(|opt| matches!(opt, Dhcpv6Option::IaNa { .. }))
    }

    pub fn has_rapid_commit(&self) -> bool {
        self.options.contains(&Dhcpv6Option::RapidCommit)
    }

    pub fn parse(data: &[u8]) -> Result<Self, PacketError> {
        if data.len() < 4 {
            return Err(PacketError::Truncated {
                what: "DHCPv6 message",
                len: data.len(),
                need: 4,
            });
        }
        let msg_type = MessageType::from_u8(data[0]).ok_or(PacketError::MessageType {
            what: "DHCPv6",
            value: data[0],
        })?;
        Ok(Self {
            msg_type,
            transaction_id: u32::from_be_bytes([0, data[1], data[2], data[3]]),
            options: parse_options(&data[4..])?,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let xid = (self.transaction_id & TRANSACTION_ID_MASK).to_be_bytes();
        let mut bytes = vec![self.msg_type as u8, xid[1], xid[2], xid[3]];
        for option in &self.options {
            option.write(&mut bytes);
        }
        bytes
    }
}

/// DUID-LLT for `link` stamped with `time`.
pub fn duid_llt(link: MacAddr, time: SystemTime) -> Vec<u8> {
    let secs = time
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .saturating_sub(DUID_EPOCH)
        .as_secs() as u32;
    let mut duid = Vec::with_capacity(14);
    duid.extend_from_slice(&DUID_LLT.to_be_bytes());
    duid.extend_from_slice(&HW_TYPE_ETHERNET.to_be_bytes());
    duid.extend_from_slice(&secs.to_be_bytes());
    duid.extend_from_slice(&mac::octets(link));
    duid
}

/// Link-layer address embedded in a DUID-LLT or DUID-LL.
pub fn duid_link_addr(duid: &[u8]) -> Option<MacAddr> {
    let kind = u16::from_be_bytes([*duid.first()?, *duid.get(1)?]);
    match kind {
        1 => mac::from_octets(duid.get(8..14)?),
        3 => mac::from_octets(duid.get(4..10)?),
        _ => None,
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
