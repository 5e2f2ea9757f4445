use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    #[error("{what} truncated: {len} bytes, need {need}")]
    Truncated {
        what: &'static str,
        len: usize,
        need: usize,
    },
    #[error("bad DHCP magic cookie 0x{0:08x}")]
    MagicCookie(u32),
    #[error("unknown {what} message type {value}")]
    MessageType { what: &'static str, value: u8 },
    #[error("option {code} has invalid length {len}")]
    OptionLength { code: u16, len: usize },
}
