use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use clap::Args;
use itertools::Itertools;

use crate::error::MacParseError;

/// Port that Wake-on-LAN listeners conventionally watch ("discard").
pub const DEFAULT_WOL_PORT: u16 = 9;

#[derive(Args, Clone, Debug)]
#[group(id = "target")]
pub struct Params {
    /// Hardware address of the machine to wake, e.g. `A1:AA:1A:1A:11:A1`.
    #[arg(long, env = "WAKE_MAC")]
    pub mac: MacAddress,

    /// Broadcast address of the LAN the machine sits in.
    #[arg(long, env = "WAKE_BROADCAST", default_value = "255.255.255.255")]
    pub broadcast: Ipv4Addr,

    /// Address of the machine once it is up, used for liveness checks.
    #[arg(long, env = "WAKE_HOST")]
    pub host: IpAddr,

    /// UDP port the wake packet is sent to.
    #[arg(long, env = "WOL_PORT", default_value_t = DEFAULT_WOL_PORT)]
    pub wol_port: u16,
}

impl From<&Params> for WakeTarget {
    fn from(params: &Params) -> Self {
        WakeTarget {
            mac: params.mac,
            broadcast: params.broadcast,
            host: params.host,
            port: params.wol_port,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    pub fn octets(&self) -> &[u8; 6] {
        &self.0
    }
}

impl FromStr for MacAddress {
    type Err = MacParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let groups = s.trim().split(':').collect_vec();
        if groups.len() != 6 {
            return Err(MacParseError::GroupCount {
                input: s.to_string(),
                found: groups.len(),
            });
        }
        let mut octets = [0u8; 6];
        for (octet, group) in octets.iter_mut().zip(groups) {
            if group.len() != 2 {
                return Err(MacParseError::GroupLength {
                    group: group.to_string(),
                });
            }
            // from_str_radix would also accept a leading '+'
            if !group.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(MacParseError::InvalidHex {
                    group: group.to_string(),
                });
            }
            *octet = u8::from_str_radix(group, 16).map_err(|_| MacParseError::InvalidHex {
                group: group.to_string(),
            })?;
        }
        Ok(Self(octets))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self.0.iter().map(|b| format!("{:02X}", b)).join(":");
        f.write_str(&rendered)
    }
}

impl fmt::Debug for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacAddress({})", self)
    }
}

/// Everything needed to wake one machine and to tell whether it came up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WakeTarget {
    pub mac: MacAddress,
    pub broadcast: Ipv4Addr,
    pub host: IpAddr,
    pub port: u16,
}

impl WakeTarget {
    pub fn new(mac: MacAddress, broadcast: Ipv4Addr, host: IpAddr) -> Self {
        Self {
            mac,
            broadcast,
            host,
            port: DEFAULT_WOL_PORT,
        }
    }
}
