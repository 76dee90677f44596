//! Protocol tags, matching the reference's `/chat/ /nab/ /exp/ /det/ /exp2/
//! /crc/ /mst/` stream protocol identifiers one for one.

use std::fmt;

/// The protocol a stream or outbound send belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolTag {
    Chat,
    Nab,
    Detector,
    Explorer2,
    Crc,
    Master,
}

impl ProtocolTag {
    pub fn as_str(self) -> &'static str {
        match self {
            ProtocolTag::Chat => "/chat/",
            ProtocolTag::Nab => "/nab/",
            ProtocolTag::Detector => "/det/",
            ProtocolTag::Explorer2 => "/exp2/",
            ProtocolTag::Crc => "/crc/",
            ProtocolTag::Master => "/mst/",
        }
    }

    /// Parses a tag off the wire (the first line of an inbound stream).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "/chat/" => Some(ProtocolTag::Chat),
            "/nab/" => Some(ProtocolTag::Nab),
            "/det/" => Some(ProtocolTag::Detector),
            "/exp2/" => Some(ProtocolTag::Explorer2),
            "/crc/" => Some(ProtocolTag::Crc),
            "/mst/" => Some(ProtocolTag::Master),
            _ => None,
        }
    }
}

impl fmt::Display for ProtocolTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_tag_round_trips_through_its_wire_string() {
        for tag in [
            ProtocolTag::Chat,
            ProtocolTag::Nab,
            ProtocolTag::Detector,
            ProtocolTag::Explorer2,
            ProtocolTag::Crc,
            ProtocolTag::Master,
        ] {
            assert_eq!(ProtocolTag::parse(tag.as_str()), Some(tag));
        }
    }

    #[test]
    fn parse_rejects_unknown_tag() {
        assert_eq!(ProtocolTag::parse("/bogus/"), None);
    }
}
