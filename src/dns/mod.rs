pub mod common;
pub mod enums;
pub mod header;
pub mod question;
pub mod rdata;
pub mod resource;

use bitstream_io::{BigEndian, BitWriter};
use common::{PacketComponent, name_to_labels};
use enums::{DNSResourceClass, DNSResourceType};
use header::{DNSHeader, HEADER_LEN};
use question::DNSQuestion;
use resource::DNSResource;
use thiserror::Error;
use tracing::{debug, trace};

/// Response codes we inspect
pub mod rcode {
    pub const NOERROR: u8 = 0;
    pub const FORMERR: u8 = 1;
    pub const SERVFAIL: u8 = 2;
    pub const NXDOMAIN: u8 = 3;
    pub const NOTIMP: u8 = 4;
    pub const REFUSED: u8 = 5;
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DNSPacket {
    pub header: DNSHeader,
    pub questions: Vec<DNSQuestion>,
    pub answers: Vec<DNSResource>,
    pub authorities: Vec<DNSResource>,
    pub resources: Vec<DNSResource>,
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Invalid DNS header")]
    InvalidHeader,
    #[error("Invalid DNS label")]
    InvalidLabel,
    #[error("Packet truncated at offset {0}")]
    Truncated(usize),
    #[error("Invalid rdata: {0}")]
    InvalidRdata(String),
    #[error("Invalid bit stream: {0}")]
    InvalidBitStream(String),
}

impl From<std::io::Error> for ParseError {
    fn from(e: std::io::Error) -> Self {
        ParseError::InvalidBitStream(e.to_string())
    }
}

impl DNSPacket {
    /// Build a single-question query for `name`
    pub fn query(id: u16, name: &str, qtype: DNSResourceType, recursion_desired: bool) -> Self {
        DNSPacket {
            header: DNSHeader {
                id,
                rd: recursion_desired,
                qdcount: 1,
                ..Default::default()
            },
            questions: vec![DNSQuestion {
                labels: name_to_labels(name),
                qtype,
                qclass: DNSResourceClass::IN,
            }],
            ..Default::default()
        }
    }

    pub fn parse(buf: &[u8]) -> Result<Self, ParseError> {
        trace!("Parsing DNS packet, size: {} bytes", buf.len());
        let mut packet = DNSPacket::default();
        let mut offset = packet.header.read(buf, 0)?;
        debug_assert_eq!(offset, HEADER_LEN);

        for _ in 0..packet.header.qdcount {
            let mut question = DNSQuestion::default();
            offset = question.read(buf, offset)?;
            packet.questions.push(question);
        }

        for _ in 0..packet.header.ancount {
            let mut answer = DNSResource::default();
            offset = answer.read(buf, offset)?;
            packet.answers.push(answer);
        }

        for _ in 0..packet.header.nscount {
            let mut authority = DNSResource::default();
            offset = authority.read(buf, offset)?;
            packet.authorities.push(authority);
        }

        for _ in 0..packet.header.arcount {
            let mut resource = DNSResource::default();
            offset = resource.read(buf, offset)?;
            packet.resources.push(resource);
        }

        debug!(
            "Parsed DNS packet: id={}, rcode={}, answers={}, authorities={}",
            packet.header.id,
            packet.header.rcode,
            packet.answers.len(),
            packet.authorities.len()
        );

        Ok(packet)
    }

    pub fn serialize(&self) -> Result<Vec<u8>, ParseError> {
        let mut buf = Vec::new();
        let mut writer: BitWriter<&mut Vec<u8>, BigEndian> = BitWriter::new(&mut buf);

        // Counts always follow the sections actually present
        let mut header = self.header.clone();
        header.qdcount = self.questions.len() as u16;
        header.ancount = self.answers.len() as u16;
        header.nscount = self.authorities.len() as u16;
        header.arcount = self.resources.len() as u16;
        header.write(&mut writer)?;

        for question in &self.questions {
            question.write(&mut writer)?;
        }
        for answer in &self.answers {
            answer.write(&mut writer)?;
        }
        for authority in &self.authorities {
            authority.write(&mut writer)?;
        }
        for resource in &self.resources {
            resource.write(&mut writer)?;
        }

        Ok(buf)
    }

    /// Turn a query into an empty response carrying the same id and question
    pub fn to_response(&self) -> Self {
        let mut packet = self.clone();
        packet.header.qr = true;
        packet.answers.clear();
        packet.authorities.clear();
        packet.resources.clear();
        packet
    }

    /// Answers of the given type, in wire order
    pub fn answers_of(&self, rtype: DNSResourceType) -> impl Iterator<Item = &DNSResource> {
        self.answers.iter().filter(move |a| a.rtype == rtype)
    }
}
