use bitstream_io::{BitWrite, BitWriter, Endianness};

use super::{
    ParseError,
    common::{Label, PacketComponent, labels_to_fqdn, read_name, read_u16, read_u32},
    enums::{DNSResourceClass, DNSResourceType},
    rdata::DNSResourceData,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DNSResource {
    pub labels: Vec<Label>,
    pub rtype: DNSResourceType,
    pub rclass: DNSResourceClass,
    pub ttl: u32,
    pub rdata: DNSResourceData,
}

impl Default for DNSResource {
    fn default() -> Self {
        Self {
            labels: Vec::new(),
            rtype: DNSResourceType::default(),
            rclass: DNSResourceClass::default(),
            ttl: 0,
            rdata: DNSResourceData::Unknown(Vec::new()),
        }
    }
}

impl DNSResource {
    /// Build an IN-class record; generic `Unknown` data needs `rtype` set by the caller.
    pub fn new(name: &str, ttl: u32, rdata: DNSResourceData) -> Self {
        let rtype = match &rdata {
            DNSResourceData::A(_) => DNSResourceType::A,
            DNSResourceData::AAAA(_) => DNSResourceType::AAAA,
            DNSResourceData::NS(_) => DNSResourceType::NS,
            DNSResourceData::CNAME(_) => DNSResourceType::CNAME,
            DNSResourceData::PTR(_) => DNSResourceType::PTR,
            DNSResourceData::MX { .. } => DNSResourceType::MX,
            DNSResourceData::SOA { .. } => DNSResourceType::SOA,
            DNSResourceData::TXT(_) => DNSResourceType::TXT,
            DNSResourceData::SRV { .. } => DNSResourceType::SRV,
            DNSResourceData::CAA { .. } => DNSResourceType::CAA,
            DNSResourceData::Unknown(_) => DNSResourceType::Unknown(0),
        };
        Self {
            labels: super::common::name_to_labels(name),
            rtype,
            rclass: DNSResourceClass::IN,
            ttl,
            rdata,
        }
    }

    pub fn owner(&self) -> String {
        labels_to_fqdn(&self.labels)
    }

    /// One-line presentation form: `owner TTL CLASS TYPE rdata`
    pub fn to_presentation(&self) -> String {
        format!(
            "{} {} {} {} {}",
            self.owner(),
            self.ttl,
            self.rclass,
            self.rtype,
            self.rdata
        )
    }
}

impl PacketComponent for DNSResource {
    fn write<E: Endianness>(
        &self,
        writer: &mut BitWriter<&mut Vec<u8>, E>,
    ) -> Result<(), ParseError> {
        let rdata = self.rdata.encode()?;
        if rdata.len() > u16::MAX as usize {
            return Err(ParseError::InvalidRdata("rdata too long".to_string()));
        }
        self.write_labels(writer, &self.labels)?;
        writer.write_var::<u16>(16, self.rtype.into())?;
        writer.write_var::<u16>(16, self.rclass.into())?;
        writer.write_var::<u32>(32, self.ttl)?;
        writer.write_var::<u16>(16, rdata.len() as u16)?;
        writer.write_bytes(&rdata)?;
        Ok(())
    }

    fn read(&mut self, buf: &[u8], offset: usize) -> Result<usize, ParseError> {
        let (labels, offset) = read_name(buf, offset)?;
        let rtype: DNSResourceType = read_u16(buf, offset)?.into();
        let rclass = read_u16(buf, offset + 2)?.into();
        let ttl = read_u32(buf, offset + 4)?;
        let rdlength = read_u16(buf, offset + 8)? as usize;
        let rdata_start = offset + 10;

        let rdata = DNSResourceData::decode(rtype, buf, rdata_start, rdlength)?;

        *self = DNSResource {
            labels,
            rtype,
            rclass,
            ttl,
            rdata,
        };
        Ok(rdata_start + rdlength)
    }
}
