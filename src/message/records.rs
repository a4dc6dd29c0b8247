//! Typed resource record payloads.
//!
//! [`Answer`] carries its RDATA as opaque bytes; [`Answer::process`] runs the
//! payload through the dispatcher in this module to produce a typed
//! [`Record`]. Type codes without a dedicated entry fall back to
//! [`Record::Opaque`], which carries the payload verbatim.

use std::{fmt, net::Ipv4Addr, str::FromStr};

use crate::hex::Hex;

use super::{decoder::Reader, encoder::Writer, name::DomainName, Answer, Error, Type};

pub struct RdataEncoder {
    pub(crate) w: Writer,
}

pub struct RdataDecoder<'a> {
    pub(crate) r: Reader<'a>,
}

/// Trait implemented by typed record payloads.
pub trait RecordData: Sized {
    /// The associated resource record type code.
    const TYPE: Type;

    /// Writes this record's RDATA to the given encoder.
    fn encode(&self, enc: &mut RdataEncoder);

    /// Attempts to decode an instance of this record from an RDATA field.
    fn decode(dec: &mut RdataDecoder<'_>) -> Result<Self, Error>;
}

macro_rules! records {
    (
        $($record:ident),+ $(,)?
    ) => {
        /// Typed view of an [`Answer`]'s record data.
        ///
        /// Produced by [`Answer::process`]. The variants form the closed set
        /// of type codes this crate interprets; everything else decodes to
        /// [`Record::Opaque`].
        #[non_exhaustive]
        #[derive(Debug, PartialEq, Eq, Clone)]
        pub enum Record {
            $( $record($record), )+
            /// Fallback for type codes without a dedicated decoder.
            Opaque(Opaque),
        }

        impl Record {
            pub(crate) fn from_answer(answer: &Answer) -> Result<Self, Error> {
                let dec = &mut RdataDecoder {
                    r: Reader::new(answer.data()),
                };
                match answer.type_() {
                    $( Type::$record => $record::decode(dec).map(Self::$record), )+
                    _ => Opaque::decode(dec).map(Self::Opaque),
                }
            }

            /// Serializes this record back into RDATA bytes.
            ///
            /// Note that [`Record::Opaque`] does not round-trip; see
            /// [`Opaque::PLACEHOLDER_RDATA`].
            pub fn to_rdata(&self) -> Vec<u8> {
                let mut enc = RdataEncoder { w: Writer::new() };
                match self {
                    $( Record::$record(rr) => rr.encode(&mut enc), )+
                    Record::Opaque(rr) => rr.encode(&mut enc),
                }
                enc.w.into_bytes()
            }
        }

        impl fmt::Display for Record {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $( Record::$record(rr) => rr.fmt(f), )+
                    Record::Opaque(rr) => rr.fmt(f),
                }
            }
        }
    };
}

records!(A, SRV);

/// An IPv4 host address record (type code 1).
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct A {
    addr: Ipv4Addr,
}

impl RecordData for A {
    const TYPE: Type = Type::A;

    fn encode(&self, enc: &mut RdataEncoder) {
        enc.w.write_slice(&self.addr.octets());
    }

    fn decode(dec: &mut RdataDecoder<'_>) -> Result<Self, Error> {
        // The payload must be exactly one IPv4 address, not merely start
        // with one.
        if dec.r.remaining() != 4 {
            return Err(Error::InvalidRecordData);
        }
        Ok(Self {
            addr: Ipv4Addr::from(*dec.r.read_array()?),
        })
    }
}

impl A {
    #[inline]
    pub fn new(addr: Ipv4Addr) -> Self {
        Self { addr }
    }

    #[inline]
    pub fn addr(&self) -> Ipv4Addr {
        self.addr
    }
}

impl FromStr for A {
    type Err = Error;

    /// Parses a dotted-decimal address such as `"192.0.2.1"`. Fails on
    /// anything that is not exactly four octets in the range 0-255.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let addr = s.parse::<Ipv4Addr>().map_err(|_| Error::InvalidAddress)?;
        Ok(Self { addr })
    }
}

impl fmt::Display for A {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.addr.fmt(f)
    }
}

/// A service locator record (type code 33).
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SRV {
    priority: u16,
    weight: u16,
    port: u16,
    target: DomainName,
}

impl RecordData for SRV {
    const TYPE: Type = Type::SRV;

    fn encode(&self, enc: &mut RdataEncoder) {
        enc.w.write_u16(self.priority);
        enc.w.write_u16(self.weight);
        enc.w.write_u16(self.port);
        enc.w.write_domain_name(&self.target);
    }

    fn decode(dec: &mut RdataDecoder<'_>) -> Result<Self, Error> {
        if dec.r.remaining() < 6 {
            return Err(Error::InvalidRecordData);
        }
        Ok(Self {
            priority: dec.r.read_u16()?,
            weight: dec.r.read_u16()?,
            port: dec.r.read_u16()?,
            // The target is never compressed inside RDATA.
            target: dec.r.read_domain_name()?,
        })
    }
}

impl SRV {
    pub fn new(priority: u16, weight: u16, port: u16, target: DomainName) -> Self {
        Self {
            priority,
            weight,
            port,
            target,
        }
    }

    /// Returns the priority value of this service (lower values mean that the
    /// service should be preferred).
    #[inline]
    pub fn priority(&self) -> u16 {
        self.priority
    }

    #[inline]
    pub fn weight(&self) -> u16 {
        self.weight
    }

    #[inline]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[inline]
    pub fn target(&self) -> &DomainName {
        &self.target
    }
}

impl fmt::Display for SRV {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.priority, self.weight, self.port, self.target,
        )
    }
}

/// Fallback payload for record types without a dedicated decoder.
///
/// Interpretation carries the RDATA bytes verbatim and never fails.
/// Re-serialization is deliberately lossy: it emits
/// [`Opaque::PLACEHOLDER_RDATA`] instead of the original payload, since the
/// wire representation of the record type is not modeled. Callers that need
/// the original bytes back must read [`Opaque::raw`] instead of
/// re-serializing.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Opaque {
    raw: Vec<u8>,
}

impl Opaque {
    /// The fixed bytes emitted when re-serializing an unmodeled record type:
    /// a run of zeroes matching the conventional minimum record size.
    pub const PLACEHOLDER_RDATA: [u8; 14] = [0; 14];

    pub fn new(raw: Vec<u8>) -> Self {
        Self { raw }
    }

    /// Returns the record's original RDATA bytes.
    #[inline]
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    fn encode(&self, enc: &mut RdataEncoder) {
        enc.w.write_slice(&Self::PLACEHOLDER_RDATA);
    }

    fn decode(dec: &mut RdataDecoder<'_>) -> Result<Self, Error> {
        Ok(Self {
            raw: dec.r.buf().to_vec(),
        })
    }
}

impl fmt::Display for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Hex(&self.raw).fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::super::Class;
    use super::*;

    fn domain(s: &str) -> DomainName {
        s.parse().unwrap()
    }

    fn answer(type_: Type, data: &[u8]) -> Answer {
        Answer {
            name: domain("example.com"),
            type_,
            class: Class::IN,
            ttl: 0,
            data: data.to_vec(),
        }
    }

    #[test]
    fn a_record_roundtrip() {
        let rdata = [192, 0, 2, 1];
        let record = answer(Type::A, &rdata).process().unwrap();
        match &record {
            Record::A(a) => assert_eq!(a.addr(), Ipv4Addr::new(192, 0, 2, 1)),
            other => panic!("expected A record, got {:?}", other),
        }
        assert_eq!(record.to_string(), "192.0.2.1");
        assert_eq!(record.to_rdata(), &rdata);
    }

    #[test]
    fn a_record_from_str() {
        let a: A = "192.0.2.1".parse().unwrap();
        assert_eq!(Record::A(a).to_rdata(), &[192, 0, 2, 1]);

        assert_eq!("192.0.2".parse::<A>(), Err(Error::InvalidAddress));
        assert_eq!("192.0.2.256".parse::<A>(), Err(Error::InvalidAddress));
        assert_eq!("192.0.2.1.9".parse::<A>(), Err(Error::InvalidAddress));
    }

    #[test]
    fn a_record_wrong_length() {
        assert_eq!(
            answer(Type::A, &[192, 0, 2]).process(),
            Err(Error::InvalidRecordData),
        );
        assert_eq!(
            answer(Type::A, &[192, 0, 2, 1, 0]).process(),
            Err(Error::InvalidRecordData),
        );
    }

    #[test]
    fn srv_record_roundtrip() {
        let srv = SRV::new(10, 20, 8080, domain("host.local"));
        let rdata = Record::SRV(srv.clone()).to_rdata();
        assert_eq!(&rdata[..6], &[0, 10, 0, 20, 0x1f, 0x90]);

        let record = answer(Type::SRV, &rdata).process().unwrap();
        assert_eq!(record, Record::SRV(srv));
    }

    #[test]
    fn srv_record_too_short() {
        assert_eq!(
            answer(Type::SRV, &[0, 10, 0, 20]).process(),
            Err(Error::InvalidRecordData),
        );
    }

    #[test]
    fn unknown_type_falls_back_to_opaque() {
        let payload = [0xde, 0xad, 0xbe, 0xef];
        let record = answer(Type(255), &payload).process().unwrap();
        match &record {
            Record::Opaque(op) => assert_eq!(op.raw(), &payload),
            other => panic!("expected opaque record, got {:?}", other),
        }

        // Re-serialization of unmodeled types is a fixed placeholder, not the
        // original payload.
        assert_eq!(record.to_rdata(), &Opaque::PLACEHOLDER_RDATA);
    }

    #[test]
    fn processing_does_not_mutate_answer() {
        let a = answer(Type::A, &[192, 0, 2, 1]);
        let before = a.clone();
        a.process().unwrap();
        assert_eq!(a, before);
    }
}
