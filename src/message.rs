//! DNS message encoder and decoder.

#[macro_use]
mod macros;
mod decoder;
mod encoder;
mod error;
pub mod name;
pub mod records;

use core::fmt;

use bitflags::bitflags;

use crate::{hex::Hex, num::U16};

use decoder::Reader;
use encoder::Writer;
use name::DomainName;
use records::Record;

pub use error::Error;

/// Tag bits in the first byte of a name field marking a 2-byte compression
/// pointer.
pub(crate) const POINTER_TAG: u16 = 0xC000;

/// Mask extracting the 14-bit absolute message offset from a compression
/// pointer.
pub(crate) const POINTER_OFFSET_MASK: u16 = 0x3FFF;

ffi_enum! {
    /// DNS message operation codes.
    pub enum Opcode: u8 {
        /// Query (or response to a query).
        QUERY = 0,
        /// Inverse Query (or response to an inverse query).
        IQUERY = 1,
        /// Server status request.
        STATUS = 2,
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

ffi_enum! {
    /// Server response codes.
    pub enum RCode: u8 {
        /// No error.
        NO_ERROR = 0,
        /// The query sent by the client was erroneous.
        FORM_ERR = 1,
        /// A server-side error prevented processing of the query.
        SERV_FAIL = 2,
        /// Signifies that the queried domain name does not exist.
        NX_DOMAIN = 3,
        /// The requested query type is not supported by the server.
        NOT_IMP = 4,
        /// The server refused to answer the query for policy reasons.
        REFUSED = 5,
    }
}

impl fmt::Display for RCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

ffi_enum! {
    /// Resource Record types.
    ///
    /// This is an open enum: any 16-bit type code is representable, named or
    /// not. The codes with dedicated payload decoders are [`Type::A`] and
    /// [`Type::SRV`]; see [`records`].
    pub enum Type: u16 {
        A = 1,
        NS = 2,
        CNAME = 5,
        SOA = 6,
        PTR = 12,
        MX = 15,
        TXT = 16,
        AAAA = 28,
        SRV = 33,
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

ffi_enum! {
    /// Resource Record classes.
    pub enum Class: u16 {
        /// The Internet.
        IN = 1,
        /// CSNET.
        CS = 2,
        /// Chaosnet.
        CH = 3,
        /// Hesiod.
        HS = 4,
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// Bit positions in the header flags are inverted, because RFC 1035 starts counting at the MSb.
const fn be_pos(pos: u16) -> u16 {
    15 - pos
}

bitflags! {
    #[derive(Debug)]
    #[repr(transparent)]
    struct HeaderFlags: u16 {
        /// If set, the message is a response to a query. If unset, it is a query.
        const QR = 1 << be_pos(0);
        const OPCODE = Self::OPCODE_MASK;
        /// Set if this response was sent from a name server that is the authority for the queried
        /// domain name.
        const AA = 1 << be_pos(5);
        /// Set if the message was truncated because it is longer than the maximum allowed length of
        /// the transmission channel.
        const TC = 1 << be_pos(6);
        /// Recursion Desired: This bit can be set in a query to instruct recursive resolvers to
        /// perform a recursive query. The bit is copied to the response.
        const RD = 1 << be_pos(7);
        /// Recursion Available: This bit can be set in a response to indicate that the responding
        /// server supports recursion.
        const RA = 1 << be_pos(8);
        /// Reserved bits; round-trip unchanged.
        const Z = Self::Z_MASK;
        const RCODE = Self::RCODE_MASK;
    }
}

impl HeaderFlags {
    const OPCODE_POS: u16 = 11;
    const OPCODE_MASK: u16 = 0b1111 << Self::OPCODE_POS;

    const Z_POS: u16 = 4;
    const Z_MASK: u16 = 0b111 << Self::Z_POS;

    const RCODE_POS: u16 = 0;
    const RCODE_MASK: u16 = 0b1111 << Self::RCODE_POS;

    fn opcode(&self) -> Opcode {
        Opcode(((self.bits() & Self::OPCODE_MASK) >> Self::OPCODE_POS) as u8)
    }

    fn z(&self) -> u8 {
        ((self.bits() & Self::Z_MASK) >> Self::Z_POS) as u8
    }

    fn rcode(&self) -> RCode {
        RCode(((self.bits() & Self::RCODE_MASK) >> Self::RCODE_POS) as u8)
    }

    fn set_field(&mut self, mask: u16, pos: u16, value: u16) {
        let bits = (self.bits() & !mask) | ((value << pos) & mask);
        *self = Self::from_bits_retain(bits);
    }
}

/// The fixed 12-byte message header.
#[derive(Clone, Copy, Default, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C, packed)]
pub struct Header {
    id: U16,
    flags: U16,
    qdcount: U16,
    ancount: U16,
    nscount: U16,
    arcount: U16,
}

impl Header {
    fn flags(&self) -> HeaderFlags {
        HeaderFlags::from_bits_retain(self.flags.get())
    }

    fn modify_flags(&mut self, with: impl FnOnce(&mut HeaderFlags)) {
        let mut flags = self.flags();
        with(&mut flags);
        self.flags = flags.bits().into();
    }

    /// Returns the 16-bit message ID.
    ///
    /// Servers will copy this ID to the corresponding response message so that the client can
    /// identify responses to its queries.
    #[inline]
    pub fn id(&self) -> u16 {
        self.id.get()
    }

    #[inline]
    pub fn set_id(&mut self, id: u16) {
        self.id = id.into();
    }

    #[inline]
    pub fn is_query(&self) -> bool {
        !self.is_response()
    }

    #[inline]
    pub fn is_response(&self) -> bool {
        self.flags().contains(HeaderFlags::QR)
    }

    pub fn set_response(&mut self, is_response: bool) {
        self.modify_flags(|f| f.set(HeaderFlags::QR, is_response));
    }

    pub fn is_authoritative(&self) -> bool {
        self.flags().contains(HeaderFlags::AA)
    }

    pub fn set_authoritative(&mut self, aa: bool) {
        self.modify_flags(|f| f.set(HeaderFlags::AA, aa));
    }

    /// Returns whether the truncation flag is set, indicating that the message was cut off to
    /// fit in the transport channel.
    pub fn is_truncated(&self) -> bool {
        self.flags().contains(HeaderFlags::TC)
    }

    pub fn set_truncated(&mut self, tc: bool) {
        self.modify_flags(|f| f.set(HeaderFlags::TC, tc));
    }

    pub fn is_recursion_desired(&self) -> bool {
        self.flags().contains(HeaderFlags::RD)
    }

    pub fn set_recursion_desired(&mut self, rd: bool) {
        self.modify_flags(|f| f.set(HeaderFlags::RD, rd));
    }

    pub fn is_recursion_available(&self) -> bool {
        self.flags().contains(HeaderFlags::RA)
    }

    pub fn set_recursion_available(&mut self, ra: bool) {
        self.modify_flags(|f| f.set(HeaderFlags::RA, ra));
    }

    pub fn opcode(&self) -> Opcode {
        self.flags().opcode()
    }

    /// Sets the operation code. Only values up to 15 are representable;
    /// higher bits are masked off.
    pub fn set_opcode(&mut self, opcode: Opcode) {
        self.modify_flags(|f| {
            f.set_field(
                HeaderFlags::OPCODE_MASK,
                HeaderFlags::OPCODE_POS,
                opcode.0.into(),
            )
        });
    }

    /// Returns the reserved Z bits.
    pub fn z(&self) -> u8 {
        self.flags().z()
    }

    /// Sets the reserved Z bits. Only values up to 7 are representable;
    /// higher bits are masked off.
    pub fn set_z(&mut self, z: u8) {
        self.modify_flags(|f| f.set_field(HeaderFlags::Z_MASK, HeaderFlags::Z_POS, z.into()));
    }

    pub fn rcode(&self) -> RCode {
        self.flags().rcode()
    }

    /// Sets the response code. Only values up to 15 are representable; higher
    /// bits are masked off.
    pub fn set_rcode(&mut self, rcode: RCode) {
        self.modify_flags(|f| {
            f.set_field(
                HeaderFlags::RCODE_MASK,
                HeaderFlags::RCODE_POS,
                rcode.0.into(),
            )
        });
    }

    pub fn question_count(&self) -> u16 {
        self.qdcount.get()
    }

    pub fn answer_count(&self) -> u16 {
        self.ancount.get()
    }

    pub fn authority_count(&self) -> u16 {
        self.nscount.get()
    }

    pub fn additional_count(&self) -> u16 {
        self.arcount.get()
    }

    fn set_qdcount(&mut self, qdcount: u16) {
        self.qdcount = qdcount.into();
    }

    fn set_ancount(&mut self, ancount: u16) {
        self.ancount = ancount.into();
    }

    fn set_nscount(&mut self, nscount: u16) {
        self.nscount = nscount.into();
    }

    fn set_arcount(&mut self, arcount: u16) {
        self.arcount = arcount.into();
    }
}

impl fmt::Debug for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Header")
            .field("id", &self.id())
            .field("flags", &self.flags())
            .field("qdcount", &self.qdcount.get())
            .field("ancount", &self.ancount.get())
            .field("nscount", &self.nscount.get())
            .field("arcount", &self.arcount.get())
            .finish()
    }
}

/// A single entry of the *Question* section.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Question {
    qname: DomainName,
    qtype: Type,
    qclass: Class,
}

impl Question {
    pub fn new(qname: DomainName, qclass: Class, qtype: Type) -> Self {
        Self {
            qname,
            qtype,
            qclass,
        }
    }

    /// Returns the domain name that is being queried.
    #[inline]
    pub fn qname(&self) -> &DomainName {
        &self.qname
    }

    /// Returns the resource record type the client is interested in.
    #[inline]
    pub fn qtype(&self) -> Type {
        self.qtype
    }

    /// Returns the record class that the client is interested in.
    #[inline]
    pub fn qclass(&self) -> Class {
        self.qclass
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}", self.qname(), self.qclass(), self.qtype())
    }
}

/// A resource record from the *Answer* section.
///
/// The record data is carried as opaque bytes whose length always equals the
/// wire RDLENGTH; [`Answer::process`] interprets it according to the record's
/// type code.
#[derive(PartialEq, Eq, Clone)]
pub struct Answer {
    name: DomainName,
    type_: Type,
    class: Class,
    ttl: u32,
    data: Vec<u8>,
}

impl Answer {
    pub fn new(name: DomainName, class: Class, type_: Type, ttl: u32, data: Vec<u8>) -> Self {
        Self {
            name,
            type_,
            class,
            ttl,
            data,
        }
    }

    #[inline]
    pub fn name(&self) -> &DomainName {
        &self.name
    }

    #[inline]
    pub fn type_(&self) -> Type {
        self.type_
    }

    #[inline]
    pub fn class(&self) -> Class {
        self.class
    }

    /// Returns the record's Time To Live, in seconds.
    #[inline]
    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    /// Returns the raw record data.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Interprets the record data according to the record's type code,
    /// producing a typed [`Record`].
    ///
    /// Unrecognized type codes yield [`Record::Opaque`] carrying the payload
    /// verbatim; a payload whose shape does not match a recognized type code
    /// is an error.
    pub fn process(&self) -> Result<Record, Error> {
        Record::from_answer(self)
    }
}

impl fmt::Debug for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("Answer");
        dbg.field("name", &self.name)
            .field("type_", &self.type_)
            .field("class", &self.class)
            .field("ttl", &self.ttl);
        let processed = self.process();
        match &processed {
            Ok(record) => dbg.field("data", record),
            Err(_) => dbg.field("data", &processed),
        };
        dbg.finish()
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t",
            self.name(),
            self.ttl(),
            self.class(),
            self.type_()
        )?;
        match self.process() {
            Ok(record) => write!(f, "{}", record),
            Err(e) => write!(f, "{}", e),
        }
    }
}

/// An in-memory DNS message: header, questions, and answers.
///
/// The *Authority* and *Additional* sections are not modeled; their counts
/// decode from the header but their bodies are not interpreted, and encoding
/// always writes them as empty.
#[derive(Debug, Clone)]
pub struct Message {
    header: Header,
    questions: Vec<Question>,
    answers: Vec<Answer>,
}

impl Message {
    /// Creates an empty query message with the given ID.
    pub fn new_query(id: u16) -> Self {
        let mut header = Header::default();
        header.set_id(id);
        Self {
            header,
            questions: Vec::new(),
            answers: Vec::new(),
        }
    }

    /// Creates an empty response message with the given ID.
    pub fn new_response(id: u16) -> Self {
        let mut msg = Self::new_query(id);
        msg.header.set_response(true);
        msg
    }

    /// Returns the message header.
    #[inline]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Returns a mutable reference to the message header, for setting flags
    /// and codes.
    ///
    /// The section counts are overwritten at encode time from the actual
    /// section contents.
    #[inline]
    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    #[inline]
    pub fn id(&self) -> u16 {
        self.header.id()
    }

    #[inline]
    pub fn is_query(&self) -> bool {
        self.header.is_query()
    }

    #[inline]
    pub fn is_authoritative(&self) -> bool {
        self.header.is_authoritative()
    }

    #[inline]
    pub fn is_truncated(&self) -> bool {
        self.header.is_truncated()
    }

    #[inline]
    pub fn is_recursion_desired(&self) -> bool {
        self.header.is_recursion_desired()
    }

    #[inline]
    pub fn is_recursion_available(&self) -> bool {
        self.header.is_recursion_available()
    }

    #[inline]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[inline]
    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    /// Appends an entry to the *Question* section.
    pub fn add_question(&mut self, qname: DomainName, qclass: Class, qtype: Type) {
        self.questions.push(Question::new(qname, qclass, qtype));
    }

    /// Appends a resource record to the *Answer* section. `data` becomes the
    /// record's RDATA verbatim.
    pub fn add_answer(
        &mut self,
        name: DomainName,
        class: Class,
        type_: Type,
        ttl: u32,
        data: Vec<u8>,
    ) {
        self.answers.push(Answer::new(name, class, type_, ttl, data));
    }

    /// Encodes the message into its wire format.
    ///
    /// QDCOUNT and ANCOUNT are derived from the section contents; they cannot
    /// get out of sync with the encoded sections. An answer whose name equals
    /// the first question's name is compressed into a pointer to the question
    /// section; all other names are written uncompressed.
    pub fn encode(&self) -> Vec<u8> {
        let mut header = self.header;
        header.set_qdcount(
            self.questions
                .len()
                .try_into()
                .expect("question count overflows u16"),
        );
        header.set_ancount(
            self.answers
                .len()
                .try_into()
                .expect("answer count overflows u16"),
        );
        // The authority and additional sections are not modeled.
        header.set_nscount(0);
        header.set_arcount(0);

        let mut w = Writer::new();
        w.write_obj(header);

        let question_section = w.pos() as u16;
        for question in &self.questions {
            w.write_question(question);
        }
        for answer in &self.answers {
            let compress_at = self
                .questions
                .first()
                .filter(|q| q.qname == answer.name)
                .map(|_| question_section);
            w.write_answer(answer, compress_at);
        }

        let bytes = w.into_bytes();
        log::trace!("encoded message: {} bytes {}", bytes.len(), Hex(&bytes));
        bytes
    }

    /// Decodes a message from its wire format.
    ///
    /// The section counts read from the header determine how many questions
    /// and answers are decoded; any *Authority*/*Additional* payload after
    /// them is left uninterpreted.
    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        log::trace!("decoding message: {} bytes {}", buf.len(), Hex(buf));

        let mut r = Reader::new(buf);
        let header = r.read_obj::<Header>()?;

        let mut questions = Vec::new();
        for _ in 0..header.question_count() {
            questions.push(r.read_question()?);
        }

        let mut answers = Vec::new();
        for _ in 0..header.answer_count() {
            answers.push(r.read_answer()?);
        }

        Ok(Self {
            header,
            questions,
            answers,
        })
    }
}
