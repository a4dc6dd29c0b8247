//! DNS message encoder.

use bytemuck::NoUninit;

use super::{name::DomainName, Answer, Question, POINTER_TAG};

pub(crate) struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub(crate) fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub(crate) fn pos(&self) -> usize {
        self.buf.len()
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub(crate) fn write_slice(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    pub(crate) fn write_obj<T: NoUninit>(&mut self, obj: T) {
        self.write_slice(bytemuck::bytes_of(&obj))
    }

    pub(crate) fn write_u8(&mut self, b: u8) {
        self.write_slice(&[b]);
    }

    pub(crate) fn write_u16(&mut self, v: u16) {
        self.write_slice(&v.to_be_bytes());
    }

    pub(crate) fn write_u32(&mut self, v: u32) {
        self.write_slice(&v.to_be_bytes());
    }

    /// Writes a `<domain-name>` value as uncompressed length-prefixed labels.
    ///
    /// Label lengths fit in the 6 low bits of the length byte; [`Label`]
    /// enforces that at construction.
    ///
    /// [`Label`]: super::name::Label
    pub(crate) fn write_domain_name(&mut self, name: &DomainName) {
        for label in name.labels() {
            self.write_u8(label.as_bytes().len() as u8);
            self.write_slice(label.as_bytes());
        }
        // Implicit root label at the end.
        self.write_u8(0);
    }

    pub(crate) fn write_question(&mut self, question: &Question) {
        self.write_domain_name(&question.qname);
        self.write_u16(question.qtype.0);
        self.write_u16(question.qclass.0);
    }

    /// Writes a resource record. When `compress_at` is given, the name field
    /// becomes a 2-byte pointer to that absolute message offset instead of
    /// the uncompressed label sequence.
    pub(crate) fn write_answer(&mut self, answer: &Answer, compress_at: Option<u16>) {
        match compress_at {
            Some(offset) => self.write_u16(POINTER_TAG | offset),
            None => self.write_domain_name(&answer.name),
        }
        self.write_u16(answer.type_.0);
        self.write_u16(answer.class.0);
        self.write_u32(answer.ttl);
        // RDLENGTH always equals the payload length.
        self.write_u16(
            answer
                .data
                .len()
                .try_into()
                .expect("RDATA length overflows u16"),
        );
        self.write_slice(&answer.data);
    }
}

#[cfg(test)]
mod tests {
    use super::super::{decoder::Reader, Class, Type};
    use super::*;

    fn domain(s: &str) -> DomainName {
        s.parse().unwrap()
    }

    #[test]
    fn encode_domain_name() {
        let mut w = Writer::new();
        w.write_domain_name(&domain("google.com"));
        assert_eq!(
            w.into_bytes(),
            &[6, 103, 111, 111, 103, 108, 101, 3, 99, 111, 109, 0],
        );

        let mut w = Writer::new();
        w.write_domain_name(&domain("_godrop._tcp.local"));
        assert_eq!(
            w.into_bytes(),
            &[
                7, 95, 103, 111, 100, 114, 111, 112, 4, 95, 116, 99, 112, 5, 108, 111, 99, 97,
                108, 0,
            ],
        );

        let mut w = Writer::new();
        w.write_domain_name(&DomainName::ROOT);
        assert_eq!(w.into_bytes(), &[0]);
    }

    #[test]
    fn domain_name_roundtrip() {
        for s in ["google.com", "_godrop._tcp.local", "a.b.c.d.e"] {
            let name = domain(s);
            let mut w = Writer::new();
            w.write_domain_name(&name);
            let bytes = w.into_bytes();
            assert_eq!(bytes.len(), name.encoded_len());

            let mut r = Reader::new(&bytes);
            assert_eq!(r.read_domain_name().unwrap(), name);
            assert_eq!(r.remaining(), 0, "whole encoding must be consumed");
        }
    }

    #[test]
    fn encode_question() {
        let mut w = Writer::new();
        w.write_question(&Question {
            qname: domain("google.com"),
            qtype: Type::A,
            qclass: Class::IN,
        });
        assert_eq!(
            w.into_bytes(),
            &[6, 103, 111, 111, 103, 108, 101, 3, 99, 111, 109, 0, 0, 1, 0, 1],
        );
    }

    #[test]
    fn encode_answer_compressed() {
        let answer = Answer {
            name: domain("google.com"),
            type_: Type::A,
            class: Class::IN,
            ttl: 60,
            data: vec![192, 0, 2, 1],
        };

        let mut w = Writer::new();
        w.write_answer(&answer, Some(12));
        assert_eq!(
            w.into_bytes(),
            &[0xc0, 12, 0, 1, 0, 1, 0, 0, 0, 60, 0, 4, 192, 0, 2, 1],
        );

        let mut w = Writer::new();
        w.write_answer(&answer, None);
        assert_eq!(
            w.into_bytes(),
            &[
                6, 103, 111, 111, 103, 108, 101, 3, 99, 111, 109, 0, // name
                0, 1, 0, 1, 0, 0, 0, 60, 0, 4, 192, 0, 2, 1,
            ],
        );
    }
}
