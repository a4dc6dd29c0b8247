//! DNS message decoder.

use std::mem::size_of;

use bytemuck::AnyBitPattern;

use crate::num::{U16, U32};

use super::{
    name::{DomainName, Label},
    Answer, Class, Error, Question, Type, POINTER_OFFSET_MASK,
};

/// Maximum number of compression pointers a single domain name may follow.
///
/// The wire format itself does not bound this, but an unguarded decoder would
/// loop forever on a pointer cycle. Any value comfortably above the label
/// count of a legitimate name works; 16 hops already exceeds what fits in a
/// 512-byte message.
const MAX_POINTER_HOPS: usize = 16;

#[derive(Debug, Clone)]
pub(crate) struct Reader<'a> {
    /// The buffer containing the whole DNS message.
    full_buf: &'a [u8],
    /// The current reader position in the buffer.
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self {
            full_buf: buf,
            pos: 0,
        }
    }

    pub(crate) fn buf(&self) -> &'a [u8] {
        &self.full_buf[self.pos..]
    }

    pub(crate) fn remaining(&self) -> usize {
        self.full_buf.len() - self.pos
    }

    pub(crate) fn read_obj<T: AnyBitPattern>(&mut self) -> Result<T, Error> {
        let bytes = self.buf().get(..size_of::<T>()).ok_or(Error::Eof)?;
        self.pos += size_of::<T>();
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    fn peek_u8(&self) -> Result<u8, Error> {
        self.full_buf.get(self.pos).copied().ok_or(Error::Eof)
    }

    pub(crate) fn read_slice(&mut self, len: usize) -> Result<&'a [u8], Error> {
        match self.full_buf.get(self.pos..self.pos + len) {
            Some(slice) => {
                self.pos += len;
                Ok(slice)
            }
            None => Err(Error::Eof),
        }
    }

    pub(crate) fn read_array<const LEN: usize>(&mut self) -> Result<&'a [u8; LEN], Error> {
        let slice = self.read_slice(LEN)?;
        Ok(slice.try_into().unwrap())
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, Error> {
        self.read_obj::<u8>()
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, Error> {
        Ok(self.read_obj::<U16>()?.get())
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, Error> {
        Ok(self.read_obj::<U32>()?.get())
    }

    /// Reads a `<domain-name>` value, following compression pointers.
    ///
    /// Pointers redirect decoding to an absolute offset in the message
    /// buffer, but do not contribute to the consumed length at the original
    /// position: once the first pointer is followed, the reader position only
    /// advances past that 2-byte pointer field.
    pub(crate) fn read_domain_name(&mut self) -> Result<DomainName, Error> {
        let mut domain_name = DomainName::ROOT;
        let mut copy = self.clone();
        // Position the original reader ends up at. Fixed after the first
        // pointer; the jump target's length does not count.
        let mut end_pos = None;
        let mut hops = 0;
        loop {
            let length = copy.peek_u8()?;
            match length & 0b1100_0000 {
                0b1100_0000 => {
                    // 16-bit pointer to somewhere else in the message.
                    let ptr = usize::from(copy.read_u16()? & POINTER_OFFSET_MASK);
                    if ptr >= self.full_buf.len() {
                        return Err(Error::InvalidPointer);
                    }
                    hops += 1;
                    if hops > MAX_POINTER_HOPS {
                        // Cycle, or a chain no real message needs.
                        return Err(Error::InvalidPointer);
                    }
                    if end_pos.is_none() {
                        end_pos = Some(copy.pos);
                    }
                    copy.pos = ptr;
                }
                0b0000_0000 => {
                    copy.pos += 1;

                    // Length byte followed by a label of that many bytes.
                    let length = usize::from(length);
                    if length == 0 {
                        break;
                    }
                    let label = copy.read_slice(length)?;
                    domain_name.push_label(Label::try_new(label)?);
                }
                _ => return Err(Error::InvalidValue), // anything but 00 and 11 in MSb is reserved
            }
        }

        self.pos = end_pos.unwrap_or(copy.pos);
        Ok(domain_name)
    }

    pub(crate) fn read_question(&mut self) -> Result<Question, Error> {
        let qname = self.read_domain_name()?;
        let qtype = Type(self.read_u16()?);
        let qclass = Class(self.read_u16()?);
        Ok(Question {
            qname,
            qtype,
            qclass,
        })
    }

    pub(crate) fn read_answer(&mut self) -> Result<Answer, Error> {
        let name = self.read_domain_name()?;
        let type_ = Type(self.read_u16()?);
        let class = Class(self.read_u16()?);
        let ttl = self.read_u32()?;
        let rdlength = self.read_u16()?;
        let data = self.read_slice(usize::from(rdlength))?.to_vec();
        Ok(Answer {
            name,
            type_,
            class,
            ttl,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_domain_name() {
        let mut r = Reader::new(&[
            7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 3, b'c', b'o', b'm', 0,
        ]);
        let name = r.read_domain_name().unwrap();
        assert_eq!(name.to_string(), "example.com.");
        assert_eq!(r.remaining(), 0);

        let mut r = Reader::new(&[0]);
        let name = r.read_domain_name().unwrap();
        assert_eq!(name.to_string(), ".");
    }

    #[test]
    fn decode_domain_name_pointer() {
        let mut r = Reader::new(&[
            b'_', // never read
            3,
            b'c',
            b'o',
            b'm',
            0, // "com."
            7,
            b'e',
            b'x',
            b'a',
            b'm',
            b'p',
            b'l',
            b'e',
            // ptr to 1:
            0b1100_0000,
            1,
        ]);
        r.pos = 6;
        let name = r.read_domain_name().unwrap();
        assert_eq!(name.to_string(), "example.com.");
        assert_eq!(r.read_u8(), Err(Error::Eof), "should be at EOF");
    }

    #[test]
    fn decode_domain_name_pointer_consumes_two_bytes() {
        let mut r = Reader::new(&[
            3, b'c', b'o', b'm', 0, // "com." at offset 0
            0b1100_0000, 0, // ptr to 0
            0xab, // trailing byte after the pointer
        ]);
        r.pos = 5;
        let name = r.read_domain_name().unwrap();
        assert_eq!(name.to_string(), "com.");
        assert_eq!(r.read_u8(), Ok(0xab));
    }

    #[test]
    fn decode_domain_name_pointer_oob() {
        let mut r = Reader::new(&[0xff, 0xff]);
        assert_eq!(r.read_domain_name(), Err(Error::InvalidPointer));
    }

    #[test]
    fn decode_domain_name_pointer_cycle() {
        let mut r = Reader::new(&[
            // pointer to self:
            0b1100_0000,
            0,
        ]);
        assert_eq!(r.read_domain_name(), Err(Error::InvalidPointer));

        let mut r = Reader::new(&[
            // fallthrough:
            1,
            b'a',
            // pointer to 0:
            0b1100_0000,
            0,
        ]);
        r.pos = 2;
        assert_eq!(r.read_domain_name(), Err(Error::InvalidPointer));
    }

    #[test]
    fn decode_domain_name_reserved_tag() {
        let mut r = Reader::new(&[0b1000_0000, 0]);
        assert_eq!(r.read_domain_name(), Err(Error::InvalidValue));
    }

    #[test]
    fn decode_domain_name_truncated_label() {
        let mut r = Reader::new(&[5, b'a', b'b']);
        assert_eq!(r.read_domain_name(), Err(Error::Eof));
    }

    #[test]
    fn decode_question() {
        let mut r = Reader::new(&[
            6, b'g', b'o', b'o', b'g', b'l', b'e', 3, b'c', b'o', b'm', 0, 0, 1, 0, 1,
        ]);
        let q = r.read_question().unwrap();
        assert_eq!(q.qname().to_string(), "google.com.");
        assert_eq!(q.qtype(), Type::A);
        assert_eq!(q.qclass(), Class::IN);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn decode_answer_uncompressed() {
        let mut r = Reader::new(&[
            3, b'c', b'o', b'm', 0, // name
            0, 1, // type A
            0, 1, // class IN
            0, 0, 0, 60, // ttl
            0, 4, // rdlength
            192, 0, 2, 1, // rdata
        ]);
        let a = r.read_answer().unwrap();
        assert_eq!(a.name().to_string(), "com.");
        assert_eq!(a.type_(), Type::A);
        assert_eq!(a.class(), Class::IN);
        assert_eq!(a.ttl(), 60);
        assert_eq!(a.data(), &[192, 0, 2, 1]);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn decode_answer_compressed_name() {
        // An uncompressed name at offset 0, then a record whose name is a
        // pointer back to it. Decoding the record must yield the same name as
        // decoding the label sequence directly.
        let buf = &[
            3, b'c', b'o', b'm', 0, // "com." at offset 0
            0b1100_0000, 0, // name: ptr to 0
            0, 33, // type SRV
            0, 1, // class IN
            0, 0, 0, 0, // ttl
            0, 2, // rdlength
            0xaa, 0xbb, // rdata
        ];
        let direct = Reader::new(buf).read_domain_name().unwrap();

        let mut r = Reader::new(buf);
        r.pos = 5;
        let a = r.read_answer().unwrap();
        assert_eq!(a.name(), &direct);
        assert_eq!(a.type_(), Type::SRV);
        assert_eq!(a.data(), &[0xaa, 0xbb]);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn decode_answer_rdata_past_end() {
        let mut r = Reader::new(&[
            0, // root name
            0, 1, 0, 1, 0, 0, 0, 0, // type/class/ttl
            0, 9, // rdlength, but only 2 bytes follow
            1, 2,
        ]);
        assert_eq!(r.read_answer(), Err(Error::Eof));
    }
}
