//! Domain names and labels.

use std::{
    fmt::{self, Write},
    str::FromStr,
};

use super::Error;

/// A `.`-separated component of a [`DomainName`].
///
/// Labels consist of arbitrary bytes and have a maximum length of 63 bytes.
/// This type can only represent non-empty labels, so the minimum length is 1
/// byte.
#[derive(PartialEq, Eq, Clone, Hash)]
pub struct Label {
    bytes: Box<[u8]>,
}

impl Label {
    /// The maximum length of a domain label.
    pub const MAX_LEN: usize = 0b0011_1111;

    /// Creates a [`Label`] from raw bytes or a string slice, panicking if the
    /// bytes are an invalid label.
    ///
    /// # Panics
    ///
    /// This function will panic if `bytes` is empty or contains more than
    /// [`Self::MAX_LEN`] bytes.
    pub fn new(label: impl AsRef<[u8]>) -> Self {
        let label = label.as_ref();
        Self::try_new(label)
            .unwrap_or_else(|_| panic!("`Label::new` called with invalid data: {:?}", label))
    }

    /// Creates a [`Label`] from raw bytes or a string slice, returning an
    /// error if the bytes are an invalid label.
    pub fn try_new(label: impl AsRef<[u8]>) -> Result<Self, Error> {
        Self::try_new_impl(label.as_ref())
    }

    fn try_new_impl(label: &[u8]) -> Result<Self, Error> {
        if label.is_empty() {
            return Err(Error::InvalidEmptyLabel);
        }

        if label.len() > Self::MAX_LEN {
            return Err(Error::LabelTooLong);
        }

        Ok(Self {
            bytes: label.into(),
        })
    }

    /// Returns the raw bytes of this label.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, r#""{}""#, self.bytes.escape_ascii())
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.bytes.escape_ascii().fmt(f)
    }
}

impl FromStr for Label {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_new(s)
    }
}

/// A domain name, represented as a list of [`Label`]s.
///
/// On the wire, domain names are terminated by an empty label, but this type
/// omits that label. This allows downstream code to use
/// [`DomainName::push_label`] to incrementally build a domain name.
#[derive(PartialEq, Eq, Clone, Hash)]
pub struct DomainName {
    // Does not include the trailing empty label.
    labels: Vec<Label>,
}

impl DomainName {
    /// The empty root domain `.`.
    pub const ROOT: Self = Self { labels: Vec::new() };

    /// Parses a domain name as a string of `.`-separated labels.
    ///
    /// A trailing `.` is allowed but not required.
    ///
    /// The [`FromStr`] implementation performs the same operation. This method
    /// is just a convenience function so that you don't have to import that
    /// trait.
    pub fn from_str(s: &str) -> Result<Self, Error> {
        s.parse()
    }

    /// Returns the `.`-separated labels making up this domain name.
    ///
    /// The trailing empty label is not included.
    #[inline]
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Appends a [`Label`] to the end of this domain name.
    #[inline]
    pub fn push_label(&mut self, label: Label) {
        self.labels.push(label);
    }

    /// Returns the number of bytes this name occupies in its uncompressed
    /// wire form (including the terminating empty label).
    pub fn encoded_len(&self) -> usize {
        self.labels.iter().map(|l| l.as_bytes().len() + 1).sum::<usize>() + 1
    }
}

impl FromIterator<Label> for DomainName {
    fn from_iter<T: IntoIterator<Item = Label>>(iter: T) -> Self {
        Self {
            labels: Vec::from_iter(iter),
        }
    }
}

impl fmt::Debug for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.labels.is_empty() {
            return f.write_char('.');
        }
        for label in &self.labels {
            label.fmt(f)?;
            f.write_char('.')?;
        }
        Ok(())
    }
}

impl FromStr for DomainName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "." {
            // `split_terminator` returns an empty label for this, so special-case it
            return Ok(Self::ROOT);
        }

        let mut name = DomainName { labels: Vec::new() };
        for label in s.split_terminator('.') {
            name.labels.push(label.parse()?);
        }
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_length_limits() {
        assert_eq!(Label::try_new(""), Err(Error::InvalidEmptyLabel));
        assert_eq!(Label::try_new([b'a'; 64]), Err(Error::LabelTooLong));
        assert_eq!(Label::try_new([b'a'; 63]).unwrap().as_bytes().len(), 63);
    }

    #[test]
    fn display_label() {
        assert_eq!(format!(" {} ", Label::new("\0")), r#" \x00 "#);
        assert_eq!(format!(" {} ", Label::new("\n")), r#" \n "#);
        assert_eq!(format!(" {} ", Label::new("a")), r#" a "#);
    }

    #[test]
    fn debug_label() {
        assert_eq!(format!(" {:?} ", Label::new("\0")), r#" "\x00" "#);
        assert_eq!(format!(" {:?} ", Label::new("a")), r#" "a" "#);
    }

    #[test]
    fn domain_name_string_conversion() {
        assert_eq!("..".parse::<DomainName>(), Err(Error::InvalidEmptyLabel));
        assert_eq!(".com".parse::<DomainName>(), Err(Error::InvalidEmptyLabel));
        assert_eq!(".".parse::<DomainName>(), Ok(DomainName::ROOT));
        assert_eq!("com.".parse::<DomainName>().unwrap().to_string(), "com.");
        assert_eq!("com.".parse::<DomainName>().unwrap().labels().len(), 1);
        assert_eq!(
            "_godrop._tcp.local".parse::<DomainName>().unwrap().labels().len(),
            3,
        );
    }

    #[test]
    fn encoded_len() {
        assert_eq!(DomainName::ROOT.encoded_len(), 1);
        assert_eq!(DomainName::from_str("google.com").unwrap().encoded_len(), 12);
    }
}
