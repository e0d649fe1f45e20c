//! General CBOR reader
//!
//! A pull reader over a borrowed byte slice built on the `ciborium-ll`
//! decoder. It exposes just enough of CBOR for the passkey structures: map
//! headers, integers, text and byte strings, opaque values that are skipped or
//! captured as raw encoded bytes.
//!
//! Every declared length is checked against the bytes actually left in the
//! input before anything is allocated, and nested values are skipped with an
//! explicit stack so hostile nesting depth cannot exhaust the call stack.

use super::errors::PasskeyError;
use crate::utils::scratch::ScratchBuffer;
use ciborium_ll::{Decoder, Header};
use std::fmt::Debug;

/// Reader over a single CBOR-encoded buffer
pub struct CborReader<'a> {
    input: &'a [u8],
    decoder: Decoder<&'a [u8]>,
}

/// Containers still open while skipping a value
enum OpenContainer {
    /// Definite length container with this many items left
    Items(usize),
    /// Indefinite length container waiting for a break
    UntilBreak,
}

/// Map a `ciborium-ll` failure to the crate error type
pub(crate) fn malformed<E: Debug>(error: ciborium_ll::Error<E>) -> PasskeyError {
    match error {
        ciborium_ll::Error::Io(_) => {
            PasskeyError::MalformedCbor("unexpected end of input".to_string())
        }
        ciborium_ll::Error::Syntax(offset) => {
            PasskeyError::MalformedCbor(format!("invalid syntax at offset {offset}"))
        }
    }
}

/// Number of bytes the shortest encoding of a header argument takes
fn minimal_header_width(argument: u64) -> usize {
    match argument {
        0..=23 => 1,
        24..=0xff => 2,
        0x100..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => 9,
    }
}

fn length_argument(len: usize) -> u64 {
    u64::try_from(len).unwrap_or(u64::MAX)
}

/// Whether `header` was encoded in `width` bytes using the shortest form
pub(crate) fn is_minimally_encoded(header: &Header, width: usize) -> bool {
    match header {
        Header::Positive(value) | Header::Negative(value) | Header::Tag(value) => {
            width == minimal_header_width(*value)
        }
        Header::Bytes(Some(len))
        | Header::Text(Some(len))
        | Header::Array(Some(len))
        | Header::Map(Some(len)) => width == minimal_header_width(length_argument(*len)),
        Header::Simple(value) => width == if *value < 24 { 1 } else { 2 },
        Header::Bytes(None)
        | Header::Text(None)
        | Header::Array(None)
        | Header::Map(None)
        | Header::Break => width == 1,
        Header::Float(_) => true,
    }
}

/// Convert an integer header to `i64`
pub(crate) fn int_from_header(header: &Header) -> Result<i64, PasskeyError> {
    match *header {
        Header::Positive(value) => i64::try_from(value)
            .map_err(|_| PasskeyError::MalformedCbor(format!("integer {value} out of range"))),
        Header::Negative(value) => i64::try_from(value)
            .map(|magnitude| -1 - magnitude)
            .map_err(|_| PasskeyError::MalformedCbor("negative integer out of range".to_string())),
        ref other => Err(unexpected_header("integer", other)),
    }
}

pub(crate) fn unexpected_header(expected: &str, found: &Header) -> PasskeyError {
    PasskeyError::MalformedCbor(format!("expected {expected}, found {found:?}"))
}

impl<'a> CborReader<'a> {
    #[must_use]
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            decoder: Decoder::from(input),
        }
    }

    /// Bytes not yet consumed
    pub fn bytes_remaining(&mut self) -> usize {
        self.input.len().saturating_sub(self.decoder.offset())
    }

    /// Pull the next header along with the number of bytes it occupied
    ///
    /// # Errors
    ///
    /// Returns `MalformedCbor` at end of input or on an invalid initial byte
    pub fn read_header(&mut self) -> Result<(Header, usize), PasskeyError> {
        let start = self.decoder.offset();
        let header = self.decoder.pull().map_err(malformed)?;
        Ok((header, self.decoder.offset() - start))
    }

    /// Read a map header, returning the entry count or `None` for an
    /// indefinite length map
    ///
    /// # Errors
    ///
    /// Returns `MalformedCbor` if the next item is not a map
    pub fn read_map_start(&mut self) -> Result<Option<usize>, PasskeyError> {
        match self.read_header()? {
            (Header::Map(len), _) => {
                if let Some(entries) = len {
                    self.check_declared_items(entries.saturating_mul(2))?;
                }
                Ok(len)
            }
            (other, _) => Err(unexpected_header("map", &other)),
        }
    }

    /// Consume a break marker if it is the next item
    ///
    /// # Errors
    ///
    /// Returns `MalformedCbor` if the input ends
    pub fn try_read_break(&mut self) -> Result<bool, PasskeyError> {
        match self.input.get(self.decoder.offset()) {
            Some(0xff) => {
                self.read_header()?;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(PasskeyError::MalformedCbor(
                "unexpected end of input".to_string(),
            )),
        }
    }

    /// Read an integer that fits in `i64`
    ///
    /// # Errors
    ///
    /// Returns `MalformedCbor` if the next item is not an integer in range
    pub fn read_int(&mut self) -> Result<i64, PasskeyError> {
        let (header, _) = self.read_header()?;
        int_from_header(&header)
    }

    /// Read a (possibly segmented) text string
    ///
    /// # Errors
    ///
    /// Returns `MalformedCbor` if the next item is not valid UTF-8 text
    pub fn read_text_string(&mut self) -> Result<String, PasskeyError> {
        match self.read_header()? {
            (Header::Text(len), _) => self.read_text_body(len),
            (other, _) => Err(unexpected_header("text string", &other)),
        }
    }

    /// Read a (possibly segmented) byte string
    ///
    /// # Errors
    ///
    /// Returns `MalformedCbor` if the next item is not a byte string
    pub fn read_byte_string(&mut self) -> Result<Vec<u8>, PasskeyError> {
        match self.read_header()? {
            (Header::Bytes(len), _) => self.read_bytes_body(len),
            (other, _) => Err(unexpected_header("byte string", &other)),
        }
    }

    /// Skip one complete data item, however deeply nested
    ///
    /// # Errors
    ///
    /// Returns `MalformedCbor` if the item is truncated or invalid
    pub fn skip_value(&mut self) -> Result<(), PasskeyError> {
        let (header, width) = self.read_header()?;
        self.skip_rest(header, width, false)
    }

    /// Return the raw encoding of the next data item and move past it
    ///
    /// # Errors
    ///
    /// Returns `MalformedCbor` if the item is truncated or invalid
    pub fn read_encoded_value(&mut self) -> Result<&'a [u8], PasskeyError> {
        let start = self.decoder.offset();
        self.skip_value()?;
        let end = self.decoder.offset();
        Ok(&self.input[start..end])
    }

    /// Read the payload of a byte string whose header was already pulled
    pub(crate) fn read_bytes_body(&mut self, len: Option<usize>) -> Result<Vec<u8>, PasskeyError> {
        let mut out = Vec::new();
        self.drain_bytes(len, &mut out)?;
        Ok(out)
    }

    /// Read the payload of a text string whose header was already pulled
    pub(crate) fn read_text_body(&mut self, len: Option<usize>) -> Result<String, PasskeyError> {
        let mut out = String::new();
        self.drain_text(len, &mut out)?;
        Ok(out)
    }

    /// Skip the remainder of an item whose header was already pulled.
    ///
    /// With `canonical` set, every nested header must be minimally encoded
    /// and of definite length.
    pub(crate) fn skip_rest(
        &mut self,
        first: Header,
        first_width: usize,
        canonical: bool,
    ) -> Result<(), PasskeyError> {
        let mut open: Vec<OpenContainer> = Vec::new();
        let mut next = Some((first, first_width));

        loop {
            let (header, width) = match next.take() {
                Some(pulled) => pulled,
                None => self.read_header()?,
            };
            if canonical {
                Self::check_canonical_header(&header, width)?;
            }

            match header {
                Header::Positive(_)
                | Header::Negative(_)
                | Header::Float(_)
                | Header::Simple(_) => {}
                // A tag and the item it wraps count as one item
                Header::Tag(_) => continue,
                Header::Bytes(len) => {
                    let mut discard = Vec::new();
                    self.drain_bytes(len, &mut discard)?;
                }
                Header::Text(len) => {
                    let mut discard = String::new();
                    self.drain_text(len, &mut discard)?;
                }
                Header::Array(Some(0)) | Header::Map(Some(0)) => {}
                Header::Array(Some(items)) => {
                    self.check_declared_items(items)?;
                    open.push(OpenContainer::Items(items));
                    continue;
                }
                Header::Map(Some(entries)) => {
                    let items = entries.checked_mul(2).ok_or_else(|| {
                        PasskeyError::MalformedCbor("map length overflow".to_string())
                    })?;
                    self.check_declared_items(items)?;
                    open.push(OpenContainer::Items(items));
                    continue;
                }
                Header::Array(None) | Header::Map(None) => {
                    open.push(OpenContainer::UntilBreak);
                    continue;
                }
                Header::Break => {
                    if !matches!(open.pop(), Some(OpenContainer::UntilBreak)) {
                        return Err(PasskeyError::MalformedCbor("unexpected break".to_string()));
                    }
                }
            }

            // One item finished; close every container it completes
            loop {
                match open.last_mut() {
                    None => return Ok(()),
                    Some(OpenContainer::Items(left)) => {
                        *left -= 1;
                        if *left > 0 {
                            break;
                        }
                        open.pop();
                    }
                    Some(OpenContainer::UntilBreak) => break,
                }
            }
        }
    }

    fn check_canonical_header(header: &Header, width: usize) -> Result<(), PasskeyError> {
        if matches!(
            header,
            Header::Bytes(None) | Header::Text(None) | Header::Array(None) | Header::Map(None)
        ) {
            return Err(PasskeyError::MalformedCbor(
                "indefinite length item in canonical CBOR".to_string(),
            ));
        }
        if !is_minimally_encoded(header, width) {
            return Err(PasskeyError::MalformedCbor(
                "non-minimal header encoding in canonical CBOR".to_string(),
            ));
        }
        Ok(())
    }

    /// Every item takes at least one byte, so a count larger than the rest of
    /// the input can never be satisfied
    fn check_declared_items(&mut self, items: usize) -> Result<(), PasskeyError> {
        let remaining = self.bytes_remaining();
        if items > remaining {
            return Err(PasskeyError::MalformedCbor(format!(
                "declared {items} items but only {remaining} bytes remain"
            )));
        }
        Ok(())
    }

    fn check_declared_len(&mut self, len: Option<usize>) -> Result<usize, PasskeyError> {
        let remaining = self.bytes_remaining();
        if let Some(len) = len {
            if len > remaining {
                return Err(PasskeyError::MalformedCbor(format!(
                    "declared length {len} exceeds the {remaining} remaining bytes"
                )));
            }
        }
        Ok(remaining)
    }

    fn drain_bytes(&mut self, len: Option<usize>, out: &mut Vec<u8>) -> Result<(), PasskeyError> {
        let remaining = self.check_declared_len(len)?;
        let mut segments = self.decoder.bytes(len);
        while let Some(mut segment) = segments.pull().map_err(malformed)? {
            let mut scratch = ScratchBuffer::with_capacity(segment.left().min(remaining));
            while let Some(chunk) = segment.pull(scratch.as_mut_slice()).map_err(malformed)? {
                out.extend_from_slice(chunk);
            }
        }
        Ok(())
    }

    fn drain_text(&mut self, len: Option<usize>, out: &mut String) -> Result<(), PasskeyError> {
        let remaining = self.check_declared_len(len)?;
        let mut segments = self.decoder.text(len);
        while let Some(mut segment) = segments.pull().map_err(malformed)? {
            let mut scratch = ScratchBuffer::with_capacity(segment.left().min(remaining));
            while let Some(chunk) = segment.pull(scratch.as_mut_slice()).map_err(malformed)? {
                out.push_str(chunk);
            }
        }
        Ok(())
    }
}
