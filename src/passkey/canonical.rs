//! CTAP2 canonical CBOR map cursor
//!
//! COSE keys sent by authenticators must use the CTAP2 canonical form: a
//! definite length map whose integer labels are unique and sorted, with every
//! integer and length in its shortest encoding. The cursor walks such a map one
//! label at a time. Callers say which label they expect next, either as
//! required ([`CanonicalCursor::read_required_label`]) or optional
//! ([`CanonicalCursor::try_read_optional_label`]); a label that is read but not
//! wanted stays in a one-slot lookahead until the next call.

use super::cbor::{int_from_header, is_minimally_encoded, unexpected_header, CborReader};
use super::errors::PasskeyError;
use ciborium_ll::Header;
use std::cmp::Ordering;

/// Cursor over the entries of a canonical CBOR map
pub struct CanonicalCursor<'a> {
    reader: CborReader<'a>,
    remaining_keys: usize,
    peeked_label: Option<i64>,
    last_label: Option<i64>,
}

/// Position of an integer label in CTAP2 canonical order: shorter encodings
/// first, then unsigned before negative, then by encoded argument
fn canonical_rank(label: i64) -> (usize, u8, u64) {
    let (major, argument) = if label >= 0 {
        (0, label.unsigned_abs())
    } else {
        (1, (-1 - label).unsigned_abs())
    };
    let width = match argument {
        0..=23 => 1,
        24..=0xff => 2,
        0x100..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => 9,
    };
    (width, major, argument)
}

/// Compare two labels in CTAP2 canonical order
#[must_use]
pub fn canonical_cmp(a: i64, b: i64) -> Ordering {
    canonical_rank(a).cmp(&canonical_rank(b))
}

impl<'a> CanonicalCursor<'a> {
    /// Open a cursor over the map at the start of `input`
    ///
    /// # Errors
    ///
    /// Returns `MalformedCbor` if the input does not start with a definite
    /// length, minimally encoded map header
    pub fn new(input: &'a [u8]) -> Result<Self, PasskeyError> {
        let mut reader = CborReader::new(input);
        let (header, width) = reader.read_header()?;
        let entries = match header {
            Header::Map(Some(entries)) => entries,
            Header::Map(None) => {
                return Err(PasskeyError::MalformedCbor(
                    "canonical map must declare a definite length".to_string(),
                ))
            }
            other => return Err(unexpected_header("map", &other)),
        };
        if !is_minimally_encoded(&header, width) {
            return Err(PasskeyError::MalformedCbor(
                "non-minimal map header in canonical CBOR".to_string(),
            ));
        }
        // Each entry needs at least two bytes
        if entries > reader.bytes_remaining() / 2 {
            return Err(PasskeyError::MalformedCbor(format!(
                "map declares {entries} entries but the input is too short"
            )));
        }

        Ok(Self {
            reader,
            remaining_keys: entries,
            peeked_label: None,
            last_label: None,
        })
    }

    /// Consume the next label, which must be `label`
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedLabel` if the next label differs or the map is
    /// exhausted, `MalformedCbor` if the label is badly encoded or out of order
    pub fn read_required_label(&mut self, label: i64) -> Result<(), PasskeyError> {
        match self.peek_label()? {
            Some(found) if found == label => {
                self.peeked_label = None;
                Ok(())
            }
            found => Err(PasskeyError::UnexpectedLabel {
                expected: Some(label),
                found,
            }),
        }
    }

    /// Consume the next label only if it is `label`
    ///
    /// # Errors
    ///
    /// Returns `MalformedCbor` if the label is badly encoded or out of order
    pub fn try_read_optional_label(&mut self, label: i64) -> Result<bool, PasskeyError> {
        if self.peek_label()? == Some(label) {
            self.peeked_label = None;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Read an integer value
    ///
    /// # Errors
    ///
    /// Returns `MalformedCbor` if the value is not a minimally encoded integer
    pub fn read_int(&mut self) -> Result<i64, PasskeyError> {
        let header = self.read_value_header()?;
        int_from_header(&header)
    }

    /// Read a definite length byte string value
    ///
    /// # Errors
    ///
    /// Returns `MalformedCbor` if the value is not a canonical byte string
    pub fn read_byte_string(&mut self) -> Result<Vec<u8>, PasskeyError> {
        match self.read_value_header()? {
            Header::Bytes(len) => self.reader.read_bytes_body(len),
            other => Err(unexpected_header("byte string", &other)),
        }
    }

    /// Skip a value of any type
    ///
    /// # Errors
    ///
    /// Returns `MalformedCbor` if the value or anything nested in it is not
    /// canonically encoded
    pub fn skip_value(&mut self) -> Result<(), PasskeyError> {
        let (header, width) = self.reader.read_header()?;
        self.reader.skip_rest(header, width, true)
    }

    /// Require that every entry of the map has been consumed
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedLabel` naming the first label left over
    pub fn finish(&mut self) -> Result<(), PasskeyError> {
        match self.peek_label()? {
            None => Ok(()),
            found => Err(PasskeyError::UnexpectedLabel {
                expected: None,
                found,
            }),
        }
    }

    /// Bytes of the input after the current position
    pub fn bytes_remaining(&mut self) -> usize {
        self.reader.bytes_remaining()
    }

    fn peek_label(&mut self) -> Result<Option<i64>, PasskeyError> {
        if self.peeked_label.is_none() && self.remaining_keys > 0 {
            let label = self.read_int()?;
            if let Some(previous) = self.last_label {
                if canonical_cmp(previous, label) != Ordering::Less {
                    return Err(PasskeyError::MalformedCbor(format!(
                        "label {label} is duplicated or out of canonical order after {previous}"
                    )));
                }
            }
            self.last_label = Some(label);
            self.remaining_keys -= 1;
            self.peeked_label = Some(label);
        }
        Ok(self.peeked_label)
    }

    fn read_value_header(&mut self) -> Result<Header, PasskeyError> {
        let (header, width) = self.reader.read_header()?;
        if matches!(header, Header::Bytes(None) | Header::Text(None)) {
            return Err(PasskeyError::MalformedCbor(
                "indefinite length string in canonical CBOR".to_string(),
            ));
        }
        if !is_minimally_encoded(&header, width) {
            return Err(PasskeyError::MalformedCbor(
                "non-minimal encoding in canonical CBOR".to_string(),
            ));
        }
        Ok(header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_and_optional_labels() {
        // {1: 2, 3: -7, -1: 1}
        let input = [0xa3, 0x01, 0x02, 0x03, 0x26, 0x20, 0x01];
        let mut cursor = CanonicalCursor::new(&input).unwrap();

        cursor.read_required_label(1).unwrap();
        assert_eq!(cursor.read_int().unwrap(), 2);
        cursor.read_required_label(3).unwrap();
        assert_eq!(cursor.read_int().unwrap(), -7);

        // Label -1 is peeked but stays available
        assert!(!cursor.try_read_optional_label(4).unwrap());
        assert!(cursor.try_read_optional_label(-1).unwrap());
        assert_eq!(cursor.read_int().unwrap(), 1);

        assert!(!cursor.try_read_optional_label(-4).unwrap());
        cursor.finish().unwrap();
        assert_eq!(cursor.bytes_remaining(), 0);
    }

    #[test]
    fn test_missing_required_label() {
        let input = [0xa1, 0x01, 0x02];
        let mut cursor = CanonicalCursor::new(&input).unwrap();
        assert_eq!(
            cursor.read_required_label(3),
            Err(PasskeyError::UnexpectedLabel {
                expected: Some(3),
                found: Some(1)
            })
        );

        cursor.read_required_label(1).unwrap();
        cursor.read_int().unwrap();
        assert_eq!(
            cursor.read_required_label(3),
            Err(PasskeyError::UnexpectedLabel {
                expected: Some(3),
                found: None
            })
        );
    }

    #[test]
    fn test_indefinite_map_is_rejected() {
        let input = [0xbf, 0x01, 0x02, 0xff];
        assert!(matches!(
            CanonicalCursor::new(&input),
            Err(PasskeyError::MalformedCbor(_))
        ));
    }

    #[test]
    fn test_out_of_order_and_duplicate_labels() {
        // {3: 0, 1: 0}
        let input = [0xa2, 0x03, 0x00, 0x01, 0x00];
        let mut cursor = CanonicalCursor::new(&input).unwrap();
        cursor.read_required_label(3).unwrap();
        cursor.read_int().unwrap();
        assert!(matches!(
            cursor.try_read_optional_label(1),
            Err(PasskeyError::MalformedCbor(_))
        ));

        // {-1: 0, -1: 0}
        let input = [0xa2, 0x20, 0x00, 0x20, 0x00];
        let mut cursor = CanonicalCursor::new(&input).unwrap();
        cursor.read_required_label(-1).unwrap();
        cursor.read_int().unwrap();
        assert!(matches!(
            cursor.read_required_label(-1),
            Err(PasskeyError::MalformedCbor(_))
        ));
    }

    #[test]
    fn test_non_minimal_encoding_is_rejected() {
        // Label 1 encoded in two bytes
        let input = [0xa1, 0x18, 0x01, 0x02];
        let mut cursor = CanonicalCursor::new(&input).unwrap();
        assert!(cursor.read_required_label(1).is_err());

        // Value 2 encoded in two bytes
        let input = [0xa1, 0x01, 0x18, 0x02];
        let mut cursor = CanonicalCursor::new(&input).unwrap();
        cursor.read_required_label(1).unwrap();
        assert!(cursor.read_int().is_err());
    }

    #[test]
    fn test_leftover_entries() {
        let input = [0xa2, 0x01, 0x02, 0x02, 0x40];
        let mut cursor = CanonicalCursor::new(&input).unwrap();
        cursor.read_required_label(1).unwrap();
        cursor.read_int().unwrap();
        assert_eq!(
            cursor.finish(),
            Err(PasskeyError::UnexpectedLabel {
                expected: None,
                found: Some(2)
            })
        );
    }

    #[test]
    fn test_canonical_order() {
        let mut labels = vec![-3, 24, 1, -1, 3, -25, -2, 0];
        labels.sort_by(|a, b| canonical_cmp(*a, *b));
        assert_eq!(labels, vec![0, 1, 3, -1, -2, -3, 24, -25]);
    }

    #[test]
    fn test_skip_rejects_indefinite_nested_items() {
        // {4: [_ 1]}
        let input = [0xa1, 0x04, 0x9f, 0x01, 0xff];
        let mut cursor = CanonicalCursor::new(&input).unwrap();
        assert!(cursor.try_read_optional_label(4).unwrap());
        assert!(cursor.skip_value().is_err());
    }
}
