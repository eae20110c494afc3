//! Protobuf framing scanner.
//!
//! Walks the top-level fields of an encoded message without a schema. prost
//! reports every failure as one opaque `DecodeError`; running this scanner
//! first lets the codec tell a stream cut off mid-field apart from one whose
//! bytes are simply wrong.

use prost::Message;

use crate::error::CodecError;

/// Longest legal varint encoding of a `u64`.
const MAX_VARINT_LEN: usize = 10;

/// Highest field number protobuf allows (2^29 - 1).
const MAX_FIELD_NUMBER: u64 = (1 << 29) - 1;

/// Protobuf wire types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    /// 0: base-128 varint.
    Varint,
    /// 1: eight little-endian bytes.
    Fixed64,
    /// 2: varint length, then that many bytes.
    LengthDelimited,
    /// 3: deprecated group start.
    StartGroup,
    /// 4: deprecated group end.
    EndGroup,
    /// 5: four little-endian bytes.
    Fixed32,
}

impl WireType {
    fn from_bits(bits: u64) -> Option<Self> {
        match bits {
            0 => Some(WireType::Varint),
            1 => Some(WireType::Fixed64),
            2 => Some(WireType::LengthDelimited),
            3 => Some(WireType::StartGroup),
            4 => Some(WireType::EndGroup),
            5 => Some(WireType::Fixed32),
            _ => None,
        }
    }
}

/// One top-level field as located by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpan {
    /// Field number from the key.
    pub number: u32,
    /// Wire type from the key.
    pub wire_type: WireType,
    /// Offset of the field key.
    pub offset: usize,
    /// Offset and length of the value bytes (after any length prefix).
    pub value_offset: usize,
    /// Zero for group markers.
    pub value_len: usize,
}

/// Bounds-checked cursor over an encoded message.
///
/// Never panics on malformed input.
#[derive(Debug)]
pub struct WireScanner<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> WireScanner<'a> {
    /// Scan `data` from its first byte.
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Offset of the next unread byte.
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left after [`WireScanner::position`].
    pub const fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Read the next field, or `None` at a clean end of input.
    pub fn next_field(&mut self) -> Result<Option<FieldSpan>, CodecError> {
        if self.remaining() == 0 {
            return Ok(None);
        }
        let offset = self.pos;
        let key = self.read_varint(offset)?;
        let number = key >> 3;
        if number == 0 || number > MAX_FIELD_NUMBER {
            return Err(CodecError::Malformed(format!(
                "invalid field number {} at offset {}",
                number, offset
            )));
        }
        let wire_type = WireType::from_bits(key & 0x7).ok_or_else(|| {
            CodecError::Malformed(format!(
                "invalid wire type {} for field {} at offset {}",
                key & 0x7,
                number,
                offset
            ))
        })?;

        let (value_offset, value_len) = match wire_type {
            WireType::Varint => {
                let start = self.pos;
                self.read_varint(offset)?;
                (start, self.pos - start)
            }
            WireType::Fixed64 => (self.pos, self.take(offset, 8)?),
            WireType::Fixed32 => (self.pos, self.take(offset, 4)?),
            WireType::LengthDelimited => {
                let len = self.read_varint(offset)?;
                let len = usize::try_from(len).map_err(|_| {
                    CodecError::Malformed(format!("length {} overflows at offset {}", len, offset))
                })?;
                (self.pos, self.take(offset, len)?)
            }
            // Group markers carry no payload; the grouped fields follow as
            // ordinary fields and are scanned in turn.
            WireType::StartGroup | WireType::EndGroup => (self.pos, 0),
        };

        Ok(Some(FieldSpan {
            // `number` is bounded by MAX_FIELD_NUMBER above.
            number: number as u32,
            wire_type,
            offset,
            value_offset,
            value_len,
        }))
    }

    fn read_varint(&mut self, field_offset: usize) -> Result<u64, CodecError> {
        let mut value = 0u64;
        for i in 0..MAX_VARINT_LEN {
            let Some(&byte) = self.data.get(self.pos) else {
                return Err(CodecError::Truncated {
                    offset: field_offset,
                    needed: 1,
                });
            };
            self.pos += 1;
            value |= u64::from(byte & 0x7f) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(CodecError::Malformed(format!(
            "varint longer than {} bytes at offset {}",
            MAX_VARINT_LEN, field_offset
        )))
    }

    fn take(&mut self, field_offset: usize, len: usize) -> Result<usize, CodecError> {
        let available = self.remaining();
        if len > available {
            return Err(CodecError::Truncated {
                offset: field_offset,
                needed: len - available,
            });
        }
        self.pos += len;
        Ok(len)
    }
}

/// Scan every top-level field of `data`.
pub fn scan(data: &[u8]) -> Result<Vec<FieldSpan>, CodecError> {
    let mut scanner = WireScanner::new(data);
    let mut fields = Vec::new();
    while let Some(field) = scanner.next_field()? {
        fields.push(field);
    }
    Ok(fields)
}

/// Check framing, then decode `data` as `M`.
///
/// Unknown fields are skipped by prost. Anything prost still rejects after a
/// clean scan has a wire type that contradicts the schema.
pub fn decode_message<M: Message + Default>(data: &[u8]) -> Result<M, CodecError> {
    scan(data)?;
    M::decode(data).map_err(CodecError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::proto::{DetailsResponse, DocV2};

    fn sample() -> Vec<u8> {
        DocV2 {
            docid: Some("com.example.app".into()),
            title: Some("Example".into()),
            ..Default::default()
        }
        .encode_to_vec()
    }

    #[test]
    fn scans_fields_in_order() {
        let bytes = sample();
        let fields = scan(&bytes).unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].number, 1);
        assert_eq!(fields[0].wire_type, WireType::LengthDelimited);
        assert_eq!(fields[0].value_len, "com.example.app".len());
        assert_eq!(fields[1].number, 5);
    }

    #[test]
    fn cut_inside_body_is_truncated() {
        let bytes = sample();
        let cut = &bytes[..bytes.len() - 3];
        match scan(cut) {
            Err(CodecError::Truncated { offset, needed }) => {
                assert_eq!(needed, 3);
                assert!(offset > 0);
            }
            other => panic!("expected Truncated, got {:?}", other),
        }
    }

    #[test]
    fn cut_inside_varint_is_truncated() {
        // field 3, varint, value 300 (0xac 0x02) with the last byte missing
        let bytes = [0x18, 0xac];
        assert_eq!(
            scan(&bytes),
            Err(CodecError::Truncated {
                offset: 0,
                needed: 1
            })
        );
    }

    #[test]
    fn cut_inside_fixed_is_truncated() {
        // field 7, fixed64, only 5 of 8 bytes
        let bytes = [0x39, 1, 2, 3, 4, 5];
        assert_eq!(
            scan(&bytes),
            Err(CodecError::Truncated {
                offset: 0,
                needed: 3
            })
        );
    }

    #[test]
    fn reserved_wire_type_is_malformed() {
        // field 1, wire type 7
        assert!(matches!(scan(&[0x0f, 0x00]), Err(CodecError::Malformed(_))));
        // field 0
        assert!(matches!(scan(&[0x00, 0x00]), Err(CodecError::Malformed(_))));
    }

    #[test]
    fn schema_contradiction_is_malformed() {
        // DetailsResponse.docV2 (field 4) must be a message; send a varint.
        let bytes = [0x20, 0x01];
        assert!(scan(&bytes).is_ok());
        assert!(matches!(
            decode_message::<DetailsResponse>(&bytes),
            Err(CodecError::Malformed(_))
        ));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let mut bytes = sample();
        // field 999, varint 42
        bytes.extend_from_slice(&[0xb8, 0x3e, 0x2a]);
        let doc: DocV2 = decode_message(&bytes).unwrap();
        assert_eq!(doc.docid.as_deref(), Some("com.example.app"));
    }
}
