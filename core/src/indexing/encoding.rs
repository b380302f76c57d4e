use super::key_pattern::KeyPattern;
use crate::types::RecordId;
use crate::value::{IndexKey, Value};
use thiserror::Error;

/// Index entries are `encode_key(key) ++ record_id.to_bytes()`
pub const RECORD_ID_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("key has {actual} components but the key pattern has {expected}")]
    ArityMismatch { expected: usize, actual: usize },
    #[error("index entry of {0} bytes is too short to carry a record id")]
    EntryTooShort(usize),
}

// Type tags, ascending in Value collation order
const TAG_MIN_KEY: u8 = 0x01;
const TAG_NULL: u8 = 0x05;
const TAG_BOOL: u8 = 0x10;
const TAG_I64: u8 = 0x20;
const TAG_STRING: u8 = 0x30;
const TAG_BINARY: u8 = 0x40;
const TAG_MAX_KEY: u8 = 0xFE;

/// Encode a key into bytes whose lexicographic order matches the index order of `pattern`.
/// Every component is self-delimiting, so no encoded key is a prefix of another.
pub fn encode_key(key: &IndexKey, pattern: &KeyPattern) -> Result<Vec<u8>, EncodeError> {
    if key.len() != pattern.len() {
        return Err(EncodeError::ArityMismatch { expected: pattern.len(), actual: key.len() });
    }
    let mut out = Vec::new();
    for (value, keypart) in key.values().iter().zip(pattern.keyparts.iter()) {
        encode_component(value, keypart.direction.is_desc(), &mut out);
    }
    Ok(out)
}

pub fn encode_entry(key: &IndexKey, record_id: RecordId, pattern: &KeyPattern) -> Result<Vec<u8>, EncodeError> {
    let mut out = encode_key(key, pattern)?;
    out.extend_from_slice(&record_id.to_bytes());
    Ok(out)
}

/// Decode the record id from an index entry's suffix (last 8 bytes)
pub fn decode_record_id(entry: &[u8]) -> Result<RecordId, EncodeError> {
    if entry.len() < 1 + RECORD_ID_LEN {
        return Err(EncodeError::EntryTooShort(entry.len()));
    }
    let mut bytes = [0u8; RECORD_ID_LEN];
    bytes.copy_from_slice(&entry[entry.len() - RECORD_ID_LEN..]);
    Ok(RecordId::from_bytes(bytes))
}

fn encode_component(value: &Value, descending: bool, out: &mut Vec<u8>) {
    let start = out.len();
    match value {
        Value::MinKey => out.push(TAG_MIN_KEY),
        Value::Null => out.push(TAG_NULL),
        Value::MaxKey => out.push(TAG_MAX_KEY),
        Value::Bool(b) => {
            out.push(TAG_BOOL);
            out.push(*b as u8);
        }
        Value::I64(i) => {
            // Flip the sign bit so negatives sort below positives as unsigned big-endian
            out.push(TAG_I64);
            out.extend_from_slice(&((*i as u64) ^ (1 << 63)).to_be_bytes());
        }
        Value::String(s) => {
            out.push(if descending { !TAG_STRING } else { TAG_STRING });
            encode_variable(s.as_bytes(), descending, out);
            return;
        }
        Value::Binary(bytes) => {
            out.push(if descending { !TAG_BINARY } else { TAG_BINARY });
            encode_variable(bytes, descending, out);
            return;
        }
    }
    // Fixed-width components: DESC inverts every byte
    if descending {
        for b in &mut out[start..] {
            *b = !*b;
        }
    }
}

fn encode_variable(bytes: &[u8], descending: bool, out: &mut Vec<u8>) {
    if !descending {
        // ASC: [0x00 escaped as 0x00 0xFF][0x00 0x00]
        for &b in bytes {
            if b == 0x00 {
                out.push(0x00);
                out.push(0xFF);
            } else {
                out.push(b);
            }
        }
        out.push(0x00);
        out.push(0x00);
    } else {
        // DESC: [inv(bytes) with 0xFF escaped as 0xFF 0x00][0xFF 0xFF]
        for &b in bytes {
            let inv = 0xFFu8.wrapping_sub(b);
            if inv == 0xFF {
                out.push(0xFF);
                out.push(0x00);
            } else {
                out.push(inv);
            }
        }
        out.push(0xFF);
        out.push(0xFF);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexing::KeyPart;

    fn asc() -> KeyPattern { KeyPattern::new(vec![KeyPart::asc("a")]) }
    fn desc() -> KeyPattern { KeyPattern::new(vec![KeyPart::desc("a")]) }

    fn enc(v: impl Into<Value>, pattern: &KeyPattern) -> Vec<u8> { encode_key(&IndexKey::single(v), pattern).unwrap() }

    #[test]
    fn test_asc_preserves_value_order() {
        let values = vec![
            Value::MinKey,
            Value::Null,
            Value::Bool(false),
            Value::Bool(true),
            Value::I64(i64::MIN),
            Value::I64(-1),
            Value::I64(0),
            Value::I64(42),
            Value::String("".into()),
            Value::String("a".into()),
            Value::String("a\0".into()),
            Value::String("a\x01".into()),
            Value::String("ab".into()),
            Value::Binary(vec![0]),
            Value::MaxKey,
        ];
        let encoded: Vec<Vec<u8>> = values.iter().map(|v| enc(v.clone(), &asc())).collect();
        for pair in encoded.windows(2) {
            assert!(pair[0] < pair[1], "{:?} !< {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_desc_reverses_value_order() {
        assert!(enc("a", &desc()) > enc("b", &desc()));
        assert!(enc("a", &desc()) > enc("ab", &desc()));
        assert!(enc("", &desc()) > enc("\0", &desc()));
        assert!(enc(1, &desc()) > enc(2, &desc()));
        assert!(enc(Value::MinKey, &desc()) > enc(Value::MaxKey, &desc()));
        assert!(enc(true, &desc()) < enc(false, &desc()));
    }

    #[test]
    fn test_compound_key_orders_by_first_part_then_second() {
        let pattern = KeyPattern::new(vec![KeyPart::asc("year"), KeyPart::desc("name")]);
        let k = |y: i64, n: &str| encode_key(&IndexKey::new(vec![Value::I64(y), Value::from(n)]), &pattern).unwrap();
        assert!(k(2000, "z") < k(2001, "a"));
        assert!(k(2000, "b") < k(2000, "a"));
    }

    #[test]
    fn test_entry_round_trips_record_id() {
        let entry = encode_entry(&IndexKey::single("x"), RecordId::new(77), &asc()).unwrap();
        assert_eq!(decode_record_id(&entry).unwrap(), RecordId::new(77));
        assert_eq!(decode_record_id(&[1, 2, 3]), Err(EncodeError::EntryTooShort(3)));
    }

    #[test]
    fn test_arity_mismatch() {
        let err = encode_key(&IndexKey::new(vec![Value::I64(1), Value::I64(2)]), &asc()).unwrap_err();
        assert_eq!(err, EncodeError::ArityMismatch { expected: 1, actual: 2 });
    }
}
