pub mod descriptor;
pub mod encoding;
pub mod key_pattern;

pub use descriptor::IndexDescriptor;
pub use encoding::{decode_record_id, encode_entry, encode_key, EncodeError, RECORD_ID_LEN};
pub use key_pattern::{IndexDirection, KeyPart, KeyPattern};
