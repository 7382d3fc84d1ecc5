//! Byte-level codec shared by instruction payloads and account records.
//!
//! The marketplace program speaks the Anchor/Borsh convention:
//!
//! ```text
//! instruction data  = SHA-256("global:"  + name)[..8] || args...
//! account record    = SHA-256("account:" + Name)[..8] || fields...
//! event payload     = SHA-256("event:"   + Name)[..8] || fields...
//!
//! uN / i64          little-endian, fixed width
//! bool              1 byte, 0 or 1
//! identity          32 raw bytes
//! string            u32 LE byte length || UTF-8 bytes
//! Option<T>         1 byte tag (0 = None, 1 = Some) || T
//! ```

use sha2::{Digest, Sha256};

use crate::address::Pubkey;
use crate::error::CoreError;

/// Length of every instruction, account, and event discriminator.
pub const DISCRIMINATOR_LEN: usize = 8;

/// Instruction discriminator: first 8 bytes of `SHA-256("global:" + name)`.
pub fn instruction_discriminator(name: &str) -> Result<[u8; 8], CoreError> {
    if name.is_empty() {
        return Err(CoreError::InvalidDiscriminatorInput);
    }
    Ok(namespaced_hash("global", name))
}

/// Account discriminator: first 8 bytes of `SHA-256("account:" + name)`.
pub fn account_discriminator(name: &str) -> [u8; 8] {
    namespaced_hash("account", name)
}

/// Event discriminator: first 8 bytes of `SHA-256("event:" + name)`.
pub fn event_discriminator(name: &str) -> [u8; 8] {
    namespaced_hash("event", name)
}

fn namespaced_hash(namespace: &str, name: &str) -> [u8; 8] {
    let digest = Sha256::new()
        .chain_update(namespace.as_bytes())
        .chain_update(b":")
        .chain_update(name.as_bytes())
        .finalize();

    let mut out = [0u8; DISCRIMINATOR_LEN];
    out.copy_from_slice(&digest[..DISCRIMINATOR_LEN]);
    out
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Declared width of an unsigned integer argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UintWidth {
    U8,
    U16,
    U32,
    U64,
    U128,
}

impl UintWidth {
    pub const fn byte_len(self) -> usize {
        match self {
            UintWidth::U8 => 1,
            UintWidth::U16 => 2,
            UintWidth::U32 => 4,
            UintWidth::U64 => 8,
            UintWidth::U128 => 16,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            UintWidth::U8 => "u8",
            UintWidth::U16 => "u16",
            UintWidth::U32 => "u32",
            UintWidth::U64 => "u64",
            UintWidth::U128 => "u128",
        }
    }

    pub const fn max(self) -> u128 {
        match self {
            UintWidth::U8 => u8::MAX as u128,
            UintWidth::U16 => u16::MAX as u128,
            UintWidth::U32 => u32::MAX as u128,
            UintWidth::U64 => u64::MAX as u128,
            UintWidth::U128 => u128::MAX,
        }
    }
}

/// One typed instruction argument.
///
/// Unsigned integers carry their value separately from their declared
/// width so that an out-of-range value is caught at encode time instead of
/// being silently truncated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    Uint(UintWidth, u128),
    I64(i64),
    Bool(bool),
    Pubkey(Pubkey),
    Str(String),
    Option(Option<Box<Arg>>),
}

impl Arg {
    pub fn u16(value: impl Into<u128>) -> Self {
        Arg::Uint(UintWidth::U16, value.into())
    }

    pub fn u64(value: impl Into<u128>) -> Self {
        Arg::Uint(UintWidth::U64, value.into())
    }

    pub fn string(value: impl Into<String>) -> Self {
        Arg::Str(value.into())
    }
}

/// Encode a complete instruction payload: discriminator followed by `args`
/// in declaration order.
pub fn encode_instruction(name: &str, args: &[Arg]) -> Result<Vec<u8>, CoreError> {
    let discriminator = instruction_discriminator(name)?;

    let mut data = Vec::with_capacity(DISCRIMINATOR_LEN + 32 * args.len());
    data.extend_from_slice(&discriminator);
    for arg in args {
        encode_arg(&mut data, arg)?;
    }

    Ok(data)
}

/// Append one argument to `buf`.
pub fn encode_arg(buf: &mut Vec<u8>, arg: &Arg) -> Result<(), CoreError> {
    match arg {
        Arg::Uint(width, value) => {
            if *value > width.max() {
                return Err(CoreError::EncodingOverflow {
                    value: *value,
                    width: width.name(),
                });
            }
            // Little-endian: the low `byte_len` bytes of the u128.
            buf.extend_from_slice(&value.to_le_bytes()[..width.byte_len()]);
        }
        Arg::I64(value) => buf.extend_from_slice(&value.to_le_bytes()),
        Arg::Bool(value) => buf.push(u8::from(*value)),
        Arg::Pubkey(key) => buf.extend_from_slice(key.as_ref()),
        Arg::Str(value) => write_string(buf, value)?,
        Arg::Option(None) => buf.push(0),
        Arg::Option(Some(inner)) => {
            buf.push(1);
            encode_arg(buf, inner)?;
        }
    }
    Ok(())
}

/// Append a length-prefixed UTF-8 string.
pub fn write_string(buf: &mut Vec<u8>, value: &str) -> Result<(), CoreError> {
    let len = u32::try_from(value.len()).map_err(|_| CoreError::EncodingOverflow {
        value: value.len() as u128,
        width: "u32 length prefix",
    })?;
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(value.as_bytes());
    Ok(())
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Bounds-checked cursor over a byte buffer.
///
/// Every read checks the remaining length first and fails with
/// [`CoreError::TruncatedAccountData`] rather than reading out of bounds.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], CoreError> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(CoreError::TruncatedAccountData {
                needed: self.offset.saturating_add(len),
                actual: self.data.len(),
            })?;
        let out = &self.data[self.offset..end];
        self.offset = end;
        Ok(out)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CoreError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, CoreError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, CoreError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, CoreError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, CoreError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64, CoreError> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    pub fn read_bool(&mut self) -> Result<bool, CoreError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CoreError::InvalidFieldEncoding(format!(
                "bool byte must be 0 or 1, got {other}"
            ))),
        }
    }

    pub fn read_pubkey(&mut self) -> Result<Pubkey, CoreError> {
        Ok(Pubkey::new_from_array(self.read_array()?))
    }

    /// Read a u32 length prefix, then exactly that many UTF-8 bytes.
    pub fn read_string(&mut self) -> Result<String, CoreError> {
        let len = self.read_u32()? as usize;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| CoreError::InvalidFieldEncoding(format!("invalid utf-8: {e}")))
    }

    /// Read the 8-byte prefix and compare it against `expected`.
    pub fn expect_discriminator(
        &mut self,
        expected: &[u8; DISCRIMINATOR_LEN],
        record: &'static str,
    ) -> Result<(), CoreError> {
        if self.read_array::<DISCRIMINATOR_LEN>()? != *expected {
            return Err(CoreError::AccountDiscriminatorMismatch { record });
        }
        Ok(())
    }

    /// Fail unless every byte has been consumed.
    pub fn finish(&self) -> Result<(), CoreError> {
        if self.remaining() != 0 {
            return Err(CoreError::InvalidFieldEncoding(format!(
                "{} trailing bytes",
                self.remaining()
            )));
        }
        Ok(())
    }
}

/// Fail with [`CoreError::TruncatedAccountData`] unless `data` holds at
/// least `min_len` bytes.
pub fn ensure_min_len(data: &[u8], min_len: usize) -> Result<(), CoreError> {
    if data.len() < min_len {
        return Err(CoreError::TruncatedAccountData {
            needed: min_len,
            actual: data.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_discriminator_golden() {
        assert_eq!(
            instruction_discriminator("initialize").unwrap(),
            [0xaf, 0xaf, 0x6d, 0x1f, 0x0d, 0x98, 0x9b, 0xed]
        );
    }

    #[test]
    fn account_discriminator_golden() {
        assert_eq!(hex::encode(account_discriminator("Component")), "b59670b9bc05caef");
        assert_eq!(hex::encode(account_discriminator("Marketplace")), "46de293e4e0320ae");
    }

    #[test]
    fn empty_instruction_name_fails() {
        assert!(matches!(
            instruction_discriminator(""),
            Err(CoreError::InvalidDiscriminatorInput)
        ));
        assert!(encode_instruction("", &[]).is_err());
    }

    #[test]
    fn u16_encodes_little_endian() {
        let data = encode_instruction("initialize", &[Arg::u16(250u16)]).unwrap();
        assert_eq!(data.len(), 10);
        assert_eq!(&data[8..], &[0xfa, 0x00]);
    }

    #[test]
    fn uint_overflow_is_rejected() {
        let err = encode_instruction("initialize", &[Arg::u16(70_000u32)]).unwrap_err();
        assert!(matches!(
            err,
            CoreError::EncodingOverflow { value: 70_000, width: "u16" }
        ));
    }

    #[test]
    fn uint_at_width_max_is_accepted() {
        let mut buf = Vec::new();
        encode_arg(&mut buf, &Arg::Uint(UintWidth::U8, 255)).unwrap();
        assert_eq!(buf, vec![0xff]);
    }

    #[test]
    fn string_is_length_prefixed() {
        let mut buf = Vec::new();
        encode_arg(&mut buf, &Arg::string("abc")).unwrap();
        assert_eq!(buf, vec![3, 0, 0, 0, b'a', b'b', b'c']);
    }

    #[test]
    fn option_tags() {
        let mut buf = Vec::new();
        encode_arg(&mut buf, &Arg::Option(None)).unwrap();
        encode_arg(&mut buf, &Arg::Option(Some(Box::new(Arg::Bool(true))))).unwrap();
        assert_eq!(buf, vec![0, 1, 1]);
    }

    #[test]
    fn reader_reads_fields_in_order() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&7u16.to_le_bytes());
        write_string(&mut buf, "hi").unwrap();
        buf.extend_from_slice(&(-5i64).to_le_bytes());
        buf.push(1);

        let mut reader = Reader::new(&buf);
        assert_eq!(reader.read_u16().unwrap(), 7);
        assert_eq!(reader.read_string().unwrap(), "hi");
        assert_eq!(reader.read_i64().unwrap(), -5);
        assert!(reader.read_bool().unwrap());
        assert!(reader.finish().is_ok());
    }

    #[test]
    fn reader_rejects_oversized_string_length() {
        // Length prefix claims 1000 bytes but only 2 follow.
        let mut buf = 1000u32.to_le_bytes().to_vec();
        buf.extend_from_slice(b"hi");
        let err = Reader::new(&buf).read_string().unwrap_err();
        assert!(matches!(
            err,
            CoreError::TruncatedAccountData { needed: 1004, actual: 6 }
        ));
    }

    #[test]
    fn reader_never_reads_past_end() {
        let mut reader = Reader::new(&[1, 2, 3]);
        assert!(reader.read_u64().is_err());
        // A failed read does not advance the cursor.
        assert_eq!(reader.offset(), 0);
        assert_eq!(reader.read_u16().unwrap(), 0x0201);
    }

    #[test]
    fn reader_rejects_bad_bool() {
        assert!(Reader::new(&[2]).read_bool().is_err());
    }

    #[test]
    fn ensure_min_len_reports_sizes() {
        let err = ensure_min_len(&[0u8; 10], 58).unwrap_err();
        assert!(matches!(
            err,
            CoreError::TruncatedAccountData { needed: 58, actual: 10 }
        ));
    }
}
