//! Account records owned by the marketplace program.
//!
//! Each record is an 8-byte account discriminator followed by its fields in
//! declaration order. Accounts are allocated with padding, so bytes after
//! the last field are ignored.

use crate::address::Pubkey;
use crate::codec::{account_discriminator, ensure_min_len, write_string, Reader, DISCRIMINATOR_LEN};
use crate::error::CoreError;

/// Byte offset of `Component::creator`, for memcmp filters.
pub const COMPONENT_CREATOR_OFFSET: usize = DISCRIMINATOR_LEN;

/// Allocation size of component accounts created by the deployed program.
///
/// Only useful as a `DataSize` scan filter; decoding never assumes it.
pub const COMPONENT_OBSERVED_ACCOUNT_SIZE: u64 = 293;

/// The marketplace singleton.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marketplace {
    pub authority: Pubkey,
    /// Basis points, 250 = 2.5%.
    pub fee_percentage: u16,
    pub total_volume: u64,
    pub total_components: u64,
}

impl Marketplace {
    pub const NAME: &'static str = "Marketplace";
    /// discriminator + authority + fee + volume + count
    pub const MIN_LEN: usize = DISCRIMINATOR_LEN + 32 + 2 + 8 + 8;

    pub fn discriminator() -> [u8; DISCRIMINATOR_LEN] {
        account_discriminator(Self::NAME)
    }

    pub fn decode(data: &[u8]) -> Result<Self, CoreError> {
        ensure_min_len(data, Self::MIN_LEN)?;
        let mut r = Reader::new(data);
        r.expect_discriminator(&Self::discriminator(), Self::NAME)?;

        Ok(Self {
            authority: r.read_pubkey()?,
            fee_percentage: r.read_u16()?,
            total_volume: r.read_u64()?,
            total_components: r.read_u64()?,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::MIN_LEN);
        buf.extend_from_slice(&Self::discriminator());
        buf.extend_from_slice(self.authority.as_ref());
        buf.extend_from_slice(&self.fee_percentage.to_le_bytes());
        buf.extend_from_slice(&self.total_volume.to_le_bytes());
        buf.extend_from_slice(&self.total_components.to_le_bytes());
        buf
    }
}

/// A component listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub creator: Pubkey,
    pub component_id: String,
    /// Price in the smallest unit of the marketplace token.
    pub price: u64,
    pub metadata_uri: String,
    pub is_active: bool,
    pub total_sales: u64,
    /// Unix timestamp (seconds).
    pub created_at: i64,
}

impl Component {
    pub const NAME: &'static str = "Component";
    /// Fixed fields with both strings empty.
    pub const MIN_LEN: usize = DISCRIMINATOR_LEN + 32 + 4 + 8 + 4 + 1 + 8 + 8;

    pub fn discriminator() -> [u8; DISCRIMINATOR_LEN] {
        account_discriminator(Self::NAME)
    }

    pub fn decode(data: &[u8]) -> Result<Self, CoreError> {
        ensure_min_len(data, Self::MIN_LEN)?;
        let mut r = Reader::new(data);
        r.expect_discriminator(&Self::discriminator(), Self::NAME)?;

        Ok(Self {
            creator: r.read_pubkey()?,
            component_id: r.read_string()?,
            price: r.read_u64()?,
            metadata_uri: r.read_string()?,
            is_active: r.read_bool()?,
            total_sales: r.read_u64()?,
            created_at: r.read_i64()?,
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>, CoreError> {
        let mut buf = Vec::with_capacity(
            Self::MIN_LEN + self.component_id.len() + self.metadata_uri.len(),
        );
        buf.extend_from_slice(&Self::discriminator());
        buf.extend_from_slice(self.creator.as_ref());
        write_string(&mut buf, &self.component_id)?;
        buf.extend_from_slice(&self.price.to_le_bytes());
        write_string(&mut buf, &self.metadata_uri)?;
        buf.push(u8::from(self.is_active));
        buf.extend_from_slice(&self.total_sales.to_le_bytes());
        buf.extend_from_slice(&self.created_at.to_le_bytes());
        Ok(buf)
    }
}

/// Receipt of one buyer's purchase of one component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Purchase {
    pub buyer: Pubkey,
    pub component_id: String,
    pub price: u64,
    pub purchased_at: i64,
}

impl Purchase {
    pub const NAME: &'static str = "Purchase";
    pub const MIN_LEN: usize = DISCRIMINATOR_LEN + 32 + 4 + 8 + 8;

    pub fn discriminator() -> [u8; DISCRIMINATOR_LEN] {
        account_discriminator(Self::NAME)
    }

    pub fn decode(data: &[u8]) -> Result<Self, CoreError> {
        ensure_min_len(data, Self::MIN_LEN)?;
        let mut r = Reader::new(data);
        r.expect_discriminator(&Self::discriminator(), Self::NAME)?;

        Ok(Self {
            buyer: r.read_pubkey()?,
            component_id: r.read_string()?,
            price: r.read_u64()?,
            purchased_at: r.read_i64()?,
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>, CoreError> {
        let mut buf = Vec::with_capacity(Self::MIN_LEN + self.component_id.len());
        buf.extend_from_slice(&Self::discriminator());
        buf.extend_from_slice(self.buyer.as_ref());
        write_string(&mut buf, &self.component_id)?;
        buf.extend_from_slice(&self.price.to_le_bytes());
        buf.extend_from_slice(&self.purchased_at.to_le_bytes());
        Ok(buf)
    }
}
