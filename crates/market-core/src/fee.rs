//! Purchase fee split, computed the way the program computes it.

use crate::error::CoreError;
use crate::instructions::MAX_FEE_BPS;

/// How a purchase price divides between the marketplace and the creator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeQuote {
    pub price: u64,
    pub fee_bps: u16,
    /// `price * fee_bps / 10000`, rounded down.
    pub marketplace_fee: u64,
    pub creator_amount: u64,
}

impl FeeQuote {
    pub fn compute(price: u64, fee_bps: u16) -> Result<Self, CoreError> {
        if fee_bps > MAX_FEE_BPS {
            return Err(CoreError::InvalidFee(fee_bps));
        }
        // u128 intermediate: price * 10000 cannot overflow it.
        let marketplace_fee = (price as u128 * fee_bps as u128 / MAX_FEE_BPS as u128) as u64;
        Ok(Self {
            price,
            fee_bps,
            marketplace_fee,
            creator_amount: price - marketplace_fee,
        })
    }
}
