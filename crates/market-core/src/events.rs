//! Program events emitted into transaction logs.
//!
//! The program logs each event as `Program data: <base64>` where the decoded
//! bytes are an event discriminator followed by the Borsh-encoded fields.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::address::Pubkey;
use crate::codec::{event_discriminator, write_string, Reader, DISCRIMINATOR_LEN};
use crate::error::CoreError;

const PROGRAM_DATA_PREFIX: &str = "Program data: ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketplaceEvent {
    ComponentListed {
        component_id: String,
        creator: Pubkey,
        price: u64,
    },
    ComponentPurchased {
        component_id: String,
        buyer: Pubkey,
        price: u64,
    },
}

impl MarketplaceEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ComponentListed { .. } => "ComponentListed",
            Self::ComponentPurchased { .. } => "ComponentPurchased",
        }
    }

    /// Decode one event payload. Returns `Ok(None)` for events this crate
    /// does not model.
    pub fn decode(data: &[u8]) -> Result<Option<Self>, CoreError> {
        let mut r = Reader::new(data);
        let tag = r.read_array::<DISCRIMINATOR_LEN>()?;

        let event = if tag == event_discriminator("ComponentListed") {
            Self::ComponentListed {
                component_id: r.read_string()?,
                creator: r.read_pubkey()?,
                price: r.read_u64()?,
            }
        } else if tag == event_discriminator("ComponentPurchased") {
            Self::ComponentPurchased {
                component_id: r.read_string()?,
                buyer: r.read_pubkey()?,
                price: r.read_u64()?,
            }
        } else {
            return Ok(None);
        };
        Ok(Some(event))
    }

    /// Encode as the program would log it (without the log prefix).
    pub fn encode(&self) -> Result<Vec<u8>, CoreError> {
        let mut buf = event_discriminator(self.name()).to_vec();
        let (component_id, party, price) = match self {
            Self::ComponentListed {
                component_id,
                creator,
                price,
            } => (component_id, creator, price),
            Self::ComponentPurchased {
                component_id,
                buyer,
                price,
            } => (component_id, buyer, price),
        };
        write_string(&mut buf, component_id)?;
        buf.extend_from_slice(party.as_ref());
        buf.extend_from_slice(&price.to_le_bytes());
        Ok(buf)
    }

    /// The log line the program would emit for this event.
    pub fn to_log_line(&self) -> Result<String, CoreError> {
        Ok(format!("{PROGRAM_DATA_PREFIX}{}", STANDARD.encode(self.encode()?)))
    }
}

/// Pull every recognised event out of a transaction's log lines.
///
/// Lines that are not `Program data:` entries, are not valid base64, or
/// carry unknown events are skipped.
pub fn parse_events<S: AsRef<str>>(logs: &[S]) -> Vec<MarketplaceEvent> {
    logs.iter()
        .filter_map(|line| line.as_ref().strip_prefix(PROGRAM_DATA_PREFIX))
        .filter_map(|payload| STANDARD.decode(payload.trim()).ok())
        .filter_map(|bytes| match MarketplaceEvent::decode(&bytes) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(error = %e, "skipping undecodable event");
                None
            }
        })
        .collect()
}
