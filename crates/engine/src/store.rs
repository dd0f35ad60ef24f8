//! Persistence seam: brand/campaign state, the spend ledger, and the
//! per-brand transaction that serializes every read-decide-write.

use rust_decimal::Decimal;
use thiserror::Error;

use adgate_core::{Brand, BrandId, Campaign, CampaignId, SpendRecord, TimeWindow};

pub mod memory;

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("unknown brand: {0}")]
    UnknownBrand(BrandId),

    #[error("unknown campaign: {0}")]
    UnknownCampaign(CampaignId),

    #[error("brand name already in use: {0}")]
    BrandNameTaken(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Whether a retry could plausibly succeed. Entity lookups and
    /// uniqueness violations are permanent; outages are not.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

// ── Staged writes ───────────────────────────────────────────────────

/// An activation flip staged against a transaction, applied on commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusWrite {
    pub campaign_id: CampaignId,
    pub active: bool,
}

// ── Traits ──────────────────────────────────────────────────────────

/// One brand's campaigns and ledger under mutual exclusion.
///
/// A transaction holds the brand lock for its whole lifetime, so two
/// concurrent reconciliations of the same brand cannot interleave their
/// read-decide-write sequences. Status writes are staged and applied
/// atomically by [`commit`](Self::commit); dropping the transaction
/// without committing discards them. Ledger appends take effect
/// immediately (the ledger is append-only and carries no derived state).
pub trait BrandTx {
    fn brand(&self) -> &Brand;

    fn campaigns(&self) -> &[Campaign];

    /// Sum of spend across all of the brand's campaigns inside `window`.
    fn spend_within(&self, window: &TimeWindow) -> Result<Decimal, StoreError>;

    fn append_spend(&mut self, record: SpendRecord);

    fn stage(&mut self, write: StatusWrite);

    /// Apply every staged write. Consumes the transaction and releases
    /// the brand lock.
    fn commit(self) -> Result<(), StoreError>;
}

/// Store of brands, campaigns, and spend records.
pub trait CampaignStore {
    type Tx: BrandTx;

    /// Ids of every known brand, in unspecified order.
    fn brand_ids(&self) -> Result<Vec<BrandId>, StoreError>;

    /// Owning brand of a campaign.
    fn brand_of(&self, campaign_id: CampaignId) -> Result<BrandId, StoreError>;

    /// Open a transaction over one brand, blocking until its lock is free.
    fn begin_brand(&self, brand_id: BrandId) -> Result<Self::Tx, StoreError>;
}
