use adspot_shared::PriceTable;
use async_trait::async_trait;
use std::error::Error;
use uuid::Uuid;

/// Read-only lookup of per-tier price tables.
///
/// Pricing data is owned by an external collaborator; the engine only
/// ever reads it.
#[async_trait]
pub trait PriceTableProvider: Send + Sync {
    async fn price_table(
        &self,
        tier_id: Uuid,
    ) -> Result<Option<PriceTable>, Box<dyn Error + Send + Sync>>;
}

/// Resolves the pricing tier assigned to a sellable entity.
///
/// The engine treats the entity as an opaque id; whether it is a category
/// or a product is the collaborator's concern.
#[async_trait]
pub trait TierResolver: Send + Sync {
    async fn resolve_tier(
        &self,
        entity_id: Uuid,
    ) -> Result<Option<Uuid>, Box<dyn Error + Send + Sync>>;
}
