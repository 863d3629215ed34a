//! The marketplace: standing goods with weekly caps, and a ward shelf.
//!
//! Standing goods are registered rules data. Each has a unit price, a weekly
//! purchase cap, and an effect run once per purchase with the quantity
//! bought. The ward shelf is restocked from a [`WardFactory`] on every
//! refresh, each listing priced by a configurable function of the ward.
//!
//! Purchases debit the ledger before anything else changes, and a sold
//! listing keeps its slot with the ward taken out, so an id can never be
//! sold twice.

use std::collections::BTreeMap;
use std::fmt;

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use warband_entities::{Attributed, Ward, WardAttr};
use warband_ledger::LedgerError;
use warband_types::{FailureKind, ListingId, TargetRef, WardId};

use crate::config::MarketConfig;
use crate::factory::{WardFactory, WardRequest};
use crate::world::World;

/// Origin label stamped on wards generated for the shelf.
pub const SHELF_ORIGIN: &str = "black market";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by marketplace operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarketError {
    /// A purchase of zero items.
    #[error("quantity must be at least 1")]
    ZeroQuantity,

    /// No goods are registered under this name.
    #[error("unknown goods: {0}")]
    UnknownGoods(String),

    /// Goods with this name are already registered.
    #[error("goods already registered: {0}")]
    DuplicateGoods(String),

    /// The purchase would exceed the weekly cap.
    #[error("{goods} exceeds weekly cap, remaining {remaining}")]
    CapExceeded {
        /// Goods name.
        goods: String,
        /// Quantity requested.
        requested: u32,
        /// Quantity still purchasable this week.
        remaining: u32,
    },

    /// Not enough currency.
    #[error("insufficient currency: needs {required}, has {available}")]
    InsufficientFunds {
        /// Total price.
        required: u64,
        /// Currency on hand.
        available: u64,
    },

    /// No listing with this id is on the shelf.
    #[error("listing not found: {0}")]
    ListingNotFound(ListingId),

    /// The listing was already bought.
    #[error("listing already sold: {0}")]
    AlreadySold(ListingId),

    /// The ledger rejected the debit.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl MarketError {
    /// The failure class this error belongs to.
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::UnknownGoods(_) | Self::ListingNotFound(_) => FailureKind::NotFound,
            Self::CapExceeded { .. } | Self::InsufficientFunds { .. } => {
                FailureKind::InsufficientResource
            }
            Self::ZeroQuantity => FailureKind::PreconditionFailed,
            Self::DuplicateGoods(_) | Self::AlreadySold(_) => FailureKind::InvalidState,
            Self::Ledger(e) => e.kind(),
        }
    }
}

// ---------------------------------------------------------------------------
// Goods
// ---------------------------------------------------------------------------

/// Applies a purchase of `quantity` units and describes what happened.
pub type GoodsEffect = Box<dyn Fn(&mut World, u32, Option<TargetRef>) -> String>;

/// Prices a ward on the shelf.
pub type WardPricing = Box<dyn Fn(&Ward) -> u64>;

/// Price of a shelf ward when no pricing function is configured:
/// 50 plus 5 per point of appeal.
pub fn default_ward_price(ward: &Ward) -> u64 {
    let appeal = u64::try_from(ward.get_attribute(WardAttr::Appeal)).unwrap_or(0);
    appeal.saturating_mul(5).saturating_add(50)
}

/// Standing goods with a weekly cap.
pub struct Goods {
    name: String,
    price: u64,
    weekly_cap: u32,
    effect: GoodsEffect,
}

impl Goods {
    /// Goods costing `price` per unit, at most `weekly_cap` units a week.
    pub fn new(
        name: impl Into<String>,
        price: u64,
        weekly_cap: u32,
        effect: impl Fn(&mut World, u32, Option<TargetRef>) -> String + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            price,
            weekly_cap,
            effect: Box::new(effect),
        }
    }

    /// Goods name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unit price.
    pub const fn price(&self) -> u64 {
        self.price
    }

    /// Units purchasable per week.
    pub const fn weekly_cap(&self) -> u32 {
        self.weekly_cap
    }
}

impl fmt::Debug for Goods {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Goods")
            .field("name", &self.name)
            .field("price", &self.price)
            .field("weekly_cap", &self.weekly_cap)
            .finish_non_exhaustive()
    }
}

/// A purchase-log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    /// Goods name, or the ward's name for shelf purchases.
    pub item: String,
    /// Units bought.
    pub quantity: u32,
    /// Currency paid.
    pub cost: u64,
    /// Optional target.
    pub target: Option<TargetRef>,
    /// Turn of the purchase.
    pub turn: u64,
    /// Human-readable description.
    pub message: String,
}

/// A ward offered on the shelf.
#[derive(Debug)]
pub struct WardListing {
    /// Listing identifier.
    pub id: ListingId,
    /// Ward name, kept after the sale.
    pub name: String,
    /// Asking price.
    pub price: u64,
    ward: Option<Ward>,
}

impl WardListing {
    /// Whether the ward has been bought.
    pub const fn is_sold(&self) -> bool {
        self.ward.is_none()
    }

    /// The ward on offer, until sold.
    pub const fn ward(&self) -> Option<&Ward> {
        self.ward.as_ref()
    }
}

// ---------------------------------------------------------------------------
// Market
// ---------------------------------------------------------------------------

/// Standing goods, weekly counters, the purchase log, and the ward shelf.
pub struct Market {
    settings: MarketConfig,
    goods: BTreeMap<String, Goods>,
    purchased: BTreeMap<String, u32>,
    log: Vec<Purchase>,
    shelf: Vec<WardListing>,
    pricing: WardPricing,
}

impl Market {
    /// An empty market using [`default_ward_price`].
    pub fn new(settings: MarketConfig) -> Self {
        Self {
            settings,
            goods: BTreeMap::new(),
            purchased: BTreeMap::new(),
            log: Vec::new(),
            shelf: Vec::new(),
            pricing: Box::new(default_ward_price),
        }
    }

    /// Replace the shelf pricing function. Existing listings keep their price.
    pub fn set_ward_pricing(&mut self, pricing: impl Fn(&Ward) -> u64 + 'static) {
        self.pricing = Box::new(pricing);
    }

    /// Register standing goods.
    pub fn register(&mut self, goods: Goods) -> Result<(), MarketError> {
        if self.goods.contains_key(goods.name()) {
            return Err(MarketError::DuplicateGoods(goods.name.clone()));
        }
        self.goods.insert(goods.name.clone(), goods);
        Ok(())
    }

    /// Registered goods, sorted by name.
    pub fn goods(&self) -> impl Iterator<Item = &Goods> {
        self.goods.values()
    }

    // -- standing goods ----------------------------------------------------

    /// Units of `name` bought this week.
    pub fn purchased_this_week(&self, name: &str) -> u32 {
        self.purchased.get(name).copied().unwrap_or(0)
    }

    /// Units of `name` still purchasable this week.
    pub fn remaining_quota(&self, name: &str) -> Option<u32> {
        self.goods
            .get(name)
            .map(|g| g.weekly_cap.saturating_sub(self.purchased_this_week(name)))
    }

    /// Buy `quantity` units of standing goods.
    ///
    /// Checks, in order: quantity, goods exist, weekly cap, funds. On
    /// success the ledger is debited, the effect runs, the weekly counter
    /// grows, and the purchase is logged.
    pub fn purchase(
        &mut self,
        world: &mut World,
        name: &str,
        quantity: u32,
        target: Option<TargetRef>,
    ) -> Result<Purchase, MarketError> {
        if quantity == 0 {
            return Err(MarketError::ZeroQuantity);
        }
        let goods = self
            .goods
            .get(name)
            .ok_or_else(|| MarketError::UnknownGoods(name.to_owned()))?;
        let already = self.purchased.get(name).copied().unwrap_or(0);
        let remaining = goods.weekly_cap.saturating_sub(already);
        if quantity > remaining {
            return Err(MarketError::CapExceeded {
                goods: name.to_owned(),
                requested: quantity,
                remaining,
            });
        }
        let cost = goods.price.saturating_mul(u64::from(quantity));
        let available = world.ledger.currency();
        if available < cost {
            return Err(MarketError::InsufficientFunds {
                required: cost,
                available,
            });
        }

        let turn = world.turn();
        world.ledger.debit(turn, cost, name)?;
        let message = (goods.effect)(world, quantity, target);
        self.purchased
            .insert(name.to_owned(), already.saturating_add(quantity));
        info!(goods = name, quantity, cost, "goods purchased");
        let purchase = Purchase {
            item: name.to_owned(),
            quantity,
            cost,
            target,
            turn,
            message,
        };
        self.log.push(purchase.clone());
        Ok(purchase)
    }

    // -- ward shelf --------------------------------------------------------

    /// Unsold listings.
    pub fn ward_shelf(&self) -> impl Iterator<Item = &WardListing> {
        self.shelf.iter().filter(|l| !l.is_sold())
    }

    /// Every listing from the last refresh, sold ones included.
    pub fn listings(&self) -> &[WardListing] {
        &self.shelf
    }

    /// Empty the shelf and restock it with a random number of new wards.
    pub fn refresh_shelf(&mut self, factory: &mut dyn WardFactory, rng: &mut dyn RngCore) {
        self.shelf.clear();
        let min = self.settings.ward_shelf_min;
        let max = self.settings.ward_shelf_max.max(min);
        let count = rng.random_range(min..=max);
        let request = WardRequest {
            origin: SHELF_ORIGIN.to_owned(),
        };
        for _ in 0..count {
            let ward = factory.create_ward(&request, rng);
            let price = (self.pricing)(&ward);
            debug!(ward = %ward.id(), price, "ward listed");
            self.shelf.push(WardListing {
                id: ListingId::new(),
                name: ward.name().to_owned(),
                price,
                ward: Some(ward),
            });
        }
        info!(listings = count, "ward shelf refreshed");
    }

    /// Buy a ward off the shelf and add it to the player's roster.
    pub fn purchase_ward(
        &mut self,
        world: &mut World,
        listing: ListingId,
    ) -> Result<WardId, MarketError> {
        let entry = self
            .shelf
            .iter_mut()
            .find(|l| l.id == listing)
            .ok_or(MarketError::ListingNotFound(listing))?;
        if entry.is_sold() {
            return Err(MarketError::AlreadySold(listing));
        }
        let available = world.ledger.currency();
        if available < entry.price {
            return Err(MarketError::InsufficientFunds {
                required: entry.price,
                available,
            });
        }

        let turn = world.turn();
        let reason = format!("ward {}", entry.name);
        world.ledger.debit(turn, entry.price, &reason)?;
        let Some(ward) = entry.ward.take() else {
            return Err(MarketError::AlreadySold(listing));
        };
        let ward_id = world.registry.add_ward(ward);
        let purchase = Purchase {
            item: entry.name.clone(),
            quantity: 1,
            cost: entry.price,
            target: Some(TargetRef::Ward(ward_id)),
            turn,
            message: format!("bought {} from the {SHELF_ORIGIN}", entry.name),
        };
        info!(listing = %listing, ward = %ward_id, price = entry.price, "ward purchased");
        self.log.push(purchase);
        Ok(ward_id)
    }

    // -- log and turn reset ------------------------------------------------

    /// Purchases made this turn.
    pub fn purchase_log(&self) -> &[Purchase] {
        &self.log
    }

    /// This turn's purchase messages.
    pub fn log_lines(&self) -> Vec<String> {
        self.log.iter().map(|p| p.message.clone()).collect()
    }

    /// Zero the weekly counters, clear the log, and restock the shelf.
    pub fn reset_turn(&mut self, factory: &mut dyn WardFactory, rng: &mut dyn RngCore) {
        self.purchased.clear();
        self.log.clear();
        self.refresh_shelf(factory, rng);
    }
}

impl fmt::Debug for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Market")
            .field("settings", &self.settings)
            .field("goods", &self.goods)
            .field("purchased", &self.purchased)
            .field("log", &self.log)
            .field("shelf", &self.shelf)
            .finish_non_exhaustive()
    }
}
