//! Moving troops between the common pool and champion pools.
//!
//! This is the one place pool capacity is enforced: a champion never
//! receives more troops than their command capacity from the allocator,
//! even though [`TroopPool::add_troops`](crate::TroopPool::add_troops)
//! itself would accept them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use warband_types::{ArmamentTier, ChampionId};

use crate::error::AllocationError;
use crate::registry::Registry;

/// A request to move `count` troops of one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TroopRequest {
    /// Tier to move.
    pub tier: ArmamentTier,
    /// How many.
    pub count: u32,
}

/// What an allocation actually moved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationReport {
    /// Troops moved per tier.
    pub moved: BTreeMap<ArmamentTier, u32>,
    /// Total moved.
    pub total: u64,
}

impl AllocationReport {
    fn record(&mut self, tier: ArmamentTier, count: u32) {
        if count == 0 {
            return;
        }
        let slot = self.moved.entry(tier).or_insert(0);
        *slot = slot.saturating_add(count);
        self.total = self.total.saturating_add(u64::from(count));
    }
}

/// Result of [`Registry::upgrade_armament`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmamentUpgrade {
    /// Troops promoted into the requested tier.
    pub upgraded: u32,
    /// Part of the request that found no troops to promote.
    pub overflow: u32,
}

impl Registry {
    /// Move troops from the common pool into a champion's pool, stopping at
    /// the champion's free capacity.
    pub fn allocate_to_champion(
        &mut self,
        champion: ChampionId,
        requests: &[TroopRequest],
    ) -> Result<AllocationReport, AllocationError> {
        let target = self
            .champion(champion)
            .ok_or(AllocationError::ChampionNotFound(champion))?;
        let mut free = target.free_capacity();
        if free == 0 {
            return Err(AllocationError::PoolFull {
                capacity: target.command_capacity(),
            });
        }

        let mut report = AllocationReport::default();
        for request in requests {
            let wanted = u64::from(request.count).min(free);
            let wanted = u32::try_from(wanted).unwrap_or(u32::MAX);
            let removal = self.common_pool_mut().remove_troops(wanted, request.tier);
            if removal.removed == 0 {
                continue;
            }
            if let Some(target) = self.champion_mut(champion) {
                target.pool_mut().add_troops(removal.removed, request.tier);
            }
            report.record(request.tier, removal.removed);
            free = free.saturating_sub(u64::from(removal.removed));
            if free == 0 {
                break;
            }
        }

        if report.total == 0 {
            return Err(AllocationError::NothingAvailable);
        }
        info!(champion = %champion, moved = report.total, "troops allocated to champion");
        Ok(report)
    }

    /// Fill a champion's pool from the common pool, strongest tiers first.
    pub fn fill_to_capacity(
        &mut self,
        champion: ChampionId,
    ) -> Result<AllocationReport, AllocationError> {
        let requests: Vec<TroopRequest> = ArmamentTier::BY_STRENGTH
            .iter()
            .map(|&tier| TroopRequest {
                tier,
                count: self.common_pool().count(tier),
            })
            .filter(|r| r.count > 0)
            .collect();
        self.allocate_to_champion(champion, &requests)
    }

    /// Move troops from a champion's pool back to the common pool.
    pub fn return_to_common(
        &mut self,
        champion: ChampionId,
        requests: &[TroopRequest],
    ) -> Result<AllocationReport, AllocationError> {
        let source = self
            .champion_mut(champion)
            .ok_or(AllocationError::ChampionNotFound(champion))?;
        let mut report = AllocationReport::default();
        for request in requests {
            let removal = source.pool_mut().remove_troops(request.count, request.tier);
            report.record(request.tier, removal.removed);
        }
        for (&tier, &count) in &report.moved {
            self.common_pool_mut().add_troops(count, tier);
        }
        if report.total == 0 {
            return Err(AllocationError::NothingAvailable);
        }
        debug!(champion = %champion, returned = report.total, "troops returned to common pool");
        Ok(report)
    }

    /// Empty a champion's pool into the common pool.
    pub fn clear_champion_pool(
        &mut self,
        champion: ChampionId,
    ) -> Result<AllocationReport, AllocationError> {
        let source = self
            .champion(champion)
            .ok_or(AllocationError::ChampionNotFound(champion))?;
        if source.pool().is_empty() {
            return Err(AllocationError::PoolEmpty);
        }
        let requests: Vec<TroopRequest> = source
            .pool()
            .group_detail()
            .into_iter()
            .map(|(tier, count)| TroopRequest { tier, count })
            .collect();
        self.return_to_common(champion, &requests)
    }

    /// Clear a champion's pool, then refill it strongest tiers first.
    pub fn optimize_champion_pool(
        &mut self,
        champion: ChampionId,
    ) -> Result<AllocationReport, AllocationError> {
        match self.clear_champion_pool(champion) {
            Ok(_) | Err(AllocationError::PoolEmpty) => {}
            Err(err) => return Err(err),
        }
        self.fill_to_capacity(champion)
    }

    /// Promote up to `count` common-pool troops from the tier below `tier`.
    pub fn upgrade_armament(
        &mut self,
        count: u32,
        tier: ArmamentTier,
    ) -> Result<ArmamentUpgrade, AllocationError> {
        let lower = tier.lower().ok_or(AllocationError::NoLowerTier { tier })?;
        let removal = self.common_pool_mut().remove_troops(count, lower);
        if removal.removed > 0 {
            self.common_pool_mut().add_troops(removal.removed, tier);
        }
        let upgrade = ArmamentUpgrade {
            upgraded: removal.removed,
            overflow: count.saturating_sub(removal.removed),
        };
        info!(from = %lower, to = %tier, upgraded = upgrade.upgraded,
            overflow = upgrade.overflow, "armament upgraded");
        Ok(upgrade)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::champion::{Champion, ChampionStats};
    use crate::lord::Lord;

    fn setup(might: i64) -> (Registry, ChampionId) {
        let mut reg = Registry::new(Lord::new("Aldric", 0, 100));
        reg.common_pool_mut().add_troops(20, ArmamentTier::Unarmed);
        reg.common_pool_mut().add_troops(4, ArmamentTier::Elite);
        reg.common_pool_mut().add_troops(3, ArmamentTier::Heavy);
        let champion = reg.add_champion(Champion::new(
            "Brakka",
            "north",
            ChampionStats {
                might,
                ..ChampionStats::default()
            },
        ));
        (reg, champion)
    }

    #[test]
    fn allocation_stops_at_capacity() {
        let (mut reg, champion) = setup(10);
        let report = reg
            .allocate_to_champion(
                champion,
                &[TroopRequest {
                    tier: ArmamentTier::Unarmed,
                    count: 15,
                }],
            )
            .unwrap();
        assert_eq!(report.total, 10);
        assert_eq!(reg.common_pool().count(ArmamentTier::Unarmed), 10);

        let err = reg
            .allocate_to_champion(
                champion,
                &[TroopRequest {
                    tier: ArmamentTier::Unarmed,
                    count: 1,
                }],
            )
            .unwrap_err();
        assert_eq!(err, AllocationError::PoolFull { capacity: 10 });
        assert_eq!(err.to_string(), "champion pool full: capacity 10");
    }

    #[test]
    fn fill_prefers_strongest_tiers() {
        let (mut reg, champion) = setup(8);
        reg.fill_to_capacity(champion).unwrap();
        let pool = reg.champion(champion).unwrap().pool();
        assert_eq!(pool.count(ArmamentTier::Elite), 4);
        assert_eq!(pool.count(ArmamentTier::Heavy), 3);
        assert_eq!(pool.count(ArmamentTier::Unarmed), 1);
        assert_eq!(reg.total_troops(), 27);
    }

    #[test]
    fn clear_and_optimize_round_through_common_pool() {
        let (mut reg, champion) = setup(5);
        reg.allocate_to_champion(
            champion,
            &[TroopRequest {
                tier: ArmamentTier::Unarmed,
                count: 5,
            }],
        )
        .unwrap();
        reg.optimize_champion_pool(champion).unwrap();
        let pool = reg.champion(champion).unwrap().pool();
        assert_eq!(pool.count(ArmamentTier::Elite), 4);
        assert_eq!(pool.count(ArmamentTier::Heavy), 1);
        assert_eq!(pool.count(ArmamentTier::Unarmed), 0);

        reg.clear_champion_pool(champion).unwrap();
        assert_eq!(
            reg.clear_champion_pool(champion),
            Err(AllocationError::PoolEmpty)
        );
        assert_eq!(reg.common_pool().total_count(), 27);
    }

    #[test]
    fn upgrade_reports_overflow() {
        let (mut reg, _) = setup(10);
        let upgrade = reg.upgrade_armament(25, ArmamentTier::Light).unwrap();
        assert_eq!(upgrade, ArmamentUpgrade { upgraded: 20, overflow: 5 });
        assert_eq!(reg.common_pool().count(ArmamentTier::Light), 20);
        assert!(matches!(
            reg.upgrade_armament(1, ArmamentTier::Unarmed),
            Err(AllocationError::NoLowerTier { .. })
        ));
    }

    #[test]
    fn unknown_champion_is_not_found() {
        let (mut reg, _) = setup(10);
        let err = reg.fill_to_capacity(ChampionId::new()).unwrap_err();
        assert_eq!(err.kind(), warband_types::FailureKind::NotFound);
    }
}
