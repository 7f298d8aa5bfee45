use serde::{Deserialize, Serialize};

/// A staking pool keyed to exactly one atom or one triple. Mutates on-chain
/// only — the cache bounds staleness with a short TTL and never writes to it
/// locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vault {
    pub id: String,
    pub total_shares: f64,
    pub share_price: f64,
    pub position_count: u32,
}

impl Vault {
    /// Total assets deposited in the vault, derived from shares and price.
    pub fn total_assets(&self) -> f64 {
        self.total_shares * self.share_price
    }
}

/// For/against vault pair for a triple, with the stake ratio on the "for"
/// side. Recomputed from cached vaults on every fetch — never cached as a
/// standalone entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusData {
    pub for_vault: Vault,
    pub against_vault: Option<Vault>,
    pub ratio: f64,
}

impl ConsensusData {
    pub fn from_vaults(for_vault: Vault, against_vault: Option<Vault>) -> Self {
        let for_assets = for_vault.total_assets();
        let against_assets = against_vault
            .as_ref()
            .map(Vault::total_assets)
            .unwrap_or(0.0);
        let total = for_assets + against_assets;
        // No stake on either side carries no signal: report an even split.
        let ratio = if total > 0.0 { for_assets / total } else { 0.5 };
        Self {
            for_vault,
            against_vault,
            ratio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault(id: &str, shares: f64, price: f64) -> Vault {
        Vault {
            id: id.to_string(),
            total_shares: shares,
            share_price: price,
            position_count: 1,
        }
    }

    #[test]
    fn test_ratio_is_for_share_of_total() {
        let consensus =
            ConsensusData::from_vaults(vault("f", 300.0, 1.0), Some(vault("a", 100.0, 1.0)));
        assert!((consensus.ratio - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_ratio_without_counter_vault_is_one() {
        let consensus = ConsensusData::from_vaults(vault("f", 10.0, 2.0), None);
        assert!((consensus.ratio - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_vaults_report_even_split() {
        let consensus =
            ConsensusData::from_vaults(vault("f", 0.0, 1.0), Some(vault("a", 0.0, 1.0)));
        assert!((consensus.ratio - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_ratio_stays_in_unit_interval() {
        let consensus =
            ConsensusData::from_vaults(vault("f", 1e9, 3.5), Some(vault("a", 2.0, 0.1)));
        assert!(consensus.ratio >= 0.0 && consensus.ratio <= 1.0);
    }
}
