//! Waltz line-labeling pipeline.

use crate::csp::waltz;
use crate::models::{Config, Result, WaltzReport};
use tracing::{info, warn};

/// Labels the fixed drawing and reports every consistent labeling.
pub struct WaltzPipeline {
    config: Config,
}

impl WaltzPipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn run(&self) -> Result<WaltzReport> {
        let filter = self.config.waltz.filter;
        info!(filter, "Starting Waltz pipeline");
        let solution = waltz::solve(filter)?;
        if solution.labelings.is_empty() {
            warn!("Drawing has no consistent labeling");
        }
        Ok(WaltzReport {
            generated_at: chrono::Utc::now(),
            filtered: solution.filtered,
            pruned: solution.pruned,
            labelings: solution.labelings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filtering_does_not_change_the_labelings() {
        let mut config = Config::default();
        let filtered = WaltzPipeline::new(config.clone()).run().unwrap();
        config.waltz.filter = false;
        let plain = WaltzPipeline::new(config).run().unwrap();
        assert!(filtered.filtered && !plain.filtered);
        assert_eq!(plain.pruned, 0);
        assert_eq!(filtered.labelings, plain.labelings);
        assert_eq!(filtered.labelings.len(), 4);
    }
}
