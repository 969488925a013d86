use crate::stats::Summary;
use spendgraph_core::config::NetworkParams;
use spendgraph_core::metrics::EvaluationOutcome;
use spendgraph_core::model::{FlaggedPurchase, PurchaseEvent};
use storage::history::PurchaseRecord;
use storage::network::SocialNetwork;
use tracing::debug;

/// Standard deviations above the mean before a purchase is anomalous.
pub const DEFAULT_SIGMAS: f64 = 3.0;

/// Fewer prior purchases than this leave a purchase unevaluated.
pub const MIN_SAMPLES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Evaluation {
    /// Not enough prior purchases in the network; never flagged.
    NotEvaluable { available: usize },
    Normal(Summary),
    Anomalous(Summary),
}

impl Evaluation {
    pub fn is_anomalous(&self) -> bool {
        matches!(self, Evaluation::Anomalous(_))
    }

    pub fn summary(&self) -> Option<&Summary> {
        match self {
            Evaluation::NotEvaluable { .. } => None,
            Evaluation::Normal(summary) | Evaluation::Anomalous(summary) => Some(summary),
        }
    }

    pub fn outcome(&self) -> EvaluationOutcome {
        match self {
            Evaluation::NotEvaluable { .. } => EvaluationOutcome::NotEvaluable,
            Evaluation::Normal(_) => EvaluationOutcome::Normal,
            Evaluation::Anomalous(_) => EvaluationOutcome::Flagged,
        }
    }
}

/// Result of evaluating one purchase against its buyer's network.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assessment {
    pub network_size: usize,
    pub evaluation: Evaluation,
}

impl Assessment {
    /// Output record for `purchase` when the evaluation flagged it.
    pub fn flagged(&self, purchase: &PurchaseEvent) -> Option<FlaggedPurchase> {
        match self.evaluation {
            Evaluation::Anomalous(summary) => {
                Some(FlaggedPurchase::new(purchase, summary.mean, summary.sd))
            }
            _ => None,
        }
    }
}

/// Flags purchases far above the recent spending of the buyer's network.
#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    params: NetworkParams,
    sigmas: f64,
}

impl AnomalyDetector {
    pub fn new(params: NetworkParams) -> Self {
        Self {
            params,
            sigmas: DEFAULT_SIGMAS,
        }
    }

    pub fn with_sigmas(mut self, sigmas: f64) -> Self {
        self.sigmas = sigmas;
        self
    }

    pub fn params(&self) -> NetworkParams {
        self.params
    }

    /// Evaluate `purchase` against the current state without recording it.
    pub fn evaluate(&self, network: &SocialNetwork, purchase: &PurchaseEvent) -> Assessment {
        let members = network.network_of(&purchase.id, self.params.degree);
        let window: Vec<f64> = network
            .history()
            .recent_across_set(&members, self.params.tracked_purchases)
            .iter()
            .map(|record| record.amount.value())
            .collect();

        let evaluation = match Summary::of(&window) {
            Some(summary) if window.len() >= MIN_SAMPLES => {
                if purchase.amount.value() > summary.threshold(self.sigmas) {
                    Evaluation::Anomalous(summary)
                } else {
                    Evaluation::Normal(summary)
                }
            }
            _ => Evaluation::NotEvaluable {
                available: window.len(),
            },
        };

        debug!(
            id = %purchase.id,
            amount = purchase.amount.value(),
            network_size = members.len(),
            window = window.len(),
            ?evaluation,
            "purchase evaluated"
        );

        Assessment {
            network_size: members.len(),
            evaluation,
        }
    }

    /// Evaluate `purchase`, then record it. The purchase never sees itself.
    pub fn process(&self, network: &mut SocialNetwork, purchase: &PurchaseEvent) -> Assessment {
        let assessment = self.evaluate(network, purchase);
        network.record_purchase(purchase);
        assessment
    }

    /// Record `purchase` without evaluating it, e.g. while replaying history.
    pub fn observe(&self, network: &mut SocialNetwork, purchase: &PurchaseEvent) -> PurchaseRecord {
        network.record_purchase(purchase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spendgraph_core::model::Amount;

    fn purchase(id: &str, amount: &str) -> PurchaseEvent {
        PurchaseEvent::new(id, Amount::parse(amount).unwrap(), "2017-06-13 11:33:01")
    }

    #[test]
    fn test_process_records_after_evaluating() {
        let detector = AnomalyDetector::new(NetworkParams::new(1, 5));
        let mut network = SocialNetwork::new();

        let assessment = detector.process(&mut network, &purchase("1", "10"));
        assert_eq!(
            assessment.evaluation,
            Evaluation::NotEvaluable { available: 0 }
        );
        assert_eq!(network.history().purchases_of(&"1".into()), 1);
    }

    #[test]
    fn test_equal_to_threshold_is_not_anomalous() {
        let detector = AnomalyDetector::new(NetworkParams::new(1, 5)).with_sigmas(0.0);
        let mut network = SocialNetwork::new();
        network.befriend(&spendgraph_core::model::FriendshipEvent {
            id1: "1".into(),
            id2: "2".into(),
            timestamp: "t".to_string(),
        });
        detector.observe(&mut network, &purchase("2", "10"));
        detector.observe(&mut network, &purchase("2", "10"));

        let at = detector.evaluate(&network, &purchase("1", "10"));
        assert!(matches!(at.evaluation, Evaluation::Normal(_)));

        let above = detector.evaluate(&network, &purchase("1", "10.01"));
        assert!(above.evaluation.is_anomalous());
        assert_eq!(above.network_size, 1);
    }
}
