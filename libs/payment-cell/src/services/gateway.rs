// libs/payment-cell/src/services/gateway.rs
use async_trait::async_trait;
use rand::Rng;
use tracing::debug;

use crate::models::{ChargeRequest, PaymentDecision};

/// Decides whether a charge goes through.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn authorize(&self, charge: &ChargeRequest) -> PaymentDecision;
}

/// Approves charges at random with the configured probability.
pub struct SimulatedGateway {
    success_rate: f64,
}

impl SimulatedGateway {
    pub fn new(success_rate: f64) -> Self {
        let success_rate = if success_rate.is_finite() {
            success_rate.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self { success_rate }
    }

    pub fn success_rate(&self) -> f64 {
        self.success_rate
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn authorize(&self, charge: &ChargeRequest) -> PaymentDecision {
        let approved = rand::thread_rng().gen_bool(self.success_rate);
        debug!(
            "Simulated gateway {} charge of {:.2} for appointment {}",
            if approved { "approved" } else { "declined" },
            charge.amount,
            charge.appointment_id
        );

        if approved {
            PaymentDecision::Approved
        } else {
            PaymentDecision::Declined {
                reason: "Simulated decline".to_string(),
            }
        }
    }
}

/// Always returns the same decision.
pub struct FixedGateway {
    approve: bool,
}

impl FixedGateway {
    pub fn approving() -> Self {
        Self { approve: true }
    }

    pub fn declining() -> Self {
        Self { approve: false }
    }
}

#[async_trait]
impl PaymentGateway for FixedGateway {
    async fn authorize(&self, _charge: &ChargeRequest) -> PaymentDecision {
        if self.approve {
            PaymentDecision::Approved
        } else {
            PaymentDecision::Declined {
                reason: "Declined by fixed gateway".to_string(),
            }
        }
    }
}
