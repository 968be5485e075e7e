// libs/payment-cell/src/services/processor.rs
use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use tracing::{debug, info, warn};

use shared_database::{AppointmentFilter, ClinicRepository};
use shared_models::appointment::{Appointment, PaymentStatus};
use shared_models::auth::Actor;
use shared_models::EntityId;

use crate::models::{
    ChargeRequest, PaymentDecision, PaymentError, PAYMENT_FAILURE_NOTE, PAYMENT_SUCCESS_NOTE,
    REFUND_NOTE,
};
use crate::services::gateway::PaymentGateway;

const REFERENCE_PREFIX: &str = "PAY_";
const REFERENCE_LEN: usize = 8;
const REFERENCE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const MAX_WRITE_ATTEMPTS: usize = 3;

pub struct PaymentProcessor {
    repository: Arc<dyn ClinicRepository>,
    gateway: Arc<dyn PaymentGateway>,
}

impl PaymentProcessor {
    pub fn new(repository: Arc<dyn ClinicRepository>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self {
            repository,
            gateway,
        }
    }

    /// Charges the appointment's patient.
    ///
    /// The gateway is consulted before anything is written. A decline is
    /// still recorded (UNPAID plus the failure note) and then reported as
    /// [`PaymentError::Declined`].
    pub async fn process_payment(
        &self,
        appointment_id: EntityId,
        amount: f64,
        payment_method: &str,
        actor: &Actor,
    ) -> Result<Appointment, PaymentError> {
        info!("Processing payment for appointment: {} by user: {}", appointment_id, actor.id);

        if !amount.is_finite() || amount <= 0.0 {
            return Err(PaymentError::Invalid("amount must be a positive number".to_string()));
        }
        let payment_method = payment_method.trim();
        if payment_method.is_empty() {
            return Err(PaymentError::Invalid("payment_method is required".to_string()));
        }

        let appointment = self.load(appointment_id).await?;
        check_payable(&appointment, actor)?;

        let charge = ChargeRequest {
            appointment_id,
            patient_id: appointment.patient_id,
            amount,
            payment_method: payment_method.to_string(),
        };
        let decision = self.gateway.authorize(&charge).await;
        let reference = match decision {
            PaymentDecision::Approved => Some(self.unique_reference().await?),
            PaymentDecision::Declined { .. } => None,
        };

        let appointment = self
            .modify(appointment_id, |appointment| {
                check_payable(appointment, actor)?;
                match &reference {
                    Some(reference) => {
                        appointment.payment_status = PaymentStatus::Paid;
                        appointment.payment_amount = Some(amount);
                        appointment.payment_method = Some(charge.payment_method.clone());
                        appointment.payment_date = Some(Utc::now());
                        appointment.payment_reference = Some(reference.clone());
                        appointment.payment_notes = Some(PAYMENT_SUCCESS_NOTE.to_string());
                    }
                    None => {
                        appointment.payment_status = PaymentStatus::Unpaid;
                        appointment.payment_notes = Some(PAYMENT_FAILURE_NOTE.to_string());
                    }
                }
                Ok(())
            })
            .await?;

        if reference.is_some() {
            info!(
                "Payment successful for appointment: {} ({})",
                appointment_id,
                appointment.payment_reference.as_deref().unwrap_or_default()
            );
            Ok(appointment)
        } else {
            warn!("Payment failed for appointment: {}", appointment_id);
            Err(PaymentError::Declined)
        }
    }

    /// Refund of anything but a PAID appointment is refused without touching it.
    pub async fn refund_payment(
        &self,
        appointment_id: EntityId,
        actor: &Actor,
    ) -> Result<Appointment, PaymentError> {
        info!("Refunding appointment: {} requested by user: {}", appointment_id, actor.id);

        let appointment = self
            .modify(appointment_id, |appointment| {
                if !appointment.involves(actor.id) {
                    return Err(PaymentError::NotParticipant);
                }
                if appointment.payment_status != PaymentStatus::Paid {
                    return Err(PaymentError::NotRefundable);
                }

                appointment.payment_status = PaymentStatus::Refunded;
                appointment.payment_notes = Some(REFUND_NOTE.to_string());
                Ok(())
            })
            .await?;

        info!("Refund recorded for appointment: {}", appointment_id);
        Ok(appointment)
    }

    /// Newest appointment first.
    pub async fn appointments_with_status(
        &self,
        patient_id: EntityId,
        status: PaymentStatus,
    ) -> Result<Vec<Appointment>, PaymentError> {
        debug!("Fetching {} appointments for patient {}", status, patient_id);

        let filter = AppointmentFilter {
            payment_status: Some(status),
            ..AppointmentFilter::for_patient(patient_id)
        };
        let mut appointments = self.repository.list_appointments(&filter).await?;
        appointments.sort_by(|a, b| b.appointment_date_time.cmp(&a.appointment_date_time));
        Ok(appointments)
    }

    pub async fn paid_appointments(
        &self,
        patient_id: EntityId,
    ) -> Result<Vec<Appointment>, PaymentError> {
        self.appointments_with_status(patient_id, PaymentStatus::Paid).await
    }

    pub async fn unpaid_appointments(
        &self,
        patient_id: EntityId,
    ) -> Result<Vec<Appointment>, PaymentError> {
        self.appointments_with_status(patient_id, PaymentStatus::Unpaid).await
    }

    async fn load(&self, appointment_id: EntityId) -> Result<Appointment, PaymentError> {
        self.repository
            .find_appointment(appointment_id)
            .await?
            .ok_or(PaymentError::AppointmentNotFound)
    }

    /// Applies `change` to a fresh copy of the row and writes it only if the
    /// row has not moved on meanwhile.
    async fn modify<F>(
        &self,
        appointment_id: EntityId,
        mut change: F,
    ) -> Result<Appointment, PaymentError>
    where
        F: FnMut(&mut Appointment) -> Result<(), PaymentError>,
    {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let current = self.load(appointment_id).await?;
            let mut next = current.clone();
            change(&mut next)?;
            next.touch();

            if let Some(updated) = self
                .repository
                .update_appointment(&next, current.updated_at, None)
                .await?
            {
                return Ok(updated);
            }
            debug!(
                "Appointment {} changed during payment (attempt {})",
                appointment_id, attempt
            );
        }
        Err(PaymentError::Conflict)
    }

    /// `PAY_` plus 8 characters from `[A-Z0-9]`, not yet used by any appointment.
    async fn unique_reference(&self) -> Result<String, PaymentError> {
        loop {
            let candidate = generate_reference();
            if !self.repository.payment_reference_exists(&candidate).await? {
                return Ok(candidate);
            }
            debug!("Payment reference collision on {}, regenerating", candidate);
        }
    }
}

fn check_payable(appointment: &Appointment, actor: &Actor) -> Result<(), PaymentError> {
    if appointment.patient_id != actor.id {
        return Err(PaymentError::NotPatient);
    }
    if appointment.payment_status == PaymentStatus::Paid {
        return Err(PaymentError::AlreadyPaid);
    }
    Ok(())
}

fn generate_reference() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..REFERENCE_LEN)
        .map(|_| REFERENCE_CHARSET[rng.gen_range(0..REFERENCE_CHARSET.len())] as char)
        .collect();
    format!("{}{}", REFERENCE_PREFIX, suffix)
}
