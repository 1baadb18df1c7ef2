use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::model::*;
use crate::store::StoreError;

use super::conflict::booking_conflicts;
use super::validate;
use super::{BookingEngine, EngineError};

// Statuses only move forward: at most three moves before a terminal one.
const MAX_TRANSITION_ATTEMPTS: u32 = 4;

fn count_validation_failure(kind: &'static str) {
    metrics::counter!(crate::observability::VALIDATION_FAILURES_TOTAL, "kind" => kind).increment(1);
}

impl BookingEngine {
    // ── Bookings ─────────────────────────────────────────────

    /// Validate, check for conflicts, then persist as `pending`. The store's
    /// overlap constraint decides any race the conflict check cannot see.
    pub async fn create_booking(&self, request: BookingRequest) -> Result<Booking, EngineError> {
        let split = request
            .pricing
            .split_configuration
            .unwrap_or(self.config.default_split);
        if let Err(e) = validate::booking_request(&request, &split) {
            count_validation_failure("booking");
            return Err(e);
        }

        let conflicts = self.check_booking_conflicts(&request).await?;
        if !conflicts.is_empty() {
            metrics::counter!(crate::observability::BOOKING_CONFLICTS_TOTAL, "stage" => "check").increment(1);
            debug!(
                "booking for provider {} at {} rejected: {} conflict(s)",
                request.provider_id,
                request.start_date_time,
                conflicts.len()
            );
            return Err(EngineError::Conflict(conflicts));
        }

        let span = request.span();
        let now = self.now();
        let booking = Booking {
            id: Ulid::new(),
            tenant: request.tenant_id,
            provider: request.provider_id,
            client: request.client_id,
            title: request.title,
            description: request.description,
            booking_type: request.booking_type,
            start_date_time: span.start,
            end_date_time: span.end,
            duration: request.duration,
            pricing: Pricing {
                amount: request.pricing.amount,
                currency: request.pricing.currency,
                split_configuration: split,
            },
            status: BookingStatus::Pending,
            location: request.location,
            notifications: NotificationFlags::default(),
            metadata: request.metadata,
            created_at: now,
            updated_at: now,
        };

        let booking = match self.store.create_booking(booking).await {
            Ok(b) => b,
            Err(StoreError::Overlap(existing)) => {
                metrics::counter!(crate::observability::BOOKING_CONFLICTS_TOTAL, "stage" => "insert").increment(1);
                warn!(
                    "booking for provider {} at {} lost a concurrent insert",
                    request.provider_id, span.start
                );
                return Err(EngineError::Conflict(booking_conflicts(&span, &existing)));
            }
            Err(e) => return Err(e.into()),
        };

        metrics::counter!(crate::observability::BOOKINGS_CREATED_TOTAL).increment(1);
        info!(
            "booking {} created for provider {} [{}, {})",
            booking.id, booking.provider, booking.start_date_time, booking.end_date_time
        );
        self.notify.send(
            booking.tenant,
            &BookingEvent::BookingCreated {
                id: booking.id,
                provider: booking.provider,
                client: booking.client,
                span,
            },
        );
        Ok(booking)
    }

    /// Move a booking to `to`. The store only accepts the write while the status
    /// is still the one checked here; a concurrent change forces a re-read.
    pub async fn transition_booking(
        &self,
        tenant: Ulid,
        id: Ulid,
        to: BookingStatus,
    ) -> Result<Booking, EngineError> {
        let mut attempt = 0;
        let (from, booking) = loop {
            attempt += 1;
            let mut booking = self.get_booking(tenant, id).await?;
            let from = booking.status;
            if !from.can_transition_to(to) {
                return Err(EngineError::InvalidTransition { from, to });
            }
            booking.status = to;
            booking.updated_at = self.now();

            let span = booking.span();
            match self.store.update_booking(booking, from).await {
                Ok(b) => break (from, b),
                Err(StoreError::StatusChanged { current, .. }) if attempt < MAX_TRANSITION_ATTEMPTS => {
                    debug!("booking {id}: status moved {from} -> {current} underneath, retrying");
                }
                Err(StoreError::Overlap(existing)) => {
                    return Err(EngineError::Conflict(booking_conflicts(&span, &existing)));
                }
                Err(e) => return Err(e.into()),
            }
        };

        metrics::counter!(crate::observability::STATUS_TRANSITIONS_TOTAL, "to" => to.as_str()).increment(1);
        info!("booking {id}: {from} -> {to}");
        self.notify.send(
            tenant,
            &BookingEvent::StatusChanged {
                id,
                provider: booking.provider,
                from,
                to,
            },
        );
        Ok(booking)
    }

    // ── Availability rules ───────────────────────────────────

    pub async fn create_availability_rule(
        &self,
        new: NewAvailabilityRule,
    ) -> Result<AvailabilityRule, EngineError> {
        let now = self.now();
        let title = new
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| new.schedule.default_title());
        let rule = AvailabilityRule {
            id: Ulid::new(),
            tenant: new.tenant,
            provider: new.provider,
            title,
            schedule: new.schedule,
            slot_duration: new.slot_duration.unwrap_or(self.config.default_slot_duration),
            buffer_time: new.buffer_time.unwrap_or(0),
            min_advance_booking: Some(
                new.min_advance_booking
                    .unwrap_or(self.config.default_min_advance_hours),
            ),
            max_advance_booking: Some(
                new.max_advance_booking
                    .unwrap_or(self.config.default_max_advance_days),
            ),
            exceptions: new.exceptions,
            service_types: new.service_types,
            is_active: new.is_active.unwrap_or(true),
            metadata: new.metadata,
            created_at: now,
            updated_at: now,
        };
        if let Err(e) = validate::availability_rule(&rule) {
            count_validation_failure("rule");
            return Err(e);
        }

        let rule = self.store.create_rule(rule).await?;
        info!(
            "availability rule {} ({}) created for provider {}",
            rule.id,
            rule.schedule.kind(),
            rule.provider
        );
        self.announce_rule(&rule);
        Ok(rule)
    }

    pub async fn update_availability_rule(
        &self,
        tenant: Ulid,
        id: Ulid,
        patch: AvailabilityRulePatch,
    ) -> Result<AvailabilityRule, EngineError> {
        let mut rule = self.get_availability_rule(tenant, id).await?;
        let auto_titled = rule.title == rule.schedule.default_title();
        let retitle = auto_titled && patch.title.is_none() && patch.schedule.is_some();
        patch.apply(&mut rule);
        if retitle {
            rule.title = rule.schedule.default_title();
        }
        rule.updated_at = self.now();
        if let Err(e) = validate::availability_rule(&rule) {
            count_validation_failure("rule");
            return Err(e);
        }

        let rule = self.store.update_rule(rule).await?;
        info!("availability rule {id} updated");
        self.announce_rule(&rule);
        Ok(rule)
    }

    /// Soft delete: the rule stays stored but stops producing slots.
    pub async fn deactivate_availability_rule(&self, tenant: Ulid, id: Ulid) -> Result<AvailabilityRule, EngineError> {
        let patch = AvailabilityRulePatch {
            is_active: Some(false),
            ..Default::default()
        };
        self.update_availability_rule(tenant, id, patch).await
    }

    fn announce_rule(&self, rule: &AvailabilityRule) {
        self.notify.send(
            rule.tenant,
            &BookingEvent::RuleChanged {
                id: rule.id,
                provider: rule.provider,
                active: rule.is_active,
            },
        );
    }
}
