//! Status lifecycle and field-level permission rules.
//!
//! The legacy client replicated these checks in the UI; here they are the
//! authoritative ones, applied in the store gateway on every save. Everything
//! in this module is a pure function of (role, stored status, field), so the
//! rules are testable without a database.

use chrono::Utc;

use crate::models::{Requisition, RequisitionStatus, UserRole};

/// The authenticated user a mutation is attributed to. Resolved from the
/// users table by username, never trusted from the request body.
#[derive(Debug, Clone)]
pub struct Actor {
    pub username: String,
    pub name: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Status,
    ClientName,
    RequisitionNumber,
    Kind,
    Date,
    Environment,
    Fitter,
    PurchaseOrder,
    Responsible,
    Services,
    DeliveryItems,
    Photos,
}

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Field::Status => "status",
            Field::ClientName => "clientName",
            Field::RequisitionNumber => "requisitionNumber",
            Field::Kind => "type",
            Field::Date => "date",
            Field::Environment => "environment",
            Field::Fitter => "fitter",
            Field::PurchaseOrder => "purchaseOrder",
            Field::Responsible => "responsible",
            Field::Services => "services",
            Field::DeliveryItems => "deliveryItems",
            Field::Photos => "photos",
        }
    }

    /// Identity fields only a manager may touch.
    fn is_protected(&self) -> bool {
        matches!(
            self,
            Field::ClientName | Field::RequisitionNumber | Field::Kind | Field::Date
        )
    }
}

/// Whether `role` may change `field` on a record currently in `status`.
pub fn can_edit(role: UserRole, status: RequisitionStatus, field: Field) -> bool {
    if status == RequisitionStatus::Canceled {
        return false;
    }
    match role {
        UserRole::Manager => true,
        UserRole::Operational => !field.is_protected(),
        UserRole::Fitter => {
            status == RequisitionStatus::Received
                && field != Field::Status
                && !field.is_protected()
        }
    }
}

/// Legal status transitions: Received -> InProgress -> Done, one step at a
/// time, with Canceled reachable from any live state and terminal.
pub fn can_transition(from: RequisitionStatus, to: RequisitionStatus) -> bool {
    use RequisitionStatus::*;
    if from == to {
        return true;
    }
    match (from, to) {
        (Canceled, _) => false,
        (_, Canceled) => true,
        (Received, InProgress) => true,
        (InProgress, Done) => true,
        _ => false,
    }
}

/// Whether `role` may move a record from `from` to `to`. Fitters never change
/// status; cancellation is reserved to managers and operational users (which
/// is also exactly the set allowed to change status at all).
pub fn can_set_status(role: UserRole, from: RequisitionStatus, to: RequisitionStatus) -> bool {
    match role {
        UserRole::Fitter => false,
        UserRole::Manager | UserRole::Operational => can_transition(from, to),
    }
}

/// Prepares a brand-new record for its first persist: attribution and
/// timestamp stamps. Any status the client pre-set gets its date stamped the
/// same way a transition would.
pub fn prepare_create(incoming: &mut Requisition, actor: &Actor) {
    let now = Utc::now().to_rfc3339();
    if incoming.created_by.is_none() {
        incoming.created_by = Some(actor.name.clone());
    }
    if incoming.date.trim().is_empty() {
        incoming.date = now.clone();
    }
    incoming.canceled_by = None;
    match incoming.status {
        RequisitionStatus::InProgress if incoming.date_in_progress.is_none() => {
            incoming.date_in_progress = Some(now);
        }
        RequisitionStatus::Done if incoming.date_done.is_none() => {
            incoming.date_done = Some(now);
        }
        RequisitionStatus::Canceled => {
            incoming.canceled_by = Some(actor.name.clone());
        }
        _ => {}
    }
    incoming.stamp_created_at();
}

/// Authorizes an update against the stored copy, field by field, and applies
/// the transition stamps. Server-owned fields (number, attribution,
/// transition dates) are overwritten from the stored record first, so a
/// client cannot forge them.
pub fn authorize_update(
    existing: &Requisition,
    incoming: &mut Requisition,
    actor: &Actor,
) -> Result<(), String> {
    if existing.status == RequisitionStatus::Canceled {
        return Err("requisition is canceled and read-only".into());
    }

    // Server-owned: the number is assigned exactly once, attribution and
    // transition dates come only from this function.
    incoming.requisition_number = existing.requisition_number.clone();
    incoming.created_by = existing.created_by.clone();
    incoming.created_at = existing.created_at.clone();
    incoming.canceled_by = existing.canceled_by.clone();
    incoming.date_in_progress = existing.date_in_progress.clone();
    incoming.date_done = existing.date_done.clone();

    if incoming.status != existing.status {
        if !can_set_status(actor.role, existing.status, incoming.status) {
            return Err(format!(
                "role {:?} may not move this requisition from {} to {}",
                actor.role,
                existing.status.label(),
                incoming.status.label()
            ));
        }
        let now = Utc::now().to_rfc3339();
        match incoming.status {
            RequisitionStatus::InProgress => incoming.date_in_progress = Some(now),
            RequisitionStatus::Done => incoming.date_done = Some(now),
            RequisitionStatus::Canceled => incoming.canceled_by = Some(actor.name.clone()),
            RequisitionStatus::Received => {}
        }
    }

    let changed = changed_fields(existing, incoming);
    for field in changed {
        if field == Field::Status {
            continue; // already checked above
        }
        if !can_edit(actor.role, existing.status, field) {
            return Err(format!(
                "role {:?} may not change {} while the requisition is {}",
                actor.role,
                field.name(),
                existing.status.label()
            ));
        }
    }
    Ok(())
}

fn changed_fields(existing: &Requisition, incoming: &Requisition) -> Vec<Field> {
    let mut changed = Vec::new();
    if incoming.status != existing.status {
        changed.push(Field::Status);
    }
    if incoming.client_name != existing.client_name {
        changed.push(Field::ClientName);
    }
    if incoming.kind != existing.kind {
        changed.push(Field::Kind);
    }
    if incoming.date != existing.date {
        changed.push(Field::Date);
    }
    if incoming.environment != existing.environment {
        changed.push(Field::Environment);
    }
    if incoming.fitter != existing.fitter {
        changed.push(Field::Fitter);
    }
    if incoming.purchase_order != existing.purchase_order {
        changed.push(Field::PurchaseOrder);
    }
    if incoming.responsible != existing.responsible {
        changed.push(Field::Responsible);
    }
    if incoming.services != existing.services {
        changed.push(Field::Services);
    }
    if incoming.delivery_items != existing.delivery_items {
        changed.push(Field::DeliveryItems);
    }
    if incoming.photos != existing.photos {
        changed.push(Field::Photos);
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RequisitionType;

    fn record(status: RequisitionStatus) -> Requisition {
        Requisition {
            id: "a1".into(),
            kind: RequisitionType::Production,
            requisition_number: "R-1001".into(),
            status,
            date: "2025-01-10".into(),
            date_in_progress: None,
            date_done: None,
            client_name: "Acme".into(),
            environment: "Kitchen".into(),
            fitter: "Jo".into(),
            purchase_order: String::new(),
            responsible: String::new(),
            services: vec![],
            delivery_items: vec![],
            photos: vec![],
            created_at: serde_json::json!(1700000000000u64),
            created_by: Some("Ana".into()),
            canceled_by: None,
        }
    }

    fn actor(role: UserRole) -> Actor {
        Actor {
            username: "u".into(),
            name: "User Name".into(),
            role,
        }
    }

    #[test]
    fn canceled_records_are_frozen_for_every_role() {
        let existing = record(RequisitionStatus::Canceled);
        for role in [UserRole::Manager, UserRole::Fitter, UserRole::Operational] {
            let mut incoming = existing.clone();
            incoming.environment = "Bedroom".into();
            assert!(authorize_update(&existing, &mut incoming, &actor(role)).is_err());
        }
    }

    #[test]
    fn fitter_edits_only_while_received() {
        let existing = record(RequisitionStatus::Received);
        let mut incoming = existing.clone();
        incoming.environment = "Bedroom".into();
        assert!(authorize_update(&existing, &mut incoming, &actor(UserRole::Fitter)).is_ok());

        let existing = record(RequisitionStatus::InProgress);
        let mut incoming = existing.clone();
        incoming.environment = "Bedroom".into();
        assert!(authorize_update(&existing, &mut incoming, &actor(UserRole::Fitter)).is_err());

        // Same change from a manager goes through.
        let mut incoming = existing.clone();
        incoming.environment = "Bedroom".into();
        assert!(authorize_update(&existing, &mut incoming, &actor(UserRole::Manager)).is_ok());
    }

    #[test]
    fn fitter_never_changes_status() {
        let existing = record(RequisitionStatus::Received);
        let mut incoming = existing.clone();
        incoming.status = RequisitionStatus::InProgress;
        assert!(authorize_update(&existing, &mut incoming, &actor(UserRole::Fitter)).is_err());
        let mut incoming = existing.clone();
        incoming.status = RequisitionStatus::Canceled;
        assert!(authorize_update(&existing, &mut incoming, &actor(UserRole::Fitter)).is_err());
    }

    #[test]
    fn operational_changes_status_but_not_identity_fields() {
        let existing = record(RequisitionStatus::InProgress);
        let mut incoming = existing.clone();
        incoming.status = RequisitionStatus::Done;
        assert!(authorize_update(&existing, &mut incoming, &actor(UserRole::Operational)).is_ok());

        let mut incoming = existing.clone();
        incoming.client_name = "Other Co".into();
        assert!(authorize_update(&existing, &mut incoming, &actor(UserRole::Operational)).is_err());
    }

    #[test]
    fn transitions_follow_the_chain() {
        use RequisitionStatus::*;
        assert!(can_transition(Received, InProgress));
        assert!(can_transition(InProgress, Done));
        assert!(can_transition(Received, Canceled));
        assert!(can_transition(Done, Canceled));
        assert!(!can_transition(Received, Done));
        assert!(!can_transition(Done, Received));
        assert!(!can_transition(Canceled, Received));
        assert!(!can_transition(Canceled, InProgress));
    }

    #[test]
    fn entering_in_progress_stamps_the_date() {
        let existing = record(RequisitionStatus::Received);
        let mut incoming = existing.clone();
        incoming.status = RequisitionStatus::InProgress;
        authorize_update(&existing, &mut incoming, &actor(UserRole::Manager)).unwrap();
        assert!(incoming.date_in_progress.is_some());
        assert!(!incoming.date_in_progress.as_deref().unwrap().is_empty());
    }

    #[test]
    fn canceling_stamps_the_acting_user() {
        let existing = record(RequisitionStatus::InProgress);
        let mut incoming = existing.clone();
        incoming.status = RequisitionStatus::Canceled;
        authorize_update(&existing, &mut incoming, &actor(UserRole::Operational)).unwrap();
        assert_eq!(incoming.canceled_by.as_deref(), Some("User Name"));
    }

    #[test]
    fn requisition_number_cannot_be_rewritten_by_the_client() {
        let existing = record(RequisitionStatus::Received);
        let mut incoming = existing.clone();
        incoming.requisition_number = "R-9999".into();
        authorize_update(&existing, &mut incoming, &actor(UserRole::Manager)).unwrap();
        assert_eq!(incoming.requisition_number, "R-1001");
    }

    #[test]
    fn prepare_create_stamps_attribution() {
        let mut incoming = record(RequisitionStatus::Received);
        incoming.created_by = None;
        incoming.created_at = serde_json::Value::Null;
        prepare_create(&mut incoming, &actor(UserRole::Fitter));
        assert_eq!(incoming.created_by.as_deref(), Some("User Name"));
        assert!(incoming.created_at.is_number());
    }
}
