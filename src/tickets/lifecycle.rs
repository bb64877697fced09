//! The ticket status state machine.
//!
//! Transitions are planned as pure [`TicketMutation`] values so the engine
//! can validate an operation before any message leaves the building, and
//! apply the write afterwards through the store's per-ticket locking.

use chrono::{DateTime, Utc};

use super::{ServiceTicket, Stamp, TicketMutation, TicketStatus};
use crate::shared::errors::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// A cost-proposal notification went out to the customer.
    CostProposalSent,
    /// A repair-ready notification went out to the customer.
    RepairReadySent,
    /// Staff checked approval, or the customer replied affirmatively.
    Approved,
    /// Staff unchecked approval, or the customer replied negatively.
    Declined,
    /// Staff closed the case at pickup.
    Finalized,
}

pub fn plan(
    ticket: &ServiceTicket,
    event: LifecycleEvent,
    now: DateTime<Utc>,
) -> Result<TicketMutation, EngineError> {
    if ticket.closed_at.is_some() {
        return Err(EngineError::InvalidTransition("ticket is closed".to_string()));
    }

    match event {
        LifecycleEvent::CostProposalSent => Ok(TicketMutation {
            status: Some(TicketStatus::AwaitingCustomer),
            customer_notified_at: Some(Stamp::IfUnset(now)),
            ..TicketMutation::default()
        }),
        LifecycleEvent::RepairReadySent => Ok(TicketMutation {
            status: Some(TicketStatus::Ready),
            completed_at: Some(now),
            customer_notified_at: Some(Stamp::Refresh(now)),
            ..TicketMutation::default()
        }),
        LifecycleEvent::Approved => {
            let mut mutation = TicketMutation {
                status: Some(TicketStatus::CostApproved),
                cost_proposal_approved: Some(true),
                ..TicketMutation::default()
            };
            // The pending diagnosis becomes the permanent work record the
            // moment the customer says yes. This migration happens once:
            // a re-check finds the diagnosis already cleared.
            if let Some(diagnosis) = ticket.diagnosis.as_deref().filter(|d| !d.trim().is_empty()) {
                mutation.work_done_summary = Some(diagnosis.to_string());
                mutation.diagnosis = Some(None);
            }
            Ok(mutation)
        }
        LifecycleEvent::Declined => Ok(TicketMutation {
            status: Some(TicketStatus::AwaitingCustomer),
            cost_proposal_approved: Some(false),
            ..TicketMutation::default()
        }),
        LifecycleEvent::Finalized => {
            if TicketStatus::parse(&ticket.status) != Some(TicketStatus::Ready) {
                return Err(EngineError::InvalidTransition(
                    "only a ticket marked ready can be finalized".to_string(),
                ));
            }
            let has_summary = ticket
                .work_done_summary
                .as_deref()
                .is_some_and(|s| !s.trim().is_empty());
            let has_cost = ticket
                .final_cost
                .as_deref()
                .is_some_and(|c| !c.trim().is_empty());
            if !has_summary || !has_cost {
                return Err(EngineError::InvalidTransition(
                    "work summary and final cost are required before closing".to_string(),
                ));
            }
            Ok(TicketMutation {
                status: Some(TicketStatus::Closed),
                picked_up_at: Some(now),
                closed_at: Some(now),
                ..TicketMutation::default()
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_utils::sample_ticket;

    fn ticket_with_status(status: TicketStatus) -> ServiceTicket {
        let mut ticket = sample_ticket();
        ticket.status = status.as_str().to_string();
        ticket
    }

    #[test]
    fn test_cost_proposal_moves_to_awaiting_customer() {
        let mut ticket = ticket_with_status(TicketStatus::New);
        let now = Utc::now();
        let mutation = plan(&ticket, LifecycleEvent::CostProposalSent, now).unwrap();
        mutation.apply_to(&mut ticket);

        assert_eq!(ticket.status, "Väntar på kund");
        assert_eq!(ticket.customer_notified_at, Some(now));
    }

    #[test]
    fn test_second_cost_proposal_keeps_first_notified_at() {
        let mut ticket = ticket_with_status(TicketStatus::New);
        let first = Utc::now();
        plan(&ticket, LifecycleEvent::CostProposalSent, first)
            .unwrap()
            .apply_to(&mut ticket);
        let later = first + chrono::Duration::hours(3);
        plan(&ticket, LifecycleEvent::CostProposalSent, later)
            .unwrap()
            .apply_to(&mut ticket);

        assert_eq!(ticket.customer_notified_at, Some(first));
    }

    #[test]
    fn test_approval_migrates_diagnosis_into_work_summary() {
        let mut ticket = ticket_with_status(TicketStatus::AwaitingCustomer);
        ticket.diagnosis = Some("Broken screen".to_string());
        ticket.work_done_summary = None;

        plan(&ticket, LifecycleEvent::Approved, Utc::now())
            .unwrap()
            .apply_to(&mut ticket);

        assert_eq!(ticket.status, "Kostnadsförslag godkänt");
        assert_eq!(ticket.cost_proposal_approved, Some(true));
        assert_eq!(ticket.work_done_summary.as_deref(), Some("Broken screen"));
        assert_eq!(ticket.diagnosis, None);
    }

    #[test]
    fn test_reapproval_does_not_clobber_work_summary() {
        let mut ticket = ticket_with_status(TicketStatus::CostApproved);
        ticket.cost_proposal_approved = Some(true);
        ticket.diagnosis = None;
        ticket.work_done_summary = Some("Replaced screen".to_string());

        plan(&ticket, LifecycleEvent::Approved, Utc::now())
            .unwrap()
            .apply_to(&mut ticket);

        assert_eq!(ticket.work_done_summary.as_deref(), Some("Replaced screen"));
    }

    #[test]
    fn test_decline_returns_to_awaiting_customer() {
        let mut ticket = ticket_with_status(TicketStatus::CostApproved);
        ticket.cost_proposal_approved = Some(true);

        plan(&ticket, LifecycleEvent::Declined, Utc::now())
            .unwrap()
            .apply_to(&mut ticket);

        assert_eq!(ticket.status, "Väntar på kund");
        assert_eq!(ticket.cost_proposal_approved, Some(false));
    }

    #[test]
    fn test_repair_ready_sets_completed_once_but_refreshes_notified() {
        let mut ticket = ticket_with_status(TicketStatus::CostApproved);
        let first = Utc::now();
        plan(&ticket, LifecycleEvent::RepairReadySent, first)
            .unwrap()
            .apply_to(&mut ticket);
        let later = first + chrono::Duration::hours(5);
        plan(&ticket, LifecycleEvent::RepairReadySent, later)
            .unwrap()
            .apply_to(&mut ticket);

        assert_eq!(ticket.status, "Färdig");
        assert_eq!(ticket.completed_at, Some(first));
        assert_eq!(ticket.customer_notified_at, Some(later));
    }

    #[test]
    fn test_finalize_requires_summary_and_cost() {
        let mut ticket = ticket_with_status(TicketStatus::Ready);
        ticket.work_done_summary = Some("Replaced battery".to_string());
        ticket.final_cost = None;

        let err = plan(&ticket, LifecycleEvent::Finalized, Utc::now()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition(_)));
        assert_eq!(ticket.closed_at, None);
    }

    #[test]
    fn test_finalize_requires_ready_status() {
        let mut ticket = ticket_with_status(TicketStatus::AwaitingCustomer);
        ticket.work_done_summary = Some("Replaced battery".to_string());
        ticket.final_cost = Some("1200".to_string());

        let err = plan(&ticket, LifecycleEvent::Finalized, Utc::now()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition(_)));
    }

    #[test]
    fn test_finalize_closes_and_stamps_pickup() {
        let mut ticket = ticket_with_status(TicketStatus::Ready);
        ticket.work_done_summary = Some("Replaced battery".to_string());
        ticket.final_cost = Some("1200".to_string());
        let now = Utc::now();

        plan(&ticket, LifecycleEvent::Finalized, now)
            .unwrap()
            .apply_to(&mut ticket);

        assert_eq!(ticket.status, "Avslutad");
        assert_eq!(ticket.picked_up_at, Some(now));
        assert_eq!(ticket.closed_at, Some(now));
    }

    #[test]
    fn test_closed_ticket_is_terminal() {
        let mut ticket = ticket_with_status(TicketStatus::Closed);
        ticket.closed_at = Some(Utc::now());

        for event in [
            LifecycleEvent::CostProposalSent,
            LifecycleEvent::RepairReadySent,
            LifecycleEvent::Approved,
            LifecycleEvent::Declined,
            LifecycleEvent::Finalized,
        ] {
            let err = plan(&ticket, event, Utc::now()).unwrap_err();
            assert!(matches!(err, EngineError::InvalidTransition(_)));
        }
    }
}
