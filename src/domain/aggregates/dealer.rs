//! Dealer Aggregate: approval and credit

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use crate::domain::events::{DealerEvent, DomainEvent};
use crate::domain::value_objects::Money;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus { #[default] Pending, Approved, Rejected }

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Pending => "pending", Self::Approved => "approved", Self::Rejected => "rejected" }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s { "pending" => Some(Self::Pending), "approved" => Some(Self::Approved), "rejected" => Some(Self::Rejected), _ => None }
    }
}

#[derive(Clone, Debug)]
pub struct Dealer {
    id: Uuid,
    status: ApprovalStatus,
    credit_limit: Money,
    credit_used: Money,
    rejected_reason: Option<String>,
    events: Vec<DomainEvent>,
}

impl Dealer {
    pub fn restore(id: Uuid, status: ApprovalStatus, credit_limit: Decimal, credit_used: Decimal) -> Self {
        Self { id, status, credit_limit: Money::new(credit_limit), credit_used: Money::new(credit_used), rejected_reason: None, events: vec![] }
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn status(&self) -> ApprovalStatus { self.status }
    pub fn credit_limit(&self) -> Money { self.credit_limit }
    pub fn credit_used(&self) -> Money { self.credit_used }
    pub fn rejected_reason(&self) -> Option<&str> { self.rejected_reason.as_deref() }
    pub fn available_credit(&self) -> Money { self.credit_limit.saturating_sub(self.credit_used) }

    pub fn approve(&mut self, credit_limit: Decimal) -> Result<(), DealerError> {
        self.require_pending()?;
        let limit = validated_limit(credit_limit)?;
        self.status = ApprovalStatus::Approved;
        self.credit_limit = limit;
        self.raise_event(DomainEvent::Dealer(DealerEvent::Approved { dealer_id: self.id, credit_limit: limit.amount() }));
        Ok(())
    }

    pub fn reject(&mut self, reason: Option<String>) -> Result<(), DealerError> {
        self.require_pending()?;
        self.status = ApprovalStatus::Rejected;
        self.rejected_reason = reason.clone();
        self.raise_event(DomainEvent::Dealer(DealerEvent::Rejected { dealer_id: self.id, reason }));
        Ok(())
    }

    pub fn set_credit_limit(&mut self, credit_limit: Decimal) -> Result<(), DealerError> {
        let limit = validated_limit(credit_limit)?;
        self.credit_limit = limit;
        self.raise_event(DomainEvent::Dealer(DealerEvent::CreditLimitChanged { dealer_id: self.id, credit_limit: limit.amount() }));
        Ok(())
    }

    pub fn ensure_can_order(&self) -> Result<(), DealerError> {
        if self.status != ApprovalStatus::Approved { return Err(DealerError::NotApproved(self.status)); }
        Ok(())
    }

    /// Holds `amount` against the dealer's credit line.
    pub fn reserve_credit(&mut self, amount: Money) -> Result<(), DealerError> {
        self.ensure_can_order()?;
        let available = self.available_credit();
        if amount > available { return Err(DealerError::InsufficientCredit { required: amount, available }); }
        self.credit_used = self.credit_used + amount;
        Ok(())
    }

    pub fn release_credit(&mut self, amount: Money) { self.credit_used = self.credit_used.saturating_sub(amount); }

    fn require_pending(&self) -> Result<(), DealerError> {
        if self.status != ApprovalStatus::Pending { return Err(DealerError::AlreadyReviewed(self.status)); }
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
}

fn validated_limit(limit: Decimal) -> Result<Money, DealerError> {
    if limit.is_sign_negative() && !limit.is_zero() { return Err(DealerError::NegativeCreditLimit); }
    Ok(Money::new(limit))
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DealerError {
    #[error("Dealer account is {}", .0.as_str())]
    NotApproved(ApprovalStatus),
    #[error("Dealer has already been {}", .0.as_str())]
    AlreadyReviewed(ApprovalStatus),
    #[error("Credit limit cannot be negative")]
    NegativeCreditLimit,
    #[error("Insufficient credit limit: order needs {required}, available {available}")]
    InsufficientCredit { required: Money, available: Money },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rupees(v: i64) -> Decimal { Decimal::new(v, 0) }

    #[test]
    fn test_approval_flow() {
        let mut d = Dealer::restore(Uuid::nil(), ApprovalStatus::Pending, Decimal::ZERO, Decimal::ZERO);
        assert_eq!(d.ensure_can_order(), Err(DealerError::NotApproved(ApprovalStatus::Pending)));
        d.approve(rupees(100_000)).unwrap();
        assert_eq!(d.status(), ApprovalStatus::Approved);
        assert_eq!(d.approve(rupees(1)), Err(DealerError::AlreadyReviewed(ApprovalStatus::Approved)));
        assert_eq!(d.take_events().len(), 1);
    }

    #[test]
    fn test_reject_records_reason() {
        let mut d = Dealer::restore(Uuid::nil(), ApprovalStatus::Pending, Decimal::ZERO, Decimal::ZERO);
        d.reject(Some("GST mismatch".into())).unwrap();
        assert_eq!(d.rejected_reason(), Some("GST mismatch"));
        assert!(d.reject(None).is_err());
    }

    #[test]
    fn test_credit_reservation() {
        let mut d = Dealer::restore(Uuid::nil(), ApprovalStatus::Approved, rupees(100_000), rupees(15_000));
        assert_eq!(d.available_credit().amount(), rupees(85_000));
        d.reserve_credit(Money::new(rupees(85_000))).unwrap();
        assert_eq!(d.available_credit(), Money::ZERO);
        let err = d.reserve_credit(Money::new(Decimal::new(1, 2))).unwrap_err();
        assert!(matches!(err, DealerError::InsufficientCredit { .. }));
        d.release_credit(Money::new(rupees(5_000)));
        assert_eq!(d.credit_used().amount(), rupees(95_000));
    }

    #[test]
    fn test_credit_limit_validation() {
        let mut d = Dealer::restore(Uuid::nil(), ApprovalStatus::Approved, rupees(10), Decimal::ZERO);
        assert_eq!(d.set_credit_limit(rupees(-1)), Err(DealerError::NegativeCreditLimit));
        d.set_credit_limit(rupees(50_000)).unwrap();
        assert_eq!(d.credit_limit().amount(), rupees(50_000));
    }
}
