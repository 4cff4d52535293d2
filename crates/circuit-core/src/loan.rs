//! Loan state machine and the ledger operations that drive it.
//!
//! A loan is created by a bank advancing funds into the borrower's account
//! and mutated only by interest payment, repayment, or administrative
//! write-off. Principal is monotonically non-increasing after issuance.

use contracts::{LoanStanding, RunConfig};

use crate::ledger::{LedgerError, MoneyLedger};
use crate::period::Period;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoanError {
    UnknownLoan(String),
    /// Loans are never created with non-positive principal.
    NonPositivePrincipal(i64),
    /// Repayment or write-off larger than the remaining principal.
    ExceedsPrincipal {
        loan_id: String,
        requested: i64,
        principal: i64,
    },
    /// The loan is already closed or cancelled.
    NotOutstanding(String),
    /// A deposit-side failure (insufficient funds, closed account, ...).
    Funds(LedgerError),
}

impl From<LedgerError> for LoanError {
    fn from(err: LedgerError) -> Self {
        LoanError::Funds(err)
    }
}

impl std::fmt::Display for LoanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoanError::UnknownLoan(id) => write!(f, "unknown loan: {}", id),
            LoanError::NonPositivePrincipal(p) => {
                write!(f, "loan principal must be positive, got {}", p)
            }
            LoanError::ExceedsPrincipal {
                loan_id,
                requested,
                principal,
            } => write!(
                f,
                "amount {} exceeds principal {} on {}",
                requested, principal, loan_id
            ),
            LoanError::NotOutstanding(id) => write!(f, "loan is not outstanding: {}", id),
            LoanError::Funds(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for LoanError {}

// ---------------------------------------------------------------------------
// Terms and the loan record
// ---------------------------------------------------------------------------

/// Numeric loan parameters, lifted from the run configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoanTerms {
    pub interest_rate_bps: i64,
    pub penalty_rate_bps: i64,
    pub normal_term_periods: u64,
    pub extended_term_periods: u64,
}

impl From<&RunConfig> for LoanTerms {
    fn from(config: &RunConfig) -> Self {
        Self {
            interest_rate_bps: config.interest_rate_bps,
            penalty_rate_bps: config.penalty_rate_bps,
            normal_term_periods: config.normal_term_periods,
            extended_term_periods: config.extended_term_periods,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loan {
    pub loan_id: String,
    pub bank_id: String,
    pub borrower_account: String,
    pub principal: i64,
    pub interest_rate_bps: i64,
    pub penalty_rate_bps: i64,
    pub issued_period: Period,
    pub maturity_period: Period,
    pub extended_maturity_period: Period,
    pub last_interest_period: Option<Period>,
    pub closed_period: Option<Period>,
    pub cancelled_period: Option<Period>,
}

impl Loan {
    /// Pure predicate: past maturity with principal still outstanding.
    pub fn is_doubtful(&self, now: Period) -> bool {
        now.is_after(self.maturity_period) && self.principal > 0
    }

    pub fn is_outstanding(&self) -> bool {
        self.principal > 0 && self.cancelled_period.is_none()
    }

    /// Derived standing at `now`. Terminal states win over the overdue
    /// ladder.
    pub fn standing(&self, now: Period) -> LoanStanding {
        if self.cancelled_period.is_some() {
            LoanStanding::Cancelled
        } else if self.principal == 0 {
            LoanStanding::Closed
        } else if now.is_after(self.extended_maturity_period) {
            LoanStanding::Doubtful
        } else if now.is_after(self.maturity_period) {
            LoanStanding::Overdue
        } else {
            LoanStanding::Normal
        }
    }

    /// Interest due for one period: principal times the nominal rate, or the
    /// penalty rate once overdue. Basis-point integer math; the division
    /// truncates so interest never rounds up (no fabricated currency).
    pub fn interest_due(&self, now: Period) -> i64 {
        let rate_bps = if now.is_after(self.maturity_period) {
            self.penalty_rate_bps
        } else {
            self.interest_rate_bps
        };
        self.principal.saturating_mul(rate_bps) / 10_000
    }
}

// ---------------------------------------------------------------------------
// Ledger operations
// ---------------------------------------------------------------------------

impl MoneyLedger {
    /// Advance `principal` into the borrower's account: the deposit credit
    /// and the growth of the lender's loan book happen in one step.
    pub fn issue_loan(
        &mut self,
        bank_id: &str,
        borrower_account: &str,
        principal: i64,
        terms: LoanTerms,
        now: Period,
        phase: &str,
    ) -> Result<String, LoanError> {
        if principal <= 0 {
            return Err(LoanError::NonPositivePrincipal(principal));
        }
        if !self.banks.contains_key(bank_id) {
            return Err(LoanError::Funds(LedgerError::UnknownBank(
                bank_id.to_string(),
            )));
        }
        self.credit(borrower_account, principal)?;
        let lender = self
            .banks
            .get_mut(bank_id)
            .expect("lender bank checked above");
        lender.loan_book += principal;

        self.next_loan_seq += 1;
        let loan_id = format!("loan:{}", self.next_loan_seq);
        let maturity = now.plus(terms.normal_term_periods);
        self.loans.insert(
            loan_id.clone(),
            Loan {
                loan_id: loan_id.clone(),
                bank_id: bank_id.to_string(),
                borrower_account: borrower_account.to_string(),
                principal,
                interest_rate_bps: terms.interest_rate_bps,
                penalty_rate_bps: terms.penalty_rate_bps,
                issued_period: now,
                maturity_period: maturity,
                extended_maturity_period: maturity.plus(terms.extended_term_periods),
                last_interest_period: None,
                closed_period: None,
                cancelled_period: None,
            },
        );
        self.record(now, phase, bank_id, borrower_account, principal, "loan_issued");
        Ok(loan_id)
    }

    /// Debit one period's interest from the borrower and credit it to the
    /// lender's retained earnings. Borrower shortfall is recoverable; the
    /// default/bankruptcy decision belongs to the calling sector.
    pub fn pay_interest(
        &mut self,
        loan_id: &str,
        now: Period,
        phase: &str,
    ) -> Result<i64, LoanError> {
        let loan = self
            .loans
            .get(loan_id)
            .ok_or_else(|| LoanError::UnknownLoan(loan_id.to_string()))?;
        if !loan.is_outstanding() {
            return Err(LoanError::NotOutstanding(loan_id.to_string()));
        }
        let interest = loan.interest_due(now);
        let borrower = loan.borrower_account.clone();
        let bank_id = loan.bank_id.clone();

        self.debit(&borrower, interest)?;
        self.banks
            .get_mut(&bank_id)
            .expect("lender bank of an outstanding loan")
            .retained_earnings += interest;
        self.loans
            .get_mut(loan_id)
            .expect("loan fetched above")
            .last_interest_period = Some(now);
        self.record(now, phase, &borrower, &bank_id, interest, "loan_interest");
        Ok(interest)
    }

    /// Repay `amount` of principal. Usable at any period, not only maturity;
    /// principal reaching zero closes the loan.
    pub fn pay_back(
        &mut self,
        loan_id: &str,
        amount: i64,
        now: Period,
        phase: &str,
    ) -> Result<(), LoanError> {
        if amount < 0 {
            return Err(LoanError::Funds(LedgerError::InvalidAmount(amount)));
        }
        let loan = self
            .loans
            .get(loan_id)
            .ok_or_else(|| LoanError::UnknownLoan(loan_id.to_string()))?;
        if !loan.is_outstanding() {
            return Err(LoanError::NotOutstanding(loan_id.to_string()));
        }
        if amount > loan.principal {
            return Err(LoanError::ExceedsPrincipal {
                loan_id: loan_id.to_string(),
                requested: amount,
                principal: loan.principal,
            });
        }
        let borrower = loan.borrower_account.clone();
        let bank_id = loan.bank_id.clone();

        self.debit(&borrower, amount)?;
        self.banks
            .get_mut(&bank_id)
            .expect("lender bank of an outstanding loan")
            .loan_book -= amount;
        let loan = self.loans.get_mut(loan_id).expect("loan fetched above");
        loan.principal -= amount;
        if loan.principal == 0 {
            loan.closed_period = Some(now);
        }
        self.record(now, phase, &borrower, &bank_id, amount, "loan_repayment");
        Ok(())
    }

    /// Administrative write-off: reduce principal with no borrower debit,
    /// mirrored by an equal reduction of the lender's recorded assets in the
    /// same operation. The single sanctioned exception to "every credit has a
    /// matching debit" — conservation still holds afterwards because the loss
    /// comes out of retained earnings.
    pub fn write_off(
        &mut self,
        loan_id: &str,
        amount: i64,
        now: Period,
        phase: &str,
    ) -> Result<(), LoanError> {
        if amount < 0 {
            return Err(LoanError::Funds(LedgerError::InvalidAmount(amount)));
        }
        let loan = self
            .loans
            .get(loan_id)
            .ok_or_else(|| LoanError::UnknownLoan(loan_id.to_string()))?;
        if !loan.is_outstanding() {
            return Err(LoanError::NotOutstanding(loan_id.to_string()));
        }
        if amount > loan.principal {
            return Err(LoanError::ExceedsPrincipal {
                loan_id: loan_id.to_string(),
                requested: amount,
                principal: loan.principal,
            });
        }
        let bank_id = loan.bank_id.clone();
        let bank = self
            .banks
            .get_mut(&bank_id)
            .expect("lender bank of an outstanding loan");
        bank.loan_book -= amount;
        bank.retained_earnings -= amount;
        let loan = self.loans.get_mut(loan_id).expect("loan fetched above");
        loan.principal -= amount;
        if loan.principal == 0 {
            loan.cancelled_period = Some(now);
        }
        self.record(now, phase, &bank_id, loan_id, amount, "loan_write_off");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TERMS: LoanTerms = LoanTerms {
        interest_rate_bps: 100,
        penalty_rate_bps: 300,
        normal_term_periods: 3,
        extended_term_periods: 3,
    };

    fn ledger_with_loan(principal: i64) -> (MoneyLedger, String) {
        let mut ledger = MoneyLedger::new();
        ledger.open_bank("bank:b1").expect("bank");
        ledger
            .open_account("acct:a1", "agent:f1", "bank:b1")
            .expect("account");
        let loan_id = ledger
            .issue_loan("bank:b1", "acct:a1", principal, TERMS, Period::ZERO, "finance")
            .expect("loan");
        (ledger, loan_id)
    }

    #[test]
    fn issue_credits_borrower_and_grows_loan_book() {
        let (ledger, loan_id) = ledger_with_loan(1000);
        assert_eq!(ledger.balance("acct:a1").unwrap(), 1000);
        assert_eq!(ledger.banks["bank:b1"].loan_book, 1000);
        let loan = &ledger.loans[&loan_id];
        assert_eq!(loan.maturity_period, Period::new(3));
        assert_eq!(loan.extended_maturity_period, Period::new(6));
        assert_eq!(loan.standing(Period::ZERO), LoanStanding::Normal);
    }

    #[test]
    fn non_positive_principal_is_rejected() {
        let mut ledger = MoneyLedger::new();
        ledger.open_bank("bank:b1").expect("bank");
        ledger
            .open_account("acct:a1", "agent:f1", "bank:b1")
            .expect("account");
        for bad in [0, -500] {
            assert_eq!(
                ledger.issue_loan("bank:b1", "acct:a1", bad, TERMS, Period::ZERO, "finance"),
                Err(LoanError::NonPositivePrincipal(bad))
            );
        }
        assert!(ledger.loans.is_empty());
        assert_eq!(ledger.balance("acct:a1").unwrap(), 0);
    }

    #[test]
    fn interest_truncates_and_updates_last_payment() {
        // 999 * 1% = 9.99, truncated to 9.
        let (mut ledger, loan_id) = ledger_with_loan(999);
        let paid = ledger
            .pay_interest(&loan_id, Period::new(1), "settlement")
            .expect("interest");
        assert_eq!(paid, 9);
        assert_eq!(ledger.balance("acct:a1").unwrap(), 990);
        assert_eq!(ledger.banks["bank:b1"].retained_earnings, 9);
        assert_eq!(
            ledger.loans[&loan_id].last_interest_period,
            Some(Period::new(1))
        );
    }

    #[test]
    fn overdue_interest_uses_penalty_rate() {
        let (mut ledger, loan_id) = ledger_with_loan(1000);
        // Period 4 is after the period-3 maturity.
        let paid = ledger
            .pay_interest(&loan_id, Period::new(4), "settlement")
            .expect("interest");
        assert_eq!(paid, 30);
    }

    #[test]
    fn interest_shortfall_is_recoverable_and_leaves_loan_untouched() {
        let (mut ledger, loan_id) = ledger_with_loan(1000);
        ledger.debit("acct:a1", 995).expect("spend down");
        let err = ledger
            .pay_interest(&loan_id, Period::new(1), "settlement")
            .expect_err("shortfall");
        assert!(matches!(
            err,
            LoanError::Funds(LedgerError::InsufficientFunds { .. })
        ));
        assert_eq!(ledger.loans[&loan_id].last_interest_period, None);
        assert_eq!(ledger.banks["bank:b1"].retained_earnings, 0);
    }

    #[test]
    fn pay_back_reduces_principal_exactly_and_closes_at_zero() {
        let (mut ledger, loan_id) = ledger_with_loan(1000);
        ledger
            .pay_back(&loan_id, 400, Period::new(1), "settlement")
            .expect("partial");
        assert_eq!(ledger.loans[&loan_id].principal, 600);
        assert_eq!(ledger.banks["bank:b1"].loan_book, 600);
        assert_eq!(ledger.loans[&loan_id].standing(Period::new(1)), LoanStanding::Normal);

        ledger
            .pay_back(&loan_id, 600, Period::new(2), "settlement")
            .expect("full");
        assert_eq!(ledger.loans[&loan_id].principal, 0);
        assert_eq!(ledger.loans[&loan_id].standing(Period::new(2)), LoanStanding::Closed);
        assert_eq!(ledger.banks["bank:b1"].loan_book, 0);
        assert_eq!(
            ledger.pay_back(&loan_id, 1, Period::new(3), "settlement"),
            Err(LoanError::NotOutstanding(loan_id)),
        );
    }

    #[test]
    fn pay_back_beyond_principal_is_rejected() {
        let (mut ledger, loan_id) = ledger_with_loan(1000);
        let err = ledger
            .pay_back(&loan_id, 1200, Period::new(1), "settlement")
            .expect_err("too much");
        assert_eq!(
            err,
            LoanError::ExceedsPrincipal {
                loan_id,
                requested: 1200,
                principal: 1000,
            }
        );
    }

    #[test]
    fn write_off_reduces_assets_and_equity_without_borrower_debit() {
        let (mut ledger, loan_id) = ledger_with_loan(1000);
        ledger
            .write_off(&loan_id, 1000, Period::new(7), "settlement")
            .expect("write off");
        assert_eq!(ledger.balance("acct:a1").unwrap(), 1000);
        assert_eq!(ledger.banks["bank:b1"].loan_book, 0);
        assert_eq!(ledger.banks["bank:b1"].retained_earnings, -1000);
        assert_eq!(
            ledger.loans[&loan_id].standing(Period::new(7)),
            LoanStanding::Cancelled
        );
    }

    #[test]
    fn doubtful_predicate_tracks_maturity_and_principal() {
        let (mut ledger, loan_id) = ledger_with_loan(1000);
        let loan = ledger.loans[&loan_id].clone();
        assert!(!loan.is_doubtful(Period::new(3)));
        assert!(loan.is_doubtful(Period::new(4)));

        ledger
            .pay_back(&loan_id, 1000, Period::new(4), "settlement")
            .expect("repay");
        assert!(!ledger.loans[&loan_id].is_doubtful(Period::new(5)));
    }

    #[test]
    fn standing_ladder_follows_the_two_maturities() {
        let (ledger, loan_id) = ledger_with_loan(1000);
        let loan = &ledger.loans[&loan_id];
        assert_eq!(loan.standing(Period::new(3)), LoanStanding::Normal);
        assert_eq!(loan.standing(Period::new(4)), LoanStanding::Overdue);
        assert_eq!(loan.standing(Period::new(6)), LoanStanding::Overdue);
        assert_eq!(loan.standing(Period::new(7)), LoanStanding::Doubtful);
    }
}
