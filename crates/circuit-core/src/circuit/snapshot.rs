use contracts::{
    AccountState, BankBookState, ChequeState, LedgerSnapshot, LedgerTotals, LoanState,
};

use super::*;
use crate::consistency;

impl Circuit {
    /// Full ledger snapshot as of the period the timer points at. Loan and
    /// cheque standings are derived against that period. Totals come from a
    /// fresh sweep when the ledger is consistent; an inconsistent ledger
    /// still snapshots, with zeroed totals, so a halted run can be inspected.
    pub fn snapshot_for_current_period(&self) -> LedgerSnapshot {
        let period = self.timer.current();
        let accounts = self
            .ledger
            .accounts
            .values()
            .map(|account| AccountState {
                account_id: account.account_id.clone(),
                holder_id: account.holder_id.clone(),
                bank_id: account.bank_id.clone(),
                balance: account.balance,
                open: account.open,
            })
            .collect();
        let loans = self
            .ledger
            .loans
            .values()
            .map(|loan| LoanState {
                loan_id: loan.loan_id.clone(),
                bank_id: loan.bank_id.clone(),
                borrower_account: loan.borrower_account.clone(),
                principal: loan.principal,
                interest_rate_bps: loan.interest_rate_bps,
                penalty_rate_bps: loan.penalty_rate_bps,
                issued_period: loan.issued_period.index(),
                maturity_period: loan.maturity_period.index(),
                extended_maturity_period: loan.extended_maturity_period.index(),
                last_interest_period: loan.last_interest_period.map(Period::index),
                standing: loan.standing(period),
            })
            .collect();
        let cheques = self
            .ledger
            .cheques
            .values()
            .map(|cheque| ChequeState {
                cheque_id: cheque.cheque_id.clone(),
                payer_account: cheque.payer_account.clone(),
                payer_bank: cheque.payer_bank.clone(),
                payee_account: cheque.payee_account.clone(),
                amount: cheque.amount,
                issued_period: cheque.issued_period.index(),
                cashed_period: cheque.cashed_period.map(Period::index),
                standing: cheque.standing(),
            })
            .collect();
        let banks = self
            .ledger
            .banks
            .values()
            .map(|book| BankBookState {
                bank_id: book.bank_id.clone(),
                deposit_liability: book.deposit_liability,
                cheque_float: book.cheque_float,
                loan_book: book.loan_book,
                retained_earnings: book.retained_earnings,
            })
            .collect();
        let totals = consistency::verify_ledger(&self.ledger).unwrap_or(LedgerTotals::default());

        LedgerSnapshot {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            run_id: self.status.run_id.clone(),
            period: period.index(),
            accounts,
            loans,
            cheques,
            banks,
            totals,
        }
    }
}
