use chrono::Local;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_WITHDRAWAL_LIMIT_COUNT: u32 = 3;

pub fn default_overdraft_limit() -> Decimal {
    Decimal::new(500, 0)
}

fn default_withdrawal_limit_count() -> u32 {
    DEFAULT_WITHDRAWAL_LIMIT_COUNT
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountError {
    #[error("Operation failed! The amount entered is invalid.")]
    InvalidAmount,
    #[error("Operation failed! {0}")]
    InsufficientFunds(Movement),
    #[error("Operation failed! The withdrawal amount exceeds the limit.")]
    LimitExceeded,
    #[error("Operation failed! Maximum number of withdrawals exceeded.")]
    WithdrawalCountExceeded,
    #[error("Invalid destination account.")]
    InvalidDestination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    Withdrawal,
    Transfer,
}

impl fmt::Display for Movement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Movement::Withdrawal => f.write_str("Insufficient balance."),
            Movement::Transfer => f.write_str("Insufficient balance for transfer."),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Deposited,
    Withdrew,
    Transferred,
}

impl fmt::Display for Confirmation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Confirmation::*;

        let message = match self {
            Deposited => "Deposit completed successfully.",
            Withdrew => "Withdrawal completed successfully.",
            Transferred => "Transfer completed successfully.",
        };

        f.write_str(message)
    }
}

pub type Outcome = Result<Confirmation, AccountError>;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub holder_name: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision", default)]
    pub balance: Decimal,
    /// Caps each individual withdrawal, not the running balance.
    #[serde(
        with = "rust_decimal::serde::arbitrary_precision",
        default = "default_overdraft_limit"
    )]
    pub overdraft_limit: Decimal,
    #[serde(default = "default_withdrawal_limit_count")]
    pub withdrawal_limit_count: u32,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub statement: Vec<String>,
    #[serde(default)]
    pub withdrawal_count: u32,
}

impl Account {
    pub fn new(
        number: String,
        holder_name: String,
        password: String,
        overdraft_limit: Decimal,
        withdrawal_limit_count: u32,
    ) -> Self {
        Self {
            number,
            holder_name,
            balance: Decimal::ZERO,
            overdraft_limit,
            withdrawal_limit_count,
            password,
            statement: Vec::new(),
            withdrawal_count: 0,
        }
    }

    pub fn check_password(&self, candidate: &str) -> bool {
        self.password == candidate
    }

    pub fn deposit(&mut self, amount: Decimal) -> Outcome {
        if amount <= Decimal::ZERO {
            return Err(AccountError::InvalidAmount);
        }

        // overflow is reported as an unusable amount
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(AccountError::InvalidAmount)?;
        self.record("Deposit", amount);
        debug!(account = %self.number, %amount, "deposit");

        Ok(Confirmation::Deposited)
    }

    pub fn withdraw(&mut self, amount: Decimal) -> Outcome {
        if amount <= Decimal::ZERO {
            return Err(AccountError::InvalidAmount);
        }
        if amount > self.balance {
            return Err(AccountError::InsufficientFunds(Movement::Withdrawal));
        }
        if amount > self.overdraft_limit {
            return Err(AccountError::LimitExceeded);
        }
        if self.withdrawal_count >= self.withdrawal_limit_count {
            return Err(AccountError::WithdrawalCountExceeded);
        }

        self.balance -= amount;
        self.withdrawal_count += 1;
        self.record("Withdrawal", amount);
        debug!(account = %self.number, %amount, count = self.withdrawal_count, "withdrawal");

        Ok(Confirmation::Withdrew)
    }

    /// Moves funds to `destination`. Withdrawal caps are not consulted.
    pub fn transfer(&mut self, destination: Option<&mut Account>, amount: Decimal) -> Outcome {
        let destination = destination.ok_or(AccountError::InvalidDestination)?;
        self.check_transfer(amount)?;

        let credited = destination
            .balance
            .checked_add(amount)
            .ok_or(AccountError::InvalidAmount)?;

        self.balance -= amount;
        destination.balance = credited;
        self.record(&format!("Transfer sent to {}", destination.number), amount);
        destination.record(&format!("Transfer received from {}", self.number), amount);
        debug!(from = %self.number, to = %destination.number, %amount, "transfer");

        Ok(Confirmation::Transferred)
    }

    /// Transfer whose destination is this same account: the balance is
    /// unchanged, both statement entries are recorded.
    pub fn transfer_to_self(&mut self, amount: Decimal) -> Outcome {
        self.check_transfer(amount)?;

        let number = self.number.clone();
        self.record(&format!("Transfer sent to {number}"), amount);
        self.record(&format!("Transfer received from {number}"), amount);
        debug!(account = %number, %amount, "transfer to self");

        Ok(Confirmation::Transferred)
    }

    pub fn render_statement(&self) -> String {
        let body = if self.statement.is_empty() {
            "No transactions recorded.".to_string()
        } else {
            self.statement.join("\n")
        };

        format!(
            "\n================ STATEMENT ================\n{body}\n\nBalance: {:.2}\n===========================================",
            self.balance
        )
    }

    fn check_transfer(&self, amount: Decimal) -> Result<(), AccountError> {
        if amount <= Decimal::ZERO {
            return Err(AccountError::InvalidAmount);
        }
        if amount > self.balance {
            return Err(AccountError::InsufficientFunds(Movement::Transfer));
        }

        Ok(())
    }

    fn record(&mut self, tag: &str, amount: Decimal) {
        let now = Local::now().format("%Y-%m-%d %H:%M:%S");
        self.statement.push(format!("{now} - {tag}: {amount:.2}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    fn account(number: &str) -> Account {
        Account::new(
            number.to_string(),
            "Holder".to_string(),
            "secret".to_string(),
            default_overdraft_limit(),
            DEFAULT_WITHDRAWAL_LIMIT_COUNT,
        )
    }

    fn funded(number: &str, balance: &str) -> Account {
        let mut account = account(number);
        account.balance = dec(balance);
        account
    }

    #[test]
    fn deposit() {
        let mut account = account("1001");

        assert_eq!(account.deposit(dec("100.00")), Ok(Confirmation::Deposited));
        assert_eq!(account.deposit(dec("0.5")), Ok(Confirmation::Deposited));

        assert_eq!(account.balance, dec("100.50"));
        assert_eq!(account.statement.len(), 2);
        assert!(account.statement[0].ends_with(" - Deposit: 100.00"));
        assert!(account.statement[1].ends_with(" - Deposit: 0.50"));
    }

    #[test]
    fn deposit_non_positive() {
        let mut account = account("1001");

        assert_eq!(account.deposit(Decimal::ZERO), Err(AccountError::InvalidAmount));
        assert_eq!(account.deposit(dec("-1")), Err(AccountError::InvalidAmount));

        assert_eq!(account.balance, Decimal::ZERO);
        assert!(account.statement.is_empty());
    }

    #[test]
    fn deposit_then_withdraw() {
        let mut account = account("1001");

        account.deposit(dec("100.00")).unwrap();
        assert_eq!(account.withdraw(dec("50.00")), Ok(Confirmation::Withdrew));

        assert_eq!(account.balance, dec("50.00"));
        assert_eq!(account.statement.len(), 2);
        assert_eq!(account.withdrawal_count, 1);
        assert!(account.statement[1].ends_with(" - Withdrawal: 50.00"));
    }

    #[test]
    fn withdraw_more_than_balance() {
        let mut account = funded("1001", "10.00");

        assert_eq!(
            account.withdraw(dec("20.00")),
            Err(AccountError::InsufficientFunds(Movement::Withdrawal))
        );

        assert_eq!(account.balance, dec("10.00"));
        assert_eq!(account.withdrawal_count, 0);
        assert!(account.statement.is_empty());
    }

    #[test]
    fn withdraw_over_per_transaction_limit() {
        let mut account = funded("1001", "1000");

        assert_eq!(account.withdraw(dec("500.01")), Err(AccountError::LimitExceeded));
        assert_eq!(account.withdraw(dec("500")), Ok(Confirmation::Withdrew));

        assert_eq!(account.balance, dec("500"));
    }

    #[test]
    fn withdrawal_count_exhausted() {
        let mut account = funded("1001", "100");
        account.withdrawal_limit_count = 1;

        assert_eq!(account.withdraw(dec("5.00")), Ok(Confirmation::Withdrew));
        assert_eq!(
            account.withdraw(dec("5.00")),
            Err(AccountError::WithdrawalCountExceeded)
        );

        assert_eq!(account.balance, dec("95.00"));
        assert_eq!(account.withdrawal_count, 1);
    }

    #[test]
    fn withdraw_reports_first_failing_check() {
        let mut account = funded("1001", "10");
        account.withdrawal_count = DEFAULT_WITHDRAWAL_LIMIT_COUNT;

        // exceeds balance, the limit and the count all at once
        assert_eq!(
            account.withdraw(dec("600")),
            Err(AccountError::InsufficientFunds(Movement::Withdrawal))
        );
        assert_eq!(account.withdraw(dec("-600")), Err(AccountError::InvalidAmount));

        account.balance = dec("1000");
        assert_eq!(account.withdraw(dec("600")), Err(AccountError::LimitExceeded));
        assert_eq!(
            account.withdraw(dec("1")),
            Err(AccountError::WithdrawalCountExceeded)
        );
    }

    #[test]
    fn transfer() {
        let mut source = funded("1001", "100");
        let mut destination = account("1002");

        assert_eq!(
            source.transfer(Some(&mut destination), dec("30.00")),
            Ok(Confirmation::Transferred)
        );

        assert_eq!(source.balance, dec("70"));
        assert_eq!(destination.balance, dec("30"));
        assert_eq!(source.statement.len(), 1);
        assert_eq!(destination.statement.len(), 1);
        assert!(source.statement[0].ends_with(" - Transfer sent to 1002: 30.00"));
        assert!(destination.statement[0].ends_with(" - Transfer received from 1001: 30.00"));
    }

    #[test]
    fn transfer_ignores_withdrawal_caps() {
        let mut source = funded("1001", "2000");
        source.withdrawal_limit_count = 0;
        let mut destination = account("1002");

        assert_eq!(
            source.transfer(Some(&mut destination), dec("1500")),
            Ok(Confirmation::Transferred)
        );

        assert_eq!(source.balance + destination.balance, dec("2000"));
        assert_eq!(source.withdrawal_count, 0);
    }

    #[test]
    fn transfer_rejections() {
        let mut source = funded("1001", "10");
        let mut destination = account("1002");

        assert_eq!(
            source.transfer(None, dec("-1")),
            Err(AccountError::InvalidDestination)
        );
        assert_eq!(
            source.transfer(Some(&mut destination), Decimal::ZERO),
            Err(AccountError::InvalidAmount)
        );
        assert_eq!(
            source.transfer(Some(&mut destination), dec("10.01")),
            Err(AccountError::InsufficientFunds(Movement::Transfer))
        );

        assert_eq!(source.balance, dec("10"));
        assert_eq!(destination.balance, Decimal::ZERO);
        assert!(source.statement.is_empty());
        assert!(destination.statement.is_empty());
    }

    #[test]
    fn deposit_overflow_is_rejected() {
        let mut account = account("1001");

        assert_eq!(account.deposit(Decimal::MAX), Ok(Confirmation::Deposited));
        assert_eq!(account.deposit(Decimal::MAX), Err(AccountError::InvalidAmount));

        assert_eq!(account.balance, Decimal::MAX);
        assert_eq!(account.statement.len(), 1);
    }

    #[test]
    fn transfer_overflowing_destination_is_rejected() {
        let mut source = funded("1001", "10");
        let mut destination = funded("1002", "0");
        destination.balance = Decimal::MAX;

        assert_eq!(
            source.transfer(Some(&mut destination), dec("1")),
            Err(AccountError::InvalidAmount)
        );

        assert_eq!(source.balance, dec("10"));
        assert_eq!(destination.balance, Decimal::MAX);
        assert!(source.statement.is_empty());
    }

    #[test]
    fn transfer_to_self() {
        let mut account = funded("1001", "100");

        assert_eq!(account.transfer_to_self(dec("30")), Ok(Confirmation::Transferred));

        assert_eq!(account.balance, dec("100"));
        assert_eq!(account.statement.len(), 2);
        assert!(account.statement[0].ends_with(" - Transfer sent to 1001: 30.00"));
        assert!(account.statement[1].ends_with(" - Transfer received from 1001: 30.00"));

        assert_eq!(account.transfer_to_self(Decimal::ZERO), Err(AccountError::InvalidAmount));
        assert_eq!(
            account.transfer_to_self(dec("100.01")),
            Err(AccountError::InsufficientFunds(Movement::Transfer))
        );
        assert_eq!(account.statement.len(), 2);
    }

    #[test]
    fn insufficient_funds_messages() {
        assert_eq!(
            AccountError::InsufficientFunds(Movement::Withdrawal).to_string(),
            "Operation failed! Insufficient balance."
        );
        assert_eq!(
            AccountError::InsufficientFunds(Movement::Transfer).to_string(),
            "Operation failed! Insufficient balance for transfer."
        );
    }

    #[test]
    fn render_empty_statement() {
        let account = account("1001");
        let rendered = account.render_statement();

        assert!(rendered.contains("No transactions recorded."));
        assert!(rendered.contains("Balance: 0.00"));
    }

    #[test]
    fn render_statement_lists_entries_in_order() {
        let mut account = account("1001");
        account.deposit(dec("12.5")).unwrap();
        account.withdraw(dec("2")).unwrap();

        let rendered = account.render_statement();
        let deposit = rendered.find("Deposit: 12.50").unwrap();
        let withdrawal = rendered.find("Withdrawal: 2.00").unwrap();

        assert!(deposit < withdrawal);
        assert!(!rendered.contains("No transactions recorded."));
        assert!(rendered.contains("Balance: 10.50"));
    }

    #[test]
    fn password_is_compared_exactly() {
        let account = account("1001");

        assert!(account.check_password("secret"));
        assert!(!account.check_password("secret "));
        assert!(!account.check_password("Secret"));
    }
}
