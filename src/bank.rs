use crate::account::{
    default_overdraft_limit, Account, Outcome, DEFAULT_WITHDRAWAL_LIMIT_COUNT,
};
use anyhow::Context;
use rust_decimal::Decimal;
use serde::{
    de::{MapAccess, Visitor},
    ser::SerializeStruct,
    Deserialize, Deserializer, Serialize, Serializer,
};
use std::{fmt, fs, io::Write, path::Path};
use tracing::info;

pub const FIRST_ACCOUNT_NUMBER: u64 = 1001;

fn first_account_number() -> u64 {
    FIRST_ACCOUNT_NUMBER
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bank {
    // insertion order, numbers unique
    accounts: Vec<Account>,
    next_account_number: u64,
}

impl Bank {
    pub fn new() -> Self {
        Self {
            accounts: Vec::new(),
            next_account_number: FIRST_ACCOUNT_NUMBER,
        }
    }

    pub fn next_account_number(&self) -> u64 {
        self.next_account_number
    }

    pub fn create_account(
        &mut self,
        holder_name: &str,
        password: &str,
        number: Option<&str>,
    ) -> &mut Account {
        self.create_account_with_limits(
            holder_name,
            password,
            number,
            default_overdraft_limit(),
            DEFAULT_WITHDRAWAL_LIMIT_COUNT,
        )
    }

    /// An explicit `number` replaces any account already registered under it.
    pub fn create_account_with_limits(
        &mut self,
        holder_name: &str,
        password: &str,
        number: Option<&str>,
        overdraft_limit: Decimal,
        withdrawal_limit_count: u32,
    ) -> &mut Account {
        let number = match number {
            Some(number) => number.to_string(),
            None => {
                let number = self.next_account_number.to_string();
                self.next_account_number += 1;
                number
            }
        };

        info!(account = %number, holder = holder_name, "account created");

        let account = Account::new(
            number,
            holder_name.to_string(),
            password.to_string(),
            overdraft_limit,
            withdrawal_limit_count,
        );
        self.insert(account)
    }

    pub fn list_accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn find_account(&self, number: &str) -> Option<&Account> {
        self.accounts.iter().find(|account| account.number == number)
    }

    pub fn find_account_mut(&mut self, number: &str) -> Option<&mut Account> {
        self.accounts
            .iter_mut()
            .find(|account| account.number == number)
    }

    /// Returns `None` when the source account does not exist.
    pub fn transfer(&mut self, from: &str, to: &str, amount: Decimal) -> Option<Outcome> {
        let source = self.position(from)?;

        let destination = match self.position(to) {
            Some(destination) if destination == source => {
                return Some(self.accounts[source].transfer_to_self(amount))
            }
            Some(destination) => destination,
            None => return Some(self.accounts[source].transfer(None, amount)),
        };

        let (source, destination) = if source < destination {
            let (left, right) = self.accounts.split_at_mut(destination);
            (&mut left[source], &mut right[0])
        } else {
            let (left, right) = self.accounts.split_at_mut(source);
            (&mut right[0], &mut left[destination])
        };

        Some(source.transfer(Some(destination), amount))
    }

    pub fn save<P>(&self, path: P) -> anyhow::Result<()>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let contents = serde_json::to_string_pretty(self).context("Failed to encode accounts")?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        info!(path = %path.display(), accounts = self.accounts.len(), "saved");
        Ok(())
    }

    /// A missing file leaves the registry untouched.
    pub fn load<P>(&mut self, path: P) -> anyhow::Result<()>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "no data file, starting fresh");
            return Ok(());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let stored: Bank = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        self.next_account_number = stored.next_account_number;
        for account in stored.accounts {
            self.insert(account);
        }

        info!(path = %path.display(), accounts = self.accounts.len(), "loaded");
        Ok(())
    }

    pub fn write_accounts_csv<W>(&self, writer: W) -> Result<(), csv::Error>
    where
        W: Write,
    {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record([
            "number",
            "holder",
            "balance",
            "withdrawals",
            "withdrawal_limit",
            "overdraft_limit",
        ])?;

        for account in &self.accounts {
            wtr.serialize((
                &account.number,
                &account.holder_name,
                format!("{:.2}", account.balance),
                account.withdrawal_count,
                account.withdrawal_limit_count,
                format!("{:.2}", account.overdraft_limit),
            ))?;
        }

        wtr.flush()?;
        Ok(())
    }

    fn position(&self, number: &str) -> Option<usize> {
        self.accounts
            .iter()
            .position(|account| account.number == number)
    }

    fn insert(&mut self, account: Account) -> &mut Account {
        let index = match self.position(&account.number) {
            Some(index) => {
                self.accounts[index] = account;
                index
            }
            None => {
                self.accounts.push(account);
                self.accounts.len() - 1
            }
        };

        &mut self.accounts[index]
    }
}

impl Default for Bank {
    fn default() -> Self {
        Self::new()
    }
}

struct AccountsByNumber<'a>(&'a [Account]);

impl Serialize for AccountsByNumber<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_map(self.0.iter().map(|account| (&account.number, account)))
    }
}

impl Serialize for Bank {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Bank", 2)?;
        state.serialize_field("nextAccountNumber", &self.next_account_number)?;
        state.serialize_field("accounts", &AccountsByNumber(&self.accounts))?;
        state.end()
    }
}

/// Accounts in file order. The object key wins over the stored `number`.
#[derive(Default)]
struct StoredAccounts(Vec<Account>);

impl<'de> Deserialize<'de> for StoredAccounts {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct StoredAccountsVisitor;

        impl<'de> Visitor<'de> for StoredAccountsVisitor {
            type Value = StoredAccounts;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of account number to account")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut accounts: Vec<Account> = Vec::new();

                while let Some((number, mut account)) = map.next_entry::<String, Account>()? {
                    account.number = number;
                    match accounts.iter_mut().find(|a| a.number == account.number) {
                        Some(existing) => *existing = account,
                        None => accounts.push(account),
                    }
                }

                Ok(StoredAccounts(accounts))
            }
        }

        deserializer.deserialize_map(StoredAccountsVisitor)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredBank {
    #[serde(default = "first_account_number")]
    next_account_number: u64,
    #[serde(default)]
    accounts: StoredAccounts,
}

impl<'de> Deserialize<'de> for Bank {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let stored = StoredBank::deserialize(deserializer)?;

        Ok(Self {
            accounts: stored.accounts.0,
            next_account_number: stored.next_account_number,
        })
    }
}
