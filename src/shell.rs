use crate::account::{AccountError, Outcome};
use crate::bank::Bank;
use crate::secret;
use rust_decimal::Decimal;
use std::{
    fs,
    io::{BufRead, Write},
    path::PathBuf,
    str::FromStr,
};
use tracing::warn;

const MENU: &str = "
[d] Deposit
[s] Withdraw
[t] Transfer
[c] Create account
[l] List accounts
[a] Select account
[e] Statement
[sc] Save
[q] Quit

=> ";

const SELECT_FIRST: &str = "Select an account first (option 'a').";

pub struct Shell<'a, R, W> {
    bank: &'a mut Bank,
    data_file: PathBuf,
    input: R,
    output: W,
    mask_secrets: bool,
    current: Option<String>,
}

impl<'a, R, W> Shell<'a, R, W>
where
    R: BufRead,
    W: Write,
{
    pub fn new(
        bank: &'a mut Bank,
        data_file: PathBuf,
        input: R,
        output: W,
        mask_secrets: bool,
    ) -> Self {
        Self {
            bank,
            data_file,
            input,
            output,
            mask_secrets,
            current: None,
        }
    }

    /// Serves menu commands until `q` or end of input, then saves.
    pub fn run(&mut self) -> anyhow::Result<()> {
        writeln!(self.output, "Welcome to the banking system")?;

        loop {
            let option = match self.read_line(MENU)? {
                Some(option) => option.to_lowercase(),
                None => break,
            };

            match option.as_str() {
                "c" => self.create_account()?,
                "l" => self.list_accounts()?,
                "a" => self.select_account()?,
                "d" => self.deposit()?,
                "s" => self.withdraw()?,
                "t" => self.transfer()?,
                "e" => self.statement()?,
                "sc" => {
                    self.save()?;
                    let path = fs::canonicalize(&self.data_file)
                        .unwrap_or_else(|_| self.data_file.clone());
                    writeln!(self.output, "Data saved to {}", path.display())?;
                }
                "q" => break,
                _ => writeln!(
                    self.output,
                    "Invalid operation, please select the desired operation again."
                )?,
            }
        }

        self.save()?;
        writeln!(self.output, "Exiting... Data saved. Goodbye!")?;
        Ok(())
    }

    fn create_account(&mut self) -> anyhow::Result<()> {
        if let Some(number) = self.register(None)? {
            writeln!(
                self.output,
                "Account created successfully! Account number: {number}"
            )?;
        }

        Ok(())
    }

    fn list_accounts(&mut self) -> anyhow::Result<()> {
        let accounts = self.bank.list_accounts();
        if accounts.is_empty() {
            writeln!(self.output, "No accounts registered.")?;
            return Ok(());
        }

        writeln!(self.output, "\nRegistered accounts:")?;
        for account in accounts {
            writeln!(
                self.output,
                "- No. {} | Holder: {} | Balance: {:.2}",
                account.number, account.holder_name, account.balance
            )?;
        }
        writeln!(self.output)?;

        Ok(())
    }

    fn select_account(&mut self) -> anyhow::Result<()> {
        let number = self.read_line("Enter the account number: ")?.unwrap_or_default();
        if number.is_empty() {
            writeln!(self.output, "Invalid account number.")?;
            return Ok(());
        }

        if self.bank.find_account(&number).is_none() {
            writeln!(self.output, "Account not found. Creating new account...")?;
            if self.register(Some(&number))?.is_some() {
                writeln!(
                    self.output,
                    "Account {number} created successfully and selected."
                )?;
                self.current = Some(number);
            }
            return Ok(());
        }

        let password = self.read_secret("Account password: ")?;
        let accepted = self
            .bank
            .find_account(&number)
            .map_or(false, |account| account.check_password(&password));

        if accepted {
            writeln!(self.output, "Account {number} selected.")?;
            self.current = Some(number);
        } else {
            warn!(account = %number, "rejected password");
            writeln!(self.output, "Incorrect password.")?;
        }

        Ok(())
    }

    fn deposit(&mut self) -> anyhow::Result<()> {
        let Some(number) = self.current.clone() else {
            writeln!(self.output, "{SELECT_FIRST}")?;
            return Ok(());
        };
        let Some(amount) = self.read_amount("Deposit amount: ")? else {
            return Ok(());
        };

        let outcome = match self.bank.find_account_mut(&number) {
            Some(account) => account.deposit(amount),
            None => Err(AccountError::InvalidDestination),
        };
        self.report(outcome)
    }

    fn withdraw(&mut self) -> anyhow::Result<()> {
        let Some(number) = self.current.clone() else {
            writeln!(self.output, "{SELECT_FIRST}")?;
            return Ok(());
        };
        let Some(amount) = self.read_amount("Withdrawal amount: ")? else {
            return Ok(());
        };

        let outcome = match self.bank.find_account_mut(&number) {
            Some(account) => account.withdraw(amount),
            None => Err(AccountError::InvalidDestination),
        };
        self.report(outcome)
    }

    fn transfer(&mut self) -> anyhow::Result<()> {
        let Some(number) = self.current.clone() else {
            writeln!(self.output, "{SELECT_FIRST}")?;
            return Ok(());
        };

        let destination = self
            .read_line("Destination account number: ")?
            .unwrap_or_default();
        if destination.is_empty() {
            writeln!(self.output, "Invalid account number.")?;
            return Ok(());
        }

        if self.bank.find_account(&destination).is_none() {
            writeln!(
                self.output,
                "Destination account not found. Creating new account..."
            )?;
            if self.register(Some(&destination))?.is_none() {
                return Ok(());
            }
            writeln!(
                self.output,
                "Destination account {destination} created successfully."
            )?;
        }

        let Some(amount) = self.read_amount("Transfer amount: ")? else {
            return Ok(());
        };

        let outcome = self
            .bank
            .transfer(&number, &destination, amount)
            .unwrap_or(Err(AccountError::InvalidDestination));
        self.report(outcome)
    }

    fn statement(&mut self) -> anyhow::Result<()> {
        let rendered = self
            .current
            .as_deref()
            .and_then(|number| self.bank.find_account(number))
            .map(|account| account.render_statement());

        match rendered {
            Some(rendered) => writeln!(self.output, "{rendered}")?,
            None => writeln!(self.output, "{SELECT_FIRST}")?,
        }

        Ok(())
    }

    /// Prompts for holder and password, then creates and saves the account.
    fn register(&mut self, number: Option<&str>) -> anyhow::Result<Option<String>> {
        let holder = self.read_line("Holder name: ")?.unwrap_or_default();
        if holder.is_empty() {
            writeln!(self.output, "Invalid name.")?;
            return Ok(None);
        }

        let password = self.read_secret("Choose a password (it will not be shown): ")?;
        if password.is_empty() {
            writeln!(self.output, "Invalid password. Account not created.")?;
            return Ok(None);
        }

        let number = self
            .bank
            .create_account(&holder, &password, number)
            .number
            .clone();
        self.save()?;

        Ok(Some(number))
    }

    fn report(&mut self, outcome: Outcome) -> anyhow::Result<()> {
        match outcome {
            Ok(confirmation) => {
                writeln!(self.output, "{confirmation}")?;
                self.save()
            }
            Err(error) => {
                writeln!(self.output, "{error}")?;
                Ok(())
            }
        }
    }

    fn save(&mut self) -> anyhow::Result<()> {
        self.bank.save(&self.data_file)
    }

    fn read_amount(&mut self, prompt: &str) -> anyhow::Result<Option<Decimal>> {
        let raw = self.read_line(prompt)?.unwrap_or_default().replace(',', ".");
        let parsed = Decimal::from_str(&raw).or_else(|_| Decimal::from_scientific(&raw));

        match parsed {
            Ok(amount) => Ok(Some(amount)),
            Err(_) => {
                writeln!(
                    self.output,
                    "Invalid input. Enter a number (use a dot or a comma)."
                )?;
                Ok(None)
            }
        }
    }

    fn read_secret(&mut self, prompt: &str) -> anyhow::Result<String> {
        if !self.mask_secrets {
            return Ok(self.read_line(prompt)?.unwrap_or_default());
        }

        write!(self.output, "{prompt}")?;
        self.output.flush()?;
        let secret = secret::read_masked()?;
        writeln!(self.output)?;

        Ok(secret.trim().to_string())
    }

    /// `None` once input is exhausted.
    fn read_line(&mut self, prompt: &str) -> anyhow::Result<Option<String>> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }

        Ok(Some(line.trim().to_string()))
    }
}
