//! CSV roster import for agents and accounts.

mod parser;

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use tracing::info;

use crate::workflows::allocation::domain::{Account, Agent};
use crate::workflows::allocation::repository::RepositoryError;
use crate::workflows::allocation::service::Repositories;

use parser::{AccountRow, AgentRow};

#[derive(Debug, thiserror::Error)]
pub enum RosterImportError {
    #[error("failed to read roster file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid roster CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid roster record on line {line}: {reason}")]
    InvalidRecord { line: u64, reason: String },
}

/// Agents and accounts loaded from CSV, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Roster {
    pub agents: Vec<Agent>,
    pub accounts: Vec<Account>,
}

impl Roster {
    pub fn from_paths<A: AsRef<Path>, C: AsRef<Path>>(
        agents: A,
        accounts: C,
    ) -> Result<Self, RosterImportError> {
        Ok(Self {
            agents: RosterImporter::agents_from_path(agents)?,
            accounts: RosterImporter::accounts_from_path(accounts)?,
        })
    }

    /// Store every agent and account, preserving file order.
    pub async fn seed(self, repositories: &Repositories) -> Result<(), RepositoryError> {
        let agents = self.agents.len();
        let accounts = self.accounts.len();
        repositories.agents.save_all(self.agents).await?;
        repositories.accounts.save_all(self.accounts).await?;
        info!(agents, accounts, "roster loaded");
        Ok(())
    }
}

pub struct RosterImporter;

impl RosterImporter {
    pub fn agents_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Agent>, RosterImportError> {
        let file = std::fs::File::open(path)?;
        Self::agents_from_reader(file)
    }

    pub fn agents_from_reader<R: Read>(reader: R) -> Result<Vec<Agent>, RosterImportError> {
        let agents = read_rows(reader, AgentRow::into_agent)?;
        ensure_unique(agents.iter().map(|(line, agent)| (*line, agent.id.0.as_str())))?;
        Ok(agents.into_iter().map(|(_, agent)| agent).collect())
    }

    pub fn accounts_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Account>, RosterImportError> {
        let file = std::fs::File::open(path)?;
        Self::accounts_from_reader(file)
    }

    pub fn accounts_from_reader<R: Read>(reader: R) -> Result<Vec<Account>, RosterImportError> {
        let accounts = read_rows(reader, AccountRow::into_account)?;
        ensure_unique(
            accounts
                .iter()
                .map(|(line, account)| (*line, account.id.0.as_str())),
        )?;
        Ok(accounts.into_iter().map(|(_, account)| account).collect())
    }
}

fn read_rows<R, Row, T>(
    reader: R,
    convert: impl Fn(Row) -> Result<T, String>,
) -> Result<Vec<(u64, T)>, RosterImportError>
where
    R: Read,
    Row: serde::de::DeserializeOwned,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let mut items = Vec::new();

    for record in csv_reader.records() {
        let record = record?;
        let line = record.position().map(|position| position.line()).unwrap_or(0);
        let row: Row = record.deserialize(Some(&headers))?;
        let item = convert(row).map_err(|reason| RosterImportError::InvalidRecord { line, reason })?;
        items.push((line, item));
    }

    Ok(items)
}

fn ensure_unique<'a>(
    ids: impl Iterator<Item = (u64, &'a str)>,
) -> Result<(), RosterImportError> {
    let mut seen = HashSet::new();
    for (line, id) in ids {
        if !seen.insert(id) {
            return Err(RosterImportError::InvalidRecord {
                line,
                reason: format!("duplicate id '{id}'"),
            });
        }
    }
    Ok(())
}
