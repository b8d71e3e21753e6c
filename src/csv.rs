use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Action;
use crate::model::{MemberBalance, Settlement};

/// Errors that can occur when parsing csv rows
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("line {line}: failed to parse row: {source}")]
    Parse { line: usize, source: csv::Error },

    #[error("line {line}: unrecognized action type '{action}'")]
    UnrecognizedType { line: usize, action: String },

    #[error("line {line}: {action} missing {field}")]
    MissingField {
        line: usize,
        action: String,
        field: &'static str,
    },
}

#[derive(Debug, Deserialize)]
struct InputRow {
    r#type: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    amount: Option<String>,
    #[serde(default)]
    payees: Option<String>,
    #[serde(default)]
    memo: Option<String>,
}

#[derive(Debug, Serialize)]
struct SettlementRow<'a> {
    from: &'a str,
    to: &'a str,
    amount: i64,
}

#[derive(Debug, Serialize)]
struct BalanceRow<'a> {
    member: &'a str,
    balance: i64,
    status: String,
}

/// Read an action script.
///
/// Columns are `type,name,amount,payees,memo`:
/// - `event,<event name>`
/// - `member,<name>`
/// - `rename,<name>,,,<new name>`
/// - `remove,<name>`
/// - `payment,<payer>,<amount>,<payee;payee;...>,<memo>` (no payees: shared by all)
/// - `reset`
pub fn read_actions<R: io::Read>(reader: R) -> impl Iterator<Item = Result<Action, CsvError>> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    reader
        .into_deserialize::<InputRow>()
        .enumerate()
        .map(|(idx, result)| {
            let line = idx + 2; // 1-indexed, skip header
            let row = result.map_err(|source| CsvError::Parse { line, source })?;
            parse_row(line, row)
        })
}

fn parse_row(line: usize, row: InputRow) -> Result<Action, CsvError> {
    let action = row.r#type.to_lowercase();
    let required = |value: Option<String>, field: &'static str| {
        value.filter(|v| !v.is_empty()).ok_or_else(|| CsvError::MissingField {
            line,
            action: action.clone(),
            field,
        })
    };

    match action.as_str() {
        "event" => Ok(Action::SetEventName(required(row.name, "name")?)),
        "member" => Ok(Action::AddMember(required(row.name, "name")?)),
        "rename" => Ok(Action::RenameMember {
            from: required(row.name, "name")?,
            to: required(row.memo, "new name")?,
        }),
        "remove" => Ok(Action::RemoveMember(required(row.name, "name")?)),
        "payment" => Ok(Action::AddPayment {
            payer: required(row.name, "payer")?,
            amount: required(row.amount, "amount")?,
            payees: row
                .payees
                .unwrap_or_default()
                .split(';')
                .map(str::trim)
                .filter(|payee| !payee.is_empty())
                .map(str::to_string)
                .collect(),
            memo: row.memo.filter(|memo| !memo.is_empty()),
        }),
        "reset" => Ok(Action::Reset),
        _ => Err(CsvError::UnrecognizedType {
            line,
            action: row.r#type,
        }),
    }
}

/// Write the settlement plan as `from,to,amount` csv.
pub fn write_settlements<W: io::Write>(writer: W, settlements: &[Settlement]) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);
    if settlements.is_empty() {
        writer.write_record(["from", "to", "amount"])?;
    }
    for settlement in settlements {
        writer.serialize(SettlementRow {
            from: &settlement.from,
            to: &settlement.to,
            amount: settlement.amount.get(),
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Write member balances as `member,balance,status` csv.
pub fn write_balances<W: io::Write>(writer: W, balances: &[MemberBalance]) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);
    if balances.is_empty() {
        writer.write_record(["member", "balance", "status"])?;
    }
    for balance in balances {
        writer.serialize(BalanceRow {
            member: &balance.member_name,
            balance: balance.balance.value(),
            status: balance.status.to_string(),
        })?;
    }
    writer.flush()?;
    Ok(())
}
