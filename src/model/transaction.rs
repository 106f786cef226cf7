use crate::model::Amount;
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The columns of an activity file, in the order they are written.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityColumn {
    TransactionDate,
    PostDate,
    Description,
    Amount,
    Balance,
    Raw,
}

serde_plain::derive_display_from_serialize!(ActivityColumn);
serde_plain::derive_fromstr_from_deserialize!(ActivityColumn);

impl ActivityColumn {
    pub const ALL: [ActivityColumn; 6] = [
        ActivityColumn::TransactionDate,
        ActivityColumn::PostDate,
        ActivityColumn::Description,
        ActivityColumn::Amount,
        ActivityColumn::Balance,
        ActivityColumn::Raw,
    ];
}

/// One transaction row recovered from a statement.
///
/// Records are created once during extraction and are never changed afterwards. `raw` keeps the
/// source line (or the table cells joined with `" | "`) so that a questionable row can be traced
/// back to the statement.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    transaction_date: String,
    post_date: String,
    description: String,
    amount: Amount,
    #[serde(with = "optional_amount")]
    balance: Option<Amount>,
    raw: String,
}

impl ActivityRecord {
    pub fn new(
        transaction_date: impl Into<String>,
        post_date: impl Into<String>,
        description: impl Into<String>,
        amount: Amount,
        balance: Option<Amount>,
        raw: impl Into<String>,
    ) -> Self {
        Self {
            transaction_date: transaction_date.into(),
            post_date: post_date.into(),
            description: description.into(),
            amount,
            balance,
            raw: raw.into(),
        }
    }

    pub fn transaction_date(&self) -> &str {
        &self.transaction_date
    }

    pub fn post_date(&self) -> &str {
        &self.post_date
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn balance(&self) -> Option<Amount> {
        self.balance
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// Writes `records` as an activity CSV to `path`, always including the header row. The file is
/// only replaced once every row has been serialized.
pub fn write_activity_csv(path: &Path, records: &[ActivityRecord]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    wtr.write_record(ActivityColumn::ALL.iter().map(ActivityColumn::to_string))
        .context("Unable to write activity header")?;
    for record in records {
        wtr.serialize(record)
            .with_context(|| format!("Unable to serialize activity row '{}'", record.raw()))?;
    }
    let data = wtr.into_inner().context("Unable to flush activity CSV")?;
    crate::utils::write_atomic(path, data)
}

/// Reads an activity CSV written by `write_activity_csv`.
pub fn read_activity_csv(path: &Path) -> Result<Vec<ActivityRecord>> {
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("Unable to open activity file {}", path.display()))?;
    let mut records = Vec::new();
    for result in rdr.deserialize() {
        let record: ActivityRecord =
            result.with_context(|| format!("Malformed activity row in {}", path.display()))?;
        records.push(record);
    }
    Ok(records)
}

mod optional_amount {
    use crate::model::Amount;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::str::FromStr;

    pub(super) fn serialize<S>(value: &Option<Amount>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(amount) => serializer.serialize_str(&amount.to_string()),
            None => serializer.serialize_str(""),
        }
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Option<Amount>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if s.trim().is_empty() {
            return Ok(None);
        }
        Amount::from_str(&s)
            .map(Some)
            .map_err(serde::de::Error::custom)
    }
}
