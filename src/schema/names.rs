use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Schema kinds published in the price-transparency schema repository.
///
/// The string form is the directory (and file stem) the schema lives under in
/// the repository checkout, and is what the index report prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SchemaName {
    TableOfContents,
    AllowedAmounts,
    InNetworkRates,
    ProviderReference,
}

impl SchemaName {
    pub const ALL: [SchemaName; 4] = [
        SchemaName::TableOfContents,
        SchemaName::AllowedAmounts,
        SchemaName::InNetworkRates,
        SchemaName::ProviderReference,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaName::TableOfContents => "table-of-contents",
            SchemaName::AllowedAmounts => "allowed-amounts",
            SchemaName::InNetworkRates => "in-network-rates",
            SchemaName::ProviderReference => "provider-reference",
        }
    }

    /// Reference roles whose locations are followed after validating a
    /// document of this kind. Empty for leaf kinds.
    pub fn followed_roles(&self) -> &'static [ReferenceRole] {
        match self {
            SchemaName::TableOfContents => &[ReferenceRole::AllowedAmount, ReferenceRole::InNetwork],
            SchemaName::InNetworkRates => &[ReferenceRole::ProviderReference],
            SchemaName::AllowedAmounts | SchemaName::ProviderReference => &[],
        }
    }
}

impl fmt::Display for SchemaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SchemaName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| format!("unknown schema name '{s}'"))
    }
}

/// Role of a discovered location; decides the schema it is validated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceRole {
    AllowedAmount,
    InNetwork,
    ProviderReference,
}

impl ReferenceRole {
    pub fn schema(&self) -> SchemaName {
        match self {
            ReferenceRole::AllowedAmount => SchemaName::AllowedAmounts,
            ReferenceRole::InNetwork => SchemaName::InNetworkRates,
            ReferenceRole::ProviderReference => SchemaName::ProviderReference,
        }
    }
}
