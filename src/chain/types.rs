use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Field};
use crate::utils::is_valid_address;

/// A well-formed `0x` + 40 hex account or contract address
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    pub fn parse(raw: &str) -> Result<Self, ClientError> {
        let trimmed = raw.trim();
        if is_valid_address(trimmed) {
            Ok(Address(trimmed.to_string()))
        } else {
            Err(ClientError::Config(format!("'{}' is not a valid address", trimmed)))
        }
    }

    /// Parse user input, reporting a failure against the input `field`
    pub fn parse_field(raw: &str, field: Field) -> Result<Self, ClientError> {
        Address::parse(raw).map_err(|_| {
            ClientError::validation(field, format!("'{}' is not a valid address", raw.trim()))
        })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive key used by ledgers; display keeps the caller's casing
    pub fn normalized(&self) -> String {
        self.0.to_ascii_lowercase()
    }
}

impl FromStr for Address {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Network-assigned transaction hash
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TxHash(pub String);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Argument of a contract call
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CallArg {
    Address(Address),
    Uint(u128),
    Bool(bool),
    Str(String),
}

impl CallArg {
    pub fn as_address(&self) -> Option<&Address> {
        match self {
            CallArg::Address(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u128> {
        match self {
            CallArg::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CallArg::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CallArg::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for CallArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallArg::Address(a) => write!(f, "{}", a),
            CallArg::Uint(v) => write!(f, "{}", v),
            CallArg::Bool(v) => write!(f, "{}", v),
            CallArg::Str(s) => write!(f, "{:?}", s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalStatus {
    Active,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub status: ProposalStatus,
    pub votes_for: u128,
    pub votes_against: u128,
    pub end_time: u64,
}

impl Proposal {
    pub fn total_votes(&self) -> u128 {
        self.votes_for + self.votes_against
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoteChoice {
    For,
    Against,
}

impl VoteChoice {
    pub fn as_arg(self) -> CallArg {
        CallArg::Bool(matches!(self, VoteChoice::For))
    }
}

impl fmt::Display for VoteChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoteChoice::For => f.write_str("For"),
            VoteChoice::Against => f.write_str("Against"),
        }
    }
}

/// Decoded result of a view function
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerValue {
    Amount(u128),
    Proposals(Vec<Proposal>),
}

impl LedgerValue {
    pub fn amount(&self) -> Option<u128> {
        match self {
            LedgerValue::Amount(v) => Some(*v),
            _ => None,
        }
    }

    pub fn proposals(&self) -> Option<&[Proposal]> {
        match self {
            LedgerValue::Proposals(list) => Some(list),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptStatus {
    Success,
    Reverted(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub hash: TxHash,
    pub status: ReceiptStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_parse_trims_and_validates() {
        let addr = Address::parse(" 0x5FbDB2315678afecb367f032d93F642f64180aa3 ").unwrap();
        assert_eq!(addr.as_str(), "0x5FbDB2315678afecb367f032d93F642f64180aa3");
        assert_eq!(addr.normalized(), "0x5fbdb2315678afecb367f032d93f642f64180aa3");
        assert!("0x1234".parse::<Address>().is_err());
    }

    #[test]
    fn parse_errors_name_the_right_source() {
        let err = Address::parse("0xnothex").unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
        assert_eq!(err.field(), None);

        let err = Address::parse_field("bob", Field::Recipient).unwrap_err();
        assert_eq!(err.field(), Some(Field::Recipient));
        assert_eq!(err.to_string(), "Invalid recipient: 'bob' is not a valid address");
    }

    #[test]
    fn vote_choice_encodes_as_bool() {
        assert_eq!(VoteChoice::For.as_arg(), CallArg::Bool(true));
        assert_eq!(VoteChoice::Against.as_arg(), CallArg::Bool(false));
    }
}
