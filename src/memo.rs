// Memo codec - fixed-width correlation tags embedded in every transfer
//
// A memo is a 32-byte field holding a zero-padded ASCII tag:
//   order:<id8>:split:v1      settlement of an order
//   agentpay:<agent6>:<inv6>  agent invoice payment
//   sub:<id8>                 subscription renewal charge
//
// Decoding is total: malformed bytes classify as Unknown instead of
// erroring, because decode runs inside the reconciliation event loop which
// must keep going regardless of what shows up on-chain.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

pub const MEMO_SIZE: usize = 32;

const ORDER_PREFIX: &str = "order";
const AGENT_PAY_PREFIX: &str = "agentpay";
const SUBSCRIPTION_PREFIX: &str = "sub";

/// A fixed-width correlation tag carried by a ledger transfer.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Memo([u8; MEMO_SIZE]);

/// Decoded memo classification.
///
/// Identifier fields hold the truncated prefixes stored on-chain, not full
/// ids; resolving them back to domain records is the caller's lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MemoKind {
    Order {
        order_prefix: String,
    },
    AgentPayment {
        agent_prefix: String,
        invoice_prefix: String,
    },
    Subscription,
    Unknown,
}

impl Memo {
    /// Memo for an order settlement: `order:<id8>:split:v1`.
    pub fn for_order(order_id: &str) -> Self {
        let prefix: String = order_id.chars().take(8).collect();
        Self::from_tag(&format!("{}:{}:split:v1", ORDER_PREFIX, prefix))
    }

    /// Memo for an agent invoice payment: `agentpay:<agent6>:<invoice6>`.
    pub fn for_agent_payment(agent_id: &str, invoice_id: &str) -> Self {
        let agent: String = agent_id.chars().take(6).collect();
        let invoice: String = invoice_id.chars().take(6).collect();
        Self::from_tag(&format!("{}:{}:{}", AGENT_PAY_PREFIX, agent, invoice))
    }

    /// Memo for a subscription renewal charge: `sub:<id8>`.
    pub fn for_subscription(subscription_id: &str) -> Self {
        let prefix: String = subscription_id.chars().take(8).collect();
        Self::from_tag(&format!("{}:{}", SUBSCRIPTION_PREFIX, prefix))
    }

    /// Write an ASCII tag into a zero-padded fixed-size field. Tags longer
    /// than the field are truncated at the byte boundary.
    fn from_tag(tag: &str) -> Self {
        let mut bytes = [0u8; MEMO_SIZE];
        let len = tag.len().min(MEMO_SIZE);
        bytes[..len].copy_from_slice(&tag.as_bytes()[..len]);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; MEMO_SIZE] {
        &self.0
    }

    /// Parse a hex-encoded memo field (with or without a `0x` prefix).
    /// Shorter payloads are zero-padded; anything over 32 bytes or not valid
    /// hex is rejected.
    pub fn from_hex(hex_str: &str) -> Option<Self> {
        let stripped = hex_str.strip_prefix("0x").unwrap_or(hex_str);
        let decoded = hex::decode(stripped).ok()?;
        if decoded.len() > MEMO_SIZE {
            return None;
        }
        let mut bytes = [0u8; MEMO_SIZE];
        bytes[..decoded.len()].copy_from_slice(&decoded);
        Some(Self(bytes))
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Classify the memo. Never fails: any parse problem or unrecognized
    /// prefix yields `MemoKind::Unknown`.
    pub fn decode(&self) -> MemoKind {
        let trimmed: Vec<u8> = self.0.iter().copied().filter(|b| *b != 0).collect();
        let tag = match std::str::from_utf8(&trimmed) {
            Ok(s) => s.trim(),
            Err(_) => return MemoKind::Unknown,
        };

        let mut parts = tag.split(':');
        match parts.next() {
            Some(ORDER_PREFIX) => match parts.next() {
                Some(order_prefix) if !order_prefix.is_empty() => MemoKind::Order {
                    order_prefix: order_prefix.to_string(),
                },
                _ => MemoKind::Unknown,
            },
            Some(AGENT_PAY_PREFIX) => match (parts.next(), parts.next()) {
                (Some(agent), Some(invoice)) if !agent.is_empty() && !invoice.is_empty() => {
                    MemoKind::AgentPayment {
                        agent_prefix: agent.to_string(),
                        invoice_prefix: invoice.to_string(),
                    }
                }
                _ => MemoKind::Unknown,
            },
            Some(SUBSCRIPTION_PREFIX) => MemoKind::Subscription,
            _ => MemoKind::Unknown,
        }
    }
}

impl fmt::Debug for Memo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Memo({})", self.to_hex())
    }
}

impl fmt::Display for Memo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Memo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Memo {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex_str = String::deserialize(deserializer)?;
        Memo::from_hex(&hex_str)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid memo hex: {}", hex_str)))
    }
}
