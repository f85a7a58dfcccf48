use std::fmt;

use inbox_types::{Address, StaticType};
use serde::{Deserialize, Serialize};

/// Namespace prefixed to every inbox event id.
pub const EVENT_NAMESPACE: &str = "flow";

/// Events emitted by inbox operations. Each successful operation emits
/// exactly one; failed operations emit none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InboxEvent {
    ValuePublished {
        provider: Address,
        recipient: Address,
        name: String,
        #[serde(rename = "type")]
        value_type: StaticType,
    },
    ValueUnpublished {
        provider: Address,
        name: String,
    },
    ValueClaimed {
        provider: Address,
        recipient: Address,
        name: String,
    },
}

impl InboxEvent {
    pub fn type_name(&self) -> &'static str {
        match self {
            InboxEvent::ValuePublished { .. } => "InboxValuePublished",
            InboxEvent::ValueUnpublished { .. } => "InboxValueUnpublished",
            InboxEvent::ValueClaimed { .. } => "InboxValueClaimed",
        }
    }

    /// e.g. `flow.InboxValueClaimed`
    pub fn qualified_id(&self) -> String {
        format!("{EVENT_NAMESPACE}.{}", self.type_name())
    }

    pub fn provider(&self) -> Address {
        match self {
            InboxEvent::ValuePublished { provider, .. }
            | InboxEvent::ValueUnpublished { provider, .. }
            | InboxEvent::ValueClaimed { provider, .. } => *provider,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            InboxEvent::ValuePublished { name, .. }
            | InboxEvent::ValueUnpublished { name, .. }
            | InboxEvent::ValueClaimed { name, .. } => name,
        }
    }
}

impl fmt::Display for InboxEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.qualified_id())?;
        match self {
            InboxEvent::ValuePublished {
                provider,
                recipient,
                name,
                value_type,
            } => write!(
                f,
                "provider: {provider}, recipient: {recipient}, name: {name:?}, type: Type<{value_type}>()"
            )?,
            InboxEvent::ValueUnpublished { provider, name } => {
                write!(f, "provider: {provider}, name: {name:?}")?
            }
            InboxEvent::ValueClaimed {
                provider,
                recipient,
                name,
            } => write!(f, "provider: {provider}, recipient: {recipient}, name: {name:?}")?,
        }
        f.write_str(")")
    }
}
