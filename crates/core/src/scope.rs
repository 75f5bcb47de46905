//! Scopes, scope ids and per-scope eligibility
//!
//! A scope is an addressable tier that may hold an override for a key.
//! Precedence is fixed (lowest to highest):
//!
//! ```text
//! global < server < channel < user < meeting
//! ```
//!
//! Override records are keyed by a composite scope id:
//! `global#default`, `server#<guild>`, `channel#<guild>#<channel>`,
//! `user#<guild>#<user>`, `meeting#<meeting>`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::registry::ConfigEntry;
use crate::{CoreError, ResolveContext, ValueType};

/// Scope kind, ordered by precedence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    Global,
    Server,
    Channel,
    User,
    Meeting,
}

impl ScopeKind {
    /// All scopes, lowest precedence first
    pub const PRECEDENCE: [ScopeKind; 5] = [
        ScopeKind::Global,
        ScopeKind::Server,
        ScopeKind::Channel,
        ScopeKind::User,
        ScopeKind::Meeting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Server => "server",
            Self::Channel => "channel",
            Self::User => "user",
            Self::Meeting => "meeting",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "global" => Some(Self::Global),
            "server" => Some(Self::Server),
            "channel" => Some(Self::Channel),
            "user" => Some(Self::User),
            "meeting" => Some(Self::Meeting),
            _ => None,
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who may edit a key at a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Superadmin,
    Admin,
    Member,
}

/// How a key is presented at a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Control {
    Toggle,
    TriState,
    Select,
    Number,
    Text,
}

impl Control {
    /// Default control for a value type
    pub fn infer(value_type: &ValueType) -> Self {
        match value_type {
            ValueType::Boolean => Self::Toggle,
            ValueType::Number { .. } => Self::Number,
            ValueType::Select { .. } => Self::Select,
            ValueType::String => Self::Text,
        }
    }
}

/// Per-scope eligibility of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeConfig {
    pub enabled: bool,
    #[serde(default)]
    pub required: bool,
    pub role: Role,
    pub control: Control,
}

impl ScopeConfig {
    pub fn enabled(role: Role, control: Control) -> Self {
        Self {
            enabled: true,
            required: false,
            role,
            control,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Eligibility of `entry` at `scope`.
///
/// Entries without a config for the scope, or with `enabled: false`,
/// yield a synthetic disabled result. Its role is `superadmin` for the
/// global scope and `admin` elsewhere; its control is inferred from the
/// UI hint or the value type.
pub fn resolve_scope(entry: &ConfigEntry, scope: ScopeKind) -> ScopeConfig {
    match entry.scopes.get(&scope) {
        Some(config) if config.enabled => *config,
        _ => ScopeConfig {
            enabled: false,
            required: false,
            role: if scope == ScopeKind::Global {
                Role::Superadmin
            } else {
                Role::Admin
            },
            control: entry
                .ui
                .control
                .unwrap_or_else(|| Control::infer(&entry.value_type)),
        },
    }
}

/// A concrete, addressable scope
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ScopeRef {
    Global,
    Server {
        guild_id: String,
    },
    Channel {
        guild_id: String,
        channel_id: String,
    },
    User {
        guild_id: String,
        user_id: String,
    },
    Meeting {
        meeting_id: String,
    },
}

impl ScopeRef {
    pub fn kind(&self) -> ScopeKind {
        match self {
            Self::Global => ScopeKind::Global,
            Self::Server { .. } => ScopeKind::Server,
            Self::Channel { .. } => ScopeKind::Channel,
            Self::User { .. } => ScopeKind::User,
            Self::Meeting { .. } => ScopeKind::Meeting,
        }
    }

    /// Composite id used as the override store partition key
    pub fn scope_id(&self) -> String {
        match self {
            Self::Global => "global#default".to_string(),
            Self::Server { guild_id } => format!("server#{}", guild_id),
            Self::Channel {
                guild_id,
                channel_id,
            } => format!("channel#{}#{}", guild_id, channel_id),
            Self::User { guild_id, user_id } => format!("user#{}#{}", guild_id, user_id),
            Self::Meeting { meeting_id } => format!("meeting#{}", meeting_id),
        }
    }

    /// Parse a composite scope id
    pub fn parse(scope_id: &str) -> Result<Self, CoreError> {
        let invalid = || CoreError::InvalidScopeId(scope_id.to_string());
        let parts: Vec<&str> = scope_id.split('#').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(invalid());
        }

        match parts.as_slice() {
            ["global", "default"] => Ok(Self::Global),
            ["server", guild] => Ok(Self::Server {
                guild_id: guild.to_string(),
            }),
            ["channel", guild, channel] => Ok(Self::Channel {
                guild_id: guild.to_string(),
                channel_id: channel.to_string(),
            }),
            ["user", guild, user] => Ok(Self::User {
                guild_id: guild.to_string(),
                user_id: user.to_string(),
            }),
            ["meeting", meeting] => Ok(Self::Meeting {
                meeting_id: meeting.to_string(),
            }),
            _ => Err(invalid()),
        }
    }

    /// Build the scope of `kind` for a context.
    ///
    /// Fails when the context lacks an owning id the scope needs; asking
    /// for a server scope without a guild is a caller bug.
    pub fn for_context(kind: ScopeKind, ctx: &ResolveContext) -> Result<Self, CoreError> {
        let need = |field: &'static str, value: &Option<String>| {
            value.clone().ok_or(CoreError::MissingScopeContext {
                scope: kind,
                field,
            })
        };

        Ok(match kind {
            ScopeKind::Global => Self::Global,
            ScopeKind::Server => Self::Server {
                guild_id: need("guild_id", &ctx.guild_id)?,
            },
            ScopeKind::Channel => Self::Channel {
                guild_id: need("guild_id", &ctx.guild_id)?,
                channel_id: need("channel_id", &ctx.channel_id)?,
            },
            ScopeKind::User => Self::User {
                guild_id: need("guild_id", &ctx.guild_id)?,
                user_id: need("user_id", &ctx.user_id)?,
            },
            ScopeKind::Meeting => Self::Meeting {
                meeting_id: need("meeting_id", &ctx.meeting_id)?,
            },
        })
    }

    /// Every scope the context can address, lowest precedence first
    pub fn chain_for(ctx: &ResolveContext) -> Vec<Self> {
        ScopeKind::PRECEDENCE
            .iter()
            .filter_map(|kind| Self::for_context(*kind, ctx).ok())
            .collect()
    }
}

impl fmt::Display for ScopeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.scope_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unspecified_scope_is_disabled() {
        let entry = ConfigEntry::boolean("notes.enabled", true);

        let global = resolve_scope(&entry, ScopeKind::Global);
        assert!(!global.enabled);
        assert_eq!(global.role, Role::Superadmin);
        assert_eq!(global.control, Control::Toggle);

        let server = resolve_scope(&entry, ScopeKind::Server);
        assert!(!server.enabled);
        assert_eq!(server.role, Role::Admin);
    }

    #[test]
    fn test_explicitly_disabled_scope_uses_synthetic_defaults() {
        let entry = ConfigEntry::number("limits.x", 1.0).scope(
            ScopeKind::Channel,
            ScopeConfig {
                enabled: false,
                required: true,
                role: Role::Member,
                control: Control::Text,
            },
        );

        let channel = resolve_scope(&entry, ScopeKind::Channel);
        assert!(!channel.enabled);
        assert!(!channel.required);
        assert_eq!(channel.role, Role::Admin);
        assert_eq!(channel.control, Control::Number);
    }

    #[test]
    fn test_scope_id_format() {
        let ctx = ResolveContext::new()
            .with_guild("g1")
            .with_channel("c1")
            .with_user("u1")
            .with_meeting("m1");

        let ids: Vec<String> = ScopeRef::chain_for(&ctx)
            .iter()
            .map(ScopeRef::scope_id)
            .collect();
        assert_eq!(
            ids,
            vec![
                "global#default",
                "server#g1",
                "channel#g1#c1",
                "user#g1#u1",
                "meeting#m1"
            ]
        );

        for id in &ids {
            assert_eq!(&ScopeRef::parse(id).unwrap().scope_id(), id);
        }
        assert!(ScopeRef::parse("server#").is_err());
        assert!(ScopeRef::parse("team#x").is_err());
    }

    #[test]
    fn test_missing_scope_context() {
        let ctx = ResolveContext::new().with_user("u1");
        let err = ScopeRef::for_context(ScopeKind::Server, &ctx).unwrap_err();
        assert!(matches!(
            err,
            CoreError::MissingScopeContext {
                scope: ScopeKind::Server,
                field: "guild_id"
            }
        ));

        // user scope needs the guild as well
        assert!(ScopeRef::for_context(ScopeKind::User, &ctx).is_err());
        assert_eq!(ScopeRef::chain_for(&ctx), vec![ScopeRef::Global]);
    }
}
