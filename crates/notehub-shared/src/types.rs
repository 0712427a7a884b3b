use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Parse an id received from a client. Returns `None` for
            /// anything that is not a UUID.
            pub fn parse(s: &str) -> Option<Self> {
                Uuid::parse_str(s.trim()).ok().map(Self)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Primary key of a user record.
    UserId
);
uuid_id!(
    /// Primary key of an uploaded note.
    NoteId
);
uuid_id!(
    /// Primary key of a channel.
    ChannelId
);

/// Where an upload should be attached, as sent by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelTarget {
    /// The `"none"` sentinel, or no value at all.
    Library,
    /// Anything else; resolved against the channel collection later.
    Channel(String),
}

impl ChannelTarget {
    pub fn from_form(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") => Self::Library,
            Some(v) if v == crate::constants::NO_CHANNEL => Self::Library,
            Some(v) => Self::Channel(v.to_string()),
        }
    }

    /// The value persisted in the note's `channel` field.
    pub fn as_stored(&self) -> &str {
        match self {
            Self::Library => crate::constants::NO_CHANNEL,
            Self::Channel(id) => id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_garbage() {
        assert!(ChannelId::parse("not-a-uuid").is_none());
        let id = ChannelId::new();
        assert_eq!(ChannelId::parse(&id.to_string()), Some(id));
    }

    #[test]
    fn channel_target_sentinel() {
        assert_eq!(ChannelTarget::from_form(None), ChannelTarget::Library);
        assert_eq!(ChannelTarget::from_form(Some("none")), ChannelTarget::Library);
        assert_eq!(ChannelTarget::from_form(Some("  ")), ChannelTarget::Library);
        assert_eq!(
            ChannelTarget::from_form(Some("abc")),
            ChannelTarget::Channel("abc".into())
        );
        assert_eq!(ChannelTarget::Library.as_stored(), "none");
    }
}
