//! Enum types for imgboard entities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Entity type discriminator used in errors and log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Board,
    Thread,
    Post,
    Author,
    Image,
}

impl EntityType {
    /// All entity types, in declaration order.
    pub const ALL: [EntityType; 5] = [
        EntityType::Board,
        EntityType::Thread,
        EntityType::Post,
        EntityType::Author,
        EntityType::Image,
    ];

    /// Lowercase name, as used in table names and cache namespaces.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Board => "board",
            EntityType::Thread => "thread",
            EntityType::Post => "post",
            EntityType::Author => "author",
            EntityType::Image => "image",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            EntityType::Board => "Board",
            EntityType::Thread => "Thread",
            EntityType::Post => "Post",
            EntityType::Author => "Author",
            EntityType::Image => "Image",
        };
        write!(f, "{}", value)
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "board" => Ok(EntityType::Board),
            "thread" => Ok(EntityType::Thread),
            "post" => Ok(EntityType::Post),
            "author" => Ok(EntityType::Author),
            "image" => Ok(EntityType::Image),
            _ => Err(format!("Invalid EntityType: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_type_display_from_str() {
        for entity_type in EntityType::ALL {
            let rendered = entity_type.to_string();
            let parsed: EntityType = rendered.parse().expect("display output should parse");
            assert_eq!(parsed, entity_type);
        }
    }

    #[test]
    fn test_entity_type_from_str_rejects_unknown() {
        assert!("Trajectory".parse::<EntityType>().is_err());
    }

    #[test]
    fn test_entity_type_as_str_is_lowercase() {
        assert_eq!(EntityType::Thread.as_str(), "thread");
        assert_eq!(EntityType::Author.as_str(), "author");
    }
}
