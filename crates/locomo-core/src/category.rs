//! LoCoMo question categories.
//!
//! Numbering follows the free-response evaluator: 1 = multi-hop,
//! 2 = single-hop, 3 = temporal, 4 = open-domain, 5 = adversarial.
//! Anything else is `Unknown` and is scored with plain token F1.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    MultiHop,
    SingleHop,
    Temporal,
    OpenDomain,
    Adversarial,
    Unknown,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Self::MultiHop,
        Self::SingleHop,
        Self::Temporal,
        Self::OpenDomain,
        Self::Adversarial,
    ];

    pub fn from_id(id: i64) -> Self {
        match id {
            1 => Self::MultiHop,
            2 => Self::SingleHop,
            3 => Self::Temporal,
            4 => Self::OpenDomain,
            5 => Self::Adversarial,
            _ => Self::Unknown,
        }
    }

    /// Dataset id, `None` for `Unknown`.
    pub fn id(self) -> Option<u8> {
        match self {
            Self::MultiHop => Some(1),
            Self::SingleHop => Some(2),
            Self::Temporal => Some(3),
            Self::OpenDomain => Some(4),
            Self::Adversarial => Some(5),
            Self::Unknown => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::MultiHop => "multi_hop",
            Self::SingleHop => "single_hop",
            Self::Temporal => "temporal",
            Self::OpenDomain => "open_domain",
            Self::Adversarial => "adversarial",
            Self::Unknown => "unknown",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::MultiHop => "Multi-Hop",
            Self::SingleHop => "Single-Hop",
            Self::Temporal => "Temporal",
            Self::OpenDomain => "Open-Domain",
            Self::Adversarial => "Adversarial",
            Self::Unknown => "Unknown",
        }
    }

    pub fn is_adversarial(self) -> bool {
        self == Self::Adversarial
    }
}

impl Default for Category {
    fn default() -> Self {
        Self::Unknown
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        if let Ok(id) = s.parse::<i64>() {
            return Ok(Self::from_id(id));
        }
        match s.replace('-', "_").as_str() {
            "multi_hop" | "multihop" => Ok(Self::MultiHop),
            "single_hop" | "singlehop" => Ok(Self::SingleHop),
            "temporal" | "temporal_reasoning" => Ok(Self::Temporal),
            "open_domain" => Ok(Self::OpenDomain),
            "adversarial" => Ok(Self::Adversarial),
            "unknown" => Ok(Self::Unknown),
            _ => Err(format!("invalid category: {s}")),
        }
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Accepts a dataset id (`2`), a name (`"single_hop"`), or anything else,
/// which maps to `Unknown` instead of failing the whole record.
impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Id(i64),
            Name(String),
            Other(serde::de::IgnoredAny),
        }

        Ok(match Option::<Raw>::deserialize(deserializer)? {
            Some(Raw::Id(id)) => Self::from_id(id),
            Some(Raw::Name(name)) => name.parse().unwrap_or(Self::Unknown),
            Some(Raw::Other(_)) | None => Self::Unknown,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_id_and_back() {
        for cat in Category::ALL {
            let id = cat.id().unwrap();
            assert_eq!(Category::from_id(id as i64), cat);
        }
        assert_eq!(Category::from_id(0), Category::Unknown);
        assert_eq!(Category::from_id(42), Category::Unknown);
        assert_eq!(Category::Unknown.id(), None);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("multi_hop".parse::<Category>().unwrap(), Category::MultiHop);
        assert_eq!("Single-Hop".parse::<Category>().unwrap(), Category::SingleHop);
        assert_eq!(
            "temporal_reasoning".parse::<Category>().unwrap(),
            Category::Temporal
        );
        assert_eq!("5".parse::<Category>().unwrap(), Category::Adversarial);
        assert!("nonsense".parse::<Category>().is_err());
    }

    #[test]
    fn test_deserialize_lenient() {
        let cats: Vec<Category> =
            serde_json::from_str(r#"[1, "adversarial", "weird", null, 9, 2.5]"#).unwrap();
        assert_eq!(
            cats,
            vec![
                Category::MultiHop,
                Category::Adversarial,
                Category::Unknown,
                Category::Unknown,
                Category::Unknown,
                Category::Unknown,
            ]
        );
    }

    #[test]
    fn test_serialize_as_name() {
        let json = serde_json::to_string(&Category::OpenDomain).unwrap();
        assert_eq!(json, r#""open_domain""#);
    }
}
