use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A string that does not name any variant of the target enum.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {field} value: {value:?}")]
pub struct ParseEnumError {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $s)]
                $variant
            ),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ParseEnumError {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(ClassLevel {
    PreK => "PreK",
    Primary => "Primary",
    Middle => "Middle",
    High => "High",
    Academic => "Academic",
    Professional => "Professional",
});

impl ClassLevel {
    pub const ALL: [ClassLevel; 6] = [
        Self::PreK,
        Self::Primary,
        Self::Middle,
        Self::High,
        Self::Academic,
        Self::Professional,
    ];

    /// Human-readable label for pickers and reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::PreK => "Pre-K",
            Self::Primary => "Primary School",
            Self::Middle => "Middle School",
            Self::High => "High School",
            Self::Academic => "Academic",
            Self::Professional => "Professional",
        }
    }
}

str_enum!(BloomLevel {
    Remember => "Remember",
    Understand => "Understand",
    Apply => "Apply",
    Analyse => "Analyse",
    Evaluate => "Evaluate",
    Create => "Create",
});

impl BloomLevel {
    /// Canonical ranking, lowest cognitive level first.
    pub const ALL: [BloomLevel; 6] = [
        Self::Remember,
        Self::Understand,
        Self::Apply,
        Self::Analyse,
        Self::Evaluate,
        Self::Create,
    ];

    /// Zero-based rank within [`BloomLevel::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Key under which the objectives service groups objectives for this level.
    pub fn objective_key(&self) -> &'static str {
        match self {
            Self::Remember => "Remembering",
            Self::Understand => "Understanding",
            Self::Apply => "Applying",
            Self::Analyse => "Analyzing",
            Self::Evaluate => "Evaluating",
            Self::Create => "Creating",
        }
    }
}

str_enum!(Framework {
    RevisedBloom => "Revised Bloom Taxonomy",
});

impl Default for Framework {
    fn default() -> Self {
        Self::RevisedBloom
    }
}
