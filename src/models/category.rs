use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

// ============================================================================
// Category
// ============================================================================

/// The fixed set of component categories a generation can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Category {
    #[default]
    #[serde(rename = "3d-scenes")]
    ThreeDScenes,
    #[serde(rename = "scroll-animations")]
    ScrollAnimations,
    #[serde(rename = "micro-interactions")]
    MicroInteractions,
    #[serde(rename = "shader-backgrounds")]
    ShaderBackgrounds,
    #[serde(rename = "page-transitions")]
    PageTransitions,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::ThreeDScenes,
        Category::ScrollAnimations,
        Category::MicroInteractions,
        Category::ShaderBackgrounds,
        Category::PageTransitions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::ThreeDScenes => "3d-scenes",
            Category::ScrollAnimations => "scroll-animations",
            Category::MicroInteractions => "micro-interactions",
            Category::ShaderBackgrounds => "shader-backgrounds",
            Category::PageTransitions => "page-transitions",
        }
    }

    /// Human label used by the gallery navigation.
    pub fn label(&self) -> &'static str {
        match self {
            Category::ThreeDScenes => "3D Scenes",
            Category::ScrollAnimations => "Scroll Animations",
            Category::MicroInteractions => "Micro-Interactions",
            Category::ShaderBackgrounds => "Shader Backgrounds",
            Category::PageTransitions => "Page Transitions",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "unknown category '{s}', expected one of: {}",
                    Category::ALL.map(|c| c.as_str()).join(", ")
                ))
            })
    }
}

// ============================================================================
// CategoryFilter
// ============================================================================

/// Gallery filter: everything, or a single category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn matches(&self, category: Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(c) => *c == category,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryFilter::All => "all",
            CategoryFilter::Only(c) => c.as_str(),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            return Ok(CategoryFilter::All);
        }
        s.parse().map(CategoryFilter::Only)
    }
}

impl Serialize for CategoryFilter {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CategoryFilter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
