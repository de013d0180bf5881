//! Role heuristics as an ordered rule table.
//!
//! Advisory only: the labels bias review toward likely logo and hero assets.

use crate::candidate::Role;
use crate::config::Thresholds;

pub const LOGO_KEYWORDS: &[&str] = &["logo", "branding", "site-title"];
pub const HERO_KEYWORDS: &[&str] = &["hero", "banner", "intro", "splash"];

/// What the rules look at.
#[derive(Debug, Clone, Copy)]
pub struct RoleInput<'a> {
    /// Element and parent class strings, space-joined.
    pub classes: &'a str,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RolePredicate {
    /// Case-insensitive substring of the combined class string.
    ClassContains(Vec<String>),
    /// Both dimensions known and strictly larger than the bounds.
    LargerThan { width: u32, height: u32 },
    Any(Vec<RolePredicate>),
}

impl RolePredicate {
    pub fn class_contains(keywords: &[&str]) -> Self {
        RolePredicate::ClassContains(keywords.iter().map(|k| k.to_lowercase()).collect())
    }

    pub fn matches(&self, input: &RoleInput) -> bool {
        match self {
            RolePredicate::ClassContains(keywords) => {
                let classes = input.classes.to_lowercase();
                keywords.iter().any(|k| classes.contains(k.as_str()))
            }
            RolePredicate::LargerThan { width, height } => match (input.width, input.height) {
                (Some(w), Some(h)) => w > *width && h > *height,
                _ => false,
            },
            RolePredicate::Any(predicates) => predicates.iter().any(|p| p.matches(input)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoleRule {
    pub role: Role,
    pub predicate: RolePredicate,
}

/// Evaluated top to bottom; first match wins, [`Role::Other`] otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleRules {
    rules: Vec<RoleRule>,
}

impl RoleRules {
    pub fn new(rules: Vec<RoleRule>) -> Self {
        Self { rules }
    }

    pub fn from_thresholds(thresholds: &Thresholds) -> Self {
        let (hero_w, hero_h) = thresholds.hero_min;
        let (land_w, land_h) = thresholds.photo_landscape_min;
        let (port_w, port_h) = thresholds.photo_portrait_min;
        Self::new(vec![
            RoleRule {
                role: Role::Logo,
                predicate: RolePredicate::class_contains(LOGO_KEYWORDS),
            },
            RoleRule {
                role: Role::Hero,
                predicate: RolePredicate::Any(vec![
                    RolePredicate::class_contains(HERO_KEYWORDS),
                    RolePredicate::LargerThan {
                        width: hero_w,
                        height: hero_h,
                    },
                ]),
            },
            RoleRule {
                role: Role::Photo,
                predicate: RolePredicate::Any(vec![
                    RolePredicate::LargerThan {
                        width: land_w,
                        height: land_h,
                    },
                    RolePredicate::LargerThan {
                        width: port_w,
                        height: port_h,
                    },
                ]),
            },
        ])
    }

    pub fn rules(&self) -> &[RoleRule] {
        &self.rules
    }

    pub fn classify(&self, input: &RoleInput) -> Role {
        self.rules
            .iter()
            .find(|rule| rule.predicate.matches(input))
            .map(|rule| rule.role)
            .unwrap_or(Role::Other)
    }
}

impl Default for RoleRules {
    fn default() -> Self {
        Self::from_thresholds(&Thresholds::default())
    }
}
