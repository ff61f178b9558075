//! Behavior profiles and the scripts they expand into.
//!
//! A profile is pure data: an ordered list of step templates plus a think
//! time. [`BehaviorProfile::script`] resolves the templates against the
//! configured [`Routes`] for one session.

use crate::config::Routes;
use crate::sample::HttpMethod;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Search terms a `normal` user picks from.
pub const SEARCH_TERMS: [&str; 3] = ["notebook", "mouse", "monitor"];

/// How a synthetic user navigates after logging in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum BehaviorProfile {
    #[default]
    Normal,
    Heavy,
    Fast,
}

#[derive(Debug, Clone, Copy)]
enum Target {
    Dashboard,
    Listing,
    Search(Option<&'static str>),
    Page(u32),
    CreateForm,
}

#[derive(Debug, Clone, Copy)]
struct StepTemplate {
    target: Target,
    label: &'static str,
}

const fn step(target: Target, label: &'static str) -> StepTemplate {
    StepTemplate { target, label }
}

/// Immutable script-and-delay record behind each profile.
#[derive(Debug)]
pub struct ProfileSpec {
    pub think_time: Duration,
    steps: &'static [StepTemplate],
}

const NORMAL: ProfileSpec = ProfileSpec {
    think_time: Duration::from_millis(200),
    steps: &[
        step(Target::Dashboard, "Dashboard"),
        step(Target::Listing, "Product list"),
        step(Target::Search(None), "Search"),
        step(Target::Page(1), "Pagination"),
        step(Target::CreateForm, "Create form"),
    ],
};

const HEAVY: ProfileSpec = ProfileSpec {
    think_time: Duration::from_millis(100),
    steps: &[
        step(Target::Dashboard, "Dashboard"),
        step(Target::Listing, "Product list"),
        step(Target::Search(Some("notebook")), "Search notebook"),
        step(Target::Search(Some("mouse")), "Search mouse"),
        step(Target::Page(1), "Page 1"),
        step(Target::Page(2), "Page 2"),
        step(Target::CreateForm, "Create form"),
        step(Target::Listing, "Product list 2"),
        step(Target::Dashboard, "Dashboard 2"),
    ],
};

const FAST: ProfileSpec = ProfileSpec {
    think_time: Duration::from_millis(50),
    steps: &[
        step(Target::Dashboard, "Dashboard"),
        step(Target::Listing, "Product list"),
        step(Target::CreateForm, "Create form"),
    ],
};

/// One resolved request in a session script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub method: HttpMethod,
    pub endpoint: String,
    pub label: String,
}

/// Ordered steps for one session plus the pause after each of them.
#[derive(Debug, Clone)]
pub struct Script {
    pub profile: BehaviorProfile,
    pub steps: Vec<Step>,
    pub think_time: Duration,
}

impl BehaviorProfile {
    pub const ALL: [BehaviorProfile; 3] = [
        BehaviorProfile::Normal,
        BehaviorProfile::Heavy,
        BehaviorProfile::Fast,
    ];

    pub fn spec(&self) -> &'static ProfileSpec {
        match self {
            BehaviorProfile::Normal => &NORMAL,
            BehaviorProfile::Heavy => &HEAVY,
            BehaviorProfile::Fast => &FAST,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BehaviorProfile::Normal => "normal",
            BehaviorProfile::Heavy => "heavy",
            BehaviorProfile::Fast => "fast",
        }
    }

    /// Capitalized name used in sample descriptions.
    pub fn title(&self) -> &'static str {
        match self {
            BehaviorProfile::Normal => "Normal",
            BehaviorProfile::Heavy => "Heavy",
            BehaviorProfile::Fast => "Fast",
        }
    }

    /// Resolve this profile's templates into concrete requests.
    ///
    /// `rng` only matters for steps with a random search term.
    pub fn script<R: Rng + ?Sized>(&self, routes: &Routes, rng: &mut R) -> Script {
        let spec = self.spec();
        let steps = spec
            .steps
            .iter()
            .map(|t| {
                let endpoint = match t.target {
                    Target::Dashboard => routes.dashboard.clone(),
                    Target::Listing => routes.listing.clone(),
                    Target::Search(term) => {
                        let term = term.unwrap_or_else(|| {
                            SEARCH_TERMS.choose(rng).copied().unwrap_or(SEARCH_TERMS[0])
                        });
                        format!("{}?search={}", routes.listing, term)
                    }
                    Target::Page(n) => format!("{}?page={}", routes.listing, n),
                    Target::CreateForm => routes.create_form.clone(),
                };
                Step {
                    method: HttpMethod::Get,
                    endpoint,
                    label: t.label.to_string(),
                }
            })
            .collect();

        Script {
            profile: *self,
            steps,
            think_time: spec.think_time,
        }
    }
}

impl fmt::Display for BehaviorProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BehaviorProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(BehaviorProfile::Normal),
            "heavy" => Ok(BehaviorProfile::Heavy),
            "fast" => Ok(BehaviorProfile::Fast),
            other => Err(format!(
                "unknown profile '{}', expected normal, heavy or fast",
                other
            )),
        }
    }
}

/// Relative weights for mixed-load waves.
///
/// The weighted pattern (e.g. `normal, normal, heavy, fast` for 2:1:1) is
/// repeated until a wave is full, then shuffled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileMix {
    pub normal: u32,
    pub heavy: u32,
    pub fast: u32,
}

impl Default for ProfileMix {
    fn default() -> Self {
        Self {
            normal: 2,
            heavy: 1,
            fast: 1,
        }
    }
}

impl ProfileMix {
    pub fn new(normal: u32, heavy: u32, fast: u32) -> Self {
        Self {
            normal,
            heavy,
            fast,
        }
    }

    pub fn total(&self) -> u32 {
        self.normal + self.heavy + self.fast
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// The unshuffled weighted pattern.
    pub fn pattern(&self) -> Vec<BehaviorProfile> {
        let mut out = Vec::with_capacity(self.total() as usize);
        for (profile, weight) in [
            (BehaviorProfile::Normal, self.normal),
            (BehaviorProfile::Heavy, self.heavy),
            (BehaviorProfile::Fast, self.fast),
        ] {
            out.extend(std::iter::repeat(profile).take(weight as usize));
        }
        out
    }

    /// Profiles for one wave of `size` sessions.
    pub fn pool<R: Rng + ?Sized>(&self, size: usize, rng: &mut R) -> Vec<BehaviorProfile> {
        let pattern = self.pattern();
        if pattern.is_empty() {
            return Vec::new();
        }
        let mut pool: Vec<_> = pattern.iter().copied().cycle().take(size).collect();
        pool.shuffle(rng);
        pool
    }
}

impl fmt::Display for ProfileMix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "normal={},heavy={},fast={}",
            self.normal, self.heavy, self.fast
        )
    }
}

impl FromStr for ProfileMix {
    type Err = String;

    /// Accepts `2:1:1` or `normal=2,heavy=1,fast=1` (missing names are 0).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parse = |v: &str| {
            v.trim()
                .parse::<u32>()
                .map_err(|_| format!("invalid weight '{}' in mix '{}'", v.trim(), s))
        };

        let mix = if s.contains('=') {
            let mut mix = ProfileMix::new(0, 0, 0);
            for part in s.split(',').filter(|p| !p.trim().is_empty()) {
                let (name, weight) = part
                    .split_once('=')
                    .ok_or_else(|| format!("expected name=weight, got '{}'", part.trim()))?;
                let weight = parse(weight)?;
                match name.parse::<BehaviorProfile>()? {
                    BehaviorProfile::Normal => mix.normal = weight,
                    BehaviorProfile::Heavy => mix.heavy = weight,
                    BehaviorProfile::Fast => mix.fast = weight,
                }
            }
            mix
        } else {
            let parts: Vec<_> = s.split(':').collect();
            if parts.len() != 3 {
                return Err(format!(
                    "expected normal:heavy:fast weights, got '{}'",
                    s
                ));
            }
            ProfileMix::new(parse(parts[0])?, parse(parts[1])?, parse(parts[2])?)
        };

        if mix.is_empty() {
            return Err("profile mix must have at least one non-zero weight".to_string());
        }
        Ok(mix)
    }
}
