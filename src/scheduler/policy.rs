//! Admission Policies
//!
//! The closed set of scheduling policies and the SJF size classifier.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Suffixes of resources that are usually small (class 1).
const SMALL_SUFFIXES: &[&str] = &[".css", ".js", ".html", ".json"];
/// Suffixes of resources that are usually mid-sized (class 2).
const MEDIUM_SUFFIXES: &[&str] = &[".jpg", ".png", ".gif", ".svg"];
/// Suffixes of resources that are usually large (class 3).
const LARGE_SUFFIXES: &[&str] = &[".mp4", ".zip", ".iso", ".pdf"];

/// Class assigned when the suffix is not recognised.
pub const DEFAULT_SIZE_CLASS: u8 = 2;

// == Policy ==
/// Scheduling policy for admitted fetch jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    /// First come, first served
    #[default]
    Fcfs,
    /// Shortest job first, by size class of the URL suffix
    Sjf,
    /// Round robin; non-preemptive for fetch jobs, so arrival order
    Rr,
}

impl Policy {
    pub const ALL: [Policy; 3] = [Policy::Fcfs, Policy::Sjf, Policy::Rr];

    pub fn as_str(&self) -> &'static str {
        match self {
            Policy::Fcfs => "fcfs",
            Policy::Sjf => "sjf",
            Policy::Rr => "rr",
        }
    }

    /// Slot of this policy's queue in the scheduler's table.
    pub(crate) fn index(self) -> usize {
        match self {
            Policy::Fcfs => 0,
            Policy::Sjf => 1,
            Policy::Rr => 2,
        }
    }

    /// Priority class for `url` under this policy. Only SJF classifies;
    /// the others keep every job in one class so arrival order decides.
    pub fn priority_class(&self, url: &str) -> u8 {
        match self {
            Policy::Sjf => size_class(url),
            Policy::Fcfs | Policy::Rr => 0,
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Policy Error ==
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("unknown algorithm: {0}")]
    Unknown(String),
}

impl FromStr for Policy {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fcfs" => Ok(Policy::Fcfs),
            "sjf" => Ok(Policy::Sjf),
            "rr" => Ok(Policy::Rr),
            _ => Err(PolicyError::Unknown(s.to_string())),
        }
    }
}

// == Size Class ==
/// Estimates job size from the URL suffix. Lower classes are served first.
pub fn size_class(url: &str) -> u8 {
    let matches = |suffixes: &[&str]| suffixes.iter().any(|suffix| url.ends_with(suffix));

    if matches(SMALL_SUFFIXES) {
        1
    } else if matches(MEDIUM_SUFFIXES) {
        2
    } else if matches(LARGE_SUFFIXES) {
        3
    } else {
        DEFAULT_SIZE_CLASS
    }
}
