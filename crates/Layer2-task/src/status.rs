//! Task status lattice
//!
//! Statuses only ever escalate. Severity order:
//! `Pending < Done < Warn < Fail < Skip`. A suppressed failure (`Skip`)
//! outranks an unsuppressed one.

use arbor_foundation::{paint, Error, Style};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Status of a tracked task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Still running, or waiting on children
    #[default]
    Pending,

    /// Finished successfully
    Done,

    /// Finished, but something worth a look was reported
    Warn,

    /// The operation (or a descendant) failed
    Fail,

    /// An optional operation failed and was suppressed
    Skip,
}

impl Status {
    /// Severity rank used for escalation
    pub fn rank(self) -> u8 {
        match self {
            Status::Pending => 0,
            Status::Done => 1,
            Status::Warn => 2,
            Status::Fail => 3,
            Status::Skip => 4,
        }
    }

    /// `incoming` if it is strictly more severe than `self`, else `self`
    pub fn escalate(self, incoming: Status) -> Status {
        if incoming.rank() > self.rank() {
            incoming
        } else {
            self
        }
    }

    /// Anything but `Pending`
    pub fn is_settled(self) -> bool {
        !matches!(self, Status::Pending)
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::Done => "Done",
            Status::Warn => "Warn",
            Status::Fail => "Fail",
            Status::Skip => "Skip",
        }
    }

    /// Four-column marker shown between the brackets
    pub fn marker(self, color: bool) -> String {
        match self {
            Status::Pending => paint("····", Style::Cyan, color),
            Status::Done => paint("Done", Style::Green, color),
            Status::Warn => paint("Warn", Style::Orange, color),
            Status::Fail => paint("Fail", Style::Red, color),
            Status::Skip => paint("Skip", Style::Yellow, color),
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Status::Pending),
            "done" => Ok(Status::Done),
            "warn" => Ok(Status::Warn),
            "fail" => Ok(Status::Fail),
            "skip" => Ok(Status::Skip),
            other => Err(Error::Config(format!("unknown status '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Status; 5] = [
        Status::Pending,
        Status::Done,
        Status::Warn,
        Status::Fail,
        Status::Skip,
    ];

    #[test]
    fn test_rank_order() {
        for pair in ALL.windows(2) {
            assert!(pair[0].rank() < pair[1].rank(), "{} !< {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_escalate_only_upwards() {
        assert_eq!(Status::Pending.escalate(Status::Done), Status::Done);
        assert_eq!(Status::Fail.escalate(Status::Warn), Status::Fail);
        assert_eq!(Status::Fail.escalate(Status::Skip), Status::Skip);
        assert_eq!(Status::Skip.escalate(Status::Fail), Status::Skip);
        assert_eq!(Status::Done.escalate(Status::Done), Status::Done);
    }

    #[test]
    fn test_escalation_is_order_independent() {
        // every permutation of a sequence ends at the maximum
        let sequences = [
            vec![Status::Fail, Status::Warn, Status::Done],
            vec![Status::Warn, Status::Done, Status::Fail],
            vec![Status::Done, Status::Fail, Status::Warn],
        ];
        for seq in sequences {
            let end = seq.iter().fold(Status::Pending, |acc, s| acc.escalate(*s));
            assert_eq!(end, Status::Fail);
        }
    }

    #[test]
    fn test_from_str() {
        assert_eq!("warn".parse::<Status>().unwrap(), Status::Warn);
        assert_eq!(" SKIP ".parse::<Status>().unwrap(), Status::Skip);
        assert!("broken".parse::<Status>().is_err());
    }

    #[test]
    fn test_plain_markers() {
        assert_eq!(Status::Done.marker(false), "Done");
        assert_eq!(Status::Fail.marker(false), "Fail");
        assert_eq!(Status::Pending.marker(false), "····");
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Status::Skip).unwrap(), "\"skip\"");
    }
}
