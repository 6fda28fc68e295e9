//! Wizard Step State Machine
//!
//! The wizard is a linear sequence of numbered steps. The step number is the
//! persisted source of truth for where the visitor is, so it serializes as a
//! plain integer.
//!
//! # Step Flow
//!
//! ```text
//! Welcome (1)
//!     ↓
//! ServiceSelection (2)
//!     ↓
//! PackageSelection (3)   (one visit per selected service)
//!     ↓
//! ContractDetails (4)
//!     ↓
//! Completed (5)
//! ```
//!
//! Forward moves go one step at a time and only after validation. Backward
//! moves may jump to any earlier step.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Wizard steps in sequential order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum WizardStep {
    /// Informational landing step
    Welcome = 1,

    /// Visitor picks one or more services
    ServiceSelection = 2,

    /// Visitor picks a package for each selected service in turn
    PackageSelection = 3,

    /// Submitter and contract details
    ContractDetails = 4,

    /// Contract submitted (terminal state)
    Completed = 5,
}

impl WizardStep {
    /// Returns the 1-based step number
    #[inline]
    pub const fn order(self) -> u8 {
        self as u8
    }

    /// Returns true for the post-submit step
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns the next step in the sequence, or None at the terminal step
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Welcome => Some(Self::ServiceSelection),
            Self::ServiceSelection => Some(Self::PackageSelection),
            Self::PackageSelection => Some(Self::ContractDetails),
            Self::ContractDetails => Some(Self::Completed),
            Self::Completed => None,
        }
    }

    /// Returns the previous step in the sequence, or None at the first step
    pub const fn previous(self) -> Option<Self> {
        match self {
            Self::Welcome => None,
            Self::ServiceSelection => Some(Self::Welcome),
            Self::PackageSelection => Some(Self::ServiceSelection),
            Self::ContractDetails => Some(Self::PackageSelection),
            Self::Completed => Some(Self::ContractDetails),
        }
    }

    /// Returns a human-readable description of this step
    pub const fn description(self) -> &'static str {
        match self {
            Self::Welcome => "Get started",
            Self::ServiceSelection => "Choose services",
            Self::PackageSelection => "Choose packages",
            Self::ContractDetails => "Contract details",
            Self::Completed => "Submitted",
        }
    }

    /// Returns all steps in order
    pub const fn all_steps() -> &'static [Self] {
        &[
            Self::Welcome,
            Self::ServiceSelection,
            Self::PackageSelection,
            Self::ContractDetails,
            Self::Completed,
        ]
    }

    /// Validate a direct jump from `self` to `target`.
    ///
    /// Backward jumps to any earlier step are allowed. Forward jumps are only
    /// allowed to the immediate next step.
    pub fn check_transition(self, target: Self) -> Result<Self, StepTransitionError> {
        if target == self {
            return Err(StepTransitionError::AlreadyAtStep { step: target });
        }
        if target < self {
            return Ok(target);
        }
        if self.is_terminal() {
            return Err(StepTransitionError::FromTerminalStep { from: self });
        }
        if self.next() != Some(target) {
            return Err(StepTransitionError::SkippedStep {
                from: self,
                to: target,
            });
        }
        Ok(target)
    }
}

impl Default for WizardStep {
    fn default() -> Self {
        Self::Welcome
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl From<WizardStep> for u8 {
    fn from(step: WizardStep) -> Self {
        step.order()
    }
}

impl TryFrom<u8> for WizardStep {
    type Error = StepTransitionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::all_steps()
            .iter()
            .copied()
            .find(|s| s.order() == value)
            .ok_or(StepTransitionError::UnknownStep { value })
    }
}

/// Errors that can occur during step transitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepTransitionError {
    /// Attempted to move forward more than one step
    #[error("Cannot skip from {from} to {to} (steps must be completed in order)")]
    SkippedStep { from: WizardStep, to: WizardStep },

    /// Attempted to move past the terminal step
    #[error("Cannot move on from {from} (the wizard is complete)")]
    FromTerminalStep { from: WizardStep },

    /// Attempted to transition to the current step
    #[error("Already at step {step}")]
    AlreadyAtStep { step: WizardStep },

    /// A form for one step was submitted while the wizard is on another
    #[error("Submitted step {submitted} but the wizard is at step {current}")]
    StepMismatch { submitted: u8, current: WizardStep },

    /// Step number outside 1..=5
    #[error("Unknown step number {value}")]
    UnknownStep { value: u8 },
}

impl From<StepTransitionError> for crate::error::SelfServeError {
    fn from(err: StepTransitionError) -> Self {
        crate::error::SelfServeError::Transition(err.to_string())
    }
}
