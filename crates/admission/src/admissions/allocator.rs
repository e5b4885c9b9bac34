use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use super::domain::{Applicant, DepartmentRoster};

/// Seat usage for one department after an allocation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeatCount {
    pub code: String,
    pub capacity: u32,
    pub filled: u32,
}

impl SeatCount {
    pub fn remaining(&self) -> u32 {
        self.capacity.saturating_sub(self.filled)
    }
}

/// Per-department filled seats, in roster order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeatLedger {
    entries: Vec<SeatCount>,
}

impl SeatLedger {
    pub fn empty(roster: &DepartmentRoster) -> Self {
        Self {
            entries: roster
                .departments()
                .iter()
                .map(|department| SeatCount {
                    code: department.code.clone(),
                    capacity: department.capacity,
                    filled: 0,
                })
                .collect(),
        }
    }

    /// Takes one seat in `code` if the department exists and is not full.
    fn try_claim(&mut self, code: &str) -> bool {
        match self.entries.iter_mut().find(|entry| entry.code == code) {
            Some(entry) if entry.remaining() > 0 => {
                entry.filled += 1;
                true
            }
            _ => false,
        }
    }

    pub fn entries(&self) -> &[SeatCount] {
        &self.entries
    }

    pub fn filled(&self, code: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|entry| entry.code == code)
            .map(|entry| entry.filled)
    }

    pub fn total_filled(&self) -> u32 {
        self.entries.iter().map(|entry| entry.filled).sum()
    }

    /// Transport-friendly `code -> filled` mapping.
    pub fn to_map(&self) -> BTreeMap<String, u32> {
        self.entries
            .iter()
            .map(|entry| (entry.code.clone(), entry.filled))
            .collect()
    }
}

/// Greedy, preference-first seat assignment over a merit-ranked population.
#[derive(Debug, Clone)]
pub struct SeatAllocator {
    roster: DepartmentRoster,
}

impl SeatAllocator {
    pub fn new(roster: DepartmentRoster) -> Self {
        Self { roster }
    }

    pub fn roster(&self) -> &DepartmentRoster {
        &self.roster
    }

    /// Assigns seats in the given order, which must already be best merit first.
    ///
    /// Every applicant is reset before the pass. Each one then takes the first listed
    /// preference that still has a seat; unknown or empty preference entries never match.
    pub fn allocate(&self, ranked: &mut [Applicant]) -> SeatLedger {
        let mut ledger = SeatLedger::empty(&self.roster);

        for applicant in ranked.iter_mut() {
            applicant.reset_allocation();
        }

        for applicant in ranked.iter_mut() {
            let seat = applicant
                .preferences
                .iter()
                .find(|preference| ledger.try_claim(preference))
                .cloned();

            match seat {
                Some(code) => {
                    debug!(applicant = %applicant.id, department = %code, "seat assigned");
                    applicant.assign(&code);
                }
                None => debug!(applicant = %applicant.id, "no listed preference has a seat"),
            }
        }

        ledger
    }
}
