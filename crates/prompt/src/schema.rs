//! Compact-code <-> full-vocabulary mapping (spec §4.3, SPEC_FULL §11).
//!
//! Unknown codes map to the documented safe defaults (BALANCED, equilibrium,
//! neutral, medium); long-form aliases and the Chinese relationship-state
//! labels are accepted on read, case-insensitively, grounded on
//! `examples/original_source/app/services/schema_mappings.py`.

use crate::types::{Pacing, RelationshipState, RiskTolerance, Scenario};

pub fn scenario_code(scenario: Scenario) -> &'static str {
    match scenario {
        Scenario::Safe => "S",
        Scenario::Balanced => "B",
        Scenario::Risky => "R",
        Scenario::Recovery => "C",
        Scenario::Negative => "N",
    }
}

pub fn scenario_from_str(value: &str) -> Scenario {
    let normalized = value.trim().to_ascii_uppercase();
    match normalized.as_str() {
        "S" | "SAFE" | "SAFE / LOW RISK" | "SAFE/LOW RISK STRATEGY" => Scenario::Safe,
        "B" | "BALANCED" | "BALANCED / MEDIUM RISK" | "BALANCE/MEDIUM RISK STRATEGY" => Scenario::Balanced,
        "R" | "RISKY" | "RISKY / HIGH REWARD" | "RISKY/HIGH REWARD STRATEGY" => Scenario::Risky,
        "C" | "RECOVERY" | "RECOVERY / REPAIR" | "RECOVERY/REPAIR STRATEGY" => Scenario::Recovery,
        "N" | "NEGATIVE" | "NEGATIVE / ANTI-PATTERN" | "NEGATIVE/ANTI-PATTERN STRATEGY" => Scenario::Negative,
        _ => Scenario::Balanced,
    }
}

pub fn relationship_state_code(state: RelationshipState) -> &'static str {
    match state {
        RelationshipState::Ignition => "I",
        RelationshipState::Propulsion => "P",
        RelationshipState::Ventilation => "V",
        RelationshipState::Equilibrium => "E",
    }
}

pub fn relationship_state_from_str(value: &str) -> RelationshipState {
    match value.trim() {
        "I" | "i" | "ignition" | "破冰" => RelationshipState::Ignition,
        "P" | "p" | "propulsion" | "推进" => RelationshipState::Propulsion,
        "V" | "v" | "ventilation" | "冷却" => RelationshipState::Ventilation,
        "E" | "e" | "equilibrium" | "维持" => RelationshipState::Equilibrium,
        other => {
            let upper = other.to_ascii_uppercase();
            match upper.as_str() {
                "I" | "IGNITION" => RelationshipState::Ignition,
                "P" | "PROPULSION" => RelationshipState::Propulsion,
                "V" | "VENTILATION" => RelationshipState::Ventilation,
                "E" | "EQUILIBRIUM" => RelationshipState::Equilibrium,
                _ => RelationshipState::Equilibrium,
            }
        }
    }
}

pub fn pacing_code(pacing: Pacing) -> &'static str {
    match pacing {
        Pacing::Slow => "S",
        Pacing::Normal => "N",
        Pacing::Fast => "F",
    }
}

pub fn pacing_from_str(value: &str) -> Pacing {
    match value.trim().to_ascii_uppercase().as_str() {
        "S" | "SLOW" => Pacing::Slow,
        "F" | "FAST" => Pacing::Fast,
        _ => Pacing::Normal,
    }
}

pub fn risk_tolerance_code(risk: RiskTolerance) -> &'static str {
    match risk {
        RiskTolerance::Low => "L",
        RiskTolerance::Medium => "M",
        RiskTolerance::High => "H",
    }
}

pub fn risk_tolerance_from_str(value: &str) -> RiskTolerance {
    match value.trim().to_ascii_uppercase().as_str() {
        "L" | "LOW" => RiskTolerance::Low,
        "H" | "HIGH" => RiskTolerance::High,
        _ => RiskTolerance::Medium,
    }
}
