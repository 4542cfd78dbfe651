//! Compact wire shapes for `SceneAnalysisResult`/`PersonaSnapshot` and the
//! reply payload (spec §3 `CompactReplyPayload`, §4.3 "Compact reply
//! acceptance").

use serde_json::{json, Value};

use crate::schema::{
    pacing_code, pacing_from_str, relationship_state_code, relationship_state_from_str,
    risk_tolerance_code, risk_tolerance_from_str, scenario_code, scenario_from_str,
};
use crate::types::{GenerationOutput, PersonaSnapshot, ReplyCandidate, SceneAnalysisResult};

/// `{"rs": code, "sc": code, "il": u8, "cs": code, "rc": code, "st": [...], "rf": [...]}`.
pub fn compress_scene_analysis(result: &SceneAnalysisResult) -> Value {
    json!({
        "rs": relationship_state_code(result.relationship_state),
        "sc": scenario_code(result.scenario),
        "il": result.intimacy_level,
        "cs": scenario_code(result.current_scenario),
        "rc": scenario_code(result.recommended_scenario),
        "st": result.recommended_strategies,
        "rf": result.risk_flags,
    })
}

pub fn expand_scene_analysis(value: &Value) -> SceneAnalysisResult {
    SceneAnalysisResult {
        relationship_state: relationship_state_from_str(value["rs"].as_str().unwrap_or("")),
        scenario: scenario_from_str(value["sc"].as_str().unwrap_or("")),
        intimacy_level: value["il"].as_u64().unwrap_or(0).min(100) as u8,
        current_scenario: scenario_from_str(value["cs"].as_str().unwrap_or("")),
        recommended_scenario: scenario_from_str(value["rc"].as_str().unwrap_or("")),
        recommended_strategies: string_array(&value["st"]),
        risk_flags: string_array(&value["rf"]),
    }
}

/// `{"st": style, "pc": code, "rt": code, "cf": f32}` (prompt excluded: it is
/// rendered, not round-tripped on the wire).
pub fn compress_persona(persona: &PersonaSnapshot) -> Value {
    json!({
        "st": persona.style,
        "pc": pacing_code(persona.pacing),
        "rt": risk_tolerance_code(persona.risk_tolerance),
        "cf": persona.confidence,
    })
}

pub fn expand_persona(value: &Value, prompt: String) -> PersonaSnapshot {
    PersonaSnapshot {
        style: value["st"].as_str().unwrap_or_default().to_string(),
        pacing: pacing_from_str(value["pc"].as_str().unwrap_or("")),
        risk_tolerance: risk_tolerance_from_str(value["rt"].as_str().unwrap_or("")),
        confidence: value["cf"].as_f64().unwrap_or(0.0) as f32,
        prompt,
    }
}

fn string_array(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

/// Accepts both `{"replies":[...],"overall_advice":...}` and
/// `{"r":[...],"adv":...}`. Elements of `r` may be `[text]`,
/// `[text, strategy]`, or `[text, strategy, reasoning]`; missing elements
/// fill with empty strings (spec §4.3 "Compact reply acceptance").
pub fn parse_generation_output(value: &Value) -> Option<GenerationOutput> {
    if let Some(replies) = value.get("replies").and_then(Value::as_array) {
        let replies = replies
            .iter()
            .map(|r| ReplyCandidate {
                text: r["text"].as_str().unwrap_or_default().to_string(),
                strategy_code: r["strategy"].as_str().unwrap_or_default().to_string(),
                reasoning: r["reasoning"].as_str().map(str::to_string),
            })
            .collect();
        let overall_advice = value["overall_advice"].as_str().unwrap_or_default().to_string();
        return Some(GenerationOutput { replies, overall_advice });
    }

    if let Some(compact) = value.get("r").and_then(Value::as_array) {
        let replies = compact
            .iter()
            .filter_map(Value::as_array)
            .map(|fields| ReplyCandidate {
                text: fields.first().and_then(Value::as_str).unwrap_or_default().to_string(),
                strategy_code: fields.get(1).and_then(Value::as_str).unwrap_or_default().to_string(),
                reasoning: fields.get(2).and_then(Value::as_str).map(str::to_string),
            })
            .collect();
        let overall_advice = value["adv"].as_str().unwrap_or_default().to_string();
        return Some(GenerationOutput { replies, overall_advice });
    }

    None
}

/// Writers emit the compact shape by default (spec §3).
pub fn render_compact_generation(output: &GenerationOutput, include_reasoning: bool) -> Value {
    let r: Vec<Value> = output
        .replies
        .iter()
        .map(|reply| {
            if include_reasoning {
                json!([reply.text, reply.strategy_code, reply.reasoning.clone().unwrap_or_default()])
            } else {
                json!([reply.text, reply.strategy_code])
            }
        })
        .collect();
    json!({ "r": r, "adv": output.overall_advice })
}
