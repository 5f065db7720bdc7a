//! Threat escalation forecasts.
//!
//! Each threat carries an ordered event chain. A new stage is reached every
//! two months and the last stage holds once the chain runs out.

use council_core::{Threat, ThreatRoster};

/// Months between escalation stages.
const MONTHS_PER_STAGE: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ThreatError {
    #[error("unknown threat: {0}")]
    UnknownThreat(String),
}

/// Where a threat stands after some months without intervention.
#[derive(Debug, Clone)]
pub struct ThreatForecast<'a> {
    pub threat: &'a Threat,
    /// Elapsed months after clamping.
    pub months: f64,
    pub summary: &'a str,
}

/// Negative and non-finite month counts collapse to zero.
pub fn clamp_months(months: f64) -> f64 {
    if months.is_finite() && months > 0.0 {
        months
    } else {
        0.0
    }
}

pub fn future_stage<'a>(
    roster: &'a ThreatRoster,
    threat_id: &str,
    months: f64,
) -> Result<ThreatForecast<'a>, ThreatError> {
    let threat = roster
        .find(threat_id)
        .ok_or_else(|| ThreatError::UnknownThreat(threat_id.to_string()))?;
    let last = threat
        .event_chain
        .len()
        .checked_sub(1)
        .ok_or_else(|| ThreatError::UnknownThreat(threat_id.to_string()))?;
    let months = clamp_months(months);
    let index = ((months / MONTHS_PER_STAGE).floor() as usize).min(last);
    Ok(ThreatForecast {
        threat,
        months,
        summary: &threat.event_chain[index],
    })
}
