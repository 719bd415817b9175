//! Decision Engine - turns campaign performance into a business action.
//!
//! Pure function over its inputs: no I/O, no clock. The caller passes the
//! business age (evaluation period in days) and applies the resulting
//! campaign actions itself.
//!
//! Business-level rules, in order:
//! 1. younger than [`LEARNING_PHASE_DAYS`]: MAINTAIN, unless every campaign
//!    reports a zero score (PAUSE)
//! 2. at least [`CLOSURE_MIN_AGE_DAYS`] old and every campaign at or below
//!    the pause threshold: CLOSE
//! 3. any campaign scaling-worthy and none at zero: SCALE
//! 4. a majority below the minimum performance score: PAUSE
//! 5. otherwise OPTIMIZE or MAINTAIN by the balance of campaign actions

use crate::domain::business::{BusinessId, CampaignId};
use crate::domain::campaign::PerformanceSnapshot;
use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};

pub const LEARNING_PHASE_DAYS: i64 = 14;
pub const CLOSURE_MIN_AGE_DAYS: i64 = 21;

pub const LEARNING_PHASE_REASON: &str = "Business in learning phase, monitoring closely";
pub const POOR_PERFORMANCE_REASON: &str = "Poor overall performance requiring optimization";
pub const NO_CAMPAIGNS_REASON: &str = "No active campaigns to evaluate";

const MIN_CONFIDENCE: f64 = 0.05;
pub const MIN_BUDGET_MULTIPLIER: f64 = 1.2;
pub const MAX_BUDGET_MULTIPLIER: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionAction {
    Scale,
    Pause,
    Optimize,
    Close,
    Maintain,
}

impl DecisionAction {
    pub const ALL: [DecisionAction; 5] = [
        DecisionAction::Scale,
        DecisionAction::Pause,
        DecisionAction::Optimize,
        DecisionAction::Close,
        DecisionAction::Maintain,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionAction::Scale => "SCALE",
            DecisionAction::Pause => "PAUSE",
            DecisionAction::Optimize => "OPTIMIZE",
            DecisionAction::Close => "CLOSE",
            DecisionAction::Maintain => "MAINTAIN",
        }
    }
}

impl std::fmt::Display for DecisionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configurable cut-offs, overridable per run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionThresholds {
    pub min_roas: f64,
    pub min_performance_score: f64,
    pub scale_threshold: f64,
    pub pause_threshold: f64,
}

impl Default for DecisionThresholds {
    fn default() -> Self {
        Self {
            min_roas: 2.0,
            min_performance_score: 40.0,
            scale_threshold: 80.0,
            pause_threshold: 30.0,
        }
    }
}

impl DecisionThresholds {
    pub fn validate(&self) -> Result<()> {
        let values = [
            self.min_roas,
            self.min_performance_score,
            self.scale_threshold,
            self.pause_threshold,
        ];
        if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(DomainError::ValidationError(
                "thresholds must be finite and non-negative".to_string(),
            ));
        }
        if self.scale_threshold > 100.0 || self.pause_threshold >= self.scale_threshold {
            return Err(DomainError::ValidationError(format!(
                "expected pause threshold ({}) < scale threshold ({}) <= 100",
                self.pause_threshold, self.scale_threshold
            )));
        }
        Ok(())
    }
}

/// Action for one campaign
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignDecision {
    pub campaign_id: CampaignId,
    pub action: DecisionAction,
    pub score: f64,
    /// Suggested budget multiplier, only for SCALE
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_multiplier: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessDecision {
    pub business_id: BusinessId,
    pub action: DecisionAction,
    /// In (0, 1]
    pub confidence: f64,
    /// Non-empty, one entry per triggering condition
    pub reasons: Vec<String>,
    pub campaign_actions: Vec<CampaignDecision>,
}

/// Per-campaign classification (step 1)
///
/// Scores equal to a threshold take that threshold's action.
pub fn classify_campaign(
    snapshot: &PerformanceSnapshot,
    thresholds: &DecisionThresholds,
) -> DecisionAction {
    let score = snapshot.score;
    let roas = snapshot.metrics.return_on_ad_spend;

    if score >= thresholds.scale_threshold && roas >= thresholds.min_roas {
        DecisionAction::Scale
    } else if score <= thresholds.pause_threshold {
        DecisionAction::Pause
    } else if score < thresholds.min_performance_score || roas < thresholds.min_roas {
        DecisionAction::Optimize
    } else {
        DecisionAction::Maintain
    }
}

/// Decide what to do with one business.
///
/// Fails only on invalid thresholds or a malformed snapshot; the caller
/// aborts that business's evaluation and moves on.
pub fn decide(
    business_id: &str,
    evaluation_period_days: i64,
    snapshots: &[PerformanceSnapshot],
    thresholds: &DecisionThresholds,
) -> Result<BusinessDecision> {
    thresholds.validate()?;
    for snapshot in snapshots {
        snapshot.validate()?;
    }

    let age = evaluation_period_days.max(0);
    let classified: Vec<(&PerformanceSnapshot, DecisionAction)> = snapshots
        .iter()
        .map(|s| (s, classify_campaign(s, thresholds)))
        .collect();

    let decision = if classified.is_empty() {
        no_campaigns(business_id, age)
    } else if age < LEARNING_PHASE_DAYS {
        learning_phase(business_id, age, &classified)
    } else {
        established(business_id, age, &classified, thresholds)
    };

    debug_assert!(!decision.reasons.is_empty());
    debug_assert!(decision.confidence > 0.0 && decision.confidence <= 1.0);
    Ok(decision)
}

fn no_campaigns(business_id: &str, age: i64) -> BusinessDecision {
    let mut reasons = Vec::new();
    if age < LEARNING_PHASE_DAYS {
        reasons.push(LEARNING_PHASE_REASON.to_string());
    }
    reasons.push(NO_CAMPAIGNS_REASON.to_string());
    BusinessDecision {
        business_id: business_id.to_string(),
        action: DecisionAction::Maintain,
        confidence: 0.5,
        reasons,
        campaign_actions: Vec::new(),
    }
}

fn learning_phase(
    business_id: &str,
    age: i64,
    classified: &[(&PerformanceSnapshot, DecisionAction)],
) -> BusinessDecision {
    let mut reasons = vec![LEARNING_PHASE_REASON.to_string()];
    let all_zero = classified.iter().all(|(s, _)| is_catastrophic(s));

    if all_zero {
        reasons.push(format!(
            "All {} campaign(s) report zero performance",
            classified.len()
        ));
        return BusinessDecision {
            business_id: business_id.to_string(),
            action: DecisionAction::Pause,
            confidence: 0.6,
            reasons,
            campaign_actions: uniform_actions(classified, DecisionAction::Pause),
        };
    }

    // Young businesses hold spend steady; confidence grows with data collected
    let progress = age as f64 / LEARNING_PHASE_DAYS as f64;
    BusinessDecision {
        business_id: business_id.to_string(),
        action: DecisionAction::Maintain,
        confidence: clamp_confidence(0.5 + 0.3 * progress),
        reasons,
        campaign_actions: uniform_actions(classified, DecisionAction::Maintain),
    }
}

fn established(
    business_id: &str,
    age: i64,
    classified: &[(&PerformanceSnapshot, DecisionAction)],
    t: &DecisionThresholds,
) -> BusinessDecision {
    let n = classified.len();
    let count = |action: DecisionAction| classified.iter().filter(|(_, a)| *a == action).count();
    let scale_count = count(DecisionAction::Scale);
    let pause_count = count(DecisionAction::Pause);
    let catastrophic = classified.iter().filter(|(s, _)| is_catastrophic(s)).count();
    let avg_roas = classified
        .iter()
        .map(|(s, _)| s.metrics.return_on_ad_spend)
        .sum::<f64>()
        / n as f64;
    let roas_reason = (avg_roas < t.min_roas).then(|| {
        format!(
            "Average return on ad spend {:.2} below minimum {:.2}",
            avg_roas, t.min_roas
        )
    });

    let decision = |action, confidence, reasons, campaign_actions| BusinessDecision {
        business_id: business_id.to_string(),
        action,
        confidence: clamp_confidence(confidence),
        reasons,
        campaign_actions,
    };

    if age >= CLOSURE_MIN_AGE_DAYS && pause_count == n {
        let strength = mean(classified.iter().map(|(s, _)| pause_strength(s.score, t)));
        let reasons = vec![format!(
            "Sustained poor performance: all {} campaign(s) at or below pause threshold ({:.0}) after {} days",
            n, t.pause_threshold, age
        )];
        return decision(
            DecisionAction::Close,
            combine(1.0, strength),
            reasons,
            uniform_actions(classified, DecisionAction::Pause),
        );
    }

    if scale_count > 0 && catastrophic == 0 {
        let strength = mean(
            classified
                .iter()
                .filter(|(_, a)| *a == DecisionAction::Scale)
                .map(|(s, _)| scale_strength(s.score, t)),
        );
        let mut reasons = vec![format!(
            "{} of {} campaign(s) at or above scale threshold ({:.0}) with ROAS of at least {:.1}",
            scale_count, n, t.scale_threshold, t.min_roas
        )];
        if pause_count > 0 {
            reasons.push(format!(
                "{} underperforming campaign(s) will be paused",
                pause_count
            ));
        }
        return decision(
            DecisionAction::Scale,
            combine(scale_count as f64 / n as f64, strength),
            reasons,
            campaign_actions(classified, t, true),
        );
    }

    let below_min: Vec<&PerformanceSnapshot> = classified
        .iter()
        .map(|(s, _)| *s)
        .filter(|s| s.score < t.min_performance_score)
        .collect();
    if below_min.len() * 2 > n {
        let strength = mean(
            below_min
                .iter()
                .map(|s| 0.5 + 0.5 * ratio(t.min_performance_score - s.score, t.min_performance_score)),
        );
        let mut reasons = vec![POOR_PERFORMANCE_REASON.to_string()];
        reasons.extend(roas_reason);
        return decision(
            DecisionAction::Pause,
            combine(below_min.len() as f64 / n as f64, strength),
            reasons,
            uniform_actions(classified, DecisionAction::Pause),
        );
    }

    let needs_work = count(DecisionAction::Optimize) + pause_count;
    let healthy = n - needs_work;
    let strength = mean(classified.iter().map(|(s, _)| mid_band_strength(s.score, t)));
    let mut reasons = Vec::new();
    let action = if needs_work > healthy {
        reasons.push(format!(
            "{} of {} campaign(s) need optimization",
            needs_work, n
        ));
        DecisionAction::Optimize
    } else {
        reasons.push("Performance within expected range".to_string());
        DecisionAction::Maintain
    };
    if scale_count > 0 {
        reasons.push(format!(
            "Scaling withheld: {} campaign(s) report zero performance",
            catastrophic
        ));
    }
    reasons.extend(roas_reason);

    decision(
        action,
        combine(needs_work.max(healthy) as f64 / n as f64, strength),
        reasons,
        campaign_actions(classified, t, false),
    )
}

/// Zero score counts as a catastrophic signal
fn is_catastrophic(snapshot: &PerformanceSnapshot) -> bool {
    snapshot.score <= 0.0
}

fn campaign_actions(
    classified: &[(&PerformanceSnapshot, DecisionAction)],
    t: &DecisionThresholds,
    allow_scale: bool,
) -> Vec<CampaignDecision> {
    classified
        .iter()
        .map(|(s, action)| {
            let action = match action {
                DecisionAction::Scale if !allow_scale => DecisionAction::Maintain,
                other => *other,
            };
            CampaignDecision {
                campaign_id: s.campaign_id.clone(),
                action,
                score: s.score,
                budget_multiplier: (action == DecisionAction::Scale)
                    .then(|| budget_multiplier(s, t)),
            }
        })
        .collect()
}

fn uniform_actions(
    classified: &[(&PerformanceSnapshot, DecisionAction)],
    action: DecisionAction,
) -> Vec<CampaignDecision> {
    classified
        .iter()
        .map(|(s, _)| CampaignDecision {
            campaign_id: s.campaign_id.clone(),
            action,
            score: s.score,
            budget_multiplier: None,
        })
        .collect()
}

/// 1.2x - 2.0x, rising with score margin and ROAS headroom
fn budget_multiplier(snapshot: &PerformanceSnapshot, t: &DecisionThresholds) -> f64 {
    let score_margin = ratio(snapshot.score - t.scale_threshold, 100.0 - t.scale_threshold);
    let roas = snapshot.metrics.return_on_ad_spend;
    let roas_headroom = if t.min_roas > 0.0 {
        ratio(roas - t.min_roas, 2.0 * t.min_roas)
    } else {
        ratio(roas, 4.0)
    };
    let multiplier = 1.0 + 0.5 * score_margin + 0.5 * roas_headroom;
    (multiplier.clamp(MIN_BUDGET_MULTIPLIER, MAX_BUDGET_MULTIPLIER) * 100.0).round() / 100.0
}

fn scale_strength(score: f64, t: &DecisionThresholds) -> f64 {
    0.6 + 0.4 * ratio(score - t.scale_threshold, 100.0 - t.scale_threshold)
}

fn pause_strength(score: f64, t: &DecisionThresholds) -> f64 {
    0.6 + 0.4 * ratio(t.pause_threshold - score, t.pause_threshold)
}

/// Distance from the nearest threshold, relative to half the middle band
fn mid_band_strength(score: f64, t: &DecisionThresholds) -> f64 {
    let half_band = (t.scale_threshold - t.pause_threshold) / 2.0;
    let distance = (score - t.pause_threshold).min(t.scale_threshold - score);
    0.5 + 0.4 * ratio(distance, half_band)
}

/// `part / whole` clamped to [0, 1]; a zero-width range counts as fully met
fn ratio(part: f64, whole: f64) -> f64 {
    if whole <= 0.0 {
        return 1.0;
    }
    (part / whole).clamp(0.0, 1.0)
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

fn combine(agreement: f64, strength: f64) -> f64 {
    0.5 * agreement + 0.5 * strength
}

fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_finite() {
        confidence.clamp(MIN_CONFIDENCE, 1.0)
    } else {
        MIN_CONFIDENCE
    }
}

/// Aggregate of one marketing cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub evaluated: usize,
    pub failed: usize,
    /// Already being evaluated by another run
    pub skipped: usize,
    pub scale: usize,
    pub pause: usize,
    pub optimize: usize,
    pub close: usize,
    pub maintain: usize,
    pub average_confidence: f64,
    #[serde(skip)]
    confidence_total: f64,
}

impl CycleSummary {
    pub fn record(&mut self, decision: &BusinessDecision) {
        match decision.action {
            DecisionAction::Scale => self.scale += 1,
            DecisionAction::Pause => self.pause += 1,
            DecisionAction::Optimize => self.optimize += 1,
            DecisionAction::Close => self.close += 1,
            DecisionAction::Maintain => self.maintain += 1,
        }
        self.evaluated += 1;
        self.confidence_total += decision.confidence;
        self.average_confidence = self.confidence_total / self.evaluated as f64;
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    pub fn record_skipped(&mut self) {
        self.skipped += 1;
    }

    pub fn count(&self, action: DecisionAction) -> usize {
        match action {
            DecisionAction::Scale => self.scale,
            DecisionAction::Pause => self.pause,
            DecisionAction::Optimize => self.optimize,
            DecisionAction::Close => self.close,
            DecisionAction::Maintain => self.maintain,
        }
    }
}
