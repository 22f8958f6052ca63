//! Optimization suggestions: how a valid flow could perform better.
//!
//! Purely advisory. Nothing here affects the validation verdict or the
//! quality score; the output is a prioritized list of concrete improvements
//! (cost, timing, engagement, conversion, e-commerce, analytics) that a
//! campaign author can apply or ignore.

use chrono::Timelike;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::flow::{CampaignFlow, EventType, Step, StepType, TimePeriod};

/// Single-segment SMS length; longer bodies bill as multiple segments.
const SMS_SEGMENT_LIMIT: usize = 160;
/// Characters per segment once a message spills into multipart encoding.
const MULTIPART_SEGMENT_CHARS: usize = 153;
/// Carrier price per SMS segment, USD.
const SEGMENT_COST_USD: f64 = 0.0079;

const URGENCY_KEYWORDS: [&str; 6] = [
    "limited",
    "expires",
    "today only",
    "last chance",
    "ending soon",
    "hurry",
];
const OFFER_KEYWORDS: [&str; 7] = ["discount", "off", "save", "deal", "offer", "promo", "code"];
const CTA_KEYWORDS: [&str; 7] = ["shop", "buy", "click", "visit", "get", "save", "join"];

/// What a suggestion aims to improve.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationCategory {
    Cost,
    Performance,
    Engagement,
    Conversion,
    Ecommerce,
    Analytics,
    Compliance,
    Personalization,
}

/// Shared high/medium/low scale for priority, impact, and effort.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    High,
    Medium,
    Low,
}

impl Rating {
    fn rank(self) -> u8 {
        match self {
            Rating::High => 0,
            Rating::Medium => 1,
            Rating::Low => 2,
        }
    }
}

/// One concrete, prioritized improvement for a flow.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationSuggestion {
    pub category: OptimizationCategory,
    pub priority: Rating,
    pub title: String,
    pub description: String,
    pub impact: Rating,
    pub effort: Rating,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_savings: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
}

impl OptimizationSuggestion {
    fn new(
        category: OptimizationCategory,
        priority: Rating,
        title: impl Into<String>,
        description: impl Into<String>,
        impact: Rating,
        effort: Rating,
    ) -> Self {
        Self {
            category,
            priority,
            title: title.into(),
            description: description.into(),
            impact,
            effort,
            estimated_savings: None,
            step_id: None,
        }
    }

    #[must_use]
    fn for_step(mut self, step_id: impl Into<String>) -> Self {
        self.step_id = Some(step_id.into());
        self
    }

    #[must_use]
    fn with_savings(mut self, savings: impl Into<String>) -> Self {
        self.estimated_savings = Some(savings.into());
        self
    }
}

/// Analyze a flow and return improvement suggestions, highest priority
/// first.
///
/// Passes run in a fixed order and the sort is stable, so the output is
/// deterministic for a given flow.
#[must_use]
pub fn suggest_optimizations(flow: &CampaignFlow) -> Vec<OptimizationSuggestion> {
    let mut out = Vec::new();
    if flow.steps.is_empty() {
        return out;
    }
    cost_pass(flow, &mut out);
    performance_pass(flow, &mut out);
    engagement_pass(flow, &mut out);
    conversion_pass(flow, &mut out);
    analytics_pass(flow, &mut out);
    ecommerce_pass(flow, &mut out);
    out.sort_by_key(|s| s.priority.rank());
    out
}

fn message_text(step: &Step) -> Option<&str> {
    (step.kind == StepType::Message)
        .then(|| step.str_field("messageText"))
        .flatten()
}

fn steps_of(flow: &CampaignFlow, kind: StepType) -> impl Iterator<Item = &Step> {
    flow.steps.iter().filter(move |s| s.kind == kind)
}

fn cost_pass(flow: &CampaignFlow, out: &mut Vec<OptimizationSuggestion>) {
    let long: Vec<usize> = flow
        .steps
        .iter()
        .filter_map(message_text)
        .map(|body| body.chars().count())
        .filter(|len| *len > SMS_SEGMENT_LIMIT)
        .collect();

    if !long.is_empty() {
        let avg = long.iter().sum::<usize>() / long.len();
        let extra_segments: usize = long.iter().map(|len| (len - 1) / MULTIPART_SEGMENT_CHARS).sum();
        let savings = format!("${:.2} per send", extra_segments as f64 * SEGMENT_COST_USD);
        out.push(
            OptimizationSuggestion::new(
                OptimizationCategory::Cost,
                Rating::Medium,
                "Shorten messages to reduce SMS costs",
                format!(
                    "{} message(s) exceed {SMS_SEGMENT_LIMIT} chars (avg {avg} chars). \
                     Shortening to single SMS segments could save {savings}.",
                    long.len()
                ),
                Rating::Medium,
                Rating::Low,
            )
            .with_savings(savings),
        );
    }

    let delay_count = steps_of(flow, StepType::Delay).count();
    if delay_count > 3 {
        out.push(OptimizationSuggestion::new(
            OptimizationCategory::Cost,
            Rating::Low,
            "Consider consolidating delay steps",
            format!(
                "Campaign has {delay_count} delay steps. Consolidating may simplify \
                 the flow and reduce execution overhead."
            ),
            Rating::Low,
            Rating::Medium,
        ));
    }

    let message_count = steps_of(flow, StepType::Message).count();
    if message_count > 5 {
        let per_thousand = message_count as f64 * SEGMENT_COST_USD * 1000.0;
        out.push(
            OptimizationSuggestion::new(
                OptimizationCategory::Cost,
                Rating::Medium,
                "Reduce number of messages",
                format!(
                    "Campaign sends {message_count} messages. Each additional message \
                     costs ~${per_thousand:.2} per 1,000 recipients. Consider combining \
                     or removing less effective messages."
                ),
                Rating::High,
                Rating::Medium,
            )
            .with_savings(format!("${:.2}+ per 1,000 sends", per_thousand * 0.2)),
        );
    }
}

fn delay_hours(step: &Step) -> Option<f64> {
    let time: f64 = step.str_field("time")?.trim().parse().ok()?;
    let period: TimePeriod = step.str_field("period")?.parse().ok()?;
    let factor = match period {
        TimePeriod::Seconds => 1.0 / 3600.0,
        TimePeriod::Minutes => 1.0 / 60.0,
        TimePeriod::Hours => 1.0,
        TimePeriod::Days => 24.0,
    };
    Some(time * factor)
}

fn performance_pass(flow: &CampaignFlow, out: &mut Vec<OptimizationSuggestion>) {
    for step in steps_of(flow, StepType::Delay) {
        let Some(hours) = delay_hours(step) else {
            continue;
        };
        // Follow-ups land best 6-24 hours after the trigger.
        if hours < 4.0 {
            out.push(
                OptimizationSuggestion::new(
                    OptimizationCategory::Performance,
                    Rating::Medium,
                    "Increase delay for better timing",
                    format!(
                        "Delay of {hours:.1} hours may be too short. Research shows \
                         6-24 hour delays have better engagement."
                    ),
                    Rating::Medium,
                    Rating::Low,
                )
                .for_step(&step.id),
            );
        } else if hours > 48.0 {
            out.push(
                OptimizationSuggestion::new(
                    OptimizationCategory::Performance,
                    Rating::Low,
                    "Reduce delay to maintain engagement",
                    format!(
                        "Delay of {:.1} days may cause recipients to forget context. \
                         Consider 6-24 hour windows for better recall.",
                        hours / 24.0
                    ),
                    Rating::Medium,
                    Rating::Low,
                )
                .for_step(&step.id),
            );
        }
    }

    let message_count = steps_of(flow, StepType::Message).count();
    let has_experiment = steps_of(flow, StepType::Experiment).next().is_some();
    if message_count >= 2 && !has_experiment {
        out.push(OptimizationSuggestion::new(
            OptimizationCategory::Performance,
            Rating::High,
            "Add A/B testing to optimize performance",
            "Campaign could benefit from testing message variations. A/B testing \
             typically improves conversion by 15-30%.",
            Rating::High,
            Rating::Medium,
        ));
    }

    let has_segment = steps_of(flow, StepType::Segment).next().is_some();
    if message_count > 1 && !has_segment {
        out.push(OptimizationSuggestion::new(
            OptimizationCategory::Performance,
            Rating::Medium,
            "Add customer segmentation",
            "Segmenting customers can improve relevance and conversion. Consider \
             segmenting by purchase history or engagement level.",
            Rating::High,
            Rating::High,
        ));
    }
}

fn engagement_pass(flow: &CampaignFlow, out: &mut Vec<OptimizationSuggestion>) {
    let bodies: Vec<&str> = flow.steps.iter().filter_map(message_text).collect();
    if bodies.is_empty() {
        return;
    }

    let personalized = bodies.iter().filter(|b| b.contains("{{")).count();
    let ratio = personalized as f64 / bodies.len() as f64;
    if ratio < 0.7 {
        out.push(OptimizationSuggestion::new(
            OptimizationCategory::Engagement,
            Rating::High,
            "Increase personalization",
            format!(
                "Only {:.0}% of messages use personalization. Personalized messages \
                 have 26% higher open rates and 14% higher click-through rates.",
                ratio * 100.0
            ),
            Rating::High,
            Rating::Low,
        ));
    }

    let has_product_choice = steps_of(flow, StepType::ProductChoice).next().is_some();
    if !has_product_choice && bodies.len() > 2 {
        out.push(OptimizationSuggestion::new(
            OptimizationCategory::Engagement,
            Rating::Medium,
            "Add interactive elements",
            "Interactive steps such as product choice can increase engagement by \
             40-60%. Consider adding conversational elements.",
            Rating::High,
            Rating::High,
        ));
    }

    let with_reply_handler = flow
        .steps
        .iter()
        .filter(|s| s.kind == StepType::Message)
        .filter(|s| s.events.iter().any(|e| e.kind == EventType::Reply))
        .count();
    if (with_reply_handler as f64) < bodies.len() as f64 * 0.5 {
        out.push(OptimizationSuggestion::new(
            OptimizationCategory::Engagement,
            Rating::Medium,
            "Add more reply handlers",
            "Enable two-way conversation by handling replies. Conversational \
             campaigns have 3-5x higher engagement.",
            Rating::High,
            Rating::Medium,
        ));
    }
}

fn conversion_pass(flow: &CampaignFlow, out: &mut Vec<OptimizationSuggestion>) {
    let messages: Vec<&Step> = flow
        .steps
        .iter()
        .filter(|s| s.kind == StepType::Message)
        .collect();
    if messages.is_empty() {
        return;
    }

    let with_urgency = messages
        .iter()
        .filter_map(|s| message_text(s))
        .filter(|body| {
            let folded = body.to_lowercase();
            URGENCY_KEYWORDS.iter().any(|k| folded.contains(k))
        })
        .count();
    if with_urgency == 0 {
        out.push(OptimizationSuggestion::new(
            OptimizationCategory::Conversion,
            Rating::High,
            "Add urgency to drive action",
            "No messages create urgency. Adding time-sensitive elements can \
             increase conversion by 20-30%.",
            Rating::High,
            Rating::Low,
        ));
    }

    for step in &messages {
        let Some(body) = message_text(step) else {
            continue;
        };
        let folded = body.to_lowercase();
        let has_offer = OFFER_KEYWORDS.iter().any(|k| folded.contains(k));
        let has_code_token = body.contains("{{discount.code}}") || body.contains("{{code}}");
        if has_offer && folded.contains("code") && !has_code_token {
            out.push(
                OptimizationSuggestion::new(
                    OptimizationCategory::Conversion,
                    Rating::Medium,
                    "Use discount code variables",
                    "Use the {{discount.code}} variable for dynamic codes. Clear, \
                     personalized codes improve redemption rates.",
                    Rating::Medium,
                    Rating::Low,
                )
                .for_step(&step.id),
            );
        }
    }

    if let Some(first) = messages.first() {
        let folded = message_text(first).unwrap_or_default().to_lowercase();
        if !CTA_KEYWORDS.iter().any(|k| folded.contains(k)) {
            out.push(
                OptimizationSuggestion::new(
                    OptimizationCategory::Conversion,
                    Rating::High,
                    "Add clear CTA to first message",
                    "The first message should carry a clear call-to-action. CTAs in \
                     the opening message increase conversion by 25%.",
                    Rating::High,
                    Rating::Low,
                )
                .for_step(&first.id),
            );
        }
    }
}

fn scheduled_hour(raw: &str) -> Option<u32> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|t| t.hour())
        .or_else(|_| raw.parse::<chrono::NaiveDateTime>().map(|t| t.hour()))
        .ok()
}

fn analytics_pass(flow: &CampaignFlow, out: &mut Vec<OptimizationSuggestion>) {
    for step in steps_of(flow, StepType::Experiment) {
        let variants = step
            .field("variants")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        if variants.len() < 2 {
            out.push(
                OptimizationSuggestion::new(
                    OptimizationCategory::Analytics,
                    Rating::High,
                    "Add test variants for A/B experiment",
                    format!(
                        "Experiment step {:?} has fewer than 2 variants. A/B testing \
                         requires at least 2 variants for a meaningful comparison.",
                        step.id
                    ),
                    Rating::High,
                    Rating::Medium,
                )
                .for_step(&step.id),
            );
        }

        if let Some(splits) = step.field("splitPercentages").and_then(Value::as_array)
            && let (Some(a), Some(b)) = (
                splits.first().and_then(Value::as_f64),
                splits.get(1).and_then(Value::as_f64),
            )
            && (a - b).abs() > 20.0
        {
            out.push(
                OptimizationSuggestion::new(
                    OptimizationCategory::Analytics,
                    Rating::Medium,
                    "Balance A/B test split percentages",
                    format!(
                        "Current split is {a:.0}%/{b:.0}%. More balanced splits reach \
                         statistical significance faster."
                    ),
                    Rating::Medium,
                    Rating::Low,
                )
                .for_step(&step.id),
            );
        }

        let has_control = variants
            .iter()
            .any(|v| v.to_string().to_lowercase().contains("control"));
        if !has_control {
            out.push(
                OptimizationSuggestion::new(
                    OptimizationCategory::Analytics,
                    Rating::Medium,
                    "Add control group to A/B test",
                    "Consider adding a control group (the existing message) as a \
                     baseline for measuring experiment impact accurately.",
                    Rating::Medium,
                    Rating::Low,
                )
                .for_step(&step.id),
            );
        }
    }

    for step in steps_of(flow, StepType::RateLimit) {
        let occurrences: i64 = step
            .str_field("occurrences")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(1);
        match step.str_field("period") {
            Some("Minutes") if occurrences < 5 => out.push(
                OptimizationSuggestion::new(
                    OptimizationCategory::Compliance,
                    Rating::Low,
                    "Review rate limit for customer experience",
                    format!(
                        "Rate limit of {occurrences} per Minutes may be too restrictive. \
                         Check that this level matches your actual compliance needs."
                    ),
                    Rating::Low,
                    Rating::Low,
                )
                .for_step(&step.id),
            ),
            Some("Hours") if occurrences > 20 => out.push(
                OptimizationSuggestion::new(
                    OptimizationCategory::Compliance,
                    Rating::Medium,
                    "Review rate limit for compliance",
                    format!(
                        "Rate limit of {occurrences} per Hours may violate compliance \
                         rules. Ensure this aligns with TCPA and local regulations."
                    ),
                    Rating::High,
                    Rating::Low,
                )
                .for_step(&step.id),
            ),
            _ => {}
        }
    }

    for step in steps_of(flow, StepType::Schedule) {
        let hour = step
            .field("schedule")
            .and_then(|s| s.get("datetime"))
            .and_then(Value::as_str)
            .and_then(scheduled_hour);
        if let Some(hour) = hour
            && !(8..=21).contains(&hour)
        {
            out.push(
                OptimizationSuggestion::new(
                    OptimizationCategory::Performance,
                    Rating::Medium,
                    "Optimize send time for engagement",
                    format!(
                        "Scheduled send at {hour}:00 is outside the 8AM-9PM window. \
                         Consider adjusting for better response rates."
                    ),
                    Rating::Medium,
                    Rating::Low,
                )
                .for_step(&step.id),
            );
        }
    }

    for step in steps_of(flow, StepType::Limit) {
        let occurrences: i64 = step
            .str_field("occurrences")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(1);
        if step.str_field("period") == Some("Days") && occurrences < 2 {
            out.push(
                OptimizationSuggestion::new(
                    OptimizationCategory::Performance,
                    Rating::Low,
                    "Review campaign frequency limit",
                    format!(
                        "Limit of {occurrences} per Days may be too restrictive. Check \
                         that it matches your campaign goals and customer expectations."
                    ),
                    Rating::Medium,
                    Rating::Low,
                )
                .for_step(&step.id),
            );
        }
    }

    let message_count = steps_of(flow, StepType::Message).count();
    let has_analytics = flow
        .steps
        .iter()
        .any(|s| matches!(s.kind, StepType::Experiment | StepType::Segment));
    if message_count > 2 && !has_analytics {
        out.push(OptimizationSuggestion::new(
            OptimizationCategory::Analytics,
            Rating::Medium,
            "Add A/B testing for message optimization",
            "Campaign has multiple messages but no experiments. Consider adding \
             them to optimize message content and timing.",
            Rating::High,
            Rating::Medium,
        ));
    }

    let has_segment = steps_of(flow, StepType::Segment).next().is_some();
    if message_count > 3 && !has_segment {
        out.push(OptimizationSuggestion::new(
            OptimizationCategory::Personalization,
            Rating::Medium,
            "Add customer segmentation for better targeting",
            "Campaign has multiple messages but no segmentation. Adding segments \
             can improve relevance and conversion rates.",
            Rating::High,
            Rating::Medium,
        ));
    }
}

fn bool_field(step: &Step, name: &str, default: bool) -> bool {
    step.field(name).and_then(Value::as_bool).unwrap_or(default)
}

fn ecommerce_pass(flow: &CampaignFlow, out: &mut Vec<OptimizationSuggestion>) {
    for step in steps_of(flow, StepType::ProductChoice) {
        let products = step
            .field("products")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        let manual = step.str_field("productSelection").unwrap_or("manually") == "manually";

        if manual && products < 3 {
            out.push(
                OptimizationSuggestion::new(
                    OptimizationCategory::Ecommerce,
                    Rating::Medium,
                    "Add more product options",
                    format!(
                        "Product choice step {:?} has only {products} products. \
                         Offering 3-5 options gives recipients a real choice.",
                        step.id
                    ),
                    Rating::Medium,
                    Rating::Low,
                )
                .for_step(&step.id),
            );
        }
        if !bool_field(step, "productImages", true) {
            out.push(
                OptimizationSuggestion::new(
                    OptimizationCategory::Ecommerce,
                    Rating::Medium,
                    "Enable product images",
                    format!(
                        "Product choice step {:?} has product images disabled. Visual \
                         selection typically increases conversion rates by 30%.",
                        step.id
                    ),
                    Rating::Medium,
                    Rating::Low,
                )
                .for_step(&step.id),
            );
        }
        if manual {
            out.push(
                OptimizationSuggestion::new(
                    OptimizationCategory::Ecommerce,
                    Rating::Low,
                    "Consider automatic product selection",
                    format!(
                        "Product choice step {:?} uses manual selection. Automatic \
                         selection personalizes the recommendations per recipient.",
                        step.id
                    ),
                    Rating::Medium,
                    Rating::Medium,
                )
                .for_step(&step.id),
            );
        }
    }

    for step in steps_of(flow, StepType::PurchaseOffer) {
        if !bool_field(step, "discount", false) {
            out.push(
                OptimizationSuggestion::new(
                    OptimizationCategory::Ecommerce,
                    Rating::High,
                    "Add discount to purchase offer",
                    format!(
                        "Purchase offer step {:?} has no discount. Offers with \
                         discounts typically convert 2-3x better.",
                        step.id
                    ),
                    Rating::High,
                    Rating::Low,
                )
                .for_step(&step.id),
            );
        }
        if !bool_field(step, "skipForRecentOrders", true) {
            out.push(
                OptimizationSuggestion::new(
                    OptimizationCategory::Ecommerce,
                    Rating::Medium,
                    "Enable recent order filtering",
                    format!(
                        "Purchase offer step {:?} does not skip recent orders. Avoid \
                         offering to customers who just purchased.",
                        step.id
                    ),
                    Rating::Medium,
                    Rating::Low,
                )
                .for_step(&step.id),
            );
        }
    }

    for step in steps_of(flow, StepType::Purchase) {
        if !bool_field(step, "sendReminderForNonPurchasers", false) {
            out.push(
                OptimizationSuggestion::new(
                    OptimizationCategory::Ecommerce,
                    Rating::Medium,
                    "Enable purchase reminders",
                    format!(
                        "Purchase step {:?} does not remind non-purchasers. Reminders \
                         can recover 15-20% of abandoned carts.",
                        step.id
                    ),
                    Rating::Medium,
                    Rating::Low,
                )
                .for_step(&step.id),
            );
        }
        if !bool_field(step, "allowAutomaticPayment", false) {
            out.push(
                OptimizationSuggestion::new(
                    OptimizationCategory::Ecommerce,
                    Rating::Low,
                    "Consider automatic payment option",
                    format!(
                        "Purchase step {:?} does not allow automatic payment, which \
                         increases completion rates for returning customers.",
                        step.id
                    ),
                    Rating::Low,
                    Rating::Medium,
                )
                .for_step(&step.id),
            );
        }
    }

    let product_choice_count = steps_of(flow, StepType::ProductChoice).count();
    let purchase_offer_count = steps_of(flow, StepType::PurchaseOffer).count();
    let purchase_count = steps_of(flow, StepType::Purchase).count();
    let ecommerce_count = product_choice_count + purchase_offer_count + purchase_count;

    if ecommerce_count >= 2 && product_choice_count > 0 && purchase_offer_count == 0 {
        out.push(OptimizationSuggestion::new(
            OptimizationCategory::Ecommerce,
            Rating::Medium,
            "Add purchase offer after product choice",
            "Campaign has product selection but no purchase offer step. Add one to \
             convert product interest into sales.",
            Rating::High,
            Rating::Medium,
        ));
    }

    let message_count = steps_of(flow, StepType::Message).count();
    let has_delay = steps_of(flow, StepType::Delay).next().is_some();
    if purchase_offer_count > 0 && message_count > 2 && !has_delay {
        out.push(OptimizationSuggestion::new(
            OptimizationCategory::Ecommerce,
            Rating::Medium,
            "Add delays for cart recovery timing",
            "Cart recovery campaigns work best with strategic delays (2-4 hours, \
             24 hours). Consider adding delay steps between messages.",
            Rating::Medium,
            Rating::Low,
        ));
    }

    if message_count > 3 && ecommerce_count == 0 {
        out.push(OptimizationSuggestion::new(
            OptimizationCategory::Ecommerce,
            Rating::Medium,
            "Add e-commerce features to convert engagement",
            "Campaign has multiple messages but no e-commerce steps. Product choice \
             or purchase offers can monetize the engagement.",
            Rating::High,
            Rating::Medium,
        ));
    }
}
