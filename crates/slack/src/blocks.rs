use rust_decimal::Decimal;
use serde::Serialize;

use buyline_core::cem::CemSummary;
use buyline_core::domain::order::MediaBuy;
use buyline_core::validation::OrderValidation;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    Plain { text: String },
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into() }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
    Danger,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ButtonElement {
    pub action_id: String,
    pub text: TextObject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<ButtonStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ButtonElement {
    pub fn new(action_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            action_id: action_id.into(),
            text: TextObject::plain(label),
            style: None,
            value: None,
        }
    }

    pub fn style(mut self, style: ButtonStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header { block_id: String, text: TextObject },
    Section { block_id: String, text: TextObject },
    Actions { block_id: String, elements: Vec<ButtonElement> },
    Context { block_id: String, elements: Vec<TextObject> },
    Divider { block_id: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub fallback_text: String,
    pub blocks: Vec<Block>,
}

/// A plain-text input collected by a modal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InputBlock {
    pub block_id: String,
    pub label: String,
    pub multiline: bool,
    pub optional: bool,
}

/// A modal view opened in response to a button press. `private_metadata`
/// carries the media buy id so the submission can be routed back.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ModalView {
    pub callback_id: String,
    pub title: String,
    pub submit_label: String,
    pub private_metadata: String,
    pub inputs: Vec<InputBlock>,
}

pub struct MessageBuilder {
    fallback_text: String,
    blocks: Vec<Block>,
}

impl MessageBuilder {
    pub fn new(fallback_text: impl Into<String>) -> Self {
        Self { fallback_text: fallback_text.into(), blocks: Vec::new() }
    }

    pub fn header(mut self, block_id: impl Into<String>, text: impl Into<String>) -> Self {
        self.blocks.push(Block::Header { block_id: block_id.into(), text: TextObject::plain(text) });
        self
    }

    pub fn divider(mut self, block_id: impl Into<String>) -> Self {
        self.blocks.push(Block::Divider { block_id: block_id.into() });
        self
    }

    pub fn section<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut SectionBuilder),
    {
        let mut builder = SectionBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Section { block_id: block_id.into(), text: builder.build() });
        self
    }

    pub fn actions<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ActionsBuilder),
    {
        let mut builder = ActionsBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Actions { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn context<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ContextBuilder),
    {
        let mut builder = ContextBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Context { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate { fallback_text: self.fallback_text, blocks: self.blocks }
    }
}

#[derive(Default)]
pub struct SectionBuilder {
    text: Option<TextObject>,
}

impl SectionBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> TextObject {
        self.text.unwrap_or_else(|| TextObject::plain(""))
    }
}

#[derive(Default)]
pub struct ActionsBuilder {
    elements: Vec<ButtonElement>,
}

impl ActionsBuilder {
    pub fn button(&mut self, button: ButtonElement) -> &mut Self {
        self.elements.push(button);
        self
    }

    fn build(self) -> Vec<ButtonElement> {
        self.elements
    }
}

#[derive(Default)]
pub struct ContextBuilder {
    elements: Vec<TextObject>,
}

impl ContextBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> Vec<TextObject> {
        self.elements
    }
}

/// One package line on the approval card, pre-joined with product master data.
#[derive(Clone, Debug, PartialEq)]
pub struct ApprovalCardPackage {
    pub product_name: String,
    pub budget: Decimal,
    pub format_ids: Vec<String>,
    pub estimated_impressions: i64,
}

/// The interactive approval card posted to the review channel.
///
/// Shows the order, every validation check, the oracle's summary and
/// recommendation, and three decision buttons. The card is informational;
/// the decision buttons go back through the workflow, which re-checks state.
pub fn cem_approval_card(
    media_buy: &MediaBuy,
    packages: &[ApprovalCardPackage],
    validation: &OrderValidation,
    summary: &CemSummary,
) -> MessageTemplate {
    let media_buy_id = &media_buy.media_buy_id;

    let package_lines = if packages.is_empty() {
        "_No packages on this order._".to_string()
    } else {
        packages
            .iter()
            .map(|pkg| {
                format!(
                    "• *{}* · ${} · [{}] · ~{} impressions",
                    pkg.product_name,
                    pkg.budget,
                    pkg.format_ids.join(", "),
                    pkg.estimated_impressions
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let check_lines = validation
        .checks
        .iter()
        .map(|check| {
            let mark = if check.passed { "✅" } else { "❌" };
            format!("{mark} `{}` {}", check.check_name, check.message)
        })
        .collect::<Vec<_>>()
        .join("\n");

    let risk_lines = if summary.risk_flags.is_empty() {
        "_None_".to_string()
    } else {
        summary.risk_flags.iter().map(|flag| format!("• {flag}")).collect::<Vec<_>>().join("\n")
    };

    let recommendation = &summary.recommendation;

    MessageBuilder::new(format!("Order {media_buy_id} awaiting CEM approval"))
        .header("cem.card.header.v1", format!("Order Review: {}", media_buy.campaign_name))
        .section("cem.card.order.v1", |section| {
            section.mrkdwn(format!(
                "*Order:* `{media_buy_id}`\n*Advertiser:* {}\n*Budget:* ${} {}\n*Flight:* {} to {}",
                media_buy.principal_id.0,
                media_buy.total_budget,
                media_buy.currency,
                media_buy.flight_start_date,
                media_buy.flight_end_date
            ));
        })
        .section("cem.card.packages.v1", |section| {
            section.mrkdwn(format!("*Packages*\n{package_lines}"));
        })
        .divider("cem.card.divider.v1")
        .section("cem.card.validation.v1", |section| {
            section.mrkdwn(format!("*Validation*\n{}\n{check_lines}", validation.summary));
        })
        .section("cem.card.summary.v1", |section| {
            section.mrkdwn(format!(
                "*Summary*\n{}\n\n*Risk flags*\n{risk_lines}",
                summary.order_summary
            ));
        })
        .section("cem.card.recommendation.v1", |section| {
            section.mrkdwn(format!(
                "*Recommendation:* {} ({:?} confidence, {:?} risk)\n_{}_",
                recommendation.action.as_str(),
                recommendation.confidence,
                recommendation.risk_level,
                recommendation.reason
            ));
        })
        .actions("cem.card.actions.v1", |actions| {
            actions
                .button(
                    ButtonElement::new("cem.approve.v1", "Approve")
                        .style(ButtonStyle::Primary)
                        .value(media_buy_id.0.clone()),
                )
                .button(
                    ButtonElement::new("cem.reject.v1", "Reject")
                        .style(ButtonStyle::Danger)
                        .value(media_buy_id.0.clone()),
                )
                .button(
                    ButtonElement::new("cem.review.v1", "Request Changes")
                        .value(media_buy_id.0.clone()),
                );
        })
        .context("cem.card.context.v1", |context| {
            context.plain(format!("Summary generated at {}", summary.generated_at.to_rfc3339()));
        })
        .build()
}

/// Confirmation message posted once a decision lands.
pub fn decision_message(
    media_buy_id: &str,
    decision: &str,
    actor_user_id: &str,
    note: Option<&str>,
) -> MessageTemplate {
    let (icon, verb) = match decision {
        "approved" => ("✅", "approved"),
        "rejected" => ("🚫", "rejected"),
        _ => ("📝", "sent back for changes"),
    };

    let mut builder = MessageBuilder::new(format!("Order {media_buy_id} {verb}"))
        .section("cem.decision.summary.v1", |section| {
            section.mrkdwn(format!("{icon} Order `{media_buy_id}` was {verb} by <@{actor_user_id}>."));
        });

    if let Some(note) = note {
        builder = builder.context("cem.decision.note.v1", |context| {
            context.plain(note.to_string());
        });
    }

    builder.build()
}

pub fn campaign_status_message(media_buy_id: &str, status: &str) -> MessageTemplate {
    MessageBuilder::new(format!("Order {media_buy_id} status: {status}"))
        .section("campaign.status.header.v1", |section| {
            section.mrkdwn(format!("*Order:* `{media_buy_id}`"));
        })
        .section("campaign.status.state.v1", |section| {
            section.plain(format!("Current status: {status}"));
        })
        .build()
}

pub fn error_message(summary: &str, correlation_id: &str) -> MessageTemplate {
    MessageBuilder::new(summary.to_owned())
        .section("campaign.error.summary.v1", |section| {
            section.mrkdwn(format!(":warning: {summary}"));
        })
        .context("campaign.error.context.v1", |context| {
            context.plain(format!("Correlation ID: {correlation_id}"));
        })
        .build()
}

pub fn help_message() -> MessageTemplate {
    MessageBuilder::new("Campaign command help")
        .section("campaign.help.summary.v1", |section| {
            section.mrkdwn(
                "*Available commands*\n• `/campaign submit <media_buy_id>`\n• `/campaign status <media_buy_id>`\n• `/campaign help`",
            );
        })
        .build()
}

pub fn reject_reason_modal(media_buy_id: &str) -> ModalView {
    ModalView {
        callback_id: "cem.reject_reason.v1".to_string(),
        title: "Reject Order".to_string(),
        submit_label: "Reject".to_string(),
        private_metadata: media_buy_id.to_string(),
        inputs: vec![InputBlock {
            block_id: "reason".to_string(),
            label: "Why is this order being rejected?".to_string(),
            multiline: true,
            optional: false,
        }],
    }
}

pub fn review_comments_modal(media_buy_id: &str) -> ModalView {
    ModalView {
        callback_id: "cem.review_comments.v1".to_string(),
        title: "Request Changes".to_string(),
        submit_label: "Send Back".to_string(),
        private_metadata: media_buy_id.to_string(),
        inputs: vec![InputBlock {
            block_id: "comments".to_string(),
            label: "What should the buyer change?".to_string(),
            multiline: true,
            optional: false,
        }],
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    use buyline_core::cem::{
        CemAction, CemConfidence, CemRecommendation, CemRiskLevel, CemSummary,
    };
    use buyline_core::domain::order::{MediaBuy, MediaBuyId, OrderStatus};
    use buyline_core::domain::principal::PrincipalId;
    use buyline_core::validation::{OrderValidation, ValidationResult};

    use super::{
        cem_approval_card, decision_message, error_message, reject_reason_modal,
        ApprovalCardPackage, Block, ButtonStyle, TextObject,
    };

    fn sample_media_buy() -> MediaBuy {
        let now = Utc::now();
        MediaBuy {
            id: "row-1".to_string(),
            media_buy_id: MediaBuyId("nike_running_q1".to_string()),
            campaign_name: "Nike Running Gear Q1".to_string(),
            principal_id: PrincipalId("nike".to_string()),
            tenant_id: "yahoo".to_string(),
            total_budget: Decimal::new(120_000, 0),
            currency: "USD".to_string(),
            flight_start_date: NaiveDate::from_ymd_opt(2027, 3, 1).unwrap(),
            flight_end_date: NaiveDate::from_ymd_opt(2027, 4, 30).unwrap(),
            status: OrderStatus::PendingCemApproval,
            created_at: now,
            updated_at: now,
        }
    }

    fn sample_summary(media_buy_id: &str) -> CemSummary {
        CemSummary {
            media_buy_id: MediaBuyId(media_buy_id.to_string()),
            order_summary: "Big Q1 push for Nike.".to_string(),
            validation_explanation: "All checks passed.".to_string(),
            risk_flags: vec!["Budget close to ceiling".to_string()],
            recommendation: CemRecommendation {
                action: CemAction::Review,
                confidence: CemConfidence::Medium,
                reason: "Risk flags present.".to_string(),
                risk_level: CemRiskLevel::Medium,
            },
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn approval_card_has_three_decision_buttons_carrying_the_order_id() {
        let validation = OrderValidation::from_checks(
            MediaBuyId("nike_running_q1".to_string()),
            vec![ValidationResult::pass("media_buy_exists", "found")],
        );
        let card = cem_approval_card(
            &sample_media_buy(),
            &[ApprovalCardPackage {
                product_name: "Yahoo Sports".to_string(),
                budget: Decimal::new(120_000, 0),
                format_ids: vec!["display_300x250".to_string()],
                estimated_impressions: 14_000_000,
            }],
            &validation,
            &sample_summary("nike_running_q1"),
        );

        let actions = card
            .blocks
            .iter()
            .find_map(|block| match block {
                Block::Actions { block_id, elements } if block_id == "cem.card.actions.v1" => {
                    Some(elements)
                }
                _ => None,
            })
            .expect("actions block");

        assert_eq!(actions.len(), 3);
        assert_eq!(actions[0].action_id, "cem.approve.v1");
        assert_eq!(actions[0].style, Some(ButtonStyle::Primary));
        assert_eq!(actions[1].action_id, "cem.reject.v1");
        assert_eq!(actions[1].style, Some(ButtonStyle::Danger));
        assert_eq!(actions[2].action_id, "cem.review.v1");
        for button in actions {
            assert_eq!(button.value.as_deref(), Some("nike_running_q1"));
        }
    }

    #[test]
    fn approval_card_shows_every_failed_check() {
        let validation = OrderValidation::from_checks(
            MediaBuyId("nike_running_q1".to_string()),
            vec![
                ValidationResult::pass("media_buy_exists", "found"),
                ValidationResult::fail("budget_limits", "over ceiling"),
            ],
        );
        let card = cem_approval_card(
            &sample_media_buy(),
            &[],
            &validation,
            &sample_summary("nike_running_q1"),
        );

        let validation_text = card
            .blocks
            .iter()
            .find_map(|block| match block {
                Block::Section { block_id, text: TextObject::Mrkdwn { text } }
                    if block_id == "cem.card.validation.v1" =>
                {
                    Some(text)
                }
                _ => None,
            })
            .expect("validation section");

        assert!(validation_text.contains("❌ `budget_limits` over ceiling"));
        assert!(validation_text.contains("❌ VALIDATION FAILED: budget_limits"));
    }

    #[test]
    fn decision_message_mentions_actor_and_note() {
        let message =
            decision_message("nike_running_q1", "rejected", "U123", Some("budget too high"));
        assert!(message.fallback_text.contains("rejected"));
        assert!(message.blocks.iter().any(|block| matches!(
            block,
            Block::Context { elements, .. }
                if matches!(elements.first(), Some(TextObject::Plain { text }) if text == "budget too high")
        )));
    }

    #[test]
    fn error_template_contains_correlation_id() {
        let message = error_message("Cannot process request", "req-123");
        assert!(message.blocks.iter().any(|block| matches!(
            block,
            Block::Context { elements, .. }
                if matches!(elements.first(), Some(TextObject::Plain { text }) if text.contains("req-123"))
        )));
    }

    #[test]
    fn reject_modal_carries_order_id_in_private_metadata() {
        let modal = reject_reason_modal("nike_running_q1");
        assert_eq!(modal.callback_id, "cem.reject_reason.v1");
        assert_eq!(modal.private_metadata, "nike_running_q1");
        assert_eq!(modal.inputs.len(), 1);
        assert!(!modal.inputs[0].optional);
    }
}
