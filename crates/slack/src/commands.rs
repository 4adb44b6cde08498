use async_trait::async_trait;
use thiserror::Error;

use crate::blocks::{self, MessageTemplate};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlashCommandPayload {
    pub command: String,
    pub text: String,
    pub channel_id: String,
    pub user_id: String,
    pub trigger_ts: String,
    pub request_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandEnvelope {
    pub command: String,
    pub verb: String,
    pub media_buy_id: Option<String>,
    pub freeform_args: String,
    pub channel_id: String,
    pub user_id: String,
    pub trigger_ts: String,
    pub request_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CampaignCommand {
    Submit { media_buy_id: Option<String> },
    Status { media_buy_id: Option<String> },
    Help,
    Unknown { verb: String, freeform_args: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("unsupported slash command: {0}")]
    UnsupportedCommand(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandRouteError {
    #[error("command service failed: {0}")]
    Service(String),
    #[error("missing media buy id; usage: `/campaign {0} <media_buy_id>`")]
    MissingMediaBuyId(&'static str),
}

pub fn normalize_campaign_command(
    payload: SlashCommandPayload,
) -> Result<CommandEnvelope, CommandParseError> {
    if payload.command != "/campaign" {
        return Err(CommandParseError::UnsupportedCommand(payload.command));
    }

    let text = payload.text.trim().to_owned();
    let mut parts = text.split_whitespace();
    let verb = parts.next().unwrap_or("help").to_ascii_lowercase();
    let freeform_args = parts.collect::<Vec<_>>().join(" ");
    let media_buy_id = freeform_args.split_whitespace().find_map(parse_media_buy_id_token);

    Ok(CommandEnvelope {
        command: "campaign".to_owned(),
        verb,
        media_buy_id,
        freeform_args,
        channel_id: payload.channel_id,
        user_id: payload.user_id,
        trigger_ts: payload.trigger_ts,
        request_id: payload.request_id,
    })
}

pub fn parse_campaign_command(input: &str) -> CampaignCommand {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return CampaignCommand::Help;
    }

    let mut parts = trimmed.split_whitespace();
    let verb = parts.next().unwrap_or_default().to_ascii_lowercase();
    let freeform_args = parts.collect::<Vec<_>>().join(" ");
    classify_campaign_command(&verb, freeform_args)
}

pub struct CommandRouter<S> {
    service: S,
}

impl<S> CommandRouter<S>
where
    S: CampaignCommandService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub async fn route(
        &self,
        envelope: CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        match classify_campaign_command(&envelope.verb, envelope.freeform_args.clone()) {
            CampaignCommand::Submit { media_buy_id } => {
                let media_buy_id =
                    media_buy_id.ok_or(CommandRouteError::MissingMediaBuyId("submit"))?;
                self.service.submit_order(&media_buy_id, &envelope).await
            }
            CampaignCommand::Status { media_buy_id } => {
                let media_buy_id =
                    media_buy_id.ok_or(CommandRouteError::MissingMediaBuyId("status"))?;
                self.service.order_status(&media_buy_id, &envelope).await
            }
            CampaignCommand::Help => Ok(blocks::help_message()),
            CampaignCommand::Unknown { verb, .. } => Ok(blocks::error_message(
                &format!("Unsupported command `/campaign {verb}`. Try `/campaign help`."),
                &envelope.request_id,
            )),
        }
    }
}

#[async_trait]
pub trait CampaignCommandService: Send + Sync {
    async fn submit_order(
        &self,
        media_buy_id: &str,
        envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError>;

    async fn order_status(
        &self,
        media_buy_id: &str,
        envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError>;
}

#[derive(Default)]
pub struct NoopCampaignCommandService;

#[async_trait]
impl CampaignCommandService for NoopCampaignCommandService {
    async fn submit_order(
        &self,
        media_buy_id: &str,
        _envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        Ok(blocks::campaign_status_message(media_buy_id, "submission requested"))
    }

    async fn order_status(
        &self,
        media_buy_id: &str,
        _envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        Ok(blocks::campaign_status_message(media_buy_id, "status requested"))
    }
}

fn classify_campaign_command(verb: &str, freeform_args: String) -> CampaignCommand {
    match verb {
        "submit" => CampaignCommand::Submit {
            media_buy_id: freeform_args.split_whitespace().find_map(parse_media_buy_id_token),
        },
        "status" => CampaignCommand::Status {
            media_buy_id: freeform_args.split_whitespace().find_map(parse_media_buy_id_token),
        },
        "help" => CampaignCommand::Help,
        _ => CampaignCommand::Unknown { verb: verb.to_owned(), freeform_args },
    }
}

/// Media buy ids are buyer-chosen slugs: lowercase alphanumerics with `_` or
/// `-` separators, at least three characters.
pub fn parse_media_buy_id_token(token: &str) -> Option<String> {
    let trimmed = token.trim_matches(|ch: char| ch == '`' || ch == '<' || ch == '>' || ch == ',');
    if trimmed.len() < 3 {
        return None;
    }

    let valid = trimmed
        .bytes()
        .all(|byte| byte.is_ascii_lowercase() || byte.is_ascii_digit() || byte == b'_' || byte == b'-');
    let starts_alphanumeric = trimmed.bytes().next().is_some_and(|byte| byte.is_ascii_alphanumeric());

    if valid && starts_alphanumeric {
        Some(trimmed.to_owned())
    } else {
        None
    }
}
