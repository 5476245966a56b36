//! Poll domain model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::errors::DomainError;
use crate::models::poll_option::{NewPollOption, OptionInput};

/// Maximum title length in characters.
pub const MAX_TITLE_CHARS: usize = 200;

/// Maximum description length in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 1000;

/// Minimum number of non-blank options a poll must have.
pub const MIN_OPTIONS: usize = 2;

/// Maximum number of options a poll may have.
pub const MAX_OPTIONS: usize = 10;

/// Number of id characters shown as the poll's short code.
pub const SHORT_CODE_LEN: usize = 8;

/// How voters choose among options. Only single choice is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceMode {
    #[default]
    SingleChoice,
}

impl ChoiceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChoiceMode::SingleChoice => "single_choice",
        }
    }
}

/// Who can reach a poll. Polls are public to anyone holding the code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    PublicByCode,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::PublicByCode => "public_by_code",
        }
    }
}

/// Poll lifecycle status.
///
/// Only `Active` and `Closed` are ever stored; `Expired` is derived from the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollStatus {
    Active,
    Expired,
    Closed,
}

impl PollStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PollStatus::Active => "active",
            PollStatus::Expired => "expired",
            PollStatus::Closed => "closed",
        }
    }
}

impl std::fmt::Display for PollStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PollStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(PollStatus::Active),
            "expired" => Ok(PollStatus::Expired),
            "closed" => Ok(PollStatus::Closed),
            other => Err(format!("Unknown poll status: {}", other)),
        }
    }
}

/// Allowed voting windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollTtl {
    OneHour,
    SixHours,
    OneDay,
    OneWeek,
    OneMonth,
}

impl PollTtl {
    pub const ALLOWED_HOURS: [u32; 5] = [1, 6, 24, 168, 720];

    pub fn hours(&self) -> u32 {
        match self {
            PollTtl::OneHour => 1,
            PollTtl::SixHours => 6,
            PollTtl::OneDay => 24,
            PollTtl::OneWeek => 168,
            PollTtl::OneMonth => 720,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::hours(i64::from(self.hours()))
    }
}

impl TryFrom<u32> for PollTtl {
    type Error = DomainError;

    fn try_from(hours: u32) -> Result<Self, Self::Error> {
        match hours {
            1 => Ok(PollTtl::OneHour),
            6 => Ok(PollTtl::SixHours),
            24 => Ok(PollTtl::OneDay),
            168 => Ok(PollTtl::OneWeek),
            720 => Ok(PollTtl::OneMonth),
            other => Err(DomainError::Validation(format!(
                "ttl_hours must be one of 1, 6, 24, 168, 720 (got {})",
                other
            ))),
        }
    }
}

/// A single-choice poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poll {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub creator_id: Uuid,
    pub choice_mode: ChoiceMode,
    pub anonymous: bool,
    pub visibility: Visibility,
    /// Stored status (`Active` or `Closed`). Use [`Poll::status_at`] for the effective one.
    pub status: PollStatus,
    pub expires_at: Option<DateTime<Utc>>,
    /// Cached tally; the vote ledger is the source of truth.
    pub total_votes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Poll {
    /// Effective status at `now`.
    pub fn status_at(&self, now: DateTime<Utc>) -> PollStatus {
        if self.status == PollStatus::Closed {
            PollStatus::Closed
        } else if is_expired(self, now) {
            PollStatus::Expired
        } else {
            PollStatus::Active
        }
    }

    pub fn accepts_votes_at(&self, now: DateTime<Utc>) -> bool {
        self.status_at(now) == PollStatus::Active
    }

    pub fn short_code(&self) -> String {
        short_code(self.id)
    }

    pub fn share_path(&self) -> String {
        format!("/poll/{}", self.id)
    }
}

/// Whether the poll's voting window has passed at `now`.
pub fn is_expired(poll: &Poll, now: DateTime<Utc>) -> bool {
    matches!(poll.expires_at, Some(expires_at) if now > expires_at)
}

/// First characters of a poll id, shown next to share links.
pub fn short_code(id: Uuid) -> String {
    id.simple().to_string()[..SHORT_CODE_LEN].to_string()
}

/// Request payload for poll creation.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePollRequest {
    #[validate(custom(function = "validate_title"))]
    pub title: String,

    #[validate(length(
        max = 1000,
        message = "Description must be at most 1000 characters"
    ))]
    pub description: Option<String>,

    /// Counted after blank entries are dropped.
    pub options: Vec<OptionInput>,

    #[serde(default = "default_anonymous")]
    pub anonymous: bool,

    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u32,
}

fn default_anonymous() -> bool {
    true
}

fn default_ttl_hours() -> u32 {
    1
}

fn validate_title(title: &str) -> Result<(), validator::ValidationError> {
    shared::validation::validate_trimmed_chars(title, 1, MAX_TITLE_CHARS, "Title")
}

/// A validated poll ready to be stored, with its options.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPoll {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub creator_id: Uuid,
    pub anonymous: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub options: Vec<NewPollOption>,
}

impl NewPoll {
    /// Validates and normalizes a creation request.
    ///
    /// Blank option entries are dropped; the remaining options keep their
    /// submitted order as `display_order = 0..n-1`.
    pub fn from_request(
        request: CreatePollRequest,
        creator_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        request.validate()?;
        let ttl = PollTtl::try_from(request.ttl_hours)?;

        let description = shared::validation::normalize_optional(request.description.as_deref());

        let id = Uuid::new_v4();
        let mut options = Vec::with_capacity(request.options.len());
        for input in request.options {
            if input.is_blank() {
                continue;
            }
            let display_order = options.len() as i32;
            options.push(NewPollOption::from_input(input, id, display_order)?);
        }

        if options.len() < MIN_OPTIONS {
            return Err(DomainError::Validation(format!(
                "A poll needs at least {} non-empty options",
                MIN_OPTIONS
            )));
        }
        if options.len() > MAX_OPTIONS {
            return Err(DomainError::Validation(format!(
                "A poll can have at most {} options",
                MAX_OPTIONS
            )));
        }

        Ok(Self {
            id,
            title: request.title.trim().to_string(),
            description,
            creator_id,
            anonymous: request.anonymous,
            expires_at: Some(now + ttl.duration()),
            created_at: now,
            options,
        })
    }

    /// The poll record as it exists right after creation.
    pub fn to_poll(&self) -> Poll {
        Poll {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            creator_id: self.creator_id,
            choice_mode: ChoiceMode::SingleChoice,
            anonymous: self.anonymous,
            visibility: Visibility::PublicByCode,
            status: PollStatus::Active,
            expires_at: self.expires_at,
            total_votes: 0,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// Poll representation returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct PollResponse {
    pub id: Uuid,
    pub short_code: String,
    pub share_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_url: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub choice_mode: ChoiceMode,
    pub anonymous: bool,
    pub visibility: Visibility,
    pub status: PollStatus,
    pub expires_at: Option<DateTime<Utc>>,
    pub total_votes: i64,
    pub created_at: DateTime<Utc>,
}

impl PollResponse {
    pub fn from_poll(poll: &Poll, now: DateTime<Utc>) -> Self {
        Self {
            id: poll.id,
            short_code: poll.short_code(),
            share_path: poll.share_path(),
            share_url: None,
            title: poll.title.clone(),
            description: poll.description.clone(),
            choice_mode: poll.choice_mode,
            anonymous: poll.anonymous,
            visibility: poll.visibility,
            status: poll.status_at(now),
            expires_at: poll.expires_at,
            total_votes: poll.total_votes,
            created_at: poll.created_at,
        }
    }

    /// Attaches an absolute share link built from the public base URL.
    pub fn with_share_url(mut self, base_url: &str) -> Self {
        if !base_url.is_empty() {
            self.share_url = Some(format!("{}{}", base_url.trim_end_matches('/'), self.share_path));
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(options: &[&str]) -> CreatePollRequest {
        CreatePollRequest {
            title: "Pizza or Tacos?".to_string(),
            description: None,
            options: options
                .iter()
                .map(|o| OptionInput::Text(o.to_string()))
                .collect(),
            anonymous: true,
            ttl_hours: 1,
        }
    }

    #[test]
    fn test_from_request_keeps_submitted_order() {
        let now = Utc::now();
        let new_poll =
            NewPoll::from_request(request(&["Pizza", "Tacos", "Sushi"]), Uuid::new_v4(), now)
                .unwrap();
        let texts: Vec<_> = new_poll.options.iter().map(|o| o.text.as_str()).collect();
        assert_eq!(texts, vec!["Pizza", "Tacos", "Sushi"]);
        let orders: Vec<_> = new_poll.options.iter().map(|o| o.display_order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
        assert!(new_poll.options.iter().all(|o| o.poll_id == new_poll.id));
    }

    #[test]
    fn test_from_request_drops_blank_options() {
        let new_poll = NewPoll::from_request(
            request(&["Pizza", "  ", "Tacos", ""]),
            Uuid::new_v4(),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(new_poll.options.len(), 2);
        assert_eq!(new_poll.options[1].display_order, 1);
    }

    #[test]
    fn test_from_request_rejects_blank_title() {
        let mut req = request(&["a", "b"]);
        req.title = "   ".to_string();
        let err = NewPoll::from_request(req, Uuid::new_v4(), Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn test_from_request_rejects_too_few_options() {
        let err = NewPoll::from_request(request(&["only", " "]), Uuid::new_v4(), Utc::now())
            .unwrap_err();
        match err {
            DomainError::Validation(msg) => assert!(msg.contains("at least 2")),
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_from_request_rejects_too_many_options() {
        let options: Vec<String> = (0..11).map(|i| format!("Option {}", i)).collect();
        let refs: Vec<&str> = options.iter().map(|s| s.as_str()).collect();
        let err = NewPoll::from_request(request(&refs), Uuid::new_v4(), Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn test_option_limit_ignores_blank_entries() {
        let mut options: Vec<String> = (0..10).map(|i| format!("Option {}", i)).collect();
        options.push("   ".to_string());
        let refs: Vec<&str> = options.iter().map(|s| s.as_str()).collect();

        let new_poll = NewPoll::from_request(request(&refs), Uuid::new_v4(), Utc::now()).unwrap();
        assert_eq!(new_poll.options.len(), MAX_OPTIONS);
        assert_eq!(new_poll.options[9].display_order, 9);
    }

    #[test]
    fn test_from_request_too_many_options_message() {
        let options: Vec<String> = (0..11).map(|i| format!("Option {}", i)).collect();
        let refs: Vec<&str> = options.iter().map(|s| s.as_str()).collect();
        match NewPoll::from_request(request(&refs), Uuid::new_v4(), Utc::now()) {
            Err(DomainError::Validation(msg)) => assert!(msg.contains("at most 10")),
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_from_request_rejects_unknown_ttl() {
        let mut req = request(&["a", "b"]);
        req.ttl_hours = 2;
        let err = NewPoll::from_request(req, Uuid::new_v4(), Utc::now()).unwrap_err();
        match err {
            DomainError::Validation(msg) => assert!(msg.contains("ttl_hours")),
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_from_request_normalizes_description() {
        let mut req = request(&["a", "b"]);
        req.description = Some("   ".to_string());
        let new_poll = NewPoll::from_request(req, Uuid::new_v4(), Utc::now()).unwrap();
        assert!(new_poll.description.is_none());
    }

    #[test]
    fn test_expiry_after_one_hour_ttl() {
        let now = Utc::now();
        let poll = NewPoll::from_request(request(&["a", "b"]), Uuid::new_v4(), now)
            .unwrap()
            .to_poll();
        assert!(!is_expired(&poll, now));
        assert!(!is_expired(&poll, now + Duration::minutes(59)));
        assert!(is_expired(&poll, now + Duration::hours(2)));
        assert_eq!(poll.status_at(now + Duration::hours(2)), PollStatus::Expired);
    }

    #[test]
    fn test_is_expired_without_deadline() {
        let now = Utc::now();
        let mut poll = NewPoll::from_request(request(&["a", "b"]), Uuid::new_v4(), now)
            .unwrap()
            .to_poll();
        poll.expires_at = None;
        assert!(!is_expired(&poll, now + Duration::days(365)));
    }

    #[test]
    fn test_closed_takes_precedence_over_expired() {
        let now = Utc::now();
        let mut poll = NewPoll::from_request(request(&["a", "b"]), Uuid::new_v4(), now)
            .unwrap()
            .to_poll();
        poll.status = PollStatus::Closed;
        assert_eq!(poll.status_at(now), PollStatus::Closed);
        assert_eq!(poll.status_at(now + Duration::hours(5)), PollStatus::Closed);
        assert!(!poll.accepts_votes_at(now));
    }

    #[test]
    fn test_ttl_allowed_values() {
        for hours in PollTtl::ALLOWED_HOURS {
            assert_eq!(PollTtl::try_from(hours).unwrap().hours(), hours);
        }
        assert!(PollTtl::try_from(0).is_err());
        assert!(PollTtl::try_from(48).is_err());
    }

    #[test]
    fn test_poll_status_round_trip_str() {
        for status in [PollStatus::Active, PollStatus::Expired, PollStatus::Closed] {
            assert_eq!(status.as_str().parse::<PollStatus>().unwrap(), status);
        }
        assert!("archived".parse::<PollStatus>().is_err());
    }

    #[test]
    fn test_short_code_and_share_path() {
        let poll = NewPoll::from_request(request(&["a", "b"]), Uuid::new_v4(), Utc::now())
            .unwrap()
            .to_poll();
        assert_eq!(poll.short_code().len(), SHORT_CODE_LEN);
        assert!(poll.id.simple().to_string().starts_with(&poll.short_code()));
        assert_eq!(poll.share_path(), format!("/poll/{}", poll.id));
    }

    #[test]
    fn test_response_share_url() {
        let now = Utc::now();
        let poll = NewPoll::from_request(request(&["a", "b"]), Uuid::new_v4(), now)
            .unwrap()
            .to_poll();
        let response = PollResponse::from_poll(&poll, now).with_share_url("https://poll.example/");
        assert_eq!(
            response.share_url.as_deref(),
            Some(format!("https://poll.example/poll/{}", poll.id).as_str())
        );
        let bare = PollResponse::from_poll(&poll, now).with_share_url("");
        assert!(bare.share_url.is_none());
    }

    #[test]
    fn test_create_request_deserialize_defaults() {
        let req: CreatePollRequest = serde_json::from_value(serde_json::json!({
            "title": "Lunch?",
            "options": ["Pizza", {"text": "Tacos", "emoji": "🌮"}]
        }))
        .unwrap();
        assert!(req.anonymous);
        assert_eq!(req.ttl_hours, 1);
        assert_eq!(req.options.len(), 2);
    }
}
