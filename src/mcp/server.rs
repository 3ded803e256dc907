use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router,
};

use crate::adapters::synced::SyncedStore;
use crate::domain::apartment::{Apartment, Family};
use crate::domain::availability::{self, DayStatus};
use crate::domain::lifecycle::CancellationOutcome;
use crate::domain::priority;
use crate::domain::season;
use crate::domain::stay::StayRange;
use crate::domain::user::PriorityTier;
use crate::error::{BookingError, Result as BookingResult};
use crate::service::{BookingRequest, BookingService, UserSettingsUpdate};

// ---------- Tool parameter types ----------

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct QuoteToolParams {
    /// Apartment code: "35" or "36" ("A" and "B" are accepted as aliases)
    pub apartment: String,
    /// Arrival date (YYYY-MM-DD)
    pub arrival: String,
    /// Departure date (YYYY-MM-DD), exclusive
    pub departure: String,
    /// Price as this user, including their discounts. Takes precedence over `family`.
    pub user_id: Option<String>,
    /// Family tier when no user is given: "A", "B" or "C" (no family)
    pub family: Option<String>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct StayToolParams {
    /// Requesting user id
    pub user_id: String,
    /// Apartment code: "35" or "36"
    pub apartment: String,
    /// Arrival date (YYYY-MM-DD)
    pub arrival: String,
    /// Departure date (YYYY-MM-DD), exclusive
    pub departure: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct PriorityToolParams {
    /// Apartment code: "35" or "36"
    pub apartment: String,
    /// Year to look up
    pub year: i32,
    /// Single month (1-12). Omit to list every preferred month.
    pub month: Option<u32>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct SubmitToolParams {
    /// Requesting user id
    pub user_id: String,
    /// Apartment code: "35" or "36"
    pub apartment: String,
    /// Arrival date (YYYY-MM-DD)
    pub arrival: String,
    /// Departure date (YYYY-MM-DD), exclusive
    pub departure: String,
    /// Number of guests (default: 1)
    pub guests: Option<u32>,
    /// Free-text note for the owners
    pub note: Option<String>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct UserToolParams {
    /// User id
    pub user_id: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct CancelToolParams {
    /// Owner of the reservation
    pub user_id: String,
    /// Reservation id
    pub reservation_id: String,
    /// Must be true: cancelling may delete the reservation without refund
    pub confirm: Option<bool>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct AdminToolParams {
    /// Administrator user id
    pub admin_id: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct AdminRecordToolParams {
    /// Administrator user id
    pub admin_id: String,
    /// Reservation or intention id
    pub reservation_id: String,
    /// Must be true for destructive or irreversible actions
    pub confirm: Option<bool>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct RegisterToolParams {
    /// Display name
    pub name: String,
    /// Email address, unique per user
    pub email: String,
    /// Family affiliation: "A" or "B". Omit for no family.
    pub family: Option<String>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct AdminUserToolParams {
    /// Administrator user id
    pub admin_id: String,
    /// Target user id
    pub user_id: String,
    /// Must be true when removing a user
    pub confirm: Option<bool>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct AdjustScoreToolParams {
    /// Administrator user id
    pub admin_id: String,
    /// Target user id
    pub user_id: String,
    /// Signed change, e.g. 1 or -2
    pub delta: i64,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct UpdateUserToolParams {
    /// Administrator user id
    pub admin_id: String,
    /// Target user id
    pub user_id: String,
    /// Allow or block booking
    pub can_book: Option<bool>,
    /// Yearly reservation limit
    pub max_reservations_per_year: Option<u32>,
    /// Priority tier: "normal" or "high"
    pub priority: Option<String>,
    /// Family affiliation: "A", "B" or "C"
    pub family: Option<String>,
    /// Free-text rank within the family
    pub rank: Option<String>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct CalendarToolParams {
    /// Apartment code: "35" or "36"
    pub apartment: String,
    /// Month to show (YYYY-MM)
    pub month: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct ResyncToolParams {
    /// Administrator user id
    pub admin_id: String,
    /// Must be true: the remote collection is overwritten
    pub confirm: Option<bool>,
}

// ---------- Helpers ----------

fn parse_apartment(code: &str) -> BookingResult<Apartment> {
    Ok(code.parse::<Apartment>()?)
}

fn parse_family(code: &str) -> BookingResult<Family> {
    code.parse::<Family>()
        .map_err(|reason| BookingError::InvalidRequest { reason })
}

fn parse_month(month: &str) -> BookingResult<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", month.trim()), "%Y-%m-%d").map_err(|_| {
        BookingError::InvalidRequest {
            reason: format!("'{month}' is not a YYYY-MM month"),
        }
    })
}

fn failure(context: &str, err: &BookingError) -> CallToolResult {
    CallToolResult::error(vec![Content::text(format!("{context}: {err}"))])
}

/// `Some(error result)` unless the caller explicitly confirmed.
fn unconfirmed(confirm: Option<bool>, action: &str) -> Option<CallToolResult> {
    if confirm == Some(true) {
        None
    } else {
        Some(CallToolResult::error(vec![Content::text(format!(
            "{action} cannot be undone. Call again with `confirm: true` to proceed."
        ))]))
    }
}

fn text_result(text: String) -> std::result::Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

#[derive(Clone)]
pub struct FamilyStaysMcpServer {
    service: Arc<BookingService>,
    sync: Option<Arc<SyncedStore>>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl FamilyStaysMcpServer {
    pub fn new(service: Arc<BookingService>) -> Self {
        Self {
            service,
            sync: None,
            tool_router: Self::tool_router(),
        }
    }

    /// Expose manual resync for a synced store.
    #[must_use]
    pub fn with_sync(mut self, sync: Arc<SyncedStore>) -> Self {
        self.sync = Some(sync);
        self
    }

    async fn quote_text(&self, params: QuoteToolParams) -> BookingResult<String> {
        let apartment = parse_apartment(&params.apartment)?;
        let stay = StayRange::parse(&params.arrival, &params.departure)?;
        let quote = if let Some(user_id) = params.user_id {
            let user = self.service.store().find_user(&user_id).await?;
            self.service.quote(apartment, &stay, Some(&user))?
        } else {
            let family = params.family.as_deref().map(parse_family).transpose()?;
            self.service.quote_for_family(apartment, &stay, family)?
        };
        Ok(quote.to_string())
    }

    /// Price a stay with the per-night breakdown and discounts.
    #[tool(
        name = "stays_quote",
        description = "Price a stay in apartment 35 or 36: per-season breakdown, weekly billing where it applies, and discounts. Pass user_id to include that user's discounts, or a family tier (A, B, C) for a generic quote.",
        annotations(read_only_hint = true)
    )]
    async fn stays_quote(
        &self,
        Parameters(params): Parameters<QuoteToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        match self.quote_text(params).await {
            Ok(text) => text_result(text),
            Err(e) => Ok(failure("Quote failed", &e)),
        }
    }

    /// Check a request before submitting it.
    #[tool(
        name = "stays_check",
        description = "Check a booking request without saving it: peak-season week rules, whether it would become an intention or a binding reservation, conflicts with confirmed stays, other members' intentions, the priority family and the price.",
        annotations(read_only_hint = true)
    )]
    async fn stays_check(
        &self,
        Parameters(params): Parameters<StayToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let parsed = parse_apartment(&params.apartment)
            .and_then(|apt| Ok((apt, StayRange::parse(&params.arrival, &params.departure)?)));
        let (apartment, stay) = match parsed {
            Ok(v) => v,
            Err(e) => return Ok(failure("Invalid request", &e)),
        };
        let check = match self
            .service
            .check_request(&params.user_id, apartment, stay)
            .await
        {
            Ok(check) => check,
            Err(e) => return Ok(failure("Check failed", &e)),
        };

        let mut text = String::new();
        let _ = writeln!(text, "Apartment {} | {}", check.apartment, check.stay);
        match &check.season_violation {
            Some(reason) => {
                let _ = writeln!(text, "Season rules: {reason}");
            }
            None => text.push_str("Season rules: ok\n"),
        }
        match (&check.classification, &check.classification_error) {
            (Some(c), _) => {
                let _ = writeln!(text, "Would be recorded as: {c}");
            }
            (None, Some(reason)) => {
                let _ = writeln!(text, "Priority period: {reason}");
            }
            (None, None) => {}
        }
        match &check.conflict_with {
            Some(id) => {
                let _ = writeln!(text, "Conflicts with confirmed reservation {id}");
            }
            None => text.push_str("No conflicting confirmed reservation\n"),
        }
        if !check.competing.is_empty() {
            let _ = writeln!(
                text,
                "Other intentions for this period: {}",
                check.competing.join(", ")
            );
        }
        if let Some(family) = check.priority_family {
            let _ = writeln!(text, "Priority: {}", family.label());
        }
        if let Some(quote) = &check.quote {
            let _ = writeln!(text, "\n{quote}");
        }
        let _ = write!(
            text,
            "\n{}",
            if check.can_submit() {
                "This request can be submitted."
            } else {
                "This request would be rejected."
            }
        );
        text_result(text)
    }

    /// Priority family per preferred month.
    #[tool(
        name = "stays_priority",
        description = "Show which family has priority for an apartment in the contested summer months of a year.",
        annotations(read_only_hint = true)
    )]
    async fn stays_priority(
        &self,
        Parameters(params): Parameters<PriorityToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let apartment = match parse_apartment(&params.apartment) {
            Ok(apt) => apt,
            Err(e) => return Ok(failure("Invalid apartment", &e)),
        };
        let policy = self.service.policy();
        let months: Vec<u32> = params
            .month
            .map_or_else(|| policy.preferred_months.clone(), |m| vec![m]);

        let mut text = format!("Priority for apartment {apartment} in {}:\n", params.year);
        for month in months {
            let label = priority::priority_family(policy, month, params.year, apartment)
                .map_or("no priority", Family::label);
            let _ = writeln!(text, "  month {month:>2}: {label}");
        }
        text_result(text)
    }

    /// Day-by-day occupancy of one apartment for a month.
    #[tool(
        name = "stays_calendar",
        description = "Show day-by-day occupancy (free, intention, pending, confirmed) for one apartment and month, marking peak-season turnover days.",
        annotations(read_only_hint = true)
    )]
    async fn stays_calendar(
        &self,
        Parameters(params): Parameters<CalendarToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let parsed = parse_apartment(&params.apartment)
            .and_then(|apt| Ok((apt, parse_month(&params.month)?)));
        let (apartment, first) = match parsed {
            Ok(v) => v,
            Err(e) => return Ok(failure("Invalid request", &e)),
        };
        let reservations = match self.service.store().all_reservations().await {
            Ok(r) => r,
            Err(e) => return Ok(failure("Could not load reservations", &e)),
        };

        let policy = self.service.policy();
        let mut text = format!("Apartment {apartment}, {}\n", first.format("%B %Y"));
        let mut free = 0;
        for day in first.iter_days().take_while(|d| d.month() == first.month()) {
            let status = availability::day_status(&reservations, apartment, day);
            if status == DayStatus::Free {
                free += 1;
            }
            let turnover = policy.peak.months.contains(&day.month())
                && season::snap_to_turnover_day(policy, day) == day;
            let _ = writeln!(
                text,
                "  {} {}  {status}{}",
                day,
                day.format("%a"),
                if turnover { "  (turnover day)" } else { "" }
            );
        }
        let _ = write!(text, "{free} free day(s)");
        text_result(text)
    }

    /// Submit a reservation or, during the priority window, an intention.
    #[tool(
        name = "stays_submit",
        description = "Submit a booking. During the priority window (January to March) summer requests become non-binding intentions; otherwise a pending reservation is created. Rejected on peak-season week rule violations, conflicts with confirmed stays, or the yearly limit."
    )]
    async fn stays_submit(
        &self,
        Parameters(params): Parameters<SubmitToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let parsed = parse_apartment(&params.apartment)
            .and_then(|apt| Ok((apt, StayRange::parse(&params.arrival, &params.departure)?)));
        let (apartment, stay) = match parsed {
            Ok(v) => v,
            Err(e) => return Ok(failure("Invalid request", &e)),
        };
        let request = BookingRequest {
            user_id: params.user_id,
            apartment,
            stay,
            guests: params.guests.unwrap_or(1),
            note: params.note.unwrap_or_default(),
        };
        match self.service.submit(request).await {
            Ok(outcome) => {
                let mut text = format!("Submitted as {}.\n{}\n", outcome.classification, outcome.reservation);
                if !outcome.competing.is_empty() {
                    let _ = writeln!(
                        text,
                        "Other members also want this period: {}",
                        outcome.competing.join(", ")
                    );
                }
                let _ = write!(text, "\n{}", outcome.quote);
                text_result(text)
            }
            Err(e) => Ok(failure("Booking rejected", &e)),
        }
    }

    #[tool(
        name = "stays_my_reservations",
        description = "List a user's reservations and intentions, earliest arrival first.",
        annotations(read_only_hint = true)
    )]
    async fn stays_my_reservations(
        &self,
        Parameters(params): Parameters<UserToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        match self.service.my_reservations(&params.user_id).await {
            Ok(list) if list.is_empty() => text_result("No reservations.".into()),
            Ok(list) => {
                let mut text = format!("{} reservation(s):\n", list.len());
                for r in &list {
                    let _ = writeln!(text, "- {r}");
                }
                text_result(text)
            }
            Err(e) => Ok(failure("Could not load reservations", &e)),
        }
    }

    /// Owner cancellation.
    #[tool(
        name = "stays_cancel",
        description = "Cancel your own reservation. Unpaid stays are deleted. Paid stays cancelled at least 14 days ahead wait for a manual refund; later cancellations are deleted without refund. Requires confirm: true.",
        annotations(destructive_hint = true)
    )]
    async fn stays_cancel(
        &self,
        Parameters(params): Parameters<CancelToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        if let Some(refusal) = unconfirmed(params.confirm, "Cancelling") {
            return Ok(refusal);
        }
        match self
            .service
            .cancel(&params.user_id, &params.reservation_id)
            .await
        {
            Ok(CancellationOutcome::Delete) => {
                text_result(format!("Reservation {} cancelled and removed.", params.reservation_id))
            }
            Ok(CancellationOutcome::RefundPending { .. }) => text_result(format!(
                "Reservation {} cancelled. The refund will be handled by the owners.",
                params.reservation_id
            )),
            Ok(CancellationOutcome::DeleteWithoutRefund {
                days_before_arrival,
            }) => text_result(format!(
                "Reservation {} cancelled {days_before_arrival} day(s) before arrival and removed. No refund applies.",
                params.reservation_id
            )),
            Err(e) => Ok(failure("Cancellation failed", &e)),
        }
    }

    /// Admin overview of competing intentions.
    #[tool(
        name = "stays_intentions",
        description = "Admin: list open intentions grouped by apartment and dates, ranked by score, then priority family, then submission time.",
        annotations(read_only_hint = true)
    )]
    async fn stays_intentions(
        &self,
        Parameters(params): Parameters<AdminToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        match self.service.intention_groups(&params.admin_id).await {
            Ok(groups) if groups.is_empty() => text_result("No open intentions.".into()),
            Ok(groups) => {
                let mut text = String::new();
                for group in &groups {
                    let _ = writeln!(text, "{group}");
                }
                text_result(text)
            }
            Err(e) => Ok(failure("Could not list intentions", &e)),
        }
    }

    #[tool(
        name = "stays_confirm_intention",
        description = "Admin: confirm one intention. It becomes an approved reservation, every other overlapping intention for the apartment is deleted, the winner's score drops by 1 and each other requester gains 1. Requires confirm: true.",
        annotations(destructive_hint = true)
    )]
    async fn stays_confirm_intention(
        &self,
        Parameters(params): Parameters<AdminRecordToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        if let Some(refusal) = unconfirmed(params.confirm, "Confirming an intention") {
            return Ok(refusal);
        }
        match self
            .service
            .confirm_intention(&params.admin_id, &params.reservation_id)
            .await
        {
            Ok(outcome) => {
                let mut text = format!("Confirmed: {}\n", outcome.confirmed);
                if !outcome.removed.is_empty() {
                    let _ = writeln!(text, "Removed intentions: {}", outcome.removed.join(", "));
                }
                for adj in &outcome.adjustments {
                    let _ = writeln!(text, "Score {:+} for user {}", adj.delta, adj.user_id);
                }
                text_result(text)
            }
            Err(e) => Ok(failure("Confirmation failed", &e)),
        }
    }

    #[tool(
        name = "stays_reject_intention",
        description = "Admin: delete one intention without confirming another. Requires confirm: true.",
        annotations(destructive_hint = true)
    )]
    async fn stays_reject_intention(
        &self,
        Parameters(params): Parameters<AdminRecordToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        if let Some(refusal) = unconfirmed(params.confirm, "Rejecting an intention") {
            return Ok(refusal);
        }
        match self
            .service
            .reject_intention(&params.admin_id, &params.reservation_id)
            .await
        {
            Ok(r) => text_result(format!("Rejected and removed: {r}")),
            Err(e) => Ok(failure("Rejection failed", &e)),
        }
    }

    #[tool(
        name = "stays_mark_approved",
        description = "Admin: approve a pending reservation."
    )]
    async fn stays_mark_approved(
        &self,
        Parameters(params): Parameters<AdminRecordToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        match self
            .service
            .mark_approved(&params.admin_id, &params.reservation_id)
            .await
        {
            Ok(r) => text_result(format!("Approved: {r}")),
            Err(e) => Ok(failure("Approval failed", &e)),
        }
    }

    #[tool(
        name = "stays_mark_paid",
        description = "Admin: mark a pending or approved reservation as paid. This cannot be reverted. Requires confirm: true.",
        annotations(destructive_hint = true)
    )]
    async fn stays_mark_paid(
        &self,
        Parameters(params): Parameters<AdminRecordToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        if let Some(refusal) = unconfirmed(params.confirm, "Marking as paid") {
            return Ok(refusal);
        }
        match self
            .service
            .mark_paid(&params.admin_id, &params.reservation_id)
            .await
        {
            Ok(r) => text_result(format!("Marked as paid: {r}")),
            Err(e) => Ok(failure("Could not mark as paid", &e)),
        }
    }

    #[tool(
        name = "stays_remove",
        description = "Admin: delete any reservation or intention. Requires confirm: true.",
        annotations(destructive_hint = true)
    )]
    async fn stays_remove(
        &self,
        Parameters(params): Parameters<AdminRecordToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        if let Some(refusal) = unconfirmed(params.confirm, "Removing a reservation") {
            return Ok(refusal);
        }
        match self
            .service
            .remove(&params.admin_id, &params.reservation_id)
            .await
        {
            Ok(r) => text_result(format!("Removed: {r}")),
            Err(e) => Ok(failure("Removal failed", &e)),
        }
    }

    #[tool(
        name = "stays_settle_cancellation",
        description = "Admin: delete a cancelled paid reservation after the refund was made. Requires confirm: true.",
        annotations(destructive_hint = true)
    )]
    async fn stays_settle_cancellation(
        &self,
        Parameters(params): Parameters<AdminRecordToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        if let Some(refusal) = unconfirmed(params.confirm, "Settling a cancellation") {
            return Ok(refusal);
        }
        match self
            .service
            .settle_cancellation(&params.admin_id, &params.reservation_id)
            .await
        {
            Ok(r) => text_result(format!("Cancellation settled, refund of €{:.2}: {r}", r.price)),
            Err(e) => Ok(failure("Could not settle cancellation", &e)),
        }
    }

    #[tool(
        name = "stays_register_user",
        description = "Register a new member. The account cannot book until an admin approves it."
    )]
    async fn stays_register_user(
        &self,
        Parameters(params): Parameters<RegisterToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let family = match params.family.as_deref().map(parse_family).transpose() {
            Ok(f) => f,
            Err(e) => return Ok(failure("Invalid family", &e)),
        };
        match self
            .service
            .register_user(&params.name, &params.email, family)
            .await
        {
            Ok(user) => text_result(format!(
                "Registered {user} with id {}. Waiting for admin approval.",
                user.id
            )),
            Err(e) => Ok(failure("Registration failed", &e)),
        }
    }

    #[tool(
        name = "stays_approve_user",
        description = "Admin: approve a registered user and allow them to book."
    )]
    async fn stays_approve_user(
        &self,
        Parameters(params): Parameters<AdminUserToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        match self
            .service
            .approve_user(&params.admin_id, &params.user_id)
            .await
        {
            Ok(user) => text_result(format!("Approved: {user}")),
            Err(e) => Ok(failure("Approval failed", &e)),
        }
    }

    #[tool(
        name = "stays_update_user",
        description = "Admin: change a user's booking rights, yearly limit, priority tier, family or rank."
    )]
    async fn stays_update_user(
        &self,
        Parameters(params): Parameters<UpdateUserToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let family = match params.family.as_deref().map(parse_family).transpose() {
            Ok(f) => f,
            Err(e) => return Ok(failure("Invalid family", &e)),
        };
        let priority = match params.priority.as_deref() {
            None => None,
            Some(p) if p.eq_ignore_ascii_case("normal") => Some(PriorityTier::Normal),
            Some(p) if p.eq_ignore_ascii_case("high") => Some(PriorityTier::High),
            Some(other) => {
                return Ok(CallToolResult::error(vec![Content::text(format!(
                    "Unknown priority tier '{other}'. Use \"normal\" or \"high\"."
                ))]));
            }
        };
        let update = UserSettingsUpdate {
            can_book: params.can_book,
            max_reservations_per_year: params.max_reservations_per_year,
            priority,
            family,
            rank: params.rank,
        };
        match self
            .service
            .update_user_settings(&params.admin_id, &params.user_id, update)
            .await
        {
            Ok(user) => text_result(format!("Updated: {user}")),
            Err(e) => Ok(failure("Update failed", &e)),
        }
    }

    #[tool(
        name = "stays_adjust_score",
        description = "Admin: add a signed correction to a user's tie-break score."
    )]
    async fn stays_adjust_score(
        &self,
        Parameters(params): Parameters<AdjustScoreToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        match self
            .service
            .adjust_score(&params.admin_id, &params.user_id, params.delta)
            .await
        {
            Ok(user) => text_result(format!("Score updated: {user}")),
            Err(e) => Ok(failure("Score adjustment failed", &e)),
        }
    }

    #[tool(
        name = "stays_remove_user",
        description = "Admin: delete a user account. Their reservations are kept. Requires confirm: true.",
        annotations(destructive_hint = true)
    )]
    async fn stays_remove_user(
        &self,
        Parameters(params): Parameters<AdminUserToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        if let Some(refusal) = unconfirmed(params.confirm, "Removing a user") {
            return Ok(refusal);
        }
        match self
            .service
            .remove_user(&params.admin_id, &params.user_id)
            .await
        {
            Ok(user) => text_result(format!("Removed user {user}")),
            Err(e) => Ok(failure("Could not remove user", &e)),
        }
    }

    #[tool(
        name = "stays_resync",
        description = "Admin: rewrite the remote reservation collection from the local copy after a failed remote write. Records written in the last few seconds keep their remote state. Requires confirm: true.",
        annotations(destructive_hint = true)
    )]
    async fn stays_resync(
        &self,
        Parameters(params): Parameters<ResyncToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let Some(sync) = &self.sync else {
            return Ok(CallToolResult::error(vec![Content::text(
                "Resync is only available with the synced storage backend.",
            )]));
        };
        if let Some(refusal) = unconfirmed(params.confirm, "Resyncing") {
            return Ok(refusal);
        }
        if let Err(e) = self.service.require_admin(&params.admin_id).await {
            return Ok(failure("Resync refused", &e));
        }
        let diverged = sync.diverged_ids();
        match sync.resync().await {
            Ok(report) => {
                let mut text = format!(
                    "Resynced {} reservation(s); {} diverged record(s) pushed.\n",
                    report.written,
                    diverged.len()
                );
                if !report.kept_remote.is_empty() {
                    let _ = writeln!(
                        text,
                        "Kept remote state for recently written: {}",
                        report.kept_remote.join(", ")
                    );
                }
                if report.users_pushed > 0 {
                    let _ = writeln!(text, "{} user change(s) pushed.", report.users_pushed);
                }
                text_result(text)
            }
            Err(e) => Ok(failure("Resync failed", &e)),
        }
    }
}

#[tool_handler]
impl ServerHandler for FamilyStaysMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Booking assistant for a two-apartment family holiday home (apartments 35 and 36).\n\
                 \n\
                 ## Member Tools\n\
                 - stays_quote: price a stay with breakdown and discounts\n\
                 - stays_check: dry-run a request (week rules, intention or binding, conflicts)\n\
                 - stays_priority: which family has priority per summer month\n\
                 - stays_calendar: day-by-day occupancy for a month\n\
                 - stays_submit: submit a reservation or intention\n\
                 - stays_my_reservations: list a user's bookings\n\
                 - stays_cancel: cancel your own booking\n\
                 - stays_register_user: create an account (needs admin approval)\n\
                 \n\
                 ## Admin Tools\n\
                 - stays_intentions: competing intentions, ranked\n\
                 - stays_confirm_intention / stays_reject_intention\n\
                 - stays_mark_approved / stays_mark_paid / stays_remove / stays_settle_cancellation\n\
                 - stays_approve_user / stays_update_user / stays_adjust_score / stays_remove_user\n\
                 - stays_resync: repair the remote copy after a failed write\n\
                 \n\
                 ## Rules\n\
                 - Dates are YYYY-MM-DD; the departure day is not a night.\n\
                 - July and August stays start on a Saturday and last one or two whole weeks.\n\
                 - From January to March, summer requests are intentions decided by the owners.\n\
                 - Destructive tools need `confirm: true`."
                    .into(),
            ),
        }
    }
}
