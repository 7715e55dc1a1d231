use crate::model::{ShiftId, ShiftOccurrence, VolunteerId};
use anyhow::{bail, Result};
use chrono::{DateTime, TimeDelta, Utc};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignupChange {
    SignedUp,
    Withdrew,
    /// Inscription annulée par une suppression forcée.
    Cancelled,
}

/// Événement émis après une mutation réussie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupEvent {
    pub change: SignupChange,
    pub volunteer: VolunteerId,
    pub shift_id: ShiftId,
    pub shift_name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub remaining: usize,
}

impl SignupEvent {
    pub fn new(change: SignupChange, volunteer: &VolunteerId, shift: &ShiftOccurrence) -> Self {
        Self {
            change,
            volunteer: volunteer.clone(),
            shift_id: shift.id().clone(),
            shift_name: shift.name().to_string(),
            start: shift.start(),
            end: shift.end(),
            remaining: shift.remaining(),
        }
    }
}

/// Rappel généré pour un bénévole.
#[derive(Debug, Clone)]
pub struct Reminder {
    pub volunteer: VolunteerId,
    pub shift_id: ShiftId,
    pub notice_at: DateTime<Utc>,
    pub content: String,
}

/// Permet de customiser le rendu des messages (mail, SMS...).
pub trait NoticeRenderer {
    fn render_event(&self, event: &SignupEvent) -> String;
    fn render_reminder(
        &self,
        volunteer: &VolunteerId,
        shift: &ShiftOccurrence,
        notice_at: DateTime<Utc>,
    ) -> String;
}

/// Gabarit texte simple.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextNotice;

impl NoticeRenderer for TextNotice {
    fn render_event(&self, event: &SignupEvent) -> String {
        let verb = match event.change {
            SignupChange::SignedUp => "is signed up for",
            SignupChange::Withdrew => "withdrew from",
            SignupChange::Cancelled => "was removed from cancelled shift",
        };
        format!(
            "{who} {verb} \"{shift}\" ({start} to {end}); {remaining} spot(s) left",
            who = event.volunteer,
            shift = event.shift_name,
            start = event.start.to_rfc3339(),
            end = event.end.to_rfc3339(),
            remaining = event.remaining,
        )
    }

    fn render_reminder(
        &self,
        volunteer: &VolunteerId,
        shift: &ShiftOccurrence,
        notice_at: DateTime<Utc>,
    ) -> String {
        format!(
            "Hello {volunteer},\n\nYou are signed up for \"{shift}\" from {start} to {end}.\nThis reminder was generated on {notice}.\n\nThank you for volunteering!\n",
            shift = shift.name(),
            start = shift.start().to_rfc3339(),
            end = shift.end().to_rfc3339(),
            notice = notice_at.to_rfc3339()
        )
    }
}

/// Destinataire des événements. Envoi « fire-and-forget » : un échec est
/// journalisé par l'appelant, jamais annulé.
pub trait Notifier {
    fn notify(&self, event: &SignupEvent) -> Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _event: &SignupEvent) -> Result<()> {
        Ok(())
    }
}

/// Écrit chaque événement dans les logs `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier<R = TextNotice> {
    renderer: R,
}

impl<R: NoticeRenderer> LogNotifier<R> {
    pub fn new(renderer: R) -> Self {
        Self { renderer }
    }
}

impl<R: NoticeRenderer> Notifier for LogNotifier<R> {
    fn notify(&self, event: &SignupEvent) -> Result<()> {
        let message = self.renderer.render_event(event);
        info!(shift = %event.shift_id, volunteer = %event.volunteer, "{message}");
        Ok(())
    }
}

/// Prépare un rappel pour le prochain créneau d'un bénévole.
pub fn prepare_reminder(
    shifts: &[ShiftOccurrence],
    volunteer: &VolunteerId,
    days_before: i64,
    now: DateTime<Utc>,
    renderer: &dyn NoticeRenderer,
) -> Result<Reminder> {
    if days_before < 0 {
        bail!("days_before must be positive");
    }

    let Some(shift) = shifts
        .iter()
        .filter(|s| s.is_signed_up(volunteer) && s.start() >= now)
        .min_by_key(|s| s.start())
    else {
        bail!("no upcoming shift found for volunteer {volunteer}");
    };

    let Some(notice_at) = TimeDelta::try_days(days_before)
        .and_then(|lead| shift.start().checked_sub_signed(lead))
    else {
        bail!("days_before out of range: {days_before}");
    };
    let content = renderer.render_reminder(volunteer, shift, notice_at);
    Ok(Reminder {
        volunteer: volunteer.clone(),
        shift_id: shift.id().clone(),
        notice_at,
        content,
    })
}
