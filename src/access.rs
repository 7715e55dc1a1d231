//! Point d'entrée de l'autorisation. La politique elle-même vit hors de la lib.

use crate::model::ShiftId;
use serde::{Deserialize, Serialize};

/// Rôle déclaré par la couche d'authentification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Volunteer,
    Admin,
}

/// Auteur d'une requête.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub id: String,
    pub role: Role,
}

impl Caller {
    pub fn volunteer<S: Into<String>>(id: S) -> Self {
        Self { id: id.into(), role: Role::Volunteer }
    }
    pub fn admin<S: Into<String>>(id: S) -> Self {
        Self { id: id.into(), role: Role::Admin }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    CreateShift,
    SignUp,
    Withdraw,
    UpdateCapacity,
    Reschedule,
    Delete,
    ForceDelete,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::CreateShift => "create_shift",
            Action::SignUp => "sign_up",
            Action::Withdraw => "withdraw",
            Action::UpdateCapacity => "update_capacity",
            Action::Reschedule => "reschedule",
            Action::Delete => "delete",
            Action::ForceDelete => "force_delete",
        }
    }
}

/// Décision oui/non « cet appelant peut-il faire cette mutation ».
pub trait Authorizer {
    fn allows(&self, caller: &Caller, action: Action, shift: Option<&ShiftId>) -> bool;
}

impl<F> Authorizer for F
where
    F: Fn(&Caller, Action, Option<&ShiftId>) -> bool,
{
    fn allows(&self, caller: &Caller, action: Action, shift: Option<&ShiftId>) -> bool {
        self(caller, action, shift)
    }
}

/// Autorise tout (CLI locale, tests).
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn allows(&self, _caller: &Caller, _action: Action, _shift: Option<&ShiftId>) -> bool {
        true
    }
}
