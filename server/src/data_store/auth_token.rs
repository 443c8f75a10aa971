use crate::cli::CliAuthTokenKey;
use crate::data_store::{EventId, StoreError, UserId};

/// Authorization token for authorizing access to the data_store for a specific event
///
/// The AuthToken is keyed to a specific event (by its event id) and holds a list of active
/// [AccessRole]s of the current user for this event. These imply specific [Privilege]s.
///
/// This structure is our main protection against accidental unauthorized-access bugs: All
/// data_store access functions require an AuthToken and check the validity of the AuthToken
/// for the required event id and privilege. An AuthToken can only be created by
/// [crate::data_store::CallboardStoreFacade::get_auth_token_for_user], based on the user's
/// permissions stored in the database, and by cli functions via [AuthToken::create_for_cli].
///
/// For global, not event-specific authorization, a GlobalAuthToken is required instead.
#[derive(Debug)]
pub struct AuthToken {
    event_id: EventId,
    user_id: Option<UserId>,
    roles: Vec<AccessRole>,
}

impl AuthToken {
    /// Create a new AuthToken for a (possibly anonymous) user.
    ///
    /// This function must only be used by implementations of
    /// [crate::data_store::CallboardStoreFacade::get_auth_token_for_user] after looking up the
    /// user's permissions for the event!
    pub(super) fn create_for_user(
        event_id: EventId,
        user_id: Option<UserId>,
        roles: Vec<AccessRole>,
    ) -> Self {
        AuthToken {
            event_id,
            user_id,
            roles,
        }
    }

    /// Create a new AuthToken for a command line interface functionality.
    ///
    /// The AuthToken is created with the AccessRole::Superuser and without a user.
    ///
    /// This function must only be used by command line interface functions, not in the context of
    /// the web server!
    pub fn create_for_cli(event_id: EventId, _key: &CliAuthTokenKey) -> Self {
        AuthToken {
            event_id,
            user_id: None,
            roles: vec![AccessRole::Superuser],
        }
    }

    /// The user, this AuthToken has been created for. Used for recording the acting person in the
    /// activity log.
    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    /// Check if the AuthToken authorizes for the given `privilege`.
    ///
    /// The actual authorization check is delegated to [Privilege::qualifying_roles], by checking if
    /// any of the active roles in the context (i.e. roles contained in the AuthToken) qualifies.
    pub fn has_privilege(&self, event_id: EventId, privilege: Privilege) -> bool {
        event_id == self.event_id
            && privilege
                .qualifying_roles()
                .iter()
                .any(|role| self.roles.contains(role))
    }

    /// Check if the AuthToken authorizes for the given `privilege`. If not, return an appropriate
    /// PermissionDenied error.
    pub fn check_privilege(
        &self,
        event_id: EventId,
        privilege: Privilege,
    ) -> Result<(), StoreError> {
        if self.has_privilege(event_id, privilege) {
            Ok(())
        } else {
            Err(StoreError::PermissionDenied {
                required_privilege: privilege,
                event_id: Some(event_id),
            })
        }
    }
}

/// Authorization token for authorizing access to the data_store for global (not event-specific)
/// actions.
///
/// A GlobalAuthToken can only be created by cli functions via [GlobalAuthToken::create_for_cli].
pub struct GlobalAuthToken {
    roles: Vec<AccessRole>,
}

impl GlobalAuthToken {
    pub fn create_for_cli(_key: &CliAuthTokenKey) -> Self {
        GlobalAuthToken {
            roles: vec![AccessRole::Superuser],
        }
    }

    pub fn has_privilege(&self, privilege: Privilege) -> bool {
        privilege
            .qualifying_roles()
            .iter()
            .any(|role| self.roles.contains(role))
    }

    pub fn check_privilege(&self, privilege: Privilege) -> Result<(), StoreError> {
        if self.has_privilege(privilege) {
            Ok(())
        } else {
            Err(StoreError::PermissionDenied {
                required_privilege: privilege,
                event_id: None,
            })
        }
    }
}

/// Possible roles of a user with respect to an event.
///
/// Each role qualifies for a set of [Privilege]s. See [Privilege::qualifying_roles].
#[derive(Eq, PartialEq, Ord, PartialOrd, Clone, Copy, Debug)]
pub enum AccessRole {
    /// Any logged-in user, who may hand in proposals
    Speaker,
    /// A user with an organizer permission for the event
    Organizer,
    Superuser,
}

impl AccessRole {
    pub fn name(&self) -> &'static str {
        match self {
            AccessRole::Speaker => "Speaker",
            AccessRole::Organizer => "Organizer",
            AccessRole::Superuser => "Superuser",
        }
    }
}

/// Enum of available authorization privileges.
///
/// Each data_store action and web endpoint typically requires a single privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    SubmitProposal,
    ShowSchedule,
    EditSchedule,
    ManageSubmissions,
    EditSettings,
    InviteOrganizers,
    CreateEvents,
    ManageUsers,
}

impl Privilege {
    /// Get the list of [AccessRole]s that qualify for this privilege. Each returned role is
    /// individually sufficient for the privilege.
    ///
    /// This is function is our source of truth for authorization!
    pub fn qualifying_roles(&self) -> &'static [AccessRole] {
        match self {
            Privilege::SubmitProposal => &[
                AccessRole::Speaker,
                AccessRole::Organizer,
                AccessRole::Superuser,
            ],
            Privilege::ShowSchedule => &[AccessRole::Organizer, AccessRole::Superuser],
            Privilege::EditSchedule => &[AccessRole::Organizer, AccessRole::Superuser],
            Privilege::ManageSubmissions => &[AccessRole::Organizer, AccessRole::Superuser],
            Privilege::EditSettings => &[AccessRole::Organizer, AccessRole::Superuser],
            Privilege::InviteOrganizers => &[AccessRole::Organizer, AccessRole::Superuser],
            Privilege::CreateEvents => &[AccessRole::Superuser],
            Privilege::ManageUsers => &[AccessRole::Superuser],
        }
    }
}
