use crate::cli::CliAuthTokenKey;
use crate::data_store::{StoreError, UserId};
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub struct EnumMemberNotExistingError {
    pub member_value: i32,
    pub enum_name: &'static str,
}

impl Display for EnumMemberNotExistingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} is not a valid value for {} enum",
            self.member_value, self.enum_name
        )
    }
}

impl std::error::Error for EnumMemberNotExistingError {}

/// Authorization token for authorizing access to the data_store
///
/// The AuthToken is keyed to a specific user (by its user id) and holds the list of the user's
/// [AccessRole]s. These imply specific [Privilege]s.
///
/// This structure is our main protection against accidental unauthorized-access bugs: All
/// data_store access function require an AuthToken and check the validity of the AuthToken
/// for the required privilege. An AuthToken can only be created by
/// [crate::data_store::RoomBookStoreFacade::get_auth_token_for_session], based on the user of a
/// verified session token, and by cli functions via [AuthToken::create_for_cli].
#[derive(Debug, Clone)]
pub struct AuthToken {
    user_id: UserId,
    roles: Vec<AccessRole>,
}

impl AuthToken {
    /// Create a new AuthToken for a client session, based on the stored role flags of the session's
    /// user.
    ///
    /// This function must only be used by implementations of
    /// [crate::data_store::RoomBookStoreFacade::get_auth_token_for_session]
    /// after checking that the user exists!
    pub(super) fn create_for_session(user_id: UserId, roles: Vec<AccessRole>) -> Self {
        AuthToken { user_id, roles }
    }

    /// Create a new AuthToken for a command line interface functionality.
    ///
    /// The AuthToken is created with the AccessRole::Admin and the nil user id, i.e. it does not
    /// belong to any user.
    ///
    /// This function must only be used by command line interface functions, not in the context of
    /// the web server!
    pub fn create_for_cli(_key: &CliAuthTokenKey) -> Self {
        AuthToken {
            user_id: UserId::nil(),
            roles: vec![AccessRole::Admin],
        }
    }

    /// Get the id of the user, this token has been created for
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn has_role(&self, role: AccessRole) -> bool {
        self.roles.contains(&role)
    }

    /// Check if the AuthToken authorizes for the given `privilege`.
    ///
    /// The actual authorization check is delegated to [Privilege::qualifying_roles], by checking if
    /// any of the qualifying roles is contained in the AuthToken.
    pub fn has_privilege(&self, privilege: Privilege) -> bool {
        privilege
            .qualifying_roles()
            .iter()
            .any(|role| self.roles.contains(role))
    }

    /// Check if the AuthToken authorizes for the given `privilege`. If not, return an appropriate
    /// PermissionDenied error.
    pub fn check_privilege(&self, privilege: Privilege) -> Result<(), StoreError> {
        if self.has_privilege(privilege) {
            Ok(())
        } else {
            Err(StoreError::PermissionDenied {
                required_privilege: privilege,
            })
        }
    }

    /// Check if the user of the AuthToken is the `owner` of an entity and has the `own_privilege`,
    /// or alternatively has the `all_privilege` for changing the entities of all users.
    pub fn check_owner_or_privilege(
        &self,
        owner: UserId,
        own_privilege: Privilege,
        all_privilege: Privilege,
    ) -> Result<(), StoreError> {
        if owner == self.user_id && self.has_privilege(own_privilege) {
            return Ok(());
        }
        self.check_privilege(all_privilege)
    }
}

/// Possible roles of a user.
///
/// Each role qualifies for a set of [Privilege]s. See [Privilege::qualifying_roles].
#[derive(Debug, Eq, PartialEq, Ord, PartialOrd, Clone, Copy)]
pub enum AccessRole {
    User,
    Kitchen,
    Admin,
}

impl AccessRole {
    pub fn name(&self) -> &str {
        match self {
            AccessRole::User => "User",
            AccessRole::Kitchen => "Kitchen",
            AccessRole::Admin => "Admin",
        }
    }

    /// Get the roles of a user with the given flags. Every user has the [AccessRole::User] role.
    pub fn for_user_flags(is_admin: bool, is_kitchen: bool) -> Vec<AccessRole> {
        let mut roles = vec![AccessRole::User];
        if is_kitchen {
            roles.push(AccessRole::Kitchen);
        }
        if is_admin {
            roles.push(AccessRole::Admin);
        }
        roles
    }
}

/// Enum of available authorization privileges.
///
/// Each data_store action and web endpoint typically requires a single privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    ShowSchedule,
    ManageOwnBookings,
    ManageAllBookings,
    ManageRooms,
    ProcessKitchenOrders,
    ManageUsers,
}

impl Privilege {
    /// Get the list of user [AccessRole]s that qualify for this privilege. Each returned role is
    /// individually sufficient for the privilege.
    ///
    /// This is function is our source of truth for authorization!
    pub fn qualifying_roles(&self) -> &'static [AccessRole] {
        match self {
            Privilege::ShowSchedule => &[AccessRole::User, AccessRole::Admin],
            Privilege::ManageOwnBookings => &[AccessRole::User, AccessRole::Admin],
            Privilege::ManageAllBookings => &[AccessRole::Admin],
            Privilege::ManageRooms => &[AccessRole::Admin],
            Privilege::ProcessKitchenOrders => &[AccessRole::Kitchen],
            Privilege::ManageUsers => &[AccessRole::Admin],
        }
    }
}
