//! Crew chief permission resolution
//!
//! Answers "does this user hold crew chief authority over this shift, job,
//! or client?" by checking, in order: the admin override, the shift's
//! designated crew chief, and then explicit grants walked from the most
//! specific scope to the least specific one (shift, then the shift's job,
//! then the job's client). Revoking a grant only affects its own scope; a
//! job-level grant keeps working after a shift-level grant is revoked.
//!
//! The service is generic over its two collaborators, the grant store and
//! the org directory, so the precedence rules are unit-testable without a
//! database. `repositories` provides the PostgreSQL implementations.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{
    ActingUser, NewPermissionGrant, PermissionGrant, PermissionGrantView, PermissionType, Shift,
    UserRole, UserSummary,
};

/// Custom error type for permission operations
#[derive(Error, Debug)]
pub enum PermissionError {
    /// The grantee or acting user does not exist
    #[error("user {0} not found")]
    UserNotFound(Uuid),

    /// The grantee's role may not hold crew chief permissions
    #[error("user {user_id} with role {role} cannot hold crew chief permissions")]
    IneligibleRole { user_id: Uuid, role: UserRole },

    /// The shift named as the check target does not exist
    #[error("shift {0} not found")]
    ShiftNotFound(Uuid),

    /// A job in the hierarchy walk does not exist
    #[error("job {0} not found")]
    JobNotFound(Uuid),

    /// The grant store or directory failed
    #[error("permission storage error: {0}")]
    Store(#[source] anyhow::Error),
}

/// Type alias for Result with PermissionError
pub type PermissionResult<T> = Result<T, PermissionError>;

/// The entity an authority check is aimed at
#[derive(Debug, Clone, Copy)]
pub enum AuthorityTarget {
    Shift(Uuid),
    Job(Uuid),
    Client(Uuid),
}

impl AuthorityTarget {
    /// Build a target from its scope type and id, as received on the wire.
    pub fn from_type(permission_type: PermissionType, target_id: Uuid) -> Self {
        match permission_type {
            PermissionType::Shift => AuthorityTarget::Shift(target_id),
            PermissionType::Job => AuthorityTarget::Job(target_id),
            PermissionType::Client => AuthorityTarget::Client(target_id),
        }
    }
}

/// Storage collaborator for permission grant rows
///
/// Multiple active grants for the same tuple are legal; the resolver only
/// ever asks whether at least one exists, so duplicates are harmless.
#[allow(async_fn_in_trait)]
pub trait GrantStore {
    async fn has_active_grant(
        &self,
        user_id: Uuid,
        permission_type: PermissionType,
        target_id: Uuid,
    ) -> anyhow::Result<bool>;

    async fn insert(&self, new_grant: &NewPermissionGrant) -> anyhow::Result<PermissionGrant>;

    /// Stamp `revoked_at` on every active grant for the tuple; returns how
    /// many rows were revoked.
    async fn revoke_all(
        &self,
        user_id: Uuid,
        permission_type: PermissionType,
        target_id: Uuid,
        revoked_at: DateTime<Utc>,
    ) -> anyhow::Result<u64>;

    async fn list_active(
        &self,
        permission_type: PermissionType,
        target_id: Uuid,
    ) -> anyhow::Result<Vec<PermissionGrant>>;
}

/// Lookup collaborator for users and the shift/job/client hierarchy
#[allow(async_fn_in_trait)]
pub trait OrgDirectory {
    async fn find_shift(&self, shift_id: Uuid) -> anyhow::Result<Option<Shift>>;

    async fn client_id_for_job(&self, job_id: Uuid) -> anyhow::Result<Option<Uuid>>;

    async fn find_user(&self, user_id: Uuid) -> anyhow::Result<Option<UserSummary>>;
}

/// Permission service resolving crew chief authority
#[derive(Clone)]
pub struct PermissionService<S, D> {
    grants: S,
    directory: D,
}

impl<S: GrantStore, D: OrgDirectory> PermissionService<S, D> {
    /// Create a new permission service over its collaborators
    pub fn new(grants: S, directory: D) -> Self {
        Self { grants, directory }
    }

    /// Resolve the acting user by id, then run the authority check.
    pub async fn check_authority(
        &self,
        user_id: Uuid,
        target: AuthorityTarget,
    ) -> PermissionResult<bool> {
        let user = self
            .directory
            .find_user(user_id)
            .await
            .map_err(PermissionError::Store)?
            .ok_or(PermissionError::UserNotFound(user_id))?;

        self.has_crew_chief_authority(
            &ActingUser {
                id: user.id,
                role: user.role,
            },
            target,
        )
        .await
    }

    /// Does this user hold crew chief authority over the target?
    ///
    /// Precedence, highest first: admin override, shift designation, then
    /// explicit grants from the most specific scope upward. A missing shift
    /// or broken job link is a typed not-found error, distinct from a plain
    /// `Ok(false)` denial.
    pub async fn has_crew_chief_authority(
        &self,
        user: &ActingUser,
        target: AuthorityTarget,
    ) -> PermissionResult<bool> {
        if user.role == UserRole::Admin {
            return Ok(true);
        }
        // Roles outside the grant-eligible set never hold authority, no
        // matter what stale grant or designation rows still point at them.
        if !user.role.can_hold_grants() {
            return Ok(false);
        }

        match target {
            AuthorityTarget::Shift(shift_id) => {
                let shift = self
                    .directory
                    .find_shift(shift_id)
                    .await
                    .map_err(PermissionError::Store)?
                    .ok_or(PermissionError::ShiftNotFound(shift_id))?;

                if shift.designated_crew_chief_id == Some(user.id) {
                    return Ok(true);
                }
                if self.has_grant(user.id, PermissionType::Shift, shift_id).await? {
                    return Ok(true);
                }
                self.walk_from_job(user.id, shift.job_id).await
            }
            AuthorityTarget::Job(job_id) => self.walk_from_job(user.id, job_id).await,
            AuthorityTarget::Client(client_id) => {
                self.has_grant(user.id, PermissionType::Client, client_id).await
            }
        }
    }

    /// Grant crew chief permission over a target to a user
    ///
    /// The grantee must exist and hold a grant-eligible role. No dedup
    /// against existing active grants is attempted; the any-active-grant
    /// check keeps duplicates harmless.
    pub async fn grant_permission(
        &self,
        user_id: Uuid,
        permission_type: PermissionType,
        target_id: Uuid,
        granted_by: Uuid,
    ) -> PermissionResult<PermissionGrant> {
        let user = self
            .directory
            .find_user(user_id)
            .await
            .map_err(PermissionError::Store)?
            .ok_or(PermissionError::UserNotFound(user_id))?;

        if !user.role.can_hold_grants() {
            return Err(PermissionError::IneligibleRole {
                user_id,
                role: user.role,
            });
        }

        let grant = self
            .grants
            .insert(&NewPermissionGrant {
                user_id,
                permission_type,
                target_id,
                granted_by,
            })
            .await
            .map_err(PermissionError::Store)?;

        info!(
            "Granted {} permission on {} to user {}",
            permission_type, target_id, user_id
        );
        Ok(grant)
    }

    /// Revoke all active grants for the tuple
    ///
    /// Idempotent: revoking an absent or already-revoked grant succeeds and
    /// reports zero rows touched.
    pub async fn revoke_permission(
        &self,
        user_id: Uuid,
        permission_type: PermissionType,
        target_id: Uuid,
    ) -> PermissionResult<u64> {
        let revoked = self
            .grants
            .revoke_all(user_id, permission_type, target_id, Utc::now())
            .await
            .map_err(PermissionError::Store)?;

        if revoked > 0 {
            info!(
                "Revoked {} active {} grant(s) on {} for user {}",
                revoked, permission_type, target_id, user_id
            );
        }
        Ok(revoked)
    }

    /// List the active grants for a target, enriched with grantee details
    pub async fn list_permissions(
        &self,
        permission_type: PermissionType,
        target_id: Uuid,
    ) -> PermissionResult<Vec<PermissionGrantView>> {
        let grants = self
            .grants
            .list_active(permission_type, target_id)
            .await
            .map_err(PermissionError::Store)?;

        let mut views = Vec::with_capacity(grants.len());
        for grant in grants {
            let Some(user) = self
                .directory
                .find_user(grant.user_id)
                .await
                .map_err(PermissionError::Store)?
            else {
                warn!(
                    "Skipping grant {} whose user {} no longer resolves",
                    grant.id, grant.user_id
                );
                continue;
            };
            views.push(PermissionGrantView {
                id: grant.id,
                user_id: grant.user_id,
                user_name: user.name,
                user_role: user.role,
                permission_type: grant.permission_type,
                target_id: grant.target_id,
                granted_at: grant.granted_at,
            });
        }
        Ok(views)
    }

    async fn has_grant(
        &self,
        user_id: Uuid,
        permission_type: PermissionType,
        target_id: Uuid,
    ) -> PermissionResult<bool> {
        self.grants
            .has_active_grant(user_id, permission_type, target_id)
            .await
            .map_err(PermissionError::Store)
    }

    /// Grant walk starting at a job: job scope first, then the job's client.
    async fn walk_from_job(&self, user_id: Uuid, job_id: Uuid) -> PermissionResult<bool> {
        if self.has_grant(user_id, PermissionType::Job, job_id).await? {
            return Ok(true);
        }
        let client_id = self
            .directory
            .client_id_for_job(job_id)
            .await
            .map_err(PermissionError::Store)?
            .ok_or(PermissionError::JobNotFound(job_id))?;
        self.has_grant(user_id, PermissionType::Client, client_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory grant store mirroring the any-active-grant semantics
    #[derive(Default)]
    struct MemoryGrants {
        rows: Mutex<Vec<PermissionGrant>>,
    }

    impl GrantStore for MemoryGrants {
        async fn has_active_grant(
            &self,
            user_id: Uuid,
            permission_type: PermissionType,
            target_id: Uuid,
        ) -> anyhow::Result<bool> {
            Ok(self.rows.lock().unwrap().iter().any(|g| {
                g.user_id == user_id
                    && g.permission_type == permission_type
                    && g.target_id == target_id
                    && g.is_active()
            }))
        }

        async fn insert(&self, new_grant: &NewPermissionGrant) -> anyhow::Result<PermissionGrant> {
            let grant = PermissionGrant {
                id: Uuid::new_v4(),
                user_id: new_grant.user_id,
                permission_type: new_grant.permission_type,
                target_id: new_grant.target_id,
                granted_by: new_grant.granted_by,
                granted_at: Utc::now(),
                revoked_at: None,
            };
            self.rows.lock().unwrap().push(grant.clone());
            Ok(grant)
        }

        async fn revoke_all(
            &self,
            user_id: Uuid,
            permission_type: PermissionType,
            target_id: Uuid,
            revoked_at: DateTime<Utc>,
        ) -> anyhow::Result<u64> {
            let mut rows = self.rows.lock().unwrap();
            let mut revoked = 0;
            for grant in rows.iter_mut() {
                if grant.user_id == user_id
                    && grant.permission_type == permission_type
                    && grant.target_id == target_id
                    && grant.is_active()
                {
                    grant.revoked_at = Some(revoked_at);
                    revoked += 1;
                }
            }
            Ok(revoked)
        }

        async fn list_active(
            &self,
            permission_type: PermissionType,
            target_id: Uuid,
        ) -> anyhow::Result<Vec<PermissionGrant>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|g| {
                    g.permission_type == permission_type
                        && g.target_id == target_id
                        && g.is_active()
                })
                .cloned()
                .collect())
        }
    }

    #[derive(Default)]
    struct MemoryDirectory {
        shifts: HashMap<Uuid, Shift>,
        job_clients: HashMap<Uuid, Uuid>,
        users: HashMap<Uuid, UserSummary>,
    }

    impl OrgDirectory for MemoryDirectory {
        async fn find_shift(&self, shift_id: Uuid) -> anyhow::Result<Option<Shift>> {
            Ok(self.shifts.get(&shift_id).cloned())
        }

        async fn client_id_for_job(&self, job_id: Uuid) -> anyhow::Result<Option<Uuid>> {
            Ok(self.job_clients.get(&job_id).copied())
        }

        async fn find_user(&self, user_id: Uuid) -> anyhow::Result<Option<UserSummary>> {
            Ok(self.users.get(&user_id).cloned())
        }
    }

    struct Fixture {
        service: PermissionService<MemoryGrants, MemoryDirectory>,
        shift_id: Uuid,
        job_id: Uuid,
        client_id: Uuid,
        admin_id: Uuid,
    }

    fn fixture() -> Fixture {
        let shift_id = Uuid::new_v4();
        let job_id = Uuid::new_v4();
        let client_id = Uuid::new_v4();
        let admin_id = Uuid::new_v4();

        let mut directory = MemoryDirectory::default();
        directory.shifts.insert(
            shift_id,
            Shift {
                id: shift_id,
                job_id,
                designated_crew_chief_id: None,
                starts_at: Utc.with_ymd_and_hms(2024, 3, 5, 14, 0, 0).unwrap(),
                ends_at: Utc.with_ymd_and_hms(2024, 3, 5, 22, 0, 0).unwrap(),
            },
        );
        directory.job_clients.insert(job_id, client_id);
        directory.users.insert(
            admin_id,
            UserSummary {
                id: admin_id,
                name: "Dispatch Admin".to_string(),
                role: UserRole::Admin,
            },
        );

        Fixture {
            service: PermissionService::new(MemoryGrants::default(), directory),
            shift_id,
            job_id,
            client_id,
            admin_id,
        }
    }

    impl Fixture {
        fn add_user(&mut self, name: &str, role: UserRole) -> Uuid {
            let id = Uuid::new_v4();
            self.service.directory.users.insert(
                id,
                UserSummary {
                    id,
                    name: name.to_string(),
                    role,
                },
            );
            id
        }

        fn acting(&self, id: Uuid, role: UserRole) -> ActingUser {
            ActingUser { id, role }
        }
    }

    #[tokio::test]
    async fn test_admin_bypasses_all_grant_checks() {
        let fx = fixture();
        let admin = fx.acting(fx.admin_id, UserRole::Admin);

        for target in [
            AuthorityTarget::Shift(fx.shift_id),
            AuthorityTarget::Job(fx.job_id),
            AuthorityTarget::Client(fx.client_id),
            // Admins do not even need the target to exist.
            AuthorityTarget::Shift(Uuid::new_v4()),
        ] {
            assert!(
                fx.service
                    .has_crew_chief_authority(&admin, target)
                    .await
                    .unwrap()
            );
        }
    }

    #[tokio::test]
    async fn test_designated_crew_chief_needs_no_grant_rows() {
        let mut fx = fixture();
        let chief_id = fx.add_user("Pat Rivera", UserRole::CrewChief);
        fx.service
            .directory
            .shifts
            .get_mut(&fx.shift_id)
            .unwrap()
            .designated_crew_chief_id = Some(chief_id);

        let chief = fx.acting(chief_id, UserRole::CrewChief);
        assert!(
            fx.service
                .has_crew_chief_authority(&chief, AuthorityTarget::Shift(fx.shift_id))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_no_grants_means_no_authority() {
        let mut fx = fixture();
        let worker_id = fx.add_user("Sam Osei", UserRole::Employee);
        let worker = fx.acting(worker_id, UserRole::Employee);

        assert!(
            !fx.service
                .has_crew_chief_authority(&worker, AuthorityTarget::Shift(fx.shift_id))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_shift_authority_inherits_from_job_and_client_grants() {
        let mut fx = fixture();
        let via_job = fx.add_user("Jo March", UserRole::Employee);
        let via_client = fx.add_user("Lee Chen", UserRole::CrewChief);

        fx.service
            .grant_permission(via_job, PermissionType::Job, fx.job_id, fx.admin_id)
            .await
            .unwrap();
        fx.service
            .grant_permission(via_client, PermissionType::Client, fx.client_id, fx.admin_id)
            .await
            .unwrap();

        let target = AuthorityTarget::Shift(fx.shift_id);
        assert!(
            fx.service
                .has_crew_chief_authority(&fx.acting(via_job, UserRole::Employee), target)
                .await
                .unwrap()
        );
        assert!(
            fx.service
                .has_crew_chief_authority(&fx.acting(via_client, UserRole::CrewChief), target)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_revocation_is_scoped_to_its_own_level() {
        let mut fx = fixture();
        let worker_id = fx.add_user("Ana Flores", UserRole::CrewChief);

        fx.service
            .grant_permission(worker_id, PermissionType::Shift, fx.shift_id, fx.admin_id)
            .await
            .unwrap();
        fx.service
            .grant_permission(worker_id, PermissionType::Job, fx.job_id, fx.admin_id)
            .await
            .unwrap();
        fx.service
            .revoke_permission(worker_id, PermissionType::Shift, fx.shift_id)
            .await
            .unwrap();

        // The job-level grant still confers authority over the shift.
        assert!(
            fx.service
                .has_crew_chief_authority(
                    &fx.acting(worker_id, UserRole::CrewChief),
                    AuthorityTarget::Shift(fx.shift_id)
                )
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_job_target_walks_up_to_client_only() {
        let mut fx = fixture();
        let worker_id = fx.add_user("Kit Doyle", UserRole::Employee);
        fx.service
            .grant_permission(worker_id, PermissionType::Client, fx.client_id, fx.admin_id)
            .await
            .unwrap();

        let worker = fx.acting(worker_id, UserRole::Employee);
        assert!(
            fx.service
                .has_crew_chief_authority(&worker, AuthorityTarget::Job(fx.job_id))
                .await
                .unwrap()
        );
        // A shift-level grant on some other worker's shift does not leak
        // down; client targets only consult client grants.
        assert!(
            fx.service
                .has_crew_chief_authority(&worker, AuthorityTarget::Client(fx.client_id))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_client_role_holds_no_authority_despite_stale_grants() {
        let mut fx = fixture();
        let contact_id = fx.add_user("Client Contact", UserRole::Client);
        // Simulate a stale row left behind by a role change.
        fx.service
            .grants
            .insert(&NewPermissionGrant {
                user_id: contact_id,
                permission_type: PermissionType::Shift,
                target_id: fx.shift_id,
                granted_by: fx.admin_id,
            })
            .await
            .unwrap();

        assert!(
            !fx.service
                .has_crew_chief_authority(
                    &fx.acting(contact_id, UserRole::Client),
                    AuthorityTarget::Shift(fx.shift_id)
                )
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_missing_shift_is_an_error_not_a_denial() {
        let mut fx = fixture();
        let worker_id = fx.add_user("Sam Osei", UserRole::Employee);
        let missing = Uuid::new_v4();

        let result = fx
            .service
            .has_crew_chief_authority(
                &fx.acting(worker_id, UserRole::Employee),
                AuthorityTarget::Shift(missing),
            )
            .await;
        assert!(matches!(result, Err(PermissionError::ShiftNotFound(id)) if id == missing));
    }

    #[tokio::test]
    async fn test_broken_job_link_is_a_job_not_found_error() {
        let mut fx = fixture();
        let worker_id = fx.add_user("Sam Osei", UserRole::Employee);
        let orphan_job = Uuid::new_v4();

        let result = fx
            .service
            .has_crew_chief_authority(
                &fx.acting(worker_id, UserRole::Employee),
                AuthorityTarget::Job(orphan_job),
            )
            .await;
        assert!(matches!(result, Err(PermissionError::JobNotFound(id)) if id == orphan_job));
    }

    #[tokio::test]
    async fn test_granting_to_ineligible_roles_is_rejected_without_rows() {
        let mut fx = fixture();
        let contact_id = fx.add_user("Client Contact", UserRole::Client);

        let result = fx
            .service
            .grant_permission(contact_id, PermissionType::Shift, fx.shift_id, fx.admin_id)
            .await;
        assert!(matches!(
            result,
            Err(PermissionError::IneligibleRole { user_id, .. }) if user_id == contact_id
        ));
        assert!(
            fx.service
                .list_permissions(PermissionType::Shift, fx.shift_id)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_granting_to_unknown_users_is_rejected() {
        let fx = fixture();
        let ghost = Uuid::new_v4();

        let result = fx
            .service
            .grant_permission(ghost, PermissionType::Job, fx.job_id, fx.admin_id)
            .await;
        assert!(matches!(result, Err(PermissionError::UserNotFound(id)) if id == ghost));
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let mut fx = fixture();
        let worker_id = fx.add_user("Ana Flores", UserRole::Employee);
        fx.service
            .grant_permission(worker_id, PermissionType::Job, fx.job_id, fx.admin_id)
            .await
            .unwrap();

        let first = fx
            .service
            .revoke_permission(worker_id, PermissionType::Job, fx.job_id)
            .await
            .unwrap();
        let second = fx
            .service
            .revoke_permission(worker_id, PermissionType::Job, fx.job_id)
            .await
            .unwrap();
        assert_eq!(first, 1);
        assert_eq!(second, 0);

        // Revoking a tuple that never existed is also a quiet no-op.
        let absent = fx
            .service
            .revoke_permission(worker_id, PermissionType::Shift, fx.shift_id)
            .await
            .unwrap();
        assert_eq!(absent, 0);
    }

    #[tokio::test]
    async fn test_duplicate_active_grants_are_tolerated() {
        let mut fx = fixture();
        let worker_id = fx.add_user("Jo March", UserRole::CrewChief);

        for _ in 0..2 {
            fx.service
                .grant_permission(worker_id, PermissionType::Shift, fx.shift_id, fx.admin_id)
                .await
                .unwrap();
        }

        assert!(
            fx.service
                .has_crew_chief_authority(
                    &fx.acting(worker_id, UserRole::CrewChief),
                    AuthorityTarget::Shift(fx.shift_id)
                )
                .await
                .unwrap()
        );
        // One revoke clears every active duplicate.
        let revoked = fx
            .service
            .revoke_permission(worker_id, PermissionType::Shift, fx.shift_id)
            .await
            .unwrap();
        assert_eq!(revoked, 2);
    }

    #[tokio::test]
    async fn test_listing_enriches_grants_and_skips_dangling_users() {
        let mut fx = fixture();
        let worker_id = fx.add_user("Jo March", UserRole::CrewChief);
        fx.service
            .grant_permission(worker_id, PermissionType::Job, fx.job_id, fx.admin_id)
            .await
            .unwrap();
        // A grant whose user record has since disappeared.
        fx.service
            .grants
            .insert(&NewPermissionGrant {
                user_id: Uuid::new_v4(),
                permission_type: PermissionType::Job,
                target_id: fx.job_id,
                granted_by: fx.admin_id,
            })
            .await
            .unwrap();

        let views = fx
            .service
            .list_permissions(PermissionType::Job, fx.job_id)
            .await
            .unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].user_id, worker_id);
        assert_eq!(views[0].user_name, "Jo March");
        assert_eq!(views[0].user_role, UserRole::CrewChief);
    }

    #[tokio::test]
    async fn test_check_authority_resolves_the_acting_user() {
        let mut fx = fixture();
        let worker_id = fx.add_user("Sam Osei", UserRole::Employee);
        fx.service
            .grant_permission(worker_id, PermissionType::Shift, fx.shift_id, fx.admin_id)
            .await
            .unwrap();

        assert!(
            fx.service
                .check_authority(worker_id, AuthorityTarget::Shift(fx.shift_id))
                .await
                .unwrap()
        );
        let result = fx
            .service
            .check_authority(Uuid::new_v4(), AuthorityTarget::Shift(fx.shift_id))
            .await;
        assert!(matches!(result, Err(PermissionError::UserNotFound(_))));
    }
}
