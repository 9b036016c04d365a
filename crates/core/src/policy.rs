//! Authorization policy.
//!
//! All role, ownership, membership and task-state rules live here as small
//! predicates composed by [`authorize`]. Handlers fetch the facts an
//! [`Action`] needs and never compare roles or owners themselves.

use crate::error::CoreError;
use crate::roles::Role;
use crate::types::DbId;

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: DbId,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: DbId, role: Role) -> Self {
        Self { user_id, role }
    }
}

/// State of the task a document is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskGate {
    pub assignee_id: Option<DbId>,
    pub completed: bool,
}

/// An operation together with the resource facts its rule depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateProject,
    /// Update or delete a project, or manage its phases and members.
    ManageProject { manager_id: DbId },
    /// Create, edit or delete tasks of a project.
    ManageTasks { manager_id: DbId },
    ChangeTaskStatus { assignee_id: Option<DbId> },
    ReviewTask,
    ManageContract,
    UploadDocument {
        manager_id: DbId,
        created_by: DbId,
        is_member: bool,
        task: Option<TaskGate>,
    },
    EditDocument { manager_id: DbId, uploaded_by: DbId },
    DeleteDocument {
        manager_id: DbId,
        uploaded_by: DbId,
        task: Option<TaskGate>,
    },
    ArchiveDocument,
    ManageUsers,
    ViewAllLogs,
    UploadKnowledge,
    EditKnowledge,
    DeleteKnowledge { uploaded_by: DbId },
    ManageKnowledgeCategories,
    ModifyExpense { reimbursed_by: DbId },
    /// Bulk import may update expenses reimbursed by anyone.
    ImportExpenses,
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

pub fn is_admin(actor: &Actor) -> bool {
    actor.role == Role::Admin
}

pub fn owns(actor: &Actor, owner_id: DbId) -> bool {
    actor.user_id == owner_id
}

fn owns_opt(actor: &Actor, owner_id: Option<DbId>) -> bool {
    owner_id.is_some_and(|id| owns(actor, id))
}

fn contributor_or_admin(actor: &Actor) -> bool {
    is_admin(actor) || actor.role.is_contributor()
}

fn check(allowed: bool, msg: &str) -> Result<(), CoreError> {
    if allowed {
        Ok(())
    } else {
        Err(CoreError::forbidden(msg))
    }
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// Decide whether `actor` may perform `action`.
pub fn authorize(actor: &Actor, action: &Action) -> Result<(), CoreError> {
    match *action {
        Action::CreateProject | Action::ReviewTask | Action::ManageContract => check(
            contributor_or_admin(actor),
            "Team leader or team member role required",
        ),

        Action::ManageProject { manager_id } => check(
            is_admin(actor) || owns(actor, manager_id),
            "Only the project manager or an admin may modify this project",
        ),

        Action::ManageTasks { manager_id } => {
            check(
                contributor_or_admin(actor),
                "Team leader or team member role required",
            )?;
            check(
                is_admin(actor) || owns(actor, manager_id),
                "Only the project manager or an admin may manage tasks of this project",
            )
        }

        // No admin override.
        Action::ChangeTaskStatus { assignee_id } => check(
            owns_opt(actor, assignee_id),
            "Only the task assignee may change its status",
        ),

        Action::UploadDocument {
            manager_id,
            created_by,
            is_member,
            task,
        } => {
            if is_admin(actor) {
                return Ok(());
            }
            match task {
                Some(gate) if gate.completed => check(
                    owns(actor, manager_id),
                    "Task is completed; only the project manager may attach deliverables",
                ),
                Some(gate) => check(
                    owns_opt(actor, gate.assignee_id),
                    "Only the task assignee may attach deliverables before completion",
                ),
                None => check(
                    owns(actor, manager_id) || owns(actor, created_by) || is_member,
                    "Only project members may upload documents to this project",
                ),
            }
        }

        Action::EditDocument {
            manager_id,
            uploaded_by,
        } => check(
            is_admin(actor) || owns(actor, manager_id) || owns(actor, uploaded_by),
            "Only the uploader, the project manager or an admin may edit this document",
        ),

        Action::DeleteDocument {
            manager_id,
            uploaded_by,
            task,
        } => {
            if is_admin(actor) {
                return Ok(());
            }
            match task {
                Some(gate) if gate.completed => check(
                    owns(actor, manager_id),
                    "Task is completed; only the project manager may remove deliverables",
                ),
                Some(gate) => check(
                    owns_opt(actor, gate.assignee_id),
                    "Only the task assignee may remove deliverables before completion",
                ),
                None => check(
                    owns(actor, uploaded_by),
                    "Only the uploader or an admin may delete this document",
                ),
            }
        }

        Action::ArchiveDocument
        | Action::ManageUsers
        | Action::ViewAllLogs
        | Action::EditKnowledge
        | Action::ManageKnowledgeCategories
        | Action::ImportExpenses => check(
            actor.role.is_management(),
            "Admin or department manager role required",
        ),

        Action::UploadKnowledge => Ok(()),

        Action::DeleteKnowledge { uploaded_by } => check(
            actor.role.is_management() || owns(actor, uploaded_by),
            "Only the uploader, a department manager or an admin may delete this item",
        ),

        Action::ModifyExpense { reimbursed_by } => check(
            is_admin(actor) || owns(actor, reimbursed_by),
            "Only the reimbursing user or an admin may modify this expense",
        ),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const MANAGER: DbId = 10;
    const ASSIGNEE: DbId = 20;
    const OUTSIDER: DbId = 30;
    const ADMIN: DbId = 1;

    fn admin() -> Actor {
        Actor::new(ADMIN, Role::Admin)
    }

    fn leader(id: DbId) -> Actor {
        Actor::new(id, Role::TeamLeader)
    }

    fn member(id: DbId) -> Actor {
        Actor::new(id, Role::TeamMember)
    }

    fn allowed(actor: Actor, action: Action) -> bool {
        authorize(&actor, &action).is_ok()
    }

    #[test]
    fn project_creation_is_limited_to_contributors_and_admin() {
        assert!(allowed(leader(MANAGER), Action::CreateProject));
        assert!(allowed(member(OUTSIDER), Action::CreateProject));
        assert!(allowed(admin(), Action::CreateProject));
        assert!(!allowed(
            Actor::new(OUTSIDER, Role::DeptManager),
            Action::CreateProject
        ));
    }

    #[test]
    fn only_manager_or_admin_manage_project() {
        let action = Action::ManageProject {
            manager_id: MANAGER,
        };
        assert!(allowed(leader(MANAGER), action));
        assert!(allowed(admin(), action));
        assert_matches!(
            authorize(&leader(OUTSIDER), &action),
            Err(CoreError::Forbidden(_))
        );
    }

    #[test]
    fn task_management_needs_role_and_ownership() {
        let action = Action::ManageTasks {
            manager_id: MANAGER,
        };
        assert!(allowed(member(MANAGER), action));
        assert!(!allowed(member(OUTSIDER), action));
        assert!(
            !allowed(Actor::new(MANAGER, Role::DeptManager), action),
            "role gate applies even to the owner"
        );
    }

    #[test]
    fn only_assignee_changes_task_status_admin_included() {
        let action = Action::ChangeTaskStatus {
            assignee_id: Some(ASSIGNEE),
        };
        assert!(allowed(member(ASSIGNEE), action));
        assert!(!allowed(leader(MANAGER), action));
        assert!(!allowed(admin(), action), "admin is not exempt");
        assert!(!allowed(
            member(ASSIGNEE),
            Action::ChangeTaskStatus { assignee_id: None }
        ));
    }

    #[test]
    fn open_task_deliverables_belong_to_assignee() {
        let gate = TaskGate {
            assignee_id: Some(ASSIGNEE),
            completed: false,
        };
        let upload = Action::UploadDocument {
            manager_id: MANAGER,
            created_by: MANAGER,
            is_member: true,
            task: Some(gate),
        };
        assert!(allowed(member(ASSIGNEE), upload));
        assert!(!allowed(leader(MANAGER), upload));
        assert!(allowed(admin(), upload));

        let delete = Action::DeleteDocument {
            manager_id: MANAGER,
            uploaded_by: ASSIGNEE,
            task: Some(gate),
        };
        assert!(allowed(member(ASSIGNEE), delete));
        assert!(!allowed(leader(MANAGER), delete));
    }

    #[test]
    fn completed_task_deliverables_belong_to_manager() {
        let gate = TaskGate {
            assignee_id: Some(ASSIGNEE),
            completed: true,
        };
        let upload = Action::UploadDocument {
            manager_id: MANAGER,
            created_by: MANAGER,
            is_member: true,
            task: Some(gate),
        };
        assert!(allowed(leader(MANAGER), upload));
        assert!(!allowed(member(ASSIGNEE), upload));

        let delete = Action::DeleteDocument {
            manager_id: MANAGER,
            uploaded_by: ASSIGNEE,
            task: Some(gate),
        };
        assert!(allowed(leader(MANAGER), delete));
        assert!(!allowed(member(ASSIGNEE), delete), "uploader loses rights after completion");
    }

    #[test]
    fn project_documents_accept_members() {
        let upload = |is_member| Action::UploadDocument {
            manager_id: MANAGER,
            created_by: MANAGER,
            is_member,
            task: None,
        };
        assert!(allowed(member(OUTSIDER), upload(true)));
        assert!(!allowed(member(OUTSIDER), upload(false)));
        assert!(allowed(leader(MANAGER), upload(false)));
    }

    #[test]
    fn plain_documents_are_deleted_by_uploader() {
        let delete = Action::DeleteDocument {
            manager_id: MANAGER,
            uploaded_by: OUTSIDER,
            task: None,
        };
        assert!(allowed(member(OUTSIDER), delete));
        assert!(!allowed(leader(MANAGER), delete));
    }

    #[test]
    fn knowledge_deletion_allows_management_or_uploader() {
        let action = Action::DeleteKnowledge {
            uploaded_by: OUTSIDER,
        };
        assert!(allowed(member(OUTSIDER), action));
        assert!(allowed(Actor::new(2, Role::DeptManager), action));
        assert!(!allowed(leader(MANAGER), action));
    }

    #[test]
    fn management_actions_require_management_role() {
        for action in [
            Action::ManageUsers,
            Action::ViewAllLogs,
            Action::ArchiveDocument,
            Action::EditKnowledge,
            Action::ManageKnowledgeCategories,
            Action::ImportExpenses,
        ] {
            assert!(allowed(admin(), action));
            assert!(allowed(Actor::new(2, Role::DeptManager), action));
            assert!(!allowed(leader(MANAGER), action), "{action:?}");
        }
    }

    #[test]
    fn expenses_are_modified_by_reimburser_or_admin() {
        let action = Action::ModifyExpense {
            reimbursed_by: ASSIGNEE,
        };
        assert!(allowed(member(ASSIGNEE), action));
        assert!(allowed(admin(), action));
        assert!(!allowed(Actor::new(2, Role::DeptManager), action));
    }
}
