/// Integration tests for projects, memberships and cascade deletion
///
/// Skipped unless DATABASE_URL is set.

mod common;

use basecampy_shared::auth::authorization::{require_project_role, AuthzError, ADMINS, ANY_ROLE};
use basecampy_shared::auth::middleware::AuthContext;
use basecampy_shared::cascade::delete_project;
use basecampy_shared::models::membership::{Membership, ProjectRole};
use basecampy_shared::models::note::Note;
use basecampy_shared::models::project::{Project, UpdateProject};
use basecampy_shared::models::subtask::{CreateSubtask, Subtask};
use basecampy_shared::models::task::{CreateTask, Task, TaskStatus, UpdateTask};
use uuid::Uuid;

#[tokio::test]
async fn test_creator_becomes_admin() {
    let Some(pool) = common::test_pool().await else {
        return;
    };

    let owner = common::create_user(&pool).await;
    let project = common::create_project(&pool, &owner).await;

    let role = Membership::get_role(&pool, project.id, owner.id).await.unwrap();
    assert_eq!(role, Some(ProjectRole::Admin));

    let listings = Project::list_for_user(&pool, owner.id).await.unwrap();
    let listing = listings.iter().find(|p| p.id == project.id).expect("listed");
    assert_eq!(listing.role, ProjectRole::Admin);
    assert_eq!(listing.members, 1);
}

#[tokio::test]
async fn test_duplicate_project_name_is_rejected_atomically() {
    let Some(pool) = common::test_pool().await else {
        return;
    };

    let owner = common::create_user(&pool).await;
    let project = common::create_project(&pool, &owner).await;
    let other = common::create_user(&pool).await;

    let err = Project::create(
        &pool,
        basecampy_shared::models::project::CreateProject {
            name: project.name.clone(),
            description: None,
            created_by: other.id,
        },
    )
    .await
    .expect_err("duplicate name must fail");

    let constraint = err.as_database_error().and_then(|e| e.constraint().map(str::to_string));
    assert_eq!(constraint.as_deref(), Some("projects_name_key"));

    // No stray membership for the failed creation
    assert!(Project::list_for_user(&pool, other.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_upsert_twice_keeps_latest_role() {
    let Some(pool) = common::test_pool().await else {
        return;
    };

    let owner = common::create_user(&pool).await;
    let member = common::create_user(&pool).await;
    let project = common::create_project(&pool, &owner).await;

    Membership::upsert(&pool, project.id, member.id, ProjectRole::Member)
        .await
        .unwrap();
    let second = Membership::upsert(&pool, project.id, member.id, ProjectRole::ProjectAdmin)
        .await
        .unwrap();
    assert_eq!(second.role, ProjectRole::ProjectAdmin);

    let rows: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM project_members WHERE project_id = $1 AND user_id = $2",
    )
    .bind(project.id)
    .bind(member.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(rows, 1);

    let members = Membership::list_members(&pool, project.id).await.unwrap();
    assert_eq!(members.len(), 2);
    let listed = members.iter().find(|m| m.user.id == member.id).unwrap();
    assert_eq!(listed.role, ProjectRole::ProjectAdmin);
    assert_eq!(listed.user.username, member.username);
}

#[tokio::test]
async fn test_update_and_remove_missing_member() {
    let Some(pool) = common::test_pool().await else {
        return;
    };

    let owner = common::create_user(&pool).await;
    let project = common::create_project(&pool, &owner).await;
    let stranger = Uuid::new_v4();

    assert!(Membership::update_role(&pool, project.id, stranger, ProjectRole::Admin)
        .await
        .unwrap()
        .is_none());
    assert!(Membership::delete(&pool, project.id, stranger).await.unwrap().is_none());
}

#[tokio::test]
async fn test_non_member_is_denied() {
    let Some(pool) = common::test_pool().await else {
        return;
    };

    let owner = common::create_user(&pool).await;
    let outsider = common::create_user(&pool).await;
    let member = common::create_user(&pool).await;
    let project = common::create_project(&pool, &owner).await;
    Membership::upsert(&pool, project.id, member.id, ProjectRole::Member)
        .await
        .unwrap();

    let outsider_ctx = AuthContext::from_user(&outsider);
    assert!(matches!(
        require_project_role(&pool, &outsider_ctx, project.id, ANY_ROLE).await,
        Err(AuthzError::NotMember(_))
    ));

    let member_ctx = AuthContext::from_user(&member);
    assert_eq!(
        require_project_role(&pool, &member_ctx, project.id, ANY_ROLE).await.unwrap(),
        ProjectRole::Member
    );
    assert!(matches!(
        require_project_role(&pool, &member_ctx, project.id, ADMINS).await,
        Err(AuthzError::RoleNotAllowed { actual: ProjectRole::Member, .. })
    ));
}

#[tokio::test]
async fn test_project_partial_update() {
    let Some(pool) = common::test_pool().await else {
        return;
    };

    let owner = common::create_user(&pool).await;
    let project = common::create_project(&pool, &owner).await;

    let updated = Project::update(
        &pool,
        project.id,
        UpdateProject {
            name: None,
            description: Some("new description".to_string()),
        },
    )
    .await
    .unwrap()
    .expect("project exists");

    assert_eq!(updated.name, project.name);
    assert_eq!(updated.description.as_deref(), Some("new description"));
}

#[tokio::test]
async fn test_records_are_scoped_to_their_project() {
    let Some(pool) = common::test_pool().await else {
        return;
    };

    let owner = common::create_user(&pool).await;
    let p = common::create_project(&pool, &owner).await;
    let q = common::create_project(&pool, &owner).await;

    let task = Task::create(
        &pool,
        CreateTask {
            project_id: p.id,
            title: "Scoped".to_string(),
            description: "Only in P".to_string(),
            assigned_to: None,
            assigned_by: owner.id,
            status: TaskStatus::Todo,
            attachments: Vec::new(),
        },
    )
    .await
    .unwrap();
    let subtask = Subtask::create(
        &pool,
        CreateSubtask {
            task_id: task.id,
            title: "child".to_string(),
            description: None,
            is_completed: false,
            created_by: owner.id,
        },
    )
    .await
    .unwrap();
    let note = Note::create(&pool, p.id, owner.id, "hello there").await.unwrap();

    assert!(Task::find_in_project(&pool, q.id, task.id).await.unwrap().is_none());
    assert!(Task::update(&pool, q.id, task.id, UpdateTask::default()).await.unwrap().is_none());
    assert!(Task::delete_with_subtasks(&pool, q.id, task.id).await.unwrap().is_none());
    assert!(Subtask::find_in_project(&pool, q.id, subtask.id).await.unwrap().is_none());
    assert!(Subtask::delete_in_project(&pool, q.id, subtask.id).await.unwrap().is_none());
    assert!(Note::find_in_project(&pool, q.id, note.id).await.unwrap().is_none());
    assert!(Note::delete_in_project(&pool, q.id, note.id).await.unwrap().is_none());

    // Still reachable through the right project
    let details = Task::details(&pool, p.id, task.id).await.unwrap().expect("task in P");
    assert_eq!(details.subtasks.len(), 1);
    assert_eq!(details.subtasks[0].creator.as_ref().map(|u| u.id), Some(owner.id));
}

#[tokio::test]
async fn test_task_update_and_delete_with_subtasks() {
    let Some(pool) = common::test_pool().await else {
        return;
    };

    let owner = common::create_user(&pool).await;
    let assignee = common::create_user(&pool).await;
    let project = common::create_project(&pool, &owner).await;

    let task = Task::create(
        &pool,
        CreateTask {
            project_id: project.id,
            title: "Draft".to_string(),
            description: "First draft".to_string(),
            assigned_to: None,
            assigned_by: owner.id,
            status: TaskStatus::Todo,
            attachments: Vec::new(),
        },
    )
    .await
    .unwrap();

    let updated = Task::update(
        &pool,
        project.id,
        task.id,
        UpdateTask {
            status: Some(TaskStatus::InProgress),
            assigned_to: Some(assignee.id),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(updated.status, TaskStatus::InProgress);
    assert_eq!(updated.title, "Draft");

    let listed = Task::list_with_assignees(&pool, project.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].assignee.as_ref().map(|u| u.id), Some(assignee.id));

    for i in 0..3 {
        Subtask::create(
            &pool,
            CreateSubtask {
                task_id: task.id,
                title: format!("step {}", i),
                description: None,
                is_completed: false,
                created_by: owner.id,
            },
        )
        .await
        .unwrap();
    }

    let (deleted, subtasks) = Task::delete_with_subtasks(&pool, project.id, task.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(deleted.id, task.id);
    assert_eq!(subtasks, 3);
    assert_eq!(Subtask::count_by_task_ids(&pool, &[task.id]).await.unwrap(), 0);
}

#[tokio::test]
async fn test_cascade_delete_leaves_no_dependents() {
    let Some(pool) = common::test_pool().await else {
        return;
    };

    const MEMBERS: usize = 3;
    const TASKS: usize = 4;
    const SUBTASKS_PER_TASK: usize = 2;
    const NOTES: usize = 5;

    let owner = common::create_user(&pool).await;
    let project = common::create_project(&pool, &owner).await;
    let bystander = common::create_project(&pool, &owner).await;

    for _ in 0..MEMBERS {
        let user = common::create_user(&pool).await;
        Membership::upsert(&pool, project.id, user.id, ProjectRole::Member)
            .await
            .unwrap();
    }

    let mut task_ids = Vec::new();
    for i in 0..TASKS {
        let task = Task::create(
            &pool,
            CreateTask {
                project_id: project.id,
                title: format!("task {}", i),
                description: "to be deleted".to_string(),
                assigned_to: Some(owner.id),
                assigned_by: owner.id,
                status: TaskStatus::Todo,
                attachments: Vec::new(),
            },
        )
        .await
        .unwrap();

        for j in 0..SUBTASKS_PER_TASK {
            Subtask::create(
                &pool,
                CreateSubtask {
                    task_id: task.id,
                    title: format!("subtask {}", j),
                    description: None,
                    is_completed: j % 2 == 0,
                    created_by: owner.id,
                },
            )
            .await
            .unwrap();
        }
        task_ids.push(task.id);
    }

    for i in 0..NOTES {
        Note::create(&pool, project.id, owner.id, &format!("note number {}", i))
            .await
            .unwrap();
    }
    Note::create(&pool, bystander.id, owner.id, "survives").await.unwrap();

    let (deleted, report) = delete_project(&pool, project.id)
        .await
        .unwrap()
        .expect("project exists");

    assert_eq!(deleted.id, project.id);
    assert_eq!(report.memberships, (MEMBERS + 1) as u64);
    assert_eq!(report.tasks, TASKS as u64);
    assert_eq!(report.subtasks, (TASKS * SUBTASKS_PER_TASK) as u64);
    assert_eq!(report.notes, NOTES as u64);

    assert_eq!(Membership::count_by_project(&pool, project.id).await.unwrap(), 0);
    assert_eq!(Task::count_by_project(&pool, project.id).await.unwrap(), 0);
    assert_eq!(Subtask::count_by_task_ids(&pool, &task_ids).await.unwrap(), 0);
    assert_eq!(Note::count_by_project(&pool, project.id).await.unwrap(), 0);
    assert!(Project::find_by_id(&pool, project.id).await.unwrap().is_none());

    // Other projects are untouched
    assert_eq!(Note::count_by_project(&pool, bystander.id).await.unwrap(), 1);
    assert_eq!(Membership::count_by_project(&pool, bystander.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_cascade_delete_empty_and_missing_project() {
    let Some(pool) = common::test_pool().await else {
        return;
    };

    let owner = common::create_user(&pool).await;
    let project = common::create_project(&pool, &owner).await;

    let (_, report) = delete_project(&pool, project.id).await.unwrap().unwrap();
    assert_eq!(report.memberships, 1);
    assert_eq!(report.tasks + report.subtasks + report.notes, 0);

    assert!(delete_project(&pool, project.id).await.unwrap().is_none());
    assert!(delete_project(&pool, Uuid::new_v4()).await.unwrap().is_none());
}
