//! Role management, seeding and policy evaluation over the in-memory stores

use auth_identity::{InMemoryUserRepository, NewUser, RoleDirectory, UserRepository, UserStatus};
use auth_rbac::{
    catalog::{codes, roles, PERMISSIONS},
    seeder, AccessDecision, AccessPolicy, CreateRole, InMemoryPermissionRepository, InMemoryRoleRepository,
    RbacError, RbacService, Role, RoleDraft, RolePatch, RoleRepository, UpdateRole,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

struct Fixture {
    rbac: RbacService,
    users: Arc<InMemoryUserRepository>,
}

async fn fixture() -> Fixture {
    let users = Arc::new(InMemoryUserRepository::new());
    let permissions = Arc::new(InMemoryPermissionRepository::new());
    let role_repo = InMemoryRoleRepository::new(permissions.clone()).with_users(users.clone());
    let rbac = RbacService::new(permissions, Arc::new(role_repo));
    seeder::seed_all(&rbac).await.unwrap();
    Fixture { rbac, users }
}

fn kodes(codes: &[&str]) -> Vec<String> {
    codes.iter().map(|c| c.to_string()).collect()
}

fn perawat(permission_kodes: Option<Vec<String>>) -> CreateRole {
    CreateRole {
        nama: "Perawat".to_string(),
        kode: "perawat".to_string(),
        deskripsi: Some("Asisten dokter gigi".to_string()),
        permission_kodes,
    }
}

async fn add_user(users: &InMemoryUserRepository, username: &str, role: &str) {
    users
        .create(NewUser {
            nama_lengkap: username.to_string(),
            username: username.to_string(),
            email: format!("{}@klinik.test", username),
            password_hash: "hash".to_string(),
            role: role.to_string(),
            status: UserStatus::Aktif,
            phone_number: None,
            profile_pic_url: None,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_seeding_is_idempotent() {
    let fixture = fixture().await;
    let first_roles = fixture.rbac.list_roles().await.unwrap();

    let report = seeder::seed_all(&fixture.rbac).await.unwrap();
    assert_eq!(report.created, 0);
    assert_eq!(report.updated, 0);
    assert_eq!(report.unchanged, PERMISSIONS.len());

    let roles_after = fixture.rbac.list_roles().await.unwrap();
    assert_eq!(roles_after.len(), 3);
    let ids: Vec<i64> = roles_after.iter().map(|r| r.id).collect();
    let first_ids: Vec<i64> = first_roles.iter().map(|r| r.id).collect();
    assert_eq!(ids, first_ids);
    assert_eq!(fixture.rbac.list_permissions().await.unwrap().len(), PERMISSIONS.len());
}

#[tokio::test]
async fn test_admin_holds_every_permission() {
    let fixture = fixture().await;
    let granted = fixture.rbac.permission_codes(roles::ADMIN).await.unwrap();
    assert_eq!(granted.len(), PERMISSIONS.len());

    let dokter = fixture.rbac.permission_codes(roles::DOKTER).await.unwrap();
    assert!(dokter.contains(&codes::EMR_CREATE.to_string()));
    assert!(!dokter.contains(&codes::SETTINGS_MANAGE_ROLES.to_string()));
}

#[tokio::test]
async fn test_create_role_lowercases_code_and_rejects_duplicates() {
    let fixture = fixture().await;
    let role = fixture
        .rbac
        .create_role(CreateRole {
            kode: "  PERAWAT ".to_string(),
            ..perawat(Some(kodes(&[codes::PATIENT_VIEW])))
        })
        .await
        .unwrap();
    assert_eq!(role.kode, "perawat");
    assert_eq!(role.permission_codes(), kodes(&[codes::PATIENT_VIEW]));

    let duplicate = fixture.rbac.create_role(perawat(None)).await;
    assert!(matches!(duplicate, Err(RbacError::RoleCodeTaken(code)) if code == "perawat"));
}

#[tokio::test]
async fn test_unknown_permission_code_rejects_whole_replacement() {
    let fixture = fixture().await;
    let role = fixture
        .rbac
        .create_role(perawat(Some(kodes(&[codes::PATIENT_VIEW, codes::EMR_VIEW]))))
        .await
        .unwrap();

    let result = fixture
        .rbac
        .update_role(
            role.id,
            UpdateRole {
                nama: Some("Perawat Senior".to_string()),
                permission_kodes: Some(kodes(&[codes::BILLING_VIEW, "not:a_permission"])),
                ..UpdateRole::default()
            },
        )
        .await;
    assert!(matches!(result, Err(RbacError::UnknownPermissionCodes(unknown)) if unknown == kodes(&["not:a_permission"])));

    let unchanged = fixture.rbac.get_role(role.id).await.unwrap();
    assert_eq!(unchanged.nama, "Perawat");
    let mut granted = unchanged.permission_codes();
    granted.sort();
    assert_eq!(granted, kodes(&[codes::EMR_VIEW, codes::PATIENT_VIEW]));
}

#[tokio::test]
async fn test_omitted_permissions_keep_set_and_empty_clears_it() {
    let fixture = fixture().await;
    let role = fixture
        .rbac
        .create_role(perawat(Some(kodes(&[codes::PATIENT_VIEW]))))
        .await
        .unwrap();

    let renamed = fixture
        .rbac
        .update_role(
            role.id,
            UpdateRole {
                nama: Some("Perawat Gigi".to_string()),
                ..UpdateRole::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.nama, "Perawat Gigi");
    assert_eq!(renamed.permission_codes(), kodes(&[codes::PATIENT_VIEW]));

    let cleared = fixture
        .rbac
        .update_role(
            role.id,
            UpdateRole {
                permission_kodes: Some(vec![]),
                ..UpdateRole::default()
            },
        )
        .await
        .unwrap();
    assert!(cleared.permissions.is_empty());
}

#[tokio::test]
async fn test_replacement_swaps_the_whole_set() {
    let fixture = fixture().await;
    let role = fixture
        .rbac
        .create_role(perawat(Some(kodes(&[codes::PATIENT_VIEW, codes::EMR_VIEW]))))
        .await
        .unwrap();

    let updated = fixture
        .rbac
        .update_role(
            role.id,
            UpdateRole {
                permission_kodes: Some(kodes(&[codes::BILLING_VIEW, codes::BILLING_VIEW])),
                ..UpdateRole::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.permission_codes(), kodes(&[codes::BILLING_VIEW]));
}

#[tokio::test]
async fn test_role_code_change_cannot_take_another_roles_code() {
    let fixture = fixture().await;
    let role = fixture.rbac.create_role(perawat(None)).await.unwrap();

    let clash = fixture
        .rbac
        .update_role(
            role.id,
            UpdateRole {
                kode: Some("Dokter".to_string()),
                ..UpdateRole::default()
            },
        )
        .await;
    assert!(matches!(clash, Err(RbacError::RoleCodeTaken(_))));

    // Re-submitting its own code is not a conflict.
    let same = fixture
        .rbac
        .update_role(
            role.id,
            UpdateRole {
                kode: Some("perawat".to_string()),
                ..UpdateRole::default()
            },
        )
        .await;
    assert!(same.is_ok());
}

#[tokio::test]
async fn test_role_in_use_cannot_be_deleted() {
    let fixture = fixture().await;
    let role = fixture
        .rbac
        .create_role(perawat(Some(kodes(&[codes::PATIENT_VIEW]))))
        .await
        .unwrap();
    add_user(&fixture.users, "rina", "perawat").await;

    let result = fixture.rbac.delete_role(role.id).await;
    assert!(matches!(result, Err(RbacError::RoleInUse { users: 1, .. })));

    let kept = fixture.rbac.get_role(role.id).await.unwrap();
    assert_eq!(kept.permission_codes(), kodes(&[codes::PATIENT_VIEW]));
}

#[tokio::test]
async fn test_unused_role_is_deleted_with_its_associations() {
    let fixture = fixture().await;
    let role = fixture
        .rbac
        .create_role(perawat(Some(kodes(&[codes::PATIENT_VIEW]))))
        .await
        .unwrap();

    fixture.rbac.delete_role(role.id).await.unwrap();

    assert!(matches!(fixture.rbac.get_role(role.id).await, Err(RbacError::RoleNotFound)));
    assert!(fixture.rbac.permission_codes("perawat").await.unwrap().is_empty());
    assert!(matches!(fixture.rbac.delete_role(role.id).await, Err(RbacError::RoleNotFound)));
}

#[tokio::test]
async fn test_authorize_checks_role_then_permission() {
    let fixture = fixture().await;
    const CREATE_EMR: AccessPolicy = AccessPolicy::new(&[roles::ADMIN, roles::DOKTER], &[codes::EMR_CREATE]);

    assert_eq!(
        fixture.rbac.authorize(roles::RESEPSIONIS, &CREATE_EMR).await.unwrap(),
        AccessDecision::DenyRole
    );
    assert_eq!(
        fixture.rbac.authorize(roles::DOKTER, &CREATE_EMR).await.unwrap(),
        AccessDecision::Allow
    );

    // Strip the doctor's permissions; the role still passes the allow-list but not the permission check.
    let dokter = fixture.rbac.find_role_by_code(roles::DOKTER).await.unwrap().unwrap();
    fixture
        .rbac
        .update_role(
            dokter.id,
            UpdateRole {
                permission_kodes: Some(vec![]),
                ..UpdateRole::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(
        fixture.rbac.authorize(roles::DOKTER, &CREATE_EMR).await.unwrap(),
        AccessDecision::DenyPermission
    );
}

#[tokio::test]
async fn test_role_directory_requires_exact_code() {
    let fixture = fixture().await;
    assert!(fixture.rbac.role_exists("dokter").await.unwrap());
    assert!(!fixture.rbac.role_exists("Dokter").await.unwrap());
    assert!(!fixture.rbac.role_exists("perawat").await.unwrap());
}

/// Role store whose first grant lookup pauses after reading until released.
struct PausingRoleRepository {
    inner: InMemoryRoleRepository,
    paused: AtomicBool,
    read_done: Notify,
    release: Notify,
}

#[async_trait]
impl RoleRepository for PausingRoleRepository {
    async fn create(&self, draft: RoleDraft) -> auth_rbac::Result<Role> {
        self.inner.create(draft).await
    }
    async fn find_by_id(&self, id: i64) -> auth_rbac::Result<Option<Role>> {
        self.inner.find_by_id(id).await
    }
    async fn find_by_code(&self, code: &str) -> auth_rbac::Result<Option<Role>> {
        self.inner.find_by_code(code).await
    }
    async fn list(&self) -> auth_rbac::Result<Vec<Role>> {
        self.inner.list().await
    }
    async fn update(&self, id: i64, patch: RolePatch) -> auth_rbac::Result<Role> {
        self.inner.update(id, patch).await
    }
    async fn delete(&self, id: i64) -> auth_rbac::Result<()> {
        self.inner.delete(id).await
    }
    async fn permission_codes(&self, role_code: &str) -> auth_rbac::Result<Vec<String>> {
        let codes = self.inner.permission_codes(role_code).await?;
        if !self.paused.swap(true, Ordering::SeqCst) {
            self.read_done.notify_one();
            self.release.notified().await;
        }
        Ok(codes)
    }
}

#[tokio::test]
async fn test_revocation_during_in_flight_check_applies_to_next_check() {
    let users = Arc::new(InMemoryUserRepository::new());
    let permissions = Arc::new(InMemoryPermissionRepository::new());
    let roles = Arc::new(PausingRoleRepository {
        inner: InMemoryRoleRepository::new(permissions.clone()).with_users(users),
        paused: AtomicBool::new(true),
        read_done: Notify::new(),
        release: Notify::new(),
    });
    let rbac = Arc::new(RbacService::new(permissions, roles.clone()));
    seeder::seed_permissions(&rbac).await.unwrap();
    let perawat = rbac.create_role(perawat(Some(kodes(&[codes::EMR_VIEW])))).await.unwrap();

    // Arm the pause, then start a gate check that reads the old grants.
    roles.paused.store(false, Ordering::SeqCst);
    let in_flight = tokio::spawn({
        let rbac = Arc::clone(&rbac);
        async move { rbac.permission_codes("perawat").await }
    });
    roles.read_done.notified().await;

    rbac.update_role(
        perawat.id,
        UpdateRole {
            permission_kodes: Some(vec![]),
            ..UpdateRole::default()
        },
    )
    .await
    .unwrap();
    roles.release.notify_one();

    // The request that started before the revocation saw the old set.
    assert_eq!(in_flight.await.unwrap().unwrap(), kodes(&[codes::EMR_VIEW]));

    // Every later check sees what is stored.
    const VIEW_EMR: AccessPolicy = AccessPolicy::new(&["perawat"], &[codes::EMR_VIEW]);
    assert!(rbac.permission_codes("perawat").await.unwrap().is_empty());
    assert_eq!(
        rbac.authorize("perawat", &VIEW_EMR).await.unwrap(),
        AccessDecision::DenyPermission
    );
}
