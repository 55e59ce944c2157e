use crate::{
    catalog::{DEFAULT_ROLES, PERMISSIONS},
    error::*,
    models::{CreateRole, UpdateRole, UpsertOutcome},
    service::RbacService,
};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
}

/// Synchronize the permission catalog into storage. Safe to run on every start.
pub async fn seed_permissions(service: &RbacService) -> Result<SeedReport> {
    let store = service.permission_store();
    let mut report = SeedReport::default();

    for definition in PERMISSIONS {
        match store.upsert(definition).await? {
            UpsertOutcome::Created => {
                debug!(kode = definition.kode, "Permission created");
                report.created += 1;
            }
            UpsertOutcome::Updated => {
                debug!(kode = definition.kode, "Permission updated");
                report.updated += 1;
            }
            UpsertOutcome::Unchanged => report.unchanged += 1,
        }
    }

    info!(
        created = report.created,
        updated = report.updated,
        unchanged = report.unchanged,
        "Permission catalog synchronized"
    );
    Ok(report)
}

/// Create the built-in roles, or refresh their details and permission sets.
pub async fn seed_default_roles(service: &RbacService) -> Result<()> {
    for default in DEFAULT_ROLES {
        let codes = default.permission_codes();
        match service.find_role_by_code(default.kode).await? {
            Some(existing) => {
                service
                    .update_role(
                        existing.id,
                        UpdateRole {
                            nama: Some(default.nama.to_string()),
                            kode: None,
                            deskripsi: Some(default.deskripsi.to_string()),
                            permission_kodes: Some(codes),
                        },
                    )
                    .await?;
                debug!(kode = default.kode, "Default role synchronized");
            }
            None => {
                service
                    .create_role(CreateRole {
                        nama: default.nama.to_string(),
                        kode: default.kode.to_string(),
                        deskripsi: Some(default.deskripsi.to_string()),
                        permission_kodes: Some(codes),
                    })
                    .await?;
            }
        }
    }
    info!(roles = DEFAULT_ROLES.len(), "Default roles synchronized");
    Ok(())
}

/// Permissions first, then the roles that reference them.
pub async fn seed_all(service: &RbacService) -> Result<SeedReport> {
    let report = seed_permissions(service).await?;
    seed_default_roles(service).await?;
    Ok(report)
}
