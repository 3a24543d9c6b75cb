//! Persistence across restarts.

use anyhow::Result;

use diploma_registry::{LedgerSync, RecordId, RegistryConfig, Role, StudentIndex, Subjects};
use diploma_registry_testkit::{random_owner, sample_diploma, sample_pdf, TestFixture};

#[tokio::test]
async fn test_records_survive_reopen() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("registry.db");
    let owner = random_owner();

    let before = {
        let fixture = TestFixture::sqlite_at(&path, RegistryConfig::default())?;
        fixture.issue("201234").await?;
        let minted = fixture.issue_to("201234", &owner).await?;
        assert!(matches!(minted.ledger, LedgerSync::Committed(_)));
        fixture.queries().all().await?
    };

    let fixture = TestFixture::sqlite_at(&path, RegistryConfig::default())?;
    let after = fixture.queries().all().await?;
    assert_eq!(after, before);

    let current = fixture
        .queries()
        .current_valid_by_index(&StudentIndex::new("201234"))
        .await?;
    assert_eq!(current.id.as_str(), "2");
    assert_eq!(current.ledger_id(), Some("1"));
    assert_eq!(fixture.queries().by_owner(&owner).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_allocation_continues_after_reopen() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("registry.db");

    {
        let fixture = TestFixture::sqlite_at(&path, RegistryConfig::default())?;
        for index in ["201234", "201235", "201236"] {
            fixture.issue(index).await?;
        }
    }

    let fixture = TestFixture::sqlite_at(&path, RegistryConfig::default())?;
    let created = fixture.issue("201237").await?;
    assert_eq!(created.record.id, RecordId::new("4"));
    assert_eq!(created.attempts, 1);
    Ok(())
}

#[tokio::test]
async fn test_deleted_identifier_retired_across_reopen() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("registry.db");

    {
        let fixture = TestFixture::sqlite_at(&path, RegistryConfig::default())?;
        fixture.issue("201234").await?;
        let second = fixture.issue("201234").await?;
        fixture.registry.delete(&second.record.id).await?;
    }

    let fixture = TestFixture::sqlite_at(&path, RegistryConfig::default())?;
    let created = fixture.issue("999999").await?;
    assert_eq!(created.record.id, RecordId::new("3"));
    Ok(())
}

#[tokio::test]
async fn test_subjects_round_trip_through_disk() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("registry.db");

    {
        let fixture = TestFixture::sqlite_at(&path, RegistryConfig::default())?;
        let structured = sample_diploma("201234");
        let raw = sample_diploma("201235").subjects("Algebra, Physics");
        fixture.registry.create(&structured, sample_pdf()).await?;
        fixture.registry.create(&raw, sample_pdf()).await?;
    }

    let fixture = TestFixture::sqlite_at(&path, RegistryConfig::default())?;
    let queries = fixture.queries();

    let structured = queries.by_identifier(&RecordId::new("1")).await?;
    assert!(matches!(
        structured.details.subjects,
        Some(Subjects::Structured(ref map)) if map.contains_key("Algorithms")
    ));

    let raw = queries.by_identifier(&RecordId::new("2")).await?;
    assert_eq!(
        raw.details.subjects,
        Some(Subjects::RawText("Algebra, Physics".into()))
    );
    Ok(())
}

#[tokio::test]
async fn test_roles_survive_reopen() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("registry.db");

    {
        let fixture = TestFixture::sqlite_at(&path, RegistryConfig::default())?;
        fixture
            .registry
            .roles()
            .assign("0xBEEF", "STUDENT_SERVICE")
            .await?;
    }

    let fixture = TestFixture::sqlite_at(&path, RegistryConfig::default())?;
    assert_eq!(
        fixture.registry.roles().role_of("0xbeef").await?,
        Role::StudentService
    );
    Ok(())
}
