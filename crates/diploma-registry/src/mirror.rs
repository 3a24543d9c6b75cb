//! Ledger mirroring: what gets sent to the ledger and how its outcome is
//! reported.
//!
//! Every ledger call is best-effort. The local store has already committed by
//! the time the ledger is asked, so a ledger failure only changes the
//! reported [`LedgerSync`], never the operation's result.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;

use diploma_registry_core::{Record, RecordId};
use diploma_registry_gateway::{
    AcademicRecord, Identity, LedgerError, MintRequest, Transcript,
};

/// Outcome of mirroring a state change to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum LedgerSync<T> {
    /// Committed locally and on the ledger.
    Committed(T),
    /// Committed locally only.
    LocalOnly(LocalOnlyReason),
}

impl<T> LedgerSync<T> {
    pub fn is_committed(&self) -> bool {
        matches!(self, LedgerSync::Committed(_))
    }

    /// The ledger receipt, if the ledger committed.
    pub fn receipt(&self) -> Option<&T> {
        match self {
            LedgerSync::Committed(receipt) => Some(receipt),
            LedgerSync::LocalOnly(_) => None,
        }
    }

    /// Why the ledger was not updated, if it wasn't.
    pub fn reason(&self) -> Option<&LocalOnlyReason> {
        match self {
            LedgerSync::Committed(_) => None,
            LedgerSync::LocalOnly(reason) => Some(reason),
        }
    }
}

/// Why a change stayed local.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalOnlyReason {
    /// Ledger integration is switched off.
    Disabled,
    /// The record has no owner to mint to.
    NoOwner,
    /// The record was never minted, so there is nothing to update.
    NotMinted,
    /// The ledger call failed.
    Failed(String),
    /// The ledger call did not finish in time.
    TimedOut,
}

/// Run a ledger call under a timeout and fold its result into a
/// [`LedgerSync`]. Failures are logged, never returned.
pub(crate) async fn settle<T, F>(
    op: &'static str,
    record_id: &RecordId,
    timeout: Duration,
    call: F,
) -> LedgerSync<T>
where
    F: Future<Output = Result<T, LedgerError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(receipt)) => LedgerSync::Committed(receipt),
        Ok(Err(e)) => {
            tracing::warn!(op, record_id = %record_id, error = %e, "ledger call failed; kept local");
            LedgerSync::LocalOnly(LocalOnlyReason::Failed(e.to_string()))
        }
        Err(_) => {
            tracing::warn!(op, record_id = %record_id, ?timeout, "ledger call timed out; kept local");
            LedgerSync::LocalOnly(LocalOnlyReason::TimedOut)
        }
    }
}

/// Build the mint request for a freshly persisted record.
///
/// Returns `None` when the record has no owner or a blank one.
pub fn mint_request(record: &Record) -> Option<MintRequest> {
    let owner = record.owner.clone().filter(|o| !o.is_empty())?;
    let details = &record.details;

    let (first_name, last_name) = split_name(&details.student_name);

    Some(MintRequest {
        owner,
        identity: Identity {
            first_name,
            last_name,
            student_index: record.student_index.as_str().to_string(),
        },
        academic: AcademicRecord {
            field_of_study: details.program.clone().unwrap_or_default(),
            grades: details
                .subjects
                .as_ref()
                .map(|s| s.to_grades())
                .unwrap_or_default(),
            credits: details.credits.unwrap_or(0),
            gpa: details.final_grade.as_deref().map(parse_gpa).unwrap_or(0.0),
            graduation_date: details.graduation_date.clone().unwrap_or_default(),
            transcript: Transcript {
                university: details.university_name.clone().unwrap_or_default(),
                faculty: details.faculty_name.clone().unwrap_or_default(),
                program: details.program.clone().unwrap_or_default(),
            },
        },
        token_uri: record.content.metadata_document.to_uri(),
    })
}

/// First word, then everything after it.
fn split_name(full_name: &str) -> (String, String) {
    let mut words = full_name.split_whitespace();
    let first = words.next().unwrap_or_default().to_string();
    let rest = words.collect::<Vec<_>>().join(" ");
    (first, rest)
}

/// Final grades use a decimal comma ("9,12"); unparseable grades count as 0.
fn parse_gpa(grade: &str) -> f64 {
    grade.trim().replace(',', ".").parse().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use diploma_registry_core::{
        ContentAddress, ContentRefs, DiplomaDetails, OwnerAddress, StudentIndex, Subjects,
    };

    fn record(owner: Option<&str>) -> Record {
        Record {
            id: RecordId::from_number(1),
            student_index: StudentIndex::new("201234"),
            owner: owner.map(OwnerAddress::new),
            valid: true,
            content: ContentRefs {
                primary_document: ContentAddress::new("pdf"),
                verification_image: ContentAddress::new("qr"),
                metadata_document: ContentAddress::new("meta"),
            },
            ledger: None,
            details: DiplomaDetails {
                student_name: "Ana Marija Petrovic".into(),
                program: Some("Computer Science".into()),
                credits: Some(240),
                final_grade: Some("9,12".into()),
                university_name: Some("University of Belgrade".into()),
                subjects: Some(Subjects::parse("Algebra, Physics")),
                ..Default::default()
            },
            created_at: 0,
        }
    }

    #[test]
    fn test_mint_request_derivation() {
        let request = mint_request(&record(Some("0xABC"))).unwrap();

        assert_eq!(request.owner.as_str(), "0xabc");
        assert_eq!(request.identity.first_name, "Ana");
        assert_eq!(request.identity.last_name, "Marija Petrovic");
        assert_eq!(request.academic.credits, 240);
        assert!((request.academic.gpa - 9.12).abs() < 1e-9);
        assert_eq!(
            request.academic.grades.get("subjects").and_then(|v| v.as_str()),
            Some("Algebra, Physics")
        );
        assert_eq!(request.academic.transcript.program, "Computer Science");
        assert_eq!(request.academic.transcript.faculty, "");
        assert_eq!(request.token_uri, "ipfs://meta");
    }

    #[test]
    fn test_no_owner_no_request() {
        assert!(mint_request(&record(None)).is_none());
        assert!(mint_request(&record(Some("  "))).is_none());
    }

    #[test]
    fn test_parse_gpa() {
        assert_eq!(parse_gpa("8.5"), 8.5);
        assert_eq!(parse_gpa(" 7,25 "), 7.25);
        assert_eq!(parse_gpa("excellent"), 0.0);
    }

    #[tokio::test]
    async fn test_settle_outcomes() {
        let id = RecordId::from_number(1);
        let timeout = Duration::from_millis(50);

        let ok = settle("mint", &id, timeout, async { Ok::<_, LedgerError>(7u32) }).await;
        assert_eq!(ok, LedgerSync::Committed(7));

        let failed = settle("mint", &id, timeout, async {
            Err::<u32, _>(LedgerError::Unavailable("down".into()))
        })
        .await;
        assert!(matches!(
            failed.reason(),
            Some(LocalOnlyReason::Failed(msg)) if msg.contains("down")
        ));

        let slow = settle("mint", &id, timeout, async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<u32, LedgerError>(1)
        })
        .await;
        assert_eq!(slow, LedgerSync::LocalOnly(LocalOnlyReason::TimedOut));
    }
}
