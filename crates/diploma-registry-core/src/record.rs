//! The record: a single issued diploma and its lifecycle state.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::subjects::Subjects;
use crate::types::{ContentAddress, OwnerAddress, RecordId, StudentIndex};
use crate::validation::parse_credits;

/// Addresses of the three payloads stored for a record.
///
/// Set once at creation and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRefs {
    /// The diploma document itself.
    pub primary_document: ContentAddress,
    /// The rendered verification code pointing at the verify page.
    pub verification_image: ContentAddress,
    /// The JSON metadata document referencing the other two.
    pub metadata_document: ContentAddress,
}

/// Proof that a record was mirrored onto the external ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRef {
    /// The token identifier assigned by the ledger.
    pub ledger_id: String,
    /// Hash of the minting transaction.
    pub transaction_ref: String,
    /// Block the minting transaction was included in.
    pub block_ref: u64,
}

/// Descriptive fields of a diploma.
///
/// Opaque to the lifecycle logic: copied verbatim into the record and the
/// metadata document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiplomaDetails {
    /// Full name, `"<first name> <surname>"`.
    pub student_name: String,
    pub program: Option<String>,
    pub credits: Option<u32>,
    pub graduation_date: Option<String>,
    pub final_grade: Option<String>,
    pub university_name: Option<String>,
    pub faculty_name: Option<String>,
    pub subjects: Option<Subjects>,
}

/// A persisted diploma record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub student_index: StudentIndex,
    pub owner: Option<OwnerAddress>,
    pub valid: bool,
    pub content: ContentRefs,
    /// Absent until a mint succeeds; absence is never an error.
    pub ledger: Option<LedgerRef>,
    pub details: DiplomaDetails,
    /// Creation time (Unix ms). Tie-break for "most recent".
    pub created_at: i64,
}

impl Record {
    /// The ledger token identifier, if the record was mirrored.
    pub fn ledger_id(&self) -> Option<&str> {
        self.ledger.as_ref().map(|l| l.ledger_id.as_str())
    }

    /// Whether a ledger mint was recorded for this record.
    pub fn is_mirrored(&self) -> bool {
        self.ledger.is_some()
    }
}

/// Caller input for issuing a new diploma.
///
/// Built with chained setters:
///
/// ```rust
/// use diploma_registry_core::NewDiploma;
///
/// let input = NewDiploma::new("201234", "Ana", "Petrovic")
///     .owner("0xAbC0000000000000000000000000000000000001")
///     .program("Software Engineering")
///     .credits("240");
/// assert_eq!(input.full_name(), "Ana Petrovic");
/// ```
#[derive(Debug, Clone, Default)]
pub struct NewDiploma {
    pub student_index: StudentIndex,
    pub first_name: String,
    pub surname: String,
    pub owner: Option<OwnerAddress>,
    pub program: Option<String>,
    /// Credits as submitted; must parse as a non-negative integer.
    pub credits: Option<String>,
    pub graduation_date: Option<String>,
    pub final_grade: Option<String>,
    pub university_name: Option<String>,
    pub faculty_name: Option<String>,
    /// Subjects as submitted; see [`Subjects::parse`].
    pub subjects: Option<String>,
}

impl NewDiploma {
    pub fn new(
        student_index: impl Into<String>,
        first_name: impl Into<String>,
        surname: impl Into<String>,
    ) -> Self {
        Self {
            student_index: StudentIndex::new(student_index),
            first_name: first_name.into(),
            surname: surname.into(),
            ..Default::default()
        }
    }

    /// Set the owner. A blank address leaves the diploma without one.
    pub fn owner(mut self, owner: impl AsRef<str>) -> Self {
        let owner = OwnerAddress::new(owner);
        self.owner = (!owner.is_empty()).then_some(owner);
        self
    }

    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = Some(program.into());
        self
    }

    pub fn credits(mut self, credits: impl Into<String>) -> Self {
        self.credits = Some(credits.into());
        self
    }

    pub fn graduation_date(mut self, date: impl Into<String>) -> Self {
        self.graduation_date = Some(date.into());
        self
    }

    pub fn final_grade(mut self, grade: impl Into<String>) -> Self {
        self.final_grade = Some(grade.into());
        self
    }

    pub fn university(mut self, name: impl Into<String>) -> Self {
        self.university_name = Some(name.into());
        self
    }

    pub fn faculty(mut self, name: impl Into<String>) -> Self {
        self.faculty_name = Some(name.into());
        self
    }

    pub fn subjects(mut self, subjects: impl Into<String>) -> Self {
        self.subjects = Some(subjects.into());
        self
    }

    /// The owner to store and mint to, if any. Blank addresses set through
    /// the public field count as absent.
    pub fn owner_address(&self) -> Option<&OwnerAddress> {
        self.owner.as_ref().filter(|o| !o.is_empty())
    }

    /// The stored student name: first name and surname joined by a space.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.surname)
            .trim()
            .to_string()
    }

    /// Convert the submitted fields into the stored descriptive fields.
    pub fn details(&self) -> Result<DiplomaDetails, ValidationError> {
        let credits = match &self.credits {
            Some(raw) => parse_credits(raw)?,
            None => None,
        };

        Ok(DiplomaDetails {
            student_name: self.full_name(),
            program: self.program.clone(),
            credits,
            graduation_date: self.graduation_date.clone(),
            final_grade: self.final_grade.clone(),
            university_name: self.university_name.clone(),
            faculty_name: self.faculty_name.clone(),
            subjects: self.subjects.as_deref().map(Subjects::parse),
        })
    }
}
