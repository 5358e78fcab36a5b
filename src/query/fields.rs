use serde::{Deserialize, Serialize};

use crate::record::{Assessment, Candidate, Job};

use super::{FieldValue, Queryable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobField {
    Title,
    Slug,
    Status,
    Tags,
    Rank,
}

impl Queryable for Job {
    type Field = JobField;
    const SEARCH_FIELDS: &'static [JobField] = &[JobField::Title, JobField::Tags];

    fn field(&self, field: JobField) -> FieldValue<'_> {
        match field {
            JobField::Title => FieldValue::Text(&self.title),
            JobField::Slug => FieldValue::Text(&self.slug),
            JobField::Status => FieldValue::Text(self.status.as_str()),
            JobField::Tags => FieldValue::List(&self.tags),
            JobField::Rank => FieldValue::Int(i64::from(self.rank)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateField {
    Name,
    Email,
    JobId,
    Stage,
}

impl Queryable for Candidate {
    type Field = CandidateField;
    const SEARCH_FIELDS: &'static [CandidateField] = &[CandidateField::Name, CandidateField::Email];

    fn field(&self, field: CandidateField) -> FieldValue<'_> {
        match field {
            CandidateField::Name => FieldValue::Text(&self.name),
            CandidateField::Email => FieldValue::Text(&self.email),
            CandidateField::JobId => FieldValue::Text(&self.job_id),
            CandidateField::Stage => FieldValue::Text(self.stage.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentField {
    Title,
    JobId,
    Questions,
}

impl Queryable for Assessment {
    type Field = AssessmentField;
    const SEARCH_FIELDS: &'static [AssessmentField] =
        &[AssessmentField::Title, AssessmentField::Questions];

    fn field(&self, field: AssessmentField) -> FieldValue<'_> {
        match field {
            AssessmentField::Title => FieldValue::Text(&self.title),
            AssessmentField::JobId => FieldValue::Text(&self.job_id),
            AssessmentField::Questions => FieldValue::List(&self.questions),
        }
    }
}
