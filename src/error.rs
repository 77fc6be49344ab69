use thiserror::Error;

/// Integrity violations found in a dataset snapshot.
///
/// Any of these fails the batch; the reports never run on data that breaks
/// the table constraints.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("duplicate region id {0}")]
    DuplicateRegion(String),

    #[error("duplicate branch id {0}")]
    DuplicateBranch(String),

    #[error("duplicate transaction record for region {region_id} in {year}-{month:02}")]
    DuplicateObservation { region_id: String, year: i32, month: u32 },

    #[error("branch {0} has no staff")]
    NoStaff(String),

    #[error("branch {branch_id} reports {actual} transactions per staff, expected {expected}")]
    InconsistentLoad { branch_id: String, expected: f64, actual: f64 },

    #[error("branch {branch_id} lies outside the service area ({latitude}, {longitude})")]
    OutOfBounds { branch_id: String, latitude: f64, longitude: f64 },

    #[error("region {region_id} has {field} = {value}, expected a fraction in [0, 1]")]
    RateOutOfRange { region_id: String, field: &'static str, value: f64 },

    #[error("region {region_id} has non-positive {field}")]
    NonPositive { region_id: String, field: &'static str },

    #[error("transaction record for {region_id} has invalid month {month}")]
    InvalidMonth { region_id: String, month: u32 },

    #[error("transaction record for {region_id} dated {date} does not match year {year} month {month}")]
    DateMismatch { region_id: String, date: String, year: i32, month: u32 },

    #[error("transaction record references unknown region {0}")]
    UnknownRegion(String),

    #[error("branch {branch_id} is assigned to region {region_id}, which is not in province {province}")]
    MisassignedBranch { branch_id: String, region_id: String, province: String },
}
