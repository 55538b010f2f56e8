use lazy_static::lazy_static;
use serde::de::value::StrDeserializer;
use serde::de::IntoDeserializer;
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use validator::Validate;

lazy_static! {
    static ref OFFICE_EMAIL_REGEX: regex::Regex =
        regex::Regex::new(r"^[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9-.]+$").unwrap();
}

/// Department an employee belongs to.
/// Corresponds to the `department` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "department")]
pub enum Dept {
    None,
    HR,
    Payroll,
    IT,
}

/// An employee record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Employee {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub department: Option<Dept>,
    pub photo_path: Option<String>,
}

/// Form input for creating or editing an employee.
///
/// Missing fields bind as empty so validation, not deserialization, reports them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct EmployeeInput {
    #[validate(length(min = 1, max = 50, message = "Name must be between 1 and 50 characters"))]
    pub name: String,

    #[validate(regex(path = "OFFICE_EMAIL_REGEX", message = "Invalid Email Format"))]
    pub email: String,

    #[validate(required(message = "Please Select A Department"))]
    #[serde(deserialize_with = "empty_as_none")]
    pub department: Option<Dept>,

    pub photo_path: Option<String>,
}

/// The department select posts an empty value for its placeholder option.
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<Dept>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => {
            let value: StrDeserializer<'_, D::Error> = value.into_deserializer();
            Dept::deserialize(value).map(Some)
        }
    }
}

impl Employee {
    /// Builds an employee from validated input. The id is assigned by the repository.
    pub fn from_input(id: i32, input: EmployeeInput) -> Self {
        Self {
            id,
            name: input.name,
            email: input.email,
            department: input.department,
            photo_path: input.photo_path.filter(|path| !path.is_empty()),
        }
    }
}
