use super::domain::JobFields;
use super::error::LifecycleError;

pub const TITLE_CHARS: (usize, usize) = (5, 100);
pub const DESCRIPTION_CHARS: (usize, usize) = (10, 1000);
pub const LOCATION_MIN_CHARS: usize = 5;
pub const TIMELINE_MAX_CHARS: usize = 200;

/// Trim and length-check job fields, naming the first offending field.
pub fn validate_job_fields(fields: JobFields) -> Result<JobFields, LifecycleError> {
    let title = bounded("title", &fields.title, TITLE_CHARS.0, Some(TITLE_CHARS.1))?;
    let description = bounded(
        "description",
        &fields.description,
        DESCRIPTION_CHARS.0,
        Some(DESCRIPTION_CHARS.1),
    )?;
    let location = bounded("location", &fields.location, LOCATION_MIN_CHARS, None)?;
    let timeline = match fields.timeline.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(bounded("timeline", raw, 1, Some(TIMELINE_MAX_CHARS))?),
    };

    Ok(JobFields {
        title,
        description,
        location,
        timeline,
    })
}

fn bounded(
    field: &'static str,
    raw: &str,
    min: usize,
    max: Option<usize>,
) -> Result<String, LifecycleError> {
    let value = raw.trim();
    let chars = value.chars().count();

    if chars == 0 {
        return Err(LifecycleError::validation(field, format!("{field} is required")));
    }
    match max {
        Some(max) if chars < min || chars > max => Err(LifecycleError::validation(
            field,
            format!("{field} must be between {min} and {max} characters"),
        )),
        None if chars < min => Err(LifecycleError::validation(
            field,
            format!("{field} must be at least {min} characters"),
        )),
        _ => Ok(value.to_string()),
    }
}
