//! Required-field and date-range checks for inbound process payloads.
//!
//! All missing-field violations are collected into a single message so the
//! client sees everything wrong with a payload at once; the date-range rule
//! only runs once the required fields are present.

use chrono::NaiveDateTime;

use crate::dto::ProcessRequest;
use crate::error::{Error, Result};
use crate::model::Priority;

/// Upper bound on sub-step description length, matching the stored column
pub const SUB_STEP_DESCRIPTION_MAX: usize = 500;

/// A payload that passed validation, with the priority label parsed.
#[derive(Debug, Clone)]
pub struct ValidatedProcess {
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub sub_steps: Vec<ValidatedSubStep>,
}

#[derive(Debug, Clone)]
pub struct ValidatedSubStep {
    pub id: Option<i64>,
    pub description: String,
    pub completed: bool,
    pub display_order: i32,
}

/// Check required fields and the date invariant, returning the parsed
/// payload or a single `Validation` error listing every violation.
pub fn validate(payload: &ProcessRequest) -> Result<ValidatedProcess> {
    let mut violations = Vec::new();

    let title = match payload.title.as_deref().map(str::trim) {
        Some(t) if !t.is_empty() => Some(t.to_string()),
        _ => {
            violations.push("Título é obrigatório".to_string());
            None
        }
    };

    let priority = match payload.priority.as_deref() {
        Some(label) => match label.parse::<Priority>() {
            Ok(priority) => Some(priority),
            Err(err) => {
                violations.push(err.to_string());
                None
            }
        },
        None => {
            violations.push("Prioridade é obrigatória".to_string());
            None
        }
    };

    if payload.start_date.is_none() {
        violations.push("Data de início é obrigatória".to_string());
    }
    if payload.end_date.is_none() {
        violations.push("Data de término é obrigatória".to_string());
    }

    let mut sub_steps = Vec::with_capacity(payload.sub_steps.len());
    for (index, entry) in payload.sub_steps.iter().enumerate() {
        match entry.description.as_deref().map(str::trim) {
            Some(d) if !d.is_empty() => {
                if d.chars().count() > SUB_STEP_DESCRIPTION_MAX {
                    violations.push(format!(
                        "Descrição do sub-passo {} excede {} caracteres",
                        index + 1,
                        SUB_STEP_DESCRIPTION_MAX
                    ));
                } else {
                    sub_steps.push(ValidatedSubStep {
                        id: entry.id,
                        description: d.to_string(),
                        completed: entry.completed,
                        display_order: entry.display_order,
                    });
                }
            }
            _ => violations.push(format!(
                "Descrição do sub-passo {} é obrigatória",
                index + 1
            )),
        }
    }

    if !violations.is_empty() {
        return Err(Error::Validation(violations.join("; ")));
    }

    // All four required fields are present past this point
    let (Some(title), Some(priority), Some(start_date), Some(end_date)) =
        (title, priority, payload.start_date, payload.end_date)
    else {
        return Err(Error::validation("Payload inválido"));
    };

    validate_dates(start_date, end_date)?;

    Ok(ValidatedProcess {
        title,
        description: payload
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string),
        priority,
        start_date,
        end_date,
        sub_steps,
    })
}

/// The date invariant: the end of a process cannot precede its start.
pub fn validate_dates(start: NaiveDateTime, end: NaiveDateTime) -> Result<()> {
    if end < start {
        return Err(Error::validation(
            "Data de término não pode ser anterior à data de início",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::SubStepRequest;

    fn valid_payload() -> ProcessRequest {
        ProcessRequest {
            title: Some("Onboarding".to_string()),
            description: Some("Admissão".to_string()),
            priority: Some("ALTA".to_string()),
            start_date: Some("2024-01-01T00:00:00".parse().unwrap()),
            end_date: Some("2024-01-31T00:00:00".parse().unwrap()),
            sub_steps: vec![SubStepRequest {
                id: None,
                description: Some("Assinar contrato".to_string()),
                completed: false,
                display_order: 1,
            }],
            completed: None,
        }
    }

    #[test]
    fn valid_payload_passes() {
        let validated = validate(&valid_payload()).unwrap();
        assert_eq!(validated.title, "Onboarding");
        assert_eq!(validated.priority, Priority::Alta);
        assert_eq!(validated.sub_steps.len(), 1);
    }

    #[test]
    fn missing_fields_are_reported_together() {
        let err = validate(&ProcessRequest::default()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Título é obrigatório"));
        assert!(message.contains("Prioridade é obrigatória"));
        assert!(message.contains("Data de início é obrigatória"));
        assert!(message.contains("Data de término é obrigatória"));
    }

    #[test]
    fn blank_title_counts_as_missing() {
        let mut payload = valid_payload();
        payload.title = Some("   ".to_string());
        let err = validate(&payload).unwrap_err();
        assert!(err.to_string().contains("Título é obrigatório"));
    }

    #[test]
    fn unknown_priority_label_is_rejected() {
        let mut payload = valid_payload();
        payload.priority = Some("URGENTE".to_string());
        let err = validate(&payload).unwrap_err();
        assert!(err.to_string().contains("Prioridade inválida: URGENTE"));
    }

    #[test]
    fn end_before_start_is_rejected() {
        let mut payload = valid_payload();
        payload.start_date = Some("2024-02-01T00:00:00".parse().unwrap());
        payload.end_date = Some("2024-01-01T00:00:00".parse().unwrap());
        let err = validate(&payload).unwrap_err();
        assert!(err
            .to_string()
            .contains("Data de término não pode ser anterior à data de início"));
    }

    #[test]
    fn end_equal_to_start_is_allowed() {
        let mut payload = valid_payload();
        payload.end_date = payload.start_date;
        assert!(validate(&payload).is_ok());
    }

    #[test]
    fn sub_step_without_description_is_rejected() {
        let mut payload = valid_payload();
        payload.sub_steps.push(SubStepRequest::default());
        let err = validate(&payload).unwrap_err();
        assert!(err.to_string().contains("sub-passo 2 é obrigatória"));
    }

    #[test]
    fn oversized_sub_step_description_is_rejected() {
        let mut payload = valid_payload();
        payload.sub_steps[0].description = Some("x".repeat(SUB_STEP_DESCRIPTION_MAX + 1));
        let err = validate(&payload).unwrap_err();
        assert!(err.to_string().contains("excede 500 caracteres"));
    }
}
