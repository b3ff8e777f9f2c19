//! Wire-contract types for the HTTP API.
//!
//! Field names follow the published JSON contract (Portuguese). Inbound
//! payloads are deliberately loose — every field optional, priority as a raw
//! label — so that missing or malformed values surface through the
//! validation layer as envelope errors rather than serde rejections.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Priority, Process, SubStep};

/// Inbound payload for create and update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcessRequest {
    #[serde(rename = "titulo")]
    pub title: Option<String>,

    #[serde(rename = "descricao")]
    pub description: Option<String>,

    /// Raw label; parsed and checked by the validation layer
    #[serde(rename = "prioridade")]
    pub priority: Option<String>,

    #[serde(
        rename = "dataInicio",
        default,
        deserialize_with = "flexible_datetime::deserialize"
    )]
    pub start_date: Option<NaiveDateTime>,

    #[serde(
        rename = "dataTermino",
        default,
        deserialize_with = "flexible_datetime::deserialize"
    )]
    pub end_date: Option<NaiveDateTime>,

    #[serde(rename = "subPassos", default)]
    pub sub_steps: Vec<SubStepRequest>,

    /// Accepted but ignored: completion is derived server-side
    #[serde(rename = "concluido")]
    pub completed: Option<bool>,
}

/// Inbound sub-step entry inside a [`ProcessRequest`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubStepRequest {
    /// On update, a supplied id is reused verbatim; absent ids are new rows
    pub id: Option<i64>,

    #[serde(rename = "descricao")]
    pub description: Option<String>,

    #[serde(rename = "concluido", default)]
    pub completed: bool,

    #[serde(rename = "ordemExibicao", default)]
    pub display_order: i32,
}

/// Full process representation returned by every endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessDto {
    pub id: Option<i64>,

    #[serde(rename = "titulo")]
    pub title: String,

    #[serde(rename = "descricao")]
    pub description: Option<String>,

    #[serde(rename = "prioridade")]
    pub priority: Priority,

    #[serde(rename = "dataInicio")]
    pub start_date: NaiveDateTime,

    #[serde(rename = "dataTermino")]
    pub end_date: NaiveDateTime,

    #[serde(rename = "concluido")]
    pub completed: bool,

    #[serde(rename = "subPassos")]
    pub sub_steps: Vec<SubStepDto>,

    #[serde(rename = "criadoEm")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(rename = "atualizadoEm")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Sub-step representation. The parent back-reference and row timestamps
/// stay internal.
#[derive(Debug, Clone, Serialize)]
pub struct SubStepDto {
    pub id: Option<i64>,

    #[serde(rename = "descricao")]
    pub description: String,

    #[serde(rename = "concluido")]
    pub completed: bool,

    #[serde(rename = "ordemExibicao")]
    pub display_order: i32,
}

impl From<SubStep> for SubStepDto {
    fn from(sub_step: SubStep) -> Self {
        Self {
            id: sub_step.id,
            description: sub_step.description,
            completed: sub_step.completed,
            display_order: sub_step.display_order,
        }
    }
}

impl From<Process> for ProcessDto {
    fn from(process: Process) -> Self {
        Self {
            id: process.id,
            title: process.title,
            description: process.description,
            priority: process.priority,
            start_date: process.start_date,
            end_date: process.end_date,
            completed: process.completed,
            sub_steps: process.sub_steps.into_iter().map(SubStepDto::from).collect(),
            created_at: process.created_at,
            updated_at: process.updated_at,
        }
    }
}

mod flexible_datetime {
    use chrono::{DateTime, NaiveDateTime};
    use serde::{Deserialize, Deserializer};

    /// The mobile client sends `Date.toISOString()` (zoned, millisecond
    /// precision); stored values and hand-written payloads are zoneless and
    /// may omit seconds. Zoned inputs are normalized to UTC then truncated.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        let Some(raw) = raw else {
            return Ok(None);
        };

        if let Ok(zoned) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(Some(zoned.naive_utc()));
        }
        if let Ok(bare) = raw.parse::<NaiveDateTime>() {
            return Ok(Some(bare));
        }
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M")
            .map(Some)
            .map_err(|_| {
                serde::de::Error::custom(format!("data/hora inválida: {raw}"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_deserializes_portuguese_field_names() {
        let payload: ProcessRequest = serde_json::from_str(
            r#"{
                "titulo": "Onboarding",
                "descricao": "Admissão de colaborador",
                "prioridade": "ALTA",
                "dataInicio": "2024-01-01T00:00:00",
                "dataTermino": "2024-01-31T00:00:00",
                "subPassos": [
                    {"descricao": "Assinar contrato", "ordemExibicao": 1}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(payload.title.as_deref(), Some("Onboarding"));
        assert_eq!(payload.priority.as_deref(), Some("ALTA"));
        assert_eq!(payload.sub_steps.len(), 1);
        assert!(!payload.sub_steps[0].completed);
        assert_eq!(payload.sub_steps[0].display_order, 1);
    }

    #[test]
    fn dates_accept_zoned_and_minute_precision_inputs() {
        let zoned: ProcessRequest =
            serde_json::from_str(r#"{"dataInicio": "2024-01-01T12:30:00.000Z"}"#).unwrap();
        assert_eq!(
            zoned.start_date.unwrap().to_string(),
            "2024-01-01 12:30:00"
        );

        let minutes: ProcessRequest =
            serde_json::from_str(r#"{"dataInicio": "2024-01-01T12:30"}"#).unwrap();
        assert_eq!(
            minutes.start_date.unwrap().to_string(),
            "2024-01-01 12:30:00"
        );
    }

    #[test]
    fn dto_serializes_the_published_contract() {
        let dto = ProcessDto {
            id: Some(7),
            title: "Relatório Anual".to_string(),
            description: None,
            priority: Priority::Media,
            start_date: "2024-01-01T00:00:00".parse().unwrap(),
            end_date: "2024-01-31T00:00:00".parse().unwrap(),
            completed: false,
            sub_steps: vec![SubStepDto {
                id: Some(1),
                description: "Coletar dados".to_string(),
                completed: true,
                display_order: 0,
            }],
            created_at: None,
            updated_at: None,
        };

        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["titulo"], "Relatório Anual");
        assert_eq!(json["prioridade"], "MEDIA");
        assert_eq!(json["concluido"], false);
        assert_eq!(json["subPassos"][0]["ordemExibicao"], 0);
        assert_eq!(json["subPassos"][0]["concluido"], true);
    }
}
