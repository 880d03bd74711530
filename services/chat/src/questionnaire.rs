use std::collections::HashMap;

use serde_json::{Map, Value};
use sqlx::PgPool;
use uuid::Uuid;

use retouch_auth::Caller;
use retouch_common::{AppError, QuestionType};
use retouch_database::{Questionnaire, QuestionnaireAnswer, QuestionnaireQuestion};

use crate::access::{authorized_chat, ensure_chat_access, fetch_chat};
use crate::models::{
    AnswersView, CategoryView, CreateQuestionnaireRequest, ProgressView, QuestionRequest, QuestionTypeInfo,
    QuestionView, ReorderQuestionsRequest, ReorderRequest, SaveAnswerRequest, UpdateQuestionRequest, UpdateQuestionnaireRequest,
};

/// Keys counted towards progress, in display order.
pub const REQUIRED_STATE_KEYS: [&str; 14] = [
    "selectedFace",
    "maintainSkinTone",
    "selectedLighter",
    "selectedDarker",
    "eyes",
    "lips",
    "selectedHips",
    "selectedButt",
    "height",
    "nose",
    "selectedTummy",
    "chin",
    "arm",
    "other",
];

pub const DEFAULT_COLOR: &str = "#992C55";

/// Shallow merge: keys in `patch` replace same-named keys in `current`.
pub fn merge_answers(current: &Value, patch: &Map<String, Value>) -> Value {
    let mut merged = current.as_object().cloned().unwrap_or_default();
    for (key, value) in patch {
        merged.insert(key.clone(), value.clone());
    }
    Value::Object(merged)
}

/// null, false, 0, "", "0", [] and {} count as unanswered.
pub fn is_answered(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

/// Returns `(completed_sections, progress_percent)`.
pub fn compute_progress(answers: &Value) -> (i32, i32) {
    let completed = REQUIRED_STATE_KEYS
        .iter()
        .filter(|key| answers.get(**key).map(is_answered).unwrap_or(false))
        .count() as i32;
    let total = REQUIRED_STATE_KEYS.len() as i32;
    (completed, completed * 100 / total)
}

fn is_hex_color(color: &str) -> bool {
    let Some(digits) = color.strip_prefix('#') else {
        return false;
    };
    matches!(digits.len(), 3 | 6) && digits.chars().all(|c| c.is_ascii_hexdigit())
}

fn question_type_label(question_type: QuestionType) -> &'static str {
    match question_type {
        QuestionType::Select => "Select",
        QuestionType::Toggle => "Toggle",
        QuestionType::RadioGroup => "Radio group",
        QuestionType::Textarea => "Text area",
    }
}

fn validate_color(color: Option<&str>) -> Result<(), AppError> {
    match color {
        Some(color) if !is_hex_color(color) => {
            Err(AppError::Validation("color: must be a hex color such as #992C55".to_string()))
        }
        _ => Ok(()),
    }
}

fn options_value(question_type: QuestionType, options: Option<&[String]>) -> Result<Option<Value>, AppError> {
    if !question_type.has_options() {
        return Ok(None);
    }
    match options {
        Some(options) if !options.is_empty() => Ok(Some(Value::from(options.to_vec()))),
        _ => Err(AppError::Validation(
            "options: required for select and radio group questions".to_string(),
        )),
    }
}

#[derive(Clone)]
pub struct QuestionnaireService {
    db_pool: PgPool,
}

impl QuestionnaireService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    pub async fn list_active(&self) -> Result<Vec<CategoryView>, AppError> {
        let questionnaires = sqlx::query_as::<_, Questionnaire>(
            "SELECT * FROM questionnaires WHERE is_active = TRUE ORDER BY sort_order, created_at",
        )
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        self.with_questions(questionnaires).await
    }

    pub async fn save_answer(&self, caller: &Caller, request: SaveAnswerRequest) -> Result<ProgressView, AppError> {
        let patch = request
            .answers
            .as_object()
            .ok_or_else(|| AppError::Validation("answers: must be a JSON object".to_string()))?;

        let mut tx = self.db_pool.begin().await.map_err(AppError::Database)?;

        let chat = match fetch_chat(&mut *tx, request.chat_id).await {
            Ok(chat) => chat,
            Err(AppError::NotFound(_)) => {
                return Err(AppError::Validation("chat_id: chat does not exist".to_string()))
            }
            Err(e) => return Err(e),
        };
        ensure_chat_access(&chat, caller)?;

        if !chat.has_participant(request.user_id) {
            return Err(AppError::Validation("user_id: must be a participant of the chat".to_string()));
        }

        sqlx::query(
            r#"
            INSERT INTO questionnaire_answers (id, chat_id, user_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (chat_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(chat.id)
        .bind(request.user_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        let current = sqlx::query_as::<_, QuestionnaireAnswer>(
            "SELECT * FROM questionnaire_answers WHERE chat_id = $1 FOR UPDATE",
        )
        .bind(chat.id)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        let merged = merge_answers(&current.answers, patch);
        let (completed_sections, progress) = compute_progress(&merged);

        let saved = sqlx::query_as::<_, QuestionnaireAnswer>(
            r#"
            UPDATE questionnaire_answers
            SET answers = $2, completed_sections = $3, progress = $4, user_id = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(current.id)
        .bind(&merged)
        .bind(completed_sections)
        .bind(progress)
        .bind(request.user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!(
            "Questionnaire for chat {} at {}% ({}/{})",
            chat.id, saved.progress, saved.completed_sections, REQUIRED_STATE_KEYS.len()
        );

        Ok(ProgressView {
            progress: saved.progress,
            completed_sections: saved.completed_sections,
            answers: saved.answers,
        })
    }

    pub async fn progress(&self, caller: &Caller, chat_id: Uuid) -> Result<ProgressView, AppError> {
        authorized_chat(&self.db_pool, chat_id, caller).await?;

        Ok(match self.find_answers(chat_id).await? {
            Some(answer) => ProgressView {
                progress: answer.progress,
                completed_sections: answer.completed_sections,
                answers: answer.answers,
            },
            None => ProgressView {
                progress: 0,
                completed_sections: 0,
                answers: Value::Object(Map::new()),
            },
        })
    }

    pub async fn answers(&self, caller: &Caller, chat_id: Uuid) -> Result<AnswersView, AppError> {
        authorized_chat(&self.db_pool, chat_id, caller).await?;

        self.find_answers(chat_id)
            .await?
            .map(AnswersView::from)
            .ok_or_else(|| AppError::NotFound("No answers found for this chat".to_string()))
    }

    async fn find_answers(&self, chat_id: Uuid) -> Result<Option<QuestionnaireAnswer>, AppError> {
        sqlx::query_as::<_, QuestionnaireAnswer>("SELECT * FROM questionnaire_answers WHERE chat_id = $1")
            .bind(chat_id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)
    }

    async fn with_questions(&self, questionnaires: Vec<Questionnaire>) -> Result<Vec<CategoryView>, AppError> {
        let ids: Vec<Uuid> = questionnaires.iter().map(|q| q.id).collect();

        let questions = sqlx::query_as::<_, QuestionnaireQuestion>(
            r#"
            SELECT * FROM questionnaire_questions
            WHERE questionnaire_id = ANY($1)
            ORDER BY sort_order, created_at
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        let mut grouped: HashMap<Uuid, Vec<QuestionView>> = HashMap::new();
        for question in &questions {
            grouped
                .entry(question.questionnaire_id)
                .or_default()
                .push(QuestionView::from(question));
        }

        Ok(questionnaires
            .into_iter()
            .map(|q| {
                let questions = grouped.remove(&q.id).unwrap_or_default();
                CategoryView::new(q, questions)
            })
            .collect())
    }

    // Admin

    pub async fn list_all(&self) -> Result<Vec<CategoryView>, AppError> {
        let questionnaires =
            sqlx::query_as::<_, Questionnaire>("SELECT * FROM questionnaires ORDER BY sort_order, created_at")
                .fetch_all(&self.db_pool)
                .await
                .map_err(AppError::Database)?;

        self.with_questions(questionnaires).await
    }

    pub async fn show(&self, questionnaire_id: Uuid) -> Result<CategoryView, AppError> {
        let questionnaire = self.find_questionnaire(questionnaire_id).await?;
        self.with_questions(vec![questionnaire])
            .await?
            .pop()
            .ok_or_else(|| AppError::NotFound("Questionnaire not found".to_string()))
    }

    pub async fn create(&self, request: CreateQuestionnaireRequest) -> Result<Questionnaire, AppError> {
        validate_color(request.color.as_deref())?;

        let questionnaire = sqlx::query_as::<_, Questionnaire>(
            r#"
            INSERT INTO questionnaires (id, title, icon, color, description, sort_order, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.title.trim())
        .bind(&request.icon)
        .bind(request.color.as_deref().unwrap_or(DEFAULT_COLOR))
        .bind(&request.description)
        .bind(request.order.unwrap_or(0))
        .bind(request.is_active.unwrap_or(true))
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        tracing::info!("Questionnaire '{}' created", questionnaire.title);
        Ok(questionnaire)
    }

    pub async fn update(
        &self,
        questionnaire_id: Uuid,
        request: UpdateQuestionnaireRequest,
    ) -> Result<Questionnaire, AppError> {
        validate_color(request.color.as_deref())?;

        sqlx::query_as::<_, Questionnaire>(
            r#"
            UPDATE questionnaires SET
                title = COALESCE($2, title),
                icon = COALESCE($3, icon),
                color = COALESCE($4, color),
                description = COALESCE($5, description),
                sort_order = COALESCE($6, sort_order),
                is_active = COALESCE($7, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(questionnaire_id)
        .bind(request.title.as_deref().map(str::trim))
        .bind(&request.icon)
        .bind(&request.color)
        .bind(&request.description)
        .bind(request.order)
        .bind(request.is_active)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Questionnaire not found".to_string()))
    }

    pub async fn delete(&self, questionnaire_id: Uuid) -> Result<(), AppError> {
        let deleted = sqlx::query("DELETE FROM questionnaires WHERE id = $1")
            .bind(questionnaire_id)
            .execute(&self.db_pool)
            .await
            .map_err(AppError::Database)?
            .rows_affected();

        if deleted == 0 {
            return Err(AppError::NotFound("Questionnaire not found".to_string()));
        }
        Ok(())
    }

    pub async fn toggle_status(&self, questionnaire_id: Uuid) -> Result<Questionnaire, AppError> {
        sqlx::query_as::<_, Questionnaire>(
            "UPDATE questionnaires SET is_active = NOT is_active, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(questionnaire_id)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Questionnaire not found".to_string()))
    }

    pub async fn add_question(
        &self,
        questionnaire_id: Uuid,
        request: QuestionRequest,
    ) -> Result<QuestionnaireQuestion, AppError> {
        self.find_questionnaire(questionnaire_id).await?;
        let options = options_value(request.question_type, request.options.as_deref())?;

        let question = sqlx::query_as::<_, QuestionnaireQuestion>(
            r#"
            INSERT INTO questionnaire_questions
                (id, questionnaire_id, question_type, label, options, state_key, sort_order, is_required)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(questionnaire_id)
        .bind(request.question_type)
        .bind(&request.label)
        .bind(options)
        .bind(request.state_key.trim())
        .bind(request.order.unwrap_or(0))
        .bind(request.is_required.unwrap_or(false))
        .fetch_one(&self.db_pool)
        .await
        .map_err(|e| AppError::conflict_on_unique(e, "state_key is already in use"))?;

        tracing::info!("Question '{}' added to questionnaire {}", question.state_key, questionnaire_id);
        Ok(question)
    }

    pub async fn update_question(
        &self,
        question_id: Uuid,
        request: UpdateQuestionRequest,
    ) -> Result<QuestionnaireQuestion, AppError> {
        let current = sqlx::query_as::<_, QuestionnaireQuestion>(
            "SELECT * FROM questionnaire_questions WHERE id = $1",
        )
        .bind(question_id)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;

        let question_type = request.question_type.unwrap_or(current.question_type);
        let options = match (&request.options, question_type.has_options()) {
            (Some(options), _) => options_value(question_type, Some(options.as_slice()))?,
            (None, true) if current.options.is_some() => current.options.clone(),
            (None, true) => options_value(question_type, None)?,
            (None, false) => None,
        };

        sqlx::query_as::<_, QuestionnaireQuestion>(
            r#"
            UPDATE questionnaire_questions SET
                question_type = $2,
                label = COALESCE($3, label),
                options = $4,
                state_key = COALESCE($5, state_key),
                sort_order = COALESCE($6, sort_order),
                is_required = COALESCE($7, is_required),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(question_id)
        .bind(question_type)
        .bind(&request.label)
        .bind(options)
        .bind(request.state_key.as_deref().map(str::trim))
        .bind(request.order)
        .bind(request.is_required)
        .fetch_one(&self.db_pool)
        .await
        .map_err(|e| AppError::conflict_on_unique(e, "state_key is already in use"))
    }

    pub async fn delete_question(&self, question_id: Uuid) -> Result<(), AppError> {
        let deleted = sqlx::query("DELETE FROM questionnaire_questions WHERE id = $1")
            .bind(question_id)
            .execute(&self.db_pool)
            .await
            .map_err(AppError::Database)?
            .rows_affected();

        if deleted == 0 {
            return Err(AppError::NotFound("Question not found".to_string()));
        }
        Ok(())
    }

    pub async fn reorder(&self, request: ReorderRequest) -> Result<Vec<Questionnaire>, AppError> {
        let mut tx = self.db_pool.begin().await.map_err(AppError::Database)?;

        for item in &request.items {
            let updated = sqlx::query("UPDATE questionnaires SET sort_order = $2, updated_at = NOW() WHERE id = $1")
                .bind(item.id)
                .bind(item.order)
                .execute(&mut *tx)
                .await
                .map_err(AppError::Database)?
                .rows_affected();

            if updated == 0 {
                return Err(AppError::NotFound(format!("Questionnaire {} not found", item.id)));
            }
        }

        tx.commit().await.map_err(AppError::Database)?;

        sqlx::query_as::<_, Questionnaire>("SELECT * FROM questionnaires ORDER BY sort_order, created_at")
            .fetch_all(&self.db_pool)
            .await
            .map_err(AppError::Database)
    }

    /// Reorders questions within one questionnaire. Questions of other
    /// questionnaires are rejected and nothing is applied.
    pub async fn reorder_questions(
        &self,
        questionnaire_id: Uuid,
        request: ReorderQuestionsRequest,
    ) -> Result<CategoryView, AppError> {
        self.find_questionnaire(questionnaire_id).await?;
        let mut tx = self.db_pool.begin().await.map_err(AppError::Database)?;

        for item in &request.question_orders {
            let updated = sqlx::query(
                r#"
                UPDATE questionnaire_questions SET sort_order = $3, updated_at = NOW()
                WHERE id = $1 AND questionnaire_id = $2
                "#,
            )
            .bind(item.question_id)
            .bind(questionnaire_id)
            .bind(item.order)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?
            .rows_affected();

            if updated == 0 {
                return Err(AppError::NotFound(format!(
                    "Question {} not found in this questionnaire",
                    item.question_id
                )));
            }
        }

        tx.commit().await.map_err(AppError::Database)?;
        tracing::info!(
            "Reordered {} questions of questionnaire {}",
            request.question_orders.len(),
            questionnaire_id
        );

        self.show(questionnaire_id).await
    }

    pub fn question_types(&self) -> Vec<QuestionTypeInfo> {
        QuestionType::ALL
            .iter()
            .map(|question_type| QuestionTypeInfo {
                value: *question_type,
                label: question_type_label(*question_type).to_string(),
                has_options: question_type.has_options(),
            })
            .collect()
    }

    async fn find_questionnaire(&self, questionnaire_id: Uuid) -> Result<Questionnaire, AppError> {
        sqlx::query_as::<_, Questionnaire>("SELECT * FROM questionnaires WHERE id = $1")
            .bind(questionnaire_id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("Questionnaire not found".to_string()))
    }
}
