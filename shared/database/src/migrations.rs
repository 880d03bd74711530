use sqlx::{migrate::Migrate, PgPool};
use uuid::Uuid;

use retouch_auth::PasswordService;
use retouch_common::{AppError, QuestionType, UserRole};

struct SeedQuestion {
    question_type: QuestionType,
    label: Option<&'static str>,
    state_key: &'static str,
    options: &'static [&'static str],
}

struct SeedCategory {
    title: &'static str,
    icon: &'static str,
    questions: &'static [SeedQuestion],
}

const fn question(
    question_type: QuestionType,
    label: Option<&'static str>,
    state_key: &'static str,
    options: &'static [&'static str],
) -> SeedQuestion {
    SeedQuestion {
        question_type,
        label,
        state_key,
        options,
    }
}

const CATEGORY_COLOR: &str = "#992C55";
const CATEGORY_DESCRIPTION: &str = "Select one or multiple options";

const QUESTIONNAIRE_SEED: &[SeedCategory] = &[
    SeedCategory {
        title: "Face",
        icon: "happy-outline",
        questions: &[question(
            QuestionType::Select,
            None,
            "selectedFace",
            &["Little/natural Makeup", "Excess Makeup", "No Makeup"],
        )],
    },
    SeedCategory {
        title: "Skin",
        icon: "color-palette-outline",
        questions: &[
            question(QuestionType::Toggle, Some("Maintain skin tone"), "maintainSkinTone", &[]),
            question(
                QuestionType::RadioGroup,
                Some("Lighter"),
                "selectedLighter",
                &["A little", "Very light", "Extremely light"],
            ),
            question(
                QuestionType::RadioGroup,
                Some("Darker"),
                "selectedDarker",
                &["A little", "Very Dark", "Extremely Dark"],
            ),
        ],
    },
    SeedCategory {
        title: "Change in body size",
        icon: "body-outline",
        questions: &[
            question(QuestionType::Textarea, Some("Eyes"), "eyes", &[]),
            question(QuestionType::Textarea, Some("Lips"), "lips", &[]),
            question(
                QuestionType::RadioGroup,
                Some("Hips"),
                "selectedHips",
                &["Wide", "Very Wide", "Extremely Wide"],
            ),
            question(
                QuestionType::RadioGroup,
                Some("Butt"),
                "selectedButt",
                &["Big", "Very Big", "Extremely Wide"],
            ),
            question(QuestionType::Textarea, Some("Height"), "height", &[]),
            question(QuestionType::Textarea, Some("Nose"), "nose", &[]),
            question(
                QuestionType::RadioGroup,
                Some("Tummy"),
                "selectedTummy",
                &["Small", "Very Small", "Extremely Small"],
            ),
            question(QuestionType::Textarea, Some("Chin"), "chin", &[]),
            question(QuestionType::Textarea, Some("Arm"), "arm", &[]),
            question(QuestionType::Textarea, Some("Other Requirements"), "other", &[]),
        ],
    },
];

pub struct MigrationRunner {
    pool: PgPool,
}

impl MigrationRunner {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn run_all_migrations(&self) -> Result<(), AppError> {
        tracing::info!("Starting database migrations...");

        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Migration failed: {}", e)))?;

        tracing::info!("All migrations completed successfully");
        Ok(())
    }

    pub async fn check_migration_status(&self) -> Result<MigrationStatus, AppError> {
        let migrator = sqlx::migrate!("./migrations");
        let mut conn = self.pool.acquire().await.map_err(AppError::Database)?;

        conn.ensure_migrations_table()
            .await
            .map_err(|e| AppError::Internal(format!("Migration table check failed: {}", e)))?;
        let applied = conn
            .list_applied_migrations()
            .await
            .map_err(|e| AppError::Internal(format!("Listing migrations failed: {}", e)))?;

        let total_migrations = migrator.iter().count();
        let applied_count = applied.len();
        let pending_count = total_migrations.saturating_sub(applied_count);

        Ok(MigrationStatus {
            total: total_migrations,
            applied: applied_count,
            pending: pending_count,
            is_up_to_date: pending_count == 0,
        })
    }

    pub async fn seed_initial_data(&self) -> Result<(), AppError> {
        let admin_email = std::env::var("SEED_ADMIN_EMAIL").unwrap_or_else(|_| "admin@retouch.app".to_string());
        let admin_password = std::env::var("SEED_ADMIN_PASSWORD").unwrap_or_else(|_| "admin12345".to_string());
        self.seed_account("Admin", &admin_email, &admin_password, UserRole::Admin).await?;

        let support_email = std::env::var("SEED_SUPPORT_EMAIL").unwrap_or_else(|_| "support@retouch.app".to_string());
        let support_password = std::env::var("SEED_SUPPORT_PASSWORD").unwrap_or_else(|_| "support12345".to_string());
        self.seed_account("Support", &support_email, &support_password, UserRole::Support).await?;

        self.seed_questionnaire().await
    }

    async fn seed_account(&self, name: &str, email: &str, password: &str, role: UserRole) -> Result<(), AppError> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)?;

        if exists {
            return Ok(());
        }

        let password_hash = PasswordService::hash_password(password)?;
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, role, is_verified)
            VALUES ($1, $2, $3, $4, $5, TRUE)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        tracing::info!("Seeded {} account {}", role, email);
        Ok(())
    }

    /// Inserts the default questionnaire categories when none exist yet.
    pub async fn seed_questionnaire(&self) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM questionnaires")
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        if existing > 0 {
            tracing::info!("Questionnaire already seeded ({} categories)", existing);
            return Ok(());
        }

        for (category_index, category) in QUESTIONNAIRE_SEED.iter().enumerate() {
            let questionnaire_id = Uuid::new_v4();
            sqlx::query(
                r#"
                INSERT INTO questionnaires (id, title, icon, color, description, sort_order, is_active)
                VALUES ($1, $2, $3, $4, $5, $6, TRUE)
                "#,
            )
            .bind(questionnaire_id)
            .bind(category.title)
            .bind(category.icon)
            .bind(CATEGORY_COLOR)
            .bind(CATEGORY_DESCRIPTION)
            .bind(category_index as i32 + 1)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;

            for (question_index, question) in category.questions.iter().enumerate() {
                let options = if question.options.is_empty() {
                    None
                } else {
                    Some(serde_json::json!(question.options))
                };

                sqlx::query(
                    r#"
                    INSERT INTO questionnaire_questions
                        (id, questionnaire_id, question_type, label, options, state_key, sort_order, is_required)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE)
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(questionnaire_id)
                .bind(question.question_type)
                .bind(question.label)
                .bind(options)
                .bind(question.state_key)
                .bind(question_index as i32 + 1)
                .execute(&mut *tx)
                .await
                .map_err(AppError::Database)?;
            }
        }

        tx.commit().await.map_err(AppError::Database)?;
        tracing::info!("Seeded {} questionnaire categories", QUESTIONNAIRE_SEED.len());
        Ok(())
    }
}

#[derive(Debug)]
pub struct MigrationStatus {
    pub total: usize,
    pub applied: usize,
    pub pending: usize,
    pub is_up_to_date: bool,
}

impl std::fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Migrations: {}/{} applied, {} pending",
            self.applied, self.total, self.pending
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_covers_fourteen_state_keys() {
        let keys: Vec<&str> = QUESTIONNAIRE_SEED
            .iter()
            .flat_map(|c| c.questions.iter().map(|q| q.state_key))
            .collect();

        assert_eq!(keys.len(), 14);
        assert_eq!(keys.first(), Some(&"selectedFace"));
        assert_eq!(keys.last(), Some(&"other"));
    }

    #[test]
    fn test_choice_questions_have_options() {
        for category in QUESTIONNAIRE_SEED {
            for question in category.questions {
                assert_eq!(
                    question.question_type.has_options(),
                    !question.options.is_empty(),
                    "{}",
                    question.state_key
                );
            }
        }
    }

    #[test]
    fn test_status_display() {
        let status = MigrationStatus {
            total: 5,
            applied: 3,
            pending: 2,
            is_up_to_date: false,
        };
        assert_eq!(status.to_string(), "Migrations: 3/5 applied, 2 pending");
    }
}
