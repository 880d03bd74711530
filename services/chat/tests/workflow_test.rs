use axum::http::{header::AUTHORIZATION, HeaderValue, StatusCode};
use axum_test::TestServer;
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::PgPool;
use tokio::task::JoinSet;
use uuid::Uuid;

use retouch_auth::{Caller, JwtService, PasswordService};
use retouch_chat::{
    admin::AdminChatService,
    assignment::{AssignmentPlan, AssignmentService},
    build_router,
    config::{AppConfig, PaymentConfig},
    message_service::{MessageService, REPLY_PREVIEW_LIMIT},
    models::{
        CreatePaymentRequest, CreateQuestionnaireRequest, EditMessageRequest, ForwardMessageRequest, QuestionOrder,
        QuestionRequest, QuickReplyRequest, ReorderQuestionsRequest, SaveAnswerRequest, SendMessageRequest,
        ShareToChatRequest, UpdateOrderStatusRequest,
    },
    order_service::OrderService,
    questionnaire::QuestionnaireService,
    quick_replies::QuickReplyService,
    staff_chat::StaffChatService,
    AppState,
};
use retouch_common::{
    AppError, ChatType, DatabaseConfig, JwtConfig, MessageType, OrderStatus, PaymentStatus, QuestionType,
    ServerConfig, UserRole,
};
use retouch_database::{create_pool, MigrationRunner};

async fn setup() -> Option<PgPool> {
    // Skip test if no database is available
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        println!("Skipping workflow test - DATABASE_URL not set");
        return None;
    };

    let config = DatabaseConfig::from_url(&database_url).expect("Invalid DATABASE_URL");
    let pool = create_pool(&config).await.expect("Failed to connect to database");

    let runner = MigrationRunner::new(pool.clone());
    runner.run_all_migrations().await.expect("Failed to run migrations");
    runner.seed_initial_data().await.expect("Failed to seed data");

    Some(pool)
}

async fn create_account(pool: &PgPool, role: UserRole) -> Caller {
    let user_id = Uuid::new_v4();
    let hash = PasswordService::hash_password("workflow123").unwrap();

    sqlx::query("INSERT INTO users (id, name, email, password_hash, role) VALUES ($1, $2, $3, $4, $5)")
        .bind(user_id)
        .bind(format!("Workflow {}", role))
        .bind(format!("{}-{}@retouch.test", role, user_id))
        .bind(hash)
        .bind(role)
        .execute(pool)
        .await
        .expect("Failed to create account");

    Caller { user_id, role }
}

async fn create_customer(pool: &PgPool) -> Caller {
    create_account(pool, UserRole::User).await
}

fn agent_of(assigned: &retouch_chat::models::AssignedAgentView) -> Caller {
    let agent = assigned.agent.as_ref().expect("assigned chat has an agent");
    Caller { user_id: agent.id, role: UserRole::Support }
}

async fn visible_chats(messages: &MessageService, caller: &Caller) -> Vec<Uuid> {
    messages
        .list_chats(caller)
        .await
        .unwrap()
        .into_iter()
        .map(|chat| chat.id)
        .collect()
}

fn text(chat_id: Uuid, body: &str) -> SendMessageRequest {
    SendMessageRequest {
        chat_id,
        message_type: Some(MessageType::Text),
        message: Some(body.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_assignment_is_idempotent() {
    let Some(pool) = setup().await else { return };
    let customer = create_customer(&pool).await;
    let assignments = AssignmentService::new(pool.clone());

    let first = assignments.assign_agent(&customer, "Retouching").await.unwrap();
    assert_eq!(first.plan, AssignmentPlan::NewChatAndOrder);

    let second = assignments.assign_agent(&customer, "Retouching").await.unwrap();
    assert_eq!(second.plan, AssignmentPlan::ReuseExisting);
    assert_eq!(first.view.chat_id, second.view.chat_id);

    let pending: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM orders WHERE chat_id = $1 AND status = 'pending' AND service_type = 'Retouching'",
    )
    .bind(first.view.chat_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(pending, 1);

    let other = assignments.assign_agent(&customer, "Background removal").await.unwrap();
    assert_eq!(other.plan, AssignmentPlan::NewOrderInChat);
    assert_eq!(other.view.chat_id, first.view.chat_id);
}

#[tokio::test]
async fn test_payment_flow() {
    let Some(pool) = setup().await else { return };
    let customer = create_customer(&pool).await;
    let assigned = AssignmentService::new(pool.clone())
        .assign_agent(&customer, "Retouching")
        .await
        .unwrap();
    let chat_id = assigned.view.chat_id;

    let orders = OrderService::new(
        pool.clone(),
        PaymentConfig {
            webhook_secret: None,
            allow_client_confirmation: true,
        },
    );

    let priced = orders
        .create_payment(
            &customer,
            CreatePaymentRequest {
                chat_id,
                total_amount: Decimal::new(5000, 2),
                no_of_photos: 3,
            },
        )
        .await
        .unwrap();
    assert_eq!(priced.payment_status, PaymentStatus::Initialized);
    assert_eq!(priced.no_of_photos, Some(3));
    assert!(priced.delivery_date.is_some());

    let payment_messages: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM messages WHERE chat_id = $1 AND message_type = 'payment' AND order_id = $2",
    )
    .bind(chat_id)
    .bind(priced.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(payment_messages, 1);

    let paid = orders.confirm_payment(&customer, chat_id).await.unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Success);

    // Re-applying the same status is a no-op.
    orders.confirm_payment(&customer, chat_id).await.unwrap();
    let ledger: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE order_id = $1 AND status = 'completed'")
        .bind(paid.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(ledger, 1);

    let err = orders
        .update_order_status(
            &customer,
            UpdateOrderStatusRequest {
                chat_id,
                status: OrderStatus::Success,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)));

    let missing = orders
        .create_payment(
            &customer,
            CreatePaymentRequest {
                chat_id: Uuid::new_v4(),
                total_amount: Decimal::new(100, 0),
                no_of_photos: 1,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(missing, AppError::NotFound(_)));

    let stranger = create_customer(&pool).await;
    let forbidden = orders.confirm_payment(&stranger, chat_id).await.unwrap_err();
    assert!(matches!(forbidden, AppError::Authorization(_)));
}

#[tokio::test]
async fn test_reply_and_forward() {
    let Some(pool) = setup().await else { return };
    let customer = create_customer(&pool).await;
    let chat_id = AssignmentService::new(pool.clone())
        .assign_agent(&customer, "Retouching")
        .await
        .unwrap()
        .view
        .chat_id;
    let messages = MessageService::new(pool.clone());

    let long_text = "Please   smooth the skin\n and brighten the background without changing the colour of the dress at all";
    let parent = messages.send_message(&customer, text(chat_id, long_text)).await.unwrap();
    let agent = sqlx::query_scalar::<_, Option<Uuid>>("SELECT user_2_id FROM chats WHERE id = $1")
        .bind(chat_id)
        .fetch_one(&pool)
        .await
        .unwrap()
        .expect("chat has a second participant");
    assert_eq!(parent.receiver_id, Some(agent));

    let answer = messages
        .send_message(&Caller { user_id: agent, role: UserRole::Support }, text(chat_id, "On it"))
        .await
        .unwrap();
    assert_eq!(answer.receiver_id, Some(customer.user_id));

    let reply = messages
        .send_message(
            &customer,
            SendMessageRequest {
                reply_to_id: Some(parent.id),
                ..text(chat_id, "Also crop it square")
            },
        )
        .await
        .unwrap();

    let preview = reply.reply_preview.unwrap();
    assert!(preview.ends_with('…'));
    assert_eq!(preview.chars().count(), REPLY_PREVIEW_LIMIT + 1);
    assert!(preview.starts_with("Please smooth the skin and brighten"));
    assert_eq!(reply.reply_to.unwrap().id, Some(parent.id));

    let forwarded = messages
        .forward_message(
            &customer,
            ForwardMessageRequest {
                original_id: parent.id,
                chat_id,
            },
        )
        .await
        .unwrap();
    assert!(forwarded.is_forwarded);
    assert_eq!(forwarded.message.as_deref(), Some(long_text));
    assert_eq!(forwarded.original_id, Some(parent.id));

    messages.delete_message(&customer, parent.id).await.unwrap();
    let history = messages.chat_messages(chat_id).await.unwrap();
    let rendered_reply = history.iter().find(|m| m.id == reply.id).unwrap();
    assert!(rendered_reply.reply_to.as_ref().unwrap().is_deleted);
    assert_eq!(
        rendered_reply.reply_to.as_ref().unwrap().message.as_deref(),
        Some("original message deleted")
    );
}

#[tokio::test]
async fn test_questionnaire_merge() {
    let Some(pool) = setup().await else { return };
    let customer = create_customer(&pool).await;
    let chat_id = AssignmentService::new(pool.clone())
        .assign_agent(&customer, "Retouching")
        .await
        .unwrap()
        .view
        .chat_id;
    let questionnaire = QuestionnaireService::new(pool.clone());

    let empty = questionnaire.progress(&customer, chat_id).await.unwrap();
    assert_eq!((empty.progress, empty.completed_sections), (0, 0));

    let first = questionnaire
        .save_answer(
            &customer,
            SaveAnswerRequest {
                chat_id,
                user_id: customer.user_id,
                answers: json!({"selectedFace": "No Makeup", "eyes": ""}),
            },
        )
        .await
        .unwrap();
    assert_eq!(first.completed_sections, 1);
    assert_eq!(first.progress, 7);

    let patch = json!({"lips": "fuller", "maintainSkinTone": true});
    let second = questionnaire
        .save_answer(
            &customer,
            SaveAnswerRequest { chat_id, user_id: customer.user_id, answers: patch.clone() },
        )
        .await
        .unwrap();
    assert_eq!(second.completed_sections, 3);
    assert_eq!(second.answers["selectedFace"], "No Makeup");

    let again = questionnaire
        .save_answer(
            &customer,
            SaveAnswerRequest { chat_id, user_id: customer.user_id, answers: patch },
        )
        .await
        .unwrap();
    assert_eq!(again.completed_sections, second.completed_sections);
    assert_eq!(again.progress, second.progress);

    let not_object = questionnaire
        .save_answer(
            &customer,
            SaveAnswerRequest { chat_id, user_id: customer.user_id, answers: json!(["x"]) },
        )
        .await
        .unwrap_err();
    assert!(matches!(not_object, AppError::Validation(_)));

    let categories = questionnaire.list_active().await.unwrap();
    assert!(categories.iter().any(|c| c.title == "Face"));
}

#[tokio::test]
async fn test_concurrent_assignments_create_one_chat_and_order() {
    let Some(pool) = setup().await else { return };
    let customer = create_customer(&pool).await;
    let assignments = AssignmentService::new(pool.clone());

    let mut calls = JoinSet::new();
    for _ in 0..8 {
        let assignments = assignments.clone();
        calls.spawn(async move { assignments.assign_agent(&customer, "Retouching").await });
    }

    let mut created = 0;
    while let Some(result) = calls.join_next().await {
        let outcome = result.unwrap().unwrap();
        if outcome.plan.created_something() {
            created += 1;
        }
    }
    assert_eq!(created, 1);

    let (chats, orders): (i64, i64) = sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM chats WHERE user_id = $1),
            (SELECT COUNT(*) FROM orders WHERE user_id = $1 AND status = 'pending')
        "#,
    )
    .bind(customer.user_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!((chats, orders), (1, 1));
}

#[tokio::test]
async fn test_hiding_a_chat_only_affects_the_caller() {
    let Some(pool) = setup().await else { return };
    let customer = create_customer(&pool).await;
    let assigned = AssignmentService::new(pool.clone())
        .assign_agent(&customer, "Retouching")
        .await
        .unwrap()
        .view;
    let chat_id = assigned.chat_id;
    let agent = agent_of(&assigned);
    let messages = MessageService::new(pool.clone());

    messages.hide_chat(&customer, chat_id).await.unwrap();
    assert!(!visible_chats(&messages, &customer).await.contains(&chat_id));
    assert!(visible_chats(&messages, &agent).await.contains(&chat_id));

    // The agent's reply brings the chat back for the customer
    messages.send_message(&agent, text(chat_id, "Your edit is ready")).await.unwrap();
    assert!(visible_chats(&messages, &customer).await.contains(&chat_id));

    let stranger = create_customer(&pool).await;
    let refused = messages.hide_chat(&stranger, chat_id).await.unwrap_err();
    assert!(matches!(refused, AppError::Authorization(_)));
}

#[tokio::test]
async fn test_admin_removed_chat_is_gone_for_the_customer() {
    let Some(pool) = setup().await else { return };
    let customer = create_customer(&pool).await;
    let assignments = AssignmentService::new(pool.clone());
    let chat_id = assignments.assign_agent(&customer, "Retouching").await.unwrap().view.chat_id;
    let messages = MessageService::new(pool.clone());

    AdminChatService::new(pool.clone()).delete_chat(chat_id).await.unwrap();

    assert!(!visible_chats(&messages, &customer).await.contains(&chat_id));
    let history = messages.chat_history(&customer, chat_id).await.unwrap_err();
    assert!(matches!(history, AppError::NotFound(_)));
    let send = messages.send_message(&customer, text(chat_id, "hello?")).await.unwrap_err();
    assert!(matches!(send, AppError::NotFound(_)));

    let reassigned = assignments.assign_agent(&customer, "Retouching").await.unwrap_err();
    assert!(matches!(reassigned, AppError::Domain(_)));

    // Moderators still see the whole conversation
    let admin = create_account(&pool, UserRole::Admin).await;
    assert!(messages.chat_history(&admin, chat_id).await.is_ok());
}

#[tokio::test]
async fn test_blank_edits_are_rejected() {
    let Some(pool) = setup().await else { return };
    let customer = create_customer(&pool).await;
    let chat_id = AssignmentService::new(pool.clone())
        .assign_agent(&customer, "Retouching")
        .await
        .unwrap()
        .view
        .chat_id;
    let messages = MessageService::new(pool.clone());
    let sent = messages.send_message(&customer, text(chat_id, "Brighten it")).await.unwrap();

    let blank = messages
        .edit_message(&customer, sent.id, EditMessageRequest { message: " \n\t ".to_string() })
        .await
        .unwrap_err();
    assert!(matches!(blank, AppError::Validation(_)));

    let edited = messages
        .edit_message(&customer, sent.id, EditMessageRequest { message: "  Brighten it more  ".to_string() })
        .await
        .unwrap();
    assert_eq!(edited.message.as_deref(), Some("Brighten it more"));
    assert!(edited.is_edited);
}

#[tokio::test]
async fn test_demoted_admin_token_is_refused() {
    let Some(pool) = setup().await else { return };
    let admin = create_account(&pool, UserRole::Admin).await;

    let config = AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
        },
        database: DatabaseConfig::from_url("postgres://unused@127.0.0.1:5432/unused").unwrap(),
        jwt: JwtConfig {
            secret: "workflow-secret".to_string(),
            expiration_hours: 1,
            issuer: "retouch".to_string(),
        },
        payments: PaymentConfig {
            webhook_secret: None,
            allow_client_confirmation: true,
        },
    };
    let jwt_service = JwtService::new(&config.jwt);
    let (token, _) = jwt_service.issue(admin.user_id, "demoted@retouch.test", UserRole::Admin).unwrap();
    let bearer = HeaderValue::from_str(&format!("Bearer {}", token)).unwrap();

    let server = TestServer::new(build_router(AppState {
        db_pool: pool.clone(),
        jwt_service,
        config,
    }))
    .unwrap();

    server
        .get("/admin/orders")
        .add_header(AUTHORIZATION, bearer.clone())
        .await
        .assert_status_ok();

    sqlx::query("UPDATE users SET role = 'user' WHERE id = $1")
        .bind(admin.user_id)
        .execute(&pool)
        .await
        .unwrap();

    server
        .get("/admin/orders")
        .add_header(AUTHORIZATION, bearer)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_staff_chats() {
    let Some(pool) = setup().await else { return };
    let staff_chats = StaffChatService::new(pool.clone());
    let editor = create_account(&pool, UserRole::Editor).await;
    let chief = create_account(&pool, UserRole::ChiefEditor).await;
    let first_admin = create_account(&pool, UserRole::Admin).await;
    let second_admin = create_account(&pool, UserRole::Admin).await;
    let customer = create_customer(&pool).await;

    let staff = staff_chats.list_staff(&editor).await.unwrap();
    assert!(staff.iter().any(|member| member.id == chief.user_id));
    assert!(staff.iter().all(|member| member.role != UserRole::User && member.id != editor.user_id));

    let opened = staff_chats.open_chat(&editor, chief.user_id).await.unwrap();
    assert_eq!(opened.chat.chat_type, ChatType::AgentAgent);
    assert_eq!(opened.counterpart.as_ref().map(|c| c.id), Some(chief.user_id));

    // Either side opening again lands in the same chat
    let reopened = staff_chats.open_chat(&chief, editor.user_id).await.unwrap();
    assert_eq!(reopened.chat.id, opened.chat.id);

    let messages = MessageService::new(pool.clone());
    let note = messages.send_message(&editor, text(opened.chat.id, "Can you review chat 42?")).await.unwrap();
    assert_eq!(note.receiver_id, Some(chief.user_id));

    let admins = staff_chats.open_chat(&first_admin, second_admin.user_id).await.unwrap();
    assert_eq!(admins.chat.chat_type, ChatType::AdminAdmin);

    let with_customer = staff_chats.open_chat(&editor, customer.user_id).await.unwrap_err();
    assert!(matches!(with_customer, AppError::Domain(_)));
    let as_customer = staff_chats.list_staff(&customer).await.unwrap_err();
    assert!(matches!(as_customer, AppError::Authorization(_)));
}

#[tokio::test]
async fn test_quick_replies_belong_to_their_owner() {
    let Some(pool) = setup().await else { return };
    let replies = QuickReplyService::new(pool.clone());
    let agent = create_account(&pool, UserRole::Support).await;
    let other = create_account(&pool, UserRole::Editor).await;

    let saved = replies
        .create(&agent, QuickReplyRequest { text: " Thanks, working on it! ".to_string() })
        .await
        .unwrap();
    assert_eq!(saved.text, "Thanks, working on it!");

    let updated = replies
        .update(&agent, saved.id, QuickReplyRequest { text: "Done, have a look".to_string() })
        .await
        .unwrap();
    assert_eq!(updated.text, "Done, have a look");

    assert!(replies.list(&other).await.unwrap().is_empty());
    let foreign = replies
        .update(&other, saved.id, QuickReplyRequest { text: "mine now".to_string() })
        .await
        .unwrap_err();
    assert!(matches!(foreign, AppError::NotFound(_)));

    replies.delete(&agent, saved.id).await.unwrap();
    assert!(replies.list(&agent).await.unwrap().is_empty());
    let again = replies.delete(&agent, saved.id).await.unwrap_err();
    assert!(matches!(again, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_admin_shares_into_another_chat() {
    let Some(pool) = setup().await else { return };
    let assignments = AssignmentService::new(pool.clone());
    let source_customer = create_customer(&pool).await;
    let target_customer = create_customer(&pool).await;
    let from_chat_id = assignments.assign_agent(&source_customer, "Retouching").await.unwrap().view.chat_id;
    let to_chat_id = assignments.assign_agent(&target_customer, "Retouching").await.unwrap().view.chat_id;

    let messages = MessageService::new(pool.clone());
    let original = messages.send_message(&source_customer, text(from_chat_id, "Sample result")).await.unwrap();

    let admin = create_account(&pool, UserRole::Admin).await;
    let admin_chats = AdminChatService::new(pool.clone());

    let forwarded = admin_chats
        .share_to_chat(
            &admin,
            ShareToChatRequest {
                from_chat_id,
                to_chat_id,
                message_id: Some(original.id),
                content: None,
            },
        )
        .await
        .unwrap();
    assert!(forwarded.is_forwarded);
    assert_eq!(forwarded.chat_id, to_chat_id);
    assert_eq!(forwarded.original_id, Some(original.id));
    assert_eq!(forwarded.receiver_id, Some(target_customer.user_id));

    let note = admin_chats
        .share_to_chat(
            &admin,
            ShareToChatRequest {
                from_chat_id,
                to_chat_id,
                message_id: None,
                content: Some("Here is what we can do".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(note.message.as_deref(), Some("Here is what we can do"));

    // The message has to come from the named source chat
    let mismatched = admin_chats
        .share_to_chat(
            &admin,
            ShareToChatRequest {
                from_chat_id: to_chat_id,
                to_chat_id,
                message_id: Some(original.id),
                content: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(mismatched, AppError::NotFound(_)));

    let available = admin_chats.available_chats(Default::default()).await.unwrap();
    assert!(available.iter().any(|chat| chat.id == to_chat_id));
}

#[tokio::test]
async fn test_reorder_questions_within_a_questionnaire() {
    let Some(pool) = setup().await else { return };
    let questionnaires = QuestionnaireService::new(pool.clone());

    let questionnaire = questionnaires
        .create(CreateQuestionnaireRequest {
            title: format!("Reorder {}", Uuid::new_v4()),
            icon: None,
            color: None,
            description: None,
            order: None,
            is_active: Some(false),
        })
        .await
        .unwrap();

    let mut question_ids = Vec::new();
    for (index, key) in ["reorderFirst", "reorderSecond"].iter().enumerate() {
        let question = questionnaires
            .add_question(
                questionnaire.id,
                QuestionRequest {
                    question_type: QuestionType::Toggle,
                    label: None,
                    options: None,
                    state_key: format!("{}{}", key, Uuid::new_v4().simple()),
                    order: Some(index as i32),
                    is_required: None,
                },
            )
            .await
            .unwrap();
        question_ids.push(question.id);
    }

    let reordered = questionnaires
        .reorder_questions(
            questionnaire.id,
            ReorderQuestionsRequest {
                question_orders: vec![
                    QuestionOrder { question_id: question_ids[0], order: 1 },
                    QuestionOrder { question_id: question_ids[1], order: 0 },
                ],
            },
        )
        .await
        .unwrap();
    let order: Vec<Uuid> = reordered.questions.iter().map(|q| q.id).collect();
    assert_eq!(order, vec![question_ids[1], question_ids[0]]);

    let foreign = questionnaires
        .reorder_questions(
            questionnaire.id,
            ReorderQuestionsRequest {
                question_orders: vec![QuestionOrder { question_id: Uuid::new_v4(), order: 3 }],
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(foreign, AppError::NotFound(_)));

    questionnaires.delete(questionnaire.id).await.unwrap();
}
